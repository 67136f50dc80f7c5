//! Reporter that records events in memory

use std::error::Error;

use super::{PhaseToken, ProgressEvent, Reporter, Severity};

/// Collects every progress event in order
#[derive(Debug, Default)]
pub struct RecordingReporter {
    next_id: u64,
    events: Vec<ProgressEvent>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[ProgressEvent] {
        &self.events
    }

    /// Messages attached with the given severity, in order
    pub fn messages(&self, severity: Severity) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| e.severity == severity)
            .filter_map(|e| e.message.as_deref())
            .collect()
    }

    /// Final outcome of every closed phase, in order
    pub fn outcomes(&self) -> Vec<(&str, Severity)> {
        self.events
            .iter()
            .filter(|e| e.severity != Severity::Started && e.message.is_none())
            .map(|e| (e.phase.as_str(), e.severity))
            .collect()
    }

    fn push(&mut self, phase: &PhaseToken, severity: Severity, message: Option<String>) {
        self.events.push(ProgressEvent {
            phase: phase.name().to_string(),
            severity,
            message,
        });
    }

    fn annotate(&mut self, phase: &PhaseToken, severity: Severity, message: &str) {
        if !message.is_empty() {
            self.push(phase, severity, Some(message.to_string()));
        }
    }
}

impl Reporter for RecordingReporter {
    fn started(&mut self, message: &str) -> PhaseToken {
        self.next_id += 1;
        let token = PhaseToken::new(self.next_id, message);
        self.push(&token, Severity::Started, None);
        token
    }

    fn succeeded(&mut self, phase: &PhaseToken, message: &str) {
        self.annotate(phase, Severity::Succeeded, message);
    }

    fn warned(&mut self, phase: &PhaseToken, message: &str) {
        self.annotate(phase, Severity::Warned, message);
    }

    fn failed(&mut self, phase: &PhaseToken, message: &str) {
        self.annotate(phase, Severity::Failed, message);
    }

    fn ended_with(&mut self, phase: PhaseToken, err: Option<&(dyn Error + 'static)>) {
        let severity = if err.is_some() {
            Severity::Failed
        } else {
            Severity::Succeeded
        };
        self.push(&phase, severity, None);
    }
}
