//! Reporter that emits tracing events

use std::error::Error;

use tracing::{error, info, warn};

use super::{PhaseToken, Reporter};

/// Writes every progress event as a structured log line
#[derive(Debug, Default)]
pub struct LogReporter {
    next_id: u64,
}

impl LogReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for LogReporter {
    fn started(&mut self, message: &str) -> PhaseToken {
        self.next_id += 1;
        info!(phase = %message, id = self.next_id, "phase started");
        PhaseToken::new(self.next_id, message)
    }

    fn succeeded(&mut self, phase: &PhaseToken, message: &str) {
        if !message.is_empty() {
            info!(phase = %phase.name(), id = phase.id(), "{}", message);
        }
    }

    fn warned(&mut self, phase: &PhaseToken, message: &str) {
        if !message.is_empty() {
            warn!(phase = %phase.name(), id = phase.id(), "{}", message);
        }
    }

    fn failed(&mut self, phase: &PhaseToken, message: &str) {
        if !message.is_empty() {
            error!(phase = %phase.name(), id = phase.id(), "{}", message);
        }
    }

    fn ended_with(&mut self, phase: PhaseToken, err: Option<&(dyn Error + 'static)>) {
        match err {
            None => info!(phase = %phase.name(), id = phase.id(), "phase succeeded"),
            Some(e) => error!(phase = %phase.name(), id = phase.id(), error = %e, "phase failed"),
        }
    }
}
