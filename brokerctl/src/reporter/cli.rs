//! Terminal status reporter

use std::collections::HashMap;
use std::error::Error;
use std::io::{self, Write};

use colored::Colorize;

use super::{PhaseToken, Reporter, Severity};

/// Prints one status line per phase, followed by the notes queued for it
pub struct CliReporter {
    out: Box<dyn Write + Send>,
    next_id: u64,
    queued: HashMap<u64, Vec<(Severity, String)>>,
}

impl CliReporter {
    /// Reporter writing to stdout
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            next_id: 0,
            queued: HashMap::new(),
        }
    }

    fn queue(&mut self, phase: &PhaseToken, severity: Severity, message: &str) {
        if message.is_empty() {
            return;
        }
        self.queued
            .entry(phase.id())
            .or_default()
            .push((severity, message.to_string()));
    }

    fn line(&mut self, symbol: &str, severity: Severity, message: &str) {
        let symbol = match severity {
            Severity::Started => symbol.cyan(),
            Severity::Succeeded => symbol.green(),
            Severity::Warned => symbol.yellow(),
            Severity::Failed => symbol.red(),
        };
        // Terminal output is best effort
        let _ = writeln!(self.out, " {} {}", symbol, message);
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn symbol_for(severity: Severity) -> &'static str {
    match severity {
        Severity::Started => "⠿",
        Severity::Succeeded => "✓",
        Severity::Warned => "⚠",
        Severity::Failed => "✗",
    }
}

impl Reporter for CliReporter {
    fn started(&mut self, message: &str) -> PhaseToken {
        self.next_id += 1;
        self.line(symbol_for(Severity::Started), Severity::Started, message);
        PhaseToken::new(self.next_id, message)
    }

    fn succeeded(&mut self, phase: &PhaseToken, message: &str) {
        self.queue(phase, Severity::Succeeded, message);
    }

    fn warned(&mut self, phase: &PhaseToken, message: &str) {
        self.queue(phase, Severity::Warned, message);
    }

    fn failed(&mut self, phase: &PhaseToken, message: &str) {
        self.queue(phase, Severity::Failed, message);
    }

    fn ended_with(&mut self, phase: PhaseToken, err: Option<&(dyn Error + 'static)>) {
        let notes = self.queued.remove(&phase.id()).unwrap_or_default();
        for (severity, message) in notes {
            self.line(symbol_for(severity), severity, &message);
        }

        match err {
            None => self.line(symbol_for(Severity::Succeeded), Severity::Succeeded, phase.name()),
            Some(e) => {
                let message = format!("{}: {}", phase.name(), e);
                self.line(symbol_for(Severity::Failed), Severity::Failed, &message);
            }
        }
        let _ = self.out.flush();
    }
}
