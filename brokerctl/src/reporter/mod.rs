//! Progress reporting
//!
//! The deployer announces each phase through a [`Reporter`]. `started` hands
//! back a [`PhaseToken`] and every later call names the phase it annotates,
//! so an implementation never has to guess which unit of work is meant.

pub mod cli;
pub mod log;
pub mod recorder;

use std::error::Error;
use std::fmt;

pub use cli::CliReporter;
pub use log::LogReporter;
pub use recorder::RecordingReporter;

/// Handle to a started phase
#[derive(Debug, PartialEq, Eq)]
pub struct PhaseToken {
    id: u64,
    name: String,
}

impl PhaseToken {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Severity of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Started,
    Succeeded,
    Warned,
    Failed,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Started => "started",
            Severity::Succeeded => "succeeded",
            Severity::Warned => "warned",
            Severity::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A single progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: String,
    pub severity: Severity,
    pub message: Option<String>,
}

/// Sink for deployment progress
pub trait Reporter: Send {
    /// Announce the start of a phase
    fn started(&mut self, message: &str) -> PhaseToken;

    /// Attach a success note to a phase. Empty messages are ignored.
    fn succeeded(&mut self, phase: &PhaseToken, message: &str);

    /// Attach a warning to a phase. Empty messages are ignored.
    fn warned(&mut self, phase: &PhaseToken, message: &str);

    /// Attach a failure note to a phase. Empty messages are ignored.
    fn failed(&mut self, phase: &PhaseToken, message: &str);

    /// Close a phase, failed if `err` is set and successful otherwise
    fn ended_with(&mut self, phase: PhaseToken, err: Option<&(dyn Error + 'static)>);
}
