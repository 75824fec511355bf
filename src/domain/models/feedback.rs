//! Domain models for the external completion-signal stream.

use serde::{Deserialize, Serialize};

/// Terminal status of a promoted-automation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    /// Run completed.
    Success,
    /// Run failed.
    Failure,
}

/// Observable outcome of one promoted-automation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    /// Process exit code.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// Completion signal emitted by the external execution layer after a
/// promoted automation runs. Consumed by the feedback bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSignal {
    /// Operation that was executed (tool_name:input_hash).
    pub operation_id: String,

    /// Terminal status.
    pub status: SignalStatus,

    /// Run outcome.
    pub result: CommandOutcome,

    /// Error detail for failed runs.
    pub error: Option<String>,
}

impl CompletionSignal {
    /// Convenience constructor for a successful run.
    pub fn success(operation_id: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            operation_id: operation_id.into(),
            status: SignalStatus::Success,
            result: CommandOutcome {
                exit_code: 0,
                stdout: stdout.into(),
                duration_ms: 0,
            },
            error: None,
        }
    }

    /// Convenience constructor for a failed run.
    pub fn failure(
        operation_id: impl Into<String>,
        exit_code: i32,
        error: impl Into<String>,
    ) -> Self {
        Self {
            operation_id: operation_id.into(),
            status: SignalStatus::Failure,
            result: CommandOutcome {
                exit_code,
                stdout: String::new(),
                duration_ms: 0,
            },
            error: Some(error.into()),
        }
    }
}
