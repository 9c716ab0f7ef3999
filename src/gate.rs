//! Confirm-before-run policy.
//!
//! The gate only decides. Showing the question and reading the answer is the
//! orchestrator's job, so every decision here can be tested without a terminal.

use tracing::info;

/// How the session authorises generated commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Ask before every command.
    Interactive,
    /// Pre-authorised for the whole session (`--no-confirm`).
    Unconditional,
}

/// Decides whether a generated command may run.
///
/// # Example
///
/// ```
/// use nlp_shell::gate::{ConfirmationMode, ExecutionGate};
///
/// let gate = ExecutionGate::new(ConfirmationMode::Interactive);
/// assert!(gate.decide(Some("Yes")));
/// assert!(!gate.decide(Some("maybe")));
/// assert!(!gate.decide(None));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ExecutionGate {
    mode: ConfirmationMode,
}

impl ExecutionGate {
    pub fn new(mode: ConfirmationMode) -> Self {
        Self { mode }
    }

    /// Whether an answer must be collected before [`Self::decide`] is called.
    pub fn requires_confirmation(&self) -> bool {
        self.mode == ConfirmationMode::Interactive
    }

    /// The question shown under the generated command.
    pub fn question(&self) -> &'static str {
        "Execute this command? [y/N]: "
    }

    /// Turns the user's answer into an approval.
    ///
    /// Unconditional mode ignores the answer. Interactive mode approves only a
    /// case-insensitive `y` or `yes`; anything else, including a missing
    /// answer, is a rejection.
    pub fn decide(&self, response: Option<&str>) -> bool {
        let approved = match self.mode {
            ConfirmationMode::Unconditional => true,
            ConfirmationMode::Interactive => response.map(is_affirmative).unwrap_or(false),
        };
        info!("Execution gate ({:?}) decision: approved={}", self.mode, approved);
        approved
    }
}

fn is_affirmative(response: &str) -> bool {
    let answer = response.trim().to_lowercase();
    answer == "y" || answer == "yes"
}
