use serde::{Deserialize, Serialize};
use sqlx::Type;

/// Per-student progress on one test. `Submitted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attemptstatus", rename_all = "snake_case")]
pub(crate) enum AttemptStatus {
    NotStarted,
    InProgress,
    Submitted,
}

impl AttemptStatus {
    pub(crate) fn is_terminal(self) -> bool {
        matches!(self, Self::Submitted)
    }
}
