use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("Test not found")]
    TestNotFound,
    #[error("Student profile not found")]
    StudentProfileNotFound,
    #[error("Student is not assigned to this test")]
    NotAssigned,
    #[error("Attempt already submitted")]
    AlreadySubmitted,
    #[error("Attempt window has closed")]
    WindowClosed,
    #[error("Attempt window has not opened yet")]
    NotYetOpen,
    #[error("Storage conflict persisted after {attempts} attempts")]
    PersistenceConflict { attempts: u32 },
    #[error("Result not found")]
    ResultNotFound,
    #[error("Only the owning teacher may manage this test")]
    NotTestOwner,
    #[error("Unknown students: {}", .0.join(", "))]
    UnknownStudents(Vec<String>),
    #[error("Too many start requests, retry shortly")]
    RateLimited,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttemptError {
    /// Stable machine-readable identifier, also used as the rejection metric label.
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::TestNotFound => "test_not_found",
            Self::StudentProfileNotFound => "student_profile_not_found",
            Self::NotAssigned => "not_assigned",
            Self::AlreadySubmitted => "already_submitted",
            Self::WindowClosed => "window_closed",
            Self::NotYetOpen => "not_yet_open",
            Self::PersistenceConflict { .. } => "persistence_conflict",
            Self::ResultNotFound => "result_not_found",
            Self::NotTestOwner => "not_test_owner",
            Self::UnknownStudents(_) => "unknown_students",
            Self::RateLimited => "rate_limited",
            Self::Store(_) => "storage_error",
        }
    }
}
