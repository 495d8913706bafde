pub(crate) mod admission;
pub(crate) mod assignment;
pub(crate) mod attempt_sync;
pub(crate) mod attempts;
pub(crate) mod errors;
pub(crate) mod retry;
pub(crate) mod schedule_window;
pub(crate) mod scoring;
pub(crate) mod test_authoring;
