pub(crate) mod assignments;
pub(crate) mod attempt_history;
pub(crate) mod attempt_statuses;
pub(crate) mod consistency;
pub(crate) mod reservations;
pub(crate) mod results;
pub(crate) mod students;
