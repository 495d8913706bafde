use std::collections::BTreeSet;

use time::PrimitiveDateTime;

use crate::services::errors::AttemptError;
use crate::store::AttemptStore;

/// Roster snapshot for a new test. Untargeted tests start with nobody assigned.
pub(crate) async fn snapshot_assignees(
    store: &dyn AttemptStore,
    organization: Option<&str>,
    class_name: Option<&str>,
) -> Result<Vec<String>, AttemptError> {
    if organization.is_none() && class_name.is_none() {
        return Ok(Vec::new());
    }
    Ok(store.roster_ids(organization, class_name).await?)
}

/// Adds students to the assigned set. Re-adding is a no-op; returns how many were new.
pub(crate) async fn assign(
    store: &dyn AttemptStore,
    test_id: &str,
    student_ids: &[String],
    now: PrimitiveDateTime,
) -> Result<u64, AttemptError> {
    if store.find_test(test_id).await?.is_none() {
        return Err(AttemptError::TestNotFound);
    }

    let requested: Vec<String> = student_ids
        .iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if requested.is_empty() {
        return Ok(0);
    }

    let known: BTreeSet<String> =
        store.existing_student_ids(&requested).await?.into_iter().collect();
    let unknown: Vec<String> = requested.iter().filter(|id| !known.contains(*id)).cloned().collect();
    if !unknown.is_empty() {
        return Err(AttemptError::UnknownStudents(unknown));
    }

    let added = store.assign_students(test_id, &requested, now).await?;
    tracing::info!(test_id, requested = requested.len(), added, "Students assigned");
    Ok(added)
}

/// Authorization gate in front of every attempt operation.
pub(crate) async fn ensure_assigned(
    store: &dyn AttemptStore,
    test_id: &str,
    student_id: &str,
) -> Result<(), AttemptError> {
    if store.is_assigned(test_id, student_id).await? {
        Ok(())
    } else {
        Err(AttemptError::NotAssigned)
    }
}
