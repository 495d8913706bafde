use sqlx::types::Json;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::db::models::{ExamTest, Question, ResultRecord};
use crate::services::assignment;
use crate::services::errors::AttemptError;
use crate::services::scoring;

#[derive(Debug, Clone)]
pub(crate) struct TestDraft {
    pub(crate) title: String,
    pub(crate) scheduled_at: Option<PrimitiveDateTime>,
    pub(crate) duration_minutes: i32,
    pub(crate) questions: Vec<Question>,
    pub(crate) organization: Option<String>,
    pub(crate) class_name: Option<String>,
}

#[derive(Debug)]
pub(crate) struct CreatedTest {
    pub(crate) test: ExamTest,
    pub(crate) assigned_student_ids: Vec<String>,
}

/// Persists a validated draft. The assigned set is the roster snapshot taken now.
pub(crate) async fn create_test(
    state: &AppState,
    teacher_id: &str,
    draft: TestDraft,
) -> Result<CreatedTest, AttemptError> {
    let store = state.store();
    let assignees = assignment::snapshot_assignees(
        store,
        draft.organization.as_deref(),
        draft.class_name.as_deref(),
    )
    .await?;

    let test = ExamTest {
        id: Uuid::new_v4().to_string(),
        teacher_id: teacher_id.to_string(),
        title: draft.title,
        scheduled_at: draft.scheduled_at,
        duration_minutes: draft.duration_minutes,
        out_of_marks: scoring::out_of_marks(&draft.questions),
        questions: Json(draft.questions),
        organization: draft.organization,
        class_name: draft.class_name,
        created_at: state.now(),
    };

    store.create_test(&test, &assignees).await?;
    tracing::info!(
        test_id = %test.id,
        teacher_id,
        assigned = assignees.len(),
        "Test created"
    );

    Ok(CreatedTest { test, assigned_student_ids: assignees })
}

async fn load_owned_test(
    state: &AppState,
    teacher_id: &str,
    test_id: &str,
) -> Result<ExamTest, AttemptError> {
    let test = state.store().find_test(test_id).await?.ok_or(AttemptError::TestNotFound)?;
    if test.teacher_id != teacher_id {
        return Err(AttemptError::NotTestOwner);
    }
    Ok(test)
}

pub(crate) async fn assign_students(
    state: &AppState,
    teacher_id: &str,
    test_id: &str,
    student_ids: &[String],
) -> Result<u64, AttemptError> {
    load_owned_test(state, teacher_id, test_id).await?;
    assignment::assign(state.store(), test_id, student_ids, state.now()).await
}

pub(crate) async fn list_results(
    state: &AppState,
    teacher_id: &str,
    test_id: &str,
) -> Result<Vec<ResultRecord>, AttemptError> {
    load_owned_test(state, teacher_id, test_id).await?;
    Ok(state.store().results_for_test(test_id).await?)
}

/// Sets or clears the teacher's note; nothing else on a result ever changes.
pub(crate) async fn annotate_feedback(
    state: &AppState,
    teacher_id: &str,
    test_id: &str,
    student_id: &str,
    feedback: Option<&str>,
) -> Result<ResultRecord, AttemptError> {
    load_owned_test(state, teacher_id, test_id).await?;
    let feedback = feedback.map(str::trim).filter(|text| !text.is_empty());

    if !state.store().set_feedback(test_id, student_id, feedback).await? {
        return Err(AttemptError::ResultNotFound);
    }
    state.store().find_result(test_id, student_id).await?.ok_or(AttemptError::ResultNotFound)
}
