use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::schemas::attempt::{
    AssignedTestResponse, AttemptProgress, AttemptStatusResponse, HistoryEntryResponse,
    SubmitRequest, SubmitResponse,
};
use crate::schemas::exam_test::ResultResponse;
use crate::services::attempts;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assigned))
        .route("/history", get(history))
        .route("/:test_id", get(attempt_status))
        .route("/:test_id/start", post(start))
        .route("/:test_id/submit", post(submit))
        .route("/:test_id/result", get(own_result))
}

async fn list_assigned(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignedTestResponse>>, ApiError> {
    let tests = attempts::list_assigned_tests(&state, &student.id).await?;
    Ok(Json(tests.into_iter().map(AssignedTestResponse::from).collect()))
}

async fn history(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let entries = attempts::attempt_history(&state, &student.id).await?;
    Ok(Json(entries.into_iter().map(HistoryEntryResponse::from).collect()))
}

async fn attempt_status(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<AttemptStatusResponse>, ApiError> {
    let overview = attempts::get_attempt_status(&state, &student.id, &test_id).await?;
    Ok(Json(AttemptStatusResponse::from(overview)))
}

async fn start(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<AttemptProgress>, ApiError> {
    let record = attempts::start_attempt(&state, &student.id, &test_id).await?;
    Ok(Json(AttemptProgress::from(record)))
}

async fn submit(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
    Json(payload): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let answers = payload.normalized_answers();
    let result = attempts::submit_attempt(&state, &student.id, &test_id, answers).await?;

    Ok(Json(SubmitResponse {
        result_id: result.id,
        test_id: result.test_id,
        score: result.score,
        out_of_marks: result.out_of_marks,
        attempted_at: format_primitive(result.attempted_at),
    }))
}

async fn own_result(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Path(test_id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let result = attempts::own_result(&state, &student.id, &test_id).await?;
    Ok(Json(ResultResponse::from(result)))
}
