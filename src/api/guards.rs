use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::security::{self, AccountRole, Claims};
use crate::core::state::AppState;
use crate::db::models::Student;
use crate::services::attempts;

/// Verified bearer token of any role.
pub(crate) struct CurrentAccount(pub(crate) Claims);
/// Student profile linked to a student token.
pub(crate) struct CurrentStudent(pub(crate) Student);
/// Account id of a teacher token.
pub(crate) struct CurrentTeacher(pub(crate) String);

#[async_trait]
impl FromRequestParts<AppState> for CurrentAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        Ok(CurrentAccount(claims))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentAccount(claims) = CurrentAccount::from_request_parts(parts, state).await?;
        if claims.role != AccountRole::Student {
            return Err(ApiError::Forbidden("Student access required"));
        }

        let student = attempts::resolve_student(state, &claims.sub).await?;
        Ok(CurrentStudent(student))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentAccount(claims) = CurrentAccount::from_request_parts(parts, state).await?;
        if claims.role != AccountRole::Teacher {
            return Err(ApiError::Forbidden("Teacher access required"));
        }
        Ok(CurrentTeacher(claims.sub))
    }
}
