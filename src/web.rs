//! JSON endpoints standing in for the browser views.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::app::{AnswerOutcome, App, QuizActionError};
use crate::auth::{AuthSession, Profile, SignUp};
use crate::error::{AuthError, CredentialError};
use crate::gate::View;
use crate::models::{Letter, QuizConfig};
use crate::notice::Notice;
use crate::session::SessionView;

pub type AppState = Arc<App>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/view", get(current_view))
        .route("/notices", get(drain_notices))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-out", post(sign_out))
        .route("/auth/refresh", post(refresh_session))
        .route("/profile", get(profile))
        .route("/credential", post(submit_credential).delete(clear_credential))
        .route("/quiz", post(start_quiz).get(quiz_state).delete(exit_quiz))
        .route("/quiz/answer", post(answer))
        .route("/quiz/explanation", post(toggle_explanation))
        .route("/quiz/next", post(next_question))
        .route("/quiz/retry", post(retry_question))
        .route("/quiz/finish", post(finish_quiz))
        .route("/quiz/restart", post(restart_quiz))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

pub enum ApiError {
    Auth(AuthError),
    Credential(CredentialError),
    Quiz(QuizActionError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Auth(err)
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        Self::Credential(err)
    }
}

impl From<QuizActionError> for ApiError {
    fn from(err: QuizActionError) -> Self {
        Self::Quiz(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Auth(err) => {
                let status = match err {
                    AuthError::InvalidLogin | AuthError::NotSignedIn => StatusCode::UNAUTHORIZED,
                    AuthError::AlreadyRegistered => StatusCode::CONFLICT,
                    AuthError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    AuthError::Hashing(_) | AuthError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::Credential(err) => {
                let status = match err {
                    CredentialError::EmptyInput | CredentialError::Format => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    CredentialError::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
                    CredentialError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
            ApiError::Quiz(err) => {
                let status = match err {
                    QuizActionError::NotSignedIn => StatusCode::UNAUTHORIZED,
                    QuizActionError::NoQuiz => StatusCode::NOT_FOUND,
                    QuizActionError::Config(_) => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, err.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Serialize)]
struct ViewResponse {
    view: View,
}

async fn current_view(State(app): State<AppState>) -> Json<ViewResponse> {
    Json(ViewResponse { view: app.view() })
}

async fn drain_notices(State(app): State<AppState>) -> Json<Vec<Notice>> {
    Json(app.notices().drain())
}

async fn sign_up(
    State(app): State<AppState>,
    Json(form): Json<SignUp>,
) -> Result<Json<AuthSession>, ApiError> {
    Ok(Json(app.sign_up(form).await?))
}

#[derive(Deserialize)]
struct SignIn {
    email: String,
    password: String,
}

async fn sign_in(
    State(app): State<AppState>,
    Json(form): Json<SignIn>,
) -> Result<Json<AuthSession>, ApiError> {
    Ok(Json(app.sign_in(&form.email, &form.password).await?))
}

async fn sign_out(State(app): State<AppState>) -> Result<StatusCode, ApiError> {
    app.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn refresh_session(State(app): State<AppState>) -> Result<Json<AuthSession>, ApiError> {
    Ok(Json(app.refresh_session().await?))
}

async fn profile(State(app): State<AppState>) -> Result<Json<Profile>, ApiError> {
    app.profile()
        .await
        .map(Json)
        .ok_or(ApiError::Auth(AuthError::NotSignedIn))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialForm {
    api_key: String,
}

async fn submit_credential(
    State(app): State<AppState>,
    Json(form): Json<CredentialForm>,
) -> Result<StatusCode, ApiError> {
    app.submit_credential(&form.api_key).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_credential(State(app): State<AppState>) -> StatusCode {
    app.clear_credential();
    StatusCode::NO_CONTENT
}

async fn start_quiz(
    State(app): State<AppState>,
    Json(config): Json<QuizConfig>,
) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(app.start_quiz(config).await?))
}

async fn quiz_state(State(app): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(app.quiz_view()?))
}

#[derive(Deserialize)]
struct AnswerForm {
    answer: Letter,
}

async fn answer(
    State(app): State<AppState>,
    Json(form): Json<AnswerForm>,
) -> Result<Json<AnswerOutcome>, ApiError> {
    Ok(Json(app.answer(form.answer)?))
}

async fn toggle_explanation(State(app): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(app.toggle_explanation()?))
}

async fn next_question(State(app): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(app.next_question().await?))
}

async fn retry_question(State(app): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(app.retry_question().await?))
}

async fn finish_quiz(State(app): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(app.finish_quiz().await?))
}

async fn restart_quiz(State(app): State<AppState>) -> Result<Json<SessionView>, ApiError> {
    Ok(Json(app.restart_quiz().await?))
}

async fn exit_quiz(State(app): State<AppState>) -> Result<StatusCode, ApiError> {
    app.exit_quiz()?;
    Ok(StatusCode::NO_CONTENT)
}
