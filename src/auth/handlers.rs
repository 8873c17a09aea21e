use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{AuthResponse, PublicUser, SignInRequest, SignUpRequest, UserResponse},
        guard::{AuthUser, CurrentUser},
        repo_types::ProfileUpdate,
        services::{AuthService, SignUpProfile},
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/signup",
            post(sign_up).fallback(|| async { ApiError::MethodNotAllowed("POST") }),
        )
        .route(
            "/auth/signin",
            post(sign_in).fallback(|| async { ApiError::MethodNotAllowed("POST") }),
        )
        .route(
            "/auth/user",
            get(get_user)
                .patch(update_user)
                .fallback(|| async { ApiError::MethodNotAllowed("GET, HEAD, PATCH") }),
        )
}

pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::Validation(e.body_text()))
}

#[instrument(skip(auth, payload))]
pub async fn sign_up(
    State(auth): State<AuthService>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let req = json_body(payload)?;
    let profile = SignUpProfile {
        name: req.name,
        phone: req.phone,
        address: req.address,
    };
    let session = auth.sign_up(&req.email, &req.password, profile).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: session.user.into(),
            token: session.token,
        }),
    ))
}

#[instrument(skip(auth, payload))]
pub async fn sign_in(
    State(auth): State<AuthService>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let req = json_body(payload)?;
    let session = auth.sign_in(&req.email, &req.password).await?;
    Ok(Json(AuthResponse {
        user: session.user.into(),
        token: session.token,
    }))
}

#[instrument(skip_all)]
pub async fn get_user(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(UserResponse { user: user.into() })
}

#[instrument(skip_all)]
pub async fn update_user(
    State(auth): State<AuthService>,
    AuthUser(identity): AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let update = json_body(payload)?;
    let user = auth.update_profile(identity.user_id, update).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(Json(UserResponse {
        user: PublicUser::from(user),
    }))
}
