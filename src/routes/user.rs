use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use validator::Validate;

use crate::{
    dto::user_dto::{OtpStatusResponse, VerifyEmailRequest},
    error::Result,
    middleware::auth::Claims,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/users/send-otp",
    responses(
        (status = 200, description = "Code stored or still pending")
    )
)]
#[axum::debug_handler]
pub async fn send_otp(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let status = state.user_service.send_otp(&claims.email).await?;
    Ok(Json(OtpStatusResponse {
        status: status.as_str().to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/users/verify-email",
    responses(
        (status = 200, description = "Email verified"),
        (status = 400, description = "Incorrect code"),
        (status = 410, description = "Code expired")
    )
)]
#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let user_id = claims.user_id()?;
    state
        .user_service
        .verify_email(user_id, &claims.email, &payload.code)
        .await?;
    Ok(Json(OtpStatusResponse {
        status: "verified".to_string(),
    }))
}
