use axum::{extract::State, http::StatusCode, response::Json};
use validator::Validate;

use crate::{
    AppState,
    error::Result,
    models::{LoginRequest, SignupRequest, TokenResponse},
    services::user_service,
};

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    payload.validate()?;

    let token = user_service::signup(state.users.as_ref(), &state.config, payload).await?;

    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    payload.validate()?;

    let token = user_service::login(state.users.as_ref(), &state.config, payload).await?;

    Ok(Json(TokenResponse { token }))
}
