use super::{ApiError, AppState, CurrentUser};
use crate::accounts::{CompleteRegistration, PasswordLogin, PhoneRegistration};
use crate::database::{User, UserProfile};
use crate::telegram::{self, TelegramAuthPayload};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct SendCodeRequest {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub needs_phone: bool,
    pub user: UserProfile,
}

fn session(state: &AppState, user: &User) -> Result<Json<SessionResponse>, ApiError> {
    Ok(Json(SessionResponse {
        token: state.tokens.issue(user)?,
        needs_phone: !user.phone_verified,
        user: UserProfile::from(user),
    }))
}

pub async fn send_code(
    State(state): State<AppState>,
    Json(request): Json<SendCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    let phone = state.accounts.request_phone_code(&request.phone).await?;
    Ok(Json(json!({
        "phone": phone,
        "channel": state.accounts.code_channel().to_string(),
    })))
}

pub async fn verify_phone(
    State(state): State<AppState>,
    Json(request): Json<PhoneRegistration>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state.accounts.register_or_login_with_phone(request).await?;
    session(&state, &user)
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<PasswordLogin>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state.accounts.login_with_password(request).await?;
    session(&state, &user)
}

// Redirect flavour of the Login Widget
pub async fn telegram_callback(
    State(state): State<AppState>,
    Query(payload): Query<TelegramAuthPayload>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state.accounts.telegram_login(payload).await?;
    session(&state, &user)
}

// Popup flavour of the Login Widget
pub async fn process_telegram_auth(
    State(state): State<AppState>,
    Json(payload): Json<TelegramAuthPayload>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state.accounts.telegram_login(payload).await?;
    session(&state, &user)
}

pub async fn complete_registration_send_code(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<SendCodeRequest>,
) -> Result<Json<Value>, ApiError> {
    let phone = state
        .accounts
        .request_completion_code(user.id, &request.phone)
        .await?;
    Ok(Json(json!({
        "phone": phone,
        "channel": state.accounts.code_channel().to_string(),
    })))
}

pub async fn complete_registration_verify(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CompleteRegistration>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state
        .accounts
        .complete_registration(user.id, request)
        .await?;
    session(&state, &user)
}

pub async fn profile(CurrentUser(user): CurrentUser) -> Json<UserProfile> {
    Json(UserProfile::from(&user))
}

pub async fn link_telegram_url(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Json<Value> {
    let link = &state.telegram;
    Json(json!({
        "url": telegram::login_url(&link.bot_id, &link.origin, &link.redirect_uri),
        "bot_username": link.bot_username,
    }))
}

pub async fn link_telegram(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<TelegramAuthPayload>,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.accounts.link_telegram(user.id, payload).await?;
    Ok(Json(UserProfile::from(&user)))
}

pub async fn unlink_telegram(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<UserProfile>, ApiError> {
    let user = state.accounts.unlink_telegram(user.id).await?;
    Ok(Json(UserProfile::from(&user)))
}
