use super::{ApiError, AppState, Viewer};
use crate::access::InstructionView;
use crate::accounts::{InstructionDraft, Redemption};
use crate::database::{Instruction, UserProfile};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RefQuery {
    #[serde(default)]
    pub code: String,
}

pub async fn redeem(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(query): Query<RefQuery>,
) -> Result<Json<Redemption>, ApiError> {
    let redemption = state.accounts.redeem_referral(viewer, &query.code).await?;
    Ok(Json(redemption))
}

pub async fn list(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Vec<InstructionView>>, ApiError> {
    let views = state.accounts.visible_instructions(viewer.as_ref()).await?;
    Ok(Json(views))
}

pub async fn open(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> Result<Json<Instruction>, ApiError> {
    let instruction = state.accounts.open_instruction(viewer.as_ref(), id).await?;
    Ok(Json(instruction))
}

pub async fn admin_list(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Vec<Instruction>>, ApiError> {
    let instructions = state.accounts.admin_list_instructions(viewer.as_ref()).await?;
    Ok(Json(instructions))
}

pub async fn admin_save(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Json(draft): Json<InstructionDraft>,
) -> Result<Json<Instruction>, ApiError> {
    let instruction = state
        .accounts
        .admin_save_instruction(viewer.as_ref(), draft)
        .await?;
    Ok(Json(instruction))
}

pub async fn admin_delete(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .accounts
        .admin_delete_instruction(viewer.as_ref(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_users(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
) -> Result<Json<Vec<UserProfile>>, ApiError> {
    let users = state.accounts.admin_list_users(viewer.as_ref()).await?;
    Ok(Json(users))
}
