//! Saved-design route handlers. Owner-scoped throughout.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use loomkart_core::DesignId;

use crate::db::designs::{Design, DesignRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::routes::{ApiData, ok};
use crate::state::AppState;

/// Request to save a design.
#[derive(Debug, Deserialize)]
pub struct CreateDesignRequest {
    pub name: Option<String>,
    pub preview_url: Option<String>,
    pub payload: Option<serde_json::Value>,
}

/// The caller's designs.
#[instrument(skip(user, state))]
pub async fn index(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<ApiData<Vec<Design>>>> {
    let repo = DesignRepository::new(state.pool());
    let designs = repo.list_by_user(user.id).await?;

    Ok(ok(designs))
}

/// Save a design.
#[instrument(skip(user, state, body))]
pub async fn create(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Json(body): Json<CreateDesignRequest>,
) -> Result<(StatusCode, Json<ApiData<Design>>)> {
    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::Validation("name is required".to_string()))?;
    let payload = body
        .payload
        .ok_or_else(|| AppError::Validation("payload is required".to_string()))?;

    let repo = DesignRepository::new(state.pool());
    let design = repo
        .create(user.id, name, body.preview_url.as_deref(), &payload)
        .await?;

    Ok((StatusCode::CREATED, ok(design)))
}

/// Design detail.
#[instrument(skip(user, state))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ApiData<Design>>> {
    let repo = DesignRepository::new(state.pool());
    let design = repo
        .get(user.id, DesignId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("design {id} not found")))?;

    Ok(ok(design))
}

/// Delete a design.
#[instrument(skip(user, state))]
pub async fn destroy(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>> {
    let repo = DesignRepository::new(state.pool());
    if !repo.delete(user.id, DesignId::new(id)).await? {
        return Err(AppError::NotFound(format!("design {id} not found")));
    }

    Ok(Json(json!({ "success": true, "message": "Design deleted" })))
}
