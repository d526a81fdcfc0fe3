//! Categories API endpoints.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    ServerError, server::ServerState,
    types::category::{CategoryNew, CategoryUpdate, CategoryView},
    user,
};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let category = state
        .engine
        .create_category(&user.username, &payload.name, payload.kind)
        .await?;

    Ok((StatusCode::CREATED, Json(category.into())))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state.engine.list_categories(&user.username).await?;
    Ok(Json(
        categories.into_iter().map(CategoryView::from).collect(),
    ))
}

pub async fn rename(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let category = state
        .engine
        .rename_category(&user.username, id, &payload.name)
        .await?;

    Ok(Json(category.into()))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
