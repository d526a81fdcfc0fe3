//! Accounts API endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    ServerError, server::ServerState,
    types::account::{AccountDeleted, AccountListQuery, AccountNew, AccountUpdate, AccountView},
    user,
};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let currency = payload.currency.unwrap_or_default();
    let account = state
        .engine
        .create_account(&user.username, &payload.name, currency)
        .await?;

    Ok((StatusCode::CREATED, Json(account.into())))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(&user.username, id).await?;
    Ok(Json(account.into()))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<AccountListQuery>,
) -> Result<Json<Vec<AccountView>>, ServerError> {
    let accounts = state
        .engine
        .list_accounts(&user.username, query.include_inactive)
        .await?;

    Ok(Json(accounts.into_iter().map(AccountView::from).collect()))
}

pub async fn rename(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state
        .engine
        .rename_account(&user.username, id, &payload.name)
        .await?;

    Ok(Json(account.into()))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountDeleted>, ServerError> {
    let removal = state.engine.delete_account(&user.username, id).await?;
    Ok(Json(removal.into()))
}
