//! Transactions API endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use engine::{TransactionKind, TransactionListFilter};
use uuid::Uuid;

use crate::{
    ServerError, server::ServerState,
    types::transaction::{
        TransactionListQuery, TransactionListResponse, TransactionNew, TransactionUpdate,
        TransactionView,
    },
    user,
};

fn parse_kinds(raw: &str) -> Result<Vec<TransactionKind>, ServerError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            TransactionKind::try_from(part)
                .map_err(|_| ServerError::Generic(format!("unknown transaction kind: {part}")))
        })
        .collect()
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let mut cmd = engine::TransactionNewCmd::new(
        user.username.clone(),
        payload.account_id,
        payload.kind,
        payload.amount_minor,
        payload.occurred_at,
    );
    if let Some(category_id) = payload.category_id {
        cmd = cmd.category_id(category_id);
    }
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }

    let tx = state.engine.create_transaction(cmd).await?;
    Ok((StatusCode::CREATED, Json(tx.into())))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state.engine.transaction(&user.username, id).await?;
    Ok(Json(tx.into()))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let kinds = query.kinds.as_deref().map(parse_kinds).transpose()?;

    let filter = TransactionListFilter {
        account_id: query.account_id,
        from: query.from,
        to: query.to,
        kinds,
    };

    let limit = query.limit.unwrap_or(50);
    let page = state
        .engine
        .list_transactions(&user.username, &filter, limit, query.cursor.as_deref())
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: page.items.into_iter().map(TransactionView::from).collect(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let mut cmd = engine::TransactionUpdateCmd::new(user.username.clone(), id);
    if let Some(account_id) = payload.account_id {
        cmd = cmd.account_id(account_id);
    }
    if let Some(kind) = payload.kind {
        cmd = cmd.kind(kind);
    }
    if let Some(amount_minor) = payload.amount_minor {
        cmd = cmd.amount_minor(amount_minor);
    }
    if let Some(occurred_at) = payload.occurred_at {
        cmd = cmd.occurred_at(occurred_at);
    }
    if let Some(category_id) = payload.category_id {
        cmd = cmd.category_id(category_id);
    }
    if let Some(note) = payload.note {
        cmd = cmd.note(note);
    }

    let tx = state.engine.update_transaction(cmd).await?;
    Ok(Json(tx.into()))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_transaction(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
