//! Subscriptions API endpoints.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    ServerError, server::ServerState,
    types::subscription::{
        SubscriptionListQuery, SubscriptionNew, SubscriptionUpdate, SubscriptionView,
    },
    user,
};

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<SubscriptionNew>,
) -> Result<(StatusCode, Json<SubscriptionView>), ServerError> {
    let mut cmd = engine::SubscriptionNewCmd::new(
        user.username.clone(),
        payload.account_id,
        payload.name,
        payload.amount_minor,
        payload.billing_cycle,
        payload.next_billing_date,
    );
    if let Some(category_id) = payload.category_id {
        cmd = cmd.category_id(category_id);
    }

    let sub = state.engine.create_subscription(cmd).await?;
    Ok((StatusCode::CREATED, Json(sub.into())))
}

pub async fn get(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SubscriptionView>, ServerError> {
    let sub = state.engine.subscription(&user.username, id).await?;
    Ok(Json(sub.into()))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<SubscriptionListQuery>,
) -> Result<Json<Vec<SubscriptionView>>, ServerError> {
    let subs = state
        .engine
        .list_subscriptions(&user.username, query.include_inactive)
        .await?;

    Ok(Json(subs.into_iter().map(SubscriptionView::from).collect()))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubscriptionUpdate>,
) -> Result<Json<SubscriptionView>, ServerError> {
    let mut cmd = engine::SubscriptionUpdateCmd::new(user.username.clone(), id);
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(amount_minor) = payload.amount_minor {
        cmd = cmd.amount_minor(amount_minor);
    }
    if let Some(billing_cycle) = payload.billing_cycle {
        cmd = cmd.billing_cycle(billing_cycle);
    }
    if let Some(next_billing_date) = payload.next_billing_date {
        cmd = cmd.next_billing_date(next_billing_date);
    }
    if let Some(category_id) = payload.category_id {
        cmd = cmd.category_id(category_id);
    }
    if let Some(is_active) = payload.is_active {
        cmd = cmd.is_active(is_active);
    }

    let sub = state.engine.update_subscription(cmd).await?;
    Ok(Json(sub.into()))
}

pub async fn remove(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_subscription(&user.username, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
