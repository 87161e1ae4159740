use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chai_core::order::OrderRequest;
use chai_core::{OrderStatus, PageRequest};
use serde::Deserialize;
use serde_json::Value;

use super::{data, message_with, paged, ApiJson, ApiQuery};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Prices the cart server-side; client totals are never read.
pub async fn place(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(request): ApiJson<OrderRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let order = state.orders().place_order(&auth.user_id, request).await?;
    Ok((
        StatusCode::CREATED,
        message_with("Order placed successfully", order),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Json<Value>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(OrderStatus::parse)
        .transpose()?;
    let page = PageRequest::new(query.page, query.per_page);
    Ok(paged(state.orders().list(&auth.user_id, status, page).await?))
}

pub async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_number): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(data(state.orders().get(&auth.user_id, &order_number).await?))
}

pub async fn cancel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_number): Path<String>,
) -> ApiResult<Json<Value>> {
    let order = state.orders().cancel(&auth.user_id, &order_number).await?;
    Ok(message_with("Order cancelled successfully", order))
}
