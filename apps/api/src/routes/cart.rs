use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chai_core::services::CartView;
use chai_core::{CartAddition, CartLineDetail, Money};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{data, message, message_with, ApiJson};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    pub quantity: i64,
}

#[derive(Serialize)]
struct CartItem<'a> {
    #[serde(flatten)]
    detail: &'a CartLineDetail,
    line_total: Money,
}

fn cart_json(view: &CartView) -> Value {
    let items: Vec<CartItem<'_>> = view
        .lines
        .iter()
        .map(|detail| CartItem {
            detail,
            line_total: detail.line_total(),
        })
        .collect();
    let item_count: i64 = view.lines.iter().map(|d| d.line.quantity).sum();

    json!({
        "items": items,
        "item_count": item_count,
        "subtotal": view.totals.subtotal,
        "tax": view.totals.tax,
        "delivery_fee": view.totals.delivery_fee,
        "total": view.totals.total,
    })
}

pub async fn view(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let view = state.cart().view(&auth.user_id).await?;
    Ok(data(cart_json(&view)))
}

pub async fn add(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(addition): ApiJson<CartAddition>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let added = state.cart().add(&auth.user_id, addition).await?;
    Ok((
        StatusCode::CREATED,
        message_with(
            "Item added to cart",
            json!({
                "cart_item_id": added.line.id,
                "quantity": added.line.quantity,
                "cart_count": added.cart_count,
            }),
        ),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<QuantityBody>,
) -> ApiResult<Json<Value>> {
    let line = state
        .cart()
        .update_quantity(&auth.user_id, &id, body.quantity)
        .await?;
    Ok(message_with("Cart item updated", line))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.cart().remove(&auth.user_id, &id).await?;
    Ok(message("Item removed from cart"))
}

pub async fn clear(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    state.cart().clear(&auth.user_id).await?;
    Ok(message("Cart cleared"))
}
