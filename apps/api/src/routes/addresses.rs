use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chai_core::{AddressInput, AddressPatch};
use serde_json::Value;

use super::{data, message, message_with, ApiJson};
use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::AppState;

pub async fn list(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    Ok(data(state.addresses().list(&auth.user_id).await?))
}

pub async fn show(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(data(state.addresses().get(&auth.user_id, &id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(input): ApiJson<AddressInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let address = state.addresses().create(&auth.user_id, input).await?;
    Ok((
        StatusCode::CREATED,
        message_with("Address added successfully", address),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<AddressPatch>,
) -> ApiResult<Json<Value>> {
    let address = state.addresses().update(&auth.user_id, &id, patch).await?;
    Ok(message_with("Address updated successfully", address))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.addresses().delete(&auth.user_id, &id).await?;
    Ok(message("Address deleted successfully"))
}
