use axum::extract::{Path, State};
use axum::Json;
use chai_core::{PageRequest, ProductFilter, ValidationError};
use serde::Deserialize;
use serde_json::Value;

use super::{data, paged, ApiQuery};
use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<String>,
    /// `1`, `true`, `on`, `yes` select featured; anything else non-featured
    pub featured: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

impl ProductQuery {
    fn filter(&self) -> Result<ProductFilter, ValidationError> {
        if let Some(id) = &self.category_id {
            if id.trim().is_empty() {
                return Err(ValidationError::Required {
                    field: "category_id".to_string(),
                });
            }
        }
        Ok(ProductFilter {
            category_id: self.category_id.clone(),
            featured: self.featured.as_deref().map(parse_flag),
            search: self.search.clone(),
        })
    }
}

pub async fn categories(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    Ok(data(state.catalog().categories().await?))
}

pub async fn category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(data(state.catalog().category(&id).await?))
}

pub async fn products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Value>> {
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.per_page);
    Ok(paged(state.catalog().products(filter, page).await?))
}

pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    Ok(data(state.catalog().product(&id).await?))
}
