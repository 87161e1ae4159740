//! Read-only catalog browsing.

use std::sync::Arc;

use crate::error::{CoreError, CoreResult};
use crate::pagination::{Page, PageRequest};
use crate::ports::CatalogStore;
use crate::types::{Category, Product, ProductDetail, ProductFilter};
use crate::validation::validate_optional_text;

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        CatalogService { catalog }
    }

    pub async fn categories(&self) -> CoreResult<Vec<Category>> {
        Ok(self.catalog.list_categories().await?)
    }

    pub async fn category(&self, id: &str) -> CoreResult<Category> {
        self.catalog
            .find_category(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Category", id))
    }

    pub async fn products(
        &self,
        filter: ProductFilter,
        page: PageRequest,
    ) -> CoreResult<Page<Product>> {
        validate_optional_text("search", filter.search.as_deref(), 100)?;
        let filter = ProductFilter {
            search: filter
                .search
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            ..filter
        };
        Ok(self.catalog.list_products(&filter, page).await?)
    }

    /// An available product with only its available sizes and variants.
    pub async fn product(&self, id: &str) -> CoreResult<ProductDetail> {
        let mut detail = self
            .catalog
            .find_product(id)
            .await?
            .filter(|d| d.product.is_available)
            .ok_or_else(|| CoreError::not_found("Product", id))?;

        detail.sizes.retain(|s| s.is_available);
        detail.variants.retain(|v| v.is_available);
        Ok(detail)
    }
}
