//! # Catalog Repository
//!
//! Categories, products, sizes and variants. The API only reads the
//! catalog; the insert methods exist for the `seed` binary and tests.
//!
//! ## Listing Query
//! ```text
//! products WHERE is_available = 1
//!   AND (?category IS NULL OR category_id = ?category)
//!   AND (?featured IS NULL OR is_featured = ?featured)
//!   AND (?search   IS NULL OR instr(lower(name), lower(?search)) > 0)
//! ORDER BY sort_order, name
//! LIMIT per_page OFFSET (page - 1) * per_page
//! ```
//! `instr` instead of `LIKE` keeps `%` and `_` in a search literal.

use async_trait::async_trait;
use chai_core::ports::{CatalogStore, StoreResult};
use chai_core::{
    Category, Page, PageRequest, Product, ProductDetail, ProductFilter, ProductSize,
    ProductVariant,
};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

const PRODUCT_COLUMNS: &str = r#"
    id, category_id, name, description, base_price_paise, image,
    is_featured, is_available, sort_order
"#;

const PRODUCT_FILTER: &str = r#"
    is_available = 1
    AND (?1 IS NULL OR category_id = ?1)
    AND (?2 IS NULL OR is_featured = ?2)
    AND (?3 IS NULL OR instr(lower(name), lower(?3)) > 0)
"#;

/// Repository for the catalog tables.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn list_categories(&self) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, icon, sort_order, is_active
            FROM categories
            WHERE is_active = 1
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn get_category(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, icon, sort_order, is_active FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> DbResult<Page<Product>> {
        debug!(?filter, page = page.page(), per_page = page.per_page(), "Listing products");

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM products WHERE {}", PRODUCT_FILTER))
                .bind(&filter.category_id)
                .bind(filter.featured)
                .bind(&filter.search)
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            "SELECT {} FROM products WHERE {} ORDER BY sort_order, name LIMIT ?4 OFFSET ?5",
            PRODUCT_COLUMNS, PRODUCT_FILTER
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(&filter.category_id)
            .bind(filter.featured)
            .bind(&filter.search)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(products, total, page))
    }

    pub async fn get_product(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// Product with its category and every size and variant.
    pub async fn get_product_detail(&self, id: &str) -> DbResult<Option<ProductDetail>> {
        let Some(product) = self.get_product(id).await? else {
            return Ok(None);
        };

        let category = self.get_category(&product.category_id).await?;
        let sizes = self.sizes_of(id).await?;
        let variants = self.variants_of(id).await?;

        Ok(Some(ProductDetail {
            product,
            category,
            sizes,
            variants,
        }))
    }

    pub async fn sizes_of(&self, product_id: &str) -> DbResult<Vec<ProductSize>> {
        let sizes = sqlx::query_as::<_, ProductSize>(
            r#"
            SELECT id, product_id, name, price_paise, is_available
            FROM product_sizes
            WHERE product_id = ?1
            ORDER BY price_paise, name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sizes)
    }

    pub async fn variants_of(&self, product_id: &str) -> DbResult<Vec<ProductVariant>> {
        let variants = sqlx::query_as::<_, ProductVariant>(
            r#"
            SELECT id, product_id, name, price_paise, image, is_available
            FROM product_variants
            WHERE product_id = ?1
            ORDER BY price_paise, name
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(variants)
    }

    /// Number of products, available or not.
    pub async fn count_products(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Writes (seed data)
    // =========================================================================

    pub async fn insert_category(&self, category: &Category) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (id, name, icon, sort_order, is_active)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.icon)
        .bind(category.sort_order)
        .bind(category.is_active)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, category_id, name, description, base_price_paise, image,
                is_featured, is_available, sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.base_price_paise)
        .bind(&product.image)
        .bind(product.is_featured)
        .bind(product.is_available)
        .bind(product.sort_order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_size(&self, size: &ProductSize) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_sizes (id, product_id, name, price_paise, is_available)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&size.id)
        .bind(&size.product_id)
        .bind(&size.name)
        .bind(size.price_paise)
        .bind(size.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_variant(&self, variant: &ProductVariant) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO product_variants (id, product_id, name, price_paise, image, is_available)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.name)
        .bind(variant.price_paise)
        .bind(&variant.image)
        .bind(variant.is_available)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Takes a product on or off sale.
    pub async fn set_product_available(&self, id: &str, available: bool) -> DbResult<bool> {
        let result = sqlx::query("UPDATE products SET is_available = ?2 WHERE id = ?1")
            .bind(id)
            .bind(available)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Reprices a size. Existing orders keep the price they were placed at.
    pub async fn set_size_price(&self, id: &str, price_paise: i64) -> DbResult<bool> {
        let result = sqlx::query("UPDATE product_sizes SET price_paise = ?2 WHERE id = ?1")
            .bind(id)
            .bind(price_paise)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl CatalogStore for CatalogRepository {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(CatalogRepository::list_categories(self).await?)
    }

    async fn find_category(&self, id: &str) -> StoreResult<Option<Category>> {
        Ok(self.get_category(id).await?.filter(|c| c.is_active))
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        Ok(CatalogRepository::list_products(self, filter, page).await?)
    }

    async fn find_product(&self, id: &str) -> StoreResult<Option<ProductDetail>> {
        Ok(self.get_product_detail(id).await?)
    }
}
