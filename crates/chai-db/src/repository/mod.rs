//! # Repository Module
//!
//! SQLite implementations of the `chai_core::ports` store traits.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  chai-core service                                                     │
//! │       │  Arc<dyn CartStore>                                            │
//! │       ▼                                                                 │
//! │  CartRepository                                                        │
//! │  ├── inherent methods → DbResult<T>   (used by seed, tests, ops)       │
//! │  └── impl CartStore   → StoreResult<T> (DbError → StoreError)          │
//! │       │                                                                 │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`OtpRepository`] - OTP rotation and single-use consumption
//! - [`UserRepository`] - Accounts and social provider links
//! - [`SessionRepository`] - Revoked bearer tokens
//! - [`CatalogRepository`] - Categories, products, sizes, variants
//! - [`CartRepository`] - Cart lines with revisions
//! - [`AddressRepository`] - Address book with a single default
//! - [`OrderRepository`] - Order placement and history

pub mod address;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod otp;
pub mod session;
pub mod user;

pub use address::AddressRepository;
pub use cart::CartRepository;
pub use catalog::CatalogRepository;
pub use order::OrderRepository;
pub use otp::OtpRepository;
pub use session::SessionRepository;
pub use user::UserRepository;

#[cfg(test)]
pub(crate) mod test_support {
    use chai_core::{AddressInput, AuthProvider, Category, NewUser, Product, ProductSize, ProductVariant, User};

    use crate::{Database, DbConfig};

    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn phone_user(phone: &str) -> NewUser {
        NewUser {
            name: "Asha".to_string(),
            phone: Some(phone.to_string()),
            email: None,
            password_hash: Some("hash".to_string()),
            profile_image: None,
            is_verified: false,
            auth_provider: AuthProvider::Phone,
            provider: None,
            provider_id: None,
        }
    }

    pub async fn create_user(db: &Database, phone: &str) -> User {
        db.users().create(&phone_user(phone)).await.unwrap()
    }

    pub fn address_input(label: &str, is_default: bool) -> AddressInput {
        AddressInput {
            label: label.to_string(),
            address_line1: "12 MG Road".to_string(),
            address_line2: None,
            city: "Pune".to_string(),
            state: "Maharashtra".to_string(),
            pincode: "411001".to_string(),
            is_default,
        }
    }

    pub struct CatalogIds {
        pub tea: String,
        pub chai: String,
        pub small: String,
        pub medium: String,
        pub large: String,
        pub ginger: String,
        pub elaichi: String,
        pub samosa: String,
        pub samosa_plate: String,
    }

    /// Two active categories and a hidden one; Kulhad Chai (featured, three
    /// sizes, two add-ons) and Samosa (one size).
    pub async fn seed_catalog(db: &Database) -> CatalogIds {
        let catalog = db.catalog();

        for (id, name, sort_order, is_active) in [
            ("cat-snacks", "Snacks", 2, true),
            ("cat-tea", "Kulhad Tea", 1, true),
            ("cat-hidden", "Hidden", 0, false),
        ] {
            catalog
                .insert_category(&Category {
                    id: id.to_string(),
                    name: name.to_string(),
                    icon: None,
                    sort_order,
                    is_active,
                })
                .await
                .unwrap();
        }

        let product = |id: &str, category: &str, name: &str, price: i64, featured: bool, sort: i64| Product {
            id: id.to_string(),
            category_id: category.to_string(),
            name: name.to_string(),
            description: None,
            base_price_paise: price,
            image: None,
            is_featured: featured,
            is_available: true,
            sort_order: sort,
        };
        catalog
            .insert_product(&product("p-chai", "cat-tea", "Kulhad Chai", 5000, true, 1))
            .await
            .unwrap();
        catalog
            .insert_product(&product("p-samosa", "cat-snacks", "Samosa", 3000, false, 2))
            .await
            .unwrap();

        for (id, product_id, name, price) in [
            ("s-small", "p-chai", "Small", 5000),
            ("s-medium", "p-chai", "Medium", 7000),
            ("s-large", "p-chai", "Large", 9000),
            ("s-plate", "p-samosa", "Plate", 3000),
        ] {
            catalog
                .insert_size(&ProductSize {
                    id: id.to_string(),
                    product_id: product_id.to_string(),
                    name: name.to_string(),
                    price_paise: price,
                    is_available: true,
                })
                .await
                .unwrap();
        }

        for (id, name) in [("v-ginger", "Ginger"), ("v-elaichi", "Elaichi")] {
            catalog
                .insert_variant(&ProductVariant {
                    id: id.to_string(),
                    product_id: "p-chai".to_string(),
                    name: name.to_string(),
                    price_paise: 1000,
                    image: None,
                    is_available: true,
                })
                .await
                .unwrap();
        }

        CatalogIds {
            tea: "cat-tea".to_string(),
            chai: "p-chai".to_string(),
            small: "s-small".to_string(),
            medium: "s-medium".to_string(),
            large: "s-large".to_string(),
            ginger: "v-ginger".to_string(),
            elaichi: "v-elaichi".to_string(),
            samosa: "p-samosa".to_string(),
            samosa_plate: "s-plate".to_string(),
        }
    }
}
