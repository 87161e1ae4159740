//! # chai-db: Database Layer for Gaon Wali Chai
//!
//! SQLite persistence for the storefront. Every repository implements one
//! of the `chai_core::ports` traits so the services never see SQL.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Data Flow                                │
//! │                                                                         │
//! │  axum handler (apps/api)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  chai-core service (CartService, OrderService, ...)                    │
//! │       │  Arc<dyn Port>                                                  │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     chai-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │◄───│ Otp, User,    │    │  (embedded)  │  │   │
//! │  │   │  SqlitePool   │    │ Catalog, Cart │    │ 0001_init    │  │   │
//! │  │   │               │    │ Address, Order│    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (WAL)                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types and the mapping to `StoreError`
//! - [`repository`] - Store implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chai_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("chai.db")).await?;
//! let categories = db.catalog().list_categories().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::{
    AddressRepository, CartRepository, CatalogRepository, OrderRepository, OtpRepository,
    SessionRepository, UserRepository,
};
