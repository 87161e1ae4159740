//! # Gaon Wali Chai API
//!
//! REST server for the tea & snack delivery app.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          API Surface                                    │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  /api/auth     │  │  /api/products │  │  /api/cart                 ││
//! │  │                │  │  /api/categories│ │                            ││
//! │  │ • register     │  │                │  │ • view, add, update        ││
//! │  │ • verify-otp   │  │ • list (paged) │  │ • remove, clear            ││
//! │  │ • login        │  │ • show         │  │                            ││
//! │  │ • social-login │  │                │  │                            ││
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐            │
//! │  │ /api/addresses │  │  /api/orders   │  │  /health       │            │
//! │  │  CRUD          │  │ place, list,   │  │  /health/ready │            │
//! │  │                │  │ show, cancel   │  │                │            │
//! │  └────────────────┘  └────────────────┘  └────────────────┘            │
//! │                                                                         │
//! │  Infrastructure: SQLite (chai-db) · JWT bearer tokens · SMS gateway     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config`]. The essentials:
//! - `CHAI_DATABASE_URL` - SQLite URL (default: `sqlite://gaon_wali_chai.db`)
//! - `CHAI_PORT` - HTTP port (default: 8080)
//! - `CHAI_JWT_SECRET` - Secret for token signing (required)
//! - `CHAI_SMS__PROVIDER` - `log` or `twilio`

pub mod auth;
pub mod config;
pub mod error;
pub mod password;
pub mod routes;
pub mod sms;

use std::sync::Arc;

use chai_core::ports::{SmsGateway, SystemClock};
use chai_core::pricing::PricingEngine;
use chai_core::services::{
    AddressService, AuthService, CartService, CatalogService, OrderService, OtpService,
};
use chai_db::Database;

pub use auth::{AuthUser, JwtManager};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::router;

/// Shared application state.
///
/// Cheap to clone; handlers receive it through `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    jwt: Arc<JwtManager>,
    auth: AuthService,
    catalog: CatalogService,
    cart: CartService,
    addresses: AddressService,
    orders: OrderService,
    expose_otp: bool,
}

impl AppState {
    /// Wires the services over `db`'s repositories.
    pub fn new(db: Database, config: &ApiConfig, sms: Arc<dyn SmsGateway>) -> Self {
        let clock = Arc::new(SystemClock);
        let pricing = PricingEngine::default();
        let jwt = Arc::new(JwtManager::new(
            config.jwt_secret.clone(),
            config.jwt_lifetime_secs,
        ));

        let catalog_store = Arc::new(db.catalog());
        let cart_store = Arc::new(db.cart());
        let address_store = Arc::new(db.addresses());

        let otp = OtpService::new(Arc::new(db.otps()), sms, clock.clone());
        let auth = AuthService::new(
            Arc::new(db.users()),
            Arc::new(db.sessions()),
            otp,
            Arc::new(password::Argon2Hasher),
            jwt.clone(),
            clock.clone(),
        );
        let catalog = CatalogService::new(catalog_store.clone());
        let cart = CartService::new(cart_store.clone(), catalog_store, pricing);
        let addresses = AddressService::new(address_store.clone());
        let orders = OrderService::new(
            Arc::new(db.orders()),
            cart_store,
            address_store,
            pricing,
            clock,
        );

        AppState {
            inner: Arc::new(AppStateInner {
                db,
                jwt,
                auth,
                catalog,
                cart,
                addresses,
                orders,
                expose_otp: config.expose_otp,
            }),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.inner.jwt
    }

    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Whether OTP codes are echoed in responses (development only).
    pub fn expose_otp(&self) -> bool {
        self.inner.expose_otp
    }
}
