//! # Services
//!
//! Use cases written against the [`ports`](crate::ports). Each service
//! holds `Arc<dyn Port>` handles and is cheap to clone into request state.
//!
//! | Service          | Ports used                                   |
//! |------------------|----------------------------------------------|
//! | [`OtpService`]   | OtpStore, SmsGateway, Clock                  |
//! | [`AuthService`]  | UserStore, SessionStore, PasswordHasher, TokenIssuer, OtpService |
//! | [`CatalogService`] | CatalogStore                               |
//! | [`CartService`]  | CartStore, CatalogStore                      |
//! | [`AddressService`] | AddressStore                               |
//! | [`OrderService`] | OrderStore, CartStore, AddressStore, Clock   |

pub mod address;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod otp;

#[cfg(test)]
pub(crate) mod testing;

pub use address::AddressService;
pub use auth::{
    AuthService, AuthSession, LoginOutcome, RegisterRequest, Registration, SocialLoginRequest,
};
pub use cart::{CartAdded, CartService, CartView};
pub use catalog::CatalogService;
pub use order::{OrderDetails, OrderService};
pub use otp::OtpService;
