//! End-to-end tests: the full router over an in-memory database.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::Router;
use chai_api::config::{SmsConfig, SmsProvider};
use chai_api::{router, ApiConfig, AppState};
use chai_core::ports::{SmsError, SmsGateway};
use chai_core::{Category, Product, ProductSize, ProductVariant};
use chai_db::{Database, DbConfig};
use serde_json::{json, Value};
use tower::ServiceExt;

const PHONE: &str = "9876543210";
const PASSWORD: &str = "secret123";

#[derive(Default)]
struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, phone: &str, message: &str) -> Result<(), SmsError> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

fn config(expose_otp: bool) -> ApiConfig {
    ApiConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        database_url: "sqlite::memory:".to_string(),
        db_max_connections: 1,
        jwt_secret: "test-secret".to_string(),
        jwt_lifetime_secs: 3600,
        expose_otp,
        sms: SmsConfig {
            provider: SmsProvider::Log,
            account_sid: None,
            auth_token: None,
            from: None,
            default_country_code: "+91".to_string(),
            timeout_secs: 5,
        },
    }
}

struct TestApp {
    router: Router,
    sms: Arc<RecordingSms>,
}

async fn app_with(expose_otp: bool) -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    seed(&db).await;

    let sms = Arc::new(RecordingSms::default());
    let state = AppState::new(db, &config(expose_otp), sms.clone());
    TestApp {
        router: router(state),
        sms,
    }
}

async fn app() -> TestApp {
    app_with(true).await
}

async fn seed(db: &Database) {
    let catalog = db.catalog();
    catalog
        .insert_category(&Category {
            id: "cat-tea".to_string(),
            name: "Kulhad Tea".to_string(),
            icon: None,
            sort_order: 1,
            is_active: true,
        })
        .await
        .unwrap();

    for (id, name, featured, sort_order) in [
        ("p-chai", "Kulhad Chai", true, 1),
        ("p-masala", "Masala Chai", false, 2),
    ] {
        catalog
            .insert_product(&Product {
                id: id.to_string(),
                category_id: "cat-tea".to_string(),
                name: name.to_string(),
                description: None,
                base_price_paise: 5000,
                image: None,
                is_featured: featured,
                is_available: true,
                sort_order,
            })
            .await
            .unwrap();
    }

    catalog
        .insert_size(&ProductSize {
            id: "s-medium".to_string(),
            product_id: "p-chai".to_string(),
            name: "Medium".to_string(),
            price_paise: 7000,
            is_available: true,
        })
        .await
        .unwrap();

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
}

impl TestApp {
    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Registers and verifies `PHONE`, returning a bearer token.
    async fn signed_in(&self) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "name": "Asha", "phone": PHONE, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let otp = body["data"]["otp"].as_str().unwrap().to_string();

        let (status, body) = self
            .call(
                "POST",
                "/api/auth/verify-otp",
                None,
                Some(json!({ "phone": PHONE, "otp": otp })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health() {
    let app = app().await;

    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.call("GET", "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_registration_and_login() {
    let app = app().await;

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Asha", "phone": "+91 98765 43210", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["phone"], PHONE);
    assert_eq!(body["data"]["user"]["is_verified"], false);
    assert!(body["data"]["user"].get("password_hash").is_none());

    // Unverified: correct password still needs the OTP, and a new one is sent
    let (status, body) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "phone": PHONE, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let otp = body["data"]["otp"].as_str().unwrap().to_string();
    assert_eq!(app.sms.sent.lock().unwrap().len(), 2);

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/verify-otp",
            None,
            Some(json!({ "phone": PHONE, "otp": otp })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "phone": PHONE, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    let token = body["data"]["token"].as_str().unwrap();

    let (status, body) = app.call("GET", "/api/auth/user", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Asha");

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "phone": PHONE, "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_validation_and_conflicts() {
    let app = app().await;

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Asha", "phone": PHONE, "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert!(body["errors"]["password"].is_array());

    app.signed_in().await;
    let (status, body) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Ravi", "phone": PHONE, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "The phone has already been taken");

    let (status, body) = app
        .call("POST", "/api/auth/register", None, Some(json!({ "name": "Ravi" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_wrong_otp_rejected() {
    let app = app().await;
    app.call(
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Asha", "phone": PHONE, "password": PASSWORD })),
    )
    .await;

    let sent = app.sms.sent.lock().unwrap()[0].1.clone();
    let wrong = if sent.contains("000000") { "111111" } else { "000000" };
    let (status, body) = app
        .call(
            "POST",
            "/api/auth/verify-otp",
            None,
            Some(json!({ "phone": PHONE, "otp": wrong })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid or expired OTP");
}

#[tokio::test]
async fn test_otp_hidden_unless_exposed() {
    let app = app_with(false).await;

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "name": "Asha", "phone": PHONE, "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["otp"].is_null());
    assert!(app.sms.sent.lock().unwrap()[0].1.contains("verification code"));
}

#[tokio::test]
async fn test_password_reset() {
    let app = app().await;
    app.signed_in().await;

    // Unknown phones get the same answer
    let (status, body) = app
        .call(
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "phone": "9123456780" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["otp"].is_null());

    let (status, body) = app
        .call(
            "POST",
            "/api/auth/forgot-password",
            None,
            Some(json!({ "phone": PHONE })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let otp = body["data"]["otp"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/reset-password",
            None,
            Some(json!({ "phone": PHONE, "otp": otp, "password": "new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "phone": PHONE, "password": "new-secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bearer_token_required_and_revocable() {
    let app = app().await;

    let (status, _) = app.call("GET", "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("GET", "/api/cart", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.signed_in().await;
    let (status, _) = app.call("GET", "/api/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call("POST", "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call("GET", "/api/cart", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token has been revoked");
}

#[tokio::test]
async fn test_social_login_creates_verified_user() {
    let app = app().await;

    let body = json!({
        "provider": "google",
        "provider_id": "g-123",
        "name": "Meera",
        "email": "meera@example.com",
    });
    let (status, first) = app
        .call("POST", "/api/auth/social-login", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["user"]["is_verified"], true);

    let (_, second) = app
        .call("POST", "/api/auth/social-login", None, Some(body))
        .await;
    assert_eq!(second["data"]["user"]["id"], first["data"]["user"]["id"]);

    let (status, _) = app
        .call(
            "POST",
            "/api/auth/social-login",
            None,
            Some(json!({ "provider": "twitter", "provider_id": "t-1", "name": "X" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_catalog_browsing() {
    let app = app().await;

    let (status, body) = app.call("GET", "/api/categories", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = app
        .call("GET", "/api/products?per_page=1&page=2", None, None)
        .await;
    assert_eq!(body["data"][0]["id"], "p-masala");
    assert_eq!(body["meta"]["current_page"], 2);
    assert_eq!(body["meta"]["last_page"], 2);
    assert_eq!(body["meta"]["total"], 2);

    let (_, body) = app.call("GET", "/api/products?featured=1", None, None).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["id"], "p-chai");

    let (_, body) = app.call("GET", "/api/products?search=masala", None, None).await;
    assert_eq!(body["data"][0]["name"], "Masala Chai");

    let (status, body) = app.call("GET", "/api/products/p-chai", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sizes"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["variants"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["category"]["id"], "cat-tea");

    let (status, _) = app.call("GET", "/api/products/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cart_to_order() {
    let app = app().await;
    let token = app.signed_in().await;
    let token = Some(token.as_str());

    let (status, body) = app
        .call(
            "POST",
            "/api/addresses",
            token,
            Some(json!({
                "label": "Home",
                "address_line1": "12 MG Road",
                "city": "Pune",
                "state": "Maharashtra",
                "pincode": "411001",
                "is_default": true,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let address_id = body["data"]["id"].as_str().unwrap().to_string();

    let order_request = json!({
        "payment_method": "cash_on_delivery",
        "delivery_address_id": address_id,
        "special_instructions": "Less sugar",
    });
    // Empty cart cannot be ordered
    let (status, body) = app
        .call("POST", "/api/orders", token, Some(order_request.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");

    let (status, body) = app
        .call(
            "POST",
            "/api/cart",
            token,
            Some(json!({
                "product_id": "p-chai",
                "size_id": "s-medium",
                "quantity": 2,
                "variant_ids": ["v-ginger", "v-elaichi"],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["cart_count"], 2);

    // (7000 + 1000 + 1000) × 2 = 18000; 5% tax = 900; delivery 2000
    let (status, body) = app.call("GET", "/api/cart", token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["line_total"], 18000);
    assert_eq!(body["data"]["subtotal"], 18000);
    assert_eq!(body["data"]["tax"], 900);
    assert_eq!(body["data"]["delivery_fee"], 2000);
    assert_eq!(body["data"]["total"], 20900);

    let (status, body) = app
        .call("POST", "/api/orders", token, Some(order_request))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order = &body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["total_paise"], 20900);
    assert_eq!(order["items"][0]["product_name"], "Kulhad Chai");
    assert_eq!(order["items"][0]["variants"].as_array().unwrap().len(), 2);
    let number = order["order_number"].as_str().unwrap().to_string();
    assert!(number.starts_with("ORD-"));

    let (_, body) = app.call("GET", "/api/cart", token, None).await;
    assert!(body["data"]["items"].as_array().unwrap().is_empty());

    let (status, body) = app
        .call("GET", &format!("/api/orders/{number}"), token, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["delivery_address"]["id"], address_id);

    let (_, body) = app.call("GET", "/api/orders?status=pending", token, None).await;
    assert_eq!(body["meta"]["total"], 1);

    let (status, _) = app.call("GET", "/api/orders?status=lost", token, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let cancel = format!("/api/orders/{number}/cancel");
    let (status, body) = app.call("POST", &cancel, token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    let (status, body) = app.call("POST", &cancel, token, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Order cannot be cancelled at this stage");
}

#[tokio::test]
async fn test_cart_lines_are_private() {
    let app = app().await;
    let token = app.signed_in().await;

    let (_, body) = app
        .call(
            "POST",
            "/api/cart",
            Some(&token),
            Some(json!({ "product_id": "p-chai", "size_id": "s-medium", "quantity": 1 })),
        )
        .await;
    let line_id = body["data"]["cart_item_id"].as_str().unwrap().to_string();

    let (_, other) = app
        .call(
            "POST",
            "/api/auth/social-login",
            None,
            Some(json!({ "provider": "facebook", "provider_id": "fb-9", "name": "Ravi" })),
        )
        .await;
    let other_token = other["data"]["token"].as_str().unwrap();

    let (status, _) = app
        .call(
            "PUT",
            &format!("/api/cart/{line_id}"),
            Some(other_token),
            Some(json!({ "quantity": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            "PUT",
            &format!("/api/cart/{line_id}"),
            Some(&token),
            Some(json!({ "quantity": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["quantity"].is_array());

    let (status, _) = app
        .call("DELETE", &format!("/api/cart/{line_id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
