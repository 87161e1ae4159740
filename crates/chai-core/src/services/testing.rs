//! In-memory fakes for service tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::order::{Order, OrderStatus, PlacedOrder};
use crate::otp::{OtpPurpose, OtpRecord};
use crate::pagination::{Page, PageRequest};
use crate::ports::*;
use crate::types::*;

// =============================================================================
// Collaborators
// =============================================================================

pub struct FixedClock(Mutex<DateTime<Utc>>);

impl Default for FixedClock {
    fn default() -> Self {
        FixedClock(Mutex::new(
            "2024-01-15T10:00:00Z".parse().expect("valid timestamp"),
        ))
    }
}

impl FixedClock {
    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    fail_next: AtomicBool,
}

impl RecordingSms {
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, phone: &str, message: &str) -> Result<(), SmsError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(SmsError::Transport("network down".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}

pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, password: &str) -> Result<String, String> {
        Ok(format!("hashed:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        hash == format!("hashed:{password}")
    }
}

pub struct FakeTokens;

impl TokenIssuer for FakeTokens {
    fn issue(&self, user: &User) -> Result<IssuedToken, String> {
        Ok(IssuedToken {
            token: format!("token-for-{}", user.id),
            expires_in_secs: 3600,
        })
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Default)]
struct State {
    otps: Vec<OtpRecord>,
    users: Vec<User>,
    revoked: HashMap<String, DateTime<Utc>>,
    categories: Vec<Category>,
    products: Vec<Product>,
    sizes: Vec<ProductSize>,
    variants: Vec<ProductVariant>,
    cart: Vec<(CartLine, Vec<String>)>,
    addresses: Vec<Address>,
    orders: Vec<Order>,
    bump_on_place: bool,
}

/// Implements every store port over vectors behind one mutex.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl MemoryStore {
    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn otp(&self, id: &str) -> Option<OtpRecord> {
        self.with(|s| s.otps.iter().find(|o| o.id == id).cloned())
    }

    pub fn otp_count(&self) -> usize {
        self.with(|s| s.otps.len())
    }

    pub fn user_by_phone(&self, phone: &str) -> Option<User> {
        self.with(|s| s.users.iter().find(|u| u.phone.as_deref() == Some(phone)).cloned())
    }

    pub fn order_count(&self) -> usize {
        self.with(|s| s.orders.len())
    }

    pub fn set_product_available(&self, id: &str, available: bool) {
        self.with(|s| {
            for p in s.products.iter_mut().filter(|p| p.id == id) {
                p.is_available = available;
            }
        })
    }

    pub fn set_variant_available(&self, id: &str, available: bool) {
        self.with(|s| {
            for v in s.variants.iter_mut().filter(|v| v.id == id) {
                v.is_available = available;
            }
        })
    }

    pub fn set_size_price(&self, id: &str, price_paise: i64) {
        self.with(|s| {
            for size in s.sizes.iter_mut().filter(|size| size.id == id) {
                size.price_paise = price_paise;
            }
        })
    }

    /// Simulates a cart edit landing between snapshot and order write.
    pub fn bump_revisions_on_next_place(&self) {
        self.with(|s| s.bump_on_place = true)
    }

    fn update_user(&self, id: &str, f: impl FnOnce(&mut User)) -> StoreResult<User> {
        self.with(|s| {
            let user = s
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| StoreError::NotFound {
                    entity: "user".to_string(),
                    id: id.to_string(),
                })?;
            f(user);
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
    }
}

#[async_trait]
impl OtpStore for MemoryStore {
    async fn rotate(&self, record: &OtpRecord) -> StoreResult<()> {
        self.with(|s| {
            for otp in s
                .otps
                .iter_mut()
                .filter(|o| o.phone == record.phone && o.purpose == record.purpose && !o.is_used)
            {
                otp.is_used = true;
            }
            s.otps.push(record.clone());
        });
        Ok(())
    }

    async fn find_latest_unused(
        &self,
        phone: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> StoreResult<Option<OtpRecord>> {
        Ok(self.with(|s| {
            s.otps
                .iter()
                .rev()
                .find(|o| {
                    o.phone == phone && o.code.as_str() == code && o.purpose == purpose && !o.is_used
                })
                .cloned()
        }))
    }

    async fn consume(&self, id: &str) -> StoreResult<bool> {
        Ok(self.with(|s| match s.otps.iter_mut().find(|o| o.id == id && !o.is_used) {
            Some(otp) => {
                otp.is_used = true;
                true
            }
            None => false,
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &NewUser) -> StoreResult<User> {
        self.with(|s| {
            let duplicate = |field: &str| StoreError::Conflict {
                field: field.to_string(),
            };
            if user.phone.is_some() && s.users.iter().any(|u| u.phone == user.phone) {
                return Err(duplicate("phone"));
            }
            if user.email.is_some() && s.users.iter().any(|u| u.email == user.email) {
                return Err(duplicate("email"));
            }
            let now = Utc::now();
            let created = User {
                id: new_id(),
                name: user.name.clone(),
                phone: user.phone.clone(),
                email: user.email.clone(),
                password_hash: user.password_hash.clone(),
                profile_image: user.profile_image.clone(),
                is_verified: user.is_verified,
                phone_verified_at: None,
                auth_provider: user.auth_provider,
                provider: user.provider,
                provider_id: user.provider_id.clone(),
                created_at: now,
                updated_at: now,
            };
            s.users.push(created.clone());
            Ok(created)
        })
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.with(|s| s.users.iter().find(|u| u.id == id).cloned()))
    }

    async fn find_by_phone(&self, phone: &str) -> StoreResult<Option<User>> {
        Ok(self.user_by_phone(phone))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.with(|s| {
            s.users
                .iter()
                .find(|u| u.email.as_deref() == Some(email))
                .cloned()
        }))
    }

    async fn find_by_provider(
        &self,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StoreResult<Option<User>> {
        Ok(self.with(|s| {
            s.users
                .iter()
                .find(|u| u.provider == Some(provider) && u.provider_id.as_deref() == Some(provider_id))
                .cloned()
        }))
    }

    async fn mark_verified(&self, id: &str, at: DateTime<Utc>) -> StoreResult<User> {
        self.update_user(id, |u| {
            u.is_verified = true;
            u.phone_verified_at = Some(at);
        })
    }

    async fn set_password(&self, id: &str, password_hash: &str) -> StoreResult<()> {
        self.update_user(id, |u| u.password_hash = Some(password_hash.to_string()))
            .map(|_| ())
    }

    async fn link_provider(
        &self,
        id: &str,
        provider: AuthProvider,
        provider_id: &str,
    ) -> StoreResult<User> {
        self.update_user(id, |u| {
            u.provider = Some(provider);
            u.provider_id = Some(provider_id.to_string());
            u.is_verified = true;
        })
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> StoreResult<User> {
        self.update_user(id, |u| {
            if let Some(name) = &patch.name {
                u.name = name.clone();
            }
            if let Some(email) = &patch.email {
                u.email = Some(email.clone());
            }
            if let Some(image) = &patch.profile_image {
                u.profile_image = Some(image.clone());
            }
        })
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn revoke(&self, token_id: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        self.with(|s| s.revoked.insert(token_id.to_string(), expires_at));
        Ok(())
    }

    async fn is_revoked(&self, token_id: &str) -> StoreResult<bool> {
        Ok(self.with(|s| s.revoked.contains_key(token_id)))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        Ok(self.with(|s| {
            let mut list: Vec<Category> =
                s.categories.iter().filter(|c| c.is_active).cloned().collect();
            list.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
            list
        }))
    }

    async fn find_category(&self, id: &str) -> StoreResult<Option<Category>> {
        Ok(self.with(|s| {
            s.categories
                .iter()
                .find(|c| c.id == id && c.is_active)
                .cloned()
        }))
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> StoreResult<Page<Product>> {
        Ok(self.with(|s| {
            let search = filter.search.as_ref().map(|q| q.to_lowercase());
            let mut matching: Vec<Product> = s
                .products
                .iter()
                .filter(|p| p.is_available)
                .filter(|p| filter.category_id.as_ref().is_none_or(|c| &p.category_id == c))
                .filter(|p| filter.featured.is_none_or(|f| p.is_featured == f))
                .filter(|p| search.as_ref().is_none_or(|q| p.name.to_lowercase().contains(q)))
                .cloned()
                .collect();
            matching.sort_by(|a, b| (a.sort_order, &a.name).cmp(&(b.sort_order, &b.name)));
            let total = matching.len() as i64;
            let items = matching
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect();
            Page::new(items, total, page)
        }))
    }

    async fn find_product(&self, id: &str) -> StoreResult<Option<ProductDetail>> {
        Ok(self.with(|s| {
            let product = s.products.iter().find(|p| p.id == id)?.clone();
            Some(ProductDetail {
                category: s
                    .categories
                    .iter()
                    .find(|c| c.id == product.category_id)
                    .cloned(),
                sizes: s.sizes.iter().filter(|z| z.product_id == id).cloned().collect(),
                variants: s
                    .variants
                    .iter()
                    .filter(|v| v.product_id == id)
                    .cloned()
                    .collect(),
                product,
            })
        }))
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn lines(&self, user_id: &str) -> StoreResult<Vec<CartLineDetail>> {
        Ok(self.with(|s| {
            s.cart
                .iter()
                .filter(|(line, _)| line.user_id == user_id)
                .map(|(line, variant_ids)| CartLineDetail {
                    line: line.clone(),
                    product: s
                        .products
                        .iter()
                        .find(|p| p.id == line.product_id)
                        .cloned()
                        .expect("cart product exists"),
                    size: s
                        .sizes
                        .iter()
                        .find(|z| z.id == line.size_id)
                        .cloned()
                        .expect("cart size exists"),
                    variants: variant_ids
                        .iter()
                        .filter_map(|id| s.variants.iter().find(|v| &v.id == id).cloned())
                        .collect(),
                })
                .collect()
        }))
    }

    async fn upsert(
        &self,
        user_id: &str,
        addition: &CartAddition,
        max_quantity: i64,
    ) -> StoreResult<Option<CartLine>> {
        Ok(self.with(|s| {
            let now = Utc::now();
            if let Some((line, variants)) = s.cart.iter_mut().find(|(l, _)| {
                l.user_id == user_id
                    && l.product_id == addition.product_id
                    && l.size_id == addition.size_id
            }) {
                if line.quantity + addition.quantity > max_quantity {
                    return None;
                }
                line.quantity += addition.quantity;
                line.revision += 1;
                line.updated_at = now;
                if let Some(ids) = &addition.variant_ids {
                    *variants = ids.clone();
                }
                return Some(line.clone());
            }

            let line = CartLine {
                id: new_id(),
                user_id: user_id.to_string(),
                product_id: addition.product_id.clone(),
                size_id: addition.size_id.clone(),
                quantity: addition.quantity,
                revision: 0,
                created_at: now,
                updated_at: now,
            };
            s.cart
                .push((line.clone(), addition.variant_ids.clone().unwrap_or_default()));
            Some(line)
        }))
    }

    async fn set_quantity(
        &self,
        user_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> StoreResult<Option<CartLine>> {
        Ok(self.with(|s| {
            let (line, _) = s
                .cart
                .iter_mut()
                .find(|(l, _)| l.id == line_id && l.user_id == user_id)?;
            line.quantity = quantity;
            line.revision += 1;
            line.updated_at = Utc::now();
            Some(line.clone())
        }))
    }

    async fn remove(&self, user_id: &str, line_id: &str) -> StoreResult<bool> {
        Ok(self.with(|s| {
            let before = s.cart.len();
            s.cart
                .retain(|(l, _)| !(l.id == line_id && l.user_id == user_id));
            s.cart.len() < before
        }))
    }

    async fn clear(&self, user_id: &str) -> StoreResult<u64> {
        Ok(self.with(|s| {
            let before = s.cart.len();
            s.cart.retain(|(l, _)| l.user_id != user_id);
            (before - s.cart.len()) as u64
        }))
    }

    async fn item_count(&self, user_id: &str) -> StoreResult<i64> {
        Ok(self.with(|s| {
            s.cart
                .iter()
                .filter(|(l, _)| l.user_id == user_id)
                .map(|(l, _)| l.quantity)
                .sum()
        }))
    }
}

#[async_trait]
impl AddressStore for MemoryStore {
    async fn list(&self, user_id: &str) -> StoreResult<Vec<Address>> {
        Ok(self.with(|s| {
            let mut list: Vec<Address> = s
                .addresses
                .iter()
                .rev()
                .filter(|a| a.user_id == user_id)
                .cloned()
                .collect();
            list.sort_by_key(|a| !a.is_default);
            list
        }))
    }

    async fn find(&self, user_id: &str, id: &str) -> StoreResult<Option<Address>> {
        Ok(self.with(|s| {
            s.addresses
                .iter()
                .find(|a| a.id == id && a.user_id == user_id)
                .cloned()
        }))
    }

    async fn create(&self, user_id: &str, input: &AddressInput) -> StoreResult<Address> {
        Ok(self.with(|s| {
            if input.is_default {
                for a in s.addresses.iter_mut().filter(|a| a.user_id == user_id) {
                    a.is_default = false;
                }
            }
            let now = Utc::now();
            let address = Address {
                id: new_id(),
                user_id: user_id.to_string(),
                label: input.label.clone(),
                address_line1: input.address_line1.clone(),
                address_line2: input.address_line2.clone(),
                city: input.city.clone(),
                state: input.state.clone(),
                pincode: input.pincode.clone(),
                is_default: input.is_default,
                created_at: now,
                updated_at: now,
            };
            s.addresses.push(address.clone());
            address
        }))
    }

    async fn update(
        &self,
        user_id: &str,
        id: &str,
        patch: &AddressPatch,
    ) -> StoreResult<Option<Address>> {
        Ok(self.with(|s| {
            if !s.addresses.iter().any(|a| a.id == id && a.user_id == user_id) {
                return None;
            }
            if patch.is_default == Some(true) {
                for a in s.addresses.iter_mut().filter(|a| a.user_id == user_id) {
                    a.is_default = false;
                }
            }
            let address = s
                .addresses
                .iter_mut()
                .find(|a| a.id == id && a.user_id == user_id)?;
            patch.apply_to(address);
            address.updated_at = Utc::now();
            Some(address.clone())
        }))
    }

    async fn delete(&self, user_id: &str, id: &str) -> StoreResult<bool> {
        Ok(self.with(|s| {
            let before = s.addresses.len();
            s.addresses.retain(|a| !(a.id == id && a.user_id == user_id));
            s.addresses.len() < before
        }))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place(&self, placed: &PlacedOrder) -> StoreResult<()> {
        self.with(|s| {
            if std::mem::take(&mut s.bump_on_place) {
                for (line, _) in s.cart.iter_mut() {
                    line.revision += 1;
                }
            }
            for consumed in &placed.consumed_lines {
                let current = s.cart.iter().find(|(l, _)| l.id == consumed.id);
                if current.is_none_or(|(l, _)| l.revision != consumed.revision) {
                    return Err(StoreError::Stale(format!("cart line {}", consumed.id)));
                }
            }
            let address_id = placed.order.delivery_address_id.as_deref().unwrap_or_default();
            if !s
                .addresses
                .iter()
                .any(|a| a.id == address_id && a.user_id == placed.order.user_id)
            {
                return Err(StoreError::NotFound {
                    entity: "Address".to_string(),
                    id: address_id.to_string(),
                });
            }
            if s
                .orders
                .iter()
                .any(|o| o.order_number == placed.order.order_number)
            {
                return Err(StoreError::Conflict {
                    field: "order_number".to_string(),
                });
            }
            s.orders.push(placed.order.clone());
            s.cart
                .retain(|(l, _)| !placed.consumed_lines.iter().any(|c| c.id == l.id));
            Ok(())
        })
    }

    async fn find_by_number(
        &self,
        user_id: &str,
        order_number: &str,
    ) -> StoreResult<Option<Order>> {
        Ok(self.with(|s| {
            s.orders
                .iter()
                .find(|o| o.user_id == user_id && o.order_number == order_number)
                .cloned()
        }))
    }

    async fn list(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> StoreResult<Page<Order>> {
        Ok(self.with(|s| {
            let matching: Vec<Order> = s
                .orders
                .iter()
                .rev()
                .filter(|o| o.user_id == user_id)
                .filter(|o| status.is_none_or(|st| o.status == st))
                .map(|o| Order {
                    items: Vec::new(),
                    ..o.clone()
                })
                .collect();
            let total = matching.len() as i64;
            let items = matching
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect();
            Page::new(items, total, page)
        }))
    }

    async fn update_status(
        &self,
        order_id: &str,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self.with(|s| {
            match s
                .orders
                .iter_mut()
                .find(|o| o.id == order_id && o.status == from)
            {
                Some(order) => {
                    order.status = to;
                    order.updated_at = at;
                    true
                }
                None => false,
            }
        }))
    }
}

// =============================================================================
// Catalog Fixture
// =============================================================================

/// Ids of the seeded fixture catalog.
pub struct CatalogIds {
    pub tea: String,
    pub snacks: String,
    pub chai: String,
    pub small: String,
    pub medium: String,
    pub large: String,
    pub ginger: String,
    pub elaichi: String,
    pub samosa: String,
    pub samosa_plate: String,
}

/// Kulhad Chai (Small ₹50 / Medium ₹70 / Large ₹90, Ginger and Elaichi
/// add-ons at ₹10) and Samosa (Plate ₹30).
pub fn seed_catalog(store: &MemoryStore) -> CatalogIds {
    let ids = CatalogIds {
        tea: new_id(),
        snacks: new_id(),
        chai: new_id(),
        small: new_id(),
        medium: new_id(),
        large: new_id(),
        ginger: new_id(),
        elaichi: new_id(),
        samosa: new_id(),
        samosa_plate: new_id(),
    };

    store.with(|s| {
        for (id, name, order) in [(&ids.tea, "Kulhad Tea", 1), (&ids.snacks, "Snacks", 2)] {
            s.categories.push(Category {
                id: id.clone(),
                name: name.to_string(),
                icon: None,
                sort_order: order,
                is_active: true,
            });
        }

        for (id, category, name, price, order) in [
            (&ids.chai, &ids.tea, "Kulhad Chai", 5000, 1),
            (&ids.samosa, &ids.snacks, "Samosa", 3000, 2),
        ] {
            s.products.push(Product {
                id: id.clone(),
                category_id: category.clone(),
                name: name.to_string(),
                description: None,
                base_price_paise: price,
                image: None,
                is_featured: id == &ids.chai,
                is_available: true,
                sort_order: order,
            });
        }

        for (id, product, name, price) in [
            (&ids.small, &ids.chai, "Small", 5000),
            (&ids.medium, &ids.chai, "Medium", 7000),
            (&ids.large, &ids.chai, "Large", 9000),
            (&ids.samosa_plate, &ids.samosa, "Plate", 3000),
        ] {
            s.sizes.push(ProductSize {
                id: id.clone(),
                product_id: product.clone(),
                name: name.to_string(),
                price_paise: price,
                is_available: true,
            });
        }

        for (id, name) in [(&ids.ginger, "Ginger"), (&ids.elaichi, "Elaichi")] {
            s.variants.push(ProductVariant {
                id: id.clone(),
                product_id: ids.chai.clone(),
                name: name.to_string(),
                price_paise: 1000,
                image: None,
                is_available: true,
            });
        }
    });

    ids
}
