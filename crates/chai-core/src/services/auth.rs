//! Account registration, login and profile use cases.
//!
//! ```text
//! register ──► user (unverified) + registration OTP
//!                       │
//! verify_registration ◄─┘  OTP ok → user verified → bearer token
//!
//! login ──► wrong phone/password ─────────► InvalidCredentials
//!       ├─► unverified ──► new OTP ───────► VerificationRequired
//!       └─► verified ─────────────────────► bearer token
//!
//! forgot_password ──► OTP (forgot_password) ──► reset_password
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};
use crate::otp::{OtpCode, OtpPurpose, OtpRecord};
use crate::ports::{
    Clock, IssuedToken, PasswordHasher, SessionStore, StoreError, TokenIssuer, UserStore,
};
use crate::services::otp::OtpService;
use crate::types::{AuthProvider, NewUser, ProfilePatch, User};
use crate::validation::{
    normalize_phone, validate_email, validate_name, validate_optional_text, validate_password,
    validate_profile_patch, validate_required_text,
};

// =============================================================================
// Requests & Outcomes
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialLoginRequest {
    pub provider: String,
    pub provider_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// A freshly registered, unverified account and the OTP sent to it.
#[derive(Debug, Clone)]
pub struct Registration {
    pub user: User,
    pub otp: OtpRecord,
}

/// An authenticated user and their bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub token: IssuedToken,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Authenticated(AuthSession),
    /// Credentials were right but the phone is unverified. A new
    /// registration OTP has been sent.
    VerificationRequired { user: User, otp: OtpRecord },
}

// =============================================================================
// Service
// =============================================================================

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    otp: OtpService,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenIssuer>,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        otp: OtpService,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenIssuer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AuthService {
            users,
            sessions,
            otp,
            hasher,
            tokens,
            clock,
        }
    }

    /// Creates an unverified phone account and sends a registration OTP.
    pub async fn register(&self, request: RegisterRequest) -> CoreResult<Registration> {
        validate_name(&request.name)?;
        let phone = normalize_phone(&request.phone)?;
        validate_password(&request.password)?;

        if self.users.find_by_phone(&phone).await?.is_some() {
            return Err(CoreError::AlreadyTaken {
                field: "phone",
                value: phone,
            });
        }

        let password_hash = self.hash_password(&request.password)?;
        let user = self
            .users
            .create(&NewUser {
                name: request.name.trim().to_string(),
                phone: Some(phone.clone()),
                email: None,
                password_hash: Some(password_hash),
                profile_image: None,
                is_verified: false,
                auth_provider: AuthProvider::Phone,
                provider: None,
                provider_id: None,
            })
            .await
            .map_err(|e| taken_or(e, "phone", &phone))?;

        let otp = self.otp.issue(&phone, OtpPurpose::Registration).await?;
        info!(user_id = %user.id, "User registered");
        Ok(Registration { user, otp })
    }

    /// Verifies a registration OTP, marks the phone verified and logs in.
    pub async fn verify_registration(&self, phone: &str, code: &str) -> CoreResult<AuthSession> {
        let phone = normalize_phone(phone)?;
        let code = OtpCode::parse(code)?;

        if !self
            .otp
            .verify_otp(&phone, &code, OtpPurpose::Registration)
            .await?
        {
            return Err(CoreError::InvalidOtp);
        }

        let user = self
            .users
            .find_by_phone(&phone)
            .await?
            .ok_or_else(|| CoreError::not_found("User", &phone))?;
        let user = self.users.mark_verified(&user.id, self.clock.now()).await?;

        info!(user_id = %user.id, "Phone verified");
        self.session_for(user)
    }

    /// Sends a new OTP for `purpose`.
    ///
    /// Registration codes need an existing unverified account. Reset codes
    /// for unknown phones return `None` without storing anything.
    pub async fn resend_otp(
        &self,
        phone: &str,
        purpose: OtpPurpose,
    ) -> CoreResult<Option<OtpRecord>> {
        match purpose {
            OtpPurpose::ForgotPassword => self.forgot_password(phone).await,
            OtpPurpose::Registration => {
                let phone = normalize_phone(phone)?;
                let user = self
                    .users
                    .find_by_phone(&phone)
                    .await?
                    .ok_or_else(|| CoreError::not_found("User", &phone))?;
                if user.is_verified {
                    return Err(CoreError::AlreadyVerified);
                }
                Ok(Some(self.otp.issue(&phone, purpose).await?))
            }
        }
    }

    pub async fn login(&self, phone: &str, password: &str) -> CoreResult<LoginOutcome> {
        let phone = normalize_phone(phone).map_err(|_| CoreError::InvalidCredentials)?;

        let user = match self.users.find_by_phone(&phone).await? {
            Some(user) => user,
            None => return Err(CoreError::InvalidCredentials),
        };

        let matches = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.hasher.verify(password, hash));
        if !matches {
            warn!(user_id = %user.id, "Login rejected: bad password");
            return Err(CoreError::InvalidCredentials);
        }

        if !user.is_verified {
            let otp = self.otp.issue(&phone, OtpPurpose::Registration).await?;
            return Ok(LoginOutcome::VerificationRequired { user, otp });
        }

        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome::Authenticated(self.session_for(user)?))
    }

    /// Sends a password reset OTP. Unknown phones get `None` and nothing is
    /// stored; callers answer both cases the same way.
    pub async fn forgot_password(&self, phone: &str) -> CoreResult<Option<OtpRecord>> {
        let phone = normalize_phone(phone)?;
        if self.users.find_by_phone(&phone).await?.is_none() {
            info!("Password reset requested for unknown phone");
            return Ok(None);
        }
        Ok(Some(self.otp.issue(&phone, OtpPurpose::ForgotPassword).await?))
    }

    pub async fn reset_password(&self, phone: &str, code: &str, password: &str) -> CoreResult<()> {
        let phone = normalize_phone(phone)?;
        let code = OtpCode::parse(code)?;
        validate_password(password)?;

        if !self
            .otp
            .verify_otp(&phone, &code, OtpPurpose::ForgotPassword)
            .await?
        {
            return Err(CoreError::InvalidOtp);
        }

        let user = self
            .users
            .find_by_phone(&phone)
            .await?
            .ok_or_else(|| CoreError::not_found("User", &phone))?;
        let hash = self.hash_password(password)?;
        self.users.set_password(&user.id, &hash).await?;

        info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Logs in with a Google or Facebook identity.
    ///
    /// Lookup order: linked provider id, then email (linking the provider),
    /// then a new verified account.
    pub async fn social_login(&self, request: SocialLoginRequest) -> CoreResult<AuthSession> {
        let provider = AuthProvider::parse_social(&request.provider)?;
        validate_required_text("provider_id", &request.provider_id, 255)?;
        validate_name(&request.name)?;
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        if let Some(email) = &email {
            validate_email(email)?;
        }
        validate_optional_text("profile_image", request.profile_image.as_deref(), 2048)?;

        if let Some(user) = self
            .users
            .find_by_provider(provider, &request.provider_id)
            .await?
        {
            return self.session_for(user);
        }

        if let Some(email) = &email {
            if let Some(user) = self.users.find_by_email(email).await? {
                let user = self
                    .users
                    .link_provider(&user.id, provider, &request.provider_id)
                    .await?;
                info!(user_id = %user.id, provider = provider.as_str(), "Social provider linked");
                return self.session_for(user);
            }
        }

        let user = self
            .users
            .create(&NewUser {
                name: request.name.trim().to_string(),
                phone: None,
                email: email.clone(),
                password_hash: None,
                profile_image: request.profile_image.clone(),
                is_verified: true,
                auth_provider: provider,
                provider: Some(provider),
                provider_id: Some(request.provider_id.clone()),
            })
            .await
            .map_err(|e| taken_or(e, "email", email.as_deref().unwrap_or_default()))?;

        info!(user_id = %user.id, provider = provider.as_str(), "Social user created");
        self.session_for(user)
    }

    pub async fn current_user(&self, user_id: &str) -> CoreResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("User", user_id))
    }

    /// Updates name, email or profile image. Email must stay unique.
    pub async fn update_profile(&self, user_id: &str, patch: ProfilePatch) -> CoreResult<User> {
        validate_profile_patch(&patch)?;
        let patch = ProfilePatch {
            name: patch.name.map(|n| n.trim().to_string()),
            email: patch.email.map(|e| e.trim().to_string()),
            profile_image: patch.profile_image,
        };

        if let Some(email) = &patch.email {
            if let Some(other) = self.users.find_by_email(email).await? {
                if other.id != user_id {
                    return Err(CoreError::AlreadyTaken {
                        field: "email",
                        value: email.clone(),
                    });
                }
            }
        }

        let email = patch.email.clone().unwrap_or_default();
        self.users
            .update_profile(user_id, &patch)
            .await
            .map_err(|e| taken_or(e, "email", &email))
    }

    /// Revokes a bearer token until it would have expired anyway.
    pub async fn logout(&self, token_id: &str, expires_at: DateTime<Utc>) -> CoreResult<()> {
        self.sessions.revoke(token_id, expires_at).await?;
        Ok(())
    }

    pub async fn is_token_revoked(&self, token_id: &str) -> CoreResult<bool> {
        Ok(self.sessions.is_revoked(token_id).await?)
    }

    fn hash_password(&self, password: &str) -> CoreResult<String> {
        self.hasher.hash(password).map_err(CoreError::Internal)
    }

    fn session_for(&self, user: User) -> CoreResult<AuthSession> {
        let token = self.tokens.issue(&user).map_err(CoreError::Internal)?;
        Ok(AuthSession { user, token })
    }
}

/// Maps a unique violation to `AlreadyTaken`, anything else to `Store`.
fn taken_or(err: StoreError, field: &'static str, value: &str) -> CoreError {
    match err {
        StoreError::Conflict { .. } => CoreError::AlreadyTaken {
            field,
            value: value.to_string(),
        },
        other => CoreError::Store(other),
    }
}

// =============================================================================
// Tests
// =============================================================================
