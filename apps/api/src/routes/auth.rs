//! Registration, OTP, login and profile endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chai_core::ports::IssuedToken;
use chai_core::services::{LoginOutcome, RegisterRequest, SocialLoginRequest};
use chai_core::{OtpPurpose, OtpRecord, ProfilePatch, User};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{data, message, message_with, ApiJson};
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub phone: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpBody {
    pub phone: String,
    #[serde(rename = "type", default = "registration")]
    pub purpose: OtpPurpose,
}

fn registration() -> OtpPurpose {
    OtpPurpose::Registration
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub phone: String,
    pub otp: String,
    pub password: String,
}

/// `{ phone, otp }`; the code itself only when `expose_otp` is on.
fn otp_payload(state: &AppState, phone: &str, otp: Option<&OtpRecord>) -> Value {
    json!({
        "phone": phone,
        "otp": otp.filter(|_| state.expose_otp()).map(|o| o.code.to_string()),
    })
}

fn token_payload(user: &User, token: &IssuedToken) -> Value {
    json!({
        "user": user,
        "token": token.token,
        "token_type": "Bearer",
        "expires_in": token.expires_in_secs,
    })
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let registration = state.auth().register(body).await?;
    let mut payload = otp_payload(&state, &registration.otp.phone, Some(&registration.otp));
    payload["user"] = json!(registration.user);

    Ok((
        StatusCode::CREATED,
        message_with(
            "Registration successful. Please verify your phone number with the OTP sent.",
            payload,
        ),
    ))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<VerifyOtpBody>,
) -> ApiResult<Json<Value>> {
    let session = state
        .auth()
        .verify_registration(&body.phone, &body.otp)
        .await?;
    Ok(message_with(
        "Phone number verified successfully",
        token_payload(&session.user, &session.token),
    ))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResendOtpBody>,
) -> ApiResult<Json<Value>> {
    let otp = state.auth().resend_otp(&body.phone, body.purpose).await?;
    let phone = otp.as_ref().map_or(body.phone.as_str(), |o| o.phone.as_str());
    Ok(message_with(
        "OTP resent successfully",
        otp_payload(&state, phone, otp.as_ref()),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginBody>,
) -> ApiResult<Json<Value>> {
    match state.auth().login(&body.phone, &body.password).await? {
        LoginOutcome::Authenticated(session) => Ok(message_with(
            "Login successful",
            token_payload(&session.user, &session.token),
        )),
        LoginOutcome::VerificationRequired { otp, .. } => Err(ApiError::verification_required(
            &otp,
            state.expose_otp(),
        )),
    }
}

/// Answers the same way whether or not the phone has an account.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordBody>,
) -> ApiResult<Json<Value>> {
    let otp = state.auth().forgot_password(&body.phone).await?;
    let phone = otp.as_ref().map_or(body.phone.as_str(), |o| o.phone.as_str());
    Ok(message_with(
        "OTP sent to your phone number",
        otp_payload(&state, phone, otp.as_ref()),
    ))
}

pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordBody>,
) -> ApiResult<Json<Value>> {
    state
        .auth()
        .reset_password(&body.phone, &body.otp, &body.password)
        .await?;
    Ok(message("Password reset successfully"))
}

pub async fn social_login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SocialLoginRequest>,
) -> ApiResult<Json<Value>> {
    let session = state.auth().social_login(body).await?;
    Ok(message_with(
        "Login successful",
        token_payload(&session.user, &session.token),
    ))
}

pub async fn user(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    let user = state.auth().current_user(&auth.user_id).await?;
    Ok(data(user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(patch): ApiJson<ProfilePatch>,
) -> ApiResult<Json<Value>> {
    let user = state.auth().update_profile(&auth.user_id, patch).await?;
    Ok(message_with("Profile updated successfully", user))
}

/// Revokes the presented token; other sessions stay valid.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Value>> {
    state
        .auth()
        .logout(&auth.claims.jti, auth.claims.expires_at())
        .await?;
    Ok(message("Logged out successfully"))
}
