//! Authentication route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use loomkart_core::Role;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::models::user::User;
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Public view of an account.
#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i32(),
            name: user.name.clone(),
            email: user.email.to_string(),
            role: user.role,
            email_verified: user.email_verified,
        }
    }
}

/// Request to create an account.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request carrying an email and its OTP.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

/// Request carrying just an email.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Password-reset completion request.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

/// Create an account and email its verification code.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let name = required(&body.name, "name")?;
    let email = required(&body.email, "email")?;
    let password = body
        .password
        .as_deref()
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    let auth = AuthService::new(state.pool());
    let (user, otp) = auth.register(name, email, password).await?;

    // A lost email must not roll back the signup; the code can be resent.
    if let Err(e) = state
        .mailer()
        .send_otp_code(user.email.as_str(), &user.name, &otp)
        .await
    {
        tracing::error!(user_id = %user.id, error = %e, "Failed to send OTP email");
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created, check your email for the verification code",
            "data": UserView::from(&user),
        })),
    ))
}

/// Verify a signup OTP, activating the account.
#[instrument(skip(state, body))]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = required(&body.email, "email")?;
    let otp = required(&body.otp, "otp")?;

    let auth = AuthService::new(state.pool());
    let user = auth.verify_otp(email, otp).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Email verified, you can now log in",
        "data": UserView::from(&user),
    })))
}

/// Issue a fresh OTP for an unverified account.
#[instrument(skip(state, body))]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = required(&body.email, "email")?;

    let auth = AuthService::new(state.pool());
    let (user, otp) = auth.resend_otp(email).await?;

    if let Err(e) = state
        .mailer()
        .send_otp_code(user.email.as_str(), &user.name, &otp)
        .await
    {
        tracing::error!(user_id = %user.id, error = %e, "Failed to send OTP email");
    }

    Ok(Json(json!({
        "success": true,
        "message": "A new verification code is on its way",
    })))
}

/// Password login; establishes the session cookie.
#[instrument(skip(state, session, body))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = required(&body.email, "email")?;
    let password = body
        .password
        .as_deref()
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    let auth = AuthService::new(state.pool());
    let user = auth.login(email, password).await?;

    let current = CurrentUser {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
    };
    set_current_user(&session, &current)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(json!({
        "success": true,
        "data": UserView::from(&user),
    })))
}

/// Clear the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<serde_json::Value>> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("session error: {e}")))?;

    Ok(Json(json!({ "success": true, "message": "Logged out" })))
}

/// Open a password-reset challenge.
///
/// Responds identically whether or not the account exists, so the endpoint
/// cannot be used to probe for registered emails.
#[instrument(skip(state, body))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>> {
    let email = required(&body.email, "email")?;

    let auth = AuthService::new(state.pool());
    if let Some((user, token)) = auth.forgot_password(email).await?
        && let Err(e) = state
            .mailer()
            .send_password_reset(user.email.as_str(), &user.name, &token)
            .await
    {
        tracing::error!(user_id = %user.id, error = %e, "Failed to send reset email");
    }

    Ok(Json(json!({
        "success": true,
        "message": "If that email is registered, a reset code is on its way",
    })))
}

/// Complete a password reset.
#[instrument(skip(state, body))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let token = required(&body.token, "token")?;
    let password = body
        .password
        .as_deref()
        .ok_or_else(|| AppError::Validation("password is required".to_string()))?;

    let auth = AuthService::new(state.pool());
    auth.reset_password(token, password).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password updated, you can now log in",
    })))
}

/// Current user profile.
#[instrument(skip(state, user))]
pub async fn me(
    RequireAuth(user): RequireAuth,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>> {
    let auth = AuthService::new(state.pool());
    let user = auth.get_user(user.id).await?;

    Ok(Json(json!({
        "success": true,
        "data": UserView::from(&user),
    })))
}
