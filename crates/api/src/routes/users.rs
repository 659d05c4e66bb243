//! Account route handlers: signup, signin and profile.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireUser;
use crate::models::{ProfileChanges, User};
use crate::services::auth::validate_name;
use crate::state::AppState;

/// Signup form.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Signin form.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the account it was issued for.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Profile changes. A password change needs the current password.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub name: Option<String>,
    pub img: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}

/// Create an account.
///
/// POST /api/user/signup
#[instrument(skip(state, form))]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let user = state
        .auth()
        .register(&form.name, &form.email, &form.password)
        .await?;
    let token = state.tokens().issue(user.id)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// Sign in with email and password.
///
/// POST /api/user/signin
#[instrument(skip(state, form))]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SigninRequest>,
) -> Result<Json<AuthResponse>> {
    let user = state.auth().login(&form.email, &form.password).await?;
    let token = state.tokens().issue(user.id)?;
    tracing::info!(user_id = %user.id, "User signed in");
    Ok(Json(AuthResponse { token, user }))
}

/// Update the signed-in user's profile.
///
/// PUT /api/user/profile
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    ApiJson(form): ApiJson<ProfileRequest>,
) -> Result<Json<User>> {
    let mut changes = ProfileChanges {
        name: form
            .name
            .as_deref()
            .map(validate_name)
            .transpose()?
            .map(str::to_owned),
        img: form.img.map(|img| img.trim().to_owned()),
        password_hash: None,
    };

    if let Some(new_password) = form.new_password.as_deref() {
        let current = form.current_password.as_deref().ok_or_else(|| {
            AppError::BadRequest("currentPassword is required to change the password".to_owned())
        })?;
        changes.password_hash = Some(
            state
                .auth()
                .rehash_password(user.id, current, new_password)
                .await?,
        );
    }

    if changes.is_empty() {
        return Ok(Json(user));
    }

    let updated = state
        .store()
        .update_profile(user.id, &changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_owned()))?;
    tracing::info!(
        password_changed = changes.password_hash.is_some(),
        "Profile updated"
    );
    Ok(Json(updated))
}

/// Deactivate the signed-in user's account.
///
/// DELETE /api/user/profile
///
/// Orders are kept; the cart and favorites are cleared and the email becomes
/// available for a new signup.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Message>> {
    if !state.store().deactivate_user(user.id).await? {
        return Err(AppError::NotFound("User not found".to_owned()));
    }
    tracing::info!("Account deactivated");
    Ok(Json(Message {
        message: "Account deleted successfully",
    }))
}
