/// Authentication Routes
///
/// Local signup/signin, logout and token refresh.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::auth::AuthService;
use crate::error::AppError;
use crate::middleware::AuthenticatedUser;
use crate::validators::{is_valid_email, is_valid_password, require_non_empty};

/// Email/password credentials
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/local/signup
///
/// Register a new user and return a token pair.
///
/// # Errors
/// - 400: Invalid email or empty password
/// - 409: Email already registered
/// - 500: Internal server error
pub async fn sign_up(
    form: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let password = is_valid_password(&form.password)?;

    let tokens = auth.sign_up(&email, password).await?;

    Ok(HttpResponse::Created().json(tokens))
}

/// POST /auth/local/signin
///
/// # Errors
/// - 400: Missing email or password
/// - 403: Unknown email or wrong password (same response for both)
/// - 500: Internal server error
pub async fn sign_in(
    form: web::Json<CredentialsRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let email = require_non_empty("email", &form.email)?;
    let password = is_valid_password(&form.password)?;

    let tokens = auth.sign_in(email, password).await?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /auth/logout
///
/// **Requires a valid access token**. Succeeds even if already logged out.
pub async fn logout(
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout(user.user_id).await?;

    Ok(HttpResponse::Ok().finish())
}

/// POST /auth/refresh
///
/// **Requires a valid refresh token**. Rotates both tokens.
///
/// # Errors
/// - 401: Missing, malformed or expired refresh token (middleware)
/// - 403: Refresh token is not the user's current one
pub async fn refresh(
    user: web::ReqData<AuthenticatedUser>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let tokens = auth.refresh(user.user_id, &user.token).await?;

    Ok(HttpResponse::Ok().json(tokens))
}
