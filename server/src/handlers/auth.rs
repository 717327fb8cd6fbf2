use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::{
    db::{Database, User},
    error::{AppError, Result},
    middleware::JsonBody,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub user: User,
}

/// Checks the credentials and returns the user. No server-side session is
/// kept; the frontend holds the logged-in user itself.
#[post("/api/login")]
pub async fn login(body: JsonBody<LoginRequest>, db: web::Data<Database>) -> Result<HttpResponse> {
    let req = body.into_inner();
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    log::info!("Login attempt for user: {}", req.username);

    let user = db.users().verify_credentials(&req.username, &req.password).await?;

    log::info!("Successful login for user: {}", user.username);

    Ok(HttpResponse::Ok().json(LoginResponse {
        success: true,
        user,
    }))
}
