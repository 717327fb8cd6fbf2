pub mod auth;
pub mod csrf;
pub mod health;
pub mod posts;
pub mod users;

use actix_web::{web, HttpResponse};
use serde_json::json;

pub use auth::login;
pub use csrf::csrf_token;
pub use health::{health_check, metrics_endpoint, readiness};
pub use posts::{create_post, list_posts};
pub use users::{create_user, delete_user, get_user, list_users, update_user};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_check)
        .service(readiness)
        .service(metrics_endpoint)
        .service(csrf_token)
        .service(list_posts)
        .service(create_post)
        .service(list_users)
        .service(get_user)
        .service(create_user)
        .service(update_user)
        .service(delete_user)
        .service(login);
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(json!({ "error": "Not Found" }))
}
