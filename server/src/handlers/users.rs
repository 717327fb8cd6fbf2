use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    db::{Database, NewUser, UserChanges},
    error::Result,
    middleware::JsonBody,
};

#[get("/api/users")]
pub async fn list_users(db: web::Data<Database>) -> Result<HttpResponse> {
    let users = db.users().list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[get("/api/users/{id}")]
pub async fn get_user(db: web::Data<Database>, id: web::Path<i64>) -> Result<HttpResponse> {
    let user = db.users().find_user(id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[post("/api/users")]
pub async fn create_user(
    db: web::Data<Database>,
    body: JsonBody<NewUser>,
) -> Result<HttpResponse> {
    let user = db.users().create_user(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

#[put("/api/users/{id}")]
pub async fn update_user(
    db: web::Data<Database>,
    id: web::Path<i64>,
    body: JsonBody<UserChanges>,
) -> Result<HttpResponse> {
    let user = db.users().update_user(id.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[delete("/api/users/{id}")]
pub async fn delete_user(db: web::Data<Database>, id: web::Path<i64>) -> Result<HttpResponse> {
    db.users().delete_user(id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
