use actix_web::{get, post, HttpResponse};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::Result, middleware::JsonBody};

#[derive(Debug, Serialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NewPost {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedPost {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub created_at: String,
}

fn demo_posts() -> Vec<Post> {
    vec![
        Post {
            id: 1,
            title: "First Post".to_string(),
            content: "Hello World".to_string(),
        },
        Post {
            id: 2,
            title: "Second Post".to_string(),
            content: "DevOps Demo".to_string(),
        },
    ]
}

#[get("/api/posts")]
pub async fn list_posts() -> HttpResponse {
    HttpResponse::Ok().json(demo_posts())
}

/// Echoes the post back; posts are not persisted.
#[post("/api/posts")]
pub async fn create_post(body: JsonBody<NewPost>) -> Result<HttpResponse> {
    let post = body.into_inner();
    let now = Utc::now();

    let created = CreatedPost {
        id: now.timestamp_millis(),
        title: post.title,
        content: post.content,
        created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    Ok(HttpResponse::Created().json(created))
}
