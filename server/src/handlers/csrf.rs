use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::csrf::{CsrfGuard, CsrfSession};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsrfTokenResponse {
    pub csrf_token: String,
}

#[get("/api/csrf-token")]
pub async fn csrf_token(
    guard: web::Data<CsrfGuard>,
    session: Option<web::ReqData<CsrfSession>>,
) -> HttpResponse {
    let session = session.map(|s| s.into_inner()).unwrap_or_default();
    let issued = guard.issue_token(&session);

    let mut response = HttpResponse::Ok();
    if let Some(cookie) = issued.cookie {
        log::debug!("Seeded new CSRF secret");
        response.cookie(cookie);
    }

    response.json(CsrfTokenResponse {
        csrf_token: issued.token,
    })
}
