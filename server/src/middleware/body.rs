use std::future::{ready, Ready};

use actix_web::{
    body::MessageBody,
    dev::{Payload, ServiceRequest, ServiceResponse},
    middleware::Next,
    web, FromRequest, HttpMessage, HttpRequest,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AppError;

/// Limit applied to request bodies read by the pipeline.
pub const BODY_LIMIT: usize = 100 * 1024;

/// JSON body parsed once by [`parse_json_body`].
#[derive(Debug, Clone)]
pub struct ParsedBody(pub Value);

fn is_json(req: &ServiceRequest) -> bool {
    let content_type = req.content_type();
    content_type == "application/json" || content_type.ends_with("+json")
}

pub async fn parse_json_body(
    mut req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    if is_json(&req) {
        let bytes = req.extract::<web::Bytes>().await?;

        if !bytes.is_empty() {
            let value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                log::debug!("Rejected malformed JSON body on {}: {}", req.path(), e);
                AppError::BadRequest(format!("Malformed JSON body: {}", e))
            })?;
            req.extensions_mut().insert(ParsedBody(value));
        }
    }

    next.call(req).await
}

/// Extractor for the body parsed by the pipeline. A request without a body
/// deserializes from `{}`.
pub struct JsonBody<T>(pub T);

impl<T> JsonBody<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> FromRequest for JsonBody<T> {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let value = req
            .extensions()
            .get::<ParsedBody>()
            .map(|body| body.0.clone())
            .unwrap_or_else(|| Value::Object(Default::default()));

        ready(
            serde_json::from_value(value)
                .map(JsonBody)
                .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e))),
        )
    }
}
