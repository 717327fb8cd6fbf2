pub mod body;
pub mod cors;
pub mod csrf;
pub mod errors;
pub mod metrics;

pub use body::{parse_json_body, JsonBody, ParsedBody, BODY_LIMIT};
pub use cors::cors;
pub use csrf::{csrf_protection, parse_csrf_cookie};
pub use errors::normalize_errors;
pub use metrics::track_requests;
