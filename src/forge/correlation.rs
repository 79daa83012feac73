//! forge::correlation
//!
//! Tracing headers attached to every outbound request.
//!
//! Request and correlation ids are fresh UUIDs per call; the client id is
//! a fixed, configured label. None of them carry business meaning.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Build the three correlation headers for one request.
///
/// # Errors
///
/// Fails only if `client_id` is not a valid header value.
pub fn correlation_headers(client_id: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(REQUEST_ID_HEADER),
        HeaderValue::from_str(&Uuid::new_v4().to_string())?,
    );
    headers.insert(
        HeaderName::from_static(CORRELATION_ID_HEADER),
        HeaderValue::from_str(&Uuid::new_v4().to_string())?,
    );
    headers.insert(
        HeaderName::from_static(CLIENT_ID_HEADER),
        HeaderValue::from_str(client_id)?,
    );
    Ok(headers)
}
