//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, header::CONTENT_TYPE},
    middleware::Next,
    response::Response,
};
use serde_json::Value;

/// The maximum number of bytes of a body logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// JSON fields whose values are replaced before a body is logged.
pub const REDACTED_FIELDS: [&str; 3] = ["code", "access_token", "client_secret"];

const REDACTED_VALUE: &str = "********";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and logged in full at the `debug` level. The values of the
/// [REDACTED_FIELDS] of JSON bodies are never logged.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body_text) = extract_parts_and_body_text(request.into_parts()).await;
    log_request(&parts, &display_text(&parts.headers, &body_text));

    let request = Request::from_parts(parts, Body::from(body_text));
    let response = next.run(request).await;

    let (parts, body_text) = extract_parts_and_body_text(response.into_parts()).await;
    log_response(&parts, &display_text(&parts.headers, &body_text));

    Response::from_parts(parts, Body::from(body_text))
}

async fn extract_parts_and_body_text<P>((parts, body): (P, Body)) -> (P, String) {
    let body_text = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
        Err(error) => {
            tracing::error!("Could not read body for logging: {error}");
            String::new()
        }
    };

    (parts, body_text)
}

fn display_text(headers: &HeaderMap, body_text: &str) -> String {
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|content_type| content_type.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/json"));

    if is_json {
        redact_secrets(body_text)
    } else {
        body_text.to_owned()
    }
}

/// Replace the values of the [REDACTED_FIELDS] anywhere in the JSON document `json_text`.
///
/// Text that is not valid JSON is returned unchanged.
fn redact_secrets(json_text: &str) -> String {
    match serde_json::from_str::<Value>(json_text) {
        Ok(mut value) => {
            redact_value(&mut value);
            value.to_string()
        }
        Err(_) => json_text.to_owned(),
    }
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    *field = Value::String(REDACTED_VALUE.to_owned());
                } else {
                    redact_value(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        _ => {}
    }
}

/// The longest prefix of `text` that is at most `limit` bytes and ends on a character boundary.
fn truncate(text: &str, limit: usize) -> &str {
    let mut end = limit.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {} {}\nbody: {:}...",
            parts.method,
            parts.uri,
            truncate(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!(
            "Received request: {} {}\nbody: {body:?}",
            parts.method,
            parts.uri
        );
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {}\nbody: {:}...",
            parts.status,
            truncate(body, LOG_BODY_LENGTH_LIMIT)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {}\nbody: {body:?}", parts.status);
    }
}

#[cfg(test)]
mod redact_secrets_tests {
    use serde_json::{Value, json};

    use super::{redact_secrets, truncate};

    #[test]
    fn redacts_authorization_code() {
        let got = redact_secrets(r#"{"code":"abc123","owner_user_id":1}"#);

        let got: Value = serde_json::from_str(&got).unwrap();
        assert_eq!(got, json!({"code": "********", "owner_user_id": 1}));
    }

    #[test]
    fn redacts_nested_fields() {
        let got = redact_secrets(r#"{"items":[{"access_token":"t0k3n"}],"client_secret":"s"}"#);

        assert!(!got.contains("t0k3n"), "{got}");
        assert!(!got.contains("\"s\""), "{got}");
    }

    #[test]
    fn leaves_other_fields_alone() {
        let text = r#"{"status":"OK","transactions_written":2}"#;

        let got: Value = serde_json::from_str(&redact_secrets(text)).unwrap();

        assert_eq!(got, json!({"status": "OK", "transactions_written": 2}));
    }

    #[test]
    fn invalid_json_is_unchanged() {
        assert_eq!(redact_secrets("code=abc"), "code=abc");
    }

    #[test]
    fn truncates_on_char_boundary() {
        // 'é' takes two bytes, so a limit of 2 would split it.
        assert_eq!(truncate("aé", 2), "a");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
