//! Payload strings pushed into session buffers by the bridge.
//!
//! Relayed backend events are passed through as received. Besides those the
//! bridge produces two kinds of its own: structured JSON error payloads and
//! the terminal `{"event":"closed"}` sentinel.

use serde_json::{Value, json};

/// `event` value of the terminal sentinel.
pub const CLOSED_EVENT: &str = "closed";

/// `event` value a backend uses to signal the end of its stream.
pub const BACKEND_DONE_EVENT: &str = "done";

/// The terminal sentinel, always the last payload of a bridged stream.
pub fn sentinel() -> String {
    json!({ "event": CLOSED_EVENT }).to_string()
}

/// Whether `payload` is the terminal sentinel.
pub fn is_sentinel(payload: &str) -> bool {
    event_name(payload).as_deref() == Some(CLOSED_EVENT)
}

/// Whether `payload` is the backend's own end-of-stream event.
pub fn is_backend_done(payload: &str) -> bool {
    event_name(payload).as_deref() == Some(BACKEND_DONE_EVENT)
}

/// The backend replied to the stream request with a failure status.
pub fn stream_failed(status: u16, detail: &str) -> String {
    json!({ "error": "backend stream failed", "detail": detail, "status": status }).to_string()
}

/// The connection to the backend could not be made, or broke mid-stream.
pub fn request_error(detail: &str) -> String {
    json!({ "error": "request error", "detail": detail }).to_string()
}

/// The backend disappeared from the registry before the bridge started.
pub fn backend_not_found(name: &str) -> String {
    json!({ "error": "backend not found", "detail": name }).to_string()
}

fn event_name(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    value.get("event")?.as_str().map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_round_trip() {
        assert_eq!(sentinel(), r#"{"event":"closed"}"#);
        assert!(is_sentinel(&sentinel()));
        assert!(is_sentinel(r#"{ "event" : "closed", "extra": 1 }"#));
    }

    #[test]
    fn non_sentinels() {
        assert!(!is_sentinel(r#"{"event":"progress","step":1}"#));
        assert!(!is_sentinel("closed"));
        assert!(!is_sentinel(r#"{"event":1}"#));
        assert!(!is_sentinel(r#"["closed"]"#));
    }

    #[test]
    fn backend_done_detection() {
        assert!(is_backend_done(r#"{"event":"done","timestamp":1.5}"#));
        assert!(!is_backend_done(r#"{"event":"progress"}"#));
        assert!(!is_backend_done("[DONE]"));
    }

    #[test]
    fn stream_failed_shape() {
        let v: Value = serde_json::from_str(&stream_failed(503, "Service Unavailable")).unwrap();
        assert_eq!(v["error"], "backend stream failed");
        assert_eq!(v["status"], 503);
        assert_eq!(v["detail"], "Service Unavailable");
    }

    #[test]
    fn error_payloads_are_json() {
        let v: Value = serde_json::from_str(&request_error("reset by peer")).unwrap();
        assert_eq!(v["detail"], "reset by peer");
        let v: Value = serde_json::from_str(&backend_not_found("calc")).unwrap();
        assert_eq!(v["error"], "backend not found");
        assert_eq!(v["detail"], "calc");
    }
}
