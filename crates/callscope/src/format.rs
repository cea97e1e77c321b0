//! Bundled phase formatter: turns request/response/error details into
//! flat field maps, gated by a verbosity level.
//!
//! Field keys keep the wire spelling the collector side already indexes
//! (`body-bytes`, `elapsedTimeMs`), so swapping this adapter in does not
//! break existing dashboards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use callscope_sink::FieldMap;

use crate::phase::PhasePayload;

/// How much detail the formatter captures per phase.
///
/// Levels are cumulative: each one includes everything below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Bare minimum; response reasons are suppressed.
    None,
    /// Method, URL, status, reason, timings.
    #[default]
    Basic,
    /// Adds headers and body sizes.
    Headers,
    /// Adds body content and error detail.
    Full,
}

/// Header map as captured from the HTTP layer: name → values.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// Outbound request details, as visible at send time.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// HTTP method (`GET`, `POST`, ...).
    pub method: String,
    /// Full request URL.
    pub url: String,
    pub headers: HeaderMap,
    /// Raw request body, if one was sent.
    pub body: Option<Vec<u8>>,
}

/// Response details, as visible once the call returned.
#[derive(Debug, Clone, Default)]
pub struct ResponseInfo {
    pub status: u16,
    /// Status reason phrase, when the server sent one.
    pub reason: Option<String>,
    pub headers: HeaderMap,
    /// Raw response body, if one was read.
    pub body: Option<Vec<u8>>,
}

/// Error details for a call that failed instead of returning.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Short error type name (`Error`, `TimeoutError`, ...).
    pub name: String,
    /// Human-readable error message.
    pub message: String,
    /// Longer diagnostic text; only captured at [`Verbosity::Full`].
    pub detail: Option<String>,
}

impl ExceptionInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            detail: None,
        }
    }

    /// Capture a Rust error: type name, display message, and the chain of
    /// sources as detail.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let name = std::any::type_name::<E>();
        let name = name
            .split('<')
            .next()
            .unwrap_or(name)
            .rsplit("::")
            .next()
            .unwrap_or(name)
            .to_string();

        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        Self {
            name,
            message: err.to_string(),
            detail: if causes.is_empty() {
                None
            } else {
                Some(format!("caused by: {}", causes.join(": ")))
            },
        }
    }
}

/// Formats phase details into payload maps at a fixed verbosity.
#[derive(Debug, Clone, Copy)]
pub struct PhaseFormatter {
    verbosity: Verbosity,
}

impl PhaseFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// `method` and `url` always; headers and `body-bytes` from
    /// [`Verbosity::Headers`]; body text from [`Verbosity::Full`].
    pub fn request(&self, request: &RequestInfo) -> PhasePayload {
        let mut map = FieldMap::new();
        map.insert("method".to_string(), json!(request.method));
        map.insert("url".to_string(), json!(request.url));
        if self.verbosity >= Verbosity::Headers {
            map.insert("header".to_string(), header_payload(&request.headers));
            if let Some(body) = &request.body {
                if self.verbosity >= Verbosity::Full {
                    map.insert("body".to_string(), json!(body_text(body)));
                }
            }
            map.insert(
                "body-bytes".to_string(),
                json!(request.body.as_ref().map_or(0, |b| b.len())),
            );
        }
        Value::Object(map)
    }

    /// `status`, `reason`, and `elapsedTimeMs` always; headers and
    /// `body-bytes` from [`Verbosity::Headers`]; non-empty body text from
    /// [`Verbosity::Full`].
    ///
    /// HTTP 204 and 205 responses must not carry a body, so theirs is
    /// never read and `body-bytes` stays 0.
    pub fn response(&self, response: &ResponseInfo, elapsed_ms: u64) -> PhasePayload {
        let mut map = FieldMap::new();
        map.insert("status".to_string(), json!(response.status));
        let reason = if self.verbosity > Verbosity::None {
            response.reason.clone().unwrap_or_default()
        } else {
            String::new()
        };
        map.insert("reason".to_string(), json!(reason));
        map.insert("elapsedTimeMs".to_string(), json!(elapsed_ms));

        if self.verbosity >= Verbosity::Headers {
            map.insert("header".to_string(), header_payload(&response.headers));
            let body = if matches!(response.status, 204 | 205) {
                None
            } else {
                response.body.as_deref()
            };
            if let Some(bytes) = body {
                if self.verbosity >= Verbosity::Full && !bytes.is_empty() {
                    map.insert("body".to_string(), json!(body_text(bytes)));
                }
            }
            map.insert("body-bytes".to_string(), json!(body.map_or(0, |b| b.len())));
        }
        Value::Object(map)
    }

    /// `name`, `message`, and `elapsedTimeMs` always; `detail` from
    /// [`Verbosity::Full`].
    pub fn exception(&self, exception: &ExceptionInfo, elapsed_ms: u64) -> PhasePayload {
        let mut map = FieldMap::new();
        map.insert("name".to_string(), json!(exception.name));
        map.insert("message".to_string(), json!(exception.message));
        map.insert("elapsedTimeMs".to_string(), json!(elapsed_ms));
        if self.verbosity >= Verbosity::Full {
            if let Some(detail) = &exception.detail {
                map.insert("detail".to_string(), json!(detail));
            }
        }
        Value::Object(map)
    }
}

fn header_payload(headers: &HeaderMap) -> Value {
    let mut map = FieldMap::new();
    for (name, values) in headers {
        map.insert(name.clone(), json!(values));
    }
    Value::Object(map)
}

fn body_text(body: &[u8]) -> String {
    match std::str::from_utf8(body) {
        Ok(text) => text.to_string(),
        Err(_) => "Binary data".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> RequestInfo {
        RequestInfo {
            method: "POST".to_string(),
            url: "http://api.example.com".to_string(),
            headers: HeaderMap::from([(
                "test".to_string(),
                vec!["111".to_string(), "222".to_string()],
            )]),
            body: Some(b"some body".to_vec()),
        }
    }

    fn sample_response() -> ResponseInfo {
        ResponseInfo {
            status: 200,
            reason: Some("OK".to_string()),
            headers: HeaderMap::from([("test".to_string(), vec!["aaa".to_string()])]),
            body: Some(b"some body".to_vec()),
        }
    }

    #[test]
    fn verbosity_levels_are_ordered() {
        assert!(Verbosity::None < Verbosity::Basic);
        assert!(Verbosity::Basic < Verbosity::Headers);
        assert!(Verbosity::Headers < Verbosity::Full);
    }

    #[test]
    fn request_at_basic_has_method_and_url_only() {
        let payload = PhaseFormatter::new(Verbosity::Basic).request(&sample_request());
        let map = payload.as_object().unwrap();

        assert_eq!(map["method"], json!("POST"));
        assert_eq!(map["url"], json!("http://api.example.com"));
        assert!(!map.contains_key("header"));
        assert!(!map.contains_key("body"));
        assert!(!map.contains_key("body-bytes"));
    }

    #[test]
    fn request_at_headers_adds_headers_and_size() {
        let payload = PhaseFormatter::new(Verbosity::Headers).request(&sample_request());
        let map = payload.as_object().unwrap();

        assert_eq!(map["header"], json!({"test": ["111", "222"]}));
        assert_eq!(map["body-bytes"], json!(9));
        assert!(!map.contains_key("body"));
    }

    #[test]
    fn request_at_full_adds_body_text() {
        let payload = PhaseFormatter::new(Verbosity::Full).request(&sample_request());
        let map = payload.as_object().unwrap();

        assert_eq!(map["body"], json!("some body"));
        assert_eq!(map["body-bytes"], json!(9));
    }

    #[test]
    fn request_without_body_reports_zero_bytes() {
        let request = RequestInfo {
            body: None,
            ..sample_request()
        };
        let payload = PhaseFormatter::new(Verbosity::Full).request(&request);
        let map = payload.as_object().unwrap();

        assert_eq!(map["body-bytes"], json!(0));
        assert!(!map.contains_key("body"));
    }

    #[test]
    fn binary_body_is_labelled_not_dumped() {
        let request = RequestInfo {
            body: Some(vec![0xff, 0xfe, 0x00, 0x01]),
            ..sample_request()
        };
        let payload = PhaseFormatter::new(Verbosity::Full).request(&request);

        assert_eq!(payload.as_object().unwrap()["body"], json!("Binary data"));
    }

    #[test]
    fn response_at_basic_has_status_reason_elapsed() {
        let payload = PhaseFormatter::new(Verbosity::Basic).response(&sample_response(), 1000);
        let map = payload.as_object().unwrap();

        assert_eq!(map["status"], json!(200));
        assert_eq!(map["reason"], json!("OK"));
        assert_eq!(map["elapsedTimeMs"], json!(1000));
        assert!(!map.contains_key("header"));
        assert!(!map.contains_key("body"));
    }

    #[test]
    fn response_reason_suppressed_at_none() {
        let payload = PhaseFormatter::new(Verbosity::None).response(&sample_response(), 5);
        assert_eq!(payload.as_object().unwrap()["reason"], json!(""));
    }

    #[test]
    fn response_at_full_includes_body() {
        let payload = PhaseFormatter::new(Verbosity::Full).response(&sample_response(), 1000);
        let map = payload.as_object().unwrap();

        assert_eq!(map["header"], json!({"test": ["aaa"]}));
        assert_eq!(map["body"], json!("some body"));
        assert_eq!(map["body-bytes"], json!(9));
    }

    #[test]
    fn no_content_response_never_reports_a_body() {
        for status in [204u16, 205] {
            let response = ResponseInfo {
                status,
                ..sample_response()
            };
            let payload = PhaseFormatter::new(Verbosity::Full).response(&response, 10);
            let map = payload.as_object().unwrap();

            assert_eq!(map["body-bytes"], json!(0), "status {status}");
            assert!(!map.contains_key("body"), "status {status}");
        }
    }

    #[test]
    fn empty_response_body_is_sized_but_not_dumped() {
        let response = ResponseInfo {
            body: Some(Vec::new()),
            ..sample_response()
        };
        let payload = PhaseFormatter::new(Verbosity::Full).response(&response, 10);
        let map = payload.as_object().unwrap();

        assert_eq!(map["body-bytes"], json!(0));
        assert!(!map.contains_key("body"));
    }

    #[test]
    fn exception_detail_only_at_full() {
        let mut info = ExceptionInfo::new("TimeoutError", "deadline exceeded");
        info.detail = Some("timer fired after 30s".to_string());

        let headers = PhaseFormatter::new(Verbosity::Headers).exception(&info, 1000);
        let map = headers.as_object().unwrap();
        assert_eq!(map["name"], json!("TimeoutError"));
        assert_eq!(map["message"], json!("deadline exceeded"));
        assert_eq!(map["elapsedTimeMs"], json!(1000));
        assert!(!map.contains_key("detail"));

        let full = PhaseFormatter::new(Verbosity::Full).exception(&info, 1000);
        assert_eq!(
            full.as_object().unwrap()["detail"],
            json!("timer fired after 30s")
        );
    }

    #[derive(Debug)]
    struct Refused;

    impl std::fmt::Display for Refused {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("refused")
        }
    }

    impl std::error::Error for Refused {}

    #[derive(Debug)]
    struct ConnectError {
        source: Option<Refused>,
    }

    impl std::fmt::Display for ConnectError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("connect failed")
        }
    }

    impl std::error::Error for ConnectError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.source.as_ref().map(|e| e as _)
        }
    }

    #[test]
    fn from_error_captures_name_and_message() {
        let info = ExceptionInfo::from_error(&ConnectError { source: None });
        assert_eq!(info.name, "ConnectError");
        assert_eq!(info.message, "connect failed");
        assert_eq!(info.detail, None);
    }

    #[test]
    fn from_error_records_the_cause_chain_as_detail() {
        let err = ConnectError {
            source: Some(Refused),
        };
        let info = ExceptionInfo::from_error(&err);
        assert_eq!(info.detail.as_deref(), Some("caused by: refused"));
    }
}
