use log::warn;
use quick_xml::de::DeError;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use thiserror::Error;

use crate::transport::Exchange;
use crate::NotificationError;

/// Response body could not be decoded.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Body is not well-formed XML.
    #[error("malformed response: {0}")]
    Malformed(#[source] DeError),
    /// Body is well-formed but holds neither an error nor a success element.
    #[error("unexpected response: {0}")]
    Schema(#[source] DeError),
}

impl From<DeError> for DecodeError {
    fn from(e: DeError) -> Self {
        match e {
            DeError::InvalidXml(_) | DeError::UnexpectedEof => DecodeError::Malformed(e),
            _ => DecodeError::Schema(e),
        }
    }
}

/// Accepted call with the quota reported by the service.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
pub struct Success {
    /// Status code reported by the service, usually 200.
    #[serde(rename = "@code")]
    pub code: i32,
    /// Calls left before the rate limit resets.
    #[serde(rename = "@remaining")]
    pub remaining: i64,
    /// Minutes until the rate limit resets.
    #[serde(rename = "@resettimer")]
    pub reset_timer: i64,
}

/// Error element reported by the service.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct ServiceError {
    /// Error code e.g. 400, 401, 402.
    #[serde(rename = "@code")]
    pub code: i32,
    /// Minutes until the rate limit resets, only given when the limit is hit.
    #[serde(rename = "@resettimer", default)]
    pub reset_timer: Option<i64>,
    /// Human readable message, verbatim including surrounding whitespace.
    #[serde(rename = "$text", default)]
    pub message: String,
}

/// Decoded response body, exactly one of error or success.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub enum ServiceResponse {
    /// `<error code=".." resettimer="..">message</error>`
    #[serde(rename = "error")]
    Error(ServiceError),
    /// `<success code=".." remaining=".." resettimer=".."/>`
    #[serde(rename = "success")]
    Success(Success),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "$value")]
    response: ServiceResponse,
}

/// Decodes a response body such as
/// `<nma><success code="200" remaining="795" resettimer="52"/></nma>`.
pub fn decode(body: &str) -> Result<ServiceResponse, DecodeError> {
    let envelope: Envelope = quick_xml::de::from_str(body)?;
    match envelope.response {
        ServiceResponse::Error(mut e) => {
            if let Some(message) = error_text(body) {
                e.message = message;
            }
            Ok(ServiceResponse::Error(e))
        }
        r => Ok(r),
    }
}

// the deserializer trims text, read the error message again untrimmed
fn error_text(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    let mut text: Option<String> = None;
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) if e.name().as_ref() == b"error" => text = Some(String::new()),
            Event::Text(t) => {
                if let Some(ref mut s) = text {
                    s.push_str(&t.unescape().ok()?);
                }
            }
            Event::CData(c) => {
                if let Some(ref mut s) = text {
                    s.push_str(std::str::from_utf8(&c).ok()?);
                }
            }
            Event::End(e) if e.name().as_ref() == b"error" => return text,
            Event::Eof => return None,
            _ => {}
        }
    }
}

/// Classifies a completed exchange.
///
/// Status outside `[200, 300)` is an HTTP error and the body is not decoded.
/// Otherwise the body must decode, and an error element wins over the status.
pub fn interpret(exchange: &Exchange) -> Result<Success, NotificationError> {
    if !(200..300).contains(&exchange.status) {
        return Err(NotificationError::Http {
            status: exchange.status,
            status_text: exchange.status_text.clone(),
            body: exchange.body.clone(),
        });
    }
    match decode(&exchange.body)? {
        ServiceResponse::Success(s) => Ok(s),
        ServiceResponse::Error(e) => {
            warn!("service error {}: {}", e.code, e.message);
            Err(NotificationError::Service {
                code: e.code,
                message: e.message,
                reset_timer: e.reset_timer,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_ERROR: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<nma><error code="400">Parameter 'apikey' not provided.</error></nma>"#
    );

    const SAMPLE_SUCCESS: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<nma><success code="200" remaining="795" resettimer="52"/></nma>"#
    );

    fn exchange(status: u16, status_text: &str, body: &str) -> Exchange {
        Exchange {
            status,
            status_text: status_text.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn t_decode_success() -> Result<(), DecodeError> {
        let expected = Success {
            code: 200,
            remaining: 795,
            reset_timer: 52,
        };
        assert_eq!(ServiceResponse::Success(expected), decode(SAMPLE_SUCCESS)?);
        Ok(())
    }

    #[test]
    fn t_decode_error() -> Result<(), DecodeError> {
        match decode(SAMPLE_ERROR)? {
            ServiceResponse::Error(e) => {
                assert_eq!(400, e.code);
                assert_eq!("Parameter 'apikey' not provided.", e.message);
                assert_eq!(None, e.reset_timer);
            }
            r => panic!("expected error element, got {r:?}"),
        }
        Ok(())
    }

    #[test]
    fn t_decode_error_with_reset_timer() -> Result<(), DecodeError> {
        let body = r#"<nma><error code="402" resettimer="12">Rate limit reached.</error></nma>"#;
        match decode(body)? {
            ServiceResponse::Error(e) => {
                assert_eq!(402, e.code);
                assert_eq!(Some(12), e.reset_timer);
                assert_eq!("Rate limit reached.", e.message);
            }
            r => panic!("expected error element, got {r:?}"),
        }
        Ok(())
    }

    #[test]
    fn t_decode_error_keeps_whitespace() -> Result<(), DecodeError> {
        let body = r#"<nma><error code="400">  spaced &amp; x  </error></nma>"#;
        match decode(body)? {
            ServiceResponse::Error(e) => assert_eq!("  spaced & x  ", e.message),
            r => panic!("expected error element, got {r:?}"),
        }

        let body = r#"<nma><error code="401"/></nma>"#;
        match decode(body)? {
            ServiceResponse::Error(e) => assert_eq!("", e.message),
            r => panic!("expected error element, got {r:?}"),
        }
        Ok(())
    }

    #[test]
    fn t_decode_malformed() {
        assert!(matches!(decode("<3"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(""), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode("<nma>"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn t_decode_schema_mismatch() {
        assert!(matches!(decode("<nma></nma>"), Err(DecodeError::Schema(_))));
        assert!(matches!(
            decode("<nma><unknown/></nma>"),
            Err(DecodeError::Schema(_))
        ));
    }

    #[test]
    fn t_decode_both_elements() {
        let error = r#"<error code="400">a</error>"#;
        let success = r#"<success code="200" remaining="1" resettimer="2"/>"#;
        let body = format!("<nma>{error}{success}</nma>");
        assert!(matches!(decode(&body), Err(DecodeError::Schema(_))));
        let body = format!("<nma>{success}{error}</nma>");
        assert!(matches!(decode(&body), Err(DecodeError::Schema(_))));
    }

    #[test]
    fn t_interpret_success() {
        let s = interpret(&exchange(200, "OK", SAMPLE_SUCCESS)).expect("success");
        assert_eq!(200, s.code);
        assert_eq!(795, s.remaining);
        assert_eq!(52, s.reset_timer);
    }

    #[test]
    fn t_interpret_service_error() {
        let err = interpret(&exchange(200, "OK", SAMPLE_ERROR)).unwrap_err();
        assert!(matches!(err, NotificationError::Service { code: 400, .. }));
        assert_eq!("Parameter 'apikey' not provided.", err.to_string());
    }

    #[test]
    fn t_interpret_http_error() {
        let err = interpret(&exchange(400, "Bad Request", "you wrong")).unwrap_err();
        assert_eq!("HTTP Error Bad Request - you wrong", err.to_string());

        // body is never decoded on non-2xx
        let err = interpret(&exchange(400, "Bad Request", SAMPLE_ERROR)).unwrap_err();
        assert!(matches!(err, NotificationError::Http { status: 400, .. }));

        let err = interpret(&exchange(300, "Multiple Choices", SAMPLE_SUCCESS)).unwrap_err();
        assert!(matches!(err, NotificationError::Http { status: 300, .. }));
    }

    #[test]
    fn t_interpret_decode_error() {
        let err = interpret(&exchange(200, "OK", "<3")).unwrap_err();
        assert!(matches!(err, NotificationError::Decode(_)));

        let err = interpret(&exchange(299, "", "<nma></nma>")).unwrap_err();
        assert!(matches!(err, NotificationError::Decode(_)));
    }
}
