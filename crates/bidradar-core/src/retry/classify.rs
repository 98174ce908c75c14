//! Classify upstream call outcomes into failure classes.

use super::error::TransportError;
use super::policy::{FailureClass, TransportKind};

/// Outcome of one attempted upstream call.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A complete response with its status code and raw body.
    Response { status: u32, body: Vec<u8> },
    /// The call failed before a response was complete.
    Transport(TransportError),
}

impl Outcome {
    pub fn status(&self) -> Option<u32> {
        match self {
            Outcome::Response { status, .. } => Some(*status),
            Outcome::Transport(_) => None,
        }
    }
}

/// Result of classifying an outcome.
#[derive(Debug, Clone)]
pub enum Classification {
    /// 200 with a JSON body.
    Success(serde_json::Value),
    Failure(FailureClass),
}

/// Classify an HTTP status code. `None` means 200 (body still has to parse).
///
/// | status | class |
/// |---|---|
/// | 400, 401, 403 | Terminal |
/// | 429 | RateLimited |
/// | >= 500 | ServerError |
/// | anything else but 200 | Terminal (unknown) |
pub fn classify_status(status: u32) -> Option<FailureClass> {
    match status {
        200 => None,
        400 | 401 | 403 => Some(FailureClass::Terminal),
        429 => Some(FailureClass::RateLimited),
        s if s >= 500 => Some(FailureClass::ServerError),
        _ => Some(FailureClass::Terminal),
    }
}

/// Classify a call outcome.
///
/// A 200 whose body is not JSON (the portal answers some key errors with an
/// XML envelope) counts as a generic transport failure and is retried.
pub fn classify(outcome: &Outcome) -> Classification {
    match outcome {
        Outcome::Transport(TransportError::Timeout(_)) => {
            Classification::Failure(FailureClass::Transport(TransportKind::Timeout))
        }
        Outcome::Transport(TransportError::Other(_)) => {
            Classification::Failure(FailureClass::Transport(TransportKind::Generic))
        }
        Outcome::Response { status, body } => match classify_status(*status) {
            Some(class) => Classification::Failure(class),
            None => match serde_json::from_slice(body) {
                Ok(value) => Classification::Success(value),
                Err(_) => {
                    Classification::Failure(FailureClass::Transport(TransportKind::Generic))
                }
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u32, body: &str) -> Outcome {
        Outcome::Response {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    fn class_of(outcome: &Outcome) -> FailureClass {
        match classify(outcome) {
            Classification::Failure(c) => c,
            Classification::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn auth_and_bad_request_are_terminal() {
        for status in [400, 401, 403] {
            assert_eq!(class_of(&response(status, "")), FailureClass::Terminal);
        }
    }

    #[test]
    fn http_429_is_rate_limited() {
        assert_eq!(class_of(&response(429, "")), FailureClass::RateLimited);
    }

    #[test]
    fn http_5xx_is_server_error() {
        assert_eq!(class_of(&response(500, "")), FailureClass::ServerError);
        assert_eq!(class_of(&response(503, "")), FailureClass::ServerError);
        assert_eq!(class_of(&response(599, "")), FailureClass::ServerError);
    }

    #[test]
    fn unknown_statuses_are_terminal() {
        assert_eq!(class_of(&response(404, "")), FailureClass::Terminal);
        assert_eq!(class_of(&response(204, "")), FailureClass::Terminal);
        assert_eq!(class_of(&response(302, "")), FailureClass::Terminal);
    }

    #[test]
    fn timeouts_and_other_transport_errors() {
        let timeout = Outcome::Transport(TransportError::Timeout("28".into()));
        let reset = Outcome::Transport(TransportError::Other("reset".into()));
        assert_eq!(
            class_of(&timeout),
            FailureClass::Transport(TransportKind::Timeout)
        );
        assert_eq!(
            class_of(&reset),
            FailureClass::Transport(TransportKind::Generic)
        );
    }

    #[test]
    fn ok_with_json_body_is_success() {
        match classify(&response(200, r#"{"response":{"body":{"items":[]}}}"#)) {
            Classification::Success(v) => assert!(v.get("response").is_some()),
            Classification::Failure(c) => panic!("unexpected failure {c}"),
        }
    }

    #[test]
    fn ok_with_unparsable_body_is_retryable_transport() {
        let o = response(200, "<OpenAPI_ServiceResponse>SERVICE ERROR</OpenAPI_ServiceResponse>");
        assert_eq!(class_of(&o), FailureClass::Transport(TransportKind::Generic));
    }
}
