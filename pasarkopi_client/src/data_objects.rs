//! Wire shapes specific to the order service's REST API.
//!
//! The order/transaction payloads themselves are the engine's canonical types; this module only adds the
//! envelopes the server wraps them in and the `{"error": ...}` body convention of its failure responses.

use pasarkopi_engine::order_types::Order;
use serde::{Deserialize, Serialize};

/// Successful order endpoints wrap the order in an `{"order": ...}` envelope.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OrderEnvelope {
    pub order: Order,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CancelOrderBody<'a> {
    pub reason: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Extracts the server's own error message from a failure body, if it follows the `{"error": ...}` convention.
pub fn server_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error).filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn error_messages_are_extracted_verbatim() {
        let body = r#"{"error": "Warkop Aroma is closed right now"}"#;
        assert_eq!(server_error_message(body).as_deref(), Some("Warkop Aroma is closed right now"));
    }

    #[test]
    fn non_conforming_bodies_yield_no_message() {
        assert_eq!(server_error_message("Internal Server Error"), None);
        assert_eq!(server_error_message(r#"{"message": "nope"}"#), None);
        assert_eq!(server_error_message(r#"{"error": "   "}"#), None);
        assert_eq!(server_error_message(""), None);
    }
}
