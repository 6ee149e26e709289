//! Queue message types for the user relay.
//!
//! A single flat record crosses the wire: the user supplied by the
//! publisher's caller, serialized as JSON and persisted unmodified by the
//! consumer.

use serde::{Deserialize, Serialize};

/// Exchange that receives published user records.
pub const USER_EXCHANGE: &str = "user.exchange";

/// Routing key binding the user queue to the exchange.
pub const USER_ROUTING_KEY: &str = "user.routingKey";

/// Flat user record exchanged between publisher and consumer.
///
/// Wire field names are `userId` and `userName`. The surrogate row id is
/// assigned by the store on insert and never travels over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// External-facing identifier supplied by the caller
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Display name
    #[serde(rename = "userName")]
    pub user_name: String,
}

impl UserRecord {
    /// Create a new user record.
    pub fn new(user_id: String, user_name: String) -> Self {
        Self { user_id, user_name }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_wire_field_names() {
        let record = UserRecord::new("u1".to_string(), "Alice".to_string());

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"userId\":\"u1\""));
        assert!(json.contains("\"userName\":\"Alice\""));
    }

    #[test]
    fn test_user_record_round_trip() {
        let record = UserRecord::new("42".to_string(), "Bob".to_string());

        let json = serde_json::to_string(&record).unwrap();
        let parsed: UserRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.user_id, "42");
        assert_eq!(parsed.user_name, "Bob");
    }

    #[test]
    fn test_user_record_empty_name_stays_empty() {
        let record = UserRecord::new("u2".to_string(), String::new());

        let json = serde_json::to_string(&record).unwrap();
        let parsed: UserRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.user_name, "");
    }

    #[test]
    fn test_user_record_rejects_malformed_payload() {
        let result: Result<UserRecord, _> = serde_json::from_slice(b"{\"userId\":17}");
        assert!(result.is_err());
    }
}
