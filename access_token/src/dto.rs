//! Wire shapes exchanged with the authorization server

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::{ClientIdRef, ClientSecretRef, RefreshTokenRef};

/// Form body of a `refresh_token` grant
#[derive(Debug)]
pub(crate) struct RefreshGrant<'a> {
    pub refresh_token: &'a RefreshTokenRef,
    pub client_id: &'a ClientIdRef,
    pub client_secret: &'a ClientSecretRef,
}

impl RefreshGrant<'_> {
    pub const GRANT_TYPE: &'static str = "refresh_token";
}

impl Serialize for RefreshGrant<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut ser = serializer.serialize_struct("RefreshGrant", 4)?;
        ser.serialize_field("refresh_token", self.refresh_token.as_str())?;
        ser.serialize_field("client_id", self.client_id.as_str())?;
        ser.serialize_field("client_secret", self.client_secret.as_str())?;
        ser.serialize_field("grant_type", Self::GRANT_TYPE)?;
        ser.end()
    }
}

/// Interprets a user info response body as a validity verdict
///
/// Only a JSON object without a truthy `error` member counts as valid.
pub(crate) fn user_info_accepts(body: &[u8]) -> bool {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(obj)) => !obj.get("error").map_or(false, is_truthy),
        _ => false,
    }
}

/// Parses a token endpoint body, yielding `None` for a blank body
pub(crate) fn token_body(body: &[u8]) -> Result<Option<Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body).map(Some)
}

/// Keeps only token bodies that carry something, dropping `null`, `false`, `0`, and `""`
pub(crate) fn issued_token(body: Option<Value>) -> Option<Value> {
    body.filter(is_truthy)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_info_verdicts() {
        assert!(user_info_accepts(br#"{}"#));
        assert!(user_info_accepts(br#"{"sub":"123","error":null}"#));
        assert!(user_info_accepts(br#"{"error":""}"#));
        assert!(!user_info_accepts(br#"{"error":"invalid_token"}"#));
        assert!(!user_info_accepts(br#"{"error":true}"#));
        assert!(!user_info_accepts(b""));
        assert!(!user_info_accepts(b"<html>nope</html>"));
        assert!(!user_info_accepts(b"[1, 2]"));
    }

    #[test]
    fn token_body_parses_any_json() -> Result<(), serde_json::Error> {
        assert!(token_body(b"")?.is_none());
        assert!(token_body(b"  \n")?.is_none());
        assert_eq!(token_body(b"null")?, Some(Value::Null));
        assert_eq!(
            token_body(br#""invalid_client""#)?,
            Some(Value::from("invalid_client"))
        );
        assert!(token_body(b"[1]")?.is_some());
        assert!(token_body(br#"{"access_token":"new"}"#)?.is_some());
        assert!(token_body(b"not json").is_err());
        Ok(())
    }

    #[test]
    fn falsy_token_bodies_carry_no_token() {
        assert!(issued_token(None).is_none());
        assert!(issued_token(Some(Value::Null)).is_none());
        assert!(issued_token(Some(Value::Bool(false))).is_none());
        assert!(issued_token(Some(Value::from(0))).is_none());
        assert!(issued_token(Some(Value::from(""))).is_none());
        assert!(issued_token(Some(Value::from("x"))).is_some());
        assert!(issued_token(Some(serde_json::json!({}))).is_some());
    }
}
