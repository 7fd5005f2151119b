//! The token record as issued by the authorization server

use access_token_clock::{Clock, DurationSecs, System, UnixTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{AccessToken, AccessTokenRef, RefreshToken, RefreshTokenRef};

/// A token as returned by the authorization server
///
/// The well-known fields are typed. Any other field the server returns is
/// carried along untouched in [`extra`][TokenRecord::extra] and written back
/// out when the record is serialized.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<AccessToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    expires_in: Option<DurationSecs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<UnixTime>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TokenRecord {
    /// Constructs an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the access token
    pub fn with_access_token(mut self, token: impl Into<AccessToken>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the refresh token
    pub fn with_refresh_token(mut self, token: impl Into<RefreshToken>) -> Self {
        self.refresh_token = Some(token.into());
        self
    }

    /// Sets the lifetime the token was issued with
    pub fn with_expires_in(mut self, lifetime: DurationSecs) -> Self {
        self.expires_in = Some(lifetime);
        self
    }

    /// Sets the absolute expiry
    pub fn with_expires_at(mut self, expiry: UnixTime) -> Self {
        self.expires_at = Some(expiry);
        self
    }

    /// Adds a passthrough field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// The access token, if present and non-empty
    #[inline]
    pub fn access_token(&self) -> Option<&AccessTokenRef> {
        self.access_token
            .as_deref()
            .filter(|t| !t.as_str().is_empty())
    }

    /// The refresh token, if present and non-empty
    #[inline]
    pub fn refresh_token(&self) -> Option<&RefreshTokenRef> {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.as_str().is_empty())
    }

    /// The lifetime the token was issued with
    #[inline]
    pub fn expires_in(&self) -> Option<DurationSecs> {
        self.expires_in
    }

    /// The absolute expiry, once the record has been normalized
    #[inline]
    pub fn expires_at(&self) -> Option<UnixTime> {
        self.expires_at
    }

    /// Fields returned by the server that have no typed accessor
    #[inline]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// Looks up a passthrough field
    #[inline]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    /// Forgets the computed expiry so that it will be recomputed
    pub(crate) fn clear_expires_at(&mut self) {
        self.expires_at = None;
    }

    /// Computes `expires_at` from `expires_in` using the system clock
    ///
    /// See [`normalize_with_clock`][Self::normalize_with_clock].
    pub fn normalize(&mut self) -> &mut Self {
        self.normalize_with_clock(&System)
    }

    /// Computes `expires_at` from `expires_in` if it is not already set
    ///
    /// Calling this on a record that already has an expiry is a no-op. A
    /// record without `expires_in` is treated as expiring immediately.
    pub fn normalize_with_clock<C: Clock>(&mut self, clock: &C) -> &mut Self {
        if self.expires_at.is_none() {
            let lifetime = self.expires_in.unwrap_or_default();
            self.expires_at = Some(clock.now() + lifetime);
        }
        self
    }

    /// Merges a fresher record into this one
    ///
    /// Fields present in `fresh` replace the corresponding fields here.
    /// Fields absent from `fresh` are kept.
    pub fn merge(&mut self, fresh: TokenRecord) -> &mut Self {
        let TokenRecord {
            access_token,
            refresh_token,
            expires_in,
            expires_at,
            extra,
        } = fresh;

        if access_token.is_some() {
            self.access_token = access_token;
        }
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        if expires_in.is_some() {
            self.expires_in = expires_in;
        }
        if expires_at.is_some() {
            self.expires_at = expires_at;
        }
        self.extra = merge_fields(std::mem::take(&mut self.extra), extra);
        self
    }
}

/// Merges two field maps, with `overlay` winning on conflicting keys
pub fn merge_fields(mut base: Map<String, Value>, overlay: Map<String, Value>) -> Map<String, Value> {
    base.extend(overlay);
    base
}

/// Some servers send `expires_in` as a string
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<DurationSecs>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Seconds::Number(n)) => Ok(Some(DurationSecs(n))),
        Some(Seconds::Text(s)) => s
            .trim()
            .parse()
            .map(|n| Some(DurationSecs(n)))
            .map_err(|_| D::Error::custom(format!("invalid expires_in: {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use access_token_clock::TestClock;
    use color_eyre::Result;
    use serde_json::json;

    use super::*;

    const NOW: UnixTime = UnixTime(1_700_000_000);

    #[test]
    fn normalize_computes_expiry_once() {
        let mut clock = TestClock::new(NOW);
        let mut record = TokenRecord::new().with_expires_in(DurationSecs(1000));

        record.normalize_with_clock(&clock);
        assert_eq!(record.expires_at(), Some(UnixTime(1_700_001_000)));

        clock.advance(DurationSecs(50));
        record.normalize_with_clock(&clock);
        assert_eq!(record.expires_at(), Some(UnixTime(1_700_001_000)));
    }

    #[test]
    fn normalize_without_lifetime_expires_now() {
        let clock = TestClock::new(NOW);
        let mut record = TokenRecord::new().with_access_token("abc");

        record.normalize_with_clock(&clock);
        assert_eq!(record.expires_at(), Some(NOW));
    }

    #[test]
    fn preserves_unknown_fields() -> Result<()> {
        let raw = json!({
            "access_token": "abc",
            "token_type": "bearer",
            "scope": "read write",
            "expires_in": 1000,
        });
        let record: TokenRecord = serde_json::from_value(raw.clone())?;

        assert_eq!(record.access_token().map(|t| t.as_str()), Some("abc"));
        assert_eq!(record.field("token_type"), Some(&json!("bearer")));
        assert_eq!(serde_json::to_value(&record)?, raw);
        Ok(())
    }

    #[test]
    fn accepts_string_lifetimes() -> Result<()> {
        let record: TokenRecord = serde_json::from_value(json!({ "expires_in": "3600" }))?;
        assert_eq!(record.expires_in(), Some(DurationSecs(3600)));

        let bad = serde_json::from_value::<TokenRecord>(json!({ "expires_in": "soon" }));
        assert!(bad.is_err());
        Ok(())
    }

    #[test]
    fn empty_tokens_count_as_missing() -> Result<()> {
        let record: TokenRecord =
            serde_json::from_value(json!({ "access_token": "", "refresh_token": "" }))?;
        assert!(record.access_token().is_none());
        assert!(record.refresh_token().is_none());
        Ok(())
    }

    #[test]
    fn merge_prefers_fresh_fields() {
        let mut record = TokenRecord::new()
            .with_access_token("old")
            .with_refresh_token("rt1")
            .with_expires_in(DurationSecs(10))
            .with_field("scope", "read")
            .with_field("token_type", "bearer");

        let fresh = TokenRecord::new()
            .with_access_token("new")
            .with_expires_in(DurationSecs(3600))
            .with_field("scope", "read write");

        record.merge(fresh);

        assert_eq!(record.access_token().map(|t| t.as_str()), Some("new"));
        assert_eq!(record.refresh_token().map(|t| t.as_str()), Some("rt1"));
        assert_eq!(record.expires_in(), Some(DurationSecs(3600)));
        assert_eq!(record.field("scope"), Some(&json!("read write")));
        assert_eq!(record.field("token_type"), Some(&json!("bearer")));
    }

    #[test]
    fn merge_fields_overlay_wins() {
        let base = json!({ "a": 1, "b": 2 }).as_object().cloned().unwrap_or_default();
        let overlay = json!({ "b": 3, "c": 4 }).as_object().cloned().unwrap_or_default();

        let merged = merge_fields(base, overlay);
        assert_eq!(Value::Object(merged), json!({ "a": 1, "b": 3, "c": 4 }));
    }
}
