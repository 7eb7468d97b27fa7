//! `UserSocialAuth`: a local user linked to one provider identity.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::blob;
use crate::db::DbUserSocialAuth;
use crate::error::StorageError;

/// Seconds before the real expiry at which an access token counts as expired.
pub const ACCESS_TOKEN_EXPIRED_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSocialAuth {
    pub id: i64,
    pub provider: String,
    pub uid: String,
    /// Whatever the provider handed back (tokens, expiry, profile bits).
    pub extra_data: Option<Value>,
    pub user_id: i64,
}

impl TryFrom<DbUserSocialAuth> for UserSocialAuth {
    type Error = StorageError;

    fn try_from(row: DbUserSocialAuth) -> Result<Self, Self::Error> {
        Ok(Self {
            extra_data: blob::decode(row.extra_data.as_deref())?,
            id: row.id,
            provider: row.provider,
            uid: row.uid,
            user_id: row.user_id,
        })
    }
}

impl UserSocialAuth {
    /// Folds `extra_data` into the stored value.
    ///
    /// Objects are merged key by key into an existing object; anything else
    /// replaces it. Blank input is ignored. Returns whether the value changed.
    pub fn merge_extra_data(&mut self, extra_data: Value) -> bool {
        if is_blank(&extra_data) || self.extra_data.as_ref() == Some(&extra_data) {
            return false;
        }
        let previous = self.extra_data.clone();
        self.extra_data = Some(match (self.extra_data.take(), extra_data) {
            (Some(Value::Object(mut current)), Value::Object(incoming)) => {
                current.extend(incoming);
                Value::Object(current)
            }
            (_, incoming) => incoming,
        });
        self.extra_data != previous
    }

    fn extra(&self, key: &str) -> Option<&Value> {
        self.extra_data.as_ref()?.get(key)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.extra("access_token")?.as_str()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.extra("refresh_token")?.as_str()
    }

    pub fn token_type(&self) -> Option<&str> {
        self.extra("token_type")?.as_str()
    }

    /// When the access token expires.
    ///
    /// `expires` larger than `now` is an absolute unix timestamp; otherwise
    /// it is a lifetime in seconds counted from `auth_time`.
    pub fn expiration_datetime(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let expires = self.extra("expires").and_then(as_i64)?;
        if expires > now.timestamp() {
            return DateTime::from_timestamp(expires, 0);
        }
        let auth_time = self.extra("auth_time").and_then(as_i64)?;
        DateTime::from_timestamp(auth_time, 0)?.checked_add_signed(TimeDelta::try_seconds(expires)?)
    }

    /// `false` when no expiry is known.
    pub fn access_token_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_datetime(now)
            .is_some_and(|exp| (exp - now).num_seconds() <= ACCESS_TOKEN_EXPIRED_THRESHOLD)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

// Fractional seconds are truncated; out-of-range floats saturate.
#[allow(clippy::cast_possible_truncation)]
fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(extra_data: Option<Value>) -> UserSocialAuth {
        UserSocialAuth {
            id: 1,
            provider: "google".to_string(),
            uid: "123".to_string(),
            extra_data,
            user_id: 1,
        }
    }

    #[test]
    fn merge_into_empty_replaces() {
        let mut e = entry(None);
        assert!(e.merge_extra_data(json!({"access_token": "a"})));
        assert_eq!(e.access_token(), Some("a"));
    }

    #[test]
    fn merge_objects_keeps_old_keys() {
        let mut e = entry(Some(json!({"access_token": "a", "uid": "x"})));
        assert!(e.merge_extra_data(json!({"access_token": "b", "expires": 60})));
        assert_eq!(
            e.extra_data,
            Some(json!({"access_token": "b", "uid": "x", "expires": 60}))
        );
    }

    #[test]
    fn blank_or_identical_input_is_a_noop() {
        let mut e = entry(Some(json!({"access_token": "a"})));
        assert!(!e.merge_extra_data(json!({})));
        assert!(!e.merge_extra_data(Value::Null));
        assert!(!e.merge_extra_data(json!({"access_token": "a"})));
        assert_eq!(e.extra_data, Some(json!({"access_token": "a"})));
    }

    #[test]
    fn subset_merge_reports_no_change() {
        let mut e = entry(Some(json!({"access_token": "a", "expires": 10})));
        assert!(!e.merge_extra_data(json!({"expires": 10})));
    }

    #[test]
    fn non_object_replaces_object() {
        let mut e = entry(Some(json!({"access_token": "a"})));
        assert!(e.merge_extra_data(json!("raw")));
        assert_eq!(e.extra_data, Some(json!("raw")));
    }

    #[test]
    fn absolute_expiry_timestamp() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let e = entry(Some(json!({"expires": 1_700_003_600})));
        assert_eq!(
            e.expiration_datetime(now),
            DateTime::from_timestamp(1_700_003_600, 0)
        );
        assert!(!e.access_token_expired(now));
    }

    #[test]
    fn relative_expiry_counts_from_auth_time() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let e = entry(Some(json!({"expires": "3600", "auth_time": 1_699_990_000})));
        assert_eq!(
            e.expiration_datetime(now),
            DateTime::from_timestamp(1_699_993_600, 0)
        );
        assert!(e.access_token_expired(now));
    }

    #[test]
    fn fractional_expiry_values_truncate() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let e = entry(Some(json!({"expires": 3600.7, "auth_time": 1_699_990_000.2})));
        assert_eq!(
            e.expiration_datetime(now),
            DateTime::from_timestamp(1_699_993_600, 0)
        );
        assert_eq!(as_i64(&json!(f64::MAX)), Some(i64::MAX));
    }

    #[test]
    fn expiry_within_threshold_counts_as_expired() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let e = entry(Some(json!({"expires": 1_700_000_003})));
        assert!(e.access_token_expired(now));
    }

    #[test]
    fn unknown_expiry_never_expires() {
        let now = Utc::now();
        assert!(!entry(None).access_token_expired(now));
        assert!(!entry(Some(json!({"expires": "soon"}))).access_token_expired(now));
        assert!(!entry(Some(json!({"expires": 10}))).access_token_expired(now));
    }

    #[test]
    fn malformed_stored_blob_fails_conversion() {
        let row = DbUserSocialAuth {
            id: 1,
            provider: "google".to_string(),
            uid: "1".to_string(),
            extra_data: Some("{broken".to_string()),
            user_id: 1,
        };
        let err = UserSocialAuth::try_from(row).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
