//! Service API authentication via timestamp and hash validation
//!
//! Admin requests carry a `timestamp` (Unix epoch ms) and a `hash`: the
//! SHA-256 of the request body in canonical JSON form (hash field zeroed,
//! keys sorted, no whitespace) concatenated with the shared secret. The
//! secret lives in the settings table; the special value 0 disables
//! checking entirely.
//!
//! This module contains only pure functions and database operations; the
//! axum middleware lives with each service.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// Maximum age of a request timestamp in milliseconds
const MAX_TIMESTAMP_AGE_MS: i64 = 1000;
/// Maximum clock-drift allowance into the future in milliseconds
const MAX_TIMESTAMP_FUTURE_MS: i64 = 1;

/// Placeholder written into the hash field before canonicalization
const DUMMY_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Authentication failure reasons
#[derive(Debug, Clone)]
pub enum ApiAuthError {
    /// Timestamp outside the acceptable window
    InvalidTimestamp { timestamp: i64, now: i64, reason: String },
    /// Hash does not match the calculated value
    InvalidHash { provided: String, calculated: String },
    MissingTimestamp,
    MissingHash,
    /// Database error loading the shared secret
    DatabaseError(String),
    ParseError(String),
}

impl std::fmt::Display for ApiAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuthError::InvalidTimestamp { reason, .. } => {
                write!(f, "Invalid timestamp: {}", reason)
            }
            ApiAuthError::InvalidHash { .. } => write!(f, "Invalid hash"),
            ApiAuthError::MissingTimestamp => write!(f, "Missing timestamp field"),
            ApiAuthError::MissingHash => write!(f, "Missing hash field"),
            ApiAuthError::DatabaseError(err) => write!(f, "Database error: {}", err),
            ApiAuthError::ParseError(err) => write!(f, "Parse error: {}", err),
        }
    }
}

impl std::error::Error for ApiAuthError {}

/// Load the shared secret from the settings table, generating and storing
/// one on first use. Returns 0 when auth is disabled.
#[cfg(feature = "sqlx")]
pub async fn load_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM settings WHERE key = 'api_shared_secret'")
            .fetch_optional(db)
            .await
            .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    match row {
        Some((value,)) => value
            .parse::<i64>()
            .map_err(|e| ApiAuthError::DatabaseError(format!("Invalid i64: {}", e))),
        None => initialize_shared_secret(db).await,
    }
}

/// Generate a cryptographically random non-zero secret and persist it
#[cfg(feature = "sqlx")]
pub async fn initialize_shared_secret(db: &SqlitePool) -> Result<i64, ApiAuthError> {
    use rand::Rng;

    let mut rng = rand::thread_rng();
    let secret: i64 = loop {
        let val = rng.gen::<i64>();
        if val != 0 {
            break val;
        }
    };

    sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES ('api_shared_secret', ?)")
        .bind(secret.to_string())
        .execute(db)
        .await
        .map_err(|e| ApiAuthError::DatabaseError(e.to_string()))?;

    Ok(secret)
}

/// Validate a request timestamp against the local clock
///
/// Past tolerance covers processing delay; future tolerance is minimal
/// (clock drift only).
pub fn validate_timestamp(timestamp: i64) -> Result<(), ApiAuthError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;

    let age = now - timestamp;

    if age > MAX_TIMESTAMP_AGE_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!("Timestamp {}ms too old (max {}ms past)", age, MAX_TIMESTAMP_AGE_MS),
        });
    }

    if age < -MAX_TIMESTAMP_FUTURE_MS {
        return Err(ApiAuthError::InvalidTimestamp {
            timestamp,
            now,
            reason: format!(
                "Timestamp {}ms in future (max {}ms future)",
                age.abs(),
                MAX_TIMESTAMP_FUTURE_MS
            ),
        });
    }

    Ok(())
}

/// Calculate the request hash: SHA-256 over canonical JSON (hash field
/// replaced with the dummy value) plus the shared secret as a decimal string
pub fn calculate_hash(json_value: &Value, shared_secret: i64) -> String {
    let mut value = json_value.clone();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hash".to_string(), Value::String(DUMMY_HASH.to_string()));
    }

    let canonical = to_canonical_json(&value);
    let to_hash = format!("{}{}", canonical, shared_secret);

    let mut hasher = Sha256::new();
    hasher.update(to_hash.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Canonical JSON: keys sorted alphabetically, no whitespace
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("\"{}\":{}", k, to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
    }
}

/// Validate a provided hash against the calculated value
pub fn validate_hash(
    provided_hash: &str,
    json_value: &Value,
    shared_secret: i64,
) -> Result<(), ApiAuthError> {
    let calculated = calculate_hash(json_value, shared_secret);

    if provided_hash != calculated {
        return Err(ApiAuthError::InvalidHash {
            provided: provided_hash.to_string(),
            calculated,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now_ms() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64
    }

    #[test]
    fn test_timestamp_window() {
        let now = now_ms();
        assert!(validate_timestamp(now).is_ok());
        assert!(validate_timestamp(now - 500).is_ok());
        assert!(validate_timestamp(now - 1500).is_err());
        assert!(validate_timestamp(now + 50).is_err());
    }

    #[test]
    fn test_hash_is_deterministic_and_keyed() {
        let body = json!({
            "name": "favorite_color",
            "timestamp": 1730000000000i64,
            "hash": "dummy"
        });

        let hash = calculate_hash(&body, 123456789);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, calculate_hash(&body, 123456789));
        assert_ne!(hash, calculate_hash(&body, 987654321));
    }

    #[test]
    fn test_hash_ignores_provided_hash_field() {
        let a = json!({"x": 1, "timestamp": 1i64, "hash": "aaaa"});
        let b = json!({"x": 1, "timestamp": 1i64, "hash": "bbbb"});
        assert_eq!(calculate_hash(&a, 7), calculate_hash(&b, 7));
    }

    #[test]
    fn test_canonical_json_sorted_and_compact() {
        let canonical = to_canonical_json(&json!({"z": 3, "a": 1, "m": [true, null]}));
        assert_eq!(canonical, r#"{"a":1,"m":[true,null],"z":3}"#);
    }

    #[test]
    fn test_validate_hash() {
        let body = json!({"op": "create", "timestamp": 5i64, "hash": "dummy"});
        let good = calculate_hash(&body, 42);
        assert!(validate_hash(&good, &body, 42).is_ok());
        assert!(validate_hash(DUMMY_HASH, &body, 42).is_err());
    }
}
