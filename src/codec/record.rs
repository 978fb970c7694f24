//! Persisted Record Codec
//!
//! Each logical entry is stored as one JSON text in the backing store:
//!
//! ```text
//! {"value": <json>, "expiresAt": <epoch-ms>}    with an expiry
//! {"value": <json>}                             without one
//! ```
//!
//! Stores can also hold text written by producers that never used the
//! envelope. Decoding therefore classifies the raw text once into a
//! [`Decoded`] variant, and [`Decoded::resolve`] turns that into the value a
//! reader sees (or nothing, when the record is expired or unusable).
//!
//! | raw text                         | decoded            | resolves to        |
//! |----------------------------------|--------------------|--------------------|
//! | absent                           | `Missing`          | `None`             |
//! | not JSON (`hello`)               | `Raw`              | the text           |
//! | object with `value` key          | `Record`           | payload, or `None` if expired |
//! | string / bool / array / object   | `Bare`             | itself             |
//! | number / `null`                  | `Invalid`          | `None`             |

use crate::error::StoreResult;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    system_time_to_millis(SystemTime::now())
}

fn system_time_to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => i64::try_from(since.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}

/// When an entry should stop being readable.
///
/// Converted to absolute epoch milliseconds at write time, so a
/// `SystemTime` is captured once and never re-evaluated on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// An absolute point in time
    At(SystemTime),
    /// An absolute epoch-millisecond timestamp
    AtMillis(i64),
}

impl Expiry {
    /// Expires `ttl` from now.
    pub fn after(ttl: Duration) -> Self {
        Expiry::At(SystemTime::now() + ttl)
    }

    /// Returns the expiry as epoch milliseconds.
    pub fn to_epoch_millis(&self) -> i64 {
        match *self {
            Expiry::At(time) => system_time_to_millis(time),
            Expiry::AtMillis(ms) => ms,
        }
    }
}

impl From<SystemTime> for Expiry {
    fn from(time: SystemTime) -> Self {
        Expiry::At(time)
    }
}

impl From<i64> for Expiry {
    fn from(ms: i64) -> Self {
        Expiry::AtMillis(ms)
    }
}

/// The envelope written for every entry set through the facade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredRecord {
    /// The logical payload
    pub value: Value,

    /// Absolute expiry in epoch milliseconds (None = never expires)
    #[serde(rename = "expiresAt", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl StoredRecord {
    pub fn new(value: Value, expires: Option<Expiry>) -> Self {
        Self {
            value,
            expires_at: expires.map(|e| e.to_epoch_millis()),
        }
    }

    /// Checks if this record has expired at `now_ms` (strictly past `expires_at`).
    #[inline]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.map(|exp| now_ms > exp).unwrap_or(false)
    }
}

/// Serializes a record into the text stored in the backing store.
pub fn encode(record: &StoredRecord) -> StoreResult<String> {
    Ok(serde_json::to_string(record)?)
}

/// Classification of a raw stored text.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Nothing stored under the key
    Missing,
    /// Text that is not JSON, kept verbatim
    Raw(String),
    /// A `{"value": ..}` envelope
    Record(StoredRecord),
    /// JSON written without the envelope
    Bare(Value),
    /// JSON that is neither an envelope nor a usable bare value
    Invalid,
}

impl Decoded {
    /// Returns the value a reader sees at `now_ms`.
    ///
    /// Expired envelopes and envelopes holding `null` resolve to `None`, the
    /// same as a key that was never set.
    pub fn resolve(self, now_ms: i64) -> Option<Value> {
        match self {
            Decoded::Record(record) => {
                if record.is_expired_at(now_ms) || record.value.is_null() {
                    None
                } else {
                    Some(record.value)
                }
            }
            Decoded::Raw(text) => Some(Value::String(text)),
            Decoded::Bare(value) => Some(value),
            Decoded::Missing | Decoded::Invalid => None,
        }
    }
}

/// Classifies raw stored text.
pub fn decode(raw: Option<&str>) -> Decoded {
    let Some(raw) = raw else {
        return Decoded::Missing;
    };

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(_) => return Decoded::Raw(raw.to_string()),
    };

    match parsed {
        Value::Object(mut map) if map.contains_key("value") => {
            // A non-numeric expiresAt is ignored rather than treated as expired.
            let expires_at = map.get("expiresAt").and_then(epoch_millis);
            let value = map.remove("value").unwrap_or(Value::Null);
            Decoded::Record(StoredRecord { value, expires_at })
        }
        value @ (Value::String(_) | Value::Bool(_) | Value::Array(_) | Value::Object(_)) => {
            Decoded::Bare(value)
        }
        Value::Null | Value::Number(_) => Decoded::Invalid,
    }
}

/// Reads a JSON number as epoch milliseconds, rounding fractions down.
///
/// With the strict `now > exp` comparison, `floor` keeps fractional and
/// integer timestamps on the same boundary.
fn epoch_millis(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_encode_without_expiry() {
        let record = StoredRecord::new(json!("hello"), None);
        assert_eq!(encode(&record).unwrap(), r#"{"value":"hello"}"#);
    }

    #[test]
    fn test_encode_with_expiry() {
        let record = StoredRecord::new(json!(true), Some(Expiry::AtMillis(NOW)));
        assert_eq!(
            encode(&record).unwrap(),
            format!(r#"{{"value":true,"expiresAt":{}}}"#, NOW)
        );
    }

    #[test]
    fn test_system_time_expiry_is_captured_as_millis() {
        let at = UNIX_EPOCH + Duration::from_millis(1234);
        assert_eq!(Expiry::from(at).to_epoch_millis(), 1234);

        let before_epoch = UNIX_EPOCH - Duration::from_millis(10);
        assert_eq!(Expiry::At(before_epoch).to_epoch_millis(), -10);
    }

    #[test]
    fn test_expiry_after_is_in_the_future() {
        let now = now_millis();
        let exp = Expiry::after(Duration::from_secs(60)).to_epoch_millis();
        assert!(exp >= now + 59_000);
    }

    #[test]
    fn test_decode_missing() {
        assert_eq!(decode(None), Decoded::Missing);
        assert_eq!(decode(None).resolve(NOW), None);
    }

    #[test]
    fn test_decode_non_json_passthrough() {
        let decoded = decode(Some("plain text"));
        assert_eq!(decoded, Decoded::Raw("plain text".to_string()));
        assert_eq!(decoded.resolve(NOW), Some(json!("plain text")));
    }

    #[test]
    fn test_decode_envelope() {
        let decoded = decode(Some(r#"{"value":{"foo":"bar"}}"#));
        assert_eq!(
            decoded,
            Decoded::Record(StoredRecord {
                value: json!({"foo": "bar"}),
                expires_at: None
            })
        );
        assert_eq!(decoded.resolve(NOW), Some(json!({"foo": "bar"})));
    }

    #[test]
    fn test_expiry_boundary() {
        let raw = format!(r#"{{"value":"v","expiresAt":{}}}"#, NOW);

        assert_eq!(decode(Some(raw.as_str())).resolve(NOW - 1), Some(json!("v")));
        assert_eq!(decode(Some(raw.as_str())).resolve(NOW), Some(json!("v")));
        assert_eq!(decode(Some(raw.as_str())).resolve(NOW + 1), None);
    }

    #[test]
    fn test_fractional_expiry_shares_integer_boundary() {
        let fractional = decode(Some(r#"{"value":"v","expiresAt":1000.5}"#));
        let integer = decode(Some(r#"{"value":"v","expiresAt":1000}"#));

        for now in [999, 1000, 1001] {
            assert_eq!(fractional.clone().resolve(now), integer.clone().resolve(now));
        }
        assert_eq!(fractional.clone().resolve(1000), Some(json!("v")));
        assert_eq!(fractional.resolve(1001), None);
    }

    #[test]
    fn test_non_numeric_expiry_is_ignored() {
        let decoded = decode(Some(r#"{"value":"v","expiresAt":"soon"}"#));
        assert_eq!(decoded.resolve(i64::MAX), Some(json!("v")));
    }

    #[test]
    fn test_null_payload_resolves_to_none() {
        assert_eq!(decode(Some(r#"{"value":null}"#)).resolve(NOW), None);
    }

    #[test]
    fn test_decode_bare_values() {
        assert_eq!(decode(Some(r#""hi""#)).resolve(NOW), Some(json!("hi")));
        assert_eq!(decode(Some("false")).resolve(NOW), Some(json!(false)));
        assert_eq!(decode(Some(r#"{"a":1}"#)).resolve(NOW), Some(json!({"a": 1})));
        assert_eq!(decode(Some("[1,2]")).resolve(NOW), Some(json!([1, 2])));
    }

    #[test]
    fn test_decode_invalid_values() {
        assert_eq!(decode(Some("42")), Decoded::Invalid);
        assert_eq!(decode(Some("null")), Decoded::Invalid);
        assert_eq!(decode(Some("42")).resolve(NOW), None);
    }
}
