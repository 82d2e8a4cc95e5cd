//! Typed marshalling envelope.
//!
//! The wire codec can only discriminate a handful of shapes natively. Values
//! that need richer typing (binary, dates, nested objects) travel as a JSON
//! tagged union `{"$mid": <id>, "value": ...}` that revives losslessly.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value as Json};

use crate::error::{ChainError, Result};

/// Tag key carried by every marshalled JSON object.
pub const MID_KEY: &str = "$mid";

/// Marshal ids, fixed for wire stability.
mod mid {
    pub const BINARY: i64 = 1;
    pub const STRING: i64 = 2;
    pub const INTEGER: i64 = 3;
    pub const DECIMAL: i64 = 4;
    pub const BOOLEAN: i64 = 5;
    pub const NULL: i64 = 6;
    pub const OBJECT: i64 = 7;
    pub const ARRAY: i64 = 8;
    pub const DATE: i64 = 9;
}

/// A value inside the marshalling envelope.
///
/// Objects use a `BTreeMap` so the emitted JSON key order is lexicographic,
/// which keeps the canonical byte stream reproducible.
#[derive(Debug, Clone, PartialEq)]
pub enum Marshalled {
    Binary(Bytes),
    String(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Null,
    Object(BTreeMap<String, Marshalled>),
    Array(Vec<Marshalled>),
    Date(DateTime<Utc>),
}

impl Marshalled {
    /// The `$mid` discriminator of this variant.
    pub fn mid(&self) -> i64 {
        match self {
            Self::Binary(_) => mid::BINARY,
            Self::String(_) => mid::STRING,
            Self::Integer(_) => mid::INTEGER,
            Self::Decimal(_) => mid::DECIMAL,
            Self::Boolean(_) => mid::BOOLEAN,
            Self::Null => mid::NULL,
            Self::Object(_) => mid::OBJECT,
            Self::Array(_) => mid::ARRAY,
            Self::Date(_) => mid::DATE,
        }
    }

    /// Emit the envelope JSON form.
    pub fn to_json(&self) -> Json {
        match self {
            Self::Binary(bytes) => json!({ MID_KEY: mid::BINARY, "value": BASE64.encode(bytes) }),
            Self::String(s) => json!({ MID_KEY: mid::STRING, "value": s }),
            Self::Integer(i) => json!({ MID_KEY: mid::INTEGER, "value": i }),
            Self::Decimal(d) => json!({ MID_KEY: mid::DECIMAL, "value": d }),
            Self::Boolean(b) => json!({ MID_KEY: mid::BOOLEAN, "value": b }),
            Self::Null => json!({ MID_KEY: mid::NULL }),
            Self::Object(map) => {
                let inner: serde_json::Map<String, Json> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                json!({ MID_KEY: mid::OBJECT, "value": inner })
            }
            Self::Array(items) => {
                let inner: Vec<Json> = items.iter().map(Marshalled::to_json).collect();
                json!({ MID_KEY: mid::ARRAY, "value": inner })
            }
            Self::Date(dt) => json!({
                MID_KEY: mid::DATE,
                "value": dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        }
    }

    /// Revive from the envelope JSON form.
    pub fn from_json(value: &Json) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| ChainError::InvalidType("marshalled value must be an object".into()))?;
        let id = obj
            .get(MID_KEY)
            .and_then(Json::as_i64)
            .ok_or_else(|| ChainError::InvalidType("marshalled value is missing $mid".into()))?;
        let body = obj.get("value");

        match id {
            mid::BINARY => {
                let text = body.and_then(Json::as_str).ok_or_else(|| {
                    ChainError::InvalidType("binary marshal requires a base64 string".into())
                })?;
                let bytes = BASE64
                    .decode(text)
                    .map_err(|e| ChainError::InvalidType(format!("invalid base64 payload: {e}")))?;
                Ok(Self::Binary(bytes.into()))
            }
            mid::STRING => body
                .and_then(Json::as_str)
                .map(|s| Self::String(s.to_string()))
                .ok_or_else(|| ChainError::InvalidType("string marshal requires a string".into())),
            mid::INTEGER => body
                .and_then(Json::as_i64)
                .map(Self::Integer)
                .ok_or_else(|| ChainError::InvalidType("integer marshal requires an integer".into())),
            mid::DECIMAL => body
                .and_then(Json::as_f64)
                .map(Self::Decimal)
                .ok_or_else(|| ChainError::InvalidType("decimal marshal requires a number".into())),
            mid::BOOLEAN => body
                .and_then(Json::as_bool)
                .map(Self::Boolean)
                .ok_or_else(|| ChainError::InvalidType("boolean marshal requires a bool".into())),
            mid::NULL => Ok(Self::Null),
            mid::OBJECT => {
                let map = body.and_then(Json::as_object).ok_or_else(|| {
                    ChainError::InvalidType("object marshal requires an object".into())
                })?;
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), Self::from_json(v)?);
                }
                Ok(Self::Object(out))
            }
            mid::ARRAY => {
                let items = body.and_then(Json::as_array).ok_or_else(|| {
                    ChainError::InvalidType("array marshal requires an array".into())
                })?;
                items.iter().map(Self::from_json).collect::<Result<Vec<_>>>().map(Self::Array)
            }
            mid::DATE => {
                let text = body.and_then(Json::as_str).ok_or_else(|| {
                    ChainError::InvalidType("date marshal requires an ISO-8601 string".into())
                })?;
                let parsed = DateTime::parse_from_rfc3339(text)
                    .map_err(|e| ChainError::InvalidType(format!("invalid date string: {e}")))?;
                Ok(Self::Date(parsed.with_timezone(&Utc)))
            }
            other => Err(ChainError::InvalidType(format!("unknown $mid {other}"))),
        }
    }

    /// Lift a plain JSON value into the envelope, picking the narrowest
    /// variant for each node.
    pub fn from_plain_json(value: &Json) -> Self {
        match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Boolean(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Decimal(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Array(items.iter().map(Self::from_plain_json).collect()),
            Json::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_plain_json(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_scalar_roundtrips() {
        let values = vec![
            Marshalled::String("hello".into()),
            Marshalled::Integer(-42),
            Marshalled::Decimal(3.25),
            Marshalled::Boolean(true),
            Marshalled::Null,
            Marshalled::Binary(Bytes::from_static(b"\x00\x01\xff")),
        ];
        for value in values {
            let json = value.to_json();
            let revived = Marshalled::from_json(&json).unwrap();
            assert_eq!(value, revived);
        }
    }

    #[test]
    fn test_nested_roundtrip() {
        let mut inner = BTreeMap::new();
        inner.insert("b".to_string(), Marshalled::Integer(2));
        inner.insert("a".to_string(), Marshalled::String("one".into()));

        let value = Marshalled::Array(vec![
            Marshalled::Object(inner),
            Marshalled::Null,
            Marshalled::Binary(Bytes::from_static(b"raw")),
        ]);

        let revived = Marshalled::from_json(&value.to_json()).unwrap();
        assert_eq!(value, revived);
    }

    #[test]
    fn test_date_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 17, 12, 30, 45).unwrap();
        let value = Marshalled::Date(dt);
        let revived = Marshalled::from_json(&value.to_json()).unwrap();
        assert_eq!(value, revived);
    }

    #[test]
    fn test_invalid_date_fails() {
        let bad = json!({ MID_KEY: 9, "value": "not-a-date" });
        assert!(matches!(
            Marshalled::from_json(&bad),
            Err(ChainError::InvalidType(_))
        ));
    }

    #[test]
    fn test_unknown_mid_fails() {
        let bad = json!({ MID_KEY: 99, "value": 1 });
        assert!(matches!(
            Marshalled::from_json(&bad),
            Err(ChainError::InvalidType(_))
        ));
    }

    #[test]
    fn test_object_json_keys_are_sorted() {
        let mut map = BTreeMap::new();
        map.insert("zeta".to_string(), Marshalled::Integer(1));
        map.insert("alpha".to_string(), Marshalled::Integer(2));
        let text = serde_json::to_string(&Marshalled::Object(map).to_json()).unwrap();
        assert!(text.find("alpha").unwrap() < text.find("zeta").unwrap());
    }

    #[test]
    fn test_from_plain_json() {
        let plain = json!({"count": 3, "ratio": 0.5, "name": "x", "tags": [true, null]});
        let lifted = Marshalled::from_plain_json(&plain);
        match lifted {
            Marshalled::Object(map) => {
                assert_eq!(map["count"], Marshalled::Integer(3));
                assert_eq!(map["ratio"], Marshalled::Decimal(0.5));
                assert_eq!(map["name"], Marshalled::String("x".into()));
                assert_eq!(
                    map["tags"],
                    Marshalled::Array(vec![Marshalled::Boolean(true), Marshalled::Null])
                );
            }
            other => panic!("expected object, got {other:?}"),
        }
    }
}
