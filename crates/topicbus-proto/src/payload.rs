//! Event payloads carried by publish and protocol traffic.

use crate::error::Error;
use crate::meta::Metadata;
use crate::value::Value;

/// Payload of a single bus event: an ordinary value or a metadata
/// descriptor.
///
/// Values and descriptors share one delivery channel; the topic suffix,
/// not the payload tag, decides which protocol an event belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// An ordinary topic value.
    Value(Value),
    /// A metadata descriptor travelling on a `$` topic.
    Meta(Metadata),
}

impl Payload {
    /// Try to get as a value reference.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Payload::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Try to get as a descriptor reference.
    pub fn as_meta(&self) -> Option<&Metadata> {
        match self {
            Payload::Meta(m) => Some(m),
            _ => None,
        }
    }

    /// Interpret the payload as a metadata descriptor.
    ///
    /// Descriptors arrive natively, as a JSON value, or as JSON text (the
    /// form byte-oriented transports deliver). Anything else is an error.
    pub fn to_meta(&self) -> Result<Metadata, Error> {
        match self {
            Payload::Meta(meta) => Ok(meta.clone()),
            Payload::Value(Value::Json(raw)) => Metadata::from_json_value(raw.clone()),
            Payload::Value(Value::Str(raw)) => Metadata::from_json_str(raw),
            other => Err(Error::InvalidMetadata(format!(
                "expected a descriptor, got {other:?}"
            ))),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl From<Metadata> for Payload {
    fn from(meta: Metadata) -> Self {
        Payload::Meta(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Dtype;

    #[test]
    fn test_payload_accessors() {
        let payload = Payload::from(Value::U8(3));
        assert_eq!(payload.as_value(), Some(&Value::U8(3)));
        assert!(payload.as_meta().is_none());

        let payload = Payload::from(Metadata::new(Dtype::Bool));
        assert!(payload.as_value().is_none());
        assert_eq!(payload.as_meta().unwrap().dtype, Dtype::Bool);
    }

    #[test]
    fn test_to_meta_forms() {
        let native = Payload::from(Metadata::new(Dtype::U8).with_brief("x"));
        assert_eq!(native.to_meta().unwrap().brief.as_deref(), Some("x"));

        let json = Payload::Value(Value::Json(serde_json::json!({"dtype": "u16"})));
        assert_eq!(json.to_meta().unwrap().dtype, Dtype::U16);

        let text = Payload::Value(Value::Str(r#"{"dtype": "bool"}"#.into()));
        assert_eq!(text.to_meta().unwrap().dtype, Dtype::Bool);

        assert!(Payload::Value(Value::U8(1)).to_meta().is_err());
        assert!(Payload::Value(Value::Str("not json".into())).to_meta().is_err());
    }
}
