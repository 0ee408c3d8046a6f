//! Topic metadata descriptors.
//!
//! A descriptor tells consumers how to interpret and present a topic:
//! wire type, human text, allowed options, numeric bounds, access flags.
//! Descriptors travel on `$` topics and round-trip through the JSON form
//! device firmware emits.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::value::{Dtype, Value};

/// Access and visibility flags for a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetaFlag {
    /// Read-only: consumers must not publish to the topic.
    Ro,
    /// Hidden from generated interfaces.
    Hide,
    /// Developer-facing; hidden outside development builds.
    Dev,
}

/// One selectable option: a raw wire value with an optional display label.
///
/// The JSON form is `[raw]` or `[raw, label]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaOption {
    /// The raw value published on the topic.
    pub value: Value,
    /// Human-readable label; the raw value is shown when absent.
    pub label: Option<String>,
}

impl MetaOption {
    /// Create an option from its raw value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Check whether a published value selects this option.
    ///
    /// Matches the raw value, or the label when the value is its string.
    pub fn matches(&self, value: &Value) -> bool {
        if &self.value == value {
            return true;
        }
        match (value, &self.label) {
            (Value::Str(s), Some(label)) => s == label,
            _ => false,
        }
    }
}

impl Serialize for MetaOption {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.label.is_some() { 2 } else { 1 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.value)?;
        if let Some(label) = &self.label {
            seq.serialize_element(label)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for MetaOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
        let mut parts = raw.into_iter();
        let value = match parts.next() {
            Some(v) => Value::from_json(v),
            None => {
                return Err(de::Error::custom(
                    "option entries take one or two elements: [value] or [value, label]",
                ))
            }
        };
        let label = parts.next().map(|v| match v {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        if parts.next().is_some() {
            return Err(de::Error::custom(
                "option entries take one or two elements: [value] or [value, label]",
            ));
        }
        Ok(MetaOption { value, label })
    }
}

/// Validated numeric bounds for an integer topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaRange {
    /// Smallest allowed value.
    pub min: i64,
    /// Largest allowed value.
    pub max: i64,
    /// Increment between values.
    pub step: i64,
}

/// Schema descriptor attached to a topic, independent of its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Wire data type for the topic's values.
    pub dtype: Dtype,
    /// One-line human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
    /// Extended human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Initial value published when the topic is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Allowed values, in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<MetaOption>>,
    /// Access and visibility flags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<MetaFlag>,
    /// Raw `[min, max]` or `[min, max, step]` bounds; integer dtypes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<i64>>,
    /// Rendering hint, e.g. `"version"` for a packed major.minor.patch u32.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Whether the default is published retained (boolean-coercible).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain: Option<Value>,
}

impl Metadata {
    /// Create a descriptor for the given wire type.
    pub fn new(dtype: Dtype) -> Self {
        Self {
            dtype,
            brief: None,
            detail: None,
            default: None,
            options: None,
            flags: Vec::new(),
            range: None,
            format: None,
            retain: None,
        }
    }

    /// Set the one-line description.
    pub fn with_brief(mut self, brief: impl Into<String>) -> Self {
        self.brief = Some(brief.into());
        self
    }

    /// Set the extended description.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the initial value published at creation.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Append a selectable option.
    pub fn with_option(mut self, option: MetaOption) -> Self {
        self.options.get_or_insert_with(Vec::new).push(option);
        self
    }

    /// Add an access/visibility flag.
    pub fn with_flag(mut self, flag: MetaFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    /// Set `[min, max]` bounds.
    pub fn with_range(mut self, min: i64, max: i64) -> Self {
        self.range = Some(vec![min, max]);
        self
    }

    /// Set `[min, max, step]` bounds.
    pub fn with_range_step(mut self, min: i64, max: i64, step: i64) -> Self {
        self.range = Some(vec![min, max, step]);
        self
    }

    /// Set the rendering hint.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Mark whether the default is published retained.
    pub fn with_retain(mut self, retain: bool) -> Self {
        self.retain = Some(Value::Bool(retain));
        self
    }

    /// Check if the descriptor carries the given flag.
    pub fn has_flag(&self, flag: MetaFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// The validated bounds, if any were declared.
    pub fn range(&self) -> Result<Option<MetaRange>, Error> {
        match self.range.as_deref() {
            None => Ok(None),
            Some([min, max]) => Ok(Some(MetaRange {
                min: *min,
                max: *max,
                step: 1,
            })),
            Some([min, max, step]) => Ok(Some(MetaRange {
                min: *min,
                max: *max,
                step: *step,
            })),
            Some(other) => Err(Error::InvalidRange(other.len())),
        }
    }

    /// The coerced retain flag; false when not declared.
    pub fn retain_flag(&self) -> Result<bool, Error> {
        match &self.retain {
            None => Ok(false),
            Some(raw) => raw.coerce_bool(),
        }
    }

    /// Check a published value against the declared options.
    ///
    /// Always true when no options are declared.
    pub fn option_allows(&self, value: &Value) -> bool {
        match &self.options {
            Some(options) if !options.is_empty() => options.iter().any(|o| o.matches(value)),
            _ => true,
        }
    }

    /// Validate the descriptor's internal consistency.
    ///
    /// Runs before a descriptor is stored anywhere, so a bad descriptor
    /// never leaves a partially mutated topic behind.
    pub fn validate(&self) -> Result<(), Error> {
        self.range()?;
        self.retain_flag()?;
        Ok(())
    }

    /// Parse a descriptor from its JSON value form.
    pub fn from_json_value(raw: serde_json::Value) -> Result<Metadata, Error> {
        serde_json::from_value(raw).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }

    /// Parse a descriptor from JSON text.
    pub fn from_json_str(raw: &str) -> Result<Metadata, Error> {
        serde_json::from_str(raw).map_err(|e| Error::InvalidMetadata(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_builder() {
        let meta = Metadata::new(Dtype::U32)
            .with_brief("LED blink rate")
            .with_default(2u32)
            .with_range(0, 10)
            .with_flag(MetaFlag::Ro)
            .with_flag(MetaFlag::Ro);

        assert_eq!(meta.dtype, Dtype::U32);
        assert_eq!(meta.default, Some(Value::U32(2)));
        assert_eq!(meta.flags, vec![MetaFlag::Ro]);
        assert!(meta.has_flag(MetaFlag::Ro));
        assert!(!meta.has_flag(MetaFlag::Hide));
        assert_eq!(
            meta.range().unwrap(),
            Some(MetaRange {
                min: 0,
                max: 10,
                step: 1
            })
        );
    }

    #[test]
    fn test_range_validation() {
        let meta = Metadata::new(Dtype::I16).with_range_step(-5, 5, 2);
        assert_eq!(
            meta.range().unwrap(),
            Some(MetaRange {
                min: -5,
                max: 5,
                step: 2
            })
        );

        let mut bad = Metadata::new(Dtype::I16);
        bad.range = Some(vec![1]);
        assert!(matches!(bad.range(), Err(Error::InvalidRange(1))));
        assert!(bad.validate().is_err());

        bad.range = Some(vec![1, 2, 3, 4]);
        assert!(matches!(bad.range(), Err(Error::InvalidRange(4))));
    }

    #[test]
    fn test_retain_flag_spellings() {
        assert!(!Metadata::new(Dtype::Bool).retain_flag().unwrap());
        assert!(Metadata::new(Dtype::Bool)
            .with_retain(true)
            .retain_flag()
            .unwrap());

        let mut meta = Metadata::new(Dtype::Bool);
        meta.retain = Some(Value::Str("ON".into()));
        assert!(meta.retain_flag().unwrap());

        meta.retain = Some(Value::Str("sometimes".into()));
        assert!(meta.retain_flag().is_err());
        assert!(meta.validate().is_err());
    }

    #[test]
    fn test_option_matching() {
        let meta = Metadata::new(Dtype::U8)
            .with_option(MetaOption::new(0u8).with_label("off"))
            .with_option(MetaOption::new(1u8).with_label("on"));

        assert!(meta.option_allows(&Value::U8(0)));
        assert!(meta.option_allows(&Value::U8(1)));
        assert!(meta.option_allows(&Value::Str("on".into()))); // label match
        assert!(!meta.option_allows(&Value::U8(2)));
        assert!(!meta.option_allows(&Value::Str("standby".into())));

        // No declared options: everything is allowed.
        assert!(Metadata::new(Dtype::U8).option_allows(&Value::U8(200)));
    }

    #[test]
    fn test_firmware_json_form() {
        let raw = r#"{
            "dtype": "u8",
            "brief": "Echo enable",
            "default": 0,
            "options": [[0, "off"], [1, "on"]],
            "flags": ["hide"],
            "retain": "on"
        }"#;
        let meta = Metadata::from_json_str(raw).unwrap();
        assert_eq!(meta.dtype, Dtype::U8);
        assert_eq!(meta.default, Some(Value::I64(0))); // JSON integers land in I64
        assert_eq!(meta.options.as_ref().unwrap().len(), 2);
        assert_eq!(
            meta.options.as_ref().unwrap()[1].label.as_deref(),
            Some("on")
        );
        assert_eq!(meta.flags, vec![MetaFlag::Hide]);
        assert!(meta.retain_flag().unwrap());

        // Round-trip keeps the wire shape.
        let encoded = serde_json::to_value(&meta).unwrap();
        assert_eq!(encoded["dtype"], "u8");
        assert_eq!(encoded["options"][0], serde_json::json!([0, "off"]));
        assert!(encoded.get("range").is_none());
    }

    #[test]
    fn test_invalid_metadata_json() {
        assert!(Metadata::from_json_str("not json").is_err());
        assert!(Metadata::from_json_str(r#"{"brief": "missing dtype"}"#).is_err());
        assert!(Metadata::from_json_str(r#"{"dtype": "u128"}"#).is_err());
        assert!(Metadata::from_json_str(r#"{"dtype": "u8", "options": [[]]}"#).is_err());
        assert!(Metadata::from_json_str(r#"{"dtype": "u8", "options": [[1, "a", "b"]]}"#).is_err());
    }

    #[test]
    fn test_version_format_hint() {
        let meta = Metadata::new(Dtype::U32)
            .with_format("version")
            .with_flag(MetaFlag::Ro);
        assert_eq!(meta.format.as_deref(), Some("version"));
    }
}
