//! Preference model
//!
//! Preferences are typed key/value pairs rather than rows. In a snapshot each
//! one is written as `{ "key": .., "type": .., "value": .. }`, and the value
//! must agree with the declared type.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EncoreError;

/// Declared type of a preference value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreferenceType {
    Boolean,
    Int,
    Long,
    Float,
    String,
    StringSet,
}

impl fmt::Display for PreferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::String => "string",
            Self::StringSet => "stringSet",
        };
        write!(f, "{}", name)
    }
}

/// A typed preference value
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceValue {
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f64),
    String(String),
    StringSet(BTreeSet<String>),
}

impl PreferenceValue {
    /// The declared type for this value
    pub fn kind(&self) -> PreferenceType {
        match self {
            Self::Boolean(_) => PreferenceType::Boolean,
            Self::Int(_) => PreferenceType::Int,
            Self::Long(_) => PreferenceType::Long,
            Self::Float(_) => PreferenceType::Float,
            Self::String(_) => PreferenceType::String,
            Self::StringSet(_) => PreferenceType::StringSet,
        }
    }

    /// Interpret a JSON value as the given type
    pub fn from_json(kind: PreferenceType, value: Value) -> Result<Self, String> {
        let mismatch = |v: &Value| format!("value {} is not a valid {}", v, kind);

        match kind {
            PreferenceType::Boolean => value.as_bool().map(Self::Boolean).ok_or_else(|| mismatch(&value)),
            PreferenceType::Int => value
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(Self::Int)
                .ok_or_else(|| mismatch(&value)),
            PreferenceType::Long => value.as_i64().map(Self::Long).ok_or_else(|| mismatch(&value)),
            PreferenceType::Float => value
                .as_f64()
                .filter(|f| f.is_finite())
                .map(Self::Float)
                .ok_or_else(|| mismatch(&value)),
            PreferenceType::String => match value {
                Value::String(s) => Ok(Self::String(s)),
                other => Err(mismatch(&other)),
            },
            PreferenceType::StringSet => {
                let items = value.as_array().ok_or_else(|| mismatch(&value))?;
                items
                    .iter()
                    .map(|item| item.as_str().map(str::to_string))
                    .collect::<Option<BTreeSet<_>>>()
                    .map(Self::StringSet)
                    .ok_or_else(|| mismatch(&value))
            }
        }
    }

    /// Render the value as JSON
    pub fn to_json(&self) -> Value {
        match self {
            Self::Boolean(b) => Value::from(*b),
            Self::Int(n) => Value::from(*n),
            Self::Long(n) => Value::from(*n),
            Self::Float(f) => Value::from(*f),
            Self::String(s) => Value::from(s.clone()),
            Self::StringSet(set) => Value::from(set.iter().cloned().collect::<Vec<_>>()),
        }
    }
}

/// A single preference, as stored and as backed up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPreferenceEntry", into = "RawPreferenceEntry")]
pub struct PreferenceEntry {
    pub key: String,
    pub value: PreferenceValue,
}

/// Wire shape of a preference entry
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPreferenceEntry {
    key: String,
    #[serde(rename = "type")]
    kind: PreferenceType,
    value: Value,
}

impl TryFrom<RawPreferenceEntry> for PreferenceEntry {
    type Error = String;

    fn try_from(raw: RawPreferenceEntry) -> Result<Self, Self::Error> {
        let value = PreferenceValue::from_json(raw.kind, raw.value)
            .map_err(|e| format!("preference '{}': {}", raw.key, e))?;
        Ok(Self {
            key: raw.key,
            value,
        })
    }
}

impl From<PreferenceEntry> for RawPreferenceEntry {
    fn from(entry: PreferenceEntry) -> Self {
        Self {
            kind: entry.value.kind(),
            value: entry.value.to_json(),
            key: entry.key,
        }
    }
}

impl PreferenceEntry {
    pub fn new(key: impl Into<String>, value: PreferenceValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Validate the entry
    pub fn validate(&self) -> Result<(), EncoreError> {
        if self.key.trim().is_empty() {
            return Err(EncoreError::Validation(
                "Preference key cannot be empty".into(),
            ));
        }
        Ok(())
    }
}
