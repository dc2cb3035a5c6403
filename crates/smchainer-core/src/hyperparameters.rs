//! Hyperparameters supplied to the training job.
//!
//! SageMaker writes `hyperparameters.json` with every value JSON-encoded as a
//! string (`{"use_mpi": "true", "num_processes": "4"}`). Values that parse as
//! JSON are decoded; anything else is kept as a plain string.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hyperparameters(Map<String, Value>);

impl Hyperparameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the raw map found on disk, decoding string-encoded values.
    #[must_use]
    pub fn from_raw(raw: Map<String, Value>) -> Self {
        let decoded = raw
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
                    other => other,
                };
                (key, value)
            })
            .collect();
        Self(decoded)
    }

    /// Parse the contents of a `hyperparameters.json` file.
    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let raw: Map<String, Value> = serde_json::from_str(content)?;
        Ok(Self::from_raw(raw))
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read a boolean hyperparameter. `None` when the key is absent.
    pub fn get_bool(&self, key: &str) -> CoreResult<Option<bool>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(other) => Err(invalid(key, format!("expected a boolean, got {other}"))),
        }
    }

    /// Read a non-negative integer hyperparameter. `None` when the key is absent.
    pub fn get_usize(&self, key: &str) -> CoreResult<Option<usize>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| invalid(key, format!("expected a non-negative integer, got {n}"))),
            Some(Value::String(s)) => s
                .trim()
                .parse::<usize>()
                .map(Some)
                .map_err(|_| invalid(key, format!("expected a non-negative integer, got \"{s}\""))),
            Some(other) => Err(invalid(key, format!("expected a non-negative integer, got {other}"))),
        }
    }
}

fn invalid(key: &str, reason: String) -> CoreError {
    CoreError::Hyperparameter { key: key.to_string(), reason }
}
