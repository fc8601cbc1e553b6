//! Task identity derivation
//!
//! A TaskIdentity keys the duration history: two runs are statistically
//! comparable only when the function name and the rendered arguments match
//! exactly. Runs with different arguments are tracked independently.

use serde_json::{Map, Value};

/// Deterministic key for a task-plus-arguments combination
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskIdentity(String);

impl TaskIdentity {
    /// Derive an identity from a function name and its arguments
    ///
    /// Positional arguments render in order; keyword arguments render via
    /// `serde_json::Map`, which iterates in key order, so the same inputs
    /// always produce the same key.
    pub fn derive(func: &str, args: &[Value], kwargs: &Map<String, Value>) -> Self {
        let args_repr = Value::Array(args.to_vec()).to_string();
        let kwargs_repr = Value::Object(kwargs.clone()).to_string();
        Self(format!("{func}{args_repr}{kwargs_repr}"))
    }

    /// Build an identity from an explicit key
    ///
    /// Escape hatch for tasks whose argument rendering is unstable across
    /// invocations (large or random payloads): the caller picks a stable
    /// key itself instead of deriving one.
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the full key string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for TaskIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for TaskIdentity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for TaskIdentity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kwargs(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_derive_is_deterministic() {
        let a = TaskIdentity::derive("scan", &[json!(10)], &kwargs(&[("depth", json!(3))]));
        let b = TaskIdentity::derive("scan", &[json!(10)], &kwargs(&[("depth", json!(3))]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_kwargs_order_independent() {
        let a = TaskIdentity::derive(
            "scan",
            &[],
            &kwargs(&[("a", json!(1)), ("b", json!(2))]),
        );
        let b = TaskIdentity::derive(
            "scan",
            &[],
            &kwargs(&[("b", json!(2)), ("a", json!(1))]),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_distinguishes_arguments() {
        let ten = TaskIdentity::derive("count_up", &[json!(10)], &Map::new());
        let five = TaskIdentity::derive("count_up", &[json!(5)], &Map::new());
        let kw_five = TaskIdentity::derive("count_up", &[], &kwargs(&[("t", json!(5))]));
        assert_ne!(ten, five);
        assert_ne!(five, kw_five);
    }

    #[test]
    fn test_from_key_override() {
        let id = TaskIdentity::from_key("weighted_sum(len=4)");
        assert_eq!(id.as_str(), "weighted_sum(len=4)");
        assert_eq!(id, TaskIdentity::from("weighted_sum(len=4)"));
    }

    #[test]
    fn test_identity_serde() {
        let id = TaskIdentity::derive("f", &[], &Map::new());
        let json = serde_json::to_string(&id).unwrap();
        let back: TaskIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
