//! The envelope carried from a publisher to every observer.

use serde::{Deserialize, Serialize};

/// Well-known action verbs.
pub mod actions {
    /// Plot an x-y series.
    pub const PLOT: &str = "plot";
}

/// A message published by a provider.
///
/// `payload` is itself a serialized document owned by the plotting layer;
/// the relay treats the whole envelope as opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Publisher-generated unique identifier.
    pub id: String,
    /// Human-readable publisher name.
    #[serde(default)]
    pub name: String,
    /// Verb such as `"plot"`.
    pub action: String,
    /// Serialized sub-payload.
    pub payload: String,
}

impl Envelope {
    /// Create a new envelope.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        action: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            action: action.into(),
            payload: payload.into(),
        }
    }

    /// Create a `plot` envelope.
    #[must_use]
    pub fn plot(id: impl Into<String>, name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::new(id, name, actions::PLOT, payload)
    }

    /// Check whether this envelope carries the given action.
    #[must_use]
    pub fn is_action(&self, action: &str) -> bool {
        self.action == action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plot_envelope() {
        let env = Envelope::plot("abc", "session", "{}");
        assert!(env.is_action(actions::PLOT));
        assert_eq!(env.name, "session");
    }

    #[test]
    fn test_json_field_names() {
        let env = Envelope::new("id-1", "n", "plot", "X");
        let value = serde_json::to_value(&env).unwrap();
        assert_eq!(value["id"], "id-1");
        assert_eq!(value["name"], "n");
        assert_eq!(value["action"], "plot");
        assert_eq!(value["payload"], "X");
    }

    #[test]
    fn test_missing_name_defaults_to_empty() {
        let env: Envelope =
            serde_json::from_str(r#"{"id":"1","action":"plot","payload":"X"}"#).unwrap();
        assert_eq!(env.name, "");
    }
}
