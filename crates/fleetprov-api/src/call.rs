// A single control-plane invocation: (service, action, parameters).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One remote call against the control plane.
///
/// `Debug` prints the parameter keys but never their values: resolved
/// parameters can carry key material on their way to the secret store.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiCall {
    pub service: String,
    pub action: String,
    #[serde(default = "empty_object")]
    pub parameters: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ApiCall {
    pub fn new(service: impl Into<String>, action: impl Into<String>, parameters: Value) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
            parameters,
        }
    }

    /// `service:action`, the form used in logs and diagnostics.
    pub fn label(&self) -> String {
        format!("{}:{}", self.service, self.action)
    }
}

impl fmt::Display for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.action)
    }
}

impl fmt::Debug for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self
            .parameters
            .as_object()
            .map(|m| m.keys().map(String::as_str).collect())
            .unwrap_or_default();
        f.debug_struct("ApiCall")
            .field("service", &self.service)
            .field("action", &self.action)
            .field("parameters", &keys)
            .finish()
    }
}
