use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// A function the remote model is told it may call. Registered once when the
/// conversation starts and sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// A function that takes no arguments.
    pub fn without_parameters(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(
            name,
            description,
            json!({ "type": "object", "properties": {} }),
        )
    }

    pub fn random_number() -> Self {
        Self::without_parameters("randomNumber", "Returns a random number between 0 and 1000")
    }
}

/// Functions registered with every conversation unless the caller supplies its own.
pub fn default_functions() -> Vec<FunctionDescriptor> {
    vec![FunctionDescriptor::random_number()]
}
