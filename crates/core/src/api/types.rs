use serde::{Deserialize, Serialize};

/// Classification of a route handler.
///
/// The HTTP boundary maps request methods onto these classes: reads go to
/// `Loader`, mutations to `Action`, and anything else to `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerbClass {
    Loader,
    Action,
    Default,
}

impl VerbClass {
    /// Classify an HTTP method name.
    pub fn from_method(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" => Self::Loader,
            "POST" | "PUT" | "PATCH" | "DELETE" => Self::Action,
            _ => Self::Default,
        }
    }
}

impl std::fmt::Display for VerbClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loader => write!(f, "loader"),
            Self::Action => write!(f, "action"),
            Self::Default => write!(f, "default"),
        }
    }
}
