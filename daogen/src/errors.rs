use thiserror::Error;

/// Synthesis-time configuration error.
///
/// Every variant describes field metadata that is internally inconsistent.
/// None of them depend on data flowing through generated code, so retrying
/// with the same inputs always reproduces the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    /// Operator name outside the fixed comparison set.
    #[error("unknown compare operator '{0}'")]
    UnknownOperator(String),

    /// Multi-value operator combined with a union of source columns.
    #[error("field '{field}' joins several columns and cannot use the multi-value operator '{operator}'")]
    OperatorShapeConflict { field: String, operator: String },

    /// A group appeared where only flat leaf fields are accepted.
    #[error("{context} supports only leaf fields, found a group")]
    UnexpectedGroup { context: &'static str },

    /// Leaf declared with an unsupported number of names.
    #[error("{context} requires exactly one name per field, found {found}")]
    NameCount { context: &'static str, found: usize },

    /// A second encryption function was registered.
    #[error("encryption function already registered as `{existing}`")]
    DuplicateHook { existing: String },

    /// Call built with an argument count its descriptor does not allow.
    #[error("call to `{function}` expects {} argument(s), got {found}", arity(.min, .extensible))]
    ArgumentCount {
        function: String,
        min: usize,
        extensible: bool,
        found: usize,
    },

    /// Write-path generator name missing from the function registry.
    #[error("unknown value generator '{0}'")]
    UnknownGenerator(String),

    /// Name that is not usable as an identifier in generated code.
    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

fn arity(min: &usize, extensible: &bool) -> String {
    if *extensible {
        format!("at least {min}")
    } else {
        format!("exactly {min}")
    }
}

/// Convenience alias for synthesizer results.
pub type Result<T, E = SynthError> = std::result::Result<T, E>;

/// Errors raised while loading and converting schema files.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML schema: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Synth(#[from] SynthError),

    #[error("unsupported schema format `{extension}`, expected `toml` or `json`")]
    UnsupportedFormat { extension: String },

    /// Schema parsed but describes something contradictory.
    #[error("invalid schema: {message}")]
    Invalid { message: String },
}

impl SchemaError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
