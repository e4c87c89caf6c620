use thiserror::Error;

#[derive(Error, Debug)]
pub enum Vsi2wmError {
    #[error("Failed to load source document: {0}")]
    SourceLoadError(String),

    #[error("Malformed source document: {0}")]
    MalformedDocument(String),

    #[error("Source document has no transaction list")]
    MissingTransactionList,

    #[error("Unsupported helper {helper} in transaction '{transaction_id}' (strict mode)")]
    StrictHelper {
        transaction_id: String,
        helper: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("WireMock Cloud error: {0}")]
    CloudError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Vsi2wmError {
    /// Process exit status for this error.
    ///
    /// Input and strict-helper failures get their own codes so callers can tell them apart
    /// from ordinary conversion or I/O failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            Vsi2wmError::ConfigError(_) | Vsi2wmError::ValidationError(_) => 2,
            Vsi2wmError::SourceLoadError(_)
            | Vsi2wmError::MalformedDocument(_)
            | Vsi2wmError::MissingTransactionList => 3,
            Vsi2wmError::StrictHelper { .. } => 4,
            Vsi2wmError::CloudError(_)
            | Vsi2wmError::IoError(_)
            | Vsi2wmError::YamlError(_)
            | Vsi2wmError::JsonError(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Vsi2wmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_distinguish_fatal_classes() {
        assert_eq!(Vsi2wmError::MissingTransactionList.exit_code(), 3);
        assert_eq!(
            Vsi2wmError::StrictHelper {
                transaction_id: "t1".to_string(),
                helper: "{{=doX()}}".to_string(),
            }
            .exit_code(),
            4
        );
        assert_eq!(Vsi2wmError::ConfigError("bad".to_string()).exit_code(), 2);
        assert_eq!(Vsi2wmError::CloudError("down".to_string()).exit_code(), 1);
    }

    #[test]
    fn test_strict_helper_message_names_call_and_transaction() {
        let err = Vsi2wmError::StrictHelper {
            transaction_id: "GET#/users".to_string(),
            helper: "{{=doUnknown()}}".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("GET#/users"));
        assert!(message.contains("{{=doUnknown()}}"));
    }
}
