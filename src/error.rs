//! Error types for the operand engine.
//!
//! Every failure the engine can report is a variant of [`OperandError`].
//! Nothing is retried internally: these are metadata-authoring or call-site
//! mistakes, not transient conditions.

use std::fmt;

use crate::meta::ValidRange;

/// Error type for operand encoding, decoding and computation evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum OperandError {
    /// Bit range malformed, or a value does not fit its allocated width
    Range(String),

    /// Raw value outside the argument's declared `validRange`
    Validation {
        opcode: String,
        argument: String,
        value: i64,
        permitted: ValidRange,
    },

    /// Division or modulo by zero, or integer overflow, inside a computation
    Arithmetic { expression: String, message: String },

    /// Malformed computation syntax or a reference to an unbound identifier
    Evaluation { expression: String, message: String },

    /// Encode-path inversion found zero or several raw values
    NonInvertibleComputation {
        opcode: String,
        argument: String,
        expression: String,
        target: i64,
        matches: usize,
    },

    /// Encode call omitted a required operand argument
    MissingArgument { opcode: String, argument: String },

    /// Arity resolution needed a concrete operand word but none was given
    MissingOperand { what: &'static str },

    /// Metadata document violates the opcode metadata schema
    InvalidMetadata { opcode: String, reason: String },
}

/// Fieldless discriminant of [`OperandError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Range,
    Validation,
    Arithmetic,
    Evaluation,
    NonInvertibleComputation,
    MissingArgument,
    MissingOperand,
    InvalidMetadata,
}

impl OperandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Range(_) => ErrorKind::Range,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Arithmetic { .. } => ErrorKind::Arithmetic,
            Self::Evaluation { .. } => ErrorKind::Evaluation,
            Self::NonInvertibleComputation { .. } => ErrorKind::NonInvertibleComputation,
            Self::MissingArgument { .. } => ErrorKind::MissingArgument,
            Self::MissingOperand { .. } => ErrorKind::MissingOperand,
            Self::InvalidMetadata { .. } => ErrorKind::InvalidMetadata,
        }
    }

    /// Name the opcode and the field being processed in errors raised below
    /// that level. Variants that already carry both are returned unchanged.
    pub(crate) fn in_context(self, opcode: &str, subject: &str) -> Self {
        let prefix = |message: String| format!("opcode '{}' {}: {}", opcode, subject, message);
        match self {
            Self::Range(message) => Self::Range(prefix(message)),
            Self::Arithmetic {
                expression,
                message,
            } => Self::Arithmetic {
                expression,
                message: prefix(message),
            },
            Self::Evaluation {
                expression,
                message,
            } => Self::Evaluation {
                expression,
                message: prefix(message),
            },
            other => other,
        }
    }

    pub(crate) fn invalid_metadata(opcode: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            opcode: opcode.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for OperandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range(msg) => write!(f, "Range error: {}", msg),
            Self::Validation {
                opcode,
                argument,
                value,
                permitted,
            } => write!(
                f,
                "Validation error: opcode '{}' argument '{}' value {} is outside valid range {}",
                opcode, argument, value, permitted
            ),
            Self::Arithmetic {
                expression,
                message,
            } => write!(f, "Arithmetic error in '{}': {}", expression, message),
            Self::Evaluation {
                expression,
                message,
            } => write!(f, "Evaluation error in '{}': {}", expression, message),
            Self::NonInvertibleComputation {
                opcode,
                argument,
                expression,
                target,
                matches,
            } => write!(
                f,
                "Non-invertible computation: opcode '{}' argument '{}' computation '{}' \
                 has {} raw values mapping to {}",
                opcode, argument, expression, matches, target
            ),
            Self::MissingArgument { opcode, argument } => write!(
                f,
                "Missing argument: opcode '{}' requires operand argument '{}'",
                opcode, argument
            ),
            Self::MissingOperand { what } => write!(
                f,
                "Missing operand: computed {} need a concrete operand word",
                what
            ),
            Self::InvalidMetadata { opcode, reason } => {
                write!(f, "Invalid metadata for opcode '{}': {}", opcode, reason)
            }
        }
    }
}

impl std::error::Error for OperandError {}

/// Result type for engine operations
pub type OperandResult<T> = Result<T, OperandError>;

/// Error type for loading engine configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Config file could not be read
    Io(std::io::Error),
    /// Config file is not valid TOML for [`crate::config::EngineConfig`]
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::RangeEntry;

    #[test]
    fn test_validation_message_names_opcode_argument_and_value() {
        let err = OperandError::Validation {
            opcode: "read-memory".to_string(),
            argument: "index".to_string(),
            value: 42,
            permitted: ValidRange::new(vec![RangeEntry::Interval(0, 15)]),
        };
        let msg = err.to_string();
        assert!(msg.contains("read-memory"));
        assert!(msg.contains("index"));
        assert!(msg.contains("42"));
        assert!(msg.contains("[[0, 15]]"));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_missing_operand_message() {
        let err = OperandError::MissingOperand { what: "inputs" };
        assert_eq!(
            err.to_string(),
            "Missing operand: computed inputs need a concrete operand word"
        );
    }

    #[test]
    fn test_config_error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ConfigError = io.into();
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_in_context_names_opcode_and_subject() {
        let err = OperandError::Range("value 99 does not fit in bits [0, 3] (max 15)".to_string())
            .in_context("read-memory", "argument 'index'");
        assert_eq!(
            err.to_string(),
            "Range error: opcode 'read-memory' argument 'index': value 99 does not fit in bits [0, 3] (max 15)"
        );

        let err = OperandError::Arithmetic {
            expression: "12 / arg".to_string(),
            message: "division by zero".to_string(),
        }
        .in_context("my-op", "argument 'div'");
        assert_eq!(
            err.to_string(),
            "Arithmetic error in '12 / arg': opcode 'my-op' argument 'div': division by zero"
        );

        let missing = OperandError::MissingArgument {
            opcode: "op".to_string(),
            argument: "ix".to_string(),
        };
        assert_eq!(missing.clone().in_context("other", "argument 'zz'"), missing);
    }
}
