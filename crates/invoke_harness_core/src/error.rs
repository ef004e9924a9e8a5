use thiserror::Error;

/// Error type handler units return from construction and entry points.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Terminal failures of a single harness run. Each message starts with the
/// kind name so the error stream identifies it without the exit code.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("MalformedReferenceError: handler reference '{reference}' must have the form <unit>::<entry-point>")]
    MalformedReference { reference: String },

    #[error("UnitNotFoundError: no handler unit named '{unit}' is registered")]
    UnitNotFound { unit: String },

    #[error("UnitConstructionError: unit '{unit}' failed to construct: {source}")]
    UnitConstruction {
        unit: String,
        #[source]
        source: HandlerError,
    },

    #[error("EntryPointNotFoundError: unit '{unit}' has no entry point named '{entry_point}'")]
    EntryPointNotFound { unit: String, entry_point: String },

    #[error("SignatureMismatchError: entry point '{unit}::{entry_point}' {reason}")]
    SignatureMismatch {
        unit: String,
        entry_point: String,
        reason: String,
    },

    #[error("PayloadDecodeError: {reason}")]
    PayloadDecode { reason: String },

    #[error("HandlerInvocationError: '{reference}' failed: {source}")]
    HandlerInvocation {
        reference: String,
        #[source]
        source: HandlerError,
    },

    #[error("InputReadError: failed to read payload from stdin: {0}")]
    InputRead(#[from] std::io::Error),
}

impl HarnessError {
    pub fn payload_decode(reason: impl Into<String>) -> Self {
        Self::PayloadDecode {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedReference { .. } => "MalformedReferenceError",
            Self::UnitNotFound { .. } => "UnitNotFoundError",
            Self::UnitConstruction { .. } => "UnitConstructionError",
            Self::EntryPointNotFound { .. } => "EntryPointNotFoundError",
            Self::SignatureMismatch { .. } => "SignatureMismatchError",
            Self::PayloadDecode { .. } => "PayloadDecodeError",
            Self::HandlerInvocation { .. } => "HandlerInvocationError",
            Self::InputRead(_) => "InputReadError",
        }
    }

    /// Process exit status for this kind. 1 and 2 stay free for bootstrap
    /// and usage failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedReference { .. } => 3,
            Self::UnitNotFound { .. } => 4,
            Self::UnitConstruction { .. } => 5,
            Self::EntryPointNotFound { .. } => 6,
            Self::SignatureMismatch { .. } => 7,
            Self::PayloadDecode { .. } => 8,
            Self::HandlerInvocation { .. } => 9,
            Self::InputRead(_) => 10,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("unit '{0}' is already registered")]
    DuplicateUnit(String),

    #[error("unit name '{0}' must be non-empty and must not contain '::'")]
    InvalidUnitName(String),

    #[error("unit '{unit}' declares entry point '{entry_point}' more than once")]
    DuplicateEntryPoint { unit: String, entry_point: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_lead_with_kind_name() {
        let errors = vec![
            HarnessError::MalformedReference {
                reference: "a::b::c".to_string(),
            },
            HarnessError::UnitNotFound {
                unit: "bad".to_string(),
            },
            HarnessError::UnitConstruction {
                unit: "broken.Unit".to_string(),
                source: "no config".into(),
            },
            HarnessError::EntryPointNotFound {
                unit: "helloworld.Hello".to_string(),
                entry_point: "missing".to_string(),
            },
            HarnessError::SignatureMismatch {
                unit: "helloworld.Hello".to_string(),
                entry_point: "batch".to_string(),
                reason: "takes an input the harness cannot decode".to_string(),
            },
            HarnessError::payload_decode("not an object"),
            HarnessError::HandlerInvocation {
                reference: "helloworld.Hello::handler".to_string(),
                source: "boom".into(),
            },
            HarnessError::InputRead(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "closed",
            )),
        ];

        for error in errors {
            assert!(
                error.to_string().starts_with(error.kind()),
                "{error} should start with {}",
                error.kind()
            );
        }
    }

    #[test]
    fn exit_codes_are_distinct_and_non_zero() {
        let codes = [
            HarnessError::MalformedReference {
                reference: String::new(),
            }
            .exit_code(),
            HarnessError::UnitNotFound {
                unit: String::new(),
            }
            .exit_code(),
            HarnessError::UnitConstruction {
                unit: String::new(),
                source: "x".into(),
            }
            .exit_code(),
            HarnessError::EntryPointNotFound {
                unit: String::new(),
                entry_point: String::new(),
            }
            .exit_code(),
            HarnessError::SignatureMismatch {
                unit: String::new(),
                entry_point: String::new(),
                reason: String::new(),
            }
            .exit_code(),
            HarnessError::payload_decode("x").exit_code(),
            HarnessError::HandlerInvocation {
                reference: String::new(),
                source: "x".into(),
            }
            .exit_code(),
            HarnessError::InputRead(std::io::Error::other("x")).exit_code(),
        ];

        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(codes.iter().all(|code| *code > 2));
    }

    #[test]
    fn invocation_error_exposes_cause_as_source() {
        let error = HarnessError::HandlerInvocation {
            reference: "echo.Echo::handler".to_string(),
            source: "disk full".into(),
        };

        let source = std::error::Error::source(&error).expect("cause should be kept");
        assert_eq!(source.to_string(), "disk full");
        assert!(error.to_string().contains("disk full"));
    }
}
