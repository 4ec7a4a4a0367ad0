//! Error types shared across the advisor library

use thiserror::Error;

use crate::provider::Operation;

/// Errors raised while resolving profiles, talking to a provider, or
/// interpreting the records it returns.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("invalid profile id {0:?}")]
    InvalidProfileId(String),

    #[error("profile {0:?} not found")]
    ProfileNotFound(String),

    #[error("profile store error: {0}")]
    ProfileStore(String),

    #[error("cannot connect profile {profile_id:?}: {message}")]
    Connect { profile_id: String, message: String },

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("{operation} failed: {message}")]
    Provider {
        operation: Operation,
        message: String,
    },

    #[error("{operation} returned HTTP {status}: {body}")]
    HttpStatus {
        operation: Operation,
        status: u16,
        body: String,
    },

    #[error("{kind} record is missing required field `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("{kind} record has unexpected `{field}` value {value:?}")]
    UnexpectedValue {
        kind: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("inventory source error: {0}")]
    Inventory(String),

    #[error("unknown heuristic {0:?}")]
    UnknownHeuristic(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Returns the value of an optional record field, or a data-shape fault
/// naming the record kind and the field.
pub fn required<'a, T>(
    value: &'a Option<T>,
    kind: &'static str,
    field: &'static str,
) -> Result<&'a T> {
    value.as_ref().ok_or(AdvisorError::MissingField { kind, field })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_present() {
        let v = Some("ocid1.instance".to_string());
        assert_eq!(required(&v, "Instance", "id").unwrap(), "ocid1.instance");
    }

    #[test]
    fn test_required_missing_names_field() {
        let v: Option<String> = None;
        let err = required(&v, "Instance", "displayName").unwrap_err();
        assert!(matches!(
            err,
            AdvisorError::MissingField {
                kind: "Instance",
                field: "displayName"
            }
        ));
        assert_eq!(
            err.to_string(),
            "Instance record is missing required field `displayName`"
        );
    }

    #[test]
    fn test_provider_error_display() {
        let err = AdvisorError::HttpStatus {
            operation: Operation::ListVolumes,
            status: 404,
            body: "NotAuthorizedOrNotFound".into(),
        };
        assert_eq!(
            err.to_string(),
            "ListVolumes returned HTTP 404: NotAuthorizedOrNotFound"
        );
    }
}
