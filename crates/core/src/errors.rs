use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("could not tell which session to delete from `{0}`")]
    UnparseableDeleteTarget(String),
    #[error("repeat count {requested} exceeds the limit of {max}")]
    RepeatCountTooLarge { requested: u64, max: u32 },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("extraction failure: {0}")]
    Extraction(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Plain text safe to show the person chatting with the bot.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::UnparseableDeleteTarget(_)) => {
                "Which workout should I delete? Say \"undo\" for the last one or \"delete session #<id>\"."
            }
            Self::Domain(DomainError::RepeatCountTooLarge { .. }) => {
                "That's a lot of repeats. I can copy a workout at most 10 times per request."
            }
            Self::Domain(DomainError::InvariantViolation(_)) => {
                "That didn't look right, so nothing was recorded. Try rephrasing."
            }
            Self::NotFound(_) => "I couldn't find that workout.",
            Self::Extraction(_) => {
                "I couldn't extract workout details. Try something like: '3 sets of bench press at 185 lbs, 10 reps'"
            }
            Self::Persistence(_) => "Something went wrong saving that, so nothing was recorded. Please try again.",
            Self::Integration(_) => "I'm having trouble thinking right now. Please try again in a moment.",
            Self::Configuration(_) => "An unexpected internal error occurred.",
        }
    }

    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Forbidden { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Forbidden { .. } => "This user is not allowed to talk to the bot.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::Forbidden { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(error) => Self::BadRequest {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::NotFound(message) | ApplicationError::Extraction(message) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface =
            ApplicationError::from(DomainError::UnparseableDeleteTarget("delete it".to_owned()))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn unparseable_delete_target_asks_for_clarification() {
        let error =
            ApplicationError::from(DomainError::UnparseableDeleteTarget("delete it".to_owned()));
        assert!(error.user_message().contains("undo"));
    }

    #[test]
    fn oversized_repeat_count_asks_for_a_smaller_one() {
        let error = ApplicationError::from(DomainError::RepeatCountTooLarge {
            requested: 4_294_967_295,
            max: 10,
        });
        assert!(error.user_message().contains("at most 10 times"));
        assert!(matches!(error.into_interface("req-2"), InterfaceError::BadRequest { .. }));
    }

    #[test]
    fn extraction_failure_suggests_an_example() {
        let error = ApplicationError::Extraction("service exhausted retries".to_owned());
        assert!(error.user_message().starts_with("I couldn't extract workout details."));
    }

    #[test]
    fn persistence_error_maps_to_service_unavailable() {
        let error = ApplicationError::Persistence("database lock timeout".to_owned());
        assert!(error.user_message().contains("nothing was recorded"));

        let interface = error.into_interface("req-3");
        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-3");
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("missing model".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
