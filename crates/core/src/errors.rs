use thiserror::Error;

use crate::domain::category::Category;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("category {category} already reached its limit of {capacity} players")]
    CategoryFull { category: Category, capacity: u32 },
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("platform transport failure: {0}")]
    Transport(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
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
    /// Short text that is safe to show to the member who triggered the interaction.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest { message, .. } | Self::Forbidden { message, .. } => {
                format!("❌ {message}")
            }
            Self::ServiceUnavailable { .. } => {
                "❌ The bot could not reach Discord or its storage. Please retry shortly."
                    .to_owned()
            }
            Self::Internal { .. } => {
                "❌ An unexpected error occurred. Ask an administrator to check the logs."
                    .to_owned()
            }
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

impl ApplicationError {
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

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::PermissionDenied(message)) => {
                Self::Forbidden { message, correlation_id: unassigned }
            }
            ApplicationError::Domain(DomainError::NotFound { entity, .. }) => Self::BadRequest {
                message: format!("That {entity} could not be found."),
                correlation_id: unassigned,
            },
            ApplicationError::Domain(error @ DomainError::CategoryFull { .. }) => {
                Self::BadRequest { message: capitalize(&error.to_string()), correlation_id: unassigned }
            }
            ApplicationError::Domain(DomainError::InvalidInput(message)) => {
                Self::BadRequest { message, correlation_id: unassigned }
            }
            ApplicationError::Storage(message) | ApplicationError::Transport(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned }
            }
        }
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::category::Category;
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn category_full_maps_to_bad_request_with_limit() {
        let interface = ApplicationError::from(DomainError::CategoryFull {
            category: Category::Healer,
            capacity: 2,
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "❌ Category HEALER already reached its limit of 2 players"
        );
    }

    #[test]
    fn permission_denied_maps_to_forbidden() {
        let interface = ApplicationError::from(DomainError::PermissionDenied(
            "You need the Puxadores role.".to_owned(),
        ))
        .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::Forbidden { .. }));
        assert_eq!(interface.user_message(), "❌ You need the Puxadores role.");
    }

    #[test]
    fn storage_error_maps_to_service_unavailable() {
        let interface =
            ApplicationError::Storage("disk full".to_owned()).into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert!(!interface.user_message().contains("disk full"));
        assert_eq!(interface.correlation_id(), "req-3");
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("guest role missing".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
    }
}
