//! Error types for Washday

use thiserror::Error;

use crate::checkout::CheckoutStep;

pub type Result<T> = std::result::Result<T, WashdayError>;

#[derive(Error, Debug)]
pub enum WashdayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl WashdayError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WashdayError::InvalidInput(_) => 3,
            WashdayError::Checkout(_) => 3,
            WashdayError::Auth(_) => 2,
            WashdayError::Backend(BackendError::Status { status: 401, .. }) => 2,
            WashdayError::Backend(_) => 1,
            WashdayError::Config(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Row not found in {0}")]
    NotFound(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    /// A read that already failed and was logged
    #[error("Fetch failed: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No user is signed in")]
    NotSignedIn,

    #[error("Request rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("{0} step is not complete")]
    StepIncomplete(CheckoutStep),

    #[error("No service selected")]
    NoServiceSelected,

    #[error("Unknown time slot: {0}")]
    UnknownTimeSlot(String),

    #[error("Unknown item: {0}")]
    UnknownItem(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = WashdayError::InvalidInput("Empty cart".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_incomplete_checkout() {
        let error = WashdayError::Checkout(CheckoutError::StepIncomplete(CheckoutStep::Cart));
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_auth_error() {
        let error = WashdayError::Auth(AuthError::InvalidCredentials);
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_unauthorized_status() {
        let error = WashdayError::Backend(BackendError::Status {
            status: 401,
            message: "JWT expired".to_string(),
        });
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_backend_error() {
        let error = WashdayError::Backend(BackendError::NotFound("orders".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_config_error() {
        let error = WashdayError::Config(ConfigError::MissingField("backend.url".to_string()));
        assert_eq!(error.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting_checkout() {
        let error = WashdayError::Checkout(CheckoutError::StepIncomplete(
            CheckoutStep::TimeSlotSelection,
        ));
        assert_eq!(
            error.to_string(),
            "Checkout error: time slot selection step is not complete"
        );
    }

    #[test]
    fn test_error_message_formatting_status() {
        let error = WashdayError::Backend(BackendError::Status {
            status: 400,
            message: "invalid input syntax".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Backend error: Backend returned 400: invalid input syntax"
        );
    }

    #[test]
    fn test_error_conversion_from_config_error() {
        let config_error = ConfigError::MissingField("test".to_string());
        let error: WashdayError = config_error.into();
        assert!(matches!(error, WashdayError::Config(_)));
    }

    #[test]
    fn test_error_conversion_from_auth_error() {
        let error: WashdayError = AuthError::NotSignedIn.into();
        assert!(matches!(error, WashdayError::Auth(AuthError::NotSignedIn)));
    }
}
