use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ContractId, ContractStatus, ProductId, UserRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Conflict,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// Failures surfaced to whoever drives the marketplace. The display text is
/// the notification shown to the user.
#[derive(Debug, Error)]
pub enum MarketError {
    #[error("Missing fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
    #[error("Please enter both username and password")]
    MissingCredentials,
    #[error("Invalid contact number (10-15 digits)")]
    InvalidContact,
    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Please login first")]
    NotLoggedIn,
    #[error("Only a {required} can do that")]
    WrongRole { required: UserRole },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No {role} registered as '{username}'")]
    CounterpartyNotFound { username: String, role: UserRole },
    #[error("Product #{0} not found")]
    ProductNotFound(ProductId),
    #[error("No products available for contract")]
    NoProductsAvailable,
    #[error("Contract #{0} not found")]
    ContractNotFound(ContractId),
    #[error("A {role} cannot mark a contract as {status}")]
    NotPermitted {
        role: UserRole,
        status: ContractStatus,
    },
    #[error("Contract #{id} cannot move from {from} to {to}")]
    IllegalTransition {
        id: ContractId,
        from: ContractStatus,
        to: ContractStatus,
    },
    #[error("Error: {0}")]
    Storage(String),
    #[error("Error: {0}")]
    Internal(String),
}

impl MarketError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MarketError::MissingFields(_)
            | MarketError::MissingCredentials
            | MarketError::InvalidContact
            | MarketError::WeakPassword { .. }
            | MarketError::InvalidInput(_) => ErrorCode::Validation,
            MarketError::UsernameTaken | MarketError::IllegalTransition { .. } => {
                ErrorCode::Conflict
            }
            MarketError::InvalidCredentials | MarketError::NotLoggedIn => ErrorCode::Unauthorized,
            MarketError::WrongRole { .. } | MarketError::NotPermitted { .. } => {
                ErrorCode::Forbidden
            }
            MarketError::CounterpartyNotFound { .. }
            | MarketError::ProductNotFound(_)
            | MarketError::NoProductsAvailable
            | MarketError::ContractNotFound(_) => ErrorCode::NotFound,
            MarketError::Storage(_) | MarketError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Lookups that miss are warnings; everything else is an error.
    pub fn severity(&self) -> Severity {
        match self.code() {
            ErrorCode::NotFound => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl From<anyhow::Error> for MarketError {
    fn from(value: anyhow::Error) -> Self {
        Self::Storage(format!("{value:#}"))
    }
}

/// Serializable form of a [`MarketError`], used for machine-readable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl From<&MarketError> for ApiError {
    fn from(value: &MarketError) -> Self {
        Self {
            code: value.code(),
            message: value.to_string(),
        }
    }
}
