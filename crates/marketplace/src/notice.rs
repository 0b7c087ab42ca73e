//! User-facing outcome messages, the shell's counterpart of toast notifications.

use serde::Serialize;
use shared::{
    amount,
    domain::{ContractStatus, UserRole},
    error::{MarketError, Severity},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn registered(role: UserRole) -> Self {
        let icon = match role {
            UserRole::Farmer => "👨‍🌾",
            UserRole::Buyer => "👔",
        };
        Self::success(format!("{icon} Registration successful! Please login."))
    }

    pub fn welcome(name: &str) -> Self {
        Self::success(format!("Welcome back, {name}!"))
    }

    pub fn product_added() -> Self {
        Self::success("Product added successfully!")
    }

    pub fn product_removed() -> Self {
        Self::success("Product removed successfully!")
    }

    pub fn proposal_created() -> Self {
        Self::success("Contract proposal created successfully!")
    }

    pub fn status_updated(status: ContractStatus) -> Self {
        Self::success(format!("Contract status updated to {status}"))
    }

    pub fn payment_processed(currency: &str, total: f64) -> Self {
        Self::success(format!(
            "Payment of {currency}{} processed successfully!",
            amount::money(total)
        ))
    }

    pub fn nobody_registered(role: UserRole) -> Self {
        Self::info(format!("No {}s registered yet", role.as_str()))
    }
}

impl From<&MarketError> for Notice {
    fn from(value: &MarketError) -> Self {
        Self::new(value.severity(), value.to_string())
    }
}
