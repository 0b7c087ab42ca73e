use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProductId);
id_newtype!(ContractId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Farmer,
    Buyer,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Farmer => "farmer",
            UserRole::Buyer => "buyer",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserRole::Farmer => "Farmer",
            UserRole::Buyer => "Buyer",
        }
    }

    /// The role a user of this role trades with.
    pub fn counterpart(self) -> UserRole {
        match self {
            UserRole::Farmer => UserRole::Buyer,
            UserRole::Buyer => UserRole::Farmer,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "farmer" => Ok(UserRole::Farmer),
            "buyer" => Ok(UserRole::Buyer),
            other => Err(format!("unknown role '{other}' (expected farmer or buyer)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Accepted,
    Rejected,
    Delivered,
    Paid,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 5] = [
        ContractStatus::Pending,
        ContractStatus::Accepted,
        ContractStatus::Rejected,
        ContractStatus::Delivered,
        ContractStatus::Paid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContractStatus::Pending => "Pending",
            ContractStatus::Accepted => "Accepted",
            ContractStatus::Rejected => "Rejected",
            ContractStatus::Delivered => "Delivered",
            ContractStatus::Paid => "Paid",
        }
    }

    /// Edges of the contract lifecycle. Rejected and Paid are terminal.
    pub fn can_transition_to(self, next: ContractStatus) -> bool {
        matches!(
            (self, next),
            (ContractStatus::Pending, ContractStatus::Accepted)
                | (ContractStatus::Pending, ContractStatus::Rejected)
                | (ContractStatus::Accepted, ContractStatus::Delivered)
                | (ContractStatus::Delivered, ContractStatus::Paid)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ContractStatus::Rejected | ContractStatus::Paid)
    }

    /// Which party may move a contract into this status.
    pub fn actor(self) -> Option<UserRole> {
        match self {
            ContractStatus::Pending => None,
            ContractStatus::Delivered => Some(UserRole::Farmer),
            ContractStatus::Accepted | ContractStatus::Rejected | ContractStatus::Paid => {
                Some(UserRole::Buyer)
            }
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ContractStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown contract status '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    HalfAdvance,
    OnDelivery,
    ThirtyAdvance,
}

impl PaymentTerms {
    pub const ALL: [PaymentTerms; 3] = [
        PaymentTerms::HalfAdvance,
        PaymentTerms::OnDelivery,
        PaymentTerms::ThirtyAdvance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PaymentTerms::HalfAdvance => "50% advance, 50% on delivery",
            PaymentTerms::OnDelivery => "100% on delivery",
            PaymentTerms::ThirtyAdvance => "30% advance, 70% on delivery",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            PaymentTerms::HalfAdvance => "50-50",
            PaymentTerms::OnDelivery => "on-delivery",
            PaymentTerms::ThirtyAdvance => "30-70",
        }
    }

    /// Fraction of the total value due before delivery.
    pub fn advance_fraction(self) -> f64 {
        match self {
            PaymentTerms::HalfAdvance => 0.5,
            PaymentTerms::OnDelivery => 0.0,
            PaymentTerms::ThirtyAdvance => 0.3,
        }
    }
}

impl fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentTerms {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        PaymentTerms::ALL
            .into_iter()
            .find(|terms| terms.slug().eq_ignore_ascii_case(value) || terms.label() == value)
            .ok_or_else(|| {
                format!("unknown payment terms '{value}' (expected 50-50, on-delivery or 30-70)")
            })
    }
}

/// The produce a farmer may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crop {
    Wheat,
    Rice,
    Corn,
    Soybeans,
    Potatoes,
    Tomatoes,
    Cotton,
    Coffee,
}

impl Crop {
    pub const ALL: [Crop; 8] = [
        Crop::Wheat,
        Crop::Rice,
        Crop::Corn,
        Crop::Soybeans,
        Crop::Potatoes,
        Crop::Tomatoes,
        Crop::Cotton,
        Crop::Coffee,
    ];

    pub const NAMES: [&'static str; 8] = [
        "Wheat", "Rice", "Corn", "Soybeans", "Potatoes", "Tomatoes", "Cotton", "Coffee",
    ];

    pub fn name(self) -> &'static str {
        Self::NAMES[self as usize]
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Crop {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Crop::ALL
            .into_iter()
            .find(|crop| crop.name().eq_ignore_ascii_case(value))
            .ok_or_else(|| {
                format!(
                    "unknown product '{value}' (choose from {})",
                    Crop::NAMES.join(", ")
                )
            })
    }
}
