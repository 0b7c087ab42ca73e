use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ContractId, ContractStatus, PaymentTerms, ProductId, UserId, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub role: UserRole,
    pub name: String,
    pub contact: String,
    pub location: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub harvest_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractProposal {
    /// Username of the other party.
    pub counterparty: String,
    pub product_id: ProductId,
    pub quantity: f64,
    pub price: f64,
    pub delivery_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_terms: Option<PaymentTerms>,
}

/// Public view of a registered user. The password hash never leaves storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub role: UserRole,
    pub name: String,
    pub contact: String,
    pub location: String,
    pub username: String,
    pub registration_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub farmer_id: UserId,
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub harvest_date: NaiveDate,
    pub added_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: ContractId,
    pub farmer: String,
    pub buyer: String,
    pub product: String,
    pub quantity: f64,
    pub price: f64,
    pub total_value: f64,
    pub delivery_date: NaiveDate,
    pub payment_terms: PaymentTerms,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// Username of the party on the other side from `role`.
    pub fn counterparty_for(&self, role: UserRole) -> &str {
        match role {
            UserRole::Farmer => &self.buyer,
            UserRole::Buyer => &self.farmer,
        }
    }

    pub fn involves(&self, username: &str, role: UserRole) -> bool {
        match role {
            UserRole::Farmer => self.farmer == username,
            UserRole::Buyer => self.buyer == username,
        }
    }

    pub fn advance_due(&self) -> f64 {
        self.total_value * self.payment_terms.advance_fraction()
    }
}

/// A user of the opposite role together with the products on the table
/// when dealing with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterpartyListing {
    pub profile: UserProfile,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub user_id: UserId,
    pub username: String,
    pub name: String,
    pub role: UserRole,
}
