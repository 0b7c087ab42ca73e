//! Form-level validation shared by every marketplace entry point.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::{
    amount,
    domain::{Crop, PaymentTerms},
    error::MarketError,
    records::{ProductInput, Registration},
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const DATE_FORMAT: &str = "%Y-%m-%d";

static CONTACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{10,15}$").expect("contact regex"));

pub fn is_valid_contact(contact: &str) -> bool {
    CONTACT_RE.is_match(contact)
}

pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// Quantities and prices must be real numbers above zero.
pub fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn ensure_positive(quantity: f64, price: f64) -> Result<(), MarketError> {
    if is_positive(quantity) && is_positive(price) {
        Ok(())
    } else {
        Err(MarketError::invalid_input(
            "Quantity and price must be positive numbers",
        ))
    }
}

pub fn ensure_within_stock(quantity: f64, available: f64) -> Result<(), MarketError> {
    if quantity > available {
        return Err(MarketError::invalid_input(format!(
            "Quantity cannot exceed available {} kg",
            amount::quantity(available)
        )));
    }
    Ok(())
}

pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, MarketError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| {
        MarketError::invalid_input(format!("{field} must be a date like 2024-06-30"))
    })
}

/// Registration fields after trimming, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub name: String,
    pub contact: String,
    pub location: String,
    pub username: String,
    pub password: String,
}

pub fn validate_registration(input: &Registration) -> Result<ValidRegistration, MarketError> {
    let fields = ValidRegistration {
        name: input.name.trim().to_string(),
        contact: input.contact.trim().to_string(),
        location: input.location.trim().to_string(),
        username: input.username.trim().to_string(),
        password: input.password.clone(),
    };

    let missing: Vec<&'static str> = [
        ("name", fields.name.is_empty()),
        ("contact", fields.contact.is_empty()),
        ("location", fields.location.is_empty()),
        ("username", fields.username.is_empty()),
        ("password", fields.password.is_empty()),
    ]
    .into_iter()
    .filter_map(|(field, empty)| empty.then_some(field))
    .collect();
    if !missing.is_empty() {
        return Err(MarketError::MissingFields(missing));
    }

    if !is_valid_contact(&fields.contact) {
        return Err(MarketError::InvalidContact);
    }
    if !is_valid_password(&fields.password) {
        return Err(MarketError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(fields)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidProduct {
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub harvest_date: NaiveDate,
}

pub fn validate_product(input: &ProductInput) -> Result<ValidProduct, MarketError> {
    let name = input.name.trim();
    if name.is_empty() || input.harvest_date.trim().is_empty() {
        return Err(MarketError::invalid_input("All fields are required"));
    }
    let crop: Crop = name.parse().map_err(|_| {
        MarketError::invalid_input(format!(
            "Product must be one of {}",
            Crop::NAMES.join(", ")
        ))
    })?;
    ensure_positive(input.quantity, input.price)?;
    let harvest_date = parse_date("Harvest date", &input.harvest_date)?;

    Ok(ValidProduct {
        name: crop.name().to_string(),
        quantity: input.quantity,
        price: input.price,
        harvest_date,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidTerms {
    pub quantity: f64,
    pub price: f64,
    pub delivery_date: NaiveDate,
    pub payment_terms: PaymentTerms,
}

/// Checks a proposal's numbers and terms against the stock on offer.
pub fn validate_contract_terms(
    quantity: f64,
    price: f64,
    delivery_date: &str,
    payment_terms: Option<PaymentTerms>,
    available: f64,
) -> Result<ValidTerms, MarketError> {
    ensure_positive(quantity, price)?;
    let Some(payment_terms) = payment_terms.filter(|_| !delivery_date.trim().is_empty()) else {
        return Err(MarketError::invalid_input("All fields are required"));
    };
    ensure_within_stock(quantity, available)?;
    let delivery_date = parse_date("Delivery date", delivery_date)?;

    Ok(ValidTerms {
        quantity,
        price,
        delivery_date,
        payment_terms,
    })
}

#[cfg(test)]
#[path = "tests/validation_tests.rs"]
mod tests;
