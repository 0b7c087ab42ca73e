pub mod amount;
pub mod domain;
pub mod error;
pub mod records;
pub mod validation;
