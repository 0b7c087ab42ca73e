use std::io::{self, Write};

use chrono::{DateTime, Local, Utc};
use marketplace::Notice;
use shared::{
    amount::{money, quantity},
    domain::UserRole,
    error::Severity,
    records::{Contract, CounterpartyListing, Product, UserProfile},
};

use crate::dispatch::Output;

pub struct Renderer {
    pub currency: String,
    pub unit: String,
    pub json: bool,
}

impl Renderer {
    pub fn write_all(&self, out: &mut impl Write, outputs: &[Output]) -> io::Result<()> {
        for output in outputs {
            if self.json {
                serde_json::to_writer(&mut *out, output)?;
                writeln!(out)?;
            } else {
                self.write_text(out, output)?;
            }
        }
        Ok(())
    }

    pub fn write_notice(&self, out: &mut impl Write, notice: &Notice) -> io::Result<()> {
        if self.json {
            serde_json::to_writer(&mut *out, notice)?;
            return writeln!(out);
        }
        writeln!(out, "[{}] {}", severity_label(notice.severity), notice.message)
    }

    fn write_text(&self, out: &mut impl Write, output: &Output) -> io::Result<()> {
        match output {
            Output::Notice(notice) => self.write_notice(out, notice),
            Output::Profile(profile) => self.write_profile(out, profile),
            Output::Products(products) => {
                if products.is_empty() {
                    return writeln!(out, "No products added yet");
                }
                for product in products {
                    writeln!(out, "  #{} {}", product.product_id, self.product_line(product))?;
                }
                Ok(())
            }
            Output::Directory { viewer, listings } => {
                for listing in listings {
                    self.write_listing(out, *viewer, listing)?;
                }
                Ok(())
            }
            Output::Interests(interests) => {
                if interests.is_empty() {
                    return writeln!(out, "No interests recorded");
                }
                for interest in interests {
                    writeln!(out, "  - {interest}")?;
                }
                Ok(())
            }
            Output::Contracts { viewer, contracts } => self.write_contracts(out, *viewer, contracts),
            Output::ContractDetails(contract) => self.write_details(out, contract),
        }
    }

    fn product_line(&self, product: &Product) -> String {
        format!(
            "{} - {} {unit} - {cur}{}/{unit} (harvested {})",
            product.name,
            quantity(product.quantity),
            money(product.price),
            product.harvest_date,
            unit = self.unit,
            cur = self.currency,
        )
    }

    fn write_profile(&self, out: &mut impl Write, profile: &UserProfile) -> io::Result<()> {
        writeln!(out, "{} ({}, @{})", profile.name, profile.role, profile.username)?;
        writeln!(
            out,
            "  Contact: {} | Location: {}",
            profile.contact, profile.location
        )?;
        writeln!(out, "  Registered: {}", profile.registration_date)
    }

    fn write_listing(
        &self,
        out: &mut impl Write,
        viewer: UserRole,
        listing: &CounterpartyListing,
    ) -> io::Result<()> {
        let profile = &listing.profile;
        writeln!(out, "{} (@{})", profile.name, profile.username)?;
        writeln!(
            out,
            "  Contact: {} | Location: {}",
            profile.contact, profile.location
        )?;
        if listing.products.is_empty() {
            let empty = match viewer {
                UserRole::Farmer => "No products available to offer",
                UserRole::Buyer => "No products available",
            };
            return writeln!(out, "  {empty}");
        }
        writeln!(out, "  Available Products:")?;
        for product in &listing.products {
            writeln!(out, "    #{} {}", product.product_id, self.product_line(product))?;
        }
        Ok(())
    }

    fn write_contracts(
        &self,
        out: &mut impl Write,
        viewer: UserRole,
        contracts: &[Contract],
    ) -> io::Result<()> {
        writeln!(
            out,
            "{:>4}  {:<14} {:>10} {:>10} {:>12}  {:<10} {:<14} {}",
            "ID", "Product", "Quantity", "Price", "Total", "Status", "Counterparty", "Delivery"
        )?;
        for contract in contracts {
            writeln!(
                out,
                "{:>4}  {:<14} {:>10} {:>10} {:>12}  {:<10} {:<14} {}",
                contract.contract_id.0,
                contract.product,
                format!("{} {}", quantity(contract.quantity), self.unit),
                format!("{}{}", self.currency, money(contract.price)),
                format!("{}{}", self.currency, money(contract.total_value)),
                contract.status.as_str(),
                contract.counterparty_for(viewer),
                contract.delivery_date,
            )?;
        }
        Ok(())
    }

    fn write_details(&self, out: &mut impl Write, contract: &Contract) -> io::Result<()> {
        let cur = &self.currency;
        let unit = &self.unit;
        writeln!(out, "Contract #{}", contract.contract_id)?;
        let rows = [
            ("Product:", contract.product.clone()),
            ("Quantity:", format!("{} {unit}", quantity(contract.quantity))),
            ("Price:", format!("{cur}{}/{unit}", money(contract.price))),
            ("Total Value:", format!("{cur}{}", money(contract.total_value))),
            ("Farmer:", contract.farmer.clone()),
            ("Buyer:", contract.buyer.clone()),
            ("Delivery Date:", contract.delivery_date.to_string()),
            ("Payment Terms:", contract.payment_terms.label().to_string()),
            ("Advance Due:", format!("{cur}{}", money(contract.advance_due()))),
            ("Status:", contract.status.to_string()),
            ("Created At:", local_timestamp(contract.created_at)),
            ("Last Updated:", local_timestamp(contract.updated_at)),
        ];
        for (label, value) in rows {
            writeln!(out, "  {label:<15}{value}")?;
        }
        Ok(())
    }
}

/// Stored timestamps are UTC; users read them in local time with the offset shown.
fn local_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S %:z")
        .to_string()
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "ok",
        Severity::Info => "info",
        Severity::Warning => "warn",
        Severity::Error => "error",
    }
}
