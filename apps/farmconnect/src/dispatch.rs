//! Runs parsed shell commands against the marketplace and collects what the
//! user should see.

use marketplace::{MarketResult, Marketplace, Notice};
use serde::Serialize;
use shared::{
    domain::{ContractId, ProductId, UserRole},
    records::{
        Contract, ContractProposal, CounterpartyListing, Product, ProductInput, Registration,
        UserProfile,
    },
};

use crate::commands::ShellCommand;

#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Output {
    Notice(Notice),
    Profile(UserProfile),
    Products(Vec<Product>),
    Directory {
        viewer: UserRole,
        listings: Vec<CounterpartyListing>,
    },
    Interests(Vec<String>),
    Contracts {
        viewer: UserRole,
        contracts: Vec<Contract>,
    },
    ContractDetails(Contract),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Dispatcher {
    market: Marketplace,
    currency_symbol: String,
}

impl Dispatcher {
    pub fn new(market: Marketplace, currency_symbol: impl Into<String>) -> Self {
        Self {
            market,
            currency_symbol: currency_symbol.into(),
        }
    }

    pub fn market(&self) -> &Marketplace {
        &self.market
    }

    /// Runs one command. Marketplace failures become error notices; the
    /// shell keeps going either way.
    pub async fn dispatch(&mut self, command: ShellCommand) -> (Flow, Vec<Output>) {
        let name = command_name(&command);
        tracing::debug!(command = name, "dispatching shell command");

        if command == ShellCommand::Quit {
            return (Flow::Quit, Vec::new());
        }

        match self.run(command).await {
            Ok(outputs) => (Flow::Continue, outputs),
            Err(err) => {
                tracing::debug!(command = name, error = %err, "shell command failed");
                (Flow::Continue, vec![Output::Notice(Notice::from(&err))])
            }
        }
    }

    async fn run(&mut self, command: ShellCommand) -> MarketResult<Vec<Output>> {
        let market = &mut self.market;
        let outputs = match command {
            ShellCommand::Register {
                role,
                name,
                contact,
                location,
                username,
                password,
            } => {
                market
                    .register(&Registration {
                        role,
                        name,
                        contact,
                        location,
                        username,
                        password,
                    })
                    .await?;
                vec![Output::Notice(Notice::registered(role))]
            }
            ShellCommand::Login {
                username,
                password,
                role,
            } => {
                let session = market.login(&username, &password, role).await?;
                vec![Output::Notice(Notice::welcome(&session.name))]
            }
            ShellCommand::Logout => match market.logout() {
                Some(session) => vec![Output::Notice(Notice::info(format!(
                    "Goodbye, {}!",
                    session.name
                )))],
                None => vec![Output::Notice(Notice::warning("Not logged in"))],
            },
            ShellCommand::Whoami => vec![Output::Profile(market.profile().await?)],
            ShellCommand::AddProduct {
                name,
                quantity,
                price,
                harvest_date,
            } => {
                market
                    .add_product(&ProductInput {
                        name: name.unwrap_or_default(),
                        quantity,
                        price,
                        harvest_date,
                    })
                    .await?;
                vec![
                    Output::Notice(Notice::product_added()),
                    Output::Products(market.my_products().await?),
                ]
            }
            ShellCommand::RemoveProduct { product_id } => {
                market.remove_product(ProductId(product_id)).await?;
                vec![
                    Output::Notice(Notice::product_removed()),
                    Output::Products(market.my_products().await?),
                ]
            }
            ShellCommand::Products => vec![Output::Products(market.my_products().await?)],
            ShellCommand::FindBuyers => directory(UserRole::Farmer, market.find_buyers().await?),
            ShellCommand::FindFarmers => directory(UserRole::Buyer, market.find_farmers().await?),
            ShellCommand::AddInterest { interest } => {
                market.add_interest(&interest).await?;
                vec![Output::Interests(market.interests().await?)]
            }
            ShellCommand::Interests => vec![Output::Interests(market.interests().await?)],
            ShellCommand::Propose {
                counterparty,
                product,
                quantity,
                price,
                delivery,
                terms,
            } => {
                market
                    .propose_contract(&ContractProposal {
                        counterparty,
                        product_id: ProductId(product),
                        quantity,
                        price,
                        delivery_date: delivery,
                        payment_terms: terms,
                    })
                    .await?;
                let mut outputs = vec![Output::Notice(Notice::proposal_created())];
                outputs.extend(my_contracts(market).await?);
                outputs
            }
            ShellCommand::Contracts => my_contracts(market).await?,
            ShellCommand::Details { contract_id } => vec![Output::ContractDetails(
                market.contract_details(ContractId(contract_id)).await?,
            )],
            ShellCommand::Accept { contract_id } => {
                let contract = market.accept_contract(ContractId(contract_id)).await?;
                status_changed(market, &contract).await?
            }
            ShellCommand::Reject { contract_id } => {
                let contract = market.reject_contract(ContractId(contract_id)).await?;
                status_changed(market, &contract).await?
            }
            ShellCommand::Deliver { contract_id } => {
                let contract = market.mark_delivered(ContractId(contract_id)).await?;
                status_changed(market, &contract).await?
            }
            ShellCommand::Pay { contract_id } => {
                let contract = market.make_payment(ContractId(contract_id)).await?;
                let mut outputs = vec![Output::Notice(Notice::payment_processed(
                    &self.currency_symbol,
                    contract.total_value,
                ))];
                outputs.extend(my_contracts(market).await?);
                outputs
            }
            ShellCommand::Quit => Vec::new(),
        };
        Ok(outputs)
    }
}

fn directory(viewer: UserRole, listings: Vec<CounterpartyListing>) -> Vec<Output> {
    if listings.is_empty() {
        return vec![Output::Notice(Notice::nobody_registered(
            viewer.counterpart(),
        ))];
    }
    vec![Output::Directory { viewer, listings }]
}

async fn my_contracts(market: &Marketplace) -> MarketResult<Vec<Output>> {
    let viewer = market
        .session()
        .map(|session| session.role)
        .unwrap_or(UserRole::Farmer);
    let contracts = market.my_contracts().await?;
    if contracts.is_empty() {
        return Ok(vec![Output::Notice(Notice::info("No contracts found"))]);
    }
    Ok(vec![Output::Contracts { viewer, contracts }])
}

async fn status_changed(market: &Marketplace, contract: &Contract) -> MarketResult<Vec<Output>> {
    let mut outputs = vec![Output::Notice(Notice::status_updated(contract.status))];
    outputs.extend(my_contracts(market).await?);
    Ok(outputs)
}

fn command_name(command: &ShellCommand) -> &'static str {
    match command {
        ShellCommand::Register { .. } => "register",
        ShellCommand::Login { .. } => "login",
        ShellCommand::Logout => "logout",
        ShellCommand::Whoami => "whoami",
        ShellCommand::AddProduct { .. } => "add_product",
        ShellCommand::RemoveProduct { .. } => "remove_product",
        ShellCommand::Products => "products",
        ShellCommand::FindBuyers => "find_buyers",
        ShellCommand::FindFarmers => "find_farmers",
        ShellCommand::AddInterest { .. } => "add_interest",
        ShellCommand::Interests => "interests",
        ShellCommand::Propose { .. } => "propose",
        ShellCommand::Contracts => "contracts",
        ShellCommand::Details { .. } => "details",
        ShellCommand::Accept { .. } => "accept",
        ShellCommand::Reject { .. } => "reject",
        ShellCommand::Deliver { .. } => "deliver",
        ShellCommand::Pay { .. } => "pay",
        ShellCommand::Quit => "quit",
    }
}

#[cfg(test)]
#[path = "tests/dispatch_tests.rs"]
mod tests;
