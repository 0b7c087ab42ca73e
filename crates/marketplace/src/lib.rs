//! Marketplace service: registration, sessions, inventories and the contract
//! lifecycle on top of [`storage::Storage`].

use chrono::{Local, Utc};
use shared::{
    domain::{ContractId, ContractStatus, ProductId, UserRole},
    error::MarketError,
    records::{
        Contract, ContractProposal, CounterpartyListing, Product, ProductInput, Registration,
        SessionSummary, UserProfile,
    },
    validation::{validate_contract_terms, validate_product, validate_registration},
};
use storage::{NewContract, NewProduct, NewUser, Storage};
use tracing::{info, warn};

pub mod notice;
pub mod password;

pub use notice::Notice;

pub type MarketResult<T> = Result<T, MarketError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketOptions {
    /// Refuse status changes outside the Pending/Accepted/Delivered/Paid flow.
    pub enforce_transitions: bool,
}

impl Default for MarketOptions {
    fn default() -> Self {
        Self {
            enforce_transitions: true,
        }
    }
}

pub struct Marketplace {
    storage: Storage,
    options: MarketOptions,
    session: Option<SessionSummary>,
}

impl Marketplace {
    pub fn new(storage: Storage, options: MarketOptions) -> Self {
        Self {
            storage,
            options,
            session: None,
        }
    }

    pub async fn in_memory() -> MarketResult<Self> {
        let storage = Storage::in_memory().await?;
        Ok(Self::new(storage, MarketOptions::default()))
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn session(&self) -> Option<&SessionSummary> {
        self.session.as_ref()
    }

    fn require_session(&self) -> MarketResult<&SessionSummary> {
        self.session.as_ref().ok_or(MarketError::NotLoggedIn)
    }

    fn require_role(&self, required: UserRole) -> MarketResult<&SessionSummary> {
        let session = self.require_session()?;
        if session.role != required {
            return Err(MarketError::WrongRole { required });
        }
        Ok(session)
    }

    pub async fn register(&self, input: &Registration) -> MarketResult<UserProfile> {
        let fields = validate_registration(input)?;
        if self.storage.username_taken(&fields.username).await? {
            warn!(username = %fields.username, "registration rejected: username taken");
            return Err(MarketError::UsernameTaken);
        }

        let password_hash = password::hash_password(&fields.password)?;
        let user_id = self
            .storage
            .create_user(&NewUser {
                role: input.role,
                name: fields.name.clone(),
                contact: fields.contact.clone(),
                location: fields.location.clone(),
                username: fields.username.clone(),
                password_hash,
                registration_date: Local::now().date_naive(),
            })
            .await?;
        info!(%user_id, username = %fields.username, role = input.role.as_str(), "user registered");

        self.storage
            .get_user(user_id)
            .await?
            .ok_or_else(|| MarketError::Internal(format!("user {user_id} vanished after insert")))
    }

    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> MarketResult<SessionSummary> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(MarketError::MissingCredentials);
        }

        let Some(user) = self.storage.find_user_by_username(username, role).await? else {
            warn!(%username, role = role.as_str(), "login rejected: unknown user");
            return Err(MarketError::InvalidCredentials);
        };
        if !password::verify_password(password, &user.password_hash) {
            warn!(%username, role = role.as_str(), "login rejected: bad password");
            return Err(MarketError::InvalidCredentials);
        }

        let session = SessionSummary {
            user_id: user.profile.user_id,
            username: user.profile.username,
            name: user.profile.name,
            role,
        };
        info!(user_id = %session.user_id, username = %session.username, "logged in");
        self.session = Some(session.clone());
        Ok(session)
    }

    pub fn logout(&mut self) -> Option<SessionSummary> {
        let ended = self.session.take();
        if let Some(session) = &ended {
            info!(username = %session.username, "logged out");
        }
        ended
    }

    pub async fn profile(&self) -> MarketResult<UserProfile> {
        let session = self.require_session()?;
        self.storage
            .get_user(session.user_id)
            .await?
            .ok_or(MarketError::NotLoggedIn)
    }

    pub async fn add_product(&self, input: &ProductInput) -> MarketResult<Product> {
        let farmer = self.require_role(UserRole::Farmer)?;
        let product = validate_product(input)?;
        let product_id = self
            .storage
            .insert_product(&NewProduct {
                farmer_id: farmer.user_id,
                name: product.name,
                quantity: product.quantity,
                price: product.price,
                harvest_date: product.harvest_date,
                added_date: Local::now().date_naive(),
            })
            .await?;
        info!(%product_id, farmer = %farmer.username, "product added");

        self.storage
            .get_product(product_id)
            .await?
            .ok_or(MarketError::ProductNotFound(product_id))
    }

    pub async fn remove_product(&self, product_id: ProductId) -> MarketResult<()> {
        let farmer = self.require_role(UserRole::Farmer)?;
        if !self
            .storage
            .delete_product(farmer.user_id, product_id)
            .await?
        {
            return Err(MarketError::ProductNotFound(product_id));
        }
        info!(%product_id, farmer = %farmer.username, "product removed");
        Ok(())
    }

    pub async fn my_products(&self) -> MarketResult<Vec<Product>> {
        let farmer = self.require_role(UserRole::Farmer)?;
        Ok(self.storage.list_products_for_farmer(farmer.user_id).await?)
    }

    /// Every buyer, each offered the current farmer's whole inventory.
    pub async fn find_buyers(&self) -> MarketResult<Vec<CounterpartyListing>> {
        let farmer = self.require_role(UserRole::Farmer)?;
        let buyers = self.storage.list_users_by_role(UserRole::Buyer).await?;
        let offer = self.storage.list_products_for_farmer(farmer.user_id).await?;
        Ok(buyers
            .into_iter()
            .map(|profile| CounterpartyListing {
                profile,
                products: offer.clone(),
            })
            .collect())
    }

    /// Every farmer with their own inventory.
    pub async fn find_farmers(&self) -> MarketResult<Vec<CounterpartyListing>> {
        self.require_role(UserRole::Buyer)?;
        let farmers = self.storage.list_users_by_role(UserRole::Farmer).await?;
        let mut listings = Vec::with_capacity(farmers.len());
        for profile in farmers {
            let products = self.storage.list_products_for_farmer(profile.user_id).await?;
            listings.push(CounterpartyListing { profile, products });
        }
        Ok(listings)
    }

    pub async fn find_counterparties(&self) -> MarketResult<Vec<CounterpartyListing>> {
        match self.require_session()?.role {
            UserRole::Farmer => self.find_buyers().await,
            UserRole::Buyer => self.find_farmers().await,
        }
    }

    pub async fn add_interest(&self, interest: &str) -> MarketResult<()> {
        let buyer = self.require_role(UserRole::Buyer)?;
        let interest = interest.trim();
        if interest.is_empty() {
            return Err(MarketError::invalid_input("All fields are required"));
        }
        self.storage.insert_interest(buyer.user_id, interest).await?;
        Ok(())
    }

    pub async fn interests(&self) -> MarketResult<Vec<String>> {
        let buyer = self.require_role(UserRole::Buyer)?;
        Ok(self.storage.list_interests_for_buyer(buyer.user_id).await?)
    }

    /// Creates a Pending contract. The product always comes from the farmer's
    /// side; its stock bounds the quantity but is not reserved.
    pub async fn propose_contract(&self, proposal: &ContractProposal) -> MarketResult<Contract> {
        let me = self.require_session()?;
        let counterpart_role = me.role.counterpart();
        let counterparty_name = proposal.counterparty.trim();
        let counterparty = self
            .storage
            .find_user_by_username(counterparty_name, counterpart_role)
            .await?
            .ok_or_else(|| MarketError::CounterpartyNotFound {
                username: counterparty_name.to_string(),
                role: counterpart_role,
            })?
            .profile;

        let (farmer_id, farmer, buyer) = match me.role {
            UserRole::Farmer => (me.user_id, me.username.clone(), counterparty.username),
            UserRole::Buyer => (
                counterparty.user_id,
                counterparty.username,
                me.username.clone(),
            ),
        };

        let inventory = self.storage.list_products_for_farmer(farmer_id).await?;
        if inventory.is_empty() {
            return Err(MarketError::NoProductsAvailable);
        }
        let product = inventory
            .into_iter()
            .find(|product| product.product_id == proposal.product_id)
            .ok_or(MarketError::ProductNotFound(proposal.product_id))?;

        let terms = validate_contract_terms(
            proposal.quantity,
            proposal.price,
            &proposal.delivery_date,
            proposal.payment_terms,
            product.quantity,
        )?;

        let contract_id = self
            .storage
            .insert_contract(&NewContract {
                farmer,
                buyer,
                product: product.name,
                quantity: terms.quantity,
                price: terms.price,
                delivery_date: terms.delivery_date,
                payment_terms: terms.payment_terms,
                created_at: Utc::now(),
            })
            .await?;
        info!(%contract_id, proposer = %me.username, "contract proposed");

        self.storage
            .get_contract(contract_id)
            .await?
            .ok_or(MarketError::ContractNotFound(contract_id))
    }

    pub async fn my_contracts(&self) -> MarketResult<Vec<Contract>> {
        let me = self.require_session()?;
        let contracts = match me.role {
            UserRole::Farmer => self.storage.list_contracts_for_farmer(&me.username).await?,
            UserRole::Buyer => self.storage.list_contracts_for_buyer(&me.username).await?,
        };
        Ok(contracts)
    }

    /// Contracts the current user is not a party to read as missing.
    pub async fn contract_details(&self, contract_id: ContractId) -> MarketResult<Contract> {
        let me = self.require_session()?;
        self.storage
            .get_contract(contract_id)
            .await?
            .filter(|contract| contract.involves(&me.username, me.role))
            .ok_or(MarketError::ContractNotFound(contract_id))
    }

    pub async fn update_contract_status(
        &self,
        contract_id: ContractId,
        status: ContractStatus,
    ) -> MarketResult<Contract> {
        let contract = self.contract_details(contract_id).await?;
        let role = self.require_session()?.role;

        if status.actor() != Some(role) {
            warn!(%contract_id, %status, role = role.as_str(), "status change not permitted");
            return Err(MarketError::NotPermitted { role, status });
        }
        if self.options.enforce_transitions && !contract.status.can_transition_to(status) {
            warn!(%contract_id, from = %contract.status, to = %status, "illegal status transition");
            return Err(MarketError::IllegalTransition {
                id: contract_id,
                from: contract.status,
                to: status,
            });
        }

        if !self
            .storage
            .update_contract_status(contract_id, status, Utc::now())
            .await?
        {
            return Err(MarketError::ContractNotFound(contract_id));
        }
        info!(%contract_id, from = %contract.status, to = %status, "contract status updated");
        self.contract_details(contract_id).await
    }

    pub async fn accept_contract(&self, contract_id: ContractId) -> MarketResult<Contract> {
        self.update_contract_status(contract_id, ContractStatus::Accepted)
            .await
    }

    pub async fn reject_contract(&self, contract_id: ContractId) -> MarketResult<Contract> {
        self.update_contract_status(contract_id, ContractStatus::Rejected)
            .await
    }

    pub async fn mark_delivered(&self, contract_id: ContractId) -> MarketResult<Contract> {
        self.update_contract_status(contract_id, ContractStatus::Delivered)
            .await
    }

    /// Settles the contract's total. No money moves; the status becomes Paid.
    pub async fn make_payment(&self, contract_id: ContractId) -> MarketResult<Contract> {
        let contract = self
            .update_contract_status(contract_id, ContractStatus::Paid)
            .await?;
        info!(%contract_id, total = contract.total_value, "payment recorded");
        Ok(contract)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
