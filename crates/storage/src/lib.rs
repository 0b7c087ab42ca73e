use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{ContractId, ContractStatus, PaymentTerms, ProductId, UserId, UserRole},
    records::{Contract, Product, UserProfile},
};

pub const IN_MEMORY_URL: &str = "sqlite::memory:";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub role: UserRole,
    pub name: String,
    pub contact: String,
    pub location: String,
    pub username: String,
    pub password_hash: String,
    pub registration_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub profile: UserProfile,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub farmer_id: UserId,
    pub name: String,
    pub quantity: f64,
    pub price: f64,
    pub harvest_date: NaiveDate,
    pub added_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewContract {
    pub farmer: String,
    pub buyer: String,
    pub product: String,
    pub quantity: f64,
    pub price: f64,
    pub delivery_date: NaiveDate,
    pub payment_terms: PaymentTerms,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        // One long-lived connection: an in-memory database vanishes with its
        // last connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open database '{database_url}'"))?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to apply marketplace schema")?;
        Ok(Self { pool })
    }

    pub async fn in_memory() -> Result<Self> {
        Self::new(IN_MEMORY_URL).await
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<UserId> {
        let rec = sqlx::query(
            "INSERT INTO users (role, name, contact, location, username, password_hash, registration_date)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(user.role.as_str())
        .bind(&user.name)
        .bind(&user.contact)
        .bind(&user.location)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.registration_date)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to insert user '{}'", user.username))?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    /// Case-insensitive check across both roles.
    pub async fn username_taken(&self, username: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? COLLATE NOCASE")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Exact-match lookup within one role, as used by login.
    pub async fn find_user_by_username(
        &self,
        username: &str,
        role: UserRole,
    ) -> Result<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT id, role, name, contact, location, username, password_hash, registration_date
             FROM users
             WHERE username = ? COLLATE BINARY AND role = ?",
        )
        .bind(username)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(stored_user_from_row).transpose()
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT id, role, name, contact, location, username, password_hash, registration_date
             FROM users WHERE id = ?",
        )
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .as_ref()
            .map(stored_user_from_row)
            .transpose()?
            .map(|user| user.profile))
    }

    /// Users of one role in registration order.
    pub async fn list_users_by_role(&self, role: UserRole) -> Result<Vec<UserProfile>> {
        let rows = sqlx::query(
            "SELECT id, role, name, contact, location, username, password_hash, registration_date
             FROM users WHERE role = ? ORDER BY id",
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| stored_user_from_row(row).map(|user| user.profile))
            .collect()
    }

    pub async fn insert_product(&self, product: &NewProduct) -> Result<ProductId> {
        let rec = sqlx::query(
            "INSERT INTO products (farmer_id, name, quantity, price, harvest_date, added_date)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(product.farmer_id.0)
        .bind(&product.name)
        .bind(product.quantity)
        .bind(product.price)
        .bind(product.harvest_date)
        .bind(product.added_date)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert product")?;
        Ok(ProductId(rec.get::<i64, _>(0)))
    }

    /// Removes a product only if `farmer_id` owns it. Returns whether a row went away.
    pub async fn delete_product(&self, farmer_id: UserId, product_id: ProductId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = ? AND farmer_id = ?")
            .bind(product_id.0)
            .bind(farmer_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            "SELECT id, farmer_id, name, quantity, price, harvest_date, added_date
             FROM products WHERE id = ?",
        )
        .bind(product_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(product_from_row).transpose()
    }

    pub async fn list_products_for_farmer(&self, farmer_id: UserId) -> Result<Vec<Product>> {
        let rows = sqlx::query(
            "SELECT id, farmer_id, name, quantity, price, harvest_date, added_date
             FROM products WHERE farmer_id = ? ORDER BY id",
        )
        .bind(farmer_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(product_from_row).collect()
    }

    pub async fn insert_interest(&self, buyer_id: UserId, interest: &str) -> Result<()> {
        sqlx::query("INSERT INTO buyer_interests (buyer_id, interest) VALUES (?, ?)")
            .bind(buyer_id.0)
            .bind(interest)
            .execute(&self.pool)
            .await
            .context("failed to insert buyer interest")?;
        Ok(())
    }

    pub async fn list_interests_for_buyer(&self, buyer_id: UserId) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT interest FROM buyer_interests WHERE buyer_id = ? ORDER BY id")
            .bind(buyer_id.0)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>(0)).collect())
    }

    /// Stores a new contract in `Pending` with both timestamps set to `created_at`.
    pub async fn insert_contract(&self, contract: &NewContract) -> Result<ContractId> {
        let rec = sqlx::query(
            "INSERT INTO contracts
                (farmer, buyer, product, quantity, price, total_value, delivery_date,
                 payment_terms, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&contract.farmer)
        .bind(&contract.buyer)
        .bind(&contract.product)
        .bind(contract.quantity)
        .bind(contract.price)
        .bind(contract.quantity * contract.price)
        .bind(contract.delivery_date)
        .bind(contract.payment_terms.slug())
        .bind(status_to_db(ContractStatus::Pending))
        .bind(contract.created_at)
        .bind(contract.created_at)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert contract")?;
        Ok(ContractId(rec.get::<i64, _>(0)))
    }

    pub async fn get_contract(&self, contract_id: ContractId) -> Result<Option<Contract>> {
        let row = sqlx::query(&format!("{CONTRACT_COLUMNS} WHERE id = ?"))
            .bind(contract_id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(contract_from_row).transpose()
    }

    pub async fn list_contracts_for_farmer(&self, farmer: &str) -> Result<Vec<Contract>> {
        let rows = sqlx::query(&format!("{CONTRACT_COLUMNS} WHERE farmer = ? ORDER BY id"))
            .bind(farmer)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(contract_from_row).collect()
    }

    pub async fn list_contracts_for_buyer(&self, buyer: &str) -> Result<Vec<Contract>> {
        let rows = sqlx::query(&format!("{CONTRACT_COLUMNS} WHERE buyer = ? ORDER BY id"))
            .bind(buyer)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(contract_from_row).collect()
    }

    pub async fn update_contract_status(
        &self,
        contract_id: ContractId,
        status: ContractStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE contracts SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status_to_db(status))
            .bind(updated_at)
            .bind(contract_id.0)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update status of contract {contract_id}"))?;
        Ok(result.rows_affected() > 0)
    }
}

const CONTRACT_COLUMNS: &str = "SELECT id, farmer, buyer, product, quantity, price, total_value, \
     delivery_date, payment_terms, status, created_at, updated_at FROM contracts";

fn status_to_db(status: ContractStatus) -> &'static str {
    match status {
        ContractStatus::Pending => "pending",
        ContractStatus::Accepted => "accepted",
        ContractStatus::Rejected => "rejected",
        ContractStatus::Delivered => "delivered",
        ContractStatus::Paid => "paid",
    }
}

fn stored_user_from_row(row: &SqliteRow) -> Result<StoredUser> {
    let role: String = row.try_get("role")?;
    Ok(StoredUser {
        profile: UserProfile {
            user_id: UserId(row.try_get("id")?),
            role: UserRole::from_str(&role).map_err(|e| anyhow!(e))?,
            name: row.try_get("name")?,
            contact: row.try_get("contact")?,
            location: row.try_get("location")?,
            username: row.try_get("username")?,
            registration_date: row.try_get("registration_date")?,
        },
        password_hash: row.try_get("password_hash")?,
    })
}

fn product_from_row(row: &SqliteRow) -> Result<Product> {
    Ok(Product {
        product_id: ProductId(row.try_get("id")?),
        farmer_id: UserId(row.try_get("farmer_id")?),
        name: row.try_get("name")?,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        harvest_date: row.try_get("harvest_date")?,
        added_date: row.try_get("added_date")?,
    })
}

fn contract_from_row(row: &SqliteRow) -> Result<Contract> {
    let status: String = row.try_get("status")?;
    let payment_terms: String = row.try_get("payment_terms")?;
    Ok(Contract {
        contract_id: ContractId(row.try_get("id")?),
        farmer: row.try_get("farmer")?,
        buyer: row.try_get("buyer")?,
        product: row.try_get("product")?,
        quantity: row.try_get("quantity")?,
        price: row.try_get("price")?,
        total_value: row.try_get("total_value")?,
        delivery_date: row.try_get("delivery_date")?,
        payment_terms: PaymentTerms::from_str(&payment_terms).map_err(|e| anyhow!(e))?,
        status: ContractStatus::from_str(&status).map_err(|e| anyhow!(e))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with(IN_MEMORY_URL) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
