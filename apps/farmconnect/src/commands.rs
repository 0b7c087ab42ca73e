//! Shell line grammar: quote-aware tokenising plus a clap subcommand parser.

use clap::{builder::PossibleValuesParser, Parser, Subcommand};
use shared::domain::{Crop, PaymentTerms, UserRole};

#[derive(Parser, Debug)]
#[command(
    name = "farmconnect",
    no_binary_name = true,
    disable_version_flag = true,
    about = "Contract farming marketplace commands"
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    /// Register a farmer or buyer account.
    Register {
        #[arg(long)]
        role: UserRole,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        contact: String,
        #[arg(long, default_value = "")]
        location: String,
        #[arg(long, default_value = "")]
        username: String,
        #[arg(long, default_value = "")]
        password: String,
    },
    /// Log in as a farmer (default) or buyer.
    Login {
        #[arg(default_value = "")]
        username: String,
        #[arg(default_value = "")]
        password: String,
        #[arg(long, default_value = "farmer")]
        role: UserRole,
    },
    Logout,
    /// Show the logged-in profile.
    Whoami,
    /// Add a product to your inventory (farmers).
    AddProduct {
        #[arg(long, ignore_case = true, value_parser = PossibleValuesParser::new(Crop::NAMES))]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true)]
        quantity: f64,
        #[arg(long, allow_negative_numbers = true)]
        price: f64,
        #[arg(long, default_value = "")]
        harvest_date: String,
    },
    /// Remove a product from your inventory (farmers).
    RemoveProduct { product_id: i64 },
    /// List your inventory (farmers).
    Products,
    /// List registered buyers with your products on offer (farmers).
    FindBuyers,
    /// List registered farmers and their products (buyers).
    FindFarmers,
    /// Record a product you are interested in (buyers).
    AddInterest { interest: String },
    /// List your recorded interests (buyers).
    Interests,
    /// Propose a contract to a counterparty.
    Propose {
        /// Username of the farmer or buyer on the other side.
        #[arg(long = "with")]
        counterparty: String,
        #[arg(long)]
        product: i64,
        #[arg(long, allow_negative_numbers = true)]
        quantity: f64,
        #[arg(long, allow_negative_numbers = true)]
        price: f64,
        #[arg(long, default_value = "")]
        delivery: String,
        /// 50-50, on-delivery or 30-70.
        #[arg(long)]
        terms: Option<PaymentTerms>,
    },
    /// List contracts you are a party to.
    Contracts,
    /// Show one contract in full.
    Details { contract_id: i64 },
    /// Accept a pending contract (buyers).
    Accept { contract_id: i64 },
    /// Reject a pending contract (buyers).
    Reject { contract_id: i64 },
    /// Mark an accepted contract as delivered (farmers).
    Deliver { contract_id: i64 },
    /// Pay a delivered contract (buyers).
    Pay { contract_id: i64 },
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TokenizeError {
    UnterminatedQuote(char),
    DanglingEscape,
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenizeError::UnterminatedQuote(q) => write!(f, "unterminated {q} quote"),
            TokenizeError::DanglingEscape => f.write_str("line ends with a backslash"),
        }
    }
}

impl std::error::Error for TokenizeError {}

/// Splits on whitespace, keeping single- or double-quoted runs together.
/// Backslash escapes the next character outside single quotes.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('\''), _) => current.push(c),
            (_, '\\') => {
                current.push(chars.next().ok_or(TokenizeError::DanglingEscape)?);
                in_token = true;
            }
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_token = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(TokenizeError::UnterminatedQuote(q));
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}

#[derive(Debug)]
pub enum ParsedLine {
    Empty,
    Command(ShellCommand),
    /// clap wants to print something (help text) rather than run a command.
    Display(String),
    Invalid(String),
}

pub fn parse_line(line: &str) -> ParsedLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return ParsedLine::Empty;
    }

    let tokens = match tokenize(trimmed) {
        Ok(tokens) => tokens,
        Err(err) => return ParsedLine::Invalid(err.to_string()),
    };

    match ShellLine::try_parse_from(tokens) {
        Ok(parsed) => ParsedLine::Command(parsed.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp
            | clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                ParsedLine::Display(err.render().to_string())
            }
            _ => ParsedLine::Invalid(err.render().to_string()),
        },
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
