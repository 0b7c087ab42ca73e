use std::{
    fs::File,
    io::{self, BufRead, BufReader, IsTerminal, Write},
    path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use marketplace::{MarketOptions, Marketplace, Notice};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod dispatch;
mod render;

use commands::{parse_line, ParsedLine};
use dispatch::{Dispatcher, Flow};
use render::Renderer;

#[derive(Parser, Debug)]
#[command(version, about = "FarmConnect contract farming marketplace")]
struct Args {
    /// TOML settings file (defaults to ./farmconnect.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read commands from a file instead of stdin.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Print every result as a JSON line.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = config::load_settings(args.config.as_deref())?;
    init_tracing(&settings.log_filter);

    let storage = Storage::new(&settings.database_url).await?;
    info!(database_url = %settings.database_url, "marketplace storage ready");
    let market = Marketplace::new(
        storage,
        MarketOptions {
            enforce_transitions: settings.enforce_transitions,
        },
    );
    let mut dispatcher = Dispatcher::new(market, settings.currency_symbol.clone());
    let renderer = Renderer {
        currency: settings.currency_symbol,
        unit: settings.quantity_unit,
        json: args.json,
    };

    let (input, interactive): (Box<dyn BufRead>, bool) = match &args.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open script '{}'", path.display()))?;
            (Box::new(BufReader::new(file)), false)
        }
        None => (Box::new(io::stdin().lock()), io::stdin().is_terminal()),
    };

    let mut stdout = io::stdout().lock();
    run_shell(input, &mut stdout, &mut dispatcher, &renderer, interactive).await
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run_shell(
    input: impl BufRead,
    out: &mut impl Write,
    dispatcher: &mut Dispatcher,
    renderer: &Renderer,
    interactive: bool,
) -> Result<()> {
    if interactive {
        writeln!(out, "FarmConnect marketplace. Type 'help' for commands.")?;
    }

    let mut lines = input.lines();
    loop {
        if interactive {
            let who = dispatcher
                .market()
                .session()
                .map(|session| session.username.clone())
                .unwrap_or_else(|| "guest".to_string());
            write!(out, "{who}> ")?;
            out.flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read command input")?;

        match parse_line(&line) {
            ParsedLine::Empty => {}
            ParsedLine::Display(text) => write!(out, "{text}")?,
            ParsedLine::Invalid(message) => {
                renderer.write_notice(out, &Notice::error(message.trim_end()))?
            }
            ParsedLine::Command(command) => {
                let (flow, outputs) = dispatcher.dispatch(command).await;
                renderer.write_all(out, &outputs)?;
                if flow == Flow::Quit {
                    break;
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    async fn run_script(script: &str) -> String {
        let market = Marketplace::in_memory().await.expect("market");
        let mut dispatcher = Dispatcher::new(market, "₹");
        let renderer = Renderer {
            currency: "₹".into(),
            unit: "kg".into(),
            json: false,
        };
        let mut out = Vec::new();
        run_shell(
            Cursor::new(script.to_string()),
            &mut out,
            &mut dispatcher,
            &renderer,
            false,
        )
        .await
        .expect("shell");
        String::from_utf8(out).expect("utf8")
    }

    #[tokio::test]
    async fn scripted_session_runs_to_quit() {
        let output = run_script(
            r#"
# a farmer signs up and lists a crop
register --role farmer --name "Ravi Kumar" --contact 9876543210 --location Nashik --username ravi --password farmer123
login ravi farmer123
add-product --name Potatoes --quantity 300 --price 18 --harvest-date 2024-02-01
quit
whoami
"#,
        )
        .await;

        assert!(output.contains("[ok] 👨‍🌾 Registration successful! Please login."));
        assert!(output.contains("[ok] Welcome back, Ravi Kumar!"));
        assert!(output.contains("#1 Potatoes - 300.0 kg - ₹18.00/kg (harvested 2024-02-01)"));
        assert!(!output.contains("Ravi Kumar (Farmer"));
    }

    #[tokio::test]
    async fn bad_lines_do_not_stop_the_shell() {
        let output = run_script("plant seeds\nlogin\nwhoami\n").await;
        let errors = output.lines().filter(|l| l.starts_with("[error]")).count();
        assert!(errors >= 3, "unexpected output: {output}");
        assert!(output.contains("[error] Please enter both username and password"));
        assert!(output.contains("[error] Please login first"));
    }
}
