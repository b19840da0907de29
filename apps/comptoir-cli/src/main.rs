//! # Comptoir CLI
//!
//! Drives the client layer from a terminal.
//!
//! ## Usage
//! ```bash
//! comptoir status
//! comptoir login --email caisse@boutique.mg --password secret1
//! comptoir profile
//! comptoir products --query riz --page 2
//! comptoir sell --item RIZ-1KG=2 --item SAVON=1 --paid 20000
//! comptoir logout
//! ```
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  init_tracing ─► ClientConfig::load ─► AppContext::init (restore)      │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                                     command ─► stdout                   │
//! │                                              │                          │
//! │                                   error? ─► stderr, exit code 1         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use comptoir_client::{submit_sale, AppContext, ClientConfig, ClientError, Route};
use comptoir_core::{Cart, Money, PaymentMethod};

#[derive(Parser)]
#[command(name = "comptoir")]
#[command(author, version, about = "Comptoir point-of-sale client")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "COMPTOIR_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which screen the current session leads to
    Status,
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "COMPTOIR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and forget the stored session
    Logout,
    /// Show the logged-in user's profile
    Profile,
    /// List products
    Products {
        /// Filter on reference, designation or category
        #[arg(short, long, default_value = "")]
        query: String,

        /// 1-based page number
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Re-check stock and record a sale
    Sell {
        /// Sale line as REFERENCE=QUANTITY (repeatable)
        #[arg(short, long = "item", value_parser = parse_line, required = true)]
        items: Vec<(String, i64)>,

        /// Amount handed over, in minor units (defaults to the amount due)
        #[arg(long)]
        paid: Option<i64>,

        /// Payment method, overriding the configured default
        #[arg(short, long)]
        method: Option<PaymentMethod>,
    },
}

/// Parses `REFERENCE=QUANTITY`.
fn parse_line(raw: &str) -> Result<(String, i64), String> {
    let (reference, quantity) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected REFERENCE=QUANTITY, got '{raw}'"))?;
    let quantity = quantity
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("quantity must be a whole number, got '{quantity}'"))?;
    Ok((reference.trim().to_string(), quantity))
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Command failed: {e:#}");
        eprintln!("{e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default `info,comptoir=debug,sqlx=warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,comptoir=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Keeps the message the user should read, drops the wrapping.
fn surface(err: ClientError) -> anyhow::Error {
    anyhow!(err.user_message())
}

async fn run(cli: Cli) -> Result<()> {
    let config = ClientConfig::load(cli.config).context("Failed to load configuration")?;
    debug!(api = %config.api.base_url, "Configuration loaded");

    let ctx = AppContext::init(config).await.map_err(surface)?;

    match cli.command {
        Commands::Status => {
            println!("{}", ctx.route());
            if let Some(user) = ctx.session().current_user() {
                println!("{} <{}>", user.name, user.email);
            }
        }
        Commands::Login { email, password } => {
            let user = ctx.auth().sign_in(&email, &password).await.map_err(surface)?;
            println!("Logged in as {} <{}>", user.name, user.email);
        }
        Commands::Logout => {
            ctx.auth().sign_out().await;
            println!("Logged out");
        }
        Commands::Profile => {
            require_session(&ctx)?;
            let user = ctx.auth().refresh_profile().await.map_err(surface)?;
            println!("#{} {} <{}>", user.id, user.name, user.email);
        }
        Commands::Products { query, page } => {
            require_session(&ctx)?;
            let per_page = ctx.config().sale.products_per_page;
            let result = ctx
                .products()
                .search(&query, page, per_page)
                .await
                .map_err(surface)?;

            let currency = &ctx.config().currency;
            for product in &result.items {
                println!(
                    "{:<12} {:<32} {:>14} {:>6}",
                    product.reference,
                    product.designation,
                    currency.format(product.unit_price),
                    product.stock
                );
            }
            println!(
                "page {}/{} ({} products)",
                result.page,
                result.total_pages.max(1),
                result.total
            );
        }
        Commands::Sell {
            items,
            paid,
            method,
        } => {
            require_session(&ctx)?;

            let mut cart = Cart::new();
            for (reference, quantity) in &items {
                let product = ctx.products().get(reference).await.map_err(surface)?;
                cart.add_to_cart(&product, *quantity)
                    .map_err(|e| surface(e.into()))?;
            }

            let mut draft = ctx.new_sale_draft(cart);
            if let Some(method) = method {
                draft.payment_method = method;
            }
            let net = draft.net_amount();
            draft.amount_paid = paid.map(Money::from_minor).unwrap_or(net);
            let change = draft.change_due();

            let currency = &ctx.config().currency;
            match submit_sale(&mut draft, ctx.products(), ctx.sales()).await {
                Ok(receipt) => {
                    println!("Sale {} recorded", receipt.payload.ref_facture);
                    println!("due {:>14}", currency.format(net));
                    println!("change {:>11}", currency.format(change));
                }
                Err(ClientError::StockAdjusted(adjustment)) => {
                    for line in &adjustment.changes {
                        eprintln!("{}: {} -> {}", line.reference, line.from, line.to);
                    }
                    return Err(anyhow!("Stock changed, nothing was sent"));
                }
                Err(e) => return Err(surface(e)),
            }
        }
    }

    Ok(())
}

fn require_session(ctx: &AppContext) -> Result<()> {
    match ctx.route() {
        Route::Dashboard => Ok(()),
        _ => Err(surface(ClientError::NotAuthenticated)),
    }
}
