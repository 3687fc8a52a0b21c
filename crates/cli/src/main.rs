//! Pizzeria CLI - drive the client data layer against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Print the menu (no sign-in needed)
//! pz-cli menu
//!
//! # Show the signed-in user's profile and addresses
//! PIZZERIA_PASSWORD=secret pz-cli --email ivan@mail.ru whoami
//!
//! # List orders
//! pz-cli --email ivan@mail.ru --password secret orders
//!
//! # Manage the address book
//! pz-cli --email ivan@mail.ru address add "Ленина 1"
//! pz-cli --email ivan@mail.ru address edit 12 "Ленина 2"
//! pz-cli --email ivan@mail.ru address main 12
//! pz-cli --email ivan@mail.ru address delete 12
//! ```
//!
//! # Environment Variables
//!
//! See [`pizzeria_storefront::config`] for the backend settings.
//! `PIZZERIA_PASSWORD` may stand in for `--password`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pizzeria_storefront::ClientConfig;

mod commands;

use commands::{CliError, Credentials};

#[derive(Parser)]
#[command(name = "pz-cli")]
#[command(author, version, about = "Pizzeria client CLI")]
struct Cli {
    /// Account email
    #[arg(short, long, global = true)]
    email: Option<String>,

    /// Account password
    #[arg(short, long, global = true, env = "PIZZERIA_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the menu
    Menu,
    /// Show the signed-in user
    Whoami,
    /// List the signed-in user's orders
    Orders,
    /// Manage the address book
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
}

#[derive(Subcommand)]
enum AddressAction {
    /// Add an address and make it the main one
    Add {
        /// Address text
        place: String,
    },
    /// Change an address's text
    Edit {
        /// Address id
        id: i64,
        /// New address text
        place: String,
    },
    /// Delete an address
    Delete {
        /// Address id
        id: i64,
    },
    /// Make an address the main one
    Main {
        /// Address id
        id: i64,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = ClientConfig::from_env();

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pizzeria_storefront=info,pizzeria_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        e.report();
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CliError> {
    let credentials = Credentials {
        email: cli.email,
        password: cli.password.map(SecretString::from),
    };

    match cli.command {
        Commands::Menu => commands::menu::print(config).await,
        Commands::Whoami => commands::account::whoami(config, &credentials).await,
        Commands::Orders => commands::account::orders(config, &credentials).await,
        Commands::Address { action } => match action {
            AddressAction::Add { place } => {
                commands::address::add(config, &credentials, &place).await
            }
            AddressAction::Edit { id, place } => {
                commands::address::edit(config, &credentials, id, &place).await
            }
            AddressAction::Delete { id } => {
                commands::address::delete(config, &credentials, id).await
            }
            AddressAction::Main { id } => {
                commands::address::set_main(config, &credentials, id).await
            }
        },
    }
}
