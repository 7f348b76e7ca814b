//! Vitrine - terminal storefront.
//!
//! # Usage
//!
//! ```bash
//! # Browse active products
//! vitrine products --page 1 --page-size 20
//!
//! # Manage the cart (persisted under VITRINE_DATA_DIR)
//! vitrine cart add 42 --quantity 2
//! vitrine cart update 42 5
//! vitrine cart show
//!
//! # Check out with instant transfer
//! vitrine checkout --postal-code 01310-100 --number 1000 --lookup \
//!     --shipping 0 --payment instant_transfer
//! ```
//!
//! # Architecture
//!
//! - `vitrine-storefront` library for cart, checkout and backend access
//! - This binary is the presentation layer: it subscribes to cart
//!   notifications and prints them
//! - Sentry + `tracing` for diagnostics

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitrine_storefront::config::StorefrontConfig;
use vitrine_storefront::error::AppError;
use vitrine_storefront::state::AppState;

mod commands;

use commands::{CartAction, CheckoutArgs};

#[derive(Parser)]
#[command(name = "vitrine")]
#[command(author, version, about = "Vitrine terminal storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List active products
    Products {
        /// Page number (1-indexed)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Products per page
        #[arg(long, default_value_t = 20)]
        page_size: u32,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the current cart
    Checkout(Box<CheckoutArgs>),
    /// Show the last order placed from this machine
    LastOrder,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            commands::fail(&AppError::from(e).user_message());
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vitrine_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match AppState::new(config) {
        Ok(state) => run(&state, cli.command).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            commands::fail(&e.report());
            ExitCode::FAILURE
        }
    }
}

async fn run(state: &AppState, command: Commands) -> Result<(), AppError> {
    tracing::debug!(
        api = %state.config().api.base_url,
        data_dir = %state.config().data_dir.display(),
        "Storefront state ready"
    );
    match command {
        Commands::Products { page, page_size } => {
            commands::products::list(state, page, page_size).await
        }
        Commands::Cart { action } => commands::cart::run(state, action).await,
        Commands::Checkout(args) => commands::checkout::run(state, *args).await,
        Commands::LastOrder => {
            commands::checkout::last_order(state);
            Ok(())
        }
    }
}
