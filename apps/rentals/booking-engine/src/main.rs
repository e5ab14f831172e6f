//! Booking Engine
//!
//! Serves the booking lifecycle over HTTP and runs the scheduled status
//! sweep. State is held in memory for the life of the process.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_bookings::{
    BookingLifecycleService, BroadcastEventPublisher, InMemoryAvailabilityIndex,
    InMemoryBookingRepository, InMemoryListingCatalog,
};
use eyre::Result;
use std::sync::Arc;
use tracing::{info, warn};

mod config;
mod notifications;
mod openapi;
mod scheduler;
mod server;

use config::Config;

pub(crate) type EngineService = BookingLifecycleService<
    InMemoryBookingRepository,
    InMemoryAvailabilityIndex,
    BroadcastEventPublisher,
>;

#[derive(Parser)]
#[command(name = "booking-engine")]
#[command(about = "Rental booking lifecycle and availability engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API with the scheduled sweep
    Serve {
        /// Port to listen on; overrides PORT
        #[arg(short, long)]
        port: Option<u16>,

        /// Cron expression for the sweep; overrides BOOKING_SWEEP_CRON
        #[arg(long)]
        sweep_cron: Option<String>,

        /// Do not schedule the sweep
        #[arg(long)]
        no_sweep: bool,
    },

    /// Print the effective configuration
    Config,
}

struct Engine {
    service: EngineService,
    catalog: Arc<InMemoryListingCatalog>,
    events: BroadcastEventPublisher,
}

fn build_engine(config: &Config) -> Engine {
    let events = BroadcastEventPublisher::new(config.bookings.event_channel_capacity);
    let catalog = Arc::new(InMemoryListingCatalog::new());

    let service = BookingLifecycleService::new(
        InMemoryBookingRepository::new(),
        InMemoryAvailabilityIndex::from_config(&config.bookings),
        events.clone(),
    )
    .with_retry_policy(config.bookings.retry_policy())
    .with_catalog(catalog.clone());

    Engine {
        service,
        catalog,
        events,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let mut config = Config::from_env()?;
    init_tracing(&config.environment);

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            sweep_cron,
            no_sweep,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(cron) = sweep_cron {
                config.sweep_cron = cron;
            }
            if no_sweep {
                config.sweep_enabled = false;
            }

            let engine = build_engine(&config);
            let relay = notifications::spawn_relay(engine.events.subscribe());

            let _scheduler = if config.sweep_enabled {
                Some(scheduler::start_sweep(
                    engine.service.clone(),
                    &config.sweep_cron,
                    config.sweep_timezone,
                )
                .await?)
            } else {
                warn!("Status sweep disabled; bookings only move on explicit transitions");
                None
            };

            let router = server::build_router(engine.service, engine.catalog);
            server::serve(router, &config.server).await?;

            relay.abort();
            info!("Booking engine stopped");
        }

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.summary())?);
        }
    }

    Ok(())
}
