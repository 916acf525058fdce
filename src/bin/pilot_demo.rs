//! qipilot demo
//!
//! Boots a seeded pilot service, registers a pilot, runs its simulation and
//! prints the resulting registry as JSON.

use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qipilot::{NewPilot, PilotResult, PilotService, PilotType, ServiceConfig, SimulationConfig};

/// Demo configuration
#[derive(Default)]
struct Config {
    service: ServiceConfig,
}

fn print_help() {
    println!("pilot-demo - qipilot simulation demo");
    println!();
    println!("USAGE:");
    println!("    pilot-demo [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --delay-ms <MS>    Simulation processing delay [default: 1500]");
    println!("    --no-seed          Start with an empty registry");
    println!("    -h, --help         Print help information");
}

fn parse_args() -> Result<Option<Config>, String> {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--delay-ms" => {
                let raw = args
                    .get(i + 1)
                    .ok_or_else(|| "--delay-ms requires a value".to_string())?;
                let ms: u64 = raw
                    .parse()
                    .map_err(|_| format!("invalid delay: {raw}"))?;
                config.service.simulation = SimulationConfig::with_delay_ms(ms);
                i += 2;
            }
            "--no-seed" => {
                config.service.seed_demo_data = false;
                i += 1;
            }
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(Some(config))
}

async fn run(config: Config) -> PilotResult<()> {
    let service = PilotService::new(config.service)?;

    let changes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&changes);
    let subscription = service.subscribe(move || {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    let pilot = service.create_pilot(
        NewPilot::builder()
            .name("Neo-Tokyo Transit Grid")
            .org_name("Neo-Tokyo Metro Authority")
            .pilot_type(PilotType::City)
            .region("Kanto")
            .primary_objective("Reduce commuter burnout across the night network")
            .majority_logic_desc("Route changes follow the majority of daytime riders.")
            .qi_logic_desc("Route changes start from night-shift workers with no alternative.")
            .build()?,
    )?;
    info!(pilot_id = %pilot.id, status = %pilot.status, "pilot registered");

    let result = service.run_simulation(pilot.id).await?;
    info!(
        majority_burnout = result.scenario_a.burnout_index,
        qi_burnout = result.scenario_b.burnout_index,
        "simulation finished"
    );

    let advice = service.request_advice(pilot.id, None, None)?;
    info!(status = %advice.status, "council advice received");

    subscription.unsubscribe();
    info!(changes = changes.load(Ordering::Relaxed), "store changes observed");

    let pilots = service.list_pilots()?;
    let json = serde_json::to_string_pretty(&pilots)
        .map_err(|e| qipilot::PilotError::internal(format!("failed to render pilots: {e}")))?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("qipilot=debug,info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match parse_args() {
        Ok(Some(config)) => config,
        Ok(None) => return ExitCode::SUCCESS,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Demo failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
