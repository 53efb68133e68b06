use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vitalwatch_core::{
    config::core_config_from_env_values,
    monitoring::{cholesterol_average, roster_rows, systolic_trend, BloodPressureAlert},
    patient::history,
    CoreConfig, DiscoveryPipeline, HttpFetcher, Identifier, Observation, ObservationKind,
    ResourceId,
};

#[derive(Parser)]
#[command(name = "vitalwatch")]
#[command(about = "VitalWatch clinician monitor CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a practitioner's roster with latest readings
    Roster {
        /// Practitioner resource id
        practitioner_id: String,
    },
    /// Show a patient's most recent readings
    History {
        /// Patient identifier system
        system: String,
        /// Patient identifier value
        value: String,
        /// Observation kind (cholesterol or blood-pressure)
        #[arg(long, default_value = "blood-pressure")]
        kind: String,
        /// Number of readings
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
    /// List a practitioner's patients above blood-pressure thresholds
    HighBp {
        /// Practitioner resource id
        practitioner_id: String,
        /// Systolic threshold (mm[Hg])
        #[arg(long)]
        systolic: f64,
        /// Diastolic threshold (mm[Hg], optional)
        #[arg(long)]
        diastolic: Option<f64>,
        /// Number of recent systolic readings to show per patient
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

fn config_from_env() -> Result<CoreConfig, Box<dyn std::error::Error>> {
    Ok(core_config_from_env_values(
        std::env::var("FHIR_BASE_URL").ok(),
        std::env::var("FHIR_REQUEST_TIMEOUT_SECS").ok(),
        std::env::var("FHIR_MAX_PAGE_HOPS").ok(),
        std::env::var("VITALWATCH_OVERLAP_POLICY").ok(),
    )?)
}

fn pipeline(config: CoreConfig) -> Result<DiscoveryPipeline, Box<dyn std::error::Error>> {
    let fetcher = HttpFetcher::new(config.request_timeout())?;
    Ok(DiscoveryPipeline::new(Arc::new(fetcher), config))
}

fn show(observation: &Observation) -> String {
    if observation.is_empty() {
        "-".into()
    } else {
        format!("{} {}", observation.value, observation.unit)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vitalwatch_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Roster { practitioner_id }) => {
            let pipeline = pipeline(config_from_env()?)?;
            let id = ResourceId::new(&practitioner_id)?;
            match pipeline.login(&id).await {
                Ok(practitioner) => {
                    let snapshot = practitioner.roster().snapshot();
                    let average = cholesterol_average(snapshot.values());
                    println!(
                        "Practitioner: {} ({})",
                        practitioner.full_name(),
                        practitioner.identifier()
                    );
                    if snapshot.is_empty() {
                        println!("No patients found.");
                    }
                    for row in roster_rows(snapshot.values()) {
                        let flag = if row.cholesterol_above(average) { " *" } else { "" };
                        println!(
                            "{:<32} cholesterol: {}{}, BP: {} / {}",
                            row.name,
                            show(&row.cholesterol),
                            flag,
                            show(&row.systolic),
                            show(&row.diastolic)
                        );
                    }
                    if let Some(average) = average {
                        println!("Average cholesterol: {average:.1} (* above average)");
                    }
                }
                Err(e) => eprintln!("Error loading roster: {}", e),
            }
        }
        Some(Commands::History {
            system,
            value,
            kind,
            count,
        }) => {
            let kind: ObservationKind = kind.parse()?;
            let identifier = Identifier::new(system, value)?;
            let pipeline = pipeline(config_from_env()?)?;
            let source = pipeline.observation_source();

            let rows = history(&source, &identifier, kind, count).await;
            for (index, row) in rows.iter().enumerate() {
                let readings: Vec<String> = row
                    .iter()
                    .map(|r| format!("{}: {}", r.label, show(&r.observation)))
                    .collect();
                let when = row
                    .first()
                    .map(|r| r.observation.timestamp.as_str())
                    .filter(|t| !t.is_empty())
                    .unwrap_or("-");
                println!("#{index} [{when}] {}", readings.join(", "));
            }
        }
        Some(Commands::HighBp {
            practitioner_id,
            systolic,
            diastolic,
            count,
        }) => {
            let pipeline = pipeline(config_from_env()?)?;
            let id = ResourceId::new(&practitioner_id)?;
            let alert = BloodPressureAlert::new(systolic, diastolic);
            match pipeline.login(&id).await {
                Ok(practitioner) => {
                    let snapshot = practitioner.roster().snapshot();
                    let source = pipeline.observation_source();
                    let trends = systolic_trend(&source, snapshot.values(), &alert, count).await;
                    if trends.is_empty() {
                        println!("No patients above threshold.");
                    }
                    for trend in trends {
                        println!("{} ({})", trend.name, trend.identifier);
                        for reading in &trend.readings {
                            println!("  {:<28} {}", reading.timestamp, show(reading));
                        }
                    }
                }
                Err(e) => eprintln!("Error loading roster: {}", e),
            }
        }
        None => {
            println!("Use 'vitalwatch --help' for commands");
        }
    }

    Ok(())
}
