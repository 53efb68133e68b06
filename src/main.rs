use std::sync::{Arc, Weak};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitalwatch_core::config::core_config_from_env_values;
use vitalwatch_core::monitoring::{cholesterol_average, roster_rows};
use vitalwatch_core::{
    DataObserver, DiscoveryPipeline, HttpFetcher, Observation, Practitioner, RefreshController,
    RefreshState, ResourceId, RosterRefresh,
};

/// Prints the roster table whenever it changes.
///
/// Holds the practitioner weakly; the practitioner's roster owns this observer.
struct TerminalTable {
    practitioner: Weak<Practitioner>,
}

impl TerminalTable {
    fn render(practitioner: &Practitioner) {
        let snapshot = practitioner.roster().snapshot();
        let average = cholesterol_average(snapshot.values());

        println!();
        println!(
            "== {} | {} patients | {}",
            practitioner.full_name(),
            snapshot.len(),
            chrono::Local::now().format("%H:%M:%S")
        );
        println!(
            "{:<32} {:<18} {:<14} {:<14}",
            "Name", "Cholesterol", "Systolic", "Diastolic"
        );
        for row in roster_rows(snapshot.values()) {
            let marker = if row.cholesterol_above(average) { "*" } else { " " };
            println!(
                "{:<32} {:<17}{} {:<14} {:<14}",
                row.name,
                cell(&row.cholesterol),
                marker,
                cell(&row.systolic),
                cell(&row.diastolic)
            );
        }
    }
}

impl DataObserver for TerminalTable {
    fn data_changed(&self) {
        if let Some(practitioner) = self.practitioner.upgrade() {
            Self::render(&practitioner);
        }
    }
}

fn cell(observation: &Observation) -> String {
    if observation.is_empty() {
        "-".into()
    } else {
        format!("{} {}", observation.value, observation.unit)
    }
}

fn describe(state: RefreshState) -> String {
    match state {
        RefreshState::Idle => "refresh off".into(),
        RefreshState::Armed { every_secs } => format!("refreshing every {every_secs}s"),
    }
}

/// Main entry point for the VitalWatch monitor
///
/// Logs in one practitioner, prints their roster, then keeps it fresh on a timer. Each line typed
/// on stdin is a new refresh frequency in seconds (`0` turns refreshing off, `q` quits).
///
/// # Environment Variables
/// - `PRACTITIONER_ID`: practitioner resource id (required)
/// - `VITALWATCH_REFRESH_SECS`: initial refresh frequency (default: off)
/// - `FHIR_BASE_URL`, `FHIR_REQUEST_TIMEOUT_SECS`, `FHIR_MAX_PAGE_HOPS`,
///   `VITALWATCH_OVERLAP_POLICY`: see `vitalwatch_core::config`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vitalwatch_core=info".parse()?)
                .add_directive("vitalwatch_run=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = core_config_from_env_values(
        std::env::var("FHIR_BASE_URL").ok(),
        std::env::var("FHIR_REQUEST_TIMEOUT_SECS").ok(),
        std::env::var("FHIR_MAX_PAGE_HOPS").ok(),
        std::env::var("VITALWATCH_OVERLAP_POLICY").ok(),
    )?;
    let Ok(practitioner_id) = std::env::var("PRACTITIONER_ID") else {
        anyhow::bail!("PRACTITIONER_ID must be set to a practitioner resource id");
    };
    let practitioner_id = ResourceId::new(&practitioner_id)?;

    tracing::info!(
        "++ Starting VitalWatch against {}",
        config.endpoints().base_url()
    );

    let policy = config.overlap_policy();
    let fetcher = HttpFetcher::new(config.request_timeout())?;
    let pipeline = Arc::new(DiscoveryPipeline::new(Arc::new(fetcher), config));

    let practitioner = pipeline.login(&practitioner_id).await?;
    practitioner.subscribe(Arc::new(TerminalTable {
        practitioner: Arc::downgrade(&practitioner),
    }));
    TerminalTable::render(&practitioner);

    let controller = RefreshController::new(
        Handle::current(),
        Arc::new(RosterRefresh::new(pipeline, practitioner.clone())),
        policy,
    );
    if let Ok(initial) = std::env::var("VITALWATCH_REFRESH_SECS") {
        let state = controller.submit_frequency(&initial)?;
        println!("{}", describe(state));
    }

    println!("Enter a refresh frequency in seconds (0 = off, q = quit):");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                match controller.submit_frequency(line) {
                    Ok(state) => println!("{}", describe(state)),
                    Err(e) => eprintln!("{e}"),
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.cancel();
    tracing::info!("-- Stopping VitalWatch");
    Ok(())
}
