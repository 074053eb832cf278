//! Event Grid subscriber module.
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!                 │               SUBSCRIBER MODULE              │
//!  security       │  ┌──────────┐   ┌──────────┐   ┌──────────┐  │
//!  daemon ◀───────┼──│ security │──▶│   net    │──▶│   http   │◀─┼──── event
//!  (workload API) │  │provision │   │   tls    │   │ webhook  │  │     deliveries
//!                 │  └──────────┘   └────┬─────┘   └──────────┘  │
//!                 │                      ▼                        │
//!  Event Grid ◀───┼──────────────── eventgrid ◀── lifecycle       │
//!  edge broker    │            (poll topic, register)  startup    │
//!                 └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use eventgrid_subscriber::config::{load_settings, settings_path, SubscriberConfig};
use eventgrid_subscriber::eventgrid::MutualTlsConnector;
use eventgrid_subscriber::lifecycle::{signals, Bootstrap, BootstrapError, Registration, Shutdown};
use eventgrid_subscriber::net::install_crypto_provider;
use eventgrid_subscriber::observability::{logging, metrics};
use eventgrid_subscriber::security::{CertificateSource, SecurityDaemon, TrustStore, WorkloadSettings};

#[tokio::main]
async fn main() -> ExitCode {
    let path = settings_path();
    let settings = match load_settings(&path) {
        Ok(settings) => settings.configuration,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&settings.observability) {
        eprintln!("{}", e);
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        settings = %path.display(),
        create_subscription = settings.create_event_grid_subscription,
        "eventgrid-subscriber starting"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Metrics disabled");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    install_crypto_provider();

    let shutdown = Arc::new(Shutdown::new());
    let signal_listener = signals::spawn(shutdown.clone());

    let result = run(settings, &shutdown).await;

    shutdown.complete();
    let _ = signal_listener.await;

    match result {
        Ok(registration) => {
            if let Registration::Aborted = registration {
                tracing::info!("Subscription was not created before shutdown");
            }
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Subscriber failed");
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: SubscriberConfig, shutdown: &Shutdown) -> Result<Registration, BootstrapError> {
    let workload = WorkloadSettings::from_env()?;
    let certificates: Arc<dyn CertificateSource> = Arc::new(SecurityDaemon::new(workload));
    let trust_store = Arc::new(TrustStore::new());
    let connector = Arc::new(MutualTlsConnector::new(
        certificates.clone(),
        trust_store.clone(),
        Duration::from_millis(settings.bootstrap.request_timeout_ms),
    ));

    Bootstrap::new(settings, certificates, connector, trust_store, shutdown.token())
        .run()
        .await
}
