use anyhow::Result;
use ble_scan_session::domain::models::{AuthorizationKind, ScanSnapshot};
use ble_scan_session::domain::settings::{Platform, SettingsService};
use ble_scan_session::infrastructure::logging;
use ble_scan_session::{
    PermissionGate, PermissionPolicy, ReplayRadio, ScanError, ScanSessionController,
    StaticAuthorizer,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ble-scan")]
#[command(about = "Run one bounded BLE discovery session", long_about = None)]
#[command(version)]
struct Cli {
    /// Advertisement script (JSON) replayed as the radio
    #[arg(long)]
    script: PathBuf,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Auto-stop delay in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Target platform whose permission table applies (android, ios, desktop)
    #[arg(long)]
    platform: Option<Platform>,

    #[arg(long)]
    platform_version: Option<u32>,

    /// Refuse an authorization kind (repeatable)
    #[arg(long = "deny")]
    deny: Vec<AuthorizationKind>,

    /// Stop explicitly after this many milliseconds
    #[arg(long)]
    stop_after_ms: Option<u64>,

    /// Refresh signal strength on repeat advertisements
    #[arg(long)]
    refresh: bool,

    /// Print the final snapshot as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_service = match &cli.settings {
        Some(path) => SettingsService::open(path.clone()),
        None => SettingsService::new()?,
    };
    let mut settings = settings_service.get().clone();
    if let Some(timeout_ms) = cli.timeout_ms {
        settings.scan.timeout_ms = timeout_ms;
    }
    if cli.refresh {
        settings.scan.refresh_signal_strength = true;
    }
    if let Some(platform) = cli.platform {
        settings.permissions.platform = platform;
    }
    if let Some(version) = cli.platform_version {
        settings.permissions.platform_version = version;
    }
    settings
        .permissions
        .granted
        .retain(|kind| !cli.deny.contains(kind));

    let _logging_guard = logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!("Starting BLE scan session");

    let radio = Arc::new(ReplayRadio::from_file(&cli.script)?);
    let gate = PermissionGate::new(
        PermissionPolicy::for_platform(
            settings.permissions.platform,
            settings.permissions.platform_version,
        ),
        Arc::new(StaticAuthorizer::from_settings(&settings.permissions)),
    );
    let controller = Arc::new(ScanSessionController::new(
        radio,
        gate,
        settings.scan.clone(),
    ));
    let mut updates = controller.subscribe();

    match controller.start_scan().await {
        Ok(outcome) => info!("Scan start: {:?}", outcome),
        Err(ScanError::PermissionDenied(denied)) => {
            println!("Permission Denied: {}", denied.reason);
            return Ok(());
        }
        Err(e) => {
            error!("Scan failed to start: {}", e);
            println!("{}", controller.status_message().unwrap_or_default());
            return Ok(());
        }
    }

    let stopper = cli.stop_after_ms.map(|ms| {
        let controller = controller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            controller.stop_scan();
        })
    });

    let mut rendered = ScanSnapshot::default();
    loop {
        let snapshot = updates.borrow_and_update().clone();
        render_update(&rendered, &snapshot);
        rendered = snapshot;
        if !rendered.status.is_active() {
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    if let Some(stopper) = stopper {
        stopper.abort();
    }

    let final_snapshot = controller.snapshot();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&final_snapshot)?);
    } else {
        for peripheral in &final_snapshot.peripherals {
            println!(
                "{:<24} {:<20} Signal Strength: {}",
                peripheral.display_name(),
                peripheral.id(),
                peripheral
                    .signal_strength
                    .map(|rssi| format!("{} dBm", rssi))
                    .unwrap_or_else(|| "n/a".to_string())
            );
        }
    }

    Ok(())
}

/// Print what changed between two published snapshots.
fn render_update(previous: &ScanSnapshot, current: &ScanSnapshot) {
    if previous.status_message != current.status_message {
        if let Some(message) = &current.status_message {
            println!("[{}]", message);
        }
    }
    for peripheral in current.peripherals.iter().skip(previous.peripherals.len()) {
        println!("  + {} ({})", peripheral.display_name(), peripheral.id());
    }
}
