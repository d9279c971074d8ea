//! Wiring: configuration and snapshots in, envelope out.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use fieldwatch_alerts::{
    EmailChannel, LogChannel, Notification, NotificationChannel, RecordingChannel,
};
use fieldwatch_core::{
    EventLogStore, MemoryEventLog, MemoryTelemetryStore, SiteClock, SystemClock, TelemetryStore,
    UnavailableStore,
};
use fieldwatch_monitor::{Envelope, Monitor};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::config::Config;
use crate::error::CliError;

/// Result of one invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    /// The response envelope.
    #[serde(flatten)]
    pub envelope: Envelope,
    /// Notifications captured in a dry run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<Notification>>,
}

type Stores = (Arc<dyn TelemetryStore>, Arc<dyn EventLogStore>);

fn open_stores(data_dir: Option<&Path>, clock: &SiteClock) -> Result<Stores, CliError> {
    let Some(dir) = data_dir else {
        warn!("no data directory configured, store queries will fail");
        let down = Arc::new(UnavailableStore::new("no data directory configured"));
        return Ok((down.clone(), down));
    };
    if !dir.is_dir() {
        return Err(CliError::Store(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let telemetry = MemoryTelemetryStore::load_dir(clock.clone(), dir)
        .map_err(|e| CliError::Store(e.to_string()))?;
    let events =
        MemoryEventLog::load_dir(clock.clone(), dir).map_err(|e| CliError::Store(e.to_string()))?;
    Ok((Arc::new(telemetry), Arc::new(events)))
}

fn open_channel(config: &Config) -> Result<Arc<dyn NotificationChannel>, CliError> {
    match &config.email {
        Some(email) => {
            let channel = EmailChannel::from_env(email.clone())
                .map_err(|e| CliError::Channel(e.to_string()))?;
            info!(sender = %channel.sender(), "using email channel");
            Ok(Arc::new(channel))
        }
        None => {
            info!("no email settings, notifications go to the log");
            Ok(Arc::new(LogChannel::default()))
        }
    }
}

/// Reads the request JSON from a file, or from `stdin` when no path is given.
///
/// # Errors
///
/// Returns `CliError::Io` if the input cannot be read, or
/// `CliError::Request` if it is not JSON.
pub fn read_request(path: Option<&str>, stdin: impl Read) -> Result<Value, CliError> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            let mut stdin = stdin;
            stdin.read_to_string(&mut text)?;
            text
        }
    };
    serde_json::from_str(&text).map_err(|e| CliError::Request(e.to_string()))
}

/// Runs one invocation described by the command line.
///
/// Request validation and delivery failures are reported in the envelope;
/// only setup problems are returned as errors.
///
/// # Errors
///
/// Returns a [`CliError`] if configuration, snapshots, the channel or the
/// request input cannot be set up.
pub fn execute(cli: &Cli, stdin: impl Read) -> Result<Execution, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let registry = Arc::new(config.registry()?);
    let site_clock = config.site_clock()?;
    let (telemetry, events) = open_stores(cli.data_dir.as_deref(), &site_clock)?;
    let payload = read_request(cli.request_path(), stdin)?;

    let recorder = cli.dry_run.then(|| Arc::new(RecordingChannel::new()));
    let channel: Arc<dyn NotificationChannel> = match &recorder {
        Some(recorder) => recorder.clone(),
        None => open_channel(&config)?,
    };

    let monitor = Monitor::new(
        registry,
        telemetry,
        events,
        site_clock,
        Arc::new(SystemClock),
        channel,
    );
    let envelope = monitor.dispatch(&payload);

    Ok(Execution {
        envelope,
        notifications: recorder.map(|r| r.take()),
    })
}
