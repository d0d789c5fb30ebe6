//! Watch command: stream alerts from the live feed.

use secrecy::SecretString;
use tabled::Tabled;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use p2000_core::{Alert, Client, ServiceType, SessionEvent};

use crate::cli::{GlobalOpts, OutputFormat, ServiceFilter, WatchArgs};
use crate::error::CliError;
use crate::output;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Service")]
    service: String,
    #[tabled(rename = "Place")]
    place: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Units")]
    units: usize,
}

impl AlertRow {
    fn new(alert: &Alert, color: bool) -> Self {
        let message = if alert.is_priority {
            output::alert_text(&alert.message, color)
        } else {
            alert.message.clone()
        };
        Self {
            time: alert.time.format(TIME_FORMAT).to_string(),
            service: alert.service.to_string(),
            place: place(alert).unwrap_or_else(|| output::muted("-", color)),
            message,
            units: alert.capcodes.len(),
        }
    }
}

fn place(alert: &Alert) -> Option<String> {
    match (&alert.street, &alert.city) {
        (Some(street), Some(city)) => Some(format!("{street}, {city}")),
        (None, Some(city)) => Some(city.clone()),
        (Some(street), None) => Some(street.clone()),
        (None, None) => alert.postal_code.clone().or_else(|| {
            alert
                .has_location()
                .then(|| format!("{:.4}, {:.4}", alert.latitude, alert.longitude))
        }),
    }
}

/// Tab-separated line for `--output plain`.
fn line(alert: &Alert) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}",
        alert.time.format(TIME_FORMAT),
        alert.service,
        if alert.is_priority { "P" } else { "-" },
        alert.city.as_deref().unwrap_or("-"),
        alert.message
    )
}

// ── Filtering ───────────────────────────────────────────────────────

struct AlertFilter {
    priority_only: bool,
    services: Vec<ServiceFilter>,
    capcodes: Vec<u32>,
}

impl AlertFilter {
    fn matches(&self, alert: &Alert) -> bool {
        if self.priority_only && !alert.is_priority {
            return false;
        }
        if !self.capcodes.is_empty() && !self.capcodes.iter().any(|c| alert.pages(*c)) {
            return false;
        }
        self.services.is_empty() || self.services.iter().any(|s| service_matches(*s, alert.service))
    }
}

fn service_matches(filter: ServiceFilter, service: ServiceType) -> bool {
    matches!(
        (filter, service),
        (ServiceFilter::Fire, ServiceType::Fire)
            | (ServiceFilter::Ambulance, ServiceType::Ambulance)
            | (ServiceFilter::Police, ServiceType::Police)
            | (ServiceFilter::SeaRescue, ServiceType::SeaRescue)
            | (ServiceFilter::Helicopter, ServiceType::AmbulanceHelicopter)
    )
}

// ── Handler ─────────────────────────────────────────────────────────

enum WatchEnd {
    Interrupted,
    CountReached,
    FeedLost,
}

pub async fn handle(client: &Client, args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let filter = AlertFilter {
        priority_only: args.priority_only,
        services: args.services,
        capcodes: args.capcodes,
    };
    let format = global.output_format();
    let color = output::should_color(&global.color_mode());
    let limit = args.count;

    let mut events = client.subscribe();
    match args.token {
        Some(token) => client.connect_with_token(SecretString::from(token)).await?,
        None => client.connect().await?,
    }
    if !global.quiet && format == OutputFormat::Table {
        eprintln!("Listening for alerts (Ctrl-C to stop)");
    }

    let mut shown: u64 = 0;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let end = loop {
        tokio::select! {
            _ = &mut ctrl_c => break WatchEnd::Interrupted,
            event = events.recv() => match event {
                Ok(SessionEvent::Connected) => info!("connected to feed"),
                Ok(SessionEvent::AlertsReceived(batch)) => {
                    let mut matching: Vec<&Alert> =
                        batch.iter().filter(|a| filter.matches(a)).collect();
                    debug!(received = batch.len(), shown = matching.len(), "alert batch");

                    if let Some(limit) = limit {
                        let remaining = usize::try_from(limit - shown).unwrap_or(usize::MAX);
                        matching.truncate(remaining);
                    }
                    if !matching.is_empty() {
                        let out = output::render_list(
                            &format,
                            &matching,
                            |a| AlertRow::new(a, color),
                            |a| line(a),
                        );
                        output::print_output(&out, global.quiet);
                        shown += u64::try_from(matching.len()).unwrap_or(u64::MAX);
                    }
                    if limit.is_some_and(|limit| shown >= limit) {
                        break WatchEnd::CountReached;
                    }
                }
                Ok(SessionEvent::Disconnected) | Err(RecvError::Closed) => break WatchEnd::FeedLost,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "output fell behind the feed, events dropped");
                }
            },
        }
    };

    client.disconnect().await;
    match end {
        WatchEnd::Interrupted | WatchEnd::CountReached => {
            debug!(shown, "watch finished");
            Ok(())
        }
        WatchEnd::FeedLost => Err(CliError::FeedLost),
    }
}
