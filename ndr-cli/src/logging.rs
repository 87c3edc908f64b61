//! Log setup
//!
//! Everything goes through one `tracing-subscriber` registry: an
//! `EnvFilter`, a formatter writing to stderr (or appending to a file), and
//! a capture layer that remembers recent warnings so they can be shown when
//! a command fails.

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Context as _;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Crates that belong to this project
const PROJECT_CRATES: &[&str] = &["ndr", "ndr_protocol", "ndr_transport", "ndr_driver", "ndr_sim"];

/// How many captured lines are kept
const CAPTURE_LIMIT: usize = 32;

/// Default filter directive for the project crates at `level`
pub fn default_filter(level: &str) -> String {
    PROJECT_CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Recent warning and error lines
#[derive(Debug, Clone, Default)]
pub struct RecentWarnings {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl RecentWarnings {
    fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(|p| p.into_inner());
        if lines.len() == CAPTURE_LIMIT {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Captured lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

/// Layer keeping warnings and errors from the project crates
pub struct CaptureLayer {
    recent: RecentWarnings,
}

impl CaptureLayer {
    pub fn new(recent: RecentWarnings) -> Self {
        Self { recent }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::WARN {
            return;
        }
        let crate_name = meta.target().split("::").next().unwrap_or_default();
        if !PROJECT_CRATES.contains(&crate_name) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.recent.push(format!(
            "{} {}",
            meta.level(),
            visitor.message.unwrap_or_default()
        ));
    }
}

/// Visitor to extract the message from tracing fields
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        }
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides `level` when set.
pub fn init(level: &str, log_file: Option<&Path>) -> anyhow::Result<RecentWarnings> {
    let recent = RecentWarnings::default();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level).into());

    let (stderr_layer, file_layer) = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            (
                None,
                Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file))),
            )
        }
        None => (Some(fmt::layer().with_writer(std::io::stderr)), None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .with(CaptureLayer::new(recent.clone()))
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(recent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(
            default_filter("debug"),
            "ndr=debug,ndr_protocol=debug,ndr_transport=debug,ndr_driver=debug,ndr_sim=debug"
        );
    }

    #[test]
    fn test_capture_keeps_warnings_only() {
        let recent = RecentWarnings::default();
        let subscriber = tracing_subscriber::registry().with(CaptureLayer::new(recent.clone()));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("connected");
            tracing::warn!("FRQ: timeout waiting for reply");
            tracing::error!(target: "other_crate", "ignored");
        });
        assert_eq!(recent.lines(), vec!["WARN FRQ: timeout waiting for reply".to_string()]);
    }

    #[test]
    fn test_capture_is_bounded() {
        let recent = RecentWarnings::default();
        for i in 0..(CAPTURE_LIMIT + 5) {
            recent.push(format!("line {}", i));
        }
        let lines = recent.lines();
        assert_eq!(lines.len(), CAPTURE_LIMIT);
        assert_eq!(lines[0], "line 5");
    }
}
