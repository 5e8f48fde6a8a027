//! Tracing/logging infrastructure for lectern
//!
//! Provides:
//! - TUI layer that routes log events to the reader's status line
//! - Standard env filter for non-TUI mode

use crate::tui::{LogEvent, LogLevel};
use std::sync::mpsc::Sender;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    Layer,
    filter::EnvFilter,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// A tracing layer that sends formatted events to a channel. The TUI owns
/// the terminal, so nothing may write to stdout while it runs.
pub struct TuiLayer {
    tx: Sender<LogEvent>,
}

impl TuiLayer {
    pub fn new(tx: Sender<LogEvent>) -> Self {
        Self { tx }
    }
}

impl<S> Layer<S> for TuiLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = *metadata.level();

        // Only show ERROR, WARN, and INFO - filter out DEBUG and TRACE
        match level {
            Level::ERROR | Level::WARN | Level::INFO => {}
            Level::DEBUG | Level::TRACE => return,
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let msg = match visitor.message {
            Some(message) => message,
            None => format!("{}: {}", metadata.target(), metadata.name()),
        };

        let log_level = match level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            _ => LogLevel::Info,
        };

        let _ = self.tx.send(LogEvent {
            level: log_level,
            message: msg,
        });
    }
}

/// Visitor to extract the message field from an event
#[derive(Default)]
struct MessageVisitor {
    message: Option<String>,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        }
    }
}

/// Initialize tracing for TUI mode
pub fn init_tui_tracing(event_tx: Sender<LogEvent>) {
    tracing_subscriber::registry()
        .with(TuiLayer::new(event_tx))
        .init();
}

/// Initialize tracing for non-TUI mode (uses RUST_LOG env var)
pub fn init_standard_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(filter),
        )
        .init();
}
