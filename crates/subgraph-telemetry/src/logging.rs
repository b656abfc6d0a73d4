//! Subscriber construction.
//!
//! JSON records carry `timestamp`, `level`, `target`, the event fields and
//! the current span list, which is enough for a log shipper to correlate a
//! subscription's events with the request that opened it.

use crate::{TelemetryConfig, TelemetryError};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

/// Boxed subscriber ready to be installed
pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync + 'static>;

/// Build the subscriber described by `config`, writing to `writer`.
pub fn build_subscriber<W>(config: &TelemetryConfig, writer: W) -> Result<BoxedSubscriber, TelemetryError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Config(format!("invalid log filter {:?}: {}", config.log_level, e)))?;

    let output = if !config.console_output {
        None
    } else if config.json_logs {
        // JSON output for containers/production
        Some(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(writer)
                .boxed(),
        )
    } else {
        // Pretty output for development
        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(true)
                .with_writer(writer)
                .boxed(),
        )
    };

    Ok(Box::new(
        tracing_subscriber::registry().with(env_filter).with(output),
    ))
}
