use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::{
    post_page::METRIC_POST_RENDER_TOTAL,
    sitemap::{METRIC_SITEMAP_URLS, METRIC_SITEMAP_RENDER_TOTAL},
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_POST_RENDER_TOTAL,
            Unit::Count,
            "Post page renders, labelled by outcome (ok, not_found, bad_request, error)."
        );
        describe_counter!(
            METRIC_SITEMAP_RENDER_TOTAL,
            Unit::Count,
            "Sitemap renders, labelled by outcome (ok, error)."
        );
        describe_histogram!(
            METRIC_SITEMAP_URLS,
            Unit::Count,
            "Number of <url> entries emitted per sitemap."
        );
    });
}
