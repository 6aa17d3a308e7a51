//! Metrics recorder initialization.

use tracing::info;

use crate::Result;

/// Handle to the installed recorder.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl MetricsHandle {
    /// Render the current values in Prometheus text format.
    ///
    /// Empty when metrics are disabled or the `prometheus` feature is off.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle
                .as_ref()
                .map(|h| h.render())
                .unwrap_or_default()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    pub enabled: bool,
    /// Labels attached to every metric (e.g. the bot's account ID).
    pub global_labels: Vec<(String, String)>,
}

/// Install the global recorder. Call once at startup.
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        return Ok(MetricsHandle {
            #[cfg(feature = "prometheus")]
            prometheus_handle: None,
        });
    }

    #[cfg(feature = "prometheus")]
    {
        use {
            crate::Error,
            metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
        };

        let mut builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("_duration_seconds".to_string()),
                crate::buckets::HANDLER_DURATION,
            )
            .map_err(|e| Error::external("invalid histogram buckets", e))?;
        for (key, value) in config.global_labels {
            builder = builder.add_global_label(key, value);
        }
        let handle = builder
            .install_recorder()
            .map_err(|e| Error::external("failed to install prometheus recorder", e))?;
        info!("prometheus metrics recorder installed");
        Ok(MetricsHandle {
            prometheus_handle: Some(handle),
        })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        info!("metrics requested but the prometheus feature is not compiled in");
        Ok(MetricsHandle {})
    }
}
