// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Telemetry configuration for pipeline stages.

use std::sync::Arc;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::{Meter, MeterProvider};

use crate::telemetry::{StageTelemetry, StageTelemetryInner};

/// Configuration for stage telemetry.
///
/// Everything is disabled by default. Enable logs and/or metrics, then build a
/// [`StageTelemetry`] to install as the request listener.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use picflow::{ImageRequest, ProducerContext, TelemetryConfig};
///
/// let telemetry = TelemetryConfig::new().with_logs().build();
///
/// let request = ImageRequest::builder("https://example.com/cat.jpg").build();
/// let context = ProducerContext::builder(request).listener(Arc::new(telemetry)).build();
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<Meter>,
}

impl TelemetryConfig {
    /// Creates a new telemetry configuration with everything disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables structured logging of stage activity through `tracing`.
    #[must_use]
    pub fn with_logs(self) -> Self {
        Self {
            logs_enabled: true,
            ..self
        }
    }

    /// Enables metrics collection using the provided meter provider.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(crate::telemetry::metrics::create_meter(provider));
        self
    }

    /// Builds the telemetry listener from this configuration.
    #[must_use]
    pub fn build(self) -> StageTelemetry {
        StageTelemetry {
            inner: Arc::new(StageTelemetryInner {
                logging_enabled: self.logs_enabled,
                #[cfg(any(feature = "metrics", test))]
                event_counter: self.meter.as_ref().map(crate::telemetry::metrics::create_event_counter),
            }),
        }
    }
}
