// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Stage telemetry.
//!
//! [`StageTelemetry`] is a [`StageListener`] that turns stage activity into structured
//! `tracing` events and, when the `metrics` feature is enabled, OpenTelemetry counters.

use std::error::Error;
use std::sync::Arc;

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{KeyValue, metrics::Counter};

use crate::listener::{Extras, StageListener};
use crate::ProducerContext;

pub(crate) mod attributes;
mod config;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

pub use config::TelemetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StageActivity {
    Start,
    Success,
    Failure,
    Event,
}

impl StageActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "stage.start",
            Self::Success => "stage.success",
            Self::Failure => "stage.failure",
            Self::Event => "stage.event",
        }
    }
}

/// Records stage activity as logs and metrics.
///
/// Construct it through [`TelemetryConfig`] and install it on each request with
/// [`ProducerContextBuilder::listener`](crate::ProducerContextBuilder::listener).
/// Clones share the same instruments.
#[derive(Clone, Debug)]
pub struct StageTelemetry {
    inner: Arc<StageTelemetryInner>,
}

#[derive(Debug)]
struct StageTelemetryInner {
    logging_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    event_counter: Option<Counter<u64>>,
}

impl StageTelemetry {
    #[inline]
    pub(crate) fn record(
        &self,
        stage: &'static str,
        activity: StageActivity,
        request_id: &str,
        detail: Option<&str>,
        extras: Option<&Extras>,
    ) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(counter) = &self.inner.event_counter {
            counter.add(
                1,
                &[
                    KeyValue::new(attributes::STAGE_NAME, stage),
                    KeyValue::new(attributes::STAGE_ACTIVITY_NAME, activity.as_str()),
                ],
            );
        }

        if self.inner.logging_enabled {
            Self::emit(stage, activity, request_id, detail, extras);
        }
    }

    fn emit(stage: &'static str, activity: StageActivity, request_id: &str, detail: Option<&str>, extras: Option<&Extras>) {
        let activity_name = activity.as_str();

        // Tracing level must be constant. Field names must match attributes.rs.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    stage.name = stage,
                    stage.activity = activity_name,
                    request.id = request_id,
                    stage.detail = detail,
                    stage.extras = ?extras,
                    "stage.event"
                )
            };
        }

        match activity {
            StageActivity::Failure => emit_event!(warn),
            StageActivity::Event => emit_event!(info),
            StageActivity::Start | StageActivity::Success => emit_event!(debug),
        }
    }
}

impl StageListener for StageTelemetry {
    fn on_stage_start(&self, context: &ProducerContext, stage: &'static str) {
        self.record(stage, StageActivity::Start, context.id(), None, None);
    }

    fn on_stage_finish_success(&self, context: &ProducerContext, stage: &'static str, extras: Option<&Extras>) {
        self.record(stage, StageActivity::Success, context.id(), None, extras);
    }

    fn on_stage_finish_failure(
        &self,
        context: &ProducerContext,
        stage: &'static str,
        error: &(dyn Error + 'static),
        extras: Option<&Extras>,
    ) {
        let detail = error.to_string();
        self.record(stage, StageActivity::Failure, context.id(), Some(&detail), extras);
    }

    fn on_stage_event(&self, context: &ProducerContext, stage: &'static str, event: &'static str) {
        self.record(stage, StageActivity::Event, context.id(), Some(event), None);
    }

    fn requires_extras(&self, _context: &ProducerContext) -> bool {
        self.inner.logging_enabled
    }
}
