// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Listener contract through which stages report what they did.

use std::collections::BTreeMap;
use std::error::Error;

use crate::ProducerContext;

/// Diagnostic key/value pairs attached to a stage finish event.
pub type Extras = BTreeMap<&'static str, String>;

/// Receives stage activity for a request.
///
/// Every call happens on whatever task is delivering results at the time, so
/// implementations must be cheap and must not block. A listener observes the pipeline;
/// nothing it does can change what the consumer receives.
pub trait StageListener: Send + Sync {
    /// A stage started handling a delivery.
    fn on_stage_start(&self, context: &ProducerContext, stage: &'static str);

    /// A stage finished handling a delivery successfully.
    fn on_stage_finish_success(&self, context: &ProducerContext, stage: &'static str, extras: Option<&Extras>);

    /// A stage failed to do its own work. The delivery itself may still go through.
    fn on_stage_finish_failure(
        &self,
        context: &ProducerContext,
        stage: &'static str,
        error: &(dyn Error + 'static),
        extras: Option<&Extras>,
    );

    /// A stage reported an event that is not tied to a delivery, such as the outcome of
    /// a background write.
    fn on_stage_event(&self, context: &ProducerContext, stage: &'static str, event: &'static str) {
        let _ = (context, stage, event);
    }

    /// Returns `true` if this listener wants extras for the given request.
    ///
    /// Stages skip building extras maps when this returns `false`.
    fn requires_extras(&self, context: &ProducerContext) -> bool {
        let _ = context;
        false
    }
}

/// A listener that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl StageListener for NoopListener {
    fn on_stage_start(&self, _context: &ProducerContext, _stage: &'static str) {}

    fn on_stage_finish_success(&self, _context: &ProducerContext, _stage: &'static str, _extras: Option<&Extras>) {}

    fn on_stage_finish_failure(
        &self,
        _context: &ProducerContext,
        _stage: &'static str,
        _error: &(dyn Error + 'static),
        _extras: Option<&Extras>,
    ) {
    }
}
