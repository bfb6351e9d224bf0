// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test doubles for pipeline stages.
//!
//! Available with the `test-util` feature.

use std::error::Error;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyspawn::BoxedFuture;
use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

use crate::{BoxConsumer, Consumer, Extras, Producer, ProducerContext, ProducerError, Spawner, StageListener, Status};

#[doc(inline)]
pub use picflow_tier::testing::{MockTier, TierOp};

/// One delivery observed by a [`RecordingConsumer`] or replayed by a [`ScriptedProducer`].
#[derive(Debug, Clone)]
pub enum Delivery<T> {
    /// A result and its status.
    Result(Option<T>, Status),
    /// A terminal failure.
    Failure(ProducerError),
    /// A terminal cancellation.
    Cancellation,
    /// A progress update.
    Progress(f32),
}

impl<T> Delivery<T> {
    /// Returns `true` if this delivery ends the request.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Result(_, status) => status.is_last(),
            Self::Failure(_) | Self::Cancellation => true,
            Self::Progress(_) => false,
        }
    }
}

/// A consumer that records every delivery.
///
/// Clones share the same record, so keep one clone for assertions and hand
/// [`boxed`](Self::boxed) to the stage under test.
///
/// # Examples
///
/// ```
/// use picflow::testing::RecordingConsumer;
/// use picflow::{Consumer, Status};
///
/// let recorder = RecordingConsumer::<u32>::new();
/// let mut consumer = recorder.boxed();
/// consumer.on_new_result(Some(7), Status::IS_LAST);
///
/// assert_eq!(recorder.results(), vec![(Some(7), Status::IS_LAST)]);
/// assert!(recorder.is_terminated());
/// ```
#[derive(Debug)]
pub struct RecordingConsumer<T> {
    deliveries: Arc<Mutex<Vec<Delivery<T>>>>,
}

impl<T> RecordingConsumer<T> {
    /// Creates a consumer with an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self {
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns a boxed clone to hand to a producer.
    #[must_use]
    pub fn boxed(&self) -> BoxConsumer<T>
    where
        T: Send + 'static,
    {
        Box::new(self.clone())
    }

    /// Returns every delivery in order.
    #[must_use]
    pub fn deliveries(&self) -> Vec<Delivery<T>>
    where
        T: Clone,
    {
        self.deliveries.lock().clone()
    }

    /// Returns the delivered results and statuses in order.
    #[must_use]
    pub fn results(&self) -> Vec<(Option<T>, Status)>
    where
        T: Clone,
    {
        self.deliveries
            .lock()
            .iter()
            .filter_map(|delivery| match delivery {
                Delivery::Result(result, status) => Some((result.clone(), *status)),
                _ => None,
            })
            .collect()
    }

    /// Returns the delivered failures in order.
    #[must_use]
    pub fn failures(&self) -> Vec<ProducerError> {
        self.deliveries
            .lock()
            .iter()
            .filter_map(|delivery| match delivery {
                Delivery::Failure(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of cancellations received.
    #[must_use]
    pub fn cancellation_count(&self) -> usize {
        self.deliveries
            .lock()
            .iter()
            .filter(|delivery| matches!(delivery, Delivery::Cancellation))
            .count()
    }

    /// Returns the progress updates received.
    #[must_use]
    pub fn progress(&self) -> Vec<f32> {
        self.deliveries
            .lock()
            .iter()
            .filter_map(|delivery| match delivery {
                Delivery::Progress(progress) => Some(*progress),
                _ => None,
            })
            .collect()
    }

    /// Returns the number of terminal deliveries received.
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.deliveries.lock().iter().filter(|delivery| delivery.is_terminal()).count()
    }

    /// Returns `true` if a terminal delivery was received.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminal_count() > 0
    }
}

impl<T> Default for RecordingConsumer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for RecordingConsumer<T> {
    fn clone(&self) -> Self {
        Self {
            deliveries: Arc::clone(&self.deliveries),
        }
    }
}

impl<T: Send> Consumer<T> for RecordingConsumer<T> {
    fn on_new_result(&mut self, result: Option<T>, status: Status) {
        self.deliveries.lock().push(Delivery::Result(result, status));
    }

    fn on_failure(&mut self, error: ProducerError) {
        self.deliveries.lock().push(Delivery::Failure(error));
    }

    fn on_cancellation(&mut self) {
        self.deliveries.lock().push(Delivery::Cancellation);
    }

    fn on_progress_update(&mut self, progress: f32) {
        self.deliveries.lock().push(Delivery::Progress(progress));
    }
}

/// A producer that replays a fixed script of deliveries.
///
/// Counts how often it was asked to produce and keeps the last context it received.
#[derive(Debug)]
pub struct ScriptedProducer<T> {
    script: Vec<Delivery<T>>,
    invocations: AtomicUsize,
    last_context: Mutex<Option<Arc<ProducerContext>>>,
}

impl<T> ScriptedProducer<T> {
    /// Creates a producer that replays `script` on every invocation.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = Delivery<T>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            invocations: AtomicUsize::new(0),
            last_context: Mutex::new(None),
        }
    }

    /// Creates a producer that delivers `results` in order.
    #[must_use]
    pub fn results(results: impl IntoIterator<Item = (Option<T>, Status)>) -> Self {
        Self::new(results.into_iter().map(|(result, status)| Delivery::Result(result, status)))
    }

    /// Returns how many times `produce_results` was called.
    #[must_use]
    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Returns the context of the most recent invocation.
    #[must_use]
    pub fn last_context(&self) -> Option<Arc<ProducerContext>> {
        self.last_context.lock().clone()
    }
}

impl<T> Producer<T> for ScriptedProducer<T>
where
    T: Clone + Send + Sync,
{
    fn produce_results(&self, mut consumer: BoxConsumer<T>, context: Arc<ProducerContext>) {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock() = Some(context);

        for delivery in &self.script {
            match delivery {
                Delivery::Result(result, status) => consumer.on_new_result(result.clone(), *status),
                Delivery::Failure(error) => consumer.on_failure(error.clone()),
                Delivery::Cancellation => consumer.on_cancellation(),
                Delivery::Progress(progress) => consumer.on_progress_update(*progress),
            }
        }
    }
}

/// One call observed by a [`RecordingListener`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerEvent {
    /// `on_stage_start`.
    Start {
        /// Reporting stage.
        stage: &'static str,
    },
    /// `on_stage_finish_success`.
    Success {
        /// Reporting stage.
        stage: &'static str,
        /// Extras passed along, if any.
        extras: Option<Extras>,
    },
    /// `on_stage_finish_failure`.
    Failure {
        /// Reporting stage.
        stage: &'static str,
        /// Display form of the reported error.
        error: String,
        /// Extras passed along, if any.
        extras: Option<Extras>,
    },
    /// `on_stage_event`.
    Event {
        /// Reporting stage.
        stage: &'static str,
        /// The event name.
        event: &'static str,
    },
}

/// A listener that records every call.
///
/// Events from background tasks are recorded too, so the record may grow after the
/// pipeline call returns.
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ListenerEvent>>,
    wants_extras: bool,
}

impl RecordingListener {
    /// Creates a listener that does not ask for extras.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a listener that asks for extras.
    #[must_use]
    pub fn with_extras() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            wants_extras: true,
        }
    }

    /// Returns every recorded call in order.
    #[must_use]
    pub fn events(&self) -> Vec<ListenerEvent> {
        self.events.lock().clone()
    }

    /// Returns the number of `on_stage_start` calls.
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.count(|event| matches!(event, ListenerEvent::Start { .. }))
    }

    /// Returns the number of `on_stage_finish_success` calls.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.count(|event| matches!(event, ListenerEvent::Success { .. }))
    }

    /// Returns the error messages of `on_stage_finish_failure` calls.
    #[must_use]
    pub fn failures(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ListenerEvent::Failure { error, .. } => Some(error.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the names of `on_stage_event` calls.
    #[must_use]
    pub fn stage_events(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                ListenerEvent::Event { event, .. } => Some(*event),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&ListenerEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }
}

impl StageListener for RecordingListener {
    fn on_stage_start(&self, _context: &ProducerContext, stage: &'static str) {
        self.events.lock().push(ListenerEvent::Start { stage });
    }

    fn on_stage_finish_success(&self, _context: &ProducerContext, stage: &'static str, extras: Option<&Extras>) {
        self.events.lock().push(ListenerEvent::Success {
            stage,
            extras: extras.cloned(),
        });
    }

    fn on_stage_finish_failure(
        &self,
        _context: &ProducerContext,
        stage: &'static str,
        error: &(dyn Error + 'static),
        extras: Option<&Extras>,
    ) {
        self.events.lock().push(ListenerEvent::Failure {
            stage,
            error: error.to_string(),
            extras: extras.cloned(),
        });
    }

    fn on_stage_event(&self, _context: &ProducerContext, stage: &'static str, event: &'static str) {
        self.events.lock().push(ListenerEvent::Event { stage, event });
    }

    fn requires_extras(&self, _context: &ProducerContext) -> bool {
        self.wants_extras
    }
}

/// Queues spawned tasks until the test runs them.
///
/// Lets a test observe the pipeline after a background write was issued but before it
/// ran.
///
/// # Examples
///
/// ```
/// use picflow::testing::DeferredSpawner;
///
/// let deferred = DeferredSpawner::new();
/// drop(deferred.spawner().spawn(async {}));
///
/// assert_eq!(deferred.pending(), 1);
/// assert_eq!(deferred.run_pending(), 1);
/// assert_eq!(deferred.pending(), 0);
/// ```
#[derive(Clone, Default)]
pub struct DeferredSpawner {
    queue: Arc<Mutex<Vec<BoxedFuture>>>,
}

impl DeferredSpawner {
    /// Creates a spawner with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a [`Spawner`] that enqueues onto this queue.
    #[must_use]
    pub fn spawner(&self) -> Spawner {
        let queue = Arc::clone(&self.queue);
        Spawner::new_custom("deferred", move |work| queue.lock().push(work))
    }

    /// Returns the number of queued tasks.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    /// Runs every queued task to completion on the current thread and returns how many ran.
    #[must_use]
    pub fn run_pending(&self) -> usize {
        let tasks = std::mem::take(&mut *self.queue.lock());
        let count = tasks.len();
        for task in tasks {
            futures::executor::block_on(task);
        }
        count
    }
}

impl std::fmt::Debug for DeferredSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSpawner").field("pending", &self.pending()).finish()
    }
}

/// Captures formatted log output for assertions.
///
/// Install with `tracing::subscriber::set_default(capture.subscriber())` for
/// thread-local capture.
///
/// # Examples
///
/// ```
/// use picflow::testing::LogCapture;
///
/// let capture = LogCapture::new();
/// let _guard = tracing::subscriber::set_default(capture.subscriber());
///
/// tracing::info!(disk.tier = "main", "disk write issued");
/// capture.assert_contains("disk write issued");
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Creates an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns everything logged so far.
    #[must_use]
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).to_string()
    }

    /// Panics unless the captured output contains `expected`.
    pub fn assert_contains(&self, expected: &str) {
        let output = self.output();
        assert!(
            output.contains(expected),
            "log output does not contain '{expected}', got:\n{output}"
        );
    }

    /// Returns a subscriber that formats events into this capture without ANSI colors.
    #[must_use]
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        use tracing_subscriber::layer::SubscriberExt;
        tracing_subscriber::registry().with(tracing_subscriber::fmt::layer().with_writer(self.clone()).with_ansi(false))
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogCaptureWriter {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

/// Writer handed out by [`LogCapture`] for each formatted event.
#[derive(Debug)]
pub struct LogCaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl Write for LogCaptureWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
