// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(feature = "test-util")]

//! Integration tests for the disk write stage.

use std::error::Error as _;
use std::sync::Arc;

use picflow::disk_write::{EVENT_WRITE_FAILED, EVENT_WRITE_SUCCEEDED, EXTRA_CACHE_KEY, EXTRA_DISK_TIER, STAGE_NAME};
use picflow::testing::{
    DeferredSpawner, Delivery, ListenerEvent, MockTier, RecordingConsumer, RecordingListener, ScriptedProducer, TierOp,
};
#[cfg(feature = "tokio")]
use picflow::BoxConsumer;
use picflow::{
    CacheChoice, CacheKey, CacheLocations, CallerContext, DiskCacheWriteProducer, EncodedImage, ImageFormat,
    ImageRequest, IntoTierHandle, Producer, ProducerContext, ProducerError, RequestLevel, Spawner, Status, UriCacheKeyFactory,
};

const URI: &str = "https://example.com/cat.jpg";

type Upstream = Arc<ScriptedProducer<EncodedImage>>;

fn jpeg(tag: u8) -> EncodedImage {
    EncodedImage::new(vec![0xFF, 0xD8, tag], ImageFormat::Jpeg)
}

struct Harness {
    upstream: Upstream,
    small: MockTier<CacheKey, EncodedImage>,
    default: MockTier<CacheKey, EncodedImage>,
    avatars: MockTier<CacheKey, EncodedImage>,
    deferred: DeferredSpawner,
    stage: DiskCacheWriteProducer<Upstream, UriCacheKeyFactory>,
}

impl Harness {
    fn new(script: impl IntoIterator<Item = Delivery<EncodedImage>>) -> Self {
        let upstream = Arc::new(ScriptedProducer::new(script));
        let small = MockTier::new();
        let default = MockTier::new();
        let avatars = MockTier::new();
        let deferred = DeferredSpawner::new();

        let stage = DiskCacheWriteProducer::builder(Arc::clone(&upstream), UriCacheKeyFactory)
            .small_tier(small.clone().into_handle("small"))
            .default_tier(default.clone().into_handle("default"))
            .dynamic_tier("avatars", avatars.clone().into_handle("avatars"))
            .spawner(deferred.spawner())
            .build();

        Self {
            upstream,
            small,
            default,
            avatars,
            deferred,
            stage,
        }
    }

    fn results(results: impl IntoIterator<Item = (Option<EncodedImage>, Status)>) -> Self {
        Self::new(results.into_iter().map(|(result, status)| Delivery::Result(result, status)))
    }

    fn run(&self, request: ImageRequest, listener: &Arc<RecordingListener>) -> (RecordingConsumer<EncodedImage>, Arc<ProducerContext>) {
        let context = ProducerContext::builder(request).listener(Arc::clone(listener) as _).build();
        let consumer = RecordingConsumer::new();
        self.stage.produce_results(consumer.boxed(), Arc::clone(&context));
        (consumer, context)
    }

    fn total_puts(&self) -> usize {
        self.small.put_count() + self.default.put_count() + self.avatars.put_count()
    }
}

fn request() -> ImageRequest {
    ImageRequest::builder(URI).build()
}

#[test]
fn request_stopping_before_disk_never_reaches_upstream() {
    for level in [RequestLevel::DiskCache, RequestLevel::EncodedMemoryCache, RequestLevel::BitmapMemoryCache] {
        let harness = Harness::results([(Some(jpeg(1)), Status::IS_LAST)]);
        let listener = Arc::new(RecordingListener::new());

        let request = ImageRequest::builder(URI).lowest_permitted_level(level).build();
        let (consumer, context) = harness.run(request, &listener);

        assert_eq!(harness.upstream.invocations(), 0);
        assert_eq!(consumer.results(), vec![(None, Status::IS_LAST)]);
        assert_eq!(consumer.terminal_count(), 1);

        let origin = context.origin().expect("origin recorded");
        assert_eq!(origin.origin, "disk");
        assert_eq!(origin.sub_origin, "nil-result_write");

        assert!(listener.events().is_empty());
        assert_eq!(harness.deferred.pending(), 0);
        assert_eq!(harness.total_puts(), 0);
    }
}

#[test]
fn context_level_override_also_short_circuits() {
    let harness = Harness::results([(Some(jpeg(1)), Status::IS_LAST)]);
    let context = ProducerContext::builder(request())
        .lowest_permitted_level(RequestLevel::DiskCache)
        .build();
    let consumer = RecordingConsumer::new();

    harness.stage.produce_results(consumer.boxed(), context);

    assert_eq!(harness.upstream.invocations(), 0);
    assert_eq!(consumer.results(), vec![(None, Status::IS_LAST)]);
}

#[test]
fn disabled_disk_write_passes_results_through() {
    let script = [(Some(jpeg(1)), Status::NONE), (Some(jpeg(2)), Status::IS_LAST)];
    let harness = Harness::results(script.clone());
    let listener = Arc::new(RecordingListener::with_extras());

    let request = ImageRequest::builder(URI)
        .disable_caches(CacheLocations::DISK_WRITE)
        .build();
    let (consumer, context) = harness.run(request, &listener);

    assert_eq!(harness.upstream.invocations(), 1);
    assert!(Arc::ptr_eq(&harness.upstream.last_context().expect("upstream ran"), &context));
    assert_eq!(consumer.results(), script.to_vec());
    assert!(listener.events().is_empty());

    assert_eq!(harness.deferred.pending(), 0);
    assert_eq!(harness.total_puts(), 0);
    assert!(context.origin().is_none());
}

#[test]
fn terminal_result_is_forwarded_and_written_once() {
    let partial = jpeg(1);
    let last = jpeg(2);
    let harness = Harness::results([(Some(partial.clone()), Status::NONE), (Some(last.clone()), Status::IS_LAST)]);
    let listener = Arc::new(RecordingListener::new());

    let (consumer, _context) = harness.run(request(), &listener);

    // Both results reached downstream before the write ran.
    assert_eq!(
        consumer.results(),
        vec![(Some(partial), Status::NONE), (Some(last.clone()), Status::IS_LAST)]
    );
    assert_eq!(harness.deferred.pending(), 1);
    assert_eq!(harness.default.put_count(), 0);

    assert_eq!(harness.deferred.run_pending(), 1);

    assert_eq!(
        harness.default.operations(),
        vec![TierOp::Put {
            key: CacheKey::new(URI),
            value: last.clone(),
        }]
    );
    assert_eq!(harness.default.get(&CacheKey::new(URI)), Some(last));
    assert_eq!(harness.small.put_count(), 0);
    assert_eq!(harness.avatars.put_count(), 0);

    assert_eq!(listener.start_count(), 2);
    assert_eq!(listener.success_count(), 2);
    assert_eq!(listener.stage_events(), vec![EVENT_WRITE_SUCCEEDED]);
}

#[test]
fn intermediate_results_never_write() {
    let error = ProducerError::from_message(std::io::Error::other("connection reset"));
    let harness = Harness::new([
        Delivery::Result(Some(jpeg(1)), Status::NONE),
        Delivery::Result(Some(jpeg(2)), Status::IS_RESIZING_DONE),
        Delivery::Failure(error.clone()),
    ]);
    let listener = Arc::new(RecordingListener::new());

    let (consumer, _context) = harness.run(request(), &listener);

    assert_eq!(consumer.results().len(), 2);
    let failures = consumer.failures();
    assert_eq!(failures.len(), 1);
    let forwarded = failures[0].source().expect("forwarded error keeps its source");
    let raised = error.source().expect("raised error has a source");
    assert!(std::ptr::addr_eq(forwarded, raised));

    assert_eq!(harness.deferred.pending(), 0);
    assert_eq!(harness.total_puts(), 0);
    assert_eq!(listener.start_count(), 2);
    assert_eq!(listener.success_count(), 2);
}

#[test]
fn uncacheable_terminal_results_are_forwarded_without_writing() {
    let cases = [
        (Some(jpeg(1)), Status::IS_LAST | Status::DO_NOT_CACHE_ENCODED),
        (Some(jpeg(2)), Status::IS_LAST | Status::IS_PARTIAL_RESULT),
        (Some(EncodedImage::new(vec![1, 2, 3], ImageFormat::Unknown)), Status::IS_LAST),
        (None, Status::IS_LAST),
    ];

    for case in cases {
        let harness = Harness::results([case.clone()]);
        let listener = Arc::new(RecordingListener::new());

        let (consumer, _context) = harness.run(request(), &listener);

        assert_eq!(consumer.results(), vec![case]);
        assert_eq!(harness.deferred.pending(), 0);
        assert_eq!(harness.total_puts(), 0);
        assert_eq!(
            listener.events(),
            vec![
                ListenerEvent::Start { stage: STAGE_NAME },
                ListenerEvent::Success {
                    stage: STAGE_NAME,
                    extras: None,
                },
            ]
        );
    }
}

#[test]
fn small_choice_writes_to_small_tier() {
    let harness = Harness::results([(Some(jpeg(1)), Status::IS_LAST)]);
    let listener = Arc::new(RecordingListener::new());

    let request = ImageRequest::builder(URI).cache_choice(CacheChoice::Small).build();
    harness.run(request, &listener);
    assert_eq!(harness.deferred.run_pending(), 1);

    assert_eq!(harness.small.put_count(), 1);
    assert_eq!(harness.default.put_count(), 0);
}

#[test]
fn registered_dynamic_choice_writes_to_its_tier() {
    let harness = Harness::results([(Some(jpeg(1)), Status::IS_LAST)]);
    let listener = Arc::new(RecordingListener::new());

    let request = ImageRequest::builder(URI).cache_choice(CacheChoice::dynamic("avatars")).build();
    harness.run(request, &listener);
    assert_eq!(harness.deferred.run_pending(), 1);

    assert_eq!(harness.avatars.put_count(), 1);
    assert_eq!(harness.small.put_count() + harness.default.put_count(), 0);
}

#[test]
fn unknown_dynamic_choice_reports_failure_and_still_forwards() {
    let harness = Harness::results([(Some(jpeg(1)), Status::IS_LAST)]);
    let listener = Arc::new(RecordingListener::new());

    let request = ImageRequest::builder(URI).cache_choice(CacheChoice::dynamic("missing")).build();
    let (consumer, _context) = harness.run(request, &listener);

    assert_eq!(consumer.results(), vec![(Some(jpeg(1)), Status::IS_LAST)]);
    assert_eq!(consumer.failures().len(), 0);

    let failures = listener.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("got no disk cache"), "{failures:?}");
    assert!(failures[0].contains("dynamic(missing)"), "{failures:?}");
    assert!(failures[0].contains("ordinal 2"), "{failures:?}");
    assert_eq!(listener.success_count(), 0);

    assert_eq!(harness.deferred.pending(), 0);
    assert_eq!(harness.total_puts(), 0);
}

#[test]
fn unconfigured_fixed_tier_reports_choice() {
    let upstream = Arc::new(ScriptedProducer::results([(Some(jpeg(1)), Status::IS_LAST)]));
    let stage = DiskCacheWriteProducer::builder(upstream, UriCacheKeyFactory)
        .default_tier(MockTier::new().into_handle("default"))
        .spawner(Spawner::new_custom("discard", drop))
        .build();

    let listener = Arc::new(RecordingListener::new());
    let request = ImageRequest::builder(URI).cache_choice(CacheChoice::Small).build();
    let context = ProducerContext::builder(request).listener(listener.clone()).build();
    let consumer = RecordingConsumer::new();

    stage.produce_results(consumer.boxed(), context);

    assert_eq!(consumer.results().len(), 1);
    let failures = listener.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("small (ordinal 0)"), "{failures:?}");
}

#[test]
fn failed_write_is_reported_only_to_listener() {
    let harness = Harness::results([(Some(jpeg(1)), Status::IS_LAST)]);
    harness.default.fail_when(|_| true);
    let listener = Arc::new(RecordingListener::new());

    let (consumer, _context) = harness.run(request(), &listener);
    assert_eq!(harness.deferred.run_pending(), 1);

    assert_eq!(consumer.results(), vec![(Some(jpeg(1)), Status::IS_LAST)]);
    assert!(consumer.failures().is_empty());

    // The write was issued, so the stage itself finished successfully.
    assert_eq!(listener.success_count(), 1);
    assert!(listener.failures().is_empty());
    assert_eq!(listener.stage_events(), vec![EVENT_WRITE_FAILED]);

    assert_eq!(harness.default.put_count(), 1);
    assert_eq!(harness.default.entry_count(), 0);
}

#[test]
fn stage_built_without_runtime_reports_spawn_failure_and_forwards() {
    let upstream = Arc::new(ScriptedProducer::results([(Some(jpeg(1)), Status::IS_LAST)]));
    let tier = MockTier::new();
    let stage = DiskCacheWriteProducer::builder(upstream, UriCacheKeyFactory)
        .default_tier(tier.clone().into_handle("default"))
        .build();

    let listener = Arc::new(RecordingListener::new());
    let context = ProducerContext::builder(request()).listener(listener.clone()).build();
    let consumer = RecordingConsumer::new();

    stage.produce_results(consumer.boxed(), context);

    assert_eq!(consumer.results(), vec![(Some(jpeg(1)), Status::IS_LAST)]);
    let failures = listener.failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("unable to spawn background task"), "{failures:?}");
    assert_eq!(listener.success_count(), 0);
    assert_eq!(tier.put_count(), 0);
}

#[test]
fn issued_write_carries_extras_when_requested() {
    let harness = Harness::results([(Some(jpeg(1)), Status::IS_LAST)]);

    let listener = Arc::new(RecordingListener::with_extras());
    harness.run(request(), &listener);

    let extras = listener
        .events()
        .into_iter()
        .find_map(|event| match event {
            ListenerEvent::Success { extras, .. } => extras,
            _ => None,
        })
        .expect("success event with extras");
    assert_eq!(extras.get(EXTRA_DISK_TIER).map(String::as_str), Some("default"));
    assert_eq!(extras.get(EXTRA_CACHE_KEY).map(String::as_str), Some(URI));

    let listener = Arc::new(RecordingListener::new());
    harness.run(request(), &listener);
    assert!(listener.events().iter().all(|event| !matches!(
        event,
        ListenerEvent::Success { extras: Some(_), .. }
    )));
}

#[test]
fn cancellation_and_progress_are_forwarded_verbatim() {
    let harness = Harness::new([
        Delivery::Progress(0.25),
        Delivery::Result(Some(jpeg(1)), Status::NONE),
        Delivery::Progress(0.75),
        Delivery::Cancellation,
    ]);
    let listener = Arc::new(RecordingListener::new());

    let (consumer, _context) = harness.run(request(), &listener);

    assert_eq!(consumer.progress(), vec![0.25, 0.75]);
    assert_eq!(consumer.cancellation_count(), 1);
    assert_eq!(consumer.terminal_count(), 1);
    assert_eq!(listener.start_count(), 1);
    assert_eq!(harness.total_puts(), 0);
}

#[test]
fn key_is_derived_from_request_and_caller_context() {
    let upstream = Arc::new(ScriptedProducer::results([(Some(jpeg(1)), Status::IS_LAST)]));
    let tier = MockTier::new();
    let factory = |request: &ImageRequest, caller: Option<&CallerContext>| {
        CacheKey::new(format!("{}#{}", request.source_uri(), caller.map_or("-", CallerContext::as_str)))
    };
    let stage = DiskCacheWriteProducer::builder(upstream, factory)
        .default_tier(tier.clone().into_handle("default"))
        .spawner(Spawner::new_custom("inline", |work| futures::executor::block_on(work)))
        .build();

    let context = ProducerContext::builder(request())
        .caller_context(CallerContext::new("feed"))
        .build();
    stage.produce_results(RecordingConsumer::new().boxed(), context);

    assert!(tier.contains_key(&CacheKey::new(format!("{URI}#feed"))));
}

#[test]
fn concurrent_requests_share_one_tier() {
    let harness = Arc::new(Harness::results([(Some(jpeg(9)), Status::IS_LAST)]));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let harness = Arc::clone(&harness);
            std::thread::spawn(move || {
                let request = ImageRequest::builder(format!("https://example.com/{i}.jpg")).build();
                let listener = Arc::new(RecordingListener::new());
                let (consumer, _context) = harness.run(request, &listener);
                assert_eq!(consumer.terminal_count(), 1);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("request thread panicked");
    }

    assert_eq!(harness.deferred.run_pending(), 8);
    assert_eq!(harness.default.entry_count(), 8);
    assert_eq!(harness.upstream.invocations(), 8);
}

#[cfg(feature = "tokio")]
#[tokio::test]
async fn tokio_spawner_completes_write_in_background() {
    let upstream = Arc::new(ScriptedProducer::results([(Some(jpeg(1)), Status::IS_LAST)]));
    let tier = MockTier::new();
    let stage = DiskCacheWriteProducer::builder(upstream, UriCacheKeyFactory)
        .default_tier(tier.clone().into_handle("default"))
        .build();

    let listener = Arc::new(RecordingListener::new());
    let context = ProducerContext::builder(request()).listener(listener.clone()).build();
    let consumer = RecordingConsumer::new();

    stage.produce_results(consumer.boxed(), context);
    assert_eq!(consumer.terminal_count(), 1);

    for _ in 0..100 {
        if !listener.stage_events().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(tier.put_count(), 1);
    assert_eq!(listener.stage_events(), vec![EVENT_WRITE_SUCCEEDED]);
}

/// Delivers its single result from a thread that belongs to no runtime.
#[cfg(feature = "tokio")]
#[derive(Debug)]
struct PlainThreadUpstream;

#[cfg(feature = "tokio")]
impl Producer<EncodedImage> for PlainThreadUpstream {
    fn produce_results(&self, mut consumer: BoxConsumer<EncodedImage>, _context: Arc<ProducerContext>) {
        std::thread::spawn(move || consumer.on_new_result(Some(jpeg(1)), Status::IS_LAST))
            .join()
            .expect("delivery thread panicked");
    }
}

#[cfg(feature = "tokio")]
#[tokio::test(flavor = "multi_thread")]
async fn default_spawner_writes_results_delivered_off_runtime() {
    let tier = MockTier::new();
    let stage = DiskCacheWriteProducer::builder(PlainThreadUpstream, UriCacheKeyFactory)
        .default_tier(tier.clone().into_handle("default"))
        .build();

    let listener = Arc::new(RecordingListener::new());
    let context = ProducerContext::builder(request()).listener(listener.clone()).build();
    let consumer = RecordingConsumer::new();

    stage.produce_results(consumer.boxed(), context);
    assert_eq!(consumer.terminal_count(), 1);
    assert!(listener.failures().is_empty(), "{:?}", listener.failures());

    for _ in 0..100 {
        if !listener.stage_events().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(tier.put_count(), 1);
    assert_eq!(listener.stage_events(), vec![EVENT_WRITE_SUCCEEDED]);
}
