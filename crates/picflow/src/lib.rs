// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Image pipeline stages with write-through disk caching.
//!
//! An image request flows through a chain of [`Producer`] stages. Each stage delivers a
//! sequence of results to a [`Consumer`]: zero or more intermediate results, then exactly
//! one terminal outcome (a result flagged [`Status::IS_LAST`], a failure, or a
//! cancellation). Stages compose by wrapping the stage in front of them, and may wrap the
//! consumer they are handed to observe deliveries on their way back.
//!
//! This crate provides the stage protocol, the per-request [`ProducerContext`], and
//! [`DiskCacheWriteProducer`], the stage that persists terminal encoded images into a
//! disk tier chosen per request.
//!
//! # Writing Through to Disk
//!
//! ```
//! use std::sync::Arc;
//! use picflow::{
//!     BoxConsumer, DiskCacheWriteProducer, EncodedImage, ImageFormat, ImageRequest, Producer,
//!     ProducerContext, Spawner, Status, UriCacheKeyFactory,
//! };
//! use picflow_tier::IntoTierHandle;
//! use picflow_tier::testing::MockTier;
//!
//! struct Network;
//!
//! impl Producer<EncodedImage> for Network {
//!     fn produce_results(&self, mut consumer: BoxConsumer<EncodedImage>, _context: Arc<ProducerContext>) {
//!         consumer.on_new_result(Some(EncodedImage::new(vec![0xFF, 0xD8], ImageFormat::Jpeg)), Status::IS_LAST);
//!     }
//! }
//!
//! let tier = MockTier::new();
//! let stage = DiskCacheWriteProducer::builder(Network, UriCacheKeyFactory)
//!     .default_tier(tier.clone().into_handle("main"))
//!     .spawner(Spawner::new_custom("inline", |work| futures::executor::block_on(work)))
//!     .build();
//!
//! # struct Discard;
//! # impl picflow::Consumer<EncodedImage> for Discard {
//! #     fn on_new_result(&mut self, _: Option<EncodedImage>, _: Status) {}
//! #     fn on_failure(&mut self, _: picflow::ProducerError) {}
//! #     fn on_cancellation(&mut self) {}
//! # }
//! let request = ImageRequest::builder("https://example.com/cat.jpg").build();
//! stage.produce_results(Box::new(Discard), ProducerContext::builder(request).build());
//!
//! assert_eq!(tier.put_count(), 1);
//! ```
//!
//! # Telemetry
//!
//! Stages report to the [`StageListener`] installed on each request. [`StageTelemetry`]
//! turns those reports into `tracing` events and, with the `metrics` feature, OpenTelemetry
//! counters. Disk write failures are only ever visible there: caching never changes what
//! a consumer receives.
//!
//! # Features
//!
//! - `tokio` (default): background writes run on the Tokio runtime current when the stage is built.
//! - `metrics`: OpenTelemetry counters in [`StageTelemetry`].
//! - `test-util`: recording consumers, scripted producers and mock tiers in [`testing`].

mod consumer;
mod context;
pub mod disk_write;
mod error;
mod image;
mod key;
mod listener;
mod producer;
mod request;
mod select;
mod status;
mod telemetry;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use consumer::{BoxConsumer, Consumer};
#[doc(inline)]
pub use context::{ORIGIN_KEY, ORIGIN_SUB_KEY, Origin, ProducerContext, ProducerContextBuilder};
#[doc(inline)]
pub use disk_write::{DiskCacheWriteProducer, DiskCacheWriteProducerBuilder};
#[doc(inline)]
pub use error::{NoDiskTierChosen, ProducerError, SpawnError};
#[doc(inline)]
pub use image::{EncodedImage, ImageFormat};
#[doc(inline)]
pub use key::{CacheKey, CacheKeyFactory, UriCacheKeyFactory};
#[doc(inline)]
pub use listener::{Extras, NoopListener, StageListener};
#[doc(inline)]
pub use picflow_tier::{DiskTier, IntoTierHandle, TierHandle};
#[doc(inline)]
pub use producer::Producer;
#[doc(inline)]
pub use request::{CacheChoice, CacheLocations, CallerContext, DISK_CACHE_LEVEL, ImageRequest, ImageRequestBuilder, RequestLevel};
#[doc(inline)]
pub use select::{DiskTiers, select_tier};
#[doc(no_inline)]
pub use anyspawn::{BoxedFuture, Spawner};
#[doc(inline)]
pub use status::Status;
#[doc(inline)]
pub use telemetry::{StageTelemetry, TelemetryConfig};
