// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use super::builder::DiskCacheWriteProducerBuilder;
use super::consumer::DiskCacheWriteConsumer;
use super::{ORIGIN_DISK, SUB_ORIGIN_NIL_RESULT};
use crate::{
    BoxConsumer, CacheKey, CacheKeyFactory, CacheLocations, DISK_CACHE_LEVEL, DiskTiers, EncodedImage, Producer,
    ProducerContext, Spawner, Status,
};

/// State shared by the stage and every consumer it installs.
pub(crate) struct WriteShared<F> {
    pub(crate) key_factory: F,
    pub(crate) tiers: DiskTiers<CacheKey, EncodedImage>,
    pub(crate) spawner: WriteSpawner,
}

/// Where background writes are launched.
#[derive(Clone, Debug)]
pub(crate) enum WriteSpawner {
    Ready(Spawner),
    /// No spawner could be resolved; every write is refused with this reason.
    Unavailable(&'static str),
}

/// A stage that writes terminal encoded images through to a disk tier.
///
/// For each request the stage does one of three things:
///
/// - If the request may not reach the disk cache layer, it records the origin
///   `"disk"` / `"nil-result_write"` and answers with a terminal `None` result without
///   calling upstream.
/// - If disk writes are disabled for the request, it hands the downstream consumer to
///   upstream unchanged.
/// - Otherwise it wraps the downstream consumer so that the terminal result is written to
///   the tier selected by the request's [`CacheChoice`](crate::CacheChoice).
///
/// Writes run detached on the configured [`Spawner`]. Results are forwarded as soon as the
/// write is issued, and write failures are reported to the request's listener only.
///
/// # Examples
///
/// ```
/// use picflow::{DiskCacheWriteProducer, EncodedImage, Producer, UriCacheKeyFactory};
/// use picflow_tier::testing::MockTier;
/// use picflow_tier::IntoTierHandle;
/// # use picflow::{BoxConsumer, ProducerContext, Status};
/// # use std::sync::Arc;
/// # struct Network;
/// # impl Producer<EncodedImage> for Network {
/// #     fn produce_results(&self, mut consumer: BoxConsumer<EncodedImage>, _: Arc<ProducerContext>) {
/// #         consumer.on_new_result(None, Status::IS_LAST);
/// #     }
/// # }
///
/// let stage = DiskCacheWriteProducer::builder(Network, UriCacheKeyFactory)
///     .default_tier(MockTier::new().into_handle("main"))
///     .small_tier(MockTier::new().into_handle("thumbnails"))
///     .build();
/// # let _ = stage;
/// ```
pub struct DiskCacheWriteProducer<P, F> {
    upstream: P,
    shared: Arc<WriteShared<F>>,
}

impl<P, F> DiskCacheWriteProducer<P, F> {
    /// Starts configuring a stage in front of `upstream`.
    pub fn builder(upstream: P, key_factory: F) -> DiskCacheWriteProducerBuilder<P, F> {
        DiskCacheWriteProducerBuilder::new(upstream, key_factory)
    }

    pub(crate) fn new(upstream: P, key_factory: F, tiers: DiskTiers<CacheKey, EncodedImage>, spawner: WriteSpawner) -> Self {
        Self {
            upstream,
            shared: Arc::new(WriteShared {
                key_factory,
                tiers,
                spawner,
            }),
        }
    }

    /// Returns the upstream stage.
    #[must_use]
    pub fn upstream(&self) -> &P {
        &self.upstream
    }

    /// Returns the configured disk tiers.
    #[must_use]
    pub fn tiers(&self) -> &DiskTiers<CacheKey, EncodedImage> {
        &self.shared.tiers
    }
}

impl<P, F> Producer<EncodedImage> for DiskCacheWriteProducer<P, F>
where
    P: Producer<EncodedImage>,
    F: CacheKeyFactory + 'static,
{
    fn produce_results(&self, mut consumer: BoxConsumer<EncodedImage>, context: Arc<ProducerContext>) {
        if context.lowest_permitted_level() >= DISK_CACHE_LEVEL {
            tracing::debug!(
                request.id = context.id(),
                level = ?context.lowest_permitted_level(),
                "request stops before the disk cache, delivering empty result"
            );
            context.put_origin_extra(ORIGIN_DISK, SUB_ORIGIN_NIL_RESULT);
            consumer.on_new_result(None, Status::IS_LAST);
            return;
        }

        if context.is_cache_enabled(CacheLocations::DISK_WRITE) {
            let consumer = DiskCacheWriteConsumer::new(consumer, Arc::clone(&context), Arc::clone(&self.shared));
            self.upstream.produce_results(Box::new(consumer), context);
        } else {
            self.upstream.produce_results(consumer, context);
        }
    }
}

impl<P: Debug, F> Debug for DiskCacheWriteProducer<P, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskCacheWriteProducer")
            .field("upstream", &self.upstream)
            .field("tiers", &self.shared.tiers)
            .field("spawner", &self.shared.spawner)
            .finish_non_exhaustive()
    }
}
