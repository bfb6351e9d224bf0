// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use picflow_tier::TierHandle;

use super::DiskCacheWriteProducer;
use super::producer::WriteSpawner;
use crate::{CacheKey, DiskTiers, EncodedImage, Spawner};

/// Builder for [`DiskCacheWriteProducer`].
///
/// Created by [`DiskCacheWriteProducer::builder`]. Every tier is optional; a request whose
/// cache choice resolves to no tier is served without caching. Without an explicit
/// [`spawner`](Self::spawner), writes run on the Tokio runtime that is current when
/// [`build`](Self::build) is called.
pub struct DiskCacheWriteProducerBuilder<P, F> {
    upstream: P,
    key_factory: F,
    tiers: DiskTiers<CacheKey, EncodedImage>,
    spawner: Option<Spawner>,
}

impl<P, F> DiskCacheWriteProducerBuilder<P, F> {
    pub(crate) fn new(upstream: P, key_factory: F) -> Self {
        Self {
            upstream,
            key_factory,
            tiers: DiskTiers::new(),
            spawner: None,
        }
    }

    /// Sets the tier used for [`CacheChoice::Default`](crate::CacheChoice::Default).
    #[must_use]
    pub fn default_tier(mut self, tier: TierHandle<CacheKey, EncodedImage>) -> Self {
        self.tiers = self.tiers.with_default(tier);
        self
    }

    /// Sets the tier used for [`CacheChoice::Small`](crate::CacheChoice::Small).
    #[must_use]
    pub fn small_tier(mut self, tier: TierHandle<CacheKey, EncodedImage>) -> Self {
        self.tiers = self.tiers.with_small(tier);
        self
    }

    /// Registers a tier for [`CacheChoice::Dynamic`](crate::CacheChoice::Dynamic) with the given id.
    #[must_use]
    pub fn dynamic_tier(mut self, id: impl Into<Arc<str>>, tier: TierHandle<CacheKey, EncodedImage>) -> Self {
        self.tiers = self.tiers.with_dynamic(id, tier);
        self
    }

    /// Registers several dynamic tiers at once.
    #[must_use]
    pub fn dynamic_tiers<I, S>(mut self, tiers: I) -> Self
    where
        I: IntoIterator<Item = (S, TierHandle<CacheKey, EncodedImage>)>,
        S: Into<Arc<str>>,
    {
        for (id, tier) in tiers {
            self.tiers = self.tiers.with_dynamic(id, tier);
        }
        self
    }

    /// Replaces all tiers with a prepared set.
    #[must_use]
    pub fn tiers(mut self, tiers: DiskTiers<CacheKey, EncodedImage>) -> Self {
        self.tiers = tiers;
        self
    }

    /// Sets the spawner background writes run on.
    ///
    /// The spawner is called on whichever thread delivers the terminal result.
    /// `Spawner::new_tokio` resolves the runtime on that thread, so it suits upstream stages
    /// that deliver from runtime threads only.
    #[must_use]
    pub fn spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Builds the stage.
    ///
    /// Without an explicit spawner, the Tokio runtime current on the calling thread is captured
    /// here and every write is spawned onto it, whatever thread delivers the result. If there is
    /// no runtime, writes are refused and reported as failures while results keep flowing.
    #[must_use]
    pub fn build(self) -> DiskCacheWriteProducer<P, F> {
        let spawner = self.spawner.map_or_else(default_spawner, WriteSpawner::Ready);
        DiskCacheWriteProducer::new(self.upstream, self.key_factory, self.tiers, spawner)
    }
}

#[cfg(feature = "tokio")]
fn default_spawner() -> WriteSpawner {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => WriteSpawner::Ready(Spawner::new_custom("tokio", move |work| drop(handle.spawn(work)))),
        Err(error) => {
            tracing::warn!(error = %error, "no Tokio runtime when building the disk write stage, writes are disabled");
            WriteSpawner::Unavailable("no Tokio runtime when the stage was built")
        }
    }
}

#[cfg(not(feature = "tokio"))]
fn default_spawner() -> WriteSpawner {
    WriteSpawner::Unavailable("no spawner configured")
}

impl<P: Debug, F> Debug for DiskCacheWriteProducerBuilder<P, F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskCacheWriteProducerBuilder")
            .field("upstream", &self.upstream)
            .field("tiers", &self.tiers)
            .field("spawner", &self.spawner)
            .finish_non_exhaustive()
    }
}
