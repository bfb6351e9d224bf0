// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use picflow_tier::{DiskTier, TierHandle};

use super::producer::{WriteShared, WriteSpawner};
use super::{EVENT_WRITE_FAILED, EVENT_WRITE_SUCCEEDED, EXTRA_CACHE_KEY, EXTRA_DISK_TIER, STAGE_NAME};
use crate::{
    BoxConsumer, CacheKey, CacheKeyFactory, Consumer, EncodedImage, Extras, NoDiskTierChosen, ProducerContext,
    ProducerError, SpawnError, Status,
};

/// Status flags that rule a terminal result out of the disk cache.
const UNCACHEABLE: Status = Status::DO_NOT_CACHE_ENCODED.with(Status::IS_PARTIAL_RESULT);

/// Returns `true` if a delivered image should be written to disk.
fn is_cacheable(image: &EncodedImage, status: Status) -> bool {
    status.is_last() && !status.has_any(UNCACHEABLE) && image.format().is_known()
}

/// Intercepts deliveries on their way downstream and writes the terminal one to disk.
pub(crate) struct DiskCacheWriteConsumer<F> {
    downstream: BoxConsumer<EncodedImage>,
    context: Arc<ProducerContext>,
    shared: Arc<WriteShared<F>>,
}

impl<F> DiskCacheWriteConsumer<F>
where
    F: CacheKeyFactory,
{
    pub(crate) fn new(downstream: BoxConsumer<EncodedImage>, context: Arc<ProducerContext>, shared: Arc<WriteShared<F>>) -> Self {
        Self {
            downstream,
            context,
            shared,
        }
    }

    /// Issues the write for `image`. Faults are reported to the listener and never returned.
    fn write(&self, image: &EncodedImage) {
        let context = &*self.context;
        let listener = context.listener();
        let key = self
            .shared
            .key_factory
            .encoded_cache_key(context.image_request(), context.caller_context());

        let Some(tier) = self.shared.tiers.select(context.cache_choice()) else {
            let error = NoDiskTierChosen::new(context.cache_choice().clone());
            tracing::warn!(
                request.id = context.id(),
                cache.choice = %context.cache_choice(),
                error = %error,
                "no disk tier for cache choice, result will not be cached"
            );
            listener.on_stage_finish_failure(context, STAGE_NAME, &error, None);
            return;
        };

        let extras = listener.requires_extras(context).then(|| write_extras(tier, &key));

        let task = write_through(tier.clone(), key, image.clone(), Arc::clone(&self.context));
        let issued = match &self.shared.spawner {
            WriteSpawner::Ready(spawner) => {
                // Fire and forget: dropping the handle detaches the write.
                drop(spawner.spawn(task));
                Ok(())
            }
            WriteSpawner::Unavailable(reason) => Err(SpawnError::new(*reason)),
        };

        match issued {
            Ok(()) => {
                tracing::debug!(
                    request.id = context.id(),
                    disk.tier = tier.name(),
                    image.size = image.len(),
                    "disk write issued"
                );
                listener.on_stage_finish_success(context, STAGE_NAME, extras.as_ref());
            }
            Err(error) => {
                tracing::warn!(
                    request.id = context.id(),
                    disk.tier = tier.name(),
                    error = %error,
                    "disk write could not be issued"
                );
                listener.on_stage_finish_failure(context, STAGE_NAME, &error, extras.as_ref());
            }
        }
    }
}

fn write_extras(tier: &TierHandle<CacheKey, EncodedImage>, key: &CacheKey) -> Extras {
    Extras::from([(EXTRA_DISK_TIER, tier.name().to_string()), (EXTRA_CACHE_KEY, key.to_string())])
}

/// Runs detached; the outcome only ever reaches telemetry.
async fn write_through(
    tier: TierHandle<CacheKey, EncodedImage>,
    key: CacheKey,
    image: EncodedImage,
    context: Arc<ProducerContext>,
) {
    match tier.put(&key, image).await {
        Ok(()) => {
            tracing::debug!(request.id = context.id(), disk.tier = tier.name(), cache.key = %key, "disk write completed");
            context.listener().on_stage_event(&context, STAGE_NAME, EVENT_WRITE_SUCCEEDED);
        }
        Err(error) => {
            tracing::warn!(
                request.id = context.id(),
                disk.tier = tier.name(),
                cache.key = %key,
                error = %error,
                "disk write failed"
            );
            context.listener().on_stage_event(&context, STAGE_NAME, EVENT_WRITE_FAILED);
        }
    }
}

impl<F> Consumer<EncodedImage> for DiskCacheWriteConsumer<F>
where
    F: CacheKeyFactory + 'static,
{
    fn on_new_result(&mut self, result: Option<EncodedImage>, status: Status) {
        let listener = self.context.listener();
        listener.on_stage_start(&self.context, STAGE_NAME);

        match result.as_ref() {
            Some(image) if is_cacheable(image, status) => self.write(image),
            _ => {
                tracing::debug!(
                    request.id = self.context.id(),
                    status = ?status,
                    has_result = result.is_some(),
                    "result not eligible for disk write"
                );
                listener.on_stage_finish_success(&self.context, STAGE_NAME, None);
            }
        }

        self.downstream.on_new_result(result, status);
    }

    fn on_failure(&mut self, error: ProducerError) {
        self.downstream.on_failure(error);
    }

    fn on_cancellation(&mut self) {
        self.downstream.on_cancellation();
    }

    fn on_progress_update(&mut self, progress: f32) {
        self.downstream.on_progress_update(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ImageFormat;

    fn jpeg() -> EncodedImage {
        EncodedImage::new(vec![0xFF, 0xD8, 0xFF], ImageFormat::Jpeg)
    }

    #[test]
    fn terminal_known_image_is_cacheable() {
        assert!(is_cacheable(&jpeg(), Status::IS_LAST));
        assert!(is_cacheable(&jpeg(), Status::IS_LAST | Status::IS_RESIZING_DONE));
        assert!(is_cacheable(&jpeg(), Status::IS_LAST | Status::IS_PLACEHOLDER));
    }

    #[test]
    fn intermediate_results_are_not_cacheable() {
        assert!(!is_cacheable(&jpeg(), Status::NONE));
        assert!(!is_cacheable(&jpeg(), Status::IS_RESIZING_DONE));
    }

    #[test]
    fn flagged_results_are_not_cacheable() {
        assert!(!is_cacheable(&jpeg(), Status::IS_LAST | Status::DO_NOT_CACHE_ENCODED));
        assert!(!is_cacheable(&jpeg(), Status::IS_LAST | Status::IS_PARTIAL_RESULT));
    }

    #[test]
    fn unknown_format_is_not_cacheable() {
        let unknown = EncodedImage::new(vec![1, 2, 3], ImageFormat::Unknown);
        assert!(!is_cacheable(&unknown, Status::IS_LAST));
    }
}
