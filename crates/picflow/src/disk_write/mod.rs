// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Write-through disk caching of encoded images.
//!
//! [`DiskCacheWriteProducer`] gates a request before it reaches the disk cache layer and,
//! when disk writes are enabled, installs a consumer that persists the terminal encoded
//! image into the selected disk tier while forwarding every result downstream untouched.

mod builder;
mod consumer;
mod producer;

pub use builder::DiskCacheWriteProducerBuilder;
pub use producer::DiskCacheWriteProducer;

/// Name under which the disk write stage reports to listeners.
pub const STAGE_NAME: &str = "DiskCacheWriteProducer";

/// Stage event reported when a background write completes.
pub const EVENT_WRITE_SUCCEEDED: &str = "disk_write_succeeded";

/// Stage event reported when a background write fails.
pub const EVENT_WRITE_FAILED: &str = "disk_write_failed";

/// Extras key naming the tier a write was issued to.
pub const EXTRA_DISK_TIER: &str = "disk_tier";

/// Extras key carrying the cache key of an issued write.
pub const EXTRA_CACHE_KEY: &str = "cache_key";

/// Origin recorded when a request stops short of the disk cache.
pub const ORIGIN_DISK: &str = "disk";

/// Sub-origin recorded when a request stops short of the disk cache.
pub const SUB_ORIGIN_NIL_RESULT: &str = "nil-result_write";
