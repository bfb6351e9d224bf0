// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The core trait for disk cache storage engines.

use crate::Error;

/// Trait for disk cache tier implementations.
///
/// The pipeline only writes through this trait. Eviction, file layout and serialization
/// belong to the implementation, as does the ordering of concurrent writes to the same key.
///
/// Ordinary operational conditions such as a full disk or an I/O error are reported
/// through the returned future, never by panicking.
#[dynosaur::dynosaur(pub(crate) DynDiskTier = dyn(box) DiskTier, bridge(none))]
pub trait DiskTier<K, V>: Send + Sync {
    /// Stores `value` under `key`.
    fn put(&self, key: &K, value: V) -> impl Future<Output = Result<(), Error>> + Send;
}
