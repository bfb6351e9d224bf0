// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared, type-erased handle to a disk tier.

use std::{fmt::Debug, sync::Arc};

use crate::{DiskTier, Error, tier::DynDiskTier};

/// Extension trait for converting any `DiskTier` into a `TierHandle`.
///
/// This trait is automatically implemented for all types that implement `DiskTier`.
///
/// # Examples
///
/// ```
/// use picflow_tier::{DiskTier, IntoTierHandle, TierHandle};
///
/// fn share<T>(tier: T) -> TierHandle<String, Vec<u8>>
/// where
///     T: DiskTier<String, Vec<u8>> + 'static,
/// {
///     tier.into_handle("default")
/// }
/// ```
pub trait IntoTierHandle<K, V>: Sized {
    /// Converts this tier into a named `TierHandle`.
    fn into_handle(self, name: impl Into<Arc<str>>) -> TierHandle<K, V>;
}

impl<K, V, T> IntoTierHandle<K, V> for T
where
    T: DiskTier<K, V> + 'static,
{
    fn into_handle(self, name: impl Into<Arc<str>>) -> TierHandle<K, V> {
        TierHandle::new(name, self)
    }
}

/// A clonable, named handle to a disk tier.
///
/// `TierHandle` wraps a trait object in an `Arc` so that one tier instance can be shared
/// by every request that writes to it. Clones refer to the same tier; use
/// [`TierHandle::ptr_eq`] to check whether two handles point at the same instance.
pub struct TierHandle<K, V> {
    name: Arc<str>,
    tier: Arc<DynDiskTier<'static, K, V>>,
}

impl<K, V> TierHandle<K, V> {
    /// Creates a handle from any `DiskTier` implementation.
    pub fn new<T>(name: impl Into<Arc<str>>, tier: T) -> Self
    where
        T: DiskTier<K, V> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            tier: DynDiskTier::new_arc(tier),
        }
    }

    /// Returns the name this tier reports in telemetry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if both handles refer to the same tier instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tier, &other.tier)
    }
}

impl<K, V> Debug for TierHandle<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierHandle").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<K, V> Clone for TierHandle<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            tier: Arc::clone(&self.tier),
        }
    }
}

impl<K, V> DiskTier<K, V> for TierHandle<K, V>
where
    K: Sync,
    V: Send,
{
    async fn put(&self, key: &K, value: V) -> Result<(), Error> {
        self.tier.put(key, value).await
    }
}
