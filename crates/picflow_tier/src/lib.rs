// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Disk cache tier abstractions for the picflow image pipeline.
//!
//! This crate defines the [`DiskTier`] trait that disk cache storage engines implement,
//! the clonable, type-erased [`TierHandle`] that pipeline stages hold on to, and the
//! [`Error`] type for failed writes.
//!
//! # Overview
//!
//! A disk tier is a long-lived, shared resource. Many requests write to it concurrently,
//! and the tier owns its own concurrency discipline. The pipeline never waits for a write
//! to complete before delivering a result, so `put` may take as long as it needs.
//!
//! # Implementing a Disk Tier
//!
//! ```
//! use picflow_tier::{DiskTier, Error};
//! use std::collections::HashMap;
//! use std::sync::RwLock;
//!
//! struct SimpleTier<K, V>(RwLock<HashMap<K, V>>);
//!
//! impl<K, V> DiskTier<K, V> for SimpleTier<K, V>
//! where
//!     K: Clone + Eq + std::hash::Hash + Send + Sync,
//!     V: Send + Sync,
//! {
//!     async fn put(&self, key: &K, value: V) -> Result<(), Error> {
//!         self.0
//!             .write()
//!             .map_err(|e| Error::from_message(e.to_string()))?
//!             .insert(key.clone(), value);
//!         Ok(())
//!     }
//! }
//! ```
//!
//! # Sharing Tiers
//!
//! Convert any tier into a [`TierHandle`] with [`IntoTierHandle::into_handle`]. Handles are
//! cheap to clone and carry a name used in telemetry.

pub mod error;
mod handle;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
pub(crate) mod tier;

#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use handle::{IntoTierHandle, TierHandle};
#[doc(inline)]
pub use tier::DiskTier;
