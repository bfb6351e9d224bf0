// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock disk tier implementation for testing.
//!
//! This module provides `MockTier`, an in-memory tier that records every write and
//! supports failure injection for testing error paths.

use std::{collections::HashMap, hash::Hash, sync::Arc};

use parking_lot::Mutex;

use crate::{DiskTier, Error};

/// Recorded tier operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOp<K, V> {
    /// A put operation was performed with the given key and value.
    Put {
        /// The key that was written.
        key: K,
        /// The value that was written.
        value: V,
    },
}

type FailPredicate<K, V> = Box<dyn Fn(&TierOp<K, V>) -> bool + Send + Sync>;

/// A configurable mock disk tier for testing.
///
/// Values are stored in memory and every operation is recorded, including the ones that
/// were made to fail. Clones share state, so a test can keep one clone for assertions and
/// hand the other to the code under test.
///
/// # Examples
///
/// ```
/// use picflow_tier::{DiskTier, testing::{MockTier, TierOp}};
///
/// # futures::executor::block_on(async {
/// let tier = MockTier::<String, i32>::new();
/// tier.put(&"key".to_string(), 42).await.unwrap();
///
/// assert_eq!(tier.get(&"key".to_string()), Some(42));
/// assert_eq!(tier.operations(), vec![TierOp::Put { key: "key".to_string(), value: 42 }]);
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use picflow_tier::{DiskTier, testing::{MockTier, TierOp}};
///
/// # futures::executor::block_on(async {
/// let tier: MockTier<String, i32> = MockTier::new();
/// tier.fail_when(|op| matches!(op, TierOp::Put { key, .. } if key == "forbidden"));
///
/// assert!(tier.put(&"forbidden".to_string(), 1).await.is_err());
/// assert!(tier.put(&"allowed".to_string(), 2).await.is_ok());
/// # });
/// ```
pub struct MockTier<K, V> {
    data: Arc<Mutex<HashMap<K, V>>>,
    operations: Arc<Mutex<Vec<TierOp<K, V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<K, V>>>>,
}

impl<K, V> std::fmt::Debug for MockTier<K, V>
where
    K: std::fmt::Debug,
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTier")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<K, V> Clone for MockTier<K, V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<K, V> Default for MockTier<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MockTier<K, V> {
    /// Creates a new empty mock tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the number of stored entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns the number of put operations attempted, failed ones included.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.operations.lock().len()
    }
}

impl<K, V> MockTier<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Returns a copy of the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<V> {
        self.data.lock().get(key).cloned()
    }

    /// Returns true if the tier holds a value for the given key.
    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        self.data.lock().contains_key(key)
    }
}

impl<K, V> MockTier<K, V>
where
    K: Clone,
    V: Clone,
{
    /// Sets a predicate that determines when operations should fail.
    ///
    /// Failed operations are still recorded but leave the stored data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&TierOp<K, V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<TierOp<K, V>> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn record(&self, op: TierOp<K, V>) {
        self.operations.lock().push(op);
    }

    fn should_fail(&self, op: &TierOp<K, V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<K, V> DiskTier<K, V> for MockTier<K, V>
where
    K: Clone + Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    async fn put(&self, key: &K, value: V) -> Result<(), Error> {
        let op = TierOp::Put {
            key: key.clone(),
            value: value.clone(),
        };
        if self.should_fail(&op) {
            self.record(op);
            return Err(Error::caused_by("mock: put failed"));
        }
        self.record(op);
        self.data.lock().insert(key.clone(), value);
        Ok(())
    }
}
