// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Choosing the disk tier a request writes to.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::hash::BuildHasher;
use std::sync::Arc;

use picflow_tier::TierHandle;

use crate::request::CacheChoice;

/// Picks the tier for a cache choice.
///
/// - `Dynamic(id)` resolves only through `dynamic`; an unknown id resolves to `None`
///   rather than falling back, so misconfiguration stays visible.
/// - `Small` resolves to `small`.
/// - `Default` resolves to `default`.
///
/// The function is pure: identical inputs always select the same tier.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use picflow::{CacheChoice, select_tier};
///
/// let dynamic = HashMap::from([("avatars".into(), "avatars-tier")]);
///
/// let chosen = select_tier(&CacheChoice::dynamic("avatars"), Some(&"small"), Some(&"default"), &dynamic);
/// assert_eq!(chosen, Some(&"avatars-tier"));
///
/// let chosen = select_tier(&CacheChoice::dynamic("missing"), Some(&"small"), Some(&"default"), &dynamic);
/// assert_eq!(chosen, None);
/// ```
#[must_use]
pub fn select_tier<'a, T, S: BuildHasher>(
    choice: &CacheChoice,
    small: Option<&'a T>,
    default: Option<&'a T>,
    dynamic: &'a HashMap<Arc<str>, T, S>,
) -> Option<&'a T> {
    match choice {
        CacheChoice::Dynamic(id) => dynamic.get(id),
        CacheChoice::Small => small,
        CacheChoice::Default => default,
    }
}

/// The set of disk tiers available to a write stage.
///
/// The dynamic map is always present; "no dynamic tiers" is simply an empty map.
pub struct DiskTiers<K, V> {
    small: Option<TierHandle<K, V>>,
    default: Option<TierHandle<K, V>>,
    dynamic: HashMap<Arc<str>, TierHandle<K, V>>,
}

impl<K, V> DiskTiers<K, V> {
    /// Creates an empty set of tiers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            small: None,
            default: None,
            dynamic: HashMap::new(),
        }
    }

    /// Sets the tier for [`CacheChoice::Small`].
    #[must_use]
    pub fn with_small(mut self, tier: TierHandle<K, V>) -> Self {
        self.small = Some(tier);
        self
    }

    /// Sets the tier for [`CacheChoice::Default`].
    #[must_use]
    pub fn with_default(mut self, tier: TierHandle<K, V>) -> Self {
        self.default = Some(tier);
        self
    }

    /// Registers a tier under a dynamic identifier, replacing any previous one.
    #[must_use]
    pub fn with_dynamic(mut self, id: impl Into<Arc<str>>, tier: TierHandle<K, V>) -> Self {
        self.dynamic.insert(id.into(), tier);
        self
    }

    /// Returns the tier configured for `choice`, if any.
    #[must_use]
    pub fn select(&self, choice: &CacheChoice) -> Option<&TierHandle<K, V>> {
        select_tier(choice, self.small.as_ref(), self.default.as_ref(), &self.dynamic)
    }

    /// Returns the number of dynamic tiers.
    #[must_use]
    pub fn dynamic_len(&self) -> usize {
        self.dynamic.len()
    }
}

impl<K, V> Default for DiskTiers<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for DiskTiers<K, V> {
    fn clone(&self) -> Self {
        Self {
            small: self.small.clone(),
            default: self.default.clone(),
            dynamic: self.dynamic.clone(),
        }
    }
}

impl<K, V> Debug for DiskTiers<K, V> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskTiers")
            .field("small", &self.small)
            .field("default", &self.default)
            .field("dynamic", &self.dynamic.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use picflow_tier::IntoTierHandle;
    use picflow_tier::testing::MockTier;

    use super::*;

    fn dynamic() -> HashMap<Arc<str>, u32> {
        HashMap::from([(Arc::from("a"), 10), (Arc::from("b"), 20)])
    }

    #[test]
    fn dynamic_id_wins_when_registered() {
        let map = dynamic();
        assert_eq!(select_tier(&CacheChoice::dynamic("b"), Some(&1), Some(&2), &map), Some(&20));
    }

    #[test]
    fn unknown_dynamic_id_does_not_fall_back() {
        let map = dynamic();
        assert_eq!(select_tier(&CacheChoice::dynamic("zzz"), Some(&1), Some(&2), &map), None);
        assert_eq!(select_tier(&CacheChoice::dynamic("a"), Some(&1), Some(&2), &HashMap::new()), None);
    }

    #[test]
    fn fixed_roles_select_their_tier() {
        let map = dynamic();
        assert_eq!(select_tier(&CacheChoice::Small, Some(&1), Some(&2), &map), Some(&1));
        assert_eq!(select_tier(&CacheChoice::Default, Some(&1), Some(&2), &map), Some(&2));
    }

    #[test]
    fn unconfigured_roles_select_nothing() {
        let map: HashMap<Arc<str>, u32> = HashMap::new();
        assert_eq!(select_tier(&CacheChoice::Small, None, Some(&2), &map), None);
        assert_eq!(select_tier(&CacheChoice::Default, Some(&1), None, &map), None);
    }

    #[test]
    fn dynamic_map_with_custom_hasher() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::BuildHasherDefault;

        let mut map: HashMap<Arc<str>, u32, BuildHasherDefault<DefaultHasher>> = HashMap::default();
        map.insert(Arc::from("stickers"), 7);

        assert_eq!(select_tier(&CacheChoice::dynamic("stickers"), Some(&1), Some(&2), &map), Some(&7));
        assert_eq!(select_tier(&CacheChoice::dynamic("other"), Some(&1), Some(&2), &map), None);
    }

    #[test]
    fn selection_is_deterministic() {
        let tiers = DiskTiers::<String, u32>::new()
            .with_small(MockTier::new().into_handle("small"))
            .with_default(MockTier::new().into_handle("default"))
            .with_dynamic("x", MockTier::new().into_handle("x"));

        for choice in [CacheChoice::Small, CacheChoice::Default, CacheChoice::dynamic("x")] {
            let first = tiers.select(&choice).expect("tier configured");
            for _ in 0..8 {
                assert!(first.ptr_eq(tiers.select(&choice).expect("tier configured")));
            }
        }
    }

    #[test]
    fn empty_tiers_debug_lists_nothing() {
        let tiers = DiskTiers::<String, u32>::default();
        assert_eq!(tiers.dynamic_len(), 0);
        assert!(tiers.select(&CacheChoice::Default).is_none());
        assert!(format!("{tiers:?}").contains("DiskTiers"));
    }
}
