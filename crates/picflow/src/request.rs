// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-request configuration.

use std::fmt::{self, Display, Formatter};
use std::ops::BitOr;
use std::sync::Arc;

/// How far into the pipeline a request is allowed to go.
///
/// Levels are ordered from the most expensive (a full network fetch) to the cheapest
/// (the decoded bitmap memory cache). A request whose lowest permitted level is at or
/// above a stage's level must be answered without running that stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestLevel {
    /// Fetch from the network if nothing is cached.
    #[default]
    FullFetch = 1,
    /// Go no further than the disk cache.
    DiskCache = 2,
    /// Go no further than the encoded memory cache.
    EncodedMemoryCache = 3,
    /// Only serve from the decoded bitmap memory cache.
    BitmapMemoryCache = 4,
}

impl RequestLevel {
    /// Returns the numeric value of the level.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }
}

/// The level at which the disk cache sits in the pipeline.
pub const DISK_CACHE_LEVEL: RequestLevel = RequestLevel::DiskCache;

/// A set of cache locations a request may read from or write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheLocations(u8);

impl CacheLocations {
    /// Decoded bitmap memory cache reads.
    pub const BITMAP_READ: Self = Self(1);
    /// Decoded bitmap memory cache writes.
    pub const BITMAP_WRITE: Self = Self(1 << 1);
    /// Encoded memory cache reads.
    pub const ENCODED_READ: Self = Self(1 << 2);
    /// Encoded memory cache writes.
    pub const ENCODED_WRITE: Self = Self(1 << 3);
    /// Disk cache reads.
    pub const DISK_READ: Self = Self(1 << 4);
    /// Disk cache writes.
    pub const DISK_WRITE: Self = Self(1 << 5);
    /// No cache location.
    pub const NONE: Self = Self(0);
    /// Every cache location.
    pub const ALL: Self = Self(0b11_1111);

    /// Returns `true` if every location in `other` is enabled.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns a copy with `other` removed.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl Default for CacheLocations {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for CacheLocations {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Which disk tier family stores a request's data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CacheChoice {
    /// The tier dedicated to small images such as thumbnails.
    Small,
    /// The default tier.
    #[default]
    Default,
    /// A tier registered under a dynamic identifier.
    Dynamic(Arc<str>),
}

impl CacheChoice {
    /// Creates a choice naming a dynamic tier.
    pub fn dynamic(id: impl Into<Arc<str>>) -> Self {
        Self::Dynamic(id.into())
    }

    /// Returns the position of the variant, used in diagnostics.
    #[must_use]
    pub const fn ordinal(&self) -> u8 {
        match self {
            Self::Small => 0,
            Self::Default => 1,
            Self::Dynamic(_) => 2,
        }
    }

    /// Returns the dynamic tier identifier, if any.
    #[must_use]
    pub fn dynamic_id(&self) -> Option<&str> {
        match self {
            Self::Dynamic(id) => Some(id),
            Self::Small | Self::Default => None,
        }
    }
}

impl Display for CacheChoice {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => f.write_str("small"),
            Self::Default => f.write_str("default"),
            Self::Dynamic(id) => write!(f, "dynamic({id})"),
        }
    }
}

/// Opaque information about who issued a request.
///
/// The pipeline passes it through to key derivation and telemetry without looking at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerContext(Arc<str>);

impl CallerContext {
    /// Creates a caller context from a label.
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self(label.into())
    }

    /// Returns the label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CallerContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable description of the image a caller asked for.
///
/// # Examples
///
/// ```
/// use picflow::{CacheChoice, CacheLocations, ImageRequest, RequestLevel};
///
/// let request = ImageRequest::builder("https://example.com/cat.jpg")
///     .cache_choice(CacheChoice::Small)
///     .lowest_permitted_level(RequestLevel::DiskCache)
///     .disable_caches(CacheLocations::DISK_WRITE)
///     .build();
///
/// assert!(!request.is_cache_enabled(CacheLocations::DISK_WRITE));
/// assert!(request.is_cache_enabled(CacheLocations::DISK_READ));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    source_uri: Arc<str>,
    cache_choice: CacheChoice,
    lowest_permitted_level: RequestLevel,
    cache_locations: CacheLocations,
}

impl ImageRequest {
    /// Starts building a request for the given source URI.
    pub fn builder(source_uri: impl Into<Arc<str>>) -> ImageRequestBuilder {
        ImageRequestBuilder {
            request: Self {
                source_uri: source_uri.into(),
                cache_choice: CacheChoice::default(),
                lowest_permitted_level: RequestLevel::default(),
                cache_locations: CacheLocations::default(),
            },
        }
    }

    /// Returns the URI the image is loaded from.
    #[must_use]
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    /// Returns the disk tier family for this request.
    #[must_use]
    pub fn cache_choice(&self) -> &CacheChoice {
        &self.cache_choice
    }

    /// Returns the lowest level of the pipeline this request may reach.
    #[must_use]
    pub fn lowest_permitted_level(&self) -> RequestLevel {
        self.lowest_permitted_level
    }

    /// Returns `true` if every location in `location` is enabled for this request.
    #[must_use]
    pub fn is_cache_enabled(&self, location: CacheLocations) -> bool {
        self.cache_locations.contains(location)
    }
}

/// Builder for [`ImageRequest`].
#[derive(Debug, Clone)]
pub struct ImageRequestBuilder {
    request: ImageRequest,
}

impl ImageRequestBuilder {
    /// Sets the disk tier family.
    #[must_use]
    pub fn cache_choice(mut self, choice: CacheChoice) -> Self {
        self.request.cache_choice = choice;
        self
    }

    /// Sets the lowest pipeline level the request may reach.
    #[must_use]
    pub fn lowest_permitted_level(mut self, level: RequestLevel) -> Self {
        self.request.lowest_permitted_level = level;
        self
    }

    /// Replaces the set of enabled cache locations.
    #[must_use]
    pub fn cache_locations(mut self, locations: CacheLocations) -> Self {
        self.request.cache_locations = locations;
        self
    }

    /// Disables the given cache locations.
    #[must_use]
    pub fn disable_caches(mut self, locations: CacheLocations) -> Self {
        self.request.cache_locations = self.request.cache_locations.without(locations);
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> ImageRequest {
        self.request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_value() {
        assert!(RequestLevel::FullFetch < DISK_CACHE_LEVEL);
        assert!(RequestLevel::EncodedMemoryCache > DISK_CACHE_LEVEL);
        assert_eq!(RequestLevel::BitmapMemoryCache.value(), 4);
    }

    #[test]
    fn default_request_enables_every_cache() {
        let request = ImageRequest::builder("file:///tmp/a.png").build();
        assert!(request.is_cache_enabled(CacheLocations::ALL));
        assert_eq!(request.cache_choice(), &CacheChoice::Default);
        assert_eq!(request.lowest_permitted_level(), RequestLevel::FullFetch);
    }

    #[test]
    fn cache_locations_compose() {
        let locations = CacheLocations::DISK_READ | CacheLocations::DISK_WRITE;
        assert!(locations.contains(CacheLocations::DISK_WRITE));
        assert!(!locations.contains(CacheLocations::BITMAP_READ));
        assert!(!locations.without(CacheLocations::DISK_WRITE).contains(CacheLocations::DISK_WRITE));
    }

    #[test]
    fn cache_choice_diagnostics() {
        let choice = CacheChoice::dynamic("avatars");
        assert_eq!(choice.ordinal(), 2);
        assert_eq!(choice.to_string(), "dynamic(avatars)");
        assert_eq!(choice.dynamic_id(), Some("avatars"));
        assert_eq!(CacheChoice::Small.ordinal(), 0);
        assert_eq!(CacheChoice::Default.dynamic_id(), None);
    }
}
