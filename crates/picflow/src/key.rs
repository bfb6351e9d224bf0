// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Cache key derivation.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use crate::request::{CallerContext, ImageRequest};

/// Identifies a cached encoded image.
///
/// The pipeline treats keys as opaque: it derives them through a [`CacheKeyFactory`] and
/// hands them to disk tiers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(Arc<str>);

impl CacheKey {
    /// Creates a key from its string form.
    pub fn new(key: impl Into<Arc<str>>) -> Self {
        Self(key.into())
    }

    /// Returns the string form of the key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives cache keys for requests.
///
/// Derivation must be deterministic: the same request and caller context always produce
/// the same key.
pub trait CacheKeyFactory: Send + Sync {
    /// Returns the key under which the encoded image for `request` is cached.
    fn encoded_cache_key(&self, request: &ImageRequest, caller_context: Option<&CallerContext>) -> CacheKey;
}

impl<F> CacheKeyFactory for F
where
    F: Fn(&ImageRequest, Option<&CallerContext>) -> CacheKey + Send + Sync,
{
    fn encoded_cache_key(&self, request: &ImageRequest, caller_context: Option<&CallerContext>) -> CacheKey {
        self(request, caller_context)
    }
}

/// Keys encoded images by their source URI alone.
///
/// # Examples
///
/// ```
/// use picflow::{CacheKeyFactory, ImageRequest, UriCacheKeyFactory};
///
/// let request = ImageRequest::builder("https://example.com/cat.jpg").build();
/// let key = UriCacheKeyFactory.encoded_cache_key(&request, None);
/// assert_eq!(key.as_str(), "https://example.com/cat.jpg");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct UriCacheKeyFactory;

impl CacheKeyFactory for UriCacheKeyFactory {
    fn encoded_cache_key(&self, request: &ImageRequest, _caller_context: Option<&CallerContext>) -> CacheKey {
        CacheKey::new(request.source_uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_factory_ignores_caller_context() {
        let request = ImageRequest::builder("https://example.com/a.png").build();
        let caller = CallerContext::new("profile");

        let with = UriCacheKeyFactory.encoded_cache_key(&request, Some(&caller));
        let without = UriCacheKeyFactory.encoded_cache_key(&request, None);
        assert_eq!(with, without);
    }

    #[test]
    fn closures_are_factories() {
        let factory = |request: &ImageRequest, caller: Option<&CallerContext>| {
            CacheKey::new(format!("{}#{}", request.source_uri(), caller.map_or("", CallerContext::as_str)))
        };
        let request = ImageRequest::builder("a").build();

        let key = factory.encoded_cache_key(&request, Some(&CallerContext::new("feed")));
        assert_eq!(key.to_string(), "a#feed");
    }
}
