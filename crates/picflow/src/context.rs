// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared per-request state handed to every stage.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::listener::{Extras, NoopListener, StageListener};
use crate::request::{CacheChoice, CacheLocations, CallerContext, ImageRequest, RequestLevel};

/// Extras key under which the producing origin is recorded.
pub const ORIGIN_KEY: &str = "origin";

/// Extras key under which the origin detail is recorded.
pub const ORIGIN_SUB_KEY: &str = "origin_sub";

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Where a result came from, as recorded by the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// The pipeline layer, e.g. `"disk"` or `"network"`.
    pub origin: String,
    /// Detail within that layer.
    pub sub_origin: String,
}

/// Per-request context shared by every stage of a pipeline.
///
/// The request configuration is immutable. Stages may annotate the context with
/// diagnostic extras; the annotation sink is internally synchronized, so an `Arc` of the
/// context can be shared freely between the tasks driving a request.
///
/// # Examples
///
/// ```
/// use picflow::{ImageRequest, ProducerContext};
///
/// let request = ImageRequest::builder("https://example.com/cat.jpg").build();
/// let context = ProducerContext::builder(request).id("req-1").build();
///
/// context.put_origin_extra("disk", "hit");
/// assert_eq!(context.origin().unwrap().sub_origin, "hit");
/// ```
pub struct ProducerContext {
    id: Arc<str>,
    request: ImageRequest,
    lowest_permitted_level: RequestLevel,
    caller_context: Option<CallerContext>,
    listener: Arc<dyn StageListener>,
    extras: Mutex<Extras>,
}

impl ProducerContext {
    /// Starts building a context for the given request.
    #[must_use]
    pub fn builder(request: ImageRequest) -> ProducerContextBuilder {
        ProducerContextBuilder {
            id: None,
            lowest_permitted_level: request.lowest_permitted_level(),
            request,
            caller_context: None,
            listener: Arc::new(NoopListener),
        }
    }

    /// Returns the request identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the request being served.
    #[must_use]
    pub fn image_request(&self) -> &ImageRequest {
        &self.request
    }

    /// Returns the lowest pipeline level this request may reach.
    #[must_use]
    pub fn lowest_permitted_level(&self) -> RequestLevel {
        self.lowest_permitted_level
    }

    /// Returns `true` if the request enables the given cache location.
    #[must_use]
    pub fn is_cache_enabled(&self, location: CacheLocations) -> bool {
        self.request.is_cache_enabled(location)
    }

    /// Returns the disk tier family for the request.
    #[must_use]
    pub fn cache_choice(&self) -> &CacheChoice {
        self.request.cache_choice()
    }

    /// Returns the opaque caller context, if one was supplied.
    #[must_use]
    pub fn caller_context(&self) -> Option<&CallerContext> {
        self.caller_context.as_ref()
    }

    /// Returns the listener stages report to.
    #[must_use]
    pub fn listener(&self) -> &dyn StageListener {
        &*self.listener
    }

    /// Records where the result for this request came from.
    pub fn put_origin_extra(&self, origin: impl Into<String>, sub_origin: impl Into<String>) {
        let mut extras = self.extras.lock();
        extras.insert(ORIGIN_KEY, origin.into());
        extras.insert(ORIGIN_SUB_KEY, sub_origin.into());
    }

    /// Returns the recorded origin, if any stage set one.
    #[must_use]
    pub fn origin(&self) -> Option<Origin> {
        let extras = self.extras.lock();
        Some(Origin {
            origin: extras.get(ORIGIN_KEY)?.clone(),
            sub_origin: extras.get(ORIGIN_SUB_KEY)?.clone(),
        })
    }

    /// Records a diagnostic value.
    pub fn put_extra(&self, key: &'static str, value: impl Into<String>) {
        self.extras.lock().insert(key, value.into());
    }

    /// Returns a recorded diagnostic value.
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<String> {
        self.extras.lock().get(key).cloned()
    }

    /// Returns a snapshot of every recorded diagnostic value.
    #[must_use]
    pub fn extras(&self) -> Extras {
        self.extras.lock().clone()
    }
}

impl Debug for ProducerContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerContext")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("lowest_permitted_level", &self.lowest_permitted_level)
            .field("caller_context", &self.caller_context)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ProducerContext`].
pub struct ProducerContextBuilder {
    id: Option<Arc<str>>,
    request: ImageRequest,
    lowest_permitted_level: RequestLevel,
    caller_context: Option<CallerContext>,
    listener: Arc<dyn StageListener>,
}

impl ProducerContextBuilder {
    /// Sets the request identifier. A unique one is generated otherwise.
    #[must_use]
    pub fn id(mut self, id: impl Into<Arc<str>>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Overrides the lowest permitted level taken from the request.
    #[must_use]
    pub fn lowest_permitted_level(mut self, level: RequestLevel) -> Self {
        self.lowest_permitted_level = level;
        self
    }

    /// Sets the opaque caller context.
    #[must_use]
    pub fn caller_context(mut self, caller_context: CallerContext) -> Self {
        self.caller_context = Some(caller_context);
        self
    }

    /// Sets the listener stages report to.
    #[must_use]
    pub fn listener(mut self, listener: Arc<dyn StageListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Builds the shared context.
    #[must_use]
    pub fn build(self) -> Arc<ProducerContext> {
        let id = self
            .id
            .unwrap_or_else(|| format!("request-{}", NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)).into());

        Arc::new(ProducerContext {
            id,
            request: self.request,
            lowest_permitted_level: self.lowest_permitted_level,
            caller_context: self.caller_context,
            listener: self.listener,
            extras: Mutex::new(Extras::new()),
        })
    }
}

impl Debug for ProducerContextBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerContextBuilder")
            .field("id", &self.id)
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
