// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The producing side of a stage.

use std::sync::Arc;

use crate::{BoxConsumer, ProducerContext};

/// A pipeline stage that produces results for a request.
///
/// `produce_results` returns as soon as the work is started. The producer then owns the
/// consumer and must eventually deliver exactly one terminal outcome to it, from whichever
/// task does the work.
///
/// Stages compose by wrapping: a stage holds its upstream producer and hands it either the
/// downstream consumer or a consumer of its own that wraps it.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use picflow::{BoxConsumer, EncodedImage, Producer, ProducerContext, Status};
///
/// /// Always answers with "no image".
/// struct EmptyProducer;
///
/// impl Producer<EncodedImage> for EmptyProducer {
///     fn produce_results(&self, mut consumer: BoxConsumer<EncodedImage>, _context: Arc<ProducerContext>) {
///         consumer.on_new_result(None, Status::IS_LAST);
///     }
/// }
/// ```
pub trait Producer<T>: Send + Sync {
    /// Starts producing results for the request described by `context`.
    fn produce_results(&self, consumer: BoxConsumer<T>, context: Arc<ProducerContext>);
}

impl<P, T> Producer<T> for Box<P>
where
    P: Producer<T> + ?Sized,
{
    fn produce_results(&self, consumer: BoxConsumer<T>, context: Arc<ProducerContext>) {
        (**self).produce_results(consumer, context);
    }
}

impl<P, T> Producer<T> for Arc<P>
where
    P: Producer<T> + ?Sized,
{
    fn produce_results(&self, consumer: BoxConsumer<T>, context: Arc<ProducerContext>) {
        (**self).produce_results(consumer, context);
    }
}
