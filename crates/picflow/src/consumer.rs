// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The receiving side of a stage.

use crate::{ProducerError, Status};

/// Receives the results of a producer for one request.
///
/// A producer delivers zero or more intermediate results followed by exactly one terminal
/// outcome: a result whose status [`is_last`](Status::is_last), a failure, or a
/// cancellation. Deliveries for one request never overlap, so implementations take
/// `&mut self` and need no internal locking.
///
/// A consumer may wrap another consumer to intercept deliveries on their way downstream.
pub trait Consumer<T>: Send {
    /// Receives a result. `None` is a valid terminal result meaning "no image".
    fn on_new_result(&mut self, result: Option<T>, status: Status);

    /// Receives the terminal failure of the request.
    fn on_failure(&mut self, error: ProducerError);

    /// Receives the terminal cancellation of the request.
    fn on_cancellation(&mut self);

    /// Receives a progress update in the range `0.0..=1.0`.
    fn on_progress_update(&mut self, progress: f32) {
        let _ = progress;
    }
}

/// A boxed consumer, the form in which consumers are handed between stages.
pub type BoxConsumer<T> = Box<dyn Consumer<T>>;

impl<T, C> Consumer<T> for Box<C>
where
    C: Consumer<T> + ?Sized,
{
    fn on_new_result(&mut self, result: Option<T>, status: Status) {
        (**self).on_new_result(result, status);
    }

    fn on_failure(&mut self, error: ProducerError) {
        (**self).on_failure(error);
    }

    fn on_cancellation(&mut self) {
        (**self).on_cancellation();
    }

    fn on_progress_update(&mut self, progress: f32) {
        (**self).on_progress_update(progress);
    }
}
