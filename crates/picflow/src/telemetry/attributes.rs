// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
pub(crate) const STAGE_NAME: &str = "stage.name";

#[cfg(any(feature = "metrics", test))]
pub(crate) const STAGE_ACTIVITY_NAME: &str = "stage.activity";

#[cfg(test)]
pub(crate) const REQUEST_ID_NAME: &str = "request.id";

#[cfg(test)]
pub(crate) const STAGE_DETAIL_NAME: &str = "stage.detail";

#[cfg(test)]
pub(crate) const STAGE_EVENT_NAME: &str = "stage.event";
