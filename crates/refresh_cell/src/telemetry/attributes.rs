// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
pub(crate) const CELL_NAME: &str = "cell.name";

#[cfg(test)]
pub(crate) const CELL_EVENT_NAME: &str = "cell.event";

#[cfg(any(feature = "metrics", test))]
pub(crate) const CELL_OPERATION_NAME: &str = "cell.operation";

#[cfg(any(feature = "metrics", test))]
pub(crate) const CELL_ACTIVITY_NAME: &str = "cell.activity";

#[cfg(test)]
pub(crate) const CELL_AGE_NAME: &str = "cell.age_ns";
