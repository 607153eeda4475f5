/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

pub(crate) mod vs_error;
pub(crate) use vs_error::ensure_positive;
pub use vs_error::{ErrorContext, VSError, VSErrorKind, VSResult};
