/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

pub mod implementations;
pub use implementations::{DimensionMismatch, Element, InnerProduct, SquaredL2, squared_l2};

pub mod distance_provider;
pub use distance_provider::Distance;

mod metric;
pub use metric::{Metric, ParseMetricError};
