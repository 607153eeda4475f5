/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use super::{Element, InnerProduct, SquaredL2};
use crate::{DistanceFunction, PureDistanceFunction, distance::Metric};

/// A function pointer-like type for computing distances between `&[T]` and `&[T]`.
///
/// # Metric Semantics
///
/// Values closer to `-infinity` imply more similar.
///
/// * `L2`: Computes the squared L2 distance between vectors.
/// * `InnerProduct`: Returns the **negative** inner-product.
#[derive(Debug, Clone, Copy)]
pub struct Distance<T: 'static> {
    metric: Metric,
    f: fn(&[T], &[T]) -> f64,
}

impl<T: Element> Distance<T> {
    /// Return the kernel for `metric`.
    pub fn new(metric: Metric) -> Self {
        let f: fn(&[T], &[T]) -> f64 = match metric {
            Metric::L2 => |x, y| SquaredL2::evaluate(x, y),
            Metric::InnerProduct => |x, y| InnerProduct::evaluate(x, y),
        };
        Self { metric, f }
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// Compute the distance between `x` and `y`.
    ///
    /// # Panics
    ///
    /// Panics if `x` and `y` have different lengths.
    #[inline]
    pub fn call(&self, x: &[T], y: &[T]) -> f64 {
        (self.f)(x, y)
    }
}

impl<T: Element> DistanceFunction<&[T], &[T], f64> for Distance<T> {
    #[inline]
    fn evaluate_similarity(&self, x: &[T], y: &[T]) -> f64 {
        self.call(x, y)
    }
}
