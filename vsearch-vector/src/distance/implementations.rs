/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use num_traits::AsPrimitive;
use thiserror::Error;

use crate::PureDistanceFunction;

/// Element types the distance kernels accept.
///
/// Every element is widened to `f64` before any arithmetic, so integer inputs never wrap
/// and `f32` inputs do not lose precision in the accumulator.
pub trait Element: AsPrimitive<f64> + Copy + Send + Sync + 'static {}

impl<T> Element for T where T: AsPrimitive<f64> + Copy + Send + Sync + 'static {}

/// The arguments of a distance computation have different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot compare vectors of dimension {left} and {right}")]
pub struct DimensionMismatch {
    pub left: usize,
    pub right: usize,
}

// Outline the panic formatting to keep the hot loop small.
#[inline(never)]
#[allow(clippy::panic)]
fn fail_length_check(left: usize, right: usize) -> ! {
    panic!("{}", DimensionMismatch { left, right });
}

#[inline(always)]
fn check_lengths<T>(x: &[T], y: &[T]) {
    if x.len() != y.len() {
        fail_length_check(x.len(), y.len());
    }
}

/// Sum `f` over the pairs of `x` and `y` using four independent accumulators.
///
/// The reduction order only depends on the length, so repeated evaluations of the same
/// arguments are bitwise identical.
#[inline(always)]
fn accumulate<T, F>(x: &[T], y: &[T], f: F) -> f64
where
    T: Element,
    F: Fn(f64, f64) -> f64,
{
    let mut acc = [0.0f64; 4];
    let mut xs = x.chunks_exact(4);
    let mut ys = y.chunks_exact(4);
    for (a, b) in (&mut xs).zip(&mut ys) {
        for i in 0..4 {
            acc[i] += f(a[i].as_(), b[i].as_());
        }
    }
    let tail: f64 = std::iter::zip(xs.remainder(), ys.remainder())
        .map(|(a, b)| f(a.as_(), b.as_()))
        .sum();
    (acc[0] + acc[1]) + (acc[2] + acc[3]) + tail
}

/// Compute the squared euclidean distance between two vectors.
///
/// # Panics
///
/// Panics if the arguments have different lengths. See [`squared_l2`] for a checked
/// version.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredL2 {}

impl<T: Element> PureDistanceFunction<&[T], &[T], f64> for SquaredL2 {
    #[inline]
    fn evaluate(x: &[T], y: &[T]) -> f64 {
        check_lengths(x, y);
        accumulate(x, y, |a, b| {
            let d = a - b;
            d * d
        })
    }
}

/// Compute the negated inner product between two vectors, so that larger similarities
/// give smaller distances.
///
/// # Panics
///
/// Panics if the arguments have different lengths.
#[derive(Debug, Clone, Copy, Default)]
pub struct InnerProduct {}

impl<T: Element> PureDistanceFunction<&[T], &[T], f64> for InnerProduct {
    #[inline]
    fn evaluate(x: &[T], y: &[T]) -> f64 {
        check_lengths(x, y);
        -accumulate(x, y, |a, b| a * b)
    }
}

/// Squared euclidean distance, reporting mismatched dimensions as an error.
pub fn squared_l2<T: Element>(x: &[T], y: &[T]) -> Result<f64, DimensionMismatch> {
    if x.len() != y.len() {
        return Err(DimensionMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    Ok(SquaredL2::evaluate(x, y))
}
