/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

/// An overloadable, 2-argument distance function with a parameterized return type.
///
/// Pure distance functions depend only on the values of the argument and the type of the
/// return value.
pub trait PureDistanceFunction<Left, Right, To = f64> {
    fn evaluate(x: Left, y: Right) -> To;
}

/// An overloadable, 2-argument distance function with a parameterized return type.
///
/// Unlike `PureDistanceFunction`, this takes a functor as the receiver, which lets the
/// metric be chosen at runtime.
pub trait DistanceFunction<Left, Right, To = f64> {
    /// Perform a distance computation between the left-hand and right-hand arguments.
    fn evaluate_similarity(&self, x: Left, y: Right) -> To;
}
