/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{
    fmt::{Debug, Display},
    io,
};

use vsearch_utils::{UnsupportedDtype, io as bin, vector, views};
use vsearch_vector::distance::DimensionMismatch;

/// Convenience alias for a `Result<T, VSError>`.
pub type VSResult<T> = Result<T, VSError>;

/// Common error type shared through vsearch.
///
/// The `kind()` tag tells callers which class of failure occurred (bad shapes, bad
/// arguments, corrupt input, ...), while the wrapped source error keeps the details and
/// can be recovered with the downcasting API.
/// ```rust
/// use vsearch::{VSError, VSErrorKind, error::ErrorContext};
/// use thiserror::Error;
///
/// #[derive(Debug, Error)]
/// #[error("custom error: {0}")]
/// struct CustomError(usize);
///
/// fn errors() -> Result<(), VSError> {
///     Err(VSError::new(VSErrorKind::InvalidArgument, CustomError(42)))
/// }
///
/// fn propagates_with_context() -> Result<(), VSError> {
///     errors().context("propagated")
/// }
///
/// let err = propagates_with_context().unwrap_err();
///
/// let message = err.to_string();
/// assert!(message.contains("custom error: 42"));
/// assert!(message.contains("propagated"));
/// assert_eq!(err.kind(), VSErrorKind::InvalidArgument);
///
/// let downcasted = err.downcast_ref::<CustomError>().unwrap();
/// assert_eq!(downcasted.0, 42);
/// ```
///
/// # Backtraces
///
/// Backtraces will be obtained upon the first construction of a `VSError` if the
/// environment variable `RUST_BACKTRACE=1` is set.
///
/// # Properties
///
/// `std::mem::size_of::<VSError>() == 16`, so the error is returned in registers.
#[derive(Debug)]
pub struct VSError {
    kind: VSErrorKind,
    error: anyhow::Error,
}

impl VSError {
    /// Construct a new `VSError` encapsulating `err`.
    ///
    /// # Attributes
    ///
    /// - `track_caller`: `err` is embedded inside a `Located` struct recording the file
    ///   and line of creation.
    ///
    /// - `inline(never)`: keeps error construction out of the happy path.
    #[track_caller]
    #[inline(never)]
    pub fn new<E>(kind: VSErrorKind, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            error: anyhow::Error::new(Located::new(err)),
        }
    }

    /// Construct a new `VSError` encapsulating `err` tagged with `VSErrorKind::Opaque`.
    #[track_caller]
    #[inline(never)]
    pub fn opaque<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::new(VSErrorKind::Opaque, err)
    }

    /// Construct a new `VSError` with the provided error message.
    ///
    /// Errors constructed this way cannot be recovered with the downcasting API.
    #[track_caller]
    #[inline(never)]
    pub fn message<D>(kind: VSErrorKind, display: D) -> Self
    where
        D: Display + Debug + Send + Sync + 'static,
    {
        Self {
            kind,
            error: anyhow::Error::msg(Located::new(display)),
        }
    }

    #[track_caller]
    #[inline(never)]
    pub fn invalid_argument<D: Display>(err: D) -> Self {
        Self::message(VSErrorKind::InvalidArgument, err.to_string())
    }

    #[track_caller]
    #[inline(never)]
    pub fn dimension_mismatch<D: Display>(err: D) -> Self {
        Self::message(VSErrorKind::DimensionMismatch, err.to_string())
    }

    #[track_caller]
    #[inline(never)]
    pub fn io_corruption<D: Display>(err: D) -> Self {
        Self::message(VSErrorKind::IOCorruption, err.to_string())
    }

    #[track_caller]
    #[inline(never)]
    pub fn thread_pool_error<D: Display>(err: D) -> Self {
        Self::message(VSErrorKind::ThreadPoolError, err.to_string())
    }

    /// Attempt to downcast the error object to a concrete type.
    pub fn downcast<E>(self) -> Result<E, Self>
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        match self.error.downcast::<E>() {
            Ok(value) => Ok(value),
            Err(error) => match error.downcast::<Located<E>>() {
                Ok(value) => Ok(value.err),
                Err(error) => Err(Self {
                    kind: self.kind,
                    error,
                }),
            },
        }
    }

    /// Attempt to downcast the error object by reference.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: Display + Debug + Send + Sync + 'static,
    {
        match self.error.downcast_ref::<E>() {
            Some(err) => Some(err),
            None => self.error.downcast_ref::<Located<E>>().map(|e| &e.err),
        }
    }

    /// Attach the context to `Self` and return a new error.
    #[track_caller]
    #[inline(never)]
    pub fn context<C>(self, context: C) -> Self
    where
        C: Display + Debug + Send + Sync + 'static,
    {
        Self {
            kind: self.kind,
            error: self.error.context(Located::new(context)),
        }
    }

    /// Return the kind of the originally constructed error.
    pub fn kind(&self) -> VSErrorKind {
        self.kind
    }
}

impl Display for VSError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        // The debug format of `anyhow::Error` includes the source chain.
        write!(formatter, "VSError: {:?}\n\n{:?}", self.kind, self.error)
    }
}

impl std::error::Error for VSError {
    // Don't implement `source` because we print the whole source chain in our `Display`
    // implementation.
}

impl From<std::convert::Infallible> for VSError {
    #[track_caller]
    fn from(_: std::convert::Infallible) -> Self {
        unreachable!("Infallible is an unconstructible type");
    }
}

impl From<io::Error> for VSError {
    #[track_caller]
    fn from(err: io::Error) -> Self {
        Self::new(VSErrorKind::IOError, err)
    }
}

impl From<bin::ReadBinError> for VSError {
    #[track_caller]
    fn from(err: bin::ReadBinError) -> Self {
        let kind = match &err {
            bin::ReadBinError::SizeMismatch { .. }
            | bin::ReadBinError::TruncatedHeader { .. }
            | bin::ReadBinError::Overflow { .. } => VSErrorKind::IOCorruption,
            bin::ReadBinError::Io(_) => VSErrorKind::IOError,
        };
        Self::new(kind, err)
    }
}

impl From<bin::SaveBinError> for VSError {
    #[track_caller]
    fn from(err: bin::SaveBinError) -> Self {
        let kind = match &err {
            bin::SaveBinError::DimensionOverflow { .. } => VSErrorKind::InvalidArgument,
            bin::SaveBinError::ShapeMismatch { .. } => VSErrorKind::DimensionMismatch,
            bin::SaveBinError::Io(_) => VSErrorKind::IOError,
        };
        Self::new(kind, err)
    }
}

impl From<views::OutOfRange> for VSError {
    #[track_caller]
    fn from(err: views::OutOfRange) -> Self {
        Self::new(VSErrorKind::OutOfRange, err)
    }
}

impl From<views::CopyError> for VSError {
    #[track_caller]
    fn from(err: views::CopyError) -> Self {
        Self::new(VSErrorKind::DimensionMismatch, err)
    }
}

impl From<views::TryFromErrorLight> for VSError {
    #[track_caller]
    fn from(err: views::TryFromErrorLight) -> Self {
        Self::new(VSErrorKind::DimensionMismatch, err)
    }
}

impl From<vector::TryFromError> for VSError {
    #[track_caller]
    fn from(err: vector::TryFromError) -> Self {
        Self::new(VSErrorKind::InvalidArgument, err)
    }
}

impl From<DimensionMismatch> for VSError {
    #[track_caller]
    fn from(err: DimensionMismatch) -> Self {
        Self::new(VSErrorKind::DimensionMismatch, err)
    }
}

impl From<UnsupportedDtype> for VSError {
    #[track_caller]
    fn from(err: UnsupportedDtype) -> Self {
        Self::new(VSErrorKind::UnsupportedDtype, err)
    }
}

impl From<rayon::ThreadPoolBuildError> for VSError {
    #[track_caller]
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::new(VSErrorKind::ThreadPoolError, err)
    }
}

/// An internal wrapper for error types that also tracks the file and line information
/// for where the error was first converted and where context was propagated.
#[derive(Debug)]
struct Located<T>
where
    T: Debug,
{
    err: T,
    location: &'static std::panic::Location<'static>,
}

impl<T> Located<T>
where
    T: Debug,
{
    #[track_caller]
    fn new(err: T) -> Self {
        Self {
            err,
            location: std::panic::Location::caller(),
        }
    }
}

impl<T> Display for Located<T>
where
    T: Display + Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{} -- ({}:{})",
            self.err,
            self.location.file(),
            self.location.line()
        )
    }
}

impl<T> std::error::Error for Located<T>
where
    T: std::error::Error + Debug,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.err.source()
    }
}

//////////////////
// ErrorContext //
//////////////////

/// Add context to a returned error that will be included in the source chain.
/// ```rust
/// use vsearch::{VSError, error::ErrorContext};
///
/// fn fn_a() -> Result<(), VSError> {
///     Err(VSError::invalid_argument("thrown by function A"))
/// }
///
/// fn fn_b() -> Result<(), VSError> {
///     fn_a().context("propagated by function B")
/// }
///
/// fn fn_c() -> Result<(), VSError> {
///     fn_b().with_context(|| "propagated by function C")
/// }
///
/// let message = fn_c().unwrap_err().to_string();
/// assert!(message.contains("thrown by function A"));
/// assert!(message.contains("propagated by function B"));
/// assert!(message.contains("propagated by function C"));
/// ```
pub trait ErrorContext<T> {
    /// Attach the provided context to the error part of the result.
    fn context<C>(self, context: C) -> Result<T, VSError>
    where
        C: Display + Debug + Send + Sync + 'static;

    /// Attach the provided context to the error part of the result.
    ///
    /// The function `f` will only be evaluated if `self` is an `Err`.
    fn with_context<F, C>(self, f: F) -> Result<T, VSError>
    where
        C: Display + Debug + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    VSError: From<E>,
{
    #[track_caller]
    fn context<C>(self, context: C) -> Result<T, VSError>
    where
        C: Display + Debug + Send + Sync + 'static,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(VSError::from(error).context(context)),
        }
    }

    #[track_caller]
    fn with_context<F, C>(self, f: F) -> Result<T, VSError>
    where
        C: Display + Debug + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        match self {
            Ok(value) => Ok(value),
            Err(error) => Err(VSError::from(error).context(f())),
        }
    }
}

/// Return `value` if it is strictly positive, otherwise `error`.
pub(crate) fn ensure_positive<T, E>(value: T, error: E) -> Result<T, E>
where
    T: PartialOrd + Default + Debug,
{
    if value > T::default() {
        Ok(value)
    } else {
        Err(error)
    }
}

/////////////////
// VSErrorKind //
/////////////////

/// Error kinds used to tag a returned error.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum VSErrorKind {
    /// Operands have incompatible shapes.
    DimensionMismatch,
    /// A parameter is outside of its legal domain (`k == 0`, `k > rows`, zero threads, ...).
    InvalidArgument,
    /// Element access outside of a matrix.
    OutOfRange,
    /// Stored data is malformed or does not match its declared size.
    IOCorruption,
    /// A stored element type that the kernels do not handle.
    UnsupportedDtype,
    /// The operating system reported a failure.
    IOError,
    /// The worker pool could not be created.
    ThreadPoolError,
    /// An untagged error.
    Opaque,
}
