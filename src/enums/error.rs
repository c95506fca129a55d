// Copyright Peter Bower 2025. All Rights Reserved.
// Licensed under MIT License.

//! # Error Module - Custom *ndufunc* Error Types
//!
//! Defines the unified error type for type construction, signature dispatch and
//! kernel execution.
//!
//! ## Features
//! - One variant per failure kind: syntax, layout constraints, shape unification,
//!   dtype dispatch, missing kernels, semantically invalid requests and
//!   caller-supplied output mismatches.
//! - Every variant carries enough context (argument index, expected and actual
//!   fragments) to build an actionable message.
//! - Kernel failures are wrapped unchanged in [`NdError::Kernel`].

use thiserror::Error;

/// Catch all error type for `ndufunc`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NdError {
    /// Malformed type or signature text.
    #[error("type syntax error at offset {position} in '{input}': {message}")]
    TypeSyntax {
        input: String,
        position: usize,
        message: String,
    },

    /// Well formed type text that violates a layout or offset invariant.
    #[error("type constraint error: {message}")]
    TypeConstraint { message: String },

    /// A concrete argument does not fit the dimension pattern of the signature,
    /// or shapes fail to broadcast against each other.
    #[error("shape error in argument {arg}: expected '{expected}', found '{found}'")]
    Shape {
        arg: usize,
        expected: String,
        found: String,
    },

    /// A dimension variable bound twice to different sizes.
    #[error("dimension mismatch in argument {arg}: '{symbol}' is bound to {bound} but found {found}")]
    DimensionMismatch {
        arg: usize,
        symbol: String,
        bound: usize,
        found: usize,
    },

    /// No matching dtype overload and no viable promotion.
    #[error("type error in '{function}': {message}")]
    Type { function: String, message: String },

    /// A promotion target exists but no kernel implements it.
    #[error("'{function}' is not implemented for ({signature})")]
    NotImplemented { function: String, signature: String },

    /// Well typed but semantically invalid request.
    #[error("value error: {message}")]
    Value { message: String },

    /// Caller-supplied output buffers do not match the plan.
    #[error("argument error: {message}")]
    Argument { message: String },

    /// A kernel raised while executing. Propagated unchanged.
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// Coarse classification of an [`NdError`], for matching without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TypeSyntax,
    TypeConstraint,
    Shape,
    DimensionMismatch,
    Type,
    NotImplemented,
    Value,
    Argument,
    Kernel,
}

impl NdError {
    /// Returns the kind tag of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        match self {
            NdError::TypeSyntax { .. } => ErrorKind::TypeSyntax,
            NdError::TypeConstraint { .. } => ErrorKind::TypeConstraint,
            NdError::Shape { .. } => ErrorKind::Shape,
            NdError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            NdError::Type { .. } => ErrorKind::Type,
            NdError::NotImplemented { .. } => ErrorKind::NotImplemented,
            NdError::Value { .. } => ErrorKind::Value,
            NdError::Argument { .. } => ErrorKind::Argument,
            NdError::Kernel(_) => ErrorKind::Kernel,
        }
    }

    /// True for both shape failures and dimension variable mismatches.
    #[inline]
    pub fn is_shape_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::Shape | ErrorKind::DimensionMismatch)
    }

    pub(crate) fn constraint(message: impl Into<String>) -> Self {
        NdError::TypeConstraint { message: message.into() }
    }

    pub(crate) fn value(message: impl Into<String>) -> Self {
        NdError::Value { message: message.into() }
    }

    pub(crate) fn argument(message: impl Into<String>) -> Self {
        NdError::Argument { message: message.into() }
    }

    pub(crate) fn type_error(function: &str, message: impl Into<String>) -> Self {
        NdError::Type {
            function: function.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised by kernels themselves.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("kernel error: division by zero")]
    DivisionByZero,

    #[error("kernel error: unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("kernel error: {0}")]
    Failed(String),
}
