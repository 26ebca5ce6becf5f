// src/outcome.rs

//! Two-variant outcome used at transaction and validation boundaries.
//!
//! Callers branch on an [`Outcome`] instead of propagating an error with `?`
//! when a failure is an expected path (a transaction that rolled back, a plan
//! that did not validate). Combinators elsewhere in the crate still return
//! [`crate::errors::Result`]; [`Outcome::into_result`] and the
//! `From<Result<..>>` impl convert between the two at the boundary.

use std::fmt;

use crate::errors::OpguardError;

/// Either a success payload, or an error together with its human-readable
/// message. Never mutated after construction; every combinator consumes `self`
/// and returns a new value.
#[derive(Debug)]
#[must_use]
pub enum Outcome<T, E = OpguardError> {
    Success(T),
    Failure { error: E, message: String },
}

impl<T, E: fmt::Display> Outcome<T, E> {
    /// Failure whose message is the error's `Display` output.
    pub fn failure(error: E) -> Self {
        let message = error.to_string();
        Outcome::Failure { error, message }
    }
}

impl<T, E> Outcome<T, E> {
    pub fn success(value: T) -> Self {
        Outcome::Success(value)
    }

    pub fn failure_with_message(error: E, message: impl Into<String>) -> Self {
        Outcome::Failure {
            error,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure { .. })
    }

    /// The failure message, if any.
    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { message, .. } => Some(message),
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { error, .. } => Some(error),
        }
    }

    /// Transform the success payload; failures pass through untouched.
    pub fn map<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(value) => Outcome::Success(f(value)),
            Outcome::Failure { error, message } => Outcome::Failure { error, message },
        }
    }

    /// Chain a step that itself produces an outcome.
    pub fn and_then<U, F>(self, f: F) -> Outcome<U, E>
    where
        F: FnOnce(T) -> Outcome<U, E>,
    {
        match self {
            Outcome::Success(value) => f(value),
            Outcome::Failure { error, message } => Outcome::Failure { error, message },
        }
    }

    /// Run a side effect on the success payload and hand `self` back.
    pub fn on_success<F>(self, f: F) -> Self
    where
        F: FnOnce(&T),
    {
        if let Outcome::Success(value) = &self {
            f(value);
        }
        self
    }

    /// Run a side effect on the failure and hand `self` back.
    pub fn on_failure<F>(self, f: F) -> Self
    where
        F: FnOnce(&E, &str),
    {
        if let Outcome::Failure { error, message } = &self {
            f(error, message);
        }
        self
    }

    /// Extract the success payload, or fail with a generic unwrap error that
    /// carries the failure message.
    pub fn get_or_throw(self) -> crate::errors::Result<T> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure { message, .. } => Err(OpguardError::Unwrap(message)),
        }
    }

    pub fn get_or_none(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure { error, .. } => Err(error),
        }
    }
}

impl<T, E: fmt::Display> From<Result<T, E>> for Outcome<T, E> {
    fn from(res: Result<T, E>) -> Self {
        match res {
            Ok(value) => Outcome::Success(value),
            Err(error) => Outcome::failure(error),
        }
    }
}
