// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2026 Alex Sizykh

use std::fmt;

pub mod codes {
    pub const INVALID_ARGUMENT: &str = "invalid_argument";
    pub const NOT_FOUND: &str = "not_found";
    pub const TIMEOUT: &str = "timeout";
    pub const ABNORMAL_TERMINATION: &str = "abnormal_termination";
    pub const CANCELED: &str = "canceled";
    pub const REMOTE_ERROR: &str = "remote_error";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppErrorKind {
    /// Invalid or contradictory declarative settings. Not retryable.
    InvalidArgument,
    /// An operation that needs an existing cluster found none.
    NotFound,
    /// Monitor deadline exceeded while the cluster was still active.
    Timeout,
    /// The cluster terminated on its own with at least one unfinished step.
    AbnormalTermination,
    Cancelled,
    /// Provider API failure, propagated unchanged. Retry belongs to the SDK.
    Remote,
    Internal,
}

#[derive(Debug, Clone)]
pub struct AppError {
    kind: AppErrorKind,
    code: &'static str,
    message: String,
    context: Option<String>,
}

impl AppError {
    pub fn new(kind: AppErrorKind, code: &'static str) -> Self {
        Self {
            kind,
            code,
            message: code.to_string(),
            context: None,
        }
    }

    pub fn with_message(
        kind: AppErrorKind,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(AppErrorKind::InvalidArgument, codes::INVALID_ARGUMENT, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_message(AppErrorKind::NotFound, codes::NOT_FOUND, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::with_message(AppErrorKind::Timeout, codes::TIMEOUT, message)
    }

    pub fn abnormal_termination(message: impl Into<String>) -> Self {
        Self::with_message(
            AppErrorKind::AbnormalTermination,
            codes::ABNORMAL_TERMINATION,
            message,
        )
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::with_message(AppErrorKind::Cancelled, codes::CANCELED, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::with_message(AppErrorKind::Remote, codes::REMOTE_ERROR, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_message(AppErrorKind::Internal, codes::INTERNAL_ERROR, message)
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ctx) = &self.context {
            write!(f, "{} ({})", self.message, ctx)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;
