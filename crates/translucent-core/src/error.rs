//! Error types for Translucent.
//!
//! [`PipelineError`] covers every way building or invoking a pipeline can
//! fail. Configuration mistakes (no middleware, a constructor that does not
//! accept the supplied arguments, a middleware written for another context
//! type, an unresolvable dependency) surface from `build` so that a faulty
//! pipeline never serves a request. Failures raised by middleware themselves
//! surface from the composed delegate and are never swallowed.

use crate::di::InjectionError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Standard error type for pipeline construction and execution.
///
/// # Example
///
/// ```
/// use translucent_core::PipelineError;
///
/// let err = PipelineError::MiddlewareConstructorNotFound {
///     middleware: "app::Greeter",
///     attempted: vec!["RequestDelegate<Ctx>", "u32"],
/// };
/// assert!(err.to_string().contains("(RequestDelegate<Ctx>, u32)"));
/// ```
#[derive(Error, Debug)]
pub enum PipelineError {
    /// `build` was called before any middleware was registered.
    #[error("cannot build a pipeline without middleware; register at least one")]
    EmptyPipeline,

    /// No constructor of the middleware accepts the assembled arguments.
    #[error(
        "no constructor of {middleware} accepts ({})",
        .attempted.join(", ")
    )]
    MiddlewareConstructorNotFound {
        /// The middleware type being activated.
        middleware: &'static str,
        /// Type names of the attempted argument list, `next` delegate first.
        attempted: Vec<&'static str>,
    },

    /// The middleware's entry point does not accept the pipeline context.
    #[error("{middleware} must accept {expected} as its first invoke parameter, but accepts {found}")]
    InvalidInvokeSignature {
        /// The middleware type being activated.
        middleware: &'static str,
        /// The context type the pipeline is built for.
        expected: &'static str,
        /// The context type the middleware declares.
        found: &'static str,
    },

    /// A constructor or invoke-time dependency could not be resolved.
    #[error("dependency not found: {0}")]
    DependencyNotFound(#[from] InjectionError),

    /// A middleware failed while handling a request.
    #[error("middleware {middleware} failed: {source}")]
    Invocation {
        /// Name of the failing middleware.
        middleware: &'static str,
        /// The underlying error.
        #[source]
        source: anyhow::Error,
    },

    /// The downstream chain did not complete within its deadline.
    #[error("request timed out after {elapsed:?}")]
    Timeout {
        /// The deadline that elapsed.
        elapsed: Duration,
    },
}

impl PipelineError {
    /// Creates an invocation error for the named middleware.
    #[must_use]
    pub fn invocation(middleware: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Invocation {
            middleware,
            source: source.into(),
        }
    }

    /// Returns `true` for errors that can only be raised while building.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyPipeline
                | Self::MiddlewareConstructorNotFound { .. }
                | Self::InvalidInvokeSignature { .. }
        )
    }
}
