//! # Translucent Core
//!
//! Foundational types shared by every Translucent crate:
//!
//! - [`Container`] - Layered, type-keyed service resolver
//! - [`Inject`] - Typed handle to a resolved service
//! - [`PipelineError`] - Error taxonomy for building and running pipelines
//! - [`RequestId`] - UUID v7 identifier assigned to each invocation

#![doc(html_root_url = "https://docs.rs/translucent-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod di;
mod error;
mod request_id;

pub use di::{Container, Inject, InjectionError};
pub use error::{PipelineError, PipelineResult};
pub use request_id::RequestId;
