#![forbid(unsafe_code)]
//! Bridge between a product tree and external AI and analysis services.
//!
//! # Conventions
//!
//! - **One request per call**: every network operation is a single blocking
//!   HTTP call with a bounded timeout. There is no retry or queueing, and
//!   answers to separate calls carry no ordering guarantee.
//! - **Errors**: Use [`BridgeError`]; all variants are recoverable and map
//!   to an [`ptree_core::ErrorCode`].
//! - **Prompt size**: context is always rendered through
//!   [`ContextSnapshot`], which caps children, siblings and samples.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod backend;
pub mod context;
pub mod error;
pub mod http;
pub mod prompt;
pub mod push;

pub use backend::{AiBackend, AskRequest, HealthStatus, from_config, health_url};
pub use context::ContextSnapshot;
pub use error::BridgeError;
pub use http::probe;
pub use prompt::build_prompt;
pub use push::{PushReceipt, push_snapshot};
