// src/config/mod.rs

//! Turning raw CLI input into one validated [`Invocation`].
//!
//! The rest of the crate never looks at flags or environment variables; it
//! receives `RunSpec`, `DeliveryConfig` and `RetryPolicy` values built here.

pub mod context;
pub mod duration;
pub mod model;
pub mod validate;

pub use context::{build_context, build_layered, Layers};
pub use duration::{parse_duration, parse_positive_duration};
pub use model::{Invocation, ReportedPaths, UploadSettings, WebhookSettings};
pub use validate::{resolve_diff, resolve_run, resolve_upload, resolve_webhook};
