//! Behavioural conformance suite for S3-compatible object storage.
//!
//! Gherkin scenarios under `features/` are matched against the step
//! definitions in [`steps`] and executed through the `s3verify-core` engine.
//! [`context::HarnessContext`] carries the configuration and storage client
//! for a run; each scenario works in a fresh [`world::S3World`].

pub mod context;
mod steps;
pub mod world;

pub use context::{HarnessContext, run_features};
pub use world::S3World;
