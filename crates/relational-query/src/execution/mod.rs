//! Retry orchestration for database units of work.
//!
//! An [`ExecutionStrategy`] classifies failures through a
//! [`TransientErrorDetector`] and waits between attempts according to a
//! [`RetryPolicy`]. The [`ExecutionContext`] passed down the call chain marks
//! whether a strategy is already active, so nested strategies do not retry.

pub mod context;
pub mod detector;
pub mod policy;
pub mod strategy;

pub use context::ExecutionContext;
pub use detector::{DefaultTransientErrorDetector, TransientErrorDetector};
pub use policy::{RetryPolicy, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRY_COUNT};
pub use strategy::{Executed, ExecutionStrategy};
