//! Search engine
//!
//! Per-chat search sessions walked in configurable batches, skipping images the
//! user already received.

mod controller;
mod registry;
mod session;
mod walker;

pub use controller::SearchController;
pub use registry::{ChatKey, ChatState, SessionRegistry};
pub use session::{parse_batch_size, DeliveryConfig, SearchSession, SessionState};
pub use walker::{BatchOutcome, DeliverySink, DeliveryWalker};

use crate::providers::ProviderError;
use crate::storage::StorageError;
use thiserror::Error;

/// Problems with what the user asked for. Reported verbatim, never retried.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum UserInputError {
    /// `search` without a query
    #[error("search query is empty")]
    EmptyQuery,
    /// `next` before any `search` in this chat
    #[error("no previous search")]
    NoPreviousSearch,
    /// `settings` argument is not a positive integer
    #[error("batch size must be a positive integer")]
    InvalidBatchSize,
}

/// Outcome classes of a failed request
#[derive(Debug, Error)]
pub enum SearchError {
    /// Bad or missing command argument
    #[error("Invalid input: {0}")]
    UserInput(#[from] UserInputError),
    /// Search provider unreachable or returned malformed data
    #[error("Search provider failed: {0}")]
    Provider(#[from] ProviderError),
    /// History store unavailable; the walk was aborted
    #[error("History storage failed: {0}")]
    Storage(#[from] StorageError),
    /// The transport could not hand an image to the user
    #[error("Delivery failed: {0}")]
    Delivery(String),
}
