//! Search session state and delivery configuration.

use super::UserInputError;
use crate::providers::ImageRecord;
use std::num::NonZeroUsize;

/// Lifecycle of a chat's search session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No search was started yet
    Empty,
    /// Results remain past the cursor
    Active,
    /// Cursor reached the end of the results
    Exhausted,
}

impl SessionState {
    /// State of an optional session.
    #[must_use]
    pub fn of(session: Option<&SearchSession>) -> Self {
        match session {
            None => Self::Empty,
            Some(session) if session.is_exhausted() => Self::Exhausted,
            Some(_) => Self::Active,
        }
    }
}

/// Ordered results of the latest search and the walk position in them.
///
/// The cursor only moves forward and never passes `results.len()`.
#[derive(Debug, Clone)]
pub struct SearchSession {
    query: String,
    results: Vec<ImageRecord>,
    cursor: usize,
}

impl SearchSession {
    /// Fresh session positioned at the first result
    #[must_use]
    pub fn new(query: impl Into<String>, results: Vec<ImageRecord>) -> Self {
        Self {
            query: query.into(),
            results,
            cursor: 0,
        }
    }

    /// Query the results were fetched for (after normalization)
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// All results in provider order
    #[must_use]
    pub fn results(&self) -> &[ImageRecord] {
        &self.results
    }

    /// Index of the next result to consider
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Results not yet walked over
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.results.len() - self.cursor
    }

    /// True if no result remains past the cursor
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.results.len()
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::of(Some(self))
    }

    pub(crate) fn current(&self) -> Option<&ImageRecord> {
        self.results.get(self.cursor)
    }

    pub(crate) fn advance(&mut self) {
        if self.cursor < self.results.len() {
            self.cursor += 1;
        }
    }
}

/// Per-chat delivery preferences; survives new searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Images delivered per `search` / `next` request
    pub batch_size: NonZeroUsize,
}

impl DeliveryConfig {
    /// Config with the given batch size; zero is raised to one.
    #[must_use]
    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            batch_size: NonZeroUsize::new(batch_size).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            batch_size: NonZeroUsize::MIN,
        }
    }
}

/// Parses a user-supplied batch size.
///
/// # Errors
///
/// Returns `UserInputError::InvalidBatchSize` unless `raw` is a positive integer.
pub fn parse_batch_size(raw: &str) -> Result<NonZeroUsize, UserInputError> {
    raw.trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| UserInputError::InvalidBatchSize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(refs: &[&str]) -> SearchSession {
        SearchSession::new(
            "cats",
            refs.iter().map(|r| ImageRecord::from_reference(*r)).collect(),
        )
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(SessionState::of(None), SessionState::Empty);
        assert_eq!(session(&[]).state(), SessionState::Exhausted);

        let mut s = session(&["a", "b"]);
        assert_eq!(s.state(), SessionState::Active);
        s.advance();
        assert_eq!(s.state(), SessionState::Active);
        s.advance();
        assert_eq!(s.state(), SessionState::Exhausted);
    }

    #[test]
    fn test_cursor_never_passes_end() {
        let mut s = session(&["a"]);
        s.advance();
        s.advance();
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.remaining(), 0);
        assert!(s.current().is_none());
    }

    #[test]
    fn test_parse_batch_size() {
        assert_eq!(parse_batch_size("3").map(NonZeroUsize::get), Ok(3));
        assert_eq!(parse_batch_size(" 5 ").map(NonZeroUsize::get), Ok(5));
        assert_eq!(parse_batch_size("abc"), Err(UserInputError::InvalidBatchSize));
        assert_eq!(parse_batch_size(""), Err(UserInputError::InvalidBatchSize));
        assert_eq!(parse_batch_size("0"), Err(UserInputError::InvalidBatchSize));
        assert_eq!(parse_batch_size("-2"), Err(UserInputError::InvalidBatchSize));
        assert_eq!(parse_batch_size("2.5"), Err(UserInputError::InvalidBatchSize));
    }

    #[test]
    fn test_delivery_config_defaults_to_one() {
        assert_eq!(DeliveryConfig::default().batch_size.get(), 1);
        assert_eq!(DeliveryConfig::with_batch_size(0).batch_size.get(), 1);
        assert_eq!(DeliveryConfig::with_batch_size(4).batch_size.get(), 4);
    }
}
