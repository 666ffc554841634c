//! View layer for bot replies
//!
//! All user-facing texts live here; handlers only pick which one to send.

use oxide_imgbot_core::search::{BatchOutcome, SearchError, UserInputError};
use std::num::NonZeroUsize;

/// Capability summary sent for `!help` and `/start`
pub const HELP_TEXT: &str = "Функционал бота:\n\
!search <запрос> - Найти и отправить изображения по запросу\n\
!next - Отправить следующие изображения по предыдущему запросу\n\
!settings <количество> - Установить количество отправляемых изображений (по умолчанию 1)\n\
!help - Показать это сообщение";

/// `!search` without a query
pub const EMPTY_QUERY_TEXT: &str = "Введите свой запрос после команды '!search'.";
/// `!next` before any search in the chat
pub const NO_PREVIOUS_SEARCH_TEXT: &str = "Нет результатов предыдущего поиска.";
/// `!settings` with something other than a positive integer
pub const INVALID_BATCH_SIZE_TEXT: &str =
    "Некорректное значение количества изображений. Используйте целое число.";
/// The search returned nothing
pub const NO_IMAGES_TEXT: &str = "Нет изображений по данному запросу.";
/// Everything the search returned was already sent
pub const NO_MORE_IMAGES_TEXT: &str = "Больше нет изображений по данному запросу.";
/// Search provider failed or timed out
pub const SEARCH_FAILED_TEXT: &str =
    "Не удалось выполнить поиск изображений. Попробуйте позже.";
/// History store failed; nothing further was sent
pub const STORAGE_FAILED_TEXT: &str =
    "Не удалось проверить историю отправленных изображений. Попробуйте позже.";
/// An image could not be posted to the chat
pub const DELIVERY_FAILED_TEXT: &str = "Не удалось отправить изображение.";

/// Confirmation for a new batch size
#[must_use]
pub fn batch_size_set_text(batch_size: NonZeroUsize) -> String {
    format!("Количество отправляемых изображений установлено на {batch_size}")
}

/// Follow-up message for a finished batch, if one is due.
///
/// Delivered images are their own messages, so a successful batch needs none.
#[must_use]
pub fn outcome_text(outcome: &BatchOutcome) -> Option<&'static str> {
    match outcome {
        BatchOutcome::Delivered { .. } => None,
        BatchOutcome::NoImagesFound => Some(NO_IMAGES_TEXT),
        BatchOutcome::NoMoreImages { .. } => Some(NO_MORE_IMAGES_TEXT),
    }
}

/// Message reporting a failed request
#[must_use]
pub fn error_text(error: &SearchError) -> &'static str {
    match error {
        SearchError::UserInput(UserInputError::EmptyQuery) => EMPTY_QUERY_TEXT,
        SearchError::UserInput(UserInputError::NoPreviousSearch) => NO_PREVIOUS_SEARCH_TEXT,
        SearchError::UserInput(UserInputError::InvalidBatchSize) => INVALID_BATCH_SIZE_TEXT,
        SearchError::Provider(_) => SEARCH_FAILED_TEXT,
        SearchError::Storage(_) => STORAGE_FAILED_TEXT,
        SearchError::Delivery(_) => DELIVERY_FAILED_TEXT,
    }
}
