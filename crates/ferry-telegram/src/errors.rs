// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of Bot API failures into [`TransportError`].

use ferry_core::TransportError;
use teloxide::{ApiError, RequestError};

/// Map a failed request to the variant the engine reacts to.
///
/// `destination` names the chat being written to, `source` the chat being
/// read from, so the error message points at the right one.
pub fn classify(err: RequestError, destination: &str, source: &str) -> TransportError {
    match err {
        RequestError::RetryAfter(wait) => TransportError::Throttled {
            wait: wait.duration(),
        },
        RequestError::Api(api) => classify_api(api, destination, source),
        other => TransportError::Other {
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

fn classify_api(api: ApiError, destination: &str, source: &str) -> TransportError {
    match api {
        ApiError::ChatNotFound
        | ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::NotEnoughRightsToPostMessages => TransportError::DestinationUnavailable {
            destination: destination.to_string(),
            reason: api.to_string(),
        },
        ApiError::WrongFileId | ApiError::WrongFileIdOrUrl => {
            TransportError::InvalidHandle(api.to_string())
        }
        ApiError::MessageToForwardNotFound | ApiError::MessageIdInvalid => {
            TransportError::SourceUnavailable {
                source_location: source.to_string(),
                reason: api.to_string(),
            }
        }
        ApiError::Unknown(text) if is_missing_copy_source(&text) => {
            TransportError::SourceUnavailable {
                source_location: source.to_string(),
                reason: text,
            }
        }
        other => TransportError::Other {
            message: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

/// Map a failed read of `source`. Chat-level refusals name the source, since
/// nothing is being delivered.
pub fn classify_read(err: RequestError, source: &str) -> TransportError {
    match err {
        RequestError::Api(
            api @ (ApiError::ChatNotFound
            | ApiError::BotBlocked
            | ApiError::BotKicked
            | ApiError::BotKickedFromSupergroup
            | ApiError::NotEnoughRightsToPostMessages),
        ) => TransportError::SourceUnavailable {
            source_location: source.to_string(),
            reason: api.to_string(),
        },
        other => classify(other, source, source),
    }
}

/// Bot API text for a copy whose source message is gone.
fn is_missing_copy_source(text: &str) -> bool {
    let text = text.to_ascii_lowercase();
    text.contains("message to copy not found") || text.contains("message not found")
}

/// Whether a read failed only because that one message does not exist.
pub fn is_missing_message(err: &RequestError) -> bool {
    match err {
        RequestError::Api(ApiError::MessageToForwardNotFound | ApiError::MessageIdInvalid) => {
            true
        }
        RequestError::Api(ApiError::Unknown(text)) => is_missing_copy_source(text),
        _ => false,
    }
}
