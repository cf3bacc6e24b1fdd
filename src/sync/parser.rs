//! Raw email parsing.
//!
//! Turns one archived RFC 5322 message into a [`Message`] for the arena. The
//! body is kept as transmitted apart from NUL removal: comment anchors and
//! diff positions are raw line indices into it, so trimming or re-wrapping
//! would shift every position.
//!
//! Failed parses are logged by the caller and skipped; one bad file does not
//! stop a batch.

use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, ParsedMail, parse_mail};
use thiserror::Error;

use crate::threading::Message;

/// Errors that can be returned while parsing an archived email.
#[derive(Debug, Error)]
pub enum ParseEmailError {
    #[error("failed to parse MIME structure: {0}")]
    MimeParse(#[from] mailparse::MailParseError),
    #[error("missing Message-ID header")]
    MissingMessageId,
    #[error("missing From header for message {message_id}")]
    MissingFrom { message_id: String },
}

/// Remove NUL bytes some archived messages carry.
fn sanitize_text(text: &str) -> String {
    text.replace('\0', "")
}

/// Header value with surrounding whitespace removed; empty values count as absent.
fn header_value(parsed: &ParsedMail<'_>, name: &str) -> Option<String> {
    parsed
        .headers
        .get_first_value(name)
        .map(|value| sanitize_text(value.trim()))
        .filter(|value| !value.is_empty())
}

fn parse_date(raw: Option<String>, message_id: &str) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match dateparser::parse(&raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(err) => {
            log::warn!("email {} has invalid date `{}`: {}", message_id, raw, err);
            None
        }
    }
}

/// First `text/plain` part of a multipart message, else the root body.
fn extract_body(parsed: &ParsedMail<'_>) -> String {
    let plain = parsed
        .subparts
        .iter()
        .find(|part| part.ctype.mimetype == "text/plain")
        .and_then(|part| part.get_body().ok())
        .filter(|body| !body.is_empty());

    let body = match plain {
        Some(body) => body,
        None => parsed.get_body().unwrap_or_default(),
    };
    sanitize_text(&body)
}

/// Parse one archived email.
///
/// Message-ID and In-Reply-To keep their angle brackets so they compare
/// equal to each other as written. Subject defaults to `(No Subject)`; a
/// missing or unparseable Date leaves `date` unset.
///
/// # Errors
///
/// - [`ParseEmailError::MimeParse`] when the bytes are not a valid message
/// - [`ParseEmailError::MissingMessageId`] / [`ParseEmailError::MissingFrom`]
///   when a required header is absent or empty
pub fn parse_message(raw: &[u8]) -> Result<Message, ParseEmailError> {
    let parsed = parse_mail(raw).map_err(|e| {
        log::debug!("failed to parse MIME: {}", e);
        ParseEmailError::MimeParse(e)
    })?;

    let id = header_value(&parsed, "Message-ID").ok_or_else(|| {
        log::debug!("missing Message-ID header");
        ParseEmailError::MissingMessageId
    })?;

    let from = header_value(&parsed, "From").ok_or_else(|| ParseEmailError::MissingFrom {
        message_id: id.clone(),
    })?;

    let subject = header_value(&parsed, "Subject").unwrap_or_else(|| "(No Subject)".to_string());
    let in_reply_to = header_value(&parsed, "In-Reply-To");
    let date = parse_date(header_value(&parsed, "Date"), &id);
    let body = extract_body(&parsed);

    log::trace!("parsed: {} - {}", id, subject);

    let mut message = Message::new(id, subject, from, in_reply_to, body);
    message.date = date;
    Ok(message)
}
