//! Reply parsing.
//!
//! A reply is a sequence of `key: value` lines terminated by `OK`, or a
//! single `ACK [code@index] {command} message` line. A `binary: N` line is
//! followed by exactly N raw bytes and a newline.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::tag::Tag;
use crate::error::{CadenzaError, CadenzaResult};
use crate::protocol_constants::{
    BINARY_KEY, MAX_BINARY_BYTES, MAX_LINE_BYTES, REPLY_ACK_PREFIX, REPLY_OK,
};

// ─────────────────────────────────────────────────────────────────────────────
// Successful Replies
// ─────────────────────────────────────────────────────────────────────────────

/// A successful reply: the ordered tag stream plus an optional binary payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub tags: Vec<Tag>,
    pub binary: Option<Bytes>,
}

impl Response {
    /// Returns the first value for `name`, ignoring ASCII case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.is(name))
            .map(|t| t.value.as_str())
    }

    /// Returns every value for `name` in reply order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .filter(move |t| t.is(name))
            .map(|t| t.value.as_str())
    }

    /// Parses the first value for `name`.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    /// Consumes the reply and returns its tags.
    pub fn into_tags(self) -> Vec<Tag> {
        self.tags
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Failed Replies
// ─────────────────────────────────────────────────────────────────────────────

/// Server-defined failure categories carried in an ACK line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    NotList,
    Argument,
    Password,
    Permission,
    UnknownCommand,
    NoExist,
    PlaylistMax,
    System,
    PlaylistLoad,
    UpdateAlready,
    PlayerSync,
    Exist,
    Other(u32),
}

impl AckKind {
    /// Maps a numeric ACK code to its category.
    #[must_use]
    pub fn from_code(code: u32) -> Self {
        match code {
            1 => Self::NotList,
            2 => Self::Argument,
            3 => Self::Password,
            4 => Self::Permission,
            5 => Self::UnknownCommand,
            50 => Self::NoExist,
            51 => Self::PlaylistMax,
            52 => Self::System,
            53 => Self::PlaylistLoad,
            54 => Self::UpdateAlready,
            55 => Self::PlayerSync,
            56 => Self::Exist,
            other => Self::Other(other),
        }
    }

    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotList => "not_list",
            Self::Argument => "bad_argument",
            Self::Password => "bad_password",
            Self::Permission => "permission_denied",
            Self::UnknownCommand => "unknown_command",
            Self::NoExist => "no_exist",
            Self::PlaylistMax => "playlist_max",
            Self::System => "system_error",
            Self::PlaylistLoad => "playlist_load_failed",
            Self::UpdateAlready => "update_already_running",
            Self::PlayerSync => "player_sync",
            Self::Exist => "already_exists",
            Self::Other(_) => "command_failed",
        }
    }
}

/// A parsed `ACK [code@index] {command} message` line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}@{index}] {{{command}}} {message}")]
pub struct AckError {
    pub code: u32,
    /// Position of the failing command inside a command list.
    pub index: u32,
    pub command: String,
    pub message: String,
}

impl AckError {
    /// Returns the failure category.
    pub fn kind(&self) -> AckKind {
        AckKind::from_code(self.code)
    }
}

impl FromStr for AckError {
    type Err = CadenzaError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || CadenzaError::Protocol(format!("malformed ACK line: {line}"));

        let rest = line.strip_prefix(REPLY_ACK_PREFIX).ok_or_else(malformed)?;
        let rest = rest.strip_prefix('[').ok_or_else(malformed)?;
        let (location, rest) = rest.split_once(']').ok_or_else(malformed)?;
        let (code, index) = location.split_once('@').ok_or_else(malformed)?;
        let code = code.trim().parse().map_err(|_| malformed())?;
        let index = index.trim().parse().map_err(|_| malformed())?;

        let rest = rest.trim_start().strip_prefix('{').ok_or_else(malformed)?;
        let (command, message) = rest.split_once('}').ok_or_else(malformed)?;

        Ok(Self {
            code,
            index,
            command: command.to_string(),
            message: message.trim().to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Line Classification
// ─────────────────────────────────────────────────────────────────────────────

/// One classified reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplyLine {
    Ok,
    Ack(AckError),
    Pair(Tag),
    Binary(usize),
}

/// Classifies a single reply line (without its trailing newline).
pub(crate) fn parse_line(line: &str) -> CadenzaResult<ReplyLine> {
    if line == REPLY_OK {
        return Ok(ReplyLine::Ok);
    }
    if line.starts_with(REPLY_ACK_PREFIX) {
        return line.parse().map(ReplyLine::Ack);
    }

    let (name, value) = line
        .split_once(": ")
        .or_else(|| line.strip_suffix(':').map(|name| (name, "")))
        .ok_or_else(|| CadenzaError::Protocol(format!("unexpected reply line: {line}")))?;

    if name == BINARY_KEY {
        let len = value
            .trim()
            .parse::<usize>()
            .map_err(|_| CadenzaError::Protocol(format!("bad binary length: {value}")))?;
        return Ok(ReplyLine::Binary(len));
    }

    Ok(ReplyLine::Pair(Tag::new(name, value)))
}

/// Reads one newline-terminated line, without the terminator.
///
/// Returns `Network` on EOF and `Protocol` when the line exceeds
/// [`MAX_LINE_BYTES`].
pub(crate) async fn read_line<R>(reader: &mut R) -> CadenzaResult<String>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut buf = Vec::new();
    let read = (&mut *reader)
        .take(MAX_LINE_BYTES as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;

    if read == 0 {
        return Err(CadenzaError::Network("connection closed by server".into()));
    }
    if buf.last() != Some(&b'\n') {
        if buf.len() > MAX_LINE_BYTES {
            return Err(CadenzaError::Protocol("reply line too long".into()));
        }
        return Err(CadenzaError::Network("connection closed mid-line".into()));
    }

    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Reads a complete reply.
///
/// An ACK line is returned as `CadenzaError::Command`; the connection stays
/// usable afterwards.
pub(crate) async fn read_response<R>(reader: &mut R) -> CadenzaResult<Response>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut response = Response::default();

    loop {
        let line = read_line(reader).await?;
        match parse_line(&line)? {
            ReplyLine::Ok => return Ok(response),
            ReplyLine::Ack(ack) => return Err(CadenzaError::Command(ack)),
            ReplyLine::Pair(tag) => response.tags.push(tag),
            ReplyLine::Binary(len) => {
                if len > MAX_BINARY_BYTES {
                    return Err(CadenzaError::Protocol(format!(
                        "binary chunk of {len} bytes exceeds limit"
                    )));
                }
                let mut data = vec![0u8; len];
                reader.read_exact(&mut data).await?;

                let mut terminator = [0u8; 1];
                reader.read_exact(&mut terminator).await?;
                if terminator[0] != b'\n' {
                    return Err(CadenzaError::Protocol(
                        "binary payload not followed by newline".into(),
                    ));
                }
                response.binary = Some(Bytes::from(data));
            }
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tag(s)", self.tags.len())?;
        if let Some(binary) = &self.binary {
            write!(f, ", {} binary byte(s)", binary.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ack_line() {
        let ack: AckError = "ACK [50@1] {find} No such song".parse().unwrap();
        assert_eq!(ack.code, 50);
        assert_eq!(ack.index, 1);
        assert_eq!(ack.command, "find");
        assert_eq!(ack.message, "No such song");
        assert_eq!(ack.kind(), AckKind::NoExist);
    }

    #[test]
    fn ack_with_empty_command_parses() {
        let ack: AckError = "ACK [5@0] {} unknown command \"foo\"".parse().unwrap();
        assert_eq!(ack.kind(), AckKind::UnknownCommand);
        assert!(ack.command.is_empty());
    }

    #[test]
    fn malformed_ack_is_protocol_error() {
        let err = "ACK nonsense".parse::<AckError>().unwrap_err();
        assert!(matches!(err, CadenzaError::Protocol(_)));
    }

    #[test]
    fn pair_splits_on_first_separator() {
        let line = parse_line("Title: Act 1: Overture").unwrap();
        assert_eq!(
            line,
            ReplyLine::Pair(Tag::new("Title", "Act 1: Overture"))
        );
    }

    #[test]
    fn pair_with_empty_value_parses() {
        assert_eq!(
            parse_line("Genre:").unwrap(),
            ReplyLine::Pair(Tag::new("Genre", ""))
        );
    }

    #[test]
    fn line_without_separator_is_rejected() {
        assert!(parse_line("garbage").is_err());
    }

    #[tokio::test]
    async fn reads_tags_until_ok() {
        let mut input: &[u8] = b"file: a.mp3\nTitle: A\nOK\n";
        let response = read_response(&mut input).await.unwrap();
        assert_eq!(response.tags.len(), 2);
        assert_eq!(response.get("title"), Some("A"));
        assert!(response.binary.is_none());
    }

    #[tokio::test]
    async fn reads_binary_payload() {
        let mut input: &[u8] = b"size: 10\ntype: image/png\nbinary: 4\n\x00\n\x01\x02\nOK\n";
        let response = read_response(&mut input).await.unwrap();
        assert_eq!(response.parse::<usize>("size"), Some(10));
        assert_eq!(response.binary.as_deref(), Some(&b"\x00\n\x01\x02"[..]));
    }

    #[tokio::test]
    async fn ack_reply_is_command_error() {
        let mut input: &[u8] = b"ACK [2@0] {add} bad uri\n";
        let err = read_response(&mut input).await.unwrap_err();
        assert!(matches!(err, CadenzaError::Command(ref ack) if ack.kind() == AckKind::Argument));
    }

    #[tokio::test]
    async fn eof_is_network_error() {
        let mut input: &[u8] = b"file: a.mp3\n";
        let err = read_response(&mut input).await.unwrap_err();
        assert!(matches!(err, CadenzaError::Network(_)));
    }
}
