//! Line-based wire protocol.
//!
//! A request is a command line followed by a password line. The only
//! command is `test`; the reply is a single `true` or `false` line.

use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

pub const TEST_COMMAND: &str = "test";

/// An over-long line is skipped up to this multiple of the line cap before
/// giving up on finding its end.
const DISCARD_FACTOR: usize = 16;

/// Fault while servicing a single connection.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Line exceeds {0} bytes")]
    LineTooLong(usize),
    #[error("Line is not valid UTF-8")]
    InvalidUtf8,
}

/// Reply to a `test` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Accept,
    Reject,
}

impl Response {
    pub fn as_line(&self) -> &'static str {
        match self {
            Response::Accept => "true\n",
            Response::Reject => "false\n",
        }
    }
}

impl From<bool> for Response {
    fn from(accepted: bool) -> Self {
        if accepted {
            Response::Accept
        } else {
            Response::Reject
        }
    }
}

/// Reads one line, stripping the `\n` or `\r\n` terminator.
///
/// Returns `Ok(None)` if the peer closed the connection before sending any
/// byte. A final line without terminator is returned as-is. A line longer
/// than `max_len` is consumed up to its terminator and reported as
/// [`ConnectionError::LineTooLong`].
pub async fn read_line<R>(reader: &mut R, max_len: usize) -> Result<Option<String>, ConnectionError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = max_len as u64 + 2;
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(None);
    }

    let terminated = buf.last() == Some(&b'\n');
    if terminated {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
    if buf.len() > max_len {
        if !terminated {
            discard_line(reader, max_len.saturating_mul(DISCARD_FACTOR)).await?;
        }
        return Err(ConnectionError::LineTooLong(max_len));
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ConnectionError::InvalidUtf8)
}

/// Skips input up to and including the next `\n`, at most `limit` bytes.
async fn discard_line<R>(reader: &mut R, limit: usize) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0;
    while skipped < limit {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            break;
        }
        let (used, found) = match buf.iter().position(|&b| b == b'\n') {
            Some(idx) => (idx + 1, true),
            None => (buf.len(), false),
        };
        reader.consume(used);
        skipped += used;
        if found {
            break;
        }
    }
    Ok(())
}
