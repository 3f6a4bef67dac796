//! `Content-Length` framing for JSON-RPC over a byte stream.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{OmniError, OmniResult};

/// Bodies larger than this are rejected before allocating.
pub const MAX_CONTENT_LENGTH: usize = 64 * 1024 * 1024;

/// Read one framed message. Returns `None` on a clean EOF before any
/// header. `buf` is scratch space reused across calls.
pub async fn read_message<R>(reader: &mut R, buf: &mut String) -> OmniResult<Option<Value>>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut saw_header = false;
    loop {
        buf.clear();
        let bytes_read = reader.read_line(buf).await?;
        if bytes_read == 0 {
            if saw_header {
                return Err(OmniError::Protocol("stream ended inside message headers".into()));
            }
            return Ok(None);
        }

        let line = buf.trim();
        if line.is_empty() {
            if saw_header {
                break;
            }
            // Stray blank line between messages.
            continue;
        }
        saw_header = true;

        // Other headers (Content-Type) are ignored.
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                let len = value.trim().parse().map_err(|_| {
                    OmniError::Protocol(format!("invalid Content-Length: {}", value.trim()))
                })?;
                content_length = Some(len);
            }
        }
    }

    let length = content_length.ok_or_else(|| OmniError::Protocol("missing Content-Length".into()))?;
    if length > MAX_CONTENT_LENGTH {
        return Err(OmniError::Protocol(format!(
            "Content-Length {length} exceeds limit of {MAX_CONTENT_LENGTH}"
        )));
    }

    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;

    let json: Value = serde_json::from_slice(&body)?;
    Ok(Some(json))
}

/// Write one framed message and flush.
pub async fn write_message<W>(writer: &mut W, message: &Value) -> OmniResult<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(message)?;
    let msg = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);
    writer.write_all(msg.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    async fn read_all(input: &[u8]) -> Vec<OmniResult<Option<Value>>> {
        let mut reader = BufReader::new(input);
        let mut buf = String::new();
        let mut out = Vec::new();
        loop {
            let msg = read_message(&mut reader, &mut buf).await;
            let done = !matches!(msg, Ok(Some(_)));
            out.push(msg);
            if done {
                break;
            }
        }
        out
    }

    #[tokio::test]
    async fn reads_consecutive_messages() {
        let input = b"Content-Length: 7\r\n\r\n{\"a\":1}content-length: 7\r\nContent-Type: application/vscode-jsonrpc; charset=utf-8\r\n\r\n{\"b\":2}";
        let msgs = read_all(input).await;
        assert_eq!(msgs.len(), 3);
        assert_eq!(*msgs[0].as_ref().unwrap(), Some(json!({"a": 1})));
        assert_eq!(*msgs[1].as_ref().unwrap(), Some(json!({"b": 2})));
        assert!(matches!(msgs[2], Ok(None)));
    }

    #[tokio::test]
    async fn body_length_is_in_bytes() {
        let body = "{\"s\":\"é\"}";
        let input = format!("Content-Length: {}\r\n\r\n{}", body.len(), body);
        let msgs = read_all(input.as_bytes()).await;
        assert_eq!(*msgs[0].as_ref().unwrap(), Some(json!({"s": "é"})));
    }

    #[tokio::test]
    async fn missing_length_is_an_error() {
        let msgs = read_all(b"Content-Type: x\r\n\r\n{}").await;
        assert!(matches!(msgs[0], Err(OmniError::Protocol(_))));
    }

    #[tokio::test]
    async fn oversized_length_is_rejected() {
        let msgs = read_all(b"Content-Length: 18446744073709551615\r\n\r\n{}").await;
        assert!(matches!(msgs[0], Err(OmniError::Protocol(_))));

        let over = format!("Content-Length: {}\r\n\r\n{{}}", MAX_CONTENT_LENGTH + 1);
        let msgs = read_all(over.as_bytes()).await;
        assert!(matches!(msgs[0], Err(OmniError::Protocol(_))));
    }

    #[tokio::test]
    async fn truncated_headers_are_an_error() {
        let msgs = read_all(b"Content-Length: 2\r\n").await;
        assert!(msgs[0].is_err());
    }

    #[tokio::test]
    async fn write_then_read() {
        let mut out = Vec::new();
        write_message(&mut out, &json!({"jsonrpc": "2.0", "id": 1})).await.unwrap();
        let text = String::from_utf8(out.clone()).unwrap();
        assert!(text.starts_with("Content-Length: 24\r\n\r\n"));
        let msgs = read_all(&out).await;
        assert_eq!(*msgs[0].as_ref().unwrap(), Some(json!({"jsonrpc": "2.0", "id": 1})));
    }
}
