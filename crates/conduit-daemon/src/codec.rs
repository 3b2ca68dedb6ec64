use conduit_protocol::{ClientMessage, DaemonMessage};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::DaemonError;

/// Read a single JSONL message from an async buffered reader.
///
/// Returns `Ok(None)` on a clean EOF or a blank line. Returns `Err` on
/// malformed JSON or an IO error.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, DaemonError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let bytes_read = reader.read_line(&mut line).await?;
    if bytes_read == 0 {
        return Ok(None);
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let msg: T = serde_json::from_str(trimmed)
        .map_err(|e| DaemonError::ProtocolError(format!("invalid JSON: {}: {}", e, trimmed)))?;
    Ok(Some(msg))
}

/// Write a single JSONL message: compact JSON followed by a newline, flushed.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let json = serde_json::to_string(msg)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_client_message<R: AsyncBufRead + Unpin>(
    reader: &mut R,
) -> Result<Option<ClientMessage>, DaemonError> {
    read_message(reader).await
}

pub async fn write_daemon_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &DaemonMessage,
) -> Result<(), DaemonError> {
    write_message(writer, msg).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_roundtrip_client_message() {
        let msg = ClientMessage::Ping { id: "req-1".to_string() };

        let mut buf: Vec<u8> = Vec::new();
        write_message(&mut buf, &msg).await.unwrap();

        let mut reader = tokio::io::BufReader::new(buf.as_slice());
        let parsed: Option<ClientMessage> = read_message(&mut reader).await.unwrap();
        assert!(parsed.is_some());
        assert_eq!(parsed.unwrap().id(), "req-1");
    }

    #[tokio::test]
    async fn test_roundtrip_daemon_message() {
        let msg = DaemonMessage::Ack { id: "req-1".to_string() };

        let mut buf: Vec<u8> = Vec::new();
        write_message(&mut buf, &msg).await.unwrap();

        let mut reader = tokio::io::BufReader::new(buf.as_slice());
        let parsed: Option<DaemonMessage> = read_message(&mut reader).await.unwrap();
        assert!(parsed.is_some());
    }

    #[tokio::test]
    async fn test_read_eof() {
        let buf: &[u8] = b"";
        let mut reader = tokio::io::BufReader::new(buf);
        let result: Option<ClientMessage> = read_message(&mut reader).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_read_invalid_json() {
        let buf: &[u8] = b"not json\n";
        let mut reader = tokio::io::BufReader::new(buf);
        let result: Result<Option<ClientMessage>, _> = read_message(&mut reader).await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().error_code(),
            conduit_protocol::ErrorCode::ProtocolError
        );
    }

    #[tokio::test]
    async fn test_multiple_messages() {
        let msg1 = ClientMessage::DaemonStop { id: "1".to_string() };
        let msg2 = ClientMessage::ListPanes { id: "2".to_string() };

        let mut buf: Vec<u8> = Vec::new();
        write_message(&mut buf, &msg1).await.unwrap();
        write_message(&mut buf, &msg2).await.unwrap();

        let mut reader = tokio::io::BufReader::new(buf.as_slice());

        let parsed1: ClientMessage = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(parsed1.id(), "1");

        let parsed2: ClientMessage = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(parsed2.id(), "2");

        let parsed3: Option<ClientMessage> = read_message(&mut reader).await.unwrap();
        assert!(parsed3.is_none());
    }
}
