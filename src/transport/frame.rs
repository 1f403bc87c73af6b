//! Message framing
//!
//! Each message on a TCP connection is prefixed with a 4-byte length field
//! (little-endian u32):
//!
//! ```text
//! [4 bytes: payload length][N bytes: payload]
//! ```
//!
//! The payload is opaque at this layer.

use crate::error::ChannelError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload accepted from a peer (16 MiB)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Prepend the length field to a payload
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, ChannelError> {
    if payload.len() > MAX_FRAME_LEN {
        return Err(ChannelError::FrameTooLarge(payload.len()));
    }

    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Write one framed payload and flush
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ChannelError>
where
    W: AsyncWrite + Unpin,
{
    let framed = encode_frame(payload)?;
    writer.write_all(&framed).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed payload
///
/// Returns `Ok(None)` when the peer closed the connection at a frame
/// boundary.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(ChannelError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}
