//! Wire framing codec
//!
//! Every message travels as a fixed 8-byte header followed by the raw body:
//!
//! ```text
//! ┌──────────────┬──────────────────────┬───────────────────┐
//! │ 4 bytes      │ 4 bytes              │ N bytes           │
//! │ magic o`P%   │ base64(len, 3 B LE)  │ body              │
//! └──────────────┴──────────────────────┴───────────────────┘
//! ```
//!
//! The length field is the standard base64 encoding of the body length as a
//! little-endian integer truncated to three bytes. Decoders also accept padded
//! encodings of shorter widths (`"BQ=="` decodes to 5).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};

/// Fixed frame magic
pub const MAGIC: [u8; 4] = *b"o`P%";

/// Header size in bytes (magic + encoded length)
pub const HEADER_SIZE: usize = 8;

/// Bytes of length carried by the header
const LENGTH_WIDTH: usize = 3;

/// Exclusive upper bound on any body length the header can express
pub const MAX_ENCODABLE_SIZE: usize = 1 << (LENGTH_WIDTH * 8);

/// Default body size ceiling (1 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1 << 20;

/// Encode the 8-byte header for a body of `len` bytes
///
/// # Errors
///
/// Returns `FrameTooLarge` if `len` does not fit the 3-byte length field.
pub fn encode_header(len: usize) -> Result<[u8; HEADER_SIZE]> {
    if len >= MAX_ENCODABLE_SIZE {
        return Err(ProtocolError::too_large(len, MAX_ENCODABLE_SIZE));
    }

    let le = (len as u32).to_le_bytes();
    let mut header = [0u8; HEADER_SIZE];
    header[..4].copy_from_slice(&MAGIC);
    STANDARD
        .encode_slice(&le[..LENGTH_WIDTH], &mut header[4..])
        .map_err(|e| ProtocolError::MalformedLength(e.to_string()))?;

    Ok(header)
}

/// Validate a header and return the declared body length
///
/// Checks, in order: exact magic match, base64 length decode, and
/// `length < max_size`. A failure here never yields a body length, so the
/// caller cannot advance into body-read state.
pub fn decode_header(header: &[u8; HEADER_SIZE], max_size: usize) -> Result<usize> {
    let (magic, encoded) = header.split_at(4);
    if magic != MAGIC {
        let mut found = [0u8; 4];
        found.copy_from_slice(magic);
        return Err(ProtocolError::BadMagic { found });
    }

    let mut raw = [0u8; LENGTH_WIDTH];
    let width = STANDARD
        .decode_slice(encoded, &mut raw)
        .map_err(|e| ProtocolError::MalformedLength(e.to_string()))?;

    let len = raw[..width]
        .iter()
        .rev()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));

    if len >= max_size {
        return Err(ProtocolError::too_large(len, max_size));
    }

    Ok(len)
}

/// Build a complete frame (header followed by body)
///
/// The body is copied once into a contiguous buffer that can be shared across
/// many sockets without further copies.
pub fn encode_frame(body: &[u8]) -> Result<Bytes> {
    let header = encode_header(body.len())?;
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
    buf.put_slice(&header);
    buf.put_slice(body);
    Ok(buf.freeze())
}

/// Read one frame body from an async reader
///
/// Used by clients and tests; sessions drive their own state machine.
pub async fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header).await?;
    let len = decode_header(&header, max_size)?;

    let mut body = BytesMut::zeroed(len);
    reader.read_exact(&mut body).await?;
    Ok(body.freeze())
}

/// Write one framed body to an async writer
pub async fn write_frame<W>(writer: &mut W, body: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(body)?;
    writer.write_all(&frame).await?;
    Ok(())
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
