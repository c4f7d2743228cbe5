//! Length-prefixed framing over a byte stream.
//!
//! Every message on the daemon socket is framed as:
//! ```text
//! +-------------------+-------------------------------+
//! | length: u32 (BE)  | body: `length` bytes of JSON  |
//! +-------------------+-------------------------------+
//! ```

use std::io::{self, Read, Write};

use crate::error::{IpcError, ProtocolError};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Validates a body length against `max_size` and the `u32` prefix range.
///
/// # Errors
///
/// Returns [`ProtocolError::MessageTooLarge`] when the body cannot be framed.
pub fn frame_length(len: usize, max_size: usize) -> Result<u32, ProtocolError> {
    let too_large = ProtocolError::MessageTooLarge {
        size: len,
        max: max_size,
    };
    if len > max_size {
        return Err(too_large);
    }
    u32::try_from(len).map_err(|_| too_large)
}

/// Writes `body` as one frame and flushes the writer.
///
/// # Errors
///
/// Returns [`ProtocolError::MessageTooLarge`] before writing anything when
/// `body` exceeds `max_size`, or [`IpcError::Io`] when the transport fails.
#[expect(clippy::big_endian_bytes, reason = "wire prefix is big-endian by definition")]
pub fn write_frame<W>(writer: &mut W, body: &[u8], max_size: usize) -> Result<(), IpcError>
where
    W: Write,
{
    let length = frame_length(body.len(), max_size)?;
    writer
        .write_all(&length.to_be_bytes())
        .map_err(IpcError::Io)?;
    writer.write_all(body).map_err(IpcError::Io)?;
    writer.flush().map_err(IpcError::Io)
}

/// Reads one complete frame, blocking until the whole body is available.
///
/// # Errors
///
/// Returns [`ProtocolError::EmptyReply`] when the stream ends before any
/// prefix byte arrives, [`ProtocolError::MessageTooLarge`] when the prefix
/// announces a body above `max_size`, and [`IpcError::Io`] for any other
/// transport failure, including end of stream part-way through a frame.
#[expect(clippy::big_endian_bytes, reason = "wire prefix is big-endian by definition")]
pub fn read_frame<R>(reader: &mut R, max_size: usize) -> Result<Vec<u8>, IpcError>
where
    R: Read,
{
    let mut prefix = [0_u8; LENGTH_PREFIX_LEN];
    read_prefix(reader, &mut prefix)?;
    let announced = u32::from_be_bytes(prefix);
    let length = usize::try_from(announced).unwrap_or(usize::MAX);
    if length > max_size {
        return Err(ProtocolError::MessageTooLarge {
            size: length,
            max: max_size,
        }
        .into());
    }

    let mut body = vec![0_u8; length];
    reader.read_exact(&mut body).map_err(IpcError::Io)?;
    Ok(body)
}

fn read_prefix<R>(reader: &mut R, prefix: &mut [u8; LENGTH_PREFIX_LEN]) -> Result<(), IpcError>
where
    R: Read,
{
    let mut filled = 0;
    while let Some(remaining) = prefix.get_mut(filled..) {
        if remaining.is_empty() {
            break;
        }
        match reader.read(remaining) {
            Ok(0) if filled == 0 => return Err(ProtocolError::EmptyReply.into()),
            Ok(0) => {
                return Err(IpcError::Io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed inside a length prefix",
                )));
            }
            Ok(count) => filled += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(IpcError::Io(error)),
        }
    }
    Ok(())
}
