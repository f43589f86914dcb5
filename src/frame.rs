//! Inbound and outbound frame types.
//!
//! The transport collaborator delivers discrete, complete messages; text
//! frames arrive as string slices, binary frames as a [`BinaryWindow`] into a
//! buffer the transport may reuse. Outbound traffic is expressed as
//! [`OutboundFrame`] values handed to the connection's writer.

use bytes::Bytes;
use thiserror::Error;

/// A binary window whose bounds do not fit inside the backing buffer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("binary window offset {offset} + len {len} exceeds buffer of {buffer_len} bytes")]
pub struct WindowError {
    /// Requested start of the window.
    pub offset: usize,
    /// Requested window length.
    pub len: usize,
    /// Length of the backing buffer.
    pub buffer_len: usize,
}

/// Read-only view of `[offset, offset + len)` within a transport buffer.
///
/// The backing buffer may be larger than the message and is typically reused
/// for subsequent frames, so the window bounds are authoritative. The
/// constructor validates the bounds and the view only ever exposes the
/// in-window bytes; an adapter that needs to retain payload data past the
/// call must copy it, for example via [`BinaryWindow::to_bytes`].
#[derive(Clone, Copy, Debug)]
pub struct BinaryWindow<'a> {
    slice: &'a [u8],
    offset: usize,
}

impl<'a> BinaryWindow<'a> {
    /// Create a window over `buffer[offset..offset + len]`.
    ///
    /// # Errors
    ///
    /// Returns a [`WindowError`] if the window extends past the end of the
    /// buffer or the bounds overflow.
    pub fn new(buffer: &'a [u8], offset: usize, len: usize) -> Result<Self, WindowError> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= buffer.len())
            .ok_or(WindowError {
                offset,
                len,
                buffer_len: buffer.len(),
            })?;
        Ok(Self {
            slice: &buffer[offset..end],
            offset,
        })
    }

    /// The in-window bytes.
    #[must_use]
    pub fn as_slice(&self) -> &'a [u8] { self.slice }

    /// Interpret the window as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`std::str::Utf8Error`] if the window is not
    /// valid UTF-8.
    pub fn as_str(&self) -> Result<&'a str, std::str::Utf8Error> {
        std::str::from_utf8(self.slice)
    }

    /// Copy the window into an owned buffer for retention.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes { Bytes::copy_from_slice(self.slice) }

    /// Offset of the window within the original buffer.
    #[must_use]
    pub fn offset(&self) -> usize { self.offset }

    /// Number of bytes in the window.
    #[must_use]
    pub fn len(&self) -> usize { self.slice.len() }

    /// Whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.slice.is_empty() }
}

/// One outbound frame queued for the connection writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A text frame.
    Text(String),
    /// A binary frame.
    Binary(Bytes),
}
