//! Owned RGB pixel buffer.
//!
//! Bytes are stored row-major as `(R, G, B)` triplets with no row padding, so
//! the length is always `width * height * 3`.
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::ops::Range;

use image::RgbImage;

use super::TransformError;

/// Number of channels per pixel
pub const CHANNELS: usize = 3;

/// Row-major RGB byte buffer with bounds-checked region access.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer
{
    width: u32,
    height: u32,
    bytes: Vec<u8>,
}

impl PixelBuffer
{
    /// Creates a zero-filled buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidDimensions`] when either dimension is
    /// zero.
    pub fn new(width: u32, height: u32) -> Result<Self, TransformError>
    {
        let len = byte_len(width, height)?;
        Ok(Self {
            width,
            height,
            bytes: vec![0; len],
        })
    }

    /// Wraps raw row-major RGB bytes.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidDimensions`] when either dimension is
    /// zero and [`TransformError::DimensionMismatch`] when `bytes` does not
    /// hold exactly `width * height * 3` bytes.
    pub fn from_raw(
        width: u32,
        height: u32,
        bytes: Vec<u8>,
    ) -> Result<Self, TransformError>
    {
        let expected = byte_len(width, height)?;
        if bytes.len() != expected
        {
            return Err(TransformError::DimensionMismatch {
                expected,
                actual: bytes.len(),
            });
        }

        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32
    {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32
    {
        self.height
    }

    /// Length of the buffer in bytes.
    #[must_use]
    pub fn len(&self) -> usize
    {
        self.bytes.len()
    }

    /// Always `false` for a constructed buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8]
    {
        &self.bytes
    }

    /// Mutable access to every byte. The length cannot change through it.
    pub fn as_bytes_mut(&mut self) -> &mut [u8]
    {
        &mut self.bytes
    }

    /// Iterates over the pixels as `[r, g, b]` triplets.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; CHANNELS]> + '_
    {
        self.bytes
            .chunks_exact(CHANNELS)
            .map(|pixel| [pixel[0], pixel[1], pixel[2]])
    }

    /// Returns the bytes in `[offset, offset + length)`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::IndexOutOfRange`] when the region does not
    /// fit in the buffer.
    pub fn read_region(
        &self,
        offset: usize,
        length: usize,
    ) -> Result<&[u8], TransformError>
    {
        let range = self.region(offset, length)?;
        Ok(&self.bytes[range])
    }

    /// Overwrites the bytes starting at `offset` with `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::IndexOutOfRange`] when the region does not
    /// fit in the buffer. The buffer is left untouched in that case.
    pub fn write_region(
        &mut self,
        offset: usize,
        bytes: &[u8],
    ) -> Result<(), TransformError>
    {
        let range = self.region(offset, bytes.len())?;
        self.bytes[range].copy_from_slice(bytes);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`TransformError::IndexOutOfRange`] when `index` is past the
    /// end of the buffer.
    pub fn byte_at(&self, index: usize) -> Result<u8, TransformError>
    {
        let range = self.region(index, 1)?;
        Ok(self.bytes[range.start])
    }

    /// # Errors
    ///
    /// Returns [`TransformError::IndexOutOfRange`] when `index` is past the
    /// end of the buffer.
    pub fn set_byte_at(
        &mut self,
        index: usize,
        value: u8,
    ) -> Result<(), TransformError>
    {
        let range = self.region(index, 1)?;
        self.bytes[range.start] = value;
        Ok(())
    }

    /// Checks that `other` can be combined byte by byte with this buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::DimensionMismatch`] when the byte lengths
    /// differ.
    pub fn ensure_same_size(
        &self,
        other: &PixelBuffer,
    ) -> Result<(), TransformError>
    {
        if self.len() == other.len()
        {
            Ok(())
        }
        else
        {
            Err(TransformError::DimensionMismatch {
                expected: self.len(),
                actual: other.len(),
            })
        }
    }

    fn region(
        &self,
        offset: usize,
        length: usize,
    ) -> Result<Range<usize>, TransformError>
    {
        let out_of_range = || TransformError::IndexOutOfRange {
            offset,
            length,
            buffer_len: self.bytes.len(),
        };

        let end = offset.checked_add(length).ok_or_else(out_of_range)?;
        if end > self.bytes.len()
        {
            return Err(out_of_range());
        }

        Ok(offset..end)
    }
}

impl TryFrom<RgbImage> for PixelBuffer
{
    type Error = TransformError;

    fn try_from(image: RgbImage) -> Result<Self, Self::Error>
    {
        let (width, height) = image.dimensions();
        Self::from_raw(width, height, image.into_raw())
    }
}

// Pixel data is usually too large to be useful in debug output
impl Debug for PixelBuffer
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult
    {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

/// Byte length of a `width` x `height` RGB buffer
fn byte_len(width: u32, height: u32) -> Result<usize, TransformError>
{
    let invalid = TransformError::InvalidDimensions { width, height };
    if width == 0 || height == 0
    {
        return Err(invalid);
    }

    (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(CHANNELS))
        .ok_or(invalid)
}
