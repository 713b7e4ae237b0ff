//! Key material for the XOR stages.
use std::fmt::{Debug, Formatter, Result as FmtResult};

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::PixelBuffer;

/// Pixel buffer used only as an XOR key.
///
/// The bytes are wiped when the buffer is dropped and never show up in debug
/// output.
pub struct SecretBuffer
{
    inner: PixelBuffer,
}

impl SecretBuffer
{
    #[must_use]
    pub const fn new(inner: PixelBuffer) -> Self
    {
        Self { inner }
    }

    #[must_use]
    pub const fn as_buffer(&self) -> &PixelBuffer
    {
        &self.inner
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8]
    {
        self.inner.as_bytes()
    }
}

// Wipes the bytes in place, the geometry stays valid
impl Zeroize for SecretBuffer
{
    fn zeroize(&mut self)
    {
        self.inner.as_bytes_mut().zeroize();
    }
}

impl Drop for SecretBuffer
{
    fn drop(&mut self)
    {
        self.zeroize();
    }
}

impl ZeroizeOnDrop for SecretBuffer {}

// Don't leak the key to the console
impl Debug for SecretBuffer
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult
    {
        write!(
            f,
            "SecretBuffer {{ width: {}, height: {}, bytes: [..] }}",
            self.inner.width(),
            self.inner.height()
        )
    }
}
