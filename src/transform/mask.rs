//! Mask records: the original values of a patched region.
//!
//! # Text format
//!
//! Whitespace separated integers. The first one is the seed (byte offset into
//! the target buffer), the rest are read in groups of three as `(r, g, b)`
//! triplets. A trailing incomplete group is ignored.
//!
//! ```text
//! 120
//! 31 200 7
//! 255 0 16
//! ```
//!
//! # Arithmetic
//!
//! Masking a region records `S[k] = (X[seed + k] + M[k]) mod 256` where `M`
//! is the mask buffer. Restoring writes `(S[k] - M[k]) mod 256` back.
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{self, Read, Write};
use std::str::FromStr;

use thiserror::Error;

use super::{CHANNELS, TransformError};

/// Errors that make a mask file unusable
#[derive(Debug, Error)]
pub enum MaskError
{
    /// There is no seed to read
    #[error("mask data is empty, expected a seed")]
    MissingSeed,

    /// A token is not an integer
    #[error("token {position} (`{token}`) is not an integer")]
    InvalidInteger
    {
        /// Zero-based index of the token, the seed being token 0
        position: usize,
        token: Box<str>,
    },

    /// The seed cannot be used as a byte offset
    #[error("seed {value} is not a valid byte offset")]
    SeedOutOfRange
    {
        value: i64
    },

    /// A colour component is outside `0..=255`
    #[error("component at token {position} is {value}, outside 0..=255")]
    ComponentOutOfRange
    {
        position: usize, value: i64
    },

    /// Reading the mask data failed
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Seed offset plus the original RGB values of a patched region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskRecord
{
    seed: usize,
    triplets: Vec<[u8; CHANNELS]>,
}

impl MaskRecord
{
    #[must_use]
    pub const fn new(seed: usize, triplets: Vec<[u8; CHANNELS]>) -> Self
    {
        Self { seed, triplets }
    }

    /// A record without values. Restoring it is always rejected.
    #[must_use]
    pub const fn empty(seed: usize) -> Self
    {
        Self::new(seed, Vec::new())
    }

    /// Records the values of `region` combined with `mask`.
    ///
    /// Only `min(region.len(), mask.len())` bytes are recorded, rounded down
    /// to whole triplets.
    #[must_use]
    pub fn capture(seed: usize, region: &[u8], mask: &[u8]) -> Self
    {
        let sums: Vec<u8> = region
            .iter()
            .zip(mask)
            .map(|(value, mask)| value.wrapping_add(*mask))
            .collect();

        let triplets = sums
            .chunks_exact(CHANNELS)
            .map(|pixel| [pixel[0], pixel[1], pixel[2]])
            .collect();

        Self::new(seed, triplets)
    }

    #[must_use]
    pub const fn seed(&self) -> usize
    {
        self.seed
    }

    #[must_use]
    pub fn triplets(&self) -> &[[u8; CHANNELS]]
    {
        &self.triplets
    }

    /// Number of bytes the recorded triplets cover.
    #[must_use]
    pub fn patch_len(&self) -> usize
    {
        self.triplets.len() * CHANNELS
    }

    /// Recorded values as a flat byte sequence.
    pub fn bytes(&self) -> impl Iterator<Item = u8> + '_
    {
        self.triplets.iter().flatten().copied()
    }

    /// Checks that restoring `patch_len` bytes into a buffer of `buffer_len`
    /// bytes is possible with this record.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::InvalidMaskGeometry`] when the record holds
    /// fewer than `patch_len` bytes or when either the patch or the record
    /// runs past the end of the buffer.
    pub fn check_geometry(
        &self,
        patch_len: usize,
        buffer_len: usize,
    ) -> Result<(), TransformError>
    {
        let fits = |len: usize| {
            self.seed
                .checked_add(len)
                .is_some_and(|end| end <= buffer_len)
        };

        if self.patch_len() >= patch_len
            && fits(patch_len)
            && fits(self.patch_len())
        {
            return Ok(());
        }

        Err(TransformError::InvalidMaskGeometry {
            seed: self.seed,
            record_len: self.patch_len(),
            patch_len,
            buffer_len,
        })
    }

    /// Recovers the pre-mask bytes, one per byte of `mask`.
    ///
    /// Callers are expected to have checked the geometry first, values the
    /// record does not hold are not produced.
    #[must_use]
    pub fn restore(&self, mask: &[u8]) -> Vec<u8>
    {
        self.bytes()
            .zip(mask)
            .map(|(recorded, mask)| recorded.wrapping_sub(*mask))
            .collect()
    }

    /// Parses a record from a reader holding the text format.
    ///
    /// # Errors
    ///
    /// Returns [`MaskError::Io`] when reading fails and any parse error of
    /// [`MaskRecord::from_str`].
    pub fn read_from(mut reader: impl Read) -> Result<Self, MaskError>
    {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        text.parse()
    }

    /// Writes the record in the text format.
    ///
    /// # Errors
    ///
    /// Returns any I/O error of `writer`.
    pub fn write_to(&self, mut writer: impl Write) -> io::Result<()>
    {
        write!(writer, "{self}")?;
        writer.flush()
    }
}

impl FromStr for MaskRecord
{
    type Err = MaskError;

    fn from_str(text: &str) -> Result<Self, Self::Err>
    {
        let mut tokens = text
            .split_ascii_whitespace()
            .enumerate()
            .map(|(position, token)| parse_integer(position, token));

        let (_, seed) = tokens.next().ok_or(MaskError::MissingSeed)??;
        let seed = usize::try_from(seed)
            .map_err(|_| MaskError::SeedOutOfRange { value: seed })?;

        let mut triplets = Vec::new();
        let mut pending = Vec::with_capacity(CHANNELS);
        for token in tokens
        {
            pending.push(token?);
            if pending.len() < CHANNELS
            {
                continue;
            }

            let mut pixel = [0; CHANNELS];
            for (channel, (position, value)) in pixel.iter_mut().zip(&pending)
            {
                *channel = u8::try_from(*value).map_err(|_| {
                    MaskError::ComponentOutOfRange {
                        position: *position,
                        value: *value,
                    }
                })?;
            }
            triplets.push(pixel);
            pending.clear();
        }

        if !pending.is_empty()
        {
            log::debug!(
                "ignoring {} trailing value(s) after {} triplets",
                pending.len(),
                triplets.len()
            );
        }

        Ok(Self::new(seed, triplets))
    }
}

impl Display for MaskRecord
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult
    {
        writeln!(f, "{}", self.seed)?;
        for [r, g, b] in &self.triplets
        {
            writeln!(f, "{r} {g} {b}")?;
        }
        Ok(())
    }
}

/// Parses one token, keeping its position for error reporting
fn parse_integer(
    position: usize,
    token: &str,
) -> Result<(usize, i64), MaskError>
{
    token
        .parse()
        .map(|value| (position, value))
        .map_err(|_| MaskError::InvalidInteger {
            position,
            token: token.into(),
        })
}
