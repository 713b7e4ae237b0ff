//! Transform stages and the ordered plans built from them.
//!
//! The inverse of a plan is derived from the plan itself: the list is
//! reversed and every stage replaced by its inverse, so the forward and the
//! inverse logic cannot drift apart.
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::bitwise::{
    map_in_place, rotate_left, rotate_right, shift_left, shift_right,
    xor_in_place,
};
use super::{MaskRecord, PixelBuffer, SecretBuffer, TransformError};

/// Rotation used by the canonical plan
pub const DEFAULT_ROTATION: u32 = 3;

/// Canonical plan in its textual form
pub const DEFAULT_PLAN: &str = "xor,ror:3,xor";

/// One reversible (or explicitly one-way) byte transform.
///
/// `Xor` always uses the secret buffer of the run, and the mask stages the
/// mask buffer of the run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransformStage
{
    /// XOR with the secret buffer over the whole buffer
    Xor,
    /// Byte-wise right rotation
    RotateRight(u32),
    /// Byte-wise left rotation
    RotateLeft(u32),
    /// Byte-wise left shift, one-way
    ShiftLeft(u32),
    /// Byte-wise right shift, one-way
    ShiftRight(u32),
    /// Replace the region at `seed` with the mask buffer, recording the
    /// original values
    MaskApply
    {
        seed: usize
    },
    /// Put the values described by a record back
    MaskRestore(MaskRecord),
}

/// What running a stage produced besides the transformed buffer
#[derive(Debug)]
pub(super) enum StageOutcome
{
    Transformed,
    Masked(MaskRecord),
    Restored
    {
        seed: usize, bytes: Vec<u8>
    },
    Skipped
    {
        seed: usize, reason: TransformError
    },
}

/// Buffers shared by every stage of a run
#[derive(Clone, Copy, Debug)]
pub(super) struct StageKeys<'run>
{
    pub(super) secret: &'run SecretBuffer,
    pub(super) mask: Option<&'run PixelBuffer>,
}

impl TransformStage
{
    /// Whether the stage can be undone exactly.
    #[must_use]
    pub const fn is_invertible(&self) -> bool
    {
        !matches!(self, Self::ShiftLeft(_) | Self::ShiftRight(_))
    }

    /// Returns the stage that undoes this one.
    ///
    /// `record` is used for [`TransformStage::MaskApply`]. Without one, or
    /// with one captured at another seed, the restore stage carries an empty
    /// record and is skipped when it runs.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NotInvertible`] for shift stages.
    pub fn inverse(
        &self,
        record: Option<MaskRecord>,
    ) -> Result<Self, TransformError>
    {
        let inverse = match self
        {
            Self::Xor => Self::Xor,
            Self::RotateRight(bits) => Self::RotateLeft(*bits),
            Self::RotateLeft(bits) => Self::RotateRight(*bits),
            Self::ShiftLeft(_) | Self::ShiftRight(_) =>
            {
                return Err(TransformError::NotInvertible {
                    stage: self.to_string().into(),
                });
            },
            Self::MaskApply { seed } =>
            {
                Self::MaskRestore(record_for(*seed, record))
            },
            Self::MaskRestore(record) => Self::MaskApply {
                seed: record.seed(),
            },
        };

        Ok(inverse)
    }

    /// Runs the stage on `buffer`.
    ///
    /// Applying a mask fails hard on bad geometry, restoring one only skips.
    pub(super) fn run(
        &self,
        buffer: &mut PixelBuffer,
        keys: StageKeys<'_>,
    ) -> Result<StageOutcome, TransformError>
    {
        match self
        {
            Self::Xor =>
            {
                let secret = keys.secret.as_buffer();
                buffer.ensure_same_size(secret)?;
                xor_in_place(buffer.as_bytes_mut(), secret.as_bytes());
            },
            Self::RotateRight(bits) =>
            {
                map_in_place(buffer.as_bytes_mut(), |v| rotate_right(v, *bits));
            },
            Self::RotateLeft(bits) =>
            {
                map_in_place(buffer.as_bytes_mut(), |v| rotate_left(v, *bits));
            },
            Self::ShiftLeft(bits) =>
            {
                map_in_place(buffer.as_bytes_mut(), |v| shift_left(v, *bits));
            },
            Self::ShiftRight(bits) =>
            {
                map_in_place(buffer.as_bytes_mut(), |v| shift_right(v, *bits));
            },
            Self::MaskApply { seed } =>
            {
                let mask = self.require_mask(keys)?;
                let region = buffer.read_region(*seed, mask.len())?;
                let record =
                    MaskRecord::capture(*seed, region, mask.as_bytes());
                buffer.write_region(*seed, mask.as_bytes())?;
                return Ok(StageOutcome::Masked(record));
            },
            Self::MaskRestore(record) =>
            {
                return Ok(Self::restore(record, buffer, keys.mask));
            },
        }

        Ok(StageOutcome::Transformed)
    }

    fn restore(
        record: &MaskRecord,
        buffer: &mut PixelBuffer,
        mask: Option<&PixelBuffer>,
    ) -> StageOutcome
    {
        let seed = record.seed();
        match Self::try_restore(record, buffer, mask)
        {
            Ok(bytes) => StageOutcome::Restored { seed, bytes },
            Err(reason) =>
            {
                log::warn!("correction not valid for seed {seed}: {reason}");
                StageOutcome::Skipped { seed, reason }
            },
        }
    }

    fn try_restore(
        record: &MaskRecord,
        buffer: &mut PixelBuffer,
        mask: Option<&PixelBuffer>,
    ) -> Result<Vec<u8>, TransformError>
    {
        let mask = mask.ok_or_else(|| TransformError::MissingMask {
            stage: format!("restore:{}", record.seed()).into(),
        })?;
        record.check_geometry(mask.len(), buffer.len())?;

        let bytes = record.restore(mask.as_bytes());
        buffer.write_region(record.seed(), &bytes)?;
        Ok(bytes)
    }

    fn require_mask<'run>(
        &self,
        keys: StageKeys<'run>,
    ) -> Result<&'run PixelBuffer, TransformError>
    {
        keys.mask.ok_or_else(|| TransformError::MissingMask {
            stage: self.to_string().into(),
        })
    }
}

/// Picks the record a restoration of the mask at `seed` may use.
fn record_for(seed: usize, record: Option<MaskRecord>) -> MaskRecord
{
    match record
    {
        Some(record) if record.seed() == seed => record,
        Some(record) =>
        {
            log::warn!(
                "record for seed {} does not belong to mask:{seed}",
                record.seed()
            );
            MaskRecord::empty(seed)
        },
        None => MaskRecord::empty(seed),
    }
}

impl FromStr for TransformStage
{
    type Err = TransformError;

    fn from_str(token: &str) -> Result<Self, Self::Err>
    {
        let token = token.trim();
        let invalid = |reason: &str| TransformError::InvalidStage {
            token: token.into(),
            reason: reason.into(),
        };

        let (name, argument) = match token.split_once(':')
        {
            Some((name, argument)) => (name, Some(argument)),
            None => (token, None),
        };

        let bits = || -> Result<u32, TransformError> {
            let argument =
                argument.ok_or_else(|| invalid("missing bit count"))?;
            argument
                .parse::<u32>()
                .ok()
                .filter(|bits| *bits < u8::BITS)
                .ok_or_else(|| invalid("bit count must be in 0..=7"))
        };

        match name.to_ascii_lowercase().as_str()
        {
            "xor" if argument.is_none() => Ok(Self::Xor),
            "xor" => Err(invalid("xor takes no argument")),
            "ror" => Ok(Self::RotateRight(bits()?)),
            "rol" => Ok(Self::RotateLeft(bits()?)),
            "shl" => Ok(Self::ShiftLeft(bits()?)),
            "shr" => Ok(Self::ShiftRight(bits()?)),
            "mask" =>
            {
                let seed = argument
                    .ok_or_else(|| invalid("missing seed"))?
                    .parse()
                    .map_err(|_| invalid("seed must be a byte offset"))?;
                Ok(Self::MaskApply { seed })
            },
            _ => Err(invalid("unknown stage")),
        }
    }
}

impl Display for TransformStage
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult
    {
        match self
        {
            Self::Xor => write!(f, "xor"),
            Self::RotateRight(bits) => write!(f, "ror:{bits}"),
            Self::RotateLeft(bits) => write!(f, "rol:{bits}"),
            Self::ShiftLeft(bits) => write!(f, "shl:{bits}"),
            Self::ShiftRight(bits) => write!(f, "shr:{bits}"),
            Self::MaskApply { seed } => write!(f, "mask:{seed}"),
            Self::MaskRestore(record) => write!(f, "restore:{}", record.seed()),
        }
    }
}

/// Ordered list of stages run as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pipeline
{
    stages: Vec<TransformStage>,
}

impl Pipeline
{
    #[must_use]
    pub const fn new(stages: Vec<TransformStage>) -> Self
    {
        Self { stages }
    }

    /// `xor`, `ror:3`, `xor`.
    #[must_use]
    pub fn canonical() -> Self
    {
        Self::new(vec![
            TransformStage::Xor,
            TransformStage::RotateRight(DEFAULT_ROTATION),
            TransformStage::Xor,
        ])
    }

    /// The canonical plan with a mask applied after the first XOR and after
    /// the rotation.
    #[must_use]
    pub fn canonical_masked(first_seed: usize, second_seed: usize) -> Self
    {
        Self::new(vec![
            TransformStage::Xor,
            TransformStage::MaskApply { seed: first_seed },
            TransformStage::RotateRight(DEFAULT_ROTATION),
            TransformStage::MaskApply { seed: second_seed },
            TransformStage::Xor,
        ])
    }

    #[must_use]
    pub fn stages(&self) -> &[TransformStage]
    {
        &self.stages
    }

    /// Seeds of the mask stages, in plan order.
    pub fn mask_seeds(&self) -> impl Iterator<Item = usize> + '_
    {
        self.stages.iter().filter_map(|stage| match stage
        {
            TransformStage::MaskApply { seed } => Some(*seed),
            _ => None,
        })
    }

    /// Derives the plan that undoes this one.
    ///
    /// `records` holds one record per mask stage in the order the masks
    /// were applied. Missing records, and records whose seed differs from
    /// the stage they line up with, turn into empty ones. The matching
    /// restoration is then skipped rather than abort the run.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NotInvertible`] when the plan contains a
    /// shift stage.
    pub fn inverse(
        &self,
        records: Vec<MaskRecord>,
    ) -> Result<Self, TransformError>
    {
        let one_way = self.stages.iter().find(|stage| !stage.is_invertible());
        if let Some(stage) = one_way
        {
            return Err(TransformError::NotInvertible {
                stage: stage.to_string().into(),
            });
        }

        let expected = self.mask_seeds().count();
        if records.len() != expected
        {
            log::warn!(
                "plan has {expected} mask stage(s) but {} record(s) were \
                 supplied",
                records.len()
            );
        }

        // the last mask applied is the first one undone
        let mut records = records.into_iter().take(expected).rev();
        let mut padding = expected.saturating_sub(records.len());

        self.stages
            .iter()
            .rev()
            .map(|stage| {
                let record = match stage
                {
                    TransformStage::MaskApply { .. } if padding > 0 =>
                    {
                        padding -= 1;
                        None
                    },
                    TransformStage::MaskApply { .. } => records.next(),
                    _ => None,
                };
                stage.inverse(record)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}

impl FromStr for Pipeline
{
    type Err = TransformError;

    fn from_str(plan: &str) -> Result<Self, Self::Err>
    {
        let stages = plan
            .split(',')
            .filter(|token| !token.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()?;

        if stages.is_empty()
        {
            return Err(TransformError::InvalidStage {
                token: plan.into(),
                reason: "a plan needs at least one stage".into(),
            });
        }

        Ok(Self::new(stages))
    }
}

impl Display for Pipeline
{
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult
    {
        for (index, stage) in self.stages.iter().enumerate()
        {
            if index > 0
            {
                write!(f, ",")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

impl Default for Pipeline
{
    fn default() -> Self
    {
        Self::canonical()
    }
}
