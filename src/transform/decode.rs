//! Inverse run of a [`Pipeline`].
//!
//! The decoder never runs the forward plan itself. It derives the inverse
//! plan once, then replays it stage by stage. A restoration that cannot be
//! performed is reported as an invalid [`Correction`] and decoding carries on
//! with the remaining stages.
use super::stage::{StageKeys, StageOutcome};
use super::{
    CHANNELS, MaskRecord, Pipeline, PixelBuffer, SecretBuffer, TransformError,
};

/// Result of one mask restoration
#[derive(Debug)]
pub struct Correction
{
    pub seed: usize,
    pub status: CorrectionStatus,
}

#[derive(Debug)]
pub enum CorrectionStatus
{
    /// The region was written back, pixels listed in buffer order
    Restored(Vec<[u8; CHANNELS]>),
    /// The restoration was skipped
    Invalid(TransformError),
}

impl Correction
{
    #[must_use]
    pub const fn is_restored(&self) -> bool
    {
        matches!(self.status, CorrectionStatus::Restored(_))
    }
}

/// Everything an inverse run produces
#[derive(Debug)]
pub struct DecodeOutput
{
    /// The reconstructed buffer
    pub buffer: PixelBuffer,
    /// One entry per restore stage, in the order they ran
    pub corrections: Vec<Correction>,
}

impl DecodeOutput
{
    /// Whether every restoration succeeded.
    #[must_use]
    pub fn is_complete(&self) -> bool
    {
        self.corrections.iter().all(Correction::is_restored)
    }
}

/// Replays the inverse of a forward plan.
#[derive(Debug)]
pub struct Decoder<'run>
{
    inverse: Pipeline,
    secret: &'run SecretBuffer,
    mask: Option<&'run PixelBuffer>,
}

impl<'run> Decoder<'run>
{
    /// Builds a decoder for the plan `forward` was encoded with.
    ///
    /// `records` are the mask records in the order the masks were applied.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::NotInvertible`] when `forward` contains a
    /// one-way stage.
    pub fn from_forward(
        forward: &Pipeline,
        records: Vec<MaskRecord>,
        secret: &'run SecretBuffer,
    ) -> Result<Self, TransformError>
    {
        let inverse = forward.inverse(records)?;
        log::debug!("inverse plan: {inverse}");

        Ok(Self {
            inverse,
            secret,
            mask: None,
        })
    }

    /// Sets the mask buffer the records were captured with.
    #[must_use]
    pub fn with_mask(mut self, mask: &'run PixelBuffer) -> Self
    {
        self.mask = Some(mask);
        self
    }

    /// The plan this decoder replays.
    #[must_use]
    pub const fn inverse(&self) -> &Pipeline
    {
        &self.inverse
    }

    /// Reconstructs the source buffer from the final forward artifact.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::DimensionMismatch`] when `artifact` and the
    /// secret buffer differ in size. Invalid mask records are not errors,
    /// see [`DecodeOutput::corrections`].
    pub fn decode(
        &self,
        mut artifact: PixelBuffer,
    ) -> Result<DecodeOutput, TransformError>
    {
        artifact.ensure_same_size(self.secret.as_buffer())?;

        let keys = StageKeys {
            secret: self.secret,
            mask: self.mask,
        };
        let mut corrections = Vec::new();

        for stage in self.inverse.stages()
        {
            match stage.run(&mut artifact, keys)?
            {
                StageOutcome::Restored { seed, bytes } =>
                {
                    let pixels = bytes
                        .chunks_exact(CHANNELS)
                        .map(|pixel| [pixel[0], pixel[1], pixel[2]])
                        .collect();
                    corrections.push(Correction {
                        seed,
                        status: CorrectionStatus::Restored(pixels),
                    });
                },
                StageOutcome::Skipped { seed, reason } =>
                {
                    corrections.push(Correction {
                        seed,
                        status: CorrectionStatus::Invalid(reason),
                    });
                },
                StageOutcome::Masked(record) =>
                {
                    log::debug!(
                        "inverse plan re-masked seed {}",
                        record.seed()
                    );
                },
                StageOutcome::Transformed =>
                {},
            }
        }

        Ok(DecodeOutput {
            buffer: artifact,
            corrections,
        })
    }
}
