//! Forward run of a [`Pipeline`].
//!
//! Every byte transform produces a labeled intermediate (`P1`, `P2`, ...).
//! Mask stages patch the most recent intermediate in place and emit the
//! [`MaskRecord`] needed to undo them.
use super::stage::{StageKeys, StageOutcome};
use super::{MaskRecord, Pipeline, PixelBuffer, SecretBuffer, TransformError};

/// A snapshot of the buffer after a forward stage
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Intermediate
{
    /// `P{n}`, counting byte transforms from 1; `P0` is the masked source
    pub label: String,
    pub buffer: PixelBuffer,
}

/// Everything a forward run produces
#[derive(Debug)]
pub struct EncodeOutput
{
    /// Snapshots in stage order, the last one is the final artifact
    pub intermediates: Vec<Intermediate>,
    /// One record per mask stage, in the order the masks were applied
    pub records: Vec<MaskRecord>,
}

impl EncodeOutput
{
    /// The buffer produced by the last stage.
    #[must_use]
    pub fn artifact(&self) -> Option<&PixelBuffer>
    {
        self.intermediates.last().map(|step| &step.buffer)
    }

    /// Takes ownership of the buffer produced by the last stage.
    #[must_use]
    pub fn into_artifact(self) -> Option<PixelBuffer>
    {
        self.intermediates.into_iter().last().map(|step| step.buffer)
    }
}

/// Runs a plan forward.
#[derive(Debug)]
pub struct Encoder<'run>
{
    pipeline: &'run Pipeline,
    secret: &'run SecretBuffer,
    mask: Option<&'run PixelBuffer>,
}

impl<'run> Encoder<'run>
{
    #[must_use]
    pub const fn new(
        pipeline: &'run Pipeline,
        secret: &'run SecretBuffer,
    ) -> Self
    {
        Self {
            pipeline,
            secret,
            mask: None,
        }
    }

    /// Sets the buffer written over masked regions.
    #[must_use]
    pub fn with_mask(mut self, mask: &'run PixelBuffer) -> Self
    {
        self.mask = Some(mask);
        self
    }

    /// Runs every stage on `source`, in order.
    ///
    /// # Errors
    ///
    /// Returns:
    /// * [`TransformError::DimensionMismatch`] when the secret buffer size
    ///   differs from `source`
    /// * [`TransformError::MissingMask`] when a mask stage runs without a
    ///   mask buffer
    /// * [`TransformError::IndexOutOfRange`] when a masked region does not fit
    ///   in the buffer
    pub fn encode(
        &self,
        mut source: PixelBuffer,
    ) -> Result<EncodeOutput, TransformError>
    {
        source.ensure_same_size(self.secret.as_buffer())?;

        let keys = StageKeys {
            secret: self.secret,
            mask: self.mask,
        };
        let mut output = EncodeOutput {
            intermediates: Vec::with_capacity(self.pipeline.stages().len()),
            records: Vec::new(),
        };
        let mut transforms = 0;

        for stage in self.pipeline.stages()
        {
            match stage.run(&mut source, keys)?
            {
                StageOutcome::Masked(record) =>
                {
                    log::debug!(
                        "masked {} bytes at seed {}",
                        record.patch_len(),
                        record.seed()
                    );
                    output.records.push(record);
                    match output.intermediates.last_mut()
                    {
                        Some(last) => last.buffer.clone_from(&source),
                        None => output.intermediates.push(Intermediate {
                            label: "P0".into(),
                            buffer: source.clone(),
                        }),
                    }
                },
                StageOutcome::Skipped { seed, .. } =>
                {
                    log::debug!("forward restore at seed {seed} skipped");
                },
                StageOutcome::Transformed | StageOutcome::Restored { .. } =>
                {
                    transforms += 1;
                    output.intermediates.push(Intermediate {
                        label: format!("P{transforms}"),
                        buffer: source.clone(),
                    });
                },
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn buffer(bytes: &[u8]) -> PixelBuffer
    {
        let pixels = u32::try_from(bytes.len() / 3).expect("small buffer");
        PixelBuffer::from_raw(pixels, 1, bytes.to_vec()).expect("valid")
    }

    #[test]
    fn mask_records_originals_and_overwrites_region()
    {
        let source = buffer(&[10, 20, 30, 40, 50, 60, 70, 80, 90]);
        let secret = SecretBuffer::new(buffer(&[0; 9]));
        let mask = buffer(&[1, 2, 255]);
        let pipeline: Pipeline = "mask:3,xor".parse().expect("valid plan");

        let output = Encoder::new(&pipeline, &secret)
            .with_mask(&mask)
            .encode(source)
            .expect("encode failed");

        assert_eq!(output.records, [MaskRecord::new(3, vec![[41, 52, 59]])]);

        let labels: Vec<_> = output
            .intermediates
            .iter()
            .map(|step| step.label.as_str())
            .collect();
        assert_eq!(labels, ["P0", "P1"]);
        assert_eq!(
            output.artifact().map(PixelBuffer::as_bytes),
            Some([10, 20, 30, 1, 2, 255, 70, 80, 90].as_slice())
        );
    }

    #[test]
    fn mask_patches_latest_intermediate()
    {
        let source = buffer(&[0x0F; 6]);
        let secret = SecretBuffer::new(buffer(&[0; 6]));
        let mask = buffer(&[0xAA, 0xBB, 0xCC]);
        let pipeline: Pipeline = "ror:3,mask:0".parse().expect("valid plan");

        let output = Encoder::new(&pipeline, &secret)
            .with_mask(&mask)
            .encode(source)
            .expect("encode failed");

        assert_eq!(output.intermediates.len(), 1);
        assert_eq!(
            output.intermediates[0].buffer.as_bytes(),
            &[0xAA, 0xBB, 0xCC, 0xE1, 0xE1, 0xE1]
        );
        assert_eq!(
            output.records[0].triplets(),
            &[[0x8B, 0x9C, 0xAD]]
        );
    }

    #[test]
    fn mask_outside_buffer_is_fatal()
    {
        let secret = SecretBuffer::new(buffer(&[0; 6]));
        let mask = buffer(&[1, 1, 1]);
        let pipeline: Pipeline = "xor,mask:4".parse().expect("valid plan");

        let error = Encoder::new(&pipeline, &secret)
            .with_mask(&mask)
            .encode(buffer(&[0; 6]))
            .expect_err("region past the end must fail");

        assert!(matches!(
            error,
            TransformError::IndexOutOfRange {
                offset: 4,
                length: 3,
                buffer_len: 6
            }
        ));
    }

    #[test]
    fn mask_stage_requires_mask_buffer()
    {
        let secret = SecretBuffer::new(buffer(&[0; 3]));
        let pipeline = Pipeline::canonical_masked(0, 0);

        let error = Encoder::new(&pipeline, &secret)
            .encode(buffer(&[0; 3]))
            .expect_err("mask buffer is required");

        assert!(matches!(
            error,
            TransformError::MissingMask { stage } if stage.as_ref() == "mask:0"
        ));
    }

    #[test]
    fn one_way_stages_still_encode()
    {
        let secret = SecretBuffer::new(buffer(&[0xFF; 3]));
        let pipeline: Pipeline = "shl:4,xor".parse().expect("valid plan");

        let output = Encoder::new(&pipeline, &secret)
            .encode(buffer(&[0x1F, 0x80, 0x0F]))
            .expect("encode failed");

        assert_eq!(
            output.artifact().map(PixelBuffer::as_bytes),
            Some([0x0F, 0xFF, 0x0F].as_slice())
        );
    }
}
