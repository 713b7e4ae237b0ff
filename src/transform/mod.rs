//! Reversible byte-level transforms over RGB pixel buffers.
//!
//! A [`Pipeline`] is an ordered list of [`TransformStage`]s. The [`Encoder`]
//! runs it forward against a source buffer, a [`SecretBuffer`] used as the
//! XOR key and an optional mask buffer. The [`Decoder`] runs the mechanically
//! derived inverse of the same list to reconstruct the source bit-exactly.
//!
//! # Stages
//!
//! - `xor`: byte-wise XOR with the secret buffer
//! - `ror:K` / `rol:K`: byte-wise cyclic rotation by `K` bits
//! - `shl:K` / `shr:K`: byte-wise shifts, one-way only
//! - `mask:SEED`: region substitution with the mask buffer, recorded as a
//!   [`MaskRecord`]
//!
//! # Errors
//!
//! Returns [`TransformError`] when buffers cannot be combined or a stage
//! cannot run. Problems with a single mask record during decoding are not
//! errors, they are reported as invalid [`Correction`]s.
use thiserror::Error;

pub mod bitwise;
mod buffer;
mod decode;
mod encode;
mod mask;
mod secret;
mod stage;

pub use buffer::{CHANNELS, PixelBuffer};
pub use decode::{Correction, CorrectionStatus, DecodeOutput, Decoder};
pub use encode::{EncodeOutput, Encoder, Intermediate};
pub use mask::{MaskError, MaskRecord};
pub use secret::SecretBuffer;
pub use stage::{DEFAULT_PLAN, DEFAULT_ROTATION, Pipeline, TransformStage};

/// Errors that can be emitted while building buffers or running stages
#[derive(Debug, Error)]
pub enum TransformError
{
    /// A pixel buffer was requested with a zero dimension
    #[error("pixel buffer dimensions must be non-zero, got {width}x{height}")]
    InvalidDimensions
    {
        width: u32, height: u32
    },

    /// Two buffers that must have the same size do not
    #[error("expected {expected} bytes but the buffer holds {actual}")]
    DimensionMismatch
    {
        expected: usize, actual: usize
    },

    /// A region access falls outside the buffer
    #[error(
        "region at offset {offset} with length {length} exceeds buffer \
         length {buffer_len}"
    )]
    IndexOutOfRange
    {
        offset: usize,
        length: usize,
        buffer_len: usize,
    },

    /// A mask record does not describe a restorable region
    #[error(
        "mask record at seed {seed} holds {record_len} bytes, restoring \
         {patch_len} bytes in a {buffer_len}-byte buffer is not possible"
    )]
    InvalidMaskGeometry
    {
        seed: usize,
        record_len: usize,
        patch_len: usize,
        buffer_len: usize,
    },

    /// The stage discards bits and has no inverse
    #[error("stage `{stage}` discards bits and cannot be inverted")]
    NotInvertible
    {
        stage: Box<str>
    },

    /// A mask stage ran without a mask buffer
    #[error("stage `{stage}` requires a mask buffer")]
    MissingMask
    {
        stage: Box<str>
    },

    /// A stage token could not be parsed
    #[error("invalid stage `{token}`: {reason}")]
    InvalidStage
    {
        token: Box<str>, reason: Box<str>
    },
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;
    use rand::fill;

    use super::*;

    fn filled(width: u32, height: u32, value: u8) -> PixelBuffer
    {
        let len = width as usize * height as usize * CHANNELS;
        PixelBuffer::from_raw(width, height, vec![value; len])
            .expect("valid geometry")
    }

    fn random(width: u32, height: u32) -> PixelBuffer
    {
        let mut bytes = vec![0u8; width as usize * height as usize * CHANNELS];
        fill(bytes.as_mut_slice());
        PixelBuffer::from_raw(width, height, bytes).expect("valid geometry")
    }

    #[test]
    fn canonical_scenario_on_zero_buffer()
    {
        let source = filled(2, 2, 0x00);
        let secret = SecretBuffer::new(filled(2, 2, 0x0F));
        let pipeline = Pipeline::canonical();

        let encoded = Encoder::new(&pipeline, &secret)
            .encode(source.clone())
            .expect("encode failed");

        let labels: Vec<_> = encoded
            .intermediates
            .iter()
            .map(|step| step.label.as_str())
            .collect();
        assert_eq!(labels, ["P1", "P2", "P3"]);
        assert_eq!(encoded.intermediates[0].buffer, filled(2, 2, 0x0F));
        assert_eq!(encoded.intermediates[1].buffer, filled(2, 2, 0xE1));
        assert_eq!(encoded.intermediates[2].buffer, filled(2, 2, 0xEE));
        assert!(encoded.records.is_empty());

        let artifact = encoded.into_artifact().expect("artifact expected");
        let decoded = Decoder::from_forward(&pipeline, Vec::new(), &secret)
            .expect("canonical plan is invertible")
            .decode(artifact)
            .expect("decode failed");

        assert_eq!(decoded.buffer, source);
        assert!(decoded.corrections.is_empty());
    }

    #[test]
    fn masked_round_trip_restores_patched_regions()
    {
        let source = random(8, 6);
        let secret = SecretBuffer::new(random(8, 6));
        let mask = random(2, 2);
        let pipeline = Pipeline::canonical_masked(15, 60);

        let encoded = Encoder::new(&pipeline, &secret)
            .with_mask(&mask)
            .encode(source.clone())
            .expect("encode failed");
        assert_eq!(encoded.records.len(), 2);

        let records = encoded.records.clone();
        let artifact = encoded.into_artifact().expect("artifact expected");
        let decoded = Decoder::from_forward(&pipeline, records, &secret)
            .expect("masked plan is invertible")
            .with_mask(&mask)
            .decode(artifact)
            .expect("decode failed");

        assert_eq!(decoded.buffer, source);
        assert_eq!(decoded.corrections.len(), 2);
        assert!(decoded.corrections.iter().all(Correction::is_restored));
        // corrections are reported in decode order, last mask first
        assert_eq!(decoded.corrections[0].seed, 60);
        assert_eq!(decoded.corrections[1].seed, 15);
    }

    #[test]
    fn swapped_records_are_not_restored()
    {
        let source = random(8, 6);
        let secret = SecretBuffer::new(random(8, 6));
        let mask = random(2, 2);
        let pipeline = Pipeline::canonical_masked(15, 60);

        let encoded = Encoder::new(&pipeline, &secret)
            .with_mask(&mask)
            .encode(source.clone())
            .expect("encode failed");

        let mut records = encoded.records.clone();
        records.swap(0, 1);

        let decoder = Decoder::from_forward(&pipeline, records, &secret)
            .expect("masked plan is invertible")
            .with_mask(&mask);
        assert_eq!(
            decoder.inverse().to_string(),
            "xor,restore:60,rol:3,restore:15,xor"
        );

        let artifact = encoded.into_artifact().expect("artifact expected");
        let decoded = decoder.decode(artifact).expect("decode failed");

        assert!(!decoded.is_complete());
        let seeds: Vec<_> = decoded
            .corrections
            .iter()
            .map(|correction| correction.seed)
            .collect();
        assert_eq!(seeds, [60, 15]);
        assert!(decoded.corrections.iter().all(|correction| matches!(
            correction.status,
            CorrectionStatus::Invalid(TransformError::InvalidMaskGeometry {
                record_len: 0,
                ..
            })
        )));
    }

    #[test]
    fn short_record_degrades_locally()
    {
        let source = random(4, 4);
        let secret = SecretBuffer::new(random(4, 4));
        let mask = random(1, 2);
        let pipeline = Pipeline::canonical_masked(0, 30);

        let encoded = Encoder::new(&pipeline, &secret)
            .with_mask(&mask)
            .encode(source.clone())
            .expect("encode failed");

        let mut records = encoded.records.clone();
        let first_triplet = records[1].triplets()[..1].to_vec();
        records[1] = MaskRecord::new(30, first_triplet);

        let artifact = encoded.into_artifact().expect("artifact expected");
        let decoded = Decoder::from_forward(&pipeline, records, &secret)
            .expect("masked plan is invertible")
            .with_mask(&mask)
            .decode(artifact)
            .expect("decode must complete despite the bad record");

        assert!(matches!(
            decoded.corrections[0].status,
            CorrectionStatus::Invalid(TransformError::InvalidMaskGeometry {
                ..
            })
        ));
        assert!(decoded.corrections[1].is_restored());

        // only the region the skipped record covered may differ
        let differing: Vec<_> = source
            .as_bytes()
            .iter()
            .zip(decoded.buffer.as_bytes())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(index, _)| index)
            .collect();
        assert!(differing.iter().all(|&index| (30..36).contains(&index)));
    }

    #[test]
    fn mismatched_secret_is_fatal()
    {
        let pipeline = Pipeline::canonical();
        let secret = SecretBuffer::new(filled(3, 2, 0x01));
        let error = Encoder::new(&pipeline, &secret)
            .encode(filled(2, 2, 0x00))
            .expect_err("secret size must match");

        assert!(matches!(
            error,
            TransformError::DimensionMismatch {
                expected: 12,
                actual: 18
            }
        ));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(
            bytes in proptest::collection::vec(any::<u8>(), 48),
            key in proptest::collection::vec(any::<u8>(), 48),
            mask in proptest::collection::vec(any::<u8>(), 6),
            first_seed in 0usize..=42,
            second_seed in 0usize..=42,
            rotation in 0u32..8,
        )
        {
            let source = PixelBuffer::from_raw(4, 4, bytes).unwrap();
            let secret =
                SecretBuffer::new(PixelBuffer::from_raw(4, 4, key).unwrap());
            let mask = PixelBuffer::from_raw(2, 1, mask).unwrap();
            let pipeline = Pipeline::new(vec![
                TransformStage::Xor,
                TransformStage::MaskApply { seed: first_seed },
                TransformStage::RotateRight(rotation),
                TransformStage::MaskApply { seed: second_seed },
                TransformStage::Xor,
            ]);

            let encoded = Encoder::new(&pipeline, &secret)
                .with_mask(&mask)
                .encode(source.clone())
                .unwrap();
            let records = encoded.records.clone();
            let decoded = Decoder::from_forward(&pipeline, records, &secret)
                .unwrap()
                .with_mask(&mask)
                .decode(encoded.into_artifact().unwrap())
                .unwrap();

            prop_assert_eq!(decoded.buffer, source);
        }
    }
}
