//! Console report for mask records and decode corrections.
use std::io::{self, Write};

use crate::transform::{CHANNELS, Correction, CorrectionStatus, MaskRecord};

/// Prints the seed, the pixel count and every triplet of a record.
pub(super) fn write_record(
    out: &mut impl Write,
    record: &MaskRecord,
) -> io::Result<()>
{
    writeln!(out, "Seed: {}", record.seed())?;
    writeln!(out, "Pixels read: {}", record.triplets().len())?;
    write_pixels(out, record.triplets())
}

/// Prints the outcome of every restoration, restored pixels included.
pub(super) fn write_corrections(
    out: &mut impl Write,
    corrections: &[Correction],
) -> io::Result<()>
{
    for correction in corrections
    {
        match &correction.status
        {
            CorrectionStatus::Restored(pixels) =>
            {
                writeln!(out, "Correction at seed {}", correction.seed)?;
                writeln!(out, "Pixels restored: {}", pixels.len())?;
                write_pixels(out, pixels)?;
            },
            CorrectionStatus::Invalid(reason) =>
            {
                writeln!(
                    out,
                    "Correction at seed {}: correction not valid ({reason})",
                    correction.seed
                )?;
            },
        }
    }
    Ok(())
}

fn write_pixels(
    out: &mut impl Write,
    pixels: &[[u8; CHANNELS]],
) -> io::Result<()>
{
    for (index, [r, g, b]) in pixels.iter().enumerate()
    {
        writeln!(out, "Pixel {index}: ({r}, {g}, {b})")?;
    }
    Ok(())
}
