//! Mask record files.
//!
//! Loads and saves [`MaskRecord`]s in their text format, one record per file.
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use super::AppError;
use crate::transform::{MaskError, MaskRecord};

/// Loads a mask record from a text file.
///
/// # Errors
///
/// Returns [`AppError::Mask`] when the file cannot be read or does not hold a
/// valid record.
pub(super) fn load_mask(path: impl AsRef<Path>) -> Result<MaskRecord, AppError>
{
    let mask_error = |source| AppError::Mask {
        path: path.as_ref().into(),
        source,
    };

    let file = File::open(path.as_ref())
        .map_err(|err| mask_error(MaskError::Io(err)))?;
    let record =
        MaskRecord::read_from(BufReader::new(file)).map_err(mask_error)?;

    log::debug!(
        "loaded mask {} (seed {}, {} pixels)",
        path.as_ref().display(),
        record.seed(),
        record.triplets().len()
    );
    Ok(record)
}

/// Saves a mask record as a text file.
///
/// # Errors
///
/// Returns [`AppError::Write`] when the file cannot be created or written.
pub(super) fn save_mask(
    record: &MaskRecord,
    path: impl AsRef<Path>,
) -> Result<(), AppError>
{
    let write_error = |source| AppError::Write {
        path: path.as_ref().into(),
        source,
    };

    let file = File::create(path.as_ref()).map_err(write_error)?;
    record.write_to(BufWriter::new(file)).map_err(write_error)?;

    log::info!("saved {}", path.as_ref().display());
    Ok(())
}
