//! Command line interface for the application.
//!
//! Provides an entry point for the application and handles the CLI arguments.
//! Images and mask files are loaded and saved here, the transforms themselves
//! live in [`crate::transform`].
mod image_io;
mod mask_io;
mod report;

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use clap::{Args, Parser, Subcommand};
use const_format::formatcp;
use thiserror::Error;

use self::image_io::{
    ensure_supported, load_buffer, normalized_extension, write_buffer,
};
use self::mask_io::{load_mask, save_mask};
use self::report::{write_corrections, write_record};
use crate::transform::{
    DEFAULT_PLAN, Decoder, Encoder, MaskError, MaskRecord, Pipeline,
    SecretBuffer, TransformError,
};

/// Errors that can be emitted while handling the CLI
#[derive(Debug, Error)]
pub enum AppError
{
    /// An I/O error occurred
    #[error(transparent)]
    Io(#[from] io::Error),

    /// A file could not be read
    #[error("failed to read {path}: {source}")]
    Read
    {
        path: Box<Path>,
        #[source]
        source: io::Error,
    },

    /// A file could not be written
    #[error("failed to write {path}: {source}")]
    Write
    {
        path: Box<Path>,
        #[source]
        source: io::Error,
    },

    /// An image could not be opened or decoded
    #[error("failed to open image {path}: {source}")]
    ImageOpen
    {
        path: Box<Path>,
        #[source]
        source: image::ImageError,
    },

    /// An image could not be encoded
    #[error("failed to encode {path} as {target_format}: {source}")]
    ImageEncode
    {
        path: Box<Path>,
        target_format: Box<str>,
        #[source]
        source: image::ImageError,
    },

    /// The format is unsupported
    #[error("unsupported image format: {extension}")]
    UnsupportedFormat
    {
        extension: Box<str>
    },

    /// A mask file is unusable
    #[error("invalid mask file {path}: {source}")]
    Mask
    {
        path: Box<Path>,
        #[source]
        source: MaskError,
    },

    /// A transform could not run
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// The main CLI parser
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Obfuscate RGB images with reversible byte transforms and \
             reconstruct them",
    after_help = formatcp!(
        "Stage tokens: xor, ror:K, rol:K, shl:K, shr:K, mask:SEED \
         (K in 0..=7). Default plan: {}",
        DEFAULT_PLAN
    )
)]
struct Cli
{
    #[command(subcommand)]
    command: Command,
}

/// The main command
#[derive(Subcommand)]
enum Command
{
    Encode(EncodingArgs),
    Decode(DecodingArgs),
    ShowMask(ShowMaskArgs),
}

/// Run the stage plan forward and save every intermediate.
#[derive(Args)]
struct EncodingArgs
{
    /// Image to obfuscate.
    input: Box<Path>,
    /// Image used as the XOR key. Must have the size of the input.
    secret: Box<Path>,
    /// Directory receiving P{n} images and M{n}.txt mask records.
    #[arg(
        short = 'o',
        long = "out-dir",
        value_name = "DIR",
        default_value = "."
    )]
    output_dir: Box<Path>,
    /// Image written over masked regions. Required by mask stages.
    #[arg(short = 'm', long = "mask", value_name = "PATH")]
    mask: Option<Box<Path>>,
    /// Comma separated stage plan.
    #[arg(long = "stages", value_name = "PLAN", default_value = DEFAULT_PLAN)]
    stages: Pipeline,
    /// Image format of the intermediates.
    #[arg(long = "format", value_name = "EXT", default_value = "bmp")]
    format: String,
}

/// Replay the inverse of the stage plan to reconstruct the source image.
#[derive(Args)]
struct DecodingArgs
{
    /// Final artifact of the forward run.
    input: Box<Path>,
    /// Image used as the XOR key during encoding.
    secret: Box<Path>,
    /// Output path for the reconstructed image.
    output: Box<Path>,
    /// Image that was written over masked regions.
    #[arg(short = 'm', long = "mask", value_name = "PATH")]
    mask: Option<Box<Path>>,
    /// Mask record files, in the order the masks were applied.
    #[arg(long = "mask-file", value_name = "PATH")]
    mask_files: Vec<Box<Path>>,
    /// Comma separated stage plan used for encoding.
    #[arg(long = "stages", value_name = "PLAN", default_value = DEFAULT_PLAN)]
    stages: Pipeline,
}

/// Print the content of a mask record file.
#[derive(Args)]
struct ShowMaskArgs
{
    /// Mask record file.
    input: Box<Path>,
}

/// Parses CLI arguments and executes the requested operation.
///
/// # Errors
///
/// Returns [`AppError`] when loading or saving images and mask files fails,
/// or when the transforms cannot run.
pub fn run() -> Result<(), AppError>
{
    let cli = Cli::parse();
    match cli.command
    {
        Command::Encode(args) => handle_encode(&args),
        Command::Decode(args) => handle_decode(&args, &mut io::stdout()),
        Command::ShowMask(args) => handle_show_mask(&args, &mut io::stdout()),
    }
}

/// Handles the forward run.
///
/// # Errors
///
/// Returns [`AppError`] when an input cannot be loaded, the buffers do not
/// fit together, or an output cannot be written.
fn handle_encode(args: &EncodingArgs) -> Result<(), AppError>
{
    let format = args.format.to_ascii_lowercase();
    ensure_supported(Some(format.as_str()))?;

    let source = load_buffer(&args.input)?;
    let secret = SecretBuffer::new(load_buffer(&args.secret)?);
    let mask = args.mask.as_ref().map(load_buffer).transpose()?;

    let mut encoder = Encoder::new(&args.stages, &secret);
    if let Some(mask) = mask.as_ref()
    {
        encoder = encoder.with_mask(mask);
    }
    let output = encoder.encode(source)?;

    fs::create_dir_all(&args.output_dir).map_err(|source| AppError::Write {
        path: args.output_dir.clone(),
        source,
    })?;

    for step in &output.intermediates
    {
        let path = args.output_dir.join(format!("{}.{format}", step.label));
        write_buffer(&step.buffer, Some(format.as_str()), path)?;
    }

    for (index, record) in output.records.iter().enumerate()
    {
        let path = args.output_dir.join(format!("M{}.txt", index + 1));
        save_mask(record, path)?;
    }

    Ok(())
}

/// Handles the inverse run, reporting to `out`.
///
/// The report is written before the reconstruction is saved, so a failed save
/// still leaves the restored values on the console.
///
/// # Errors
///
/// Returns [`AppError`] when a required image cannot be loaded, the buffers
/// do not fit together, the plan is not invertible, or the output cannot be
/// written. Unusable mask files are not errors.
fn handle_decode(
    args: &DecodingArgs,
    out: &mut impl Write,
) -> Result<(), AppError>
{
    let output_ext = normalized_extension(&args.output);
    ensure_supported(output_ext.as_deref())?;

    let artifact = load_buffer(&args.input)?;
    let secret = SecretBuffer::new(load_buffer(&args.secret)?);
    let mask = args.mask.as_ref().map(load_buffer).transpose()?;

    // Unusable mask files only cost their own restoration
    let mut planned_seeds = args.stages.mask_seeds();
    let mut records = Vec::with_capacity(args.mask_files.len());
    for path in &args.mask_files
    {
        let planned_seed = planned_seeds.next().unwrap_or_default();
        match load_mask(path)
        {
            Ok(record) =>
            {
                write_record(out, &record)?;
                records.push(record);
            },
            Err(err) =>
            {
                log::warn!("rejected mask record: {err}");
                records.push(MaskRecord::empty(planned_seed));
            },
        }
    }

    let mut decoder = Decoder::from_forward(&args.stages, records, &secret)?;
    if let Some(mask) = mask.as_ref()
    {
        decoder = decoder.with_mask(mask);
    }
    let output = decoder.decode(artifact)?;

    write_corrections(out, &output.corrections)?;
    out.flush()?;
    if !output.is_complete()
    {
        log::warn!("reconstruction incomplete, some regions were not restored");
    }

    write_buffer(&output.buffer, output_ext.as_deref(), &args.output)
}

/// Handles printing a mask record file to `out`.
///
/// # Errors
///
/// Returns [`AppError::Mask`] when the file is unusable.
fn handle_show_mask(
    args: &ShowMaskArgs,
    out: &mut impl Write,
) -> Result<(), AppError>
{
    let record = load_mask(&args.input)?;
    write_record(out, &record)?;
    out.flush()?;
    Ok(())
}
