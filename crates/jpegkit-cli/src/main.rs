use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use jpegkit_core::{
    decode_bytes, decode_reader, encode_file, encode_to_vec, last_error_message, resize_with,
    ResizeMode, ResizeRequest, ScalePolicy,
};
use log::{debug, info};

/// Smoke test for jpegkit: decode, re-encode, resize and thumbnail one JPEG.
#[derive(Parser, Debug)]
#[command(name = "jpegkit")]
#[command(about = "Decode a JPEG, re-encode it and write resized copies")]
struct Cli {
    /// Input JPEG file
    input: PathBuf,

    /// Directory the output files are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Quality for test_same.jpg and test_big.jpg (0 = codec defaults)
    #[arg(long, default_value_t = 75)]
    quality: i32,

    /// Quality for the in-memory thumbnail
    #[arg(long, default_value_t = 60)]
    thumb_quality: i32,

    /// Bounding box for the RESIZE copy
    #[arg(long, default_value_t = 2048)]
    big: u32,

    /// Edge length of the square CROP thumbnail
    #[arg(long, default_value_t = 128)]
    thumb: u32,

    /// Use integer-truncating scale factors (downscale only)
    #[arg(long)]
    downscale_only: bool,

    /// Log pipeline details
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn policy(&self) -> ScalePolicy {
        if self.downscale_only {
            ScalePolicy::IntegerTruncating
        } else {
            ScalePolicy::Fractional
        }
    }
}

/// Which stage failed, and so which exit code to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Codec,
    Transform,
}

impl Stage {
    fn exit_code(self) -> ExitCode {
        match self {
            Stage::Codec => ExitCode::from(1),
            Stage::Transform => ExitCode::from(2),
        }
    }
}

#[derive(Debug)]
struct Failure {
    stage: Stage,
    error: anyhow::Error,
}

trait StageExt<T> {
    fn stage(self, stage: Stage) -> Result<T, Failure>;
}

impl<T> StageExt<T> for Result<T> {
    fn stage(self, stage: Stage) -> Result<T, Failure> {
        self.map_err(|error| Failure { stage, error })
    }
}

/// Output files written by a successful run.
#[derive(Debug)]
struct Outputs {
    same: PathBuf,
    big: PathBuf,
    thumb: PathBuf,
    thumb_bytes: usize,
}

fn run(cli: &Cli) -> Result<Outputs, Failure> {
    let same = cli.out_dir.join("test_same.jpg");
    let big = cli.out_dir.join("test_big.jpg");
    let thumb = cli.out_dir.join("test_thumb.jpg");

    // Stream source
    let file = File::open(&cli.input)
        .with_context(|| format!("Failed to open {}", cli.input.display()))
        .stage(Stage::Codec)?;
    let image = decode_reader(BufReader::new(file))
        .with_context(|| format!("Failed to decode {}", cli.input.display()))
        .stage(Stage::Codec)?;
    println!("Decoded {}: {}x{}", cli.input.display(), image.width, image.height);

    encode_to(&image, cli.quality, &same).stage(Stage::Codec)?;
    drop(image);

    // Memory source
    let bytes = fs::read(&cli.input)
        .with_context(|| format!("Failed to read {}", cli.input.display()))
        .stage(Stage::Codec)?;
    let image = decode_bytes(&bytes)
        .context("Failed to decode from memory")
        .stage(Stage::Codec)?;

    let fit = ResizeRequest::new(cli.big, cli.big, ResizeMode::Resize).with_policy(cli.policy());
    let resized = resize_with(&image, &fit)
        .context("Failed to resize")
        .stage(Stage::Transform)?;
    println!("Resized to {}x{}", resized.width, resized.height);
    encode_to(&resized, cli.quality, &big).stage(Stage::Codec)?;

    let fill = ResizeRequest::new(cli.thumb, cli.thumb, ResizeMode::Crop).with_policy(cli.policy());
    let cropped = resize_with(&image, &fill)
        .context("Failed to crop thumbnail")
        .stage(Stage::Transform)?;
    let jpeg = encode_to_vec(&cropped, cli.thumb_quality)
        .context("Failed to encode thumbnail into memory")
        .stage(Stage::Transform)?;
    fs::write(&thumb, &jpeg)
        .with_context(|| format!("Failed to write {}", thumb.display()))
        .stage(Stage::Codec)?;
    println!("Thumbnail: {} bytes", jpeg.len());

    Ok(Outputs {
        same,
        big,
        thumb,
        thumb_bytes: jpeg.len(),
    })
}

fn encode_to(image: &jpegkit_core::Raster, quality: i32, path: &Path) -> Result<()> {
    let written = encode_file(image, quality, path)
        .with_context(|| format!("Failed to encode {}", path.display()))?;
    info!("wrote {} ({} bytes)", path.display(), written);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!("{:?}", cli);

    match run(&cli) {
        Ok(outputs) => {
            debug!("outputs: {:?}", outputs);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("error: {:#}", failure.error);
            let diagnostic = last_error_message();
            if !diagnostic.is_empty() {
                eprintln!("codec: {}", diagnostic);
            }
            failure.stage.exit_code()
        }
    }
}
