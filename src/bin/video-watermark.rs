use std::path::PathBuf;
use std::process;

use clap::Parser;

use video_watermark_removal::{WatermarkRemover, DEFAULT_TEMPLATE_PATH, TEMPLATE_PATH_ENV};

#[derive(Parser)]
#[command(
    name = "video-watermark",
    about = "Remove a static video watermark via FFT alignment and inverse alpha blending",
    version,
    after_help = "The input directory is read as one video: every supported frame image\n\
                  (png/jpg/jpeg/webp/bmp), in lexicographic order. Recovered frames are\n\
                  written to the output directory as PNG.\n\n\
                  The watermark template is an RGBA floating-point image (e.g. OpenEXR),\n\
                  resolved from --template, the VIDEO_WATERMARK_TEMPLATE environment\n\
                  variable, or ./watermark.exr."
)]
struct Cli {
    /// Directory of frame images forming one video
    input: PathBuf,

    /// Directory to write recovered frames to
    #[arg(short, long)]
    output: PathBuf,

    /// Watermark template image (RGBA, floating-point)
    #[arg(short, long)]
    template: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    let cli = Cli::parse();

    if !cli.input.is_dir() {
        eprintln!("Error: Input is not a directory: {}", cli.input.display());
        process::exit(1);
    }

    let remover = match &cli.template {
        Some(path) => WatermarkRemover::from_template_path(path),
        None => WatermarkRemover::new(),
    };
    let remover = match remover {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Fatal: Failed to load watermark template: {e}");
            eprintln!(
                "Hint: pass --template, set {TEMPLATE_PATH_ENV}, or place {DEFAULT_TEMPLATE_PATH} \
                 in the working directory"
            );
            process::exit(1);
        }
    };

    if cli.verbose && !cli.quiet {
        eprintln!(
            "Template is {}x{}",
            remover.template().width(),
            remover.template().height()
        );
        eprintln!("Reading frames from {}", cli.input.display());
    }

    match remover.process_directory(&cli.input, &cli.output) {
        Ok(summary) => {
            if !cli.quiet {
                eprintln!(
                    "[OK] {} frames recovered (watermark shift dx={}, dy={}) -> {}",
                    summary.frames,
                    summary.shift.dx,
                    summary.shift.dy,
                    summary.output_dir.display()
                );
            }
        }
        Err(e) => {
            eprintln!("[FAIL] {}: {e}", cli.input.display());
            process::exit(1);
        }
    }
}
