//! Remove the watermark from a directory of video frames.
//!
//! Usage:
//! ```sh
//! cargo run --example remove_watermark -- frames/ recovered/
//! ```

use std::env;
use std::process;

use video_watermark_removal::WatermarkRemover;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <frames_dir> <output_dir>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];

    let remover = WatermarkRemover::new().expect("failed to load watermark template");
    match remover.process_directory(input.as_ref(), output.as_ref()) {
        Ok(summary) => println!(
            "Recovered {} frames (shift dx={}, dy={})",
            summary.frames, summary.shift.dx, summary.shift.dy
        ),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
