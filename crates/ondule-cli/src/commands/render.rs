//! Offline rendering of a patch to a WAV file.

use crate::commands::common::load_patch;
use crate::wav::{WavSpec, write_wav};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use ondule_objects::ObjectRegistry;
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderArgs {
    /// Patch file (TOML) or factory patch name
    #[arg(value_name = "PATCH")]
    patch: String,

    /// Number of frames to render
    #[arg(short, long, default_value = "1500")]
    frames: usize,

    /// Output WAV file
    #[arg(short, long, value_name = "OUTPUT")]
    output: PathBuf,

    /// Output bit depth (16, 24, or 32)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let patch = load_patch(&args.patch)?;
    let live = patch.instantiate(&ObjectRegistry::new())?;
    let engine = live.engine();
    let ctx = engine.context();
    let config = ctx.config();

    if !live.compilation().is_complete() {
        tracing::warn!(
            "{} object(s) could not be ordered and will not run",
            live.compilation().unresolved.len()
        );
    }

    println!(
        "Rendering '{}': {} frames of {} samples at {} Hz ({:.2}s)",
        patch.name,
        args.frames,
        config.frame_length,
        config.sample_rate,
        args.frames as f32 * config.frame_period()
    );

    let pb = ProgressBar::new(args.frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );

    let input = vec![0.0; engine.input_frame_len()];
    let frame_len = engine.output_frame_len();
    let mut output = vec![0.0; args.frames * frame_len];
    for (i, chunk) in output.chunks_exact_mut(frame_len.max(1)).enumerate() {
        engine.process_frame(&input, chunk);
        if i % 64 == 0 {
            pb.set_position(i as u64);
        }
    }
    pb.finish_with_message("done");

    let channels = config.output_channels.max(1);
    println!("\nStats:");
    for ch in 0..channels {
        let peak = output
            .iter()
            .skip(ch)
            .step_by(channels)
            .fold(0.0f32, |m, s| m.max(s.abs()));
        println!("  Channel {ch}: Peak {:.1} dB", linear_to_db(peak));
    }

    let spec = WavSpec {
        channels: u16::try_from(channels)?,
        sample_rate: config.sample_rate,
        bits_per_sample: args.bit_depth,
    };
    println!("\nWriting {}...", args.output.display());
    write_wav(&args.output, &output, spec)?;
    tracing::info!("wrote {} samples to {}", output.len(), args.output.display());
    println!("Done!");

    Ok(())
}

fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}
