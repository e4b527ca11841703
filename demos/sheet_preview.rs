//! Plays a clip of a sprite sheet against a synthetic display refresh and
//! writes every rendered frame as a PNG.
//!
//! ```sh
//! cargo run --example sheet_preview -- hero.png hero.yaml walk --ticks 32 --out frames
//! ```

use std::{fs, path::PathBuf, rc::Rc, thread, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use flipbook::{
    assets::{FileImageLoader, SpriteSheetMetadata},
    geometry::Size,
    scheduler::FrameScheduler,
    sprites::{Animator, AnimatorSettings, AnimatorState, SpritePlayer},
    surface::PixelSurface,
    timing::{Clock, SteppedClock},
};

#[derive(Parser, Debug)]
#[command(about = "Render a sprite sheet clip into a sequence of PNG files")]
struct Args {
    /// Sprite sheet image (PNG)
    sheet: PathBuf,
    /// Sheet metadata, JSON or YAML depending on the extension
    metadata: PathBuf,
    /// Name of the clip to play
    clip: String,

    #[arg(long, default_value_t = 64)]
    width: u32,
    #[arg(long, default_value_t = 64)]
    height: u32,

    /// Play the clip once instead of looping it
    #[arg(long)]
    once: bool,

    /// Number of display refreshes to simulate
    #[arg(long, default_value_t = 60)]
    ticks: u64,

    /// Display refresh rate in Hz
    #[arg(long, default_value_t = 60.)]
    refresh: f32,

    /// Directory the frames are written to
    #[arg(long, default_value = "frames")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let metadata = SpriteSheetMetadata::load(&args.metadata)?;
    let clips = metadata.animations.keys().cloned().collect::<Vec<_>>();
    log::info!("Clips in {}: {}", args.metadata.display(), clips.join(", "));

    let root = args
        .sheet
        .parent()
        .map(PathBuf::from)
        .unwrap_or_default();
    let file_name = args
        .sheet
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} is not a file path", args.sheet.display()))?
        .to_owned();

    let settings = AnimatorSettings {
        output_size: Size::new(args.width, args.height),
        looping: !args.once,
        ..Default::default()
    };

    let animator = Animator::new(
        FileImageLoader::new(root),
        file_name,
        metadata,
        args.clip.clone(),
        settings,
    )
    .with_on_complete(|| log::info!("Clip finished"));

    let scheduler = Rc::new(FrameScheduler::default());
    let player = SpritePlayer::mount(
        scheduler.clone(),
        animator,
        PixelSurface::new(settings.output_size),
    );

    fs::create_dir_all(&args.out)
        .with_context(|| format!("Unable to create {}", args.out.display()))?;

    let mut clock = SteppedClock::new(args.refresh);
    let mut written = 0;
    let mut last_selection = None;

    for _ in 0..args.ticks {
        if scheduler.pending() == 0 {
            break;
        }

        // The sheet decodes on a worker thread, give it real time to arrive
        if player.animator().state() == AnimatorState::Unloaded {
            thread::sleep(Duration::from_secs_f32(1. / args.refresh.max(1.)));
        }

        scheduler.run_frame(clock.now());

        let selection = player.animator().selection();
        if selection.is_none() || selection == last_selection {
            continue;
        }
        last_selection = selection;

        let path = args.out.join(format!("{}_{:04}.png", args.clip, written));
        player.with_surface(|surface| surface.save_png(&path))?;
        written += 1;
    }

    let animator = player.animator();
    if let Some(error) = animator.last_error() {
        log::warn!("Last playback error: {error}");
    }
    log::info!(
        "Wrote {} frames to {}, animator is {}",
        written,
        args.out.display(),
        animator.state()
    );

    Ok(())
}
