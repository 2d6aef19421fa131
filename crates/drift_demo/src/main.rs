//! Drift Demo
//!
//! Two blue and two red bots play a headless match in a small arena. The
//! navigation map is built a surface per frame while they play; until it is
//! ready the bots jump without planning.
//!
//! Run with: cargo run -p drift_demo -- [frames] [seed]
//!
//! Set `DRIFT_NAV_CACHE` to a directory to keep navigation maps between runs.

mod arena;

use arena::Match;
use drift_ai::NavCache;

const FRAME_MS: u64 = 16;
const DEFAULT_FRAMES: u64 = 60 * 60;
const REPORT_EVERY: u64 = 600;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let frames = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_FRAMES);
    let seed = args
        .next()
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1);
    let cache = std::env::var_os("DRIFT_NAV_CACHE").map(NavCache::new);

    if let Err(e) = run(frames, seed, cache) {
        log::error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

fn run(frames: u64, seed: u64, cache: Option<NavCache>) -> Result<(), Box<dyn std::error::Error>> {
    log::info!("Playing {} frames with seed {}", frames, seed);
    let mut game = Match::new(seed, cache)?;

    for frame in 1..=frames {
        game.step(FRAME_MS)?;
        if frame % REPORT_EVERY == 0 {
            game.report();
        }
    }

    log::info!("Final state after {} ms", game.now_ms());
    game.report();
    Ok(())
}
