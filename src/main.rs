//! Loopwright entry point
//!
//! Runs one track search and prints the world polyline as JSON.
//!
//! Usage: `loopwright [snapped|tile] [seed] [variant] [half_width] [half_height]`

#[cfg(not(target_arch = "wasm32"))]
use std::process::ExitCode;

#[cfg(not(target_arch = "wasm32"))]
use glam::Vec2;
#[cfg(not(target_arch = "wasm32"))]
use loopwright::{GenSettings, Strategy, TrackGenerator};
#[cfg(not(target_arch = "wasm32"))]
use serde::Serialize;

#[cfg(not(target_arch = "wasm32"))]
const USAGE: &str = "loopwright [snapped|tile] [seed] [variant] [half_width] [half_height]";

#[cfg(not(target_arch = "wasm32"))]
#[derive(Serialize)]
struct TrackOutput<'a> {
    strategy: &'a str,
    seed: i32,
    variant: i32,
    points: &'a [Vec2],
}

#[cfg(not(target_arch = "wasm32"))]
struct Args {
    strategy: Strategy,
    seed: i32,
    variant: i32,
    half_width: f32,
    half_height: f32,
}

#[cfg(not(target_arch = "wasm32"))]
fn parse_args(args: &[String]) -> Result<Args, String> {
    fn nth<T: std::str::FromStr>(
        args: &[String],
        i: usize,
        name: &str,
        default: T,
    ) -> Result<T, String> {
        match args.get(i) {
            Some(raw) => raw.parse().map_err(|_| format!("invalid {name}: {raw:?}")),
            None => Ok(default),
        }
    }

    let strategy = match args.first() {
        Some(raw) => Strategy::from_str(raw).ok_or_else(|| format!("unknown strategy: {raw:?}"))?,
        None => Strategy::Snapped,
    };
    let parsed = Args {
        strategy,
        seed: nth(args, 1, "seed", 1000)?,
        variant: nth(args, 2, "variant", 0)?,
        half_width: nth(args, 3, "half_width", 32.0)?,
        half_height: nth(args, 4, "half_height", 32.0)?,
    };
    for (name, value) in [("half_width", parsed.half_width), ("half_height", parsed.half_height)] {
        if !(value.is_finite() && value > 0.0) {
            return Err(format!("{name} must be positive, got {value}"));
        }
    }
    Ok(parsed)
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("error: {msg}");
            eprintln!("usage: {USAGE}");
            return ExitCode::from(2);
        }
    };

    log::info!(
        "Generating {} track: seed {} variant {} extents {}x{}",
        args.strategy,
        args.seed,
        args.variant,
        args.half_width,
        args.half_height
    );
    let generator = TrackGenerator::new(GenSettings::for_strategy(args.strategy));
    let track = generator.generate(args.half_width, args.half_height, args.seed, args.variant);
    let Some(track) = track else {
        eprintln!("error: no track found within the attempt budget");
        return ExitCode::FAILURE;
    };

    let output = TrackOutput {
        strategy: args.strategy.as_str(),
        seed: args.seed,
        variant: args.variant,
        points: track.points(),
    };
    match serde_json::to_string(&output) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to encode track: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // No CLI on the web; callers link the library directly
}
