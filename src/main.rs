//! Racecore headless demo
//!
//! Builds a circuit (the built-in demo layout, or a JSON layout passed as the
//! first argument, with an optional tuning JSON as the second) and lets the
//! autopilot drive a few laps, logging what happens.
//!
//! `RUST_LOG=debug racecore` shows launches, landings and impacts as well.

#[cfg(not(target_arch = "wasm32"))]
use racecore::sim::{SimEvent, Simulation};
#[cfg(not(target_arch = "wasm32"))]
use racecore::{TrackLayout, VehicleTuning};

/// Laps to drive before stopping
#[cfg(not(target_arch = "wasm32"))]
const DEMO_LAPS: u32 = 3;
/// Give up after this much sim time (s)
#[cfg(not(target_arch = "wasm32"))]
const DEMO_TIME_LIMIT: f32 = 600.0;
/// Simulated render frame (60 fps)
#[cfg(not(target_arch = "wasm32"))]
const FRAME_DELTA: f32 = 1.0 / 60.0;
#[cfg(not(target_arch = "wasm32"))]
const AUTOPILOT_SPEED: f32 = 24.0;

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Racecore (native) starting...");

    if let Err(e) = run() {
        log::error!("{e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is driven by the host page on the web; nothing to run here
}

#[cfg(not(target_arch = "wasm32"))]
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);

    let layout = match args.next() {
        Some(path) => {
            log::info!("Loading layout from {path}");
            TrackLayout::from_json(&std::fs::read_to_string(path)?)?
        }
        None => TrackLayout::default(),
    };
    let tuning = match args.next() {
        Some(path) => {
            log::info!("Loading tuning from {path}");
            VehicleTuning::from_json(&std::fs::read_to_string(path)?)?
        }
        None => VehicleTuning::default(),
    };

    let mut sim = Simulation::new(layout.build()?, tuning)?;
    let mut impacts = 0;
    let mut jumps = 0;

    while sim.lap().lap_count < DEMO_LAPS && sim.time() < DEMO_TIME_LIMIT {
        let input = sim.autopilot(AUTOPILOT_SPEED);
        sim.advance(FRAME_DELTA, &input);

        for event in sim.drain_events() {
            match event {
                SimEvent::Impact(impact) => {
                    impacts += 1;
                    log::debug!("{:?} impact at {:.1} m/s", impact.kind, impact.speed);
                }
                SimEvent::Launched { .. } => jumps += 1,
                SimEvent::LapCompleted(lap) => {
                    println!(
                        "Lap {}: {:.2} s{}",
                        lap.lap,
                        lap.seconds,
                        if lap.best { " (best)" } else { "" }
                    );
                }
                _ => {}
            }
        }
    }

    let lap = sim.lap();
    match lap.best_lap_seconds {
        Some(best) => println!("{} laps, best {best:.2} s, {jumps} jumps, {impacts} impacts", lap.lap_count),
        None => println!("No lap completed in {DEMO_TIME_LIMIT} s ({jumps} jumps, {impacts} impacts)"),
    }
    Ok(())
}
