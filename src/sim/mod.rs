//! Deterministic simulation module
//!
//! All vehicle and track logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (elevation sources are queried in a fixed order)
//! - No rendering or platform dependencies

pub mod collision;
pub mod elevation;
pub mod lap;
pub mod polyline;
pub mod state;
pub mod tick;
pub mod timestep;
pub mod track;
pub mod vehicle;

pub use collision::{CollisionResolver, bounce_velocity, reflect_velocity};
pub use elevation::{
    Bridge, ElevationField, ElevationSample, ElevationSource, GroundInfo, Hill, Ramp, SideContact, SideKind, Terrain,
    merge_samples,
};
pub use lap::{LapState, LapTracker};
pub use state::{ImpactEvent, ImpactKind, LapCompleted, SimEvent, Telemetry, VehicleState};
pub use tick::{Inspection, Simulation, TickInput};
pub use timestep::FixedTimestep;
pub use track::{Barrier, BarrierConfig, BarrierContact, Projection, Surface, Track};
pub use vehicle::{UpdateOutcome, VehicleDynamics};
