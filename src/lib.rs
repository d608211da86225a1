// ============================================================================
// CRATE CONFIGURATION & IMPORTS
// ============================================================================

//! Wind instrument core: compass-safe smooth rotations plus layline and
//! wind-shift sector geometry, with a small pixel renderer for the demo.

pub mod angle;
pub mod config;
pub mod display;
pub mod error;
pub mod geometry;
pub mod render;
pub mod rotation;

// ============================================================================
// PUBLIC API - MAIN INTERFACE
// ============================================================================

pub use angle::{add_heading, signed_angle_between, wrap360, Point};
pub use config::{Color, DialStyle, DisplayConfig, WindowConfig};
pub use display::{Frame, TelemetryCommand, TelemetrySample, WindInstrument};
pub use error::DisplayError;
pub use geometry::{
    compute_laylines, compute_sectors, HistoricWind, Layline, LaylinePair, Path, PathSegment,
    SectorPath, WindSector, WindSectorTracker,
};
pub use render::Animator;
pub use rotation::{
    plan_route, RotationChannel, RotationCommand, RotationController, RotationPhase,
    RotationState, RotationStep,
};
