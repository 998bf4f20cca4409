//! Output module
//!
//! Stand-in collaborators for running a stage without real hardware:
//! - Lighting sink that reports intensity through tracing
//! - Audience rig that plays clips and animations on a simulated clock

pub mod clock;
pub mod lights;
pub mod rig;

pub use clock::SimClock;
pub use lights::TracingLights;
pub use rig::SimulatedRig;
