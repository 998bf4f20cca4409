//! Audience members
//!
//! Each member listens to stage events and runs its own interruption loop
//! and clap envelope against its own playback rig.

pub mod envelope;
pub mod member;
pub mod rig;

pub use envelope::{ClapDirection, ClapEnvelope};
pub use member::{AudienceMember, Behavior};
pub use rig::AudienceRig;
