//! Stage assembly
//!
//! A [`Stage`] ties one controller to its seated audience and a loudness
//! source. Each tick samples the source, runs the controller (every event is
//! delivered to the audience before the controller returns) and then resumes
//! every member's pending activities.

pub mod controller;
pub mod lights;

pub use controller::{PerformancePhase, PerformanceState, StageController};
pub use lights::{LightPhase, LightRamp, LightingSink, RampKind, DIMMED_INTENSITY, FULL_INTENSITY};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::audience::{AudienceMember, AudienceRig, Behavior};
use crate::catalog::InterruptionCatalog;
use crate::config::{AudienceConfig, Config};
use crate::error::{OvationError, StageError};
use crate::events::{EventBus, StageEvent, SubscriberId};
use crate::input::LoudnessSource;

/// Builds the rig for the seat at the given index
pub type RigFactory = Box<dyn FnMut(usize) -> Box<dyn AudienceRig>>;

/// A controller, its audience and the loudness feeding it
pub struct Stage {
    controller: StageController,
    audience: EventBus<AudienceMember>,
    loudness: Box<dyn LoudnessSource>,
    catalog: Arc<InterruptionCatalog>,
    audience_config: AudienceConfig,
    rng: StdRng,
    elapsed: f64,
    ticks: u64,
    last_loudness: f32,
}

impl Stage {
    pub fn builder(config: &Config) -> StageBuilder {
        StageBuilder::new(config.clone())
    }

    pub fn controller(&self) -> &StageController {
        &self.controller
    }

    pub fn catalog(&self) -> &Arc<InterruptionCatalog> {
        &self.catalog
    }

    /// Seated members in registration order
    pub fn members(&self) -> impl Iterator<Item = &AudienceMember> {
        self.audience.listeners()
    }

    pub fn member(&self, id: SubscriberId) -> Option<&AudienceMember> {
        self.audience.get(id)
    }

    pub fn audience_size(&self) -> usize {
        self.audience.len()
    }

    pub fn is_performing(&self) -> bool {
        self.controller.is_performing()
    }

    /// Simulated seconds since the stage was built
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Subscribe to a copy of every stage event
    pub fn observe(&self) -> broadcast::Receiver<StageEvent> {
        self.audience.observe()
    }

    /// Seat another member. They stay idle until the next performance starts.
    pub fn seat(&mut self, name: impl Into<String>, rig: Box<dyn AudienceRig>) -> SubscriberId {
        let rng = StdRng::seed_from_u64(self.rng.random());
        let member = AudienceMember::new(
            name,
            self.audience_config.clone(),
            Arc::clone(&self.catalog),
            rig,
            rng,
        );
        let id = self.audience.subscribe(member);
        tracing::debug!("Seated member {}", id);
        id
    }

    /// Remove a member; they receive no further events or ticks
    pub fn unseat(&mut self, id: SubscriberId) -> Option<AudienceMember> {
        self.audience.unsubscribe(id)
    }

    /// Advance by `dt` seconds using the next sample from the loudness source
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            tracing::warn!("Ignoring stage tick with invalid dt: {}", dt);
            return;
        }
        let loudness = self.loudness.sample(dt);
        self.tick_with(loudness, dt);
    }

    /// Advance by `dt` seconds with an explicit loudness sample
    pub fn tick_with(&mut self, loudness: f32, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            tracing::warn!("Ignoring stage tick with invalid dt: {}", dt);
            return;
        }

        self.controller.tick(loudness, dt, &mut self.audience);
        for member in self.audience.listeners_mut() {
            member.tick(dt);
        }

        self.last_loudness = loudness;
        self.elapsed += f64::from(dt);
        self.ticks += 1;
    }

    /// Manual trigger. Returns false if a performance was already running.
    pub fn start_performance(&mut self) -> bool {
        self.controller.start_performance(&mut self.audience)
    }

    /// Manual stop. Returns false if no performance was running.
    pub fn end_performance(&mut self) -> bool {
        self.controller.end_performance(&mut self.audience)
    }

    pub fn toggle_automatic_ending(&mut self) -> bool {
        self.controller.toggle_automatic_ending()
    }

    pub fn snapshot(&self) -> StageSnapshot {
        let mut behaviors = BehaviorCounts::default();
        let members = self
            .audience
            .listeners()
            .map(|member| {
                behaviors.count(member.behavior());
                MemberSnapshot {
                    name: member.name().to_string(),
                    behavior: member.behavior(),
                    clap_level: member.clap_level(),
                    next_interruption_in: member.next_interruption_in(),
                }
            })
            .collect();

        StageSnapshot {
            elapsed: self.elapsed,
            ticks: self.ticks,
            loudness: self.last_loudness,
            phase: self.controller.state().phase(),
            light_phase: self.controller.light_phase(),
            automatic_ending: self.controller.automatic_ending(),
            state: self.controller.state().clone(),
            behaviors,
            members,
        }
    }
}

/// Point-in-time view of the whole stage
#[derive(Debug, Clone, Serialize)]
pub struct StageSnapshot {
    pub elapsed: f64,
    pub ticks: u64,
    /// Last raw loudness sample
    pub loudness: f32,
    pub phase: PerformancePhase,
    pub light_phase: LightPhase,
    pub automatic_ending: bool,
    pub state: PerformanceState,
    pub behaviors: BehaviorCounts,
    pub members: Vec<MemberSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSnapshot {
    pub name: String,
    pub behavior: Behavior,
    pub clap_level: f32,
    pub next_interruption_in: Option<f32>,
}

/// How many members are in each behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BehaviorCounts {
    pub idle: usize,
    pub interrupting: usize,
    pub clapping: usize,
}

impl BehaviorCounts {
    fn count(&mut self, behavior: Behavior) {
        match behavior {
            Behavior::Idle => self.idle += 1,
            Behavior::Interrupting => self.interrupting += 1,
            Behavior::Clapping => self.clapping += 1,
        }
    }
}

/// Collects a stage's collaborators and checks they are all present
pub struct StageBuilder {
    config: Config,
    catalog: Option<Arc<InterruptionCatalog>>,
    lighting: Option<Box<dyn LightingSink>>,
    loudness: Option<Box<dyn LoudnessSource>>,
    rig_factory: Option<RigFactory>,
}

impl StageBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            catalog: None,
            lighting: None,
            loudness: None,
            rig_factory: None,
        }
    }

    pub fn catalog(mut self, catalog: impl Into<Arc<InterruptionCatalog>>) -> Self {
        self.catalog = Some(catalog.into());
        self
    }

    pub fn lighting(mut self, lighting: impl LightingSink + 'static) -> Self {
        self.lighting = Some(Box::new(lighting));
        self
    }

    pub fn loudness(mut self, loudness: impl LoudnessSource + 'static) -> Self {
        self.loudness = Some(Box::new(loudness));
        self
    }

    pub fn boxed_loudness(mut self, loudness: Box<dyn LoudnessSource>) -> Self {
        self.loudness = Some(loudness);
        self
    }

    /// Rig for each seat, called once per member with the seat index
    pub fn rig_factory<F>(mut self, factory: F) -> Self
    where
        F: FnMut(usize) -> Box<dyn AudienceRig> + 'static,
    {
        self.rig_factory = Some(Box::new(factory));
        self
    }

    pub fn build(self) -> Result<Stage, OvationError> {
        self.config.validate()?;

        let catalog = self
            .catalog
            .ok_or(StageError::MissingCollaborator("interruption catalog"))?;
        let lighting = self
            .lighting
            .ok_or(StageError::MissingCollaborator("lighting sink"))?;
        let loudness = self
            .loudness
            .ok_or(StageError::MissingCollaborator("loudness source"))?;

        let audience_config = self.config.audience.clone();
        let seats = audience_config.members;
        let mut rig_factory = match self.rig_factory {
            Some(factory) => Some(factory),
            None if seats == 0 => None,
            None => return Err(StageError::MissingCollaborator("audience rig").into()),
        };

        let rng = match audience_config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut stage = Stage {
            controller: StageController::new(self.config.stage.clone(), lighting),
            audience: EventBus::new(),
            loudness,
            catalog,
            audience_config,
            rng,
            elapsed: 0.0,
            ticks: 0,
            last_loudness: 0.0,
        };

        if let Some(factory) = rig_factory.as_mut() {
            for seat in 0..seats {
                let rig = factory(seat);
                stage.seat(format!("seat-{}", seat), rig);
            }
        }

        tracing::info!(
            "Stage ready: {} members, {} interruptions, {} claps",
            stage.audience_size(),
            stage.catalog.general().len(),
            stage.catalog.claps().len()
        );

        Ok(stage)
    }
}
