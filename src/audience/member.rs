//! Audience member behavior state machine

use rand::rngs::StdRng;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::task::Poll;

use super::envelope::{ClapDirection, ClapEnvelope};
use super::rig::AudienceRig;
use crate::catalog::{InterruptionCatalog, NO_ANIMATION};
use crate::config::AudienceConfig;
use crate::events::{StageEvent, StageListener};
use crate::tasks::{TaskId, TaskSet, TIME_EPSILON};

/// What a member is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    #[default]
    Idle,
    Interrupting,
    Clapping,
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Behavior::Idle => write!(f, "idle"),
            Behavior::Interrupting => write!(f, "interrupting"),
            Behavior::Clapping => write!(f, "clapping"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum MemberTask {
    /// Counting down to the next interruption
    InterruptionDelay { remaining: f64 },
    /// Waiting for the rig to report its idle animation again
    AnimationMonitor,
    /// Clap envelope
    ClapRamp(ClapEnvelope),
}

impl MemberTask {
    /// Tasks that belong to the idle/interruption loop
    fn is_interruption(&self) -> bool {
        matches!(
            self,
            MemberTask::InterruptionDelay { .. } | MemberTask::AnimationMonitor
        )
    }

    fn is_clap_ramp(&self) -> bool {
        matches!(self, MemberTask::ClapRamp(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    DelayElapsed,
    AnimationIdle,
    RampSilent,
}

/// One simulated spectator
pub struct AudienceMember {
    name: String,
    config: AudienceConfig,
    catalog: Arc<InterruptionCatalog>,
    rig: Box<dyn AudienceRig>,
    rng: StdRng,
    behavior: Behavior,
    follows_performance: bool,
    clap_direction: ClapDirection,
    tasks: TaskSet<MemberTask>,
    delay_task: Option<TaskId>,
}

impl fmt::Debug for AudienceMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudienceMember")
            .field("name", &self.name)
            .field("behavior", &self.behavior)
            .field("follows_performance", &self.follows_performance)
            .field("clap_direction", &self.clap_direction)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl AudienceMember {
    pub fn new(
        name: impl Into<String>,
        config: AudienceConfig,
        catalog: Arc<InterruptionCatalog>,
        rig: Box<dyn AudienceRig>,
        rng: StdRng,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            catalog,
            rig,
            rng,
            behavior: Behavior::Idle,
            follows_performance: false,
            clap_direction: ClapDirection::Idle,
            tasks: TaskSet::new(),
            delay_task: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// This member's belief about whether a performance is running
    pub fn follows_performance(&self) -> bool {
        self.follows_performance
    }

    pub fn clap_direction(&self) -> ClapDirection {
        self.clap_direction
    }

    /// Elapsed time on the clap envelope, if one is running
    pub fn clap_elapsed(&self) -> Option<f32> {
        self.clap_envelope().map(ClapEnvelope::elapsed)
    }

    /// Current clap volume/speed level, 0 when not clapping
    pub fn clap_level(&self) -> f32 {
        self.clap_envelope().map(ClapEnvelope::level).unwrap_or(0.0)
    }

    /// Seconds left before the next interruption fires, if one is scheduled
    pub fn next_interruption_in(&self) -> Option<f32> {
        match self.tasks.get(self.delay_task?) {
            Some(MemberTask::InterruptionDelay { remaining }) => Some(*remaining as f32),
            _ => None,
        }
    }

    /// An interruption wait or animation monitor is pending
    pub fn has_pending_interruption(&self) -> bool {
        self.tasks.any(MemberTask::is_interruption)
    }

    fn clap_envelope(&self) -> Option<&ClapEnvelope> {
        self.tasks.iter().find_map(|(_, task)| match task {
            MemberTask::ClapRamp(envelope) => Some(envelope),
            _ => None,
        })
    }

    /// Resume every suspended activity once
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let direction = self.clap_direction;
        let Self {
            tasks,
            rig,
            config,
            ..
        } = self;

        let finished = tasks.poll_all(|task| match task {
            MemberTask::InterruptionDelay { remaining } => {
                *remaining -= f64::from(dt);
                if *remaining <= TIME_EPSILON {
                    Poll::Ready(TaskOutcome::DelayElapsed)
                } else {
                    Poll::Pending
                }
            }
            MemberTask::AnimationMonitor => {
                if rig.animation_state() == config.idle_animation_state {
                    Poll::Ready(TaskOutcome::AnimationIdle)
                } else {
                    Poll::Pending
                }
            }
            MemberTask::ClapRamp(envelope) => {
                let level = envelope.advance(dt, direction);
                rig.set_loop_volume(level);
                rig.set_animation_speed(level);
                if direction == ClapDirection::Decreasing && envelope.is_silent() {
                    Poll::Ready(TaskOutcome::RampSilent)
                } else {
                    Poll::Pending
                }
            }
        });

        for (_, outcome) in finished {
            match outcome {
                TaskOutcome::DelayElapsed => self.fire_interruption(),
                TaskOutcome::AnimationIdle => self.finish_interruption(),
                TaskOutcome::RampSilent => self.finish_clapping(),
            }
        }
    }

    fn begin_following(&mut self) {
        self.follows_performance = true;
        if let Some(id) = self.delay_task.take() {
            if self.tasks.cancel(id).is_some() {
                tracing::debug!("{}: dropped stale interruption wait", self.name);
            }
        }
        self.schedule_interruption();
    }

    fn stop_following(&mut self) {
        self.follows_performance = false;
        let had_tasks = !self.tasks.is_empty();
        self.tasks.clear();
        self.delay_task = None;

        self.rig.stop_looping();
        if had_tasks || self.behavior != Behavior::Idle {
            self.rig.set_animation_speed(1.0);
            self.rig.trigger_animation(NO_ANIMATION);
        }

        self.behavior = Behavior::Idle;
        self.clap_direction = ClapDirection::Idle;
        tracing::debug!("{}: stopped following the performance", self.name);
    }

    fn schedule_interruption(&mut self) {
        if !self.follows_performance || self.behavior != Behavior::Idle {
            return;
        }
        if self.catalog.general().is_empty() {
            tracing::debug!("{}: no interruptions in catalog, staying quiet", self.name);
            return;
        }
        if self.delay_task.is_some_and(|id| self.tasks.contains(id)) {
            return;
        }

        let delay = self.draw_delay();
        self.delay_task = Some(self.tasks.spawn(MemberTask::InterruptionDelay {
            remaining: f64::from(delay),
        }));
        tracing::debug!("{}: next interruption in {:.1}s", self.name, delay);
    }

    /// Uniform draw around the mean delay, clamped at zero
    fn draw_delay(&mut self) -> f32 {
        let mean = self.config.interruption_delay_time;
        let spread = self.config.interruption_variability;
        if spread <= 0.0 {
            return mean.max(0.0);
        }
        self.rng
            .random_range((mean - spread)..=(mean + spread))
            .max(0.0)
    }

    fn fire_interruption(&mut self) {
        self.delay_task = None;
        if !self.follows_performance {
            tracing::debug!("{}: performance over, interruption dropped", self.name);
            return;
        }
        if self.behavior != Behavior::Idle {
            return;
        }
        let Some(def) = self.catalog.pick_general(&mut self.rng).cloned() else {
            return;
        };

        if let Some(sound) = &def.sound {
            self.rig.play_one_shot(sound);
        }
        self.rig.trigger_animation(def.animation_id);
        self.behavior = Behavior::Interrupting;
        self.tasks.spawn(MemberTask::AnimationMonitor);

        tracing::info!(
            "{}: interruption (animation {}, sound {})",
            self.name,
            def.animation_id,
            def.sound
                .as_ref()
                .map(|s| s.as_str())
                .unwrap_or("none")
        );
    }

    fn finish_interruption(&mut self) {
        self.behavior = Behavior::Idle;
        self.rig.trigger_animation(NO_ANIMATION);
        tracing::debug!("{}: back to idle", self.name);
        self.schedule_interruption();
    }

    fn start_clapping(&mut self) {
        let cancelled = self.tasks.cancel_where(MemberTask::is_interruption);
        self.delay_task = None;
        if cancelled > 0 {
            tracing::debug!("{}: clapping preempts pending interruption", self.name);
        }

        self.behavior = Behavior::Clapping;
        self.clap_direction = ClapDirection::Increasing;

        if self.tasks.any(MemberTask::is_clap_ramp) {
            return;
        }

        match self.catalog.pick_clap(&mut self.rng).cloned() {
            Some(def) => {
                self.rig.set_loop_volume(0.0);
                if let Some(sound) = &def.sound {
                    self.rig.play_loop(sound);
                }
                self.rig.trigger_animation(def.animation_id);
                tracing::debug!("{}: clapping (animation {})", self.name, def.animation_id);
            }
            None => {
                self.rig.set_loop_volume(0.0);
                tracing::debug!("{}: no clap definitions, clapping silently", self.name);
            }
        }
        self.rig.set_animation_speed(0.0);
        self.tasks
            .spawn(MemberTask::ClapRamp(ClapEnvelope::new(self.config.clap_ramp_duration)));
    }

    fn stop_clapping(&mut self) {
        if self.tasks.any(MemberTask::is_clap_ramp) {
            self.clap_direction = ClapDirection::Decreasing;
        }
    }

    fn finish_clapping(&mut self) {
        self.rig.stop_looping();
        self.rig.set_animation_speed(1.0);
        self.rig.trigger_animation(NO_ANIMATION);
        self.behavior = Behavior::Idle;
        self.clap_direction = ClapDirection::Idle;
        tracing::debug!("{}: applause faded out", self.name);
        self.schedule_interruption();
    }
}

impl StageListener for AudienceMember {
    fn on_stage_event(&mut self, event: StageEvent) {
        match event {
            StageEvent::PerformanceStarted => self.begin_following(),
            StageEvent::PerformanceEnded => self.stop_following(),
            StageEvent::ClappingStarted => self.start_clapping(),
            StageEvent::ClappingStopped => self.stop_clapping(),
        }
    }
}
