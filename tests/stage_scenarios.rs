//! End-to-end stage runs: controller, event bus and audience together

use std::cell::RefCell;
use std::rc::Rc;

use ovation::audience::{AudienceRig, Behavior};
use ovation::catalog::{InterruptionCatalog, InterruptionDefinition, SoundHandle, StaticSource};
use ovation::config::Config;
use ovation::error::{OvationError, StageError};
use ovation::input::{ConstantLoudness, ScriptedLoudness, SyntheticPerformer};
use ovation::output::{SimClock, SimulatedRig};
use ovation::stage::{LightPhase, LightingSink, DIMMED_INTENSITY, FULL_INTENSITY};
use ovation::{Stage, StageEvent};
use rand::rngs::StdRng;
use rand::SeedableRng;

struct NullLights;

impl LightingSink for NullLights {
    fn set_intensity(&mut self, _intensity: f32) {}
}

#[derive(Debug, Default)]
struct RigLog {
    loops: Vec<String>,
    volumes: Vec<f32>,
    animations: Vec<u32>,
}

struct RecordingRig(Rc<RefCell<RigLog>>);

impl AudienceRig for RecordingRig {
    fn play_one_shot(&mut self, _clip: &SoundHandle) {}

    fn play_loop(&mut self, clip: &SoundHandle) {
        self.0.borrow_mut().loops.push(clip.to_string());
    }

    fn stop_looping(&mut self) {}

    fn set_loop_volume(&mut self, volume: f32) {
        self.0.borrow_mut().volumes.push(volume);
    }

    fn trigger_animation(&mut self, animation_id: u32) {
        self.0.borrow_mut().animations.push(animation_id);
    }

    fn set_animation_speed(&mut self, _speed: f32) {}

    fn animation_state(&self) -> &str {
        "Idle"
    }
}

fn scenario_config(members: usize) -> Config {
    let mut config = Config::default();
    config.stage.loudness_threshold = 0.2;
    config.stage.loudness_sensitivity = 1.0;
    config.stage.end_performance_time = 10.0;
    config.stage.continue_performance_time = 2.0;
    config.audience.members = members;
    config.audience.interruption_delay_time = 30.0;
    config.audience.interruption_variability = 0.0;
    config.audience.clap_ramp_duration = 5.0;
    config.audience.seed = Some(42);
    config
}

fn one_clap_catalog() -> InterruptionCatalog {
    InterruptionCatalog::new(
        vec![InterruptionDefinition::new(1, Some(SoundHandle::new("cough")))],
        vec![InterruptionDefinition::new(10, Some(SoundHandle::new("clap")))],
    )
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<StageEvent>) -> Vec<StageEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_silence_ends_performance_after_window() {
    let mut stage = Stage::builder(&scenario_config(3))
        .catalog(one_clap_catalog())
        .lighting(NullLights)
        .loudness(ScriptedLoudness::new(vec![0.0; 100]))
        .rig_factory(|_| Box::new(RecordingRig(Rc::default())))
        .build()
        .unwrap();
    let mut rx = stage.observe();

    stage.start_performance();
    assert_eq!(drain(&mut rx), vec![StageEvent::PerformanceStarted]);

    let mut clap_ticks = Vec::new();
    let mut end_ticks = Vec::new();
    for tick in 1..=100 {
        stage.tick(1.0);
        for event in drain(&mut rx) {
            match event {
                StageEvent::ClappingStarted => clap_ticks.push(tick),
                StageEvent::PerformanceEnded => end_ticks.push(tick),
                other => panic!("unexpected {other} at tick {tick}"),
            }
        }

        if tick == 1 {
            assert!(stage.members().all(|m| m.behavior() == Behavior::Clapping));
        }
        if tick == 10 {
            assert_eq!(stage.controller().light_phase(), LightPhase::Brightening);
            assert_eq!(stage.controller().light_intensity(), DIMMED_INTENSITY);
            assert!(stage.members().all(|m| m.behavior() == Behavior::Idle));
            assert!(stage.members().all(|m| !m.follows_performance()));
        }
    }

    assert_eq!(clap_ticks, vec![1]);
    assert_eq!(end_ticks, vec![10]);
    assert!(!stage.is_performing());
    assert_eq!(stage.controller().light_intensity(), FULL_INTENSITY);
    assert_eq!(stage.controller().light_phase(), LightPhase::Steady);
}

#[test]
fn test_clap_envelope_rises_and_falls() {
    let log = Rc::new(RefCell::new(RigLog::default()));
    let rig_log = Rc::clone(&log);

    let mut trace = vec![0.0; 5];
    trace.extend([1.0; 5]);

    let mut stage = Stage::builder(&scenario_config(1))
        .catalog(one_clap_catalog())
        .lighting(NullLights)
        .loudness(ScriptedLoudness::new(trace))
        .rig_factory(move |_| Box::new(RecordingRig(Rc::clone(&rig_log))))
        .build()
        .unwrap();

    stage.start_performance();
    for _ in 0..10 {
        stage.tick(1.0);
    }

    assert_eq!(
        log.borrow().volumes,
        vec![0.0, 0.2, 0.4, 0.6, 0.8, 1.0, 0.8, 0.6, 0.4, 0.2, 0.0]
    );
    assert_eq!(log.borrow().loops, vec!["clap".to_string()]);

    let member = stage.members().next().unwrap();
    assert_eq!(member.behavior(), Behavior::Idle);
    assert!(member.follows_performance());
    assert_eq!(member.next_interruption_in(), Some(30.0));
    assert!(stage.is_performing());
}

#[test]
fn test_manual_start_and_end_are_idempotent() {
    let mut stage = Stage::builder(&scenario_config(2))
        .catalog(one_clap_catalog())
        .lighting(NullLights)
        .loudness(ConstantLoudness(1.0))
        .rig_factory(|_| Box::new(RecordingRig(Rc::default())))
        .build()
        .unwrap();
    let mut rx = stage.observe();

    assert!(stage.start_performance());
    let delays: Vec<_> = stage.members().map(|m| m.next_interruption_in()).collect();
    assert!(!stage.start_performance());
    let again: Vec<_> = stage.members().map(|m| m.next_interruption_in()).collect();
    assert_eq!(delays, again);

    assert!(stage.end_performance());
    assert!(!stage.end_performance());

    assert_eq!(
        drain(&mut rx),
        vec![StageEvent::PerformanceStarted, StageEvent::PerformanceEnded]
    );
}

#[test]
fn test_noise_while_idle_stays_idle() {
    let mut stage = Stage::builder(&scenario_config(2))
        .catalog(one_clap_catalog())
        .lighting(NullLights)
        .loudness(ConstantLoudness(5.0))
        .rig_factory(|_| Box::new(RecordingRig(Rc::default())))
        .build()
        .unwrap();
    let mut rx = stage.observe();

    for _ in 0..50 {
        stage.tick(1.0);
    }
    assert!(!stage.is_performing());
    assert!(drain(&mut rx).is_empty());
}

#[test]
fn test_missing_catalog_reported_at_build() {
    let result = Stage::builder(&scenario_config(1))
        .lighting(NullLights)
        .loudness(ConstantLoudness(0.0))
        .rig_factory(|_| Box::new(RecordingRig(Rc::default())))
        .build();

    match result {
        Err(OvationError::Stage(StageError::MissingCollaborator(name))) => {
            assert_eq!(name, "interruption catalog");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("stage built without a catalog"),
    }
}

#[test]
fn test_missing_rig_reported_at_build() {
    let result = Stage::builder(&scenario_config(3))
        .catalog(one_clap_catalog())
        .lighting(NullLights)
        .loudness(ConstantLoudness(0.0))
        .build();

    assert!(matches!(
        result,
        Err(OvationError::Stage(StageError::MissingCollaborator("audience rig")))
    ));
}

/// Long randomized run: a member is never both clapping and interrupting
#[test]
fn test_behaviors_stay_mutually_exclusive() {
    let mut config = scenario_config(8);
    config.stage.loudness_threshold = 1.0;
    config.stage.loudness_sensitivity = 100.0;
    config.stage.end_performance_time = 6.0;
    config.stage.continue_performance_time = 0.5;
    config.audience.interruption_delay_time = 1.0;
    config.audience.interruption_variability = 1.0;
    config.audience.clap_ramp_duration = 0.8;

    let clock = SimClock::new();
    let rig_clock = clock.clone();
    let performer = SyntheticPerformer::new(3.0, 7.0, 0.05, 0.02, StdRng::seed_from_u64(5));

    let mut stage = Stage::builder(&config)
        .catalog(InterruptionCatalog::load(&StaticSource::demo()).unwrap())
        .lighting(NullLights)
        .loudness(performer)
        .rig_factory(move |seat| {
            Box::new(SimulatedRig::new(
                format!("seat-{seat}"),
                rig_clock.clone(),
                0.4,
                "Idle",
            ))
        })
        .build()
        .unwrap();
    let mut rx = stage.observe();

    let dt = 0.1;
    let mut seen = [false; 3];
    for _ in 0..3000 {
        if !stage.is_performing() {
            stage.start_performance();
        }
        clock.advance(dt);
        stage.tick(dt);

        for member in stage.members() {
            match member.behavior() {
                Behavior::Idle => {
                    seen[0] = true;
                    assert!(member.clap_elapsed().is_none(), "{}", member.name());
                }
                Behavior::Interrupting => {
                    seen[1] = true;
                    assert!(member.clap_elapsed().is_none(), "{}", member.name());
                    assert!(member.next_interruption_in().is_none(), "{}", member.name());
                }
                Behavior::Clapping => {
                    seen[2] = true;
                    assert!(!member.has_pending_interruption(), "{}", member.name());
                }
            }
            if !member.follows_performance() {
                assert!(!member.has_pending_interruption(), "{}", member.name());
                assert_eq!(member.behavior(), Behavior::Idle);
            }
        }
        // Keep the tap from lagging
        drain(&mut rx);
    }

    assert_eq!(seen, [true, true, true]);
}
