//! # Sequences — Tweens Played One After Another
//!
//! A [`Sequence`] is a component holding an ordered list of steps (tweens
//! and pauses) and a cursor. Only one step runs at a time:
//!
//! ```text
//! steps:   [ move-up, pause 0.5, fade ]
//!             ▲
//!          cursor = 0, active = tween entity
//!
//! active tween despawned ──► cursor += 1 ──► spawn next step
//! cursor == steps.len()  ──► finished (not playing)
//! ```
//!
//! The active tween is owned by the sequence entity, so despawning a
//! sequence mid-flight takes its tween and values down with it. Playing a
//! sequence that is already running tears down the in-flight step before
//! starting over from the first step. [`reset_sequence`] tears down and
//! re-arms without starting, and is safe to call any number of times.
//!
//! A step that fails to instantiate (its target was despawned, say) is
//! skipped with a warning.
//!
//! Time a step runs past its end is carried into the next step on the same
//! tick, so a chain of steps keeps to the sum of its durations.

use crate::ecs::{Component, Entity, FieldInfo, FieldKind, World};
use crate::time::Time;

use super::{TweenSpec, spawn_tween, step_tween};

/// Sequence state. See the module docs.
#[derive(Debug, Clone, Default)]
pub struct Sequence {
    steps: Vec<TweenSpec>,
    cursor: usize,
    active: Option<Entity>,
    /// Time the active step has run, mirrored from its tween.
    step_elapsed: f32,
    playing: bool,
    autoplay_pending: bool,
    /// Target for steps that don't name one.
    default_target: Option<Entity>,
}

impl Sequence {
    pub fn new(steps: Vec<TweenSpec>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Start playing on the next sequence update.
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay_pending = autoplay;
        self
    }

    pub fn with_default_target(mut self, target: Entity) -> Self {
        self.default_target = Some(target);
        self
    }

    pub fn push(&mut self, step: TweenSpec) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[TweenSpec] {
        &self.steps
    }

    /// Index of the current step.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The in-flight tween (or pause) entity.
    pub fn active(&self) -> Option<Entity> {
        self.active
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

impl Component for Sequence {
    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::read_only("cursor", FieldKind::Scalar),
            FieldInfo::read_only("playing", FieldKind::Flag),
        ];
        FIELDS
    }

    fn read(&self, field: &str) -> Option<Vec<f32>> {
        match field {
            "cursor" => Some(vec![self.cursor as f32]),
            "playing" => Some(vec![if self.playing { 1.0 } else { 0.0 }]),
            _ => None,
        }
    }
}

/// Start (or restart) a sequence from its first step. Any in-flight step is
/// torn down first.
///
/// Returns `false` if `entity` has no [`Sequence`].
pub fn play_sequence(world: &mut World, entity: Entity) -> bool {
    if !teardown(world, entity) {
        return false;
    }
    if let Some(sequence) = world.get_mut::<Sequence>(entity) {
        sequence.cursor = 0;
        sequence.playing = true;
        sequence.autoplay_pending = false;
    }
    log::debug!("playing sequence {}", world.describe(entity));
    start_current(world, entity, 0.0);
    true
}

/// Stop a sequence and re-arm it at its first step. Idempotent.
///
/// Returns `false` if `entity` has no [`Sequence`].
pub fn reset_sequence(world: &mut World, entity: Entity) -> bool {
    if !teardown(world, entity) {
        return false;
    }
    if let Some(sequence) = world.get_mut::<Sequence>(entity) {
        sequence.cursor = 0;
        sequence.playing = false;
        sequence.autoplay_pending = false;
    }
    true
}

fn teardown(world: &mut World, entity: Entity) -> bool {
    let Some(sequence) = world.get_mut::<Sequence>(entity) else {
        return false;
    };
    sequence.step_elapsed = 0.0;
    if let Some(active) = sequence.active.take() {
        world.despawn(active);
        world.detach_owned(entity, active);
    }
    true
}

/// Instantiate the step under the cursor, skipping steps that fail.
/// `carry` seconds are run on the new step straight away; a step that
/// finishes inside them passes the rest on.
fn start_current(world: &mut World, entity: Entity, mut carry: f32) {
    loop {
        let Some(sequence) = world.get::<Sequence>(entity) else {
            return;
        };
        let Some(step) = sequence.steps.get(sequence.cursor).cloned() else {
            if let Some(sequence) = world.get_mut::<Sequence>(entity) {
                sequence.playing = false;
                sequence.active = None;
                sequence.step_elapsed = 0.0;
            }
            log::debug!("sequence {} finished", world.describe(entity));
            return;
        };
        let default_target = sequence.default_target;

        let tween = match spawn_tween(world, &step, default_target) {
            Ok(tween) => tween,
            Err(err) => {
                log::warn!(
                    "sequence {} skipping step {}: {}",
                    world.describe(entity),
                    world.get::<Sequence>(entity).map_or(0, |s| s.cursor),
                    err
                );
                if let Some(sequence) = world.get_mut::<Sequence>(entity) {
                    sequence.cursor += 1;
                }
                continue;
            }
        };
        world.attach_owned(entity, tween);
        if carry > 0.0 {
            step_tween(world, tween, carry);
        }
        if world.is_alive(tween) {
            if let Some(sequence) = world.get_mut::<Sequence>(entity) {
                sequence.active = Some(tween);
                sequence.step_elapsed = carry;
            }
            return;
        }

        world.detach_owned(entity, tween);
        carry = (carry - step.duration.max(0.0)).max(0.0);
        if let Some(sequence) = world.get_mut::<Sequence>(entity) {
            sequence.cursor += 1;
        }
    }
}

/// System: start autoplaying sequences and advance those whose active step
/// has ended.
pub fn advance_sequences(world: &mut World) {
    let dt = world.get_resource::<Time>().map_or(0.0, Time::delta_secs);
    for entity in world.entities_with::<Sequence>() {
        let Some(sequence) = world.get::<Sequence>(entity) else {
            continue;
        };
        if sequence.autoplay_pending {
            play_sequence(world, entity);
            continue;
        }
        if !sequence.playing {
            continue;
        }
        let Some(active) = sequence.active else {
            start_current(world, entity, 0.0);
            continue;
        };
        let alive = world.is_alive(active);
        let Some(sequence) = world.get_mut::<Sequence>(entity) else {
            continue;
        };
        // The active tween was advanced earlier this tick.
        sequence.step_elapsed += dt;
        if alive {
            continue;
        }

        let duration = sequence
            .steps
            .get(sequence.cursor)
            .map_or(0.0, |step| step.duration.max(0.0));
        let carry = (sequence.step_elapsed - duration).max(0.0);
        sequence.active = None;
        sequence.step_elapsed = 0.0;
        sequence.cursor += 1;
        world.detach_owned(entity, active);
        start_current(world, entity, carry);
    }
}
