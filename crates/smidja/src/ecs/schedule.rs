//! # Schedule — Phased, Dependency-Ordered Execution
//!
//! Every tick runs the four phases in a fixed sequence:
//!
//! ```text
//! first step only:  setup routines (all phases) → Setup-phase updates
//!
//! each step(dt):    dt = clamp(dt, 0, max_frame_delta)
//!                   accumulator += dt
//!                   while accumulator ≥ fixed_delta:    ← at most max_fixed_steps
//!                       Fixed            (Time::delta = fixed_delta)
//!                   Simulation           (Time::delta = dt)
//!                   Draw                 (Time::delta = dt)
//! ```
//!
//! ## Plans
//!
//! Within a phase, `after` and `before` references form a dependency graph. The phase's
//! plan is one topological order of it, ties broken by registration order,
//! so the same registrations always run in the same order. Plans are cached
//! per phase and rebuilt only when that phase's membership changes.
//!
//! Building a plan is where configuration mistakes surface: an unknown
//! reference, an ordering against another phase that phase order
//! contradicts (running *after* a later phase, or *before* an earlier one),
//! or a cycle. All are [`ConfigError`]s raised before any update routine
//! runs. An ordering that phase order already satisfies is ignored.
//!
//! ## Faults
//!
//! A panic inside a routine is caught, logged with the system's name, and the
//! rest of the tick carries on ([`FaultPolicy::Continue`]). Under
//! [`FaultPolicy::Halt`] the tick stops and the fault is returned.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, RuntimeError};
use crate::graph::toposort;
use crate::names::NameMap;
use crate::time::Time;

use super::system::System;
use super::world::World;

/// Execution phases, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Setup,
    Fixed,
    Simulation,
    Draw,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Setup, Phase::Fixed, Phase::Simulation, Phase::Draw];

    fn index(self) -> usize {
        self as usize
    }
}

/// What to do when a system panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultPolicy {
    /// Log the fault, skip the system for this tick, keep going.
    #[default]
    Continue,
    /// Stop the tick and return [`RuntimeError::SystemFault`].
    Halt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SystemId(u32);

struct Slot {
    system: System,
    initialized: bool,
}

/// Per-system timing recorded during the most recent step.
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone)]
pub struct SystemTiming {
    pub name: String,
    pub phase: Phase,
    pub duration_us: f64,
}

/// Orders and runs systems.
pub struct Scheduler {
    /// Registration order. Removed systems leave a `None` so ids stay valid.
    slots: Vec<Option<Slot>>,
    names: NameMap<SystemId>,
    plans: [Option<Vec<usize>>; 4],
    fixed_delta: f32,
    max_frame_delta: f32,
    max_fixed_steps: u32,
    fault_policy: FaultPolicy,
    accumulator: f64,
    #[cfg(feature = "diagnostics")]
    timings: Vec<SystemTiming>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            names: NameMap::new(),
            plans: Default::default(),
            fixed_delta: 1.0 / 60.0,
            max_frame_delta: 0.25,
            max_fixed_steps: 8,
            fault_policy: FaultPolicy::Continue,
            accumulator: 0.0,
            #[cfg(feature = "diagnostics")]
            timings: Vec::new(),
        }
    }

    pub fn set_fixed_delta(&mut self, secs: f32) {
        self.fixed_delta = secs.max(f32::EPSILON);
    }

    pub fn set_max_frame_delta(&mut self, secs: f32) {
        self.max_frame_delta = secs.max(0.0);
    }

    pub fn set_max_fixed_steps(&mut self, steps: u32) {
        self.max_fixed_steps = steps;
    }

    pub fn set_fault_policy(&mut self, policy: FaultPolicy) {
        self.fault_policy = policy;
    }

    pub fn fixed_delta(&self) -> f32 {
        self.fixed_delta
    }

    // ── Membership ──────────────────────────────────────────────────

    /// Add a system. Returns `false` (and changes nothing) if a system with
    /// the same name is already scheduled.
    pub fn add(&mut self, system: System) -> bool {
        if self.names.contains(system.name()) {
            log::debug!("system `{}` is already scheduled; ignoring", system.name());
            return false;
        }
        let id = SystemId(self.slots.len() as u32);
        self.names.insert(system.name(), id);
        self.plans[system.phase().index()] = None;
        self.slots.push(Some(Slot {
            system,
            initialized: false,
        }));
        true
    }

    /// Remove a system by name. Returns `true` if it was scheduled.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(id) = self.names.remove_name(name) else {
            return false;
        };
        self.slots[id.0 as usize] = None;
        // Other phases may have referenced it.
        self.plans = Default::default();
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// System names in registration order.
    pub fn system_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.names()
    }

    pub fn phase_of(&self, name: &str) -> Option<Phase> {
        let id = self.names.get(name)?;
        self.slot(id.0 as usize).map(|s| s.system.phase())
    }

    fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    // ── Plans ───────────────────────────────────────────────────────

    /// Build every phase's plan, reporting the first configuration error.
    pub fn build(&mut self) -> Result<(), ConfigError> {
        for phase in Phase::ALL {
            self.ensure_plan(phase)?;
        }
        Ok(())
    }

    /// The run order of a phase, as system names.
    pub fn order(&mut self, phase: Phase) -> Result<Vec<String>, ConfigError> {
        self.ensure_plan(phase)?;
        Ok(self.plans[phase.index()]
            .iter()
            .flatten()
            .filter_map(|&i| self.slot(i))
            .map(|s| s.system.name().to_string())
            .collect())
    }

    fn ensure_plan(&mut self, phase: Phase) -> Result<(), ConfigError> {
        if self.plans[phase.index()].is_some() {
            return Ok(());
        }
        let plan = self.build_plan(phase)?;
        log::debug!(
            "built {:?} plan: [{}]",
            phase,
            plan.iter()
                .filter_map(|&i| self.slot(i))
                .map(|s| s.system.name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.plans[phase.index()] = Some(plan);
        Ok(())
    }

    fn build_plan(&self, phase: Phase) -> Result<Vec<usize>, ConfigError> {
        // Members in registration order; graph nodes are positions in here.
        let members: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_ref().is_some_and(|s| s.system.phase() == phase))
            .map(|(i, _)| i)
            .collect();

        let mut edges = Vec::new();
        for (node, &slot_index) in members.iter().enumerate() {
            let Some(slot) = self.slot(slot_index) else {
                continue;
            };
            let system = &slot.system;
            let references = system
                .dependencies()
                .iter()
                .map(|r| (r, true))
                .chain(system.dependents().iter().map(|r| (r, false)));
            for (reference, runs_after) in references {
                let target = self
                    .names
                    .get(reference)
                    .map(|id| id.0 as usize)
                    .filter(|&i| self.slot(i).is_some())
                    .ok_or_else(|| ConfigError::UnknownSystem {
                        system: system.name().to_string(),
                        reference: reference.clone(),
                    })?;
                let other = self.slot(target).map(|s| s.system.phase()).unwrap_or(phase);
                // `after` something earlier, or `before` something later.
                let satisfied = if runs_after { other < phase } else { other > phase };
                if satisfied {
                    log::debug!(
                        "`{}` is ordered against `{}` in the {:?} phase; phase order already satisfies it",
                        system.name(),
                        reference,
                        other
                    );
                    continue;
                }
                if other != phase {
                    return Err(ConfigError::CrossPhaseDependency {
                        system: system.name().to_string(),
                        phase,
                        reference: reference.clone(),
                        other,
                    });
                }
                if let Some(other_node) = members.iter().position(|&m| m == target) {
                    edges.push(if runs_after {
                        (other_node, node)
                    } else {
                        (node, other_node)
                    });
                }
            }
        }

        let sorted = toposort(members.len(), &edges);
        if !sorted.cyclic.is_empty() {
            return Err(ConfigError::DependencyCycle {
                phase,
                systems: sorted
                    .cyclic
                    .iter()
                    .filter_map(|&n| self.slot(members[n]))
                    .map(|s| s.system.name().to_string())
                    .collect(),
            });
        }
        Ok(sorted.order.into_iter().map(|n| members[n]).collect())
    }

    // ── Running ─────────────────────────────────────────────────────

    /// Run setup routines of systems that have not been initialized yet, then
    /// the updates of uninitialized `Setup`-phase systems. The first call
    /// covers everything; later calls pick up systems added since.
    pub fn startup(&mut self, world: &mut World) -> Result<(), RuntimeError> {
        self.build()?;
        ensure_time(world, self.fixed_delta);

        for phase in Phase::ALL {
            for index in self.plan(phase) {
                let Some(slot) = self.slots[index].as_mut() else {
                    continue;
                };
                if slot.initialized {
                    continue;
                }
                let name = slot.system.name().to_string();
                if let Some(setup) = slot.system.setup.as_mut() {
                    guarded(&name, phase, self.fault_policy, || setup.run(world))?;
                }
                if phase != Phase::Setup {
                    slot.initialized = true;
                }
            }
        }

        for index in self.plan(Phase::Setup) {
            let Some(slot) = self.slots[index].as_mut() else {
                continue;
            };
            if slot.initialized {
                continue;
            }
            slot.initialized = true;
            let name = slot.system.name().to_string();
            if let Some(update) = slot.system.update.as_mut() {
                guarded(&name, Phase::Setup, self.fault_policy, || update.run(world))?;
            }
        }
        Ok(())
    }

    /// Advance one frame by `frame_delta` seconds.
    pub fn step(&mut self, world: &mut World, frame_delta: f32) -> Result<(), RuntimeError> {
        let needs_startup = self
            .slots
            .iter()
            .flatten()
            .any(|s| !s.initialized);
        if needs_startup {
            self.startup(world)?;
        } else {
            self.build()?;
        }

        #[cfg(feature = "diagnostics")]
        self.timings.clear();

        let dt = clamp_delta(frame_delta, self.max_frame_delta);
        ensure_time(world, self.fixed_delta).begin_frame(dt);

        self.accumulator += f64::from(dt);
        let fixed = f64::from(self.fixed_delta);
        let mut steps = 0;
        while self.accumulator >= fixed && steps < self.max_fixed_steps {
            ensure_time(world, self.fixed_delta).begin_fixed_step();
            let result = self.run_phase(world, Phase::Fixed);
            self.accumulator -= fixed;
            steps += 1;
            if result.is_err() {
                ensure_time(world, self.fixed_delta).end_fixed_steps();
                return result;
            }
        }
        if self.accumulator >= fixed {
            log::debug!(
                "dropping {:.4}s of fixed-step backlog after {} steps",
                self.accumulator,
                steps
            );
            self.accumulator %= fixed;
        }
        ensure_time(world, self.fixed_delta).end_fixed_steps();

        self.run_phase(world, Phase::Simulation)?;
        self.run_phase(world, Phase::Draw)
    }

    fn plan(&self, phase: Phase) -> Vec<usize> {
        self.plans[phase.index()].clone().unwrap_or_default()
    }

    fn run_phase(&mut self, world: &mut World, phase: Phase) -> Result<(), RuntimeError> {
        for index in self.plan(phase) {
            let Some(slot) = self.slots[index].as_mut() else {
                continue;
            };
            let name = slot.system.name().to_string();
            let Some(update) = slot.system.update.as_mut() else {
                continue;
            };

            #[cfg(feature = "diagnostics")]
            let start = std::time::Instant::now();

            let result = guarded(&name, phase, self.fault_policy, || update.run(world));

            #[cfg(feature = "diagnostics")]
            self.timings.push(SystemTiming {
                name,
                phase,
                duration_us: start.elapsed().as_secs_f64() * 1_000_000.0,
            });

            result?;
        }
        Ok(())
    }

    /// Per-system timings from the most recent `step()`.
    #[cfg(feature = "diagnostics")]
    pub fn timings(&self) -> &[SystemTiming] {
        &self.timings
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// The world's `Time`, created if missing and kept in step with the
/// scheduler's fixed delta.
fn ensure_time(world: &mut World, fixed_delta: f32) -> &mut Time {
    if !world.has_resource::<Time>() {
        world.insert_resource(Time::new(fixed_delta));
    }
    let time = world.resource_mut::<Time>();
    time.set_fixed_delta(fixed_delta);
    time
}

fn clamp_delta(frame_delta: f32, max: f32) -> f32 {
    if !frame_delta.is_finite() || frame_delta < 0.0 {
        log::debug!("ignoring invalid frame delta {frame_delta}");
        return 0.0;
    }
    if frame_delta > max {
        log::debug!("clamping frame delta {frame_delta:.4}s to {max:.4}s");
        return max;
    }
    frame_delta
}

/// Run `f`, turning a panic into a logged fault.
fn guarded(
    name: &str,
    phase: Phase,
    policy: FaultPolicy,
    f: impl FnOnce(),
) -> Result<(), RuntimeError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => Ok(()),
        Err(payload) => {
            let message = panic_payload_to_string(&*payload);
            log::error!("system `{name}` faulted in {phase:?} phase: {message}");
            match policy {
                FaultPolicy::Continue => Ok(()),
                FaultPolicy::Halt => Err(RuntimeError::SystemFault {
                    system: name.to_string(),
                    message,
                }),
            }
        }
    }
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
