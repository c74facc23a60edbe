//! # System — Named Routines Over the World
//!
//! A routine is just a function that takes `&mut World`: query entities,
//! modify components, read resources. A [`System`] wraps up to two of them
//! (a one-time setup routine and a per-tick update routine) together with
//! the metadata the [`Scheduler`](super::schedule::Scheduler) orders by:
//!
//! ```text
//! System::new("tween-advance")
//!     .in_phase(Phase::Simulation)      ← exactly one phase
//!     .after("network-sync")            ← same phase (or an earlier one)
//!     .before("transform-propagate")    ← same phase (or a later one)
//!     .on_update(advance_tweens)
//! ```
//!
//! A system's identity is its canonical name. Adding a second system with
//! the same name is a no-op, so plugins can install shared systems freely.
//!
//! Routines receive `&mut World`, never the runtime, so registering systems
//! or recipes from inside a tick is ruled out by the type system.

use crate::names::canonical;

use super::schedule::Phase;
use super::world::World;

/// Something that can run against a [`World`].
///
/// Any `FnMut(&mut World)` implements this trait, so closures and function
/// pointers work directly.
pub trait Routine {
    fn run(&mut self, world: &mut World);
}

/// Blanket impl: any `FnMut(&mut World)` is a `Routine`.
impl<F: FnMut(&mut World)> Routine for F {
    fn run(&mut self, world: &mut World) {
        (self)(world);
    }
}

/// A named, phased unit of work.
pub struct System {
    name: String,
    phase: Phase,
    after: Vec<String>,
    before: Vec<String>,
    pub(crate) setup: Option<Box<dyn Routine>>,
    pub(crate) update: Option<Box<dyn Routine>>,
}

impl System {
    /// A system in the `Simulation` phase with no routines yet.
    pub fn new(name: &str) -> Self {
        Self {
            name: canonical(name),
            phase: Phase::Simulation,
            after: Vec::new(),
            before: Vec::new(),
            setup: None,
            update: None,
        }
    }

    pub fn in_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Run after the named system. References are resolved when the
    /// schedule is built, so the other system may be added later.
    pub fn after(mut self, other: &str) -> Self {
        let other = canonical(other);
        if !self.after.contains(&other) {
            self.after.push(other);
        }
        self
    }

    /// Run before the named system. Resolved like [`after`](Self::after).
    pub fn before(mut self, other: &str) -> Self {
        let other = canonical(other);
        if !self.before.contains(&other) {
            self.before.push(other);
        }
        self
    }

    /// Routine run once, before the first tick.
    pub fn on_setup<R: Routine + 'static>(mut self, routine: R) -> Self {
        self.setup = Some(Box::new(routine));
        self
    }

    /// Routine run every time the system's phase runs.
    pub fn on_update<R: Routine + 'static>(mut self, routine: R) -> Self {
        self.update = Some(Box::new(routine));
        self
    }

    /// Canonical name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Canonical names this system runs after.
    pub fn dependencies(&self) -> &[String] {
        &self.after
    }

    /// Canonical names this system runs before.
    pub fn dependents(&self) -> &[String] {
        &self.before
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("after", &self.after)
            .field("before", &self.before)
            .field("setup", &self.setup.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}
