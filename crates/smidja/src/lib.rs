//! # Smidja — Declarative Entity-Component Runtime
//!
//! An entity-component runtime for small simulations and interactive
//! scenes: sparse-set component stores reachable by type or by name, a
//! markup composer that builds entities from recipes, a phase- and
//! dependency-ordered scheduler, world-transform propagation over the
//! parent graph, and tweens chained into sequences.
//!
//! Start with `use smidja::prelude::*` and create a [`Runtime`].
//!
//! ## Module Overview
//!
//! - [`ecs`] — Entities, components, world, systems, scheduler, hierarchy
//! - [`compose`] — Recipes, markup parsing and the world composer
//! - [`tween`] — Easing, tweens and sequences
//! - [`runtime`] — The per-instance context and plugins
//! - [`collab`] — Render, physics and network backend seams
//! - [`names`] — Canonical names and the bidirectional name map
//! - [`graph`] — Shared topological sort

pub mod collab;
pub mod compose;
pub mod ecs;
pub mod error;
pub mod graph;
pub mod math;
pub mod names;
pub mod prelude;
pub mod runtime;
pub mod time;
pub mod tween;

pub use error::{ConfigError, RuntimeError};
pub use runtime::{DefaultPlugins, Plugin, Runtime, RuntimeConfig};
