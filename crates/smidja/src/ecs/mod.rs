//! # Sparse-Set ECS
//!
//! Entities are dense generational ids; each component type lives in its own
//! sparse-set column, reachable by type or by registered name.
//!
//! ## Module Overview
//!
//! - [`entity`] — Generational entity IDs
//! - [`reflect`] — The `Component` trait and named-field reflection
//! - [`store`] — Per-type sparse-set columns, plus their type-erased views
//! - [`world`] — Central container (entities + stores + names + resources)
//! - [`query`] — Closure-based iteration over matching stores
//! - [`system`] — Named routines with a phase and dependencies
//! - [`schedule`] — Phase runner with per-phase topological plans
//! - [`hierarchy`] — Parent links and world-transform propagation

pub mod entity;
pub mod hierarchy;
pub mod query;
pub mod reflect;
pub mod schedule;
pub mod store;
pub mod system;
pub mod world;

pub use entity::Entity;
pub use hierarchy::{Parent, TransformOrder, TransformPlugin, WorldTransform, propagate_transforms};
pub use query::{ColumnAccess, QueryParam};
pub use reflect::{Component, FieldError, FieldInfo, FieldKind};
pub use schedule::{FaultPolicy, Phase, Scheduler};
pub use store::{ComponentStore, Store};
pub use system::{Routine, System};
pub use world::{ComponentId, World};
