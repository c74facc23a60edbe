//! # Runtime — One Simulation Instance
//!
//! [`Runtime`] owns everything a simulation needs: the [`World`], the
//! [`RecipeRegistry`] and the [`Scheduler`]. There is no global state, so any
//! number of runtimes can live side by side (tests make one each).
//!
//! ```ignore
//! use smidja::prelude::*;
//!
//! let mut runtime = Runtime::new();
//! runtime.register_recipe(Recipe::new("ship").with_component("transform"));
//! runtime.load_world(r#"<ship name="hero" transform.pos="0 0 -5"/>"#)?;
//! runtime.play_sequence("intro")?;
//!
//! loop {
//!     runtime.step(1.0 / 60.0)?;
//! }
//! ```
//!
//! ## Plugins
//!
//! A [`Plugin`] bundles registrations. [`Runtime::new`] installs
//! [`DefaultPlugins`] (transforms and tweens); [`Runtime::empty`] installs
//! nothing. Installing the same plugin type twice is a no-op.
//!
//! ## Configuration
//!
//! [`RuntimeConfig`] carries the scheduler's timing and fault settings and
//! loads from JSON:
//!
//! ```text
//! { "fixed_delta": 0.02, "max_fixed_steps": 4, "fault_policy": "halt" }
//! ```

use std::any::TypeId;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::compose::{Composed, Composer, Recipe, RecipeRegistry, instantiate, markup};
use crate::ecs::{
    Component, ComponentId, ComponentStore, Entity, FaultPolicy, Phase, Scheduler, System,
    TransformPlugin, World,
};
use crate::error::{ConfigError, RuntimeError};
use crate::time::Time;
use crate::tween::{self, TweenPlugin};

/// A bundle of registrations applied to a [`Runtime`].
///
/// # Example
///
/// ```ignore
/// pub struct Spin;
///
/// impl Plugin for Spin {
///     fn build(&self, runtime: &mut Runtime) {
///         runtime.register_component::<Spinner>("spinner");
///         runtime.add_system(System::new("spin").on_update(spin));
///     }
/// }
/// ```
pub trait Plugin: 'static {
    fn build(&self, runtime: &mut Runtime);
}

/// [`TransformPlugin`] and [`TweenPlugin`].
pub struct DefaultPlugins;

impl Plugin for DefaultPlugins {
    fn build(&self, runtime: &mut Runtime) {
        runtime.add_plugin(TransformPlugin);
        runtime.add_plugin(TweenPlugin);
    }
}

/// Scheduler timing and fault settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Seconds per Fixed-phase step.
    pub fixed_delta: f32,
    /// Frame deltas are clamped to this many seconds.
    pub max_frame_delta: f32,
    /// Fixed steps per frame at most; leftover time carries over.
    pub max_fixed_steps: u32,
    pub fault_policy: FaultPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            fixed_delta: 1.0 / 60.0,
            max_frame_delta: 0.25,
            max_fixed_steps: 8,
            fault_policy: FaultPolicy::Continue,
        }
    }
}

impl RuntimeConfig {
    /// Parse from JSON. Missing keys take their defaults.
    pub fn from_json(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(source)?)
    }
}

/// One simulation instance. See the module docs.
pub struct Runtime {
    world: World,
    recipes: RecipeRegistry,
    scheduler: Scheduler,
    config: RuntimeConfig,
    plugins: HashSet<TypeId>,
}

impl Runtime {
    /// A runtime with [`DefaultPlugins`] and the default config.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// A runtime with [`DefaultPlugins`].
    pub fn with_config(config: RuntimeConfig) -> Self {
        let mut runtime = Self::empty();
        runtime.apply_config(config);
        runtime.add_plugin(DefaultPlugins);
        runtime
    }

    /// A runtime with no plugins installed.
    pub fn empty() -> Self {
        let mut runtime = Self {
            world: World::new(),
            recipes: RecipeRegistry::new(),
            scheduler: Scheduler::new(),
            config: RuntimeConfig::default(),
            plugins: HashSet::new(),
        };
        runtime.apply_config(RuntimeConfig::default());
        runtime
    }

    fn apply_config(&mut self, config: RuntimeConfig) {
        self.scheduler.set_fixed_delta(config.fixed_delta);
        self.scheduler.set_max_frame_delta(config.max_frame_delta);
        self.scheduler.set_max_fixed_steps(config.max_fixed_steps);
        self.scheduler.set_fault_policy(config.fault_policy);
        self.config = config;
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    // ── Access ──────────────────────────────────────────────────────

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn recipes(&self) -> &RecipeRegistry {
        &self.recipes
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// The clock, once the first step (or [`startup`](Self::startup)) ran.
    pub fn time(&self) -> Option<&Time> {
        self.world.get_resource::<Time>()
    }

    // ── Registration ────────────────────────────────────────────────

    /// Install a plugin. A plugin type installs at most once.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        if !self.plugins.insert(TypeId::of::<P>()) {
            log::debug!(
                "plugin `{}` is already installed; ignoring",
                std::any::type_name::<P>()
            );
            return self;
        }
        plugin.build(self);
        self
    }

    /// Register or replace a recipe.
    pub fn register_recipe(&mut self, recipe: Recipe) -> &mut Self {
        self.recipes.register(recipe);
        self
    }

    pub fn register_component<T: Component + Default>(&mut self, name: &str) -> ComponentId {
        self.world.register_component::<T>(name)
    }

    /// Schedule a system. `false` if one with the same name already is.
    pub fn add_system(&mut self, system: System) -> bool {
        self.scheduler.add(system)
    }

    pub fn remove_system(&mut self, name: &str) -> bool {
        self.scheduler.remove(name)
    }

    /// The run order of one phase.
    pub fn system_order(&mut self, phase: Phase) -> Result<Vec<String>, ConfigError> {
        self.scheduler.order(phase)
    }

    // ── Entities & Components ───────────────────────────────────────

    pub fn spawn(&mut self) -> Entity {
        self.world.spawn()
    }

    /// Despawn an entity and everything it owns. Children are kept.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        self.world.despawn(entity)
    }

    /// Despawn an entity together with its descendants.
    pub fn despawn_recursive(&mut self, entity: Entity) -> bool {
        self.world.despawn_recursive(entity)
    }

    pub fn set_name(&mut self, entity: Entity, name: &str) -> Option<Entity> {
        self.world.set_name(entity, name)
    }

    pub fn named(&self, name: &str) -> Option<Entity> {
        self.world.named(name)
    }

    fn component(&self, name: &str) -> Result<ComponentId, ConfigError> {
        self.world
            .component_by_name(name)
            .ok_or_else(|| ConfigError::UnknownComponent(name.to_string()))
    }

    /// Add a component with its default value. `Ok(false)` if present.
    pub fn add_component_by_name(&mut self, entity: Entity, name: &str) -> Result<bool, ConfigError> {
        let id = self.component(name)?;
        self.world.add_component(entity, id)
    }

    /// Remove a component. `Ok(false)` if it was not present.
    pub fn remove_component_by_name(
        &mut self,
        entity: Entity,
        name: &str,
    ) -> Result<bool, ConfigError> {
        let id = self.component(name)?;
        Ok(self.world.remove_component(entity, id))
    }

    /// `false` for unknown component names as well.
    pub fn has_component_by_name(&self, entity: Entity, name: &str) -> bool {
        self.world
            .component_by_name(name)
            .is_some_and(|id| self.world.has_component(entity, id))
    }

    pub fn store_by_name(&self, name: &str) -> Option<&dyn ComponentStore> {
        self.world.store_by_name(name)
    }

    /// Entities that have every named component.
    pub fn query_entities(&self, components: &[&str]) -> Result<Vec<Entity>, ConfigError> {
        let ids = components
            .iter()
            .map(|name| self.component(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.world.entities_matching(&ids))
    }

    // ── Composition ─────────────────────────────────────────────────

    /// Compose a markup document into the world.
    pub fn load_world(&mut self, source: &str) -> Result<Composed, ConfigError> {
        let elements = markup::parse(source)?;
        Composer::new(&mut self.world, &self.recipes).compose(&elements)
    }

    /// Compose a JSON element tree into the world.
    pub fn load_world_json(&mut self, source: &str) -> Result<Composed, ConfigError> {
        let elements = markup::parse_json(source)?;
        Composer::new(&mut self.world, &self.recipes).compose(&elements)
    }

    /// Spawn one entity from a recipe, with attributes applied after the
    /// recipe's defaults.
    pub fn create_from_recipe(
        &mut self,
        recipe: &str,
        attributes: &[(&str, &str)],
    ) -> Result<Entity, ConfigError> {
        let recipe = self
            .recipes
            .get(recipe)
            .ok_or_else(|| ConfigError::UnknownRecipe(recipe.to_string()))?;
        instantiate(&mut self.world, recipe, attributes.iter().copied())
    }

    // ── Sequences ───────────────────────────────────────────────────

    fn sequence_named(&self, name: &str) -> Result<Entity, ConfigError> {
        self.world
            .named(name)
            .ok_or_else(|| ConfigError::UnknownEntity(name.to_string()))
    }

    /// (Re)start the named sequence from its first step. `Ok(false)` if the
    /// entity is not a sequence.
    pub fn play_sequence(&mut self, name: &str) -> Result<bool, ConfigError> {
        let entity = self.sequence_named(name)?;
        let played = tween::play_sequence(&mut self.world, entity);
        if !played {
            log::warn!("`{name}` is not a sequence");
        }
        Ok(played)
    }

    /// Stop the named sequence and re-arm it. `Ok(false)` if the entity is
    /// not a sequence.
    pub fn reset_sequence(&mut self, name: &str) -> Result<bool, ConfigError> {
        let entity = self.sequence_named(name)?;
        let reset = tween::reset_sequence(&mut self.world, entity);
        if !reset {
            log::warn!("`{name}` is not a sequence");
        }
        Ok(reset)
    }

    // ── Stepping ────────────────────────────────────────────────────

    /// Build the schedule and run setup routines. [`step`](Self::step) does
    /// this on its own when needed; calling it up front surfaces schedule
    /// errors early.
    pub fn startup(&mut self) -> Result<(), RuntimeError> {
        self.scheduler.startup(&mut self.world)
    }

    /// Advance the simulation by `frame_delta` seconds.
    pub fn step(&mut self, frame_delta: f32) -> Result<(), RuntimeError> {
        self.scheduler.step(&mut self.world, frame_delta)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::WorldTransform;
    use crate::math::{Transform, Vec3};
    use crate::tween::{Sequence, TweenValue};

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn default_plugins_schedule_core_systems() {
        let mut runtime = Runtime::new();
        assert_eq!(
            runtime.system_order(Phase::Simulation).unwrap(),
            [TweenPlugin::ADVANCE, TweenPlugin::SEQUENCES]
        );
        assert_eq!(
            runtime.system_order(Phase::Draw).unwrap(),
            [TransformPlugin::SYSTEM]
        );
        assert!(runtime.recipes().contains("entity"));
    }

    #[test]
    fn plugins_install_once() {
        let mut runtime = Runtime::new();
        runtime.add_plugin(TweenPlugin);
        runtime.add_plugin(DefaultPlugins);
        assert_eq!(runtime.scheduler().len(), 3);
    }

    #[test]
    fn empty_runtime_has_nothing() {
        let runtime = Runtime::empty();
        assert!(runtime.scheduler().is_empty());
        assert!(runtime.recipes().is_empty());
    }

    #[test]
    fn unknown_recipe_is_named() {
        let mut runtime = Runtime::new();
        assert_eq!(
            runtime.create_from_recipe("spaceship", &[]),
            Err(ConfigError::UnknownRecipe("spaceship".into()))
        );
    }

    #[test]
    fn create_from_recipe_applies_attributes() {
        let mut runtime = Runtime::new();
        let e = runtime
            .create_from_recipe("entity", &[("name", "probe"), ("transform.pos", "1 2 3")])
            .unwrap();
        assert_eq!(runtime.named("probe"), Some(e));
        let pos = runtime.world().get::<Transform>(e).unwrap().translation;
        assert_eq!(pos, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn loaded_hierarchy_propagates_on_step() {
        let mut runtime = Runtime::new();
        runtime
            .load_world(
                r#"<world>
                     <entity name="parent">
                       <entity name="child" transform.pos="2 0 0"/>
                     </entity>
                   </world>"#,
            )
            .unwrap();
        runtime.step(1.0 / 60.0).unwrap();

        let child = runtime.named("child").unwrap();
        let world_pos = runtime.world().get::<WorldTransform>(child).unwrap().translation();
        assert!(approx(world_pos, Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn components_by_name() {
        let mut runtime = Runtime::new();
        let e = runtime.spawn();
        assert_eq!(runtime.add_component_by_name(e, "transform"), Ok(true));
        assert_eq!(runtime.add_component_by_name(e, "transform"), Ok(false));
        assert!(runtime.has_component_by_name(e, "Transform"));
        assert!(!runtime.has_component_by_name(e, "ghost"));
        assert_eq!(runtime.store_by_name("transform").map(|s| s.len()), Some(1));
        assert_eq!(runtime.query_entities(&["transform"]).unwrap(), vec![e]);
        assert_eq!(
            runtime.query_entities(&["ghost"]),
            Err(ConfigError::UnknownComponent("ghost".into()))
        );
        assert_eq!(runtime.remove_component_by_name(e, "transform"), Ok(true));
        assert!(runtime.query_entities(&["transform"]).unwrap().is_empty());
    }

    #[test]
    fn sequence_plays_by_name() {
        let mut runtime = Runtime::new();
        runtime
            .load_world(
                r#"<world>
                     <entity name="ship"/>
                     <sequence name="intro">
                       <tween target="ship" attribute="transform.pos.y" from="0" to="2" duration="0.5"/>
                     </sequence>
                   </world>"#,
            )
            .unwrap();
        assert_eq!(runtime.play_sequence("intro"), Ok(true));
        runtime.step(0.25).unwrap();
        runtime.step(0.25).unwrap();

        let ship = runtime.named("ship").unwrap();
        assert_eq!(runtime.world().get::<Transform>(ship).unwrap().translation.y, 2.0);
        let seq = runtime.named("intro").unwrap();
        assert!(!runtime.world().get::<Sequence>(seq).unwrap().is_playing());
        assert!(runtime.world().entities_with::<TweenValue>().is_empty());

        assert_eq!(runtime.play_sequence("ship"), Ok(false));
        assert_eq!(
            runtime.reset_sequence("nobody"),
            Err(ConfigError::UnknownEntity("nobody".into()))
        );
    }

    #[test]
    fn config_loads_from_json() {
        let config =
            RuntimeConfig::from_json(r#"{ "fixed_delta": 0.02, "fault_policy": "halt" }"#).unwrap();
        assert_eq!(config.fixed_delta, 0.02);
        assert_eq!(config.max_fixed_steps, 8);
        assert_eq!(config.fault_policy, FaultPolicy::Halt);

        let runtime = Runtime::with_config(config);
        assert_eq!(runtime.scheduler().fixed_delta(), 0.02);
        assert!(RuntimeConfig::from_json("{ nope").is_err());
    }

    fn explode(_: &mut World) {
        panic!("boom");
    }

    #[test]
    fn faulting_system_does_not_stop_the_tick() {
        let mut runtime = Runtime::new();
        runtime.add_system(System::new("explode").on_update(explode));
        let e = runtime.create_from_recipe("entity", &[]).unwrap();
        assert!(runtime.step(1.0 / 60.0).is_ok());
        assert!(runtime.world().has::<WorldTransform>(e));
    }

    #[test]
    fn halt_policy_surfaces_fault() {
        let mut runtime = Runtime::with_config(RuntimeConfig {
            fault_policy: FaultPolicy::Halt,
            ..RuntimeConfig::default()
        });
        runtime.add_system(System::new("explode").on_update(explode));
        assert!(matches!(
            runtime.step(1.0 / 60.0),
            Err(RuntimeError::SystemFault { ref system, .. }) if system == "explode"
        ));
    }
}
