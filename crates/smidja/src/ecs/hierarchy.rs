//! # Entity Hierarchies — Parent Links and World Transforms
//!
//! Provides the [`Parent`] link, the reflected local [`Transform`], and the
//! derived [`WorldTransform`] written by [`propagate_transforms`].
//!
//! ## Propagation Order
//!
//! ```text
//! entities with Transform       Parent edges          cached order
//!   A  B  C  D                  B → A, C → B          A, D, B, C
//!                                                     └ parents first
//! ```
//!
//! The visit order is a topological sort of the parent graph, cached in the
//! [`TransformOrder`] resource together with the world's hierarchy version.
//! It is rebuilt only when that version moves (a Parent or Transform was
//! added, removed, re-pointed or despawned), never because a local value
//! changed.
//!
//! Parent links are not checked for cycles when written. When the sort finds
//! one, the entities on the cycle and everything below them are left out of
//! propagation (their world transforms keep their last value) and a warning
//! names them. Nothing ever recurses along parent chains.
//!
//! ## Usage
//!
//! ```ignore
//! let parent = world.spawn_one(Transform::from_xyz(0.0, 0.0, 0.0));
//! let child = world.spawn_one(Transform::from_xyz(2.0, 0.0, 0.0));
//! world.set_parent(child, parent);
//!
//! propagate_transforms(&mut world);
//! assert_eq!(world.get::<WorldTransform>(child).unwrap().translation().x, 2.0);
//! ```

use std::collections::HashMap;

use crate::compose::Recipe;
use crate::math::{Mat4, Quat, Transform, Vec3, compose, euler_degrees_from_quat, quat_from_euler_degrees};
use crate::runtime::{Plugin, Runtime};

use super::entity::Entity;
use super::reflect::{Component, FieldError, FieldInfo, FieldKind, vec3};
use super::schedule::Phase;
use super::system::System;
use super::world::World;

/// Marks an entity as a child of another entity.
///
/// Usually written through [`World::set_parent`] and
/// [`World::clear_parent`]. Any other write access to a `Parent` still
/// counts as a structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub(crate) Entity);

impl Parent {
    pub fn get(&self) -> Entity {
        self.0
    }
}

impl Component for Parent {}

impl Component for Transform {
    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::new("pos", FieldKind::Vector(3)),
            FieldInfo::new("rot", FieldKind::Quat),
            FieldInfo::new("euler", FieldKind::Vector(3)),
            FieldInfo::new("scale", FieldKind::Vector(3)),
        ];
        FIELDS
    }

    fn read(&self, field: &str) -> Option<Vec<f32>> {
        match field {
            "pos" => Some(self.translation.to_array().to_vec()),
            "rot" => Some(self.rotation.to_array().to_vec()),
            "euler" => Some(euler_degrees_from_quat(self.rotation).to_array().to_vec()),
            "scale" => Some(self.scale.to_array().to_vec()),
            _ => None,
        }
    }

    fn write(&mut self, field: &str, value: &[f32]) -> Result<(), FieldError> {
        match field {
            "pos" => self.translation = vec3(value),
            "rot" => {
                self.rotation = Quat::from_xyzw(value[0], value[1], value[2], value[3]).normalize()
            }
            "euler" => self.rotation = quat_from_euler_degrees(vec3(value)),
            "scale" => self.scale = vec3(value),
            _ => return Err(FieldError::Unknown(field.to_string())),
        }
        Ok(())
    }
}

/// The world-space transform computed by [`propagate_transforms`].
///
/// For root entities (no [`Parent`]), this equals the local [`Transform`].
/// For children, this is `parent_world ∘ child_local`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorldTransform(pub(crate) Transform);

impl WorldTransform {
    pub fn get(&self) -> &Transform {
        &self.0
    }

    pub fn translation(&self) -> Vec3 {
        self.0.translation
    }

    pub fn rotation(&self) -> Quat {
        self.0.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.0.scale
    }

    pub fn matrix(&self) -> Mat4 {
        self.0.matrix()
    }
}

impl Component for WorldTransform {
    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[
            FieldInfo::read_only("pos", FieldKind::Vector(3)),
            FieldInfo::read_only("rot", FieldKind::Quat),
            FieldInfo::read_only("scale", FieldKind::Vector(3)),
        ];
        FIELDS
    }

    fn read(&self, field: &str) -> Option<Vec<f32>> {
        match field {
            "pos" => Some(self.0.translation.to_array().to_vec()),
            "rot" => Some(self.0.rotation.to_array().to_vec()),
            "scale" => Some(self.0.scale.to_array().to_vec()),
            _ => None,
        }
    }
}

// ── Propagation ─────────────────────────────────────────────────────

/// Cached visit order for [`propagate_transforms`].
#[derive(Debug, Default)]
pub struct TransformOrder {
    /// Hierarchy version the order was built for.
    version: Option<u64>,
    /// Entities parents-first, each with its parent's position in this list.
    order: Vec<(Entity, Option<usize>)>,
    /// Entities on or below a parent cycle.
    excluded: Vec<Entity>,
    rebuilds: u64,
}

impl TransformOrder {
    /// Number of times the order has been recomputed.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Entities left out of propagation because of a parent cycle.
    pub fn excluded(&self) -> &[Entity] {
        &self.excluded
    }

    fn rebuild(&mut self, world: &World) {
        let nodes = world.entities_with::<Transform>();
        let position: HashMap<Entity, usize> =
            nodes.iter().enumerate().map(|(i, &e)| (e, i)).collect();

        let mut parent_node = vec![None; nodes.len()];
        let mut edges = Vec::new();
        for (node, &entity) in nodes.iter().enumerate() {
            // A parent without a Transform contributes nothing; the child
            // behaves like a root.
            if let Some(&parent) = world.parent_of(entity).and_then(|p| position.get(&p)) {
                parent_node[node] = Some(parent);
                edges.push((parent, node));
            }
        }

        let sorted = crate::graph::toposort(nodes.len(), &edges);

        let mut slot_of = vec![None; nodes.len()];
        self.order.clear();
        for node in sorted.order {
            slot_of[node] = Some(self.order.len());
            let parent = parent_node[node].and_then(|p| slot_of[p]);
            self.order.push((nodes[node], parent));
        }

        self.excluded = sorted
            .cyclic
            .iter()
            .chain(&sorted.downstream)
            .map(|&n| nodes[n])
            .collect();
        if !self.excluded.is_empty() {
            let names: Vec<String> = self.excluded.iter().map(|&e| world.describe(e)).collect();
            log::warn!(
                "parent cycle detected; excluding {} entities from transform propagation: {}",
                names.len(),
                names.join(", ")
            );
        }

        self.version = Some(world.hierarchy_version());
        self.rebuilds += 1;
        log::debug!(
            "rebuilt transform order: {} entities, {} excluded",
            self.order.len(),
            self.excluded.len()
        );
    }
}

/// Propagate local transforms down the entity hierarchy.
///
/// - Roots get `WorldTransform = Transform`.
/// - Children get `WorldTransform = parent_world ∘ child_local`, using the
///   parent's value from this same pass.
///
/// A parent cycle is warned about once, when the order is rebuilt; later
/// passes that keep skipping it only log at debug level.
pub fn propagate_transforms(world: &mut World) {
    let mut cache = world.resource_remove::<TransformOrder>().unwrap_or_default();
    if cache.version != Some(world.hierarchy_version()) {
        cache.rebuild(world);
    } else if !cache.excluded.is_empty() {
        log::debug!(
            "still excluding {} entities on a parent cycle",
            cache.excluded.len()
        );
    }

    let mut computed: Vec<Transform> = Vec::with_capacity(cache.order.len());
    for &(entity, parent) in &cache.order {
        let local = world.get::<Transform>(entity).copied().unwrap_or_default();
        let global = match parent {
            Some(slot) => compose(&computed[slot], &local),
            None => local,
        };
        computed.push(global);

        match world.get_mut::<WorldTransform>(entity) {
            Some(existing) => existing.0 = global,
            None => {
                world.insert(entity, WorldTransform(global));
            }
        }
    }

    world.insert_resource(cache);
}

/// Registers the transform components, the default `entity` recipe and the
/// propagation system.
pub struct TransformPlugin;

impl TransformPlugin {
    pub const SYSTEM: &'static str = "transform-propagate";
}

impl Plugin for TransformPlugin {
    fn build(&self, runtime: &mut Runtime) {
        let world = runtime.world_mut();
        world.register_component::<Transform>("transform");
        world.register_opaque_component::<WorldTransform>("world-transform");
        world.register_opaque_component::<Parent>("parent");
        world.insert_resource(TransformOrder::default());

        runtime.register_recipe(Recipe::new("entity").with_component("transform"));
        runtime.add_system(
            System::new(Self::SYSTEM)
                .in_phase(Phase::Draw)
                .on_update(propagate_transforms),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_pos(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<WorldTransform>(entity)
            .map(WorldTransform::translation)
            .unwrap_or(Vec3::NAN)
    }

    #[test]
    fn root_world_equals_local() {
        let mut world = World::new();
        let e = world.spawn_one(Transform::from_xyz(1.0, 2.0, 3.0));
        propagate_transforms(&mut world);
        assert_eq!(world_pos(&world, e), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn child_follows_rotated_parent() {
        let mut world = World::new();
        let parent = world.spawn_one(Transform::default());
        let child = world.spawn_one(Transform::from_xyz(2.0, 0.0, 0.0));
        world.set_parent(child, parent);

        propagate_transforms(&mut world);
        assert!((world_pos(&world, child) - Vec3::new(2.0, 0.0, 0.0)).length() < 0.1);

        world.get_mut::<Transform>(parent).unwrap().rotation =
            Quat::from_rotation_y(std::f32::consts::PI);
        propagate_transforms(&mut world);
        assert!((world_pos(&world, child).x + 2.0).abs() < 0.1);
    }

    #[test]
    fn parents_resolve_before_children_regardless_of_spawn_order() {
        let mut world = World::new();
        // Spawned leaf-first so storage order is the reverse of depth order.
        let leaf = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        let mid = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        let root = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        world.set_parent(leaf, mid);
        world.set_parent(mid, root);

        propagate_transforms(&mut world);
        assert!((world_pos(&world, leaf).x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut world = World::new();
        let mut parent = world.spawn_one(Transform::default());
        let mut last = parent;
        for _ in 0..2_000 {
            let child = world.spawn_one(Transform::from_xyz(0.5, 0.0, 0.0));
            world.set_parent(child, parent);
            parent = child;
            last = child;
        }
        propagate_transforms(&mut world);
        assert!((world_pos(&world, last).x - 1_000.0).abs() < 0.1);
    }

    #[test]
    fn scale_and_rotation_compose() {
        let mut world = World::new();
        let parent = world.spawn_one(
            Transform::from_xyz(10.0, 0.0, 0.0)
                .with_rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
                .with_scale(2.0),
        );
        let child = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        world.set_parent(child, parent);
        propagate_transforms(&mut world);

        // (1,0,0) scaled by 2 → (2,0,0), rotated 90° about Z → (0,2,0), + (10,0,0).
        assert!((world_pos(&world, child) - Vec3::new(10.0, 2.0, 0.0)).length() < 1e-4);
        let scale = world.get::<WorldTransform>(child).unwrap().scale();
        assert!((scale - Vec3::splat(2.0)).length() < 1e-6);
    }

    #[test]
    fn cycle_is_isolated_with_its_subtree() {
        let mut world = World::new();
        let a = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        let b = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        let below = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        let healthy = world.spawn_one(Transform::from_xyz(5.0, 0.0, 0.0));
        world.set_parent(a, b);
        world.set_parent(b, a);
        world.set_parent(below, b);

        propagate_transforms(&mut world);

        assert_eq!(world_pos(&world, healthy), Vec3::new(5.0, 0.0, 0.0));
        for e in [a, b, below] {
            assert!(world.get::<WorldTransform>(e).is_none());
        }
        let order = world.resource::<TransformOrder>();
        let mut excluded = order.excluded().to_vec();
        excluded.sort();
        assert_eq!(excluded, vec![a, b, below]);

        // Breaking the cycle brings them back.
        world.clear_parent(a);
        propagate_transforms(&mut world);
        assert!((world_pos(&world, below).x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn order_rebuilds_only_on_structural_change() {
        let mut world = World::new();
        let parent = world.spawn_one(Transform::default());
        let child = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        world.set_parent(child, parent);

        propagate_transforms(&mut world);
        propagate_transforms(&mut world);
        world.get_mut::<Transform>(parent).unwrap().translation.x = 3.0;
        propagate_transforms(&mut world);
        assert_eq!(world.resource::<TransformOrder>().rebuilds(), 1);
        assert!((world_pos(&world, child).x - 4.0).abs() < 1e-5);

        let other = world.spawn_one(Transform::default());
        world.set_parent(child, other);
        propagate_transforms(&mut world);
        assert_eq!(world.resource::<TransformOrder>().rebuilds(), 2);
        assert!((world_pos(&world, child).x - 1.0).abs() < 1e-5);
    }

    fn repointing_fixture() -> (World, Entity, Entity, Entity) {
        let mut world = World::new();
        let a = world.spawn_one(Transform::from_xyz(10.0, 0.0, 0.0));
        let b = world.spawn_one(Transform::from_xyz(100.0, 0.0, 0.0));
        let c = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        world.set_parent(c, a);
        propagate_transforms(&mut world);
        assert!((world_pos(&world, c).x - 11.0).abs() < 1e-5);
        (world, a, b, c)
    }

    #[test]
    fn replacing_parent_with_insert_reorders() {
        let (mut world, _, b, c) = repointing_fixture();
        world.insert(c, Parent(b));
        propagate_transforms(&mut world);
        assert!((world_pos(&world, c).x - 101.0).abs() < 1e-5);
    }

    #[test]
    fn editing_parent_in_place_reorders() {
        let (mut world, _, b, c) = repointing_fixture();
        if let Some(parent) = world.get_mut::<Parent>(c) {
            *parent = Parent(b);
        }
        propagate_transforms(&mut world);
        assert!((world_pos(&world, c).x - 101.0).abs() < 1e-5);

        world.query::<&mut Parent>(|_, parent| parent.0 = b);
        let rebuilds = world.resource::<TransformOrder>().rebuilds();
        propagate_transforms(&mut world);
        assert_eq!(world.resource::<TransformOrder>().rebuilds(), rebuilds + 1);
    }

    #[test]
    fn despawned_parent_leaves_child_as_root() {
        let mut world = World::new();
        let parent = world.spawn_one(Transform::from_xyz(5.0, 0.0, 0.0));
        let child = world.spawn_one(Transform::from_xyz(1.0, 0.0, 0.0));
        world.set_parent(child, parent);
        propagate_transforms(&mut world);
        assert!((world_pos(&world, child).x - 6.0).abs() < 1e-5);

        world.despawn(parent);
        propagate_transforms(&mut world);
        assert!((world_pos(&world, child).x - 1.0).abs() < 1e-5);
    }

    #[test]
    fn transform_fields_reflect() {
        let mut t = Transform::default();
        t.write("euler", &[0.0, 90.0, 0.0]).unwrap();
        let euler = t.read("euler").unwrap();
        assert!((euler[1] - 90.0).abs() < 1e-3);
        t.write("pos", &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(t.read("pos"), Some(vec![1.0, 2.0, 3.0]));
        assert!(t.write("bogus", &[0.0]).is_err());
    }
}
