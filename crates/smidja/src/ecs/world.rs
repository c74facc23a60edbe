//! # World — The Central Container
//!
//! The [`World`] owns every entity, every component store, the name
//! registries for both, and global resources.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ World                                                    │
//! │                                                          │
//! │  allocator          dense generational entity slots      │
//! │  stores[id]         one sparse-set Store<T> per type     │
//! │  by_type            TypeId → ComponentId                 │
//! │  component_names    "transform" ↔ ComponentId            │
//! │  entity_names       "player"    ↔ Entity                 │
//! │  owned              owner → entities despawned with it   │
//! │  resources          TypeId → Box<dyn Any>                │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Components are reachable two ways. Typed code uses `get::<T>()`,
//! `insert`, `query`. Name-driven code (the composer, tweens, collaborators)
//! resolves a [`ComponentId`] through the component registry and then adds,
//! removes, reads and writes fields without knowing `T`.
//!
//! ## Ownership Links
//!
//! [`World::attach_owned`] ties an entity's lifetime to another's; despawning
//! the owner despawns everything it owns, transitively. Tweens use this for
//! their per-scalar value entities so nothing can outlive its tween.
//!
//! ## Hierarchy Version
//!
//! Adding or removing a [`Transform`] or [`Parent`] (directly or through a
//! despawn) bumps [`World::hierarchy_version`], as does any write access to
//! a `Parent`: replacing it, `get_mut`, or a query taking `&mut Parent`.
//! The transform propagator
//! compares it against the version its cached visit order was built for.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};

use crate::error::ConfigError;
use crate::math::Transform;
use crate::names::NameMap;

use super::entity::{Entity, EntityAllocator};
use super::hierarchy::Parent;
use super::query::QueryParam;
use super::reflect::{Component, FieldError, FieldInfo};
use super::store::{ComponentStore, ErasedStore, Store};

/// Handle to a component store. Dense, never reused within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u32);

impl ComponentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

struct ComponentInfo {
    type_id: TypeId,
    type_name: &'static str,
    fields: &'static [FieldInfo],
}

/// The central container for all simulation state.
#[derive(Default)]
pub struct World {
    allocator: EntityAllocator,
    /// `None` only while a query has the store taken out.
    stores: Vec<Option<Box<dyn ErasedStore>>>,
    infos: Vec<ComponentInfo>,
    by_type: HashMap<TypeId, ComponentId>,
    component_names: NameMap<ComponentId>,
    entity_names: NameMap<Entity>,
    owned: HashMap<Entity, Vec<Entity>>,
    resources: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    hierarchy_version: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Resources ────────────────────────────────────────────────────

    /// Insert a resource (singleton value). Replaces any existing resource of
    /// the same type.
    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) {
        self.resources.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Get a shared reference to a resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource hasn't been inserted.
    pub fn resource<T: 'static + Send + Sync>(&self) -> &T {
        self.get_resource::<T>().unwrap_or_else(|| {
            panic!(
                "Resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    /// Get a mutable reference to a resource.
    ///
    /// # Panics
    ///
    /// Panics if the resource hasn't been inserted.
    pub fn resource_mut<T: 'static + Send + Sync>(&mut self) -> &mut T {
        self.get_resource_mut::<T>().unwrap_or_else(|| {
            panic!(
                "Resource `{}` not found. Did you forget to insert it?",
                std::any::type_name::<T>()
            )
        })
    }

    pub fn get_resource<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.resources
            .get(&TypeId::of::<T>())
            .and_then(|r| r.downcast_ref::<T>())
    }

    pub fn get_resource_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.resources
            .get_mut(&TypeId::of::<T>())
            .and_then(|r| r.downcast_mut::<T>())
    }

    pub fn has_resource<T: 'static + Send + Sync>(&self) -> bool {
        self.resources.contains_key(&TypeId::of::<T>())
    }

    /// Remove a resource, taking ownership.
    ///
    /// Use this for the extract/reinsert pattern when a system needs a
    /// resource and the world mutably at the same time.
    pub fn resource_remove<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.resources
            .remove(&TypeId::of::<T>())
            .and_then(|r| r.downcast::<T>().ok())
            .map(|b| *b)
    }

    // ── Component Registry ──────────────────────────────────────────

    /// The id of `T`'s store, creating an empty (unnamed) store on first use.
    pub fn component_id<T: Component>(&mut self) -> ComponentId {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return id;
        }
        let id = ComponentId(self.stores.len() as u32);
        self.stores.push(Some(Box::new(Store::<T>::new())));
        self.infos.push(ComponentInfo {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            fields: T::fields(),
        });
        self.by_type.insert(TypeId::of::<T>(), id);
        id
    }

    pub fn try_component_id<T: Component>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Register `T` under `name` so it can be added by name with its default
    /// value. Rebinding a name to a different type detaches the old type from
    /// the name; the old store stays reachable through typed access.
    pub fn register_component<T: Component + Default>(&mut self, name: &str) -> ComponentId {
        let id = self.component_id::<T>();
        if let Some(store) = self.typed_store_mut::<T>() {
            store.set_default(T::default);
        }
        self.bind_component_name(name, id);
        id
    }

    /// Register `T` under `name` for lookups and queries only. Adding it by
    /// name fails with [`ConfigError::NotConstructible`].
    pub fn register_opaque_component<T: Component>(&mut self, name: &str) -> ComponentId {
        let id = self.component_id::<T>();
        self.bind_component_name(name, id);
        id
    }

    fn bind_component_name(&mut self, name: &str, id: ComponentId) {
        if let Some(previous) = self.component_names.insert(name, id) {
            log::debug!(
                "component name `{}` moved from `{}` to `{}`",
                name,
                self.infos[previous.index()].type_name,
                self.infos[id.index()].type_name
            );
        }
    }

    /// Look up a component by name. `None` for unregistered names.
    pub fn component_by_name(&self, name: &str) -> Option<ComponentId> {
        self.component_names.get(name)
    }

    /// Canonical registered name of a component, if it has one.
    pub fn component_name(&self, id: ComponentId) -> Option<&str> {
        self.component_names.name_of(id)
    }

    /// Registered component names in registration order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.component_names.names()
    }

    pub fn component_fields(&self, id: ComponentId) -> &'static [FieldInfo] {
        self.infos.get(id.index()).map(|i| i.fields).unwrap_or(&[])
    }

    pub fn component_type_name(&self, id: ComponentId) -> Option<&'static str> {
        self.infos.get(id.index()).map(|i| i.type_name)
    }

    /// A component's registered name, falling back to its Rust type name.
    pub(crate) fn component_label(&self, id: ComponentId) -> String {
        self.component_name(id)
            .map(str::to_string)
            .or_else(|| self.component_type_name(id).map(str::to_string))
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    fn is_hierarchy_component(&self, id: ComponentId) -> bool {
        let tid = self.infos[id.index()].type_id;
        tid == TypeId::of::<Transform>() || tid == TypeId::of::<Parent>()
    }

    // ── Stores ──────────────────────────────────────────────────────

    pub fn store<T: Component>(&self) -> Option<&Store<T>> {
        let id = self.try_component_id::<T>()?;
        self.stores[id.index()].as_ref()?.as_any().downcast_ref()
    }

    fn typed_store_mut<T: Component>(&mut self) -> Option<&mut Store<T>> {
        let id = self.try_component_id::<T>()?;
        self.stores[id.index()].as_mut()?.as_any_mut().downcast_mut()
    }

    /// Type-erased read access to a store by registered name.
    pub fn store_by_name(&self, name: &str) -> Option<&dyn ComponentStore> {
        self.store_by_id(self.component_by_name(name)?)
    }

    pub fn store_by_id(&self, id: ComponentId) -> Option<&dyn ComponentStore> {
        self.stores.get(id.index())?.as_ref().map(|s| s.view())
    }

    /// Move a store out of the world. `None` if it is already out.
    pub(crate) fn take_store<T: Component>(&mut self) -> Option<Box<Store<T>>> {
        let id = self.component_id::<T>();
        let erased = self.stores[id.index()].take()?;
        match erased.into_any().downcast::<Store<T>>() {
            Ok(store) => Some(store),
            Err(_) => unreachable!("store type always matches its TypeId"),
        }
    }

    pub(crate) fn restore_store<T: Component>(&mut self, store: Box<Store<T>>) {
        let id = self.component_id::<T>();
        self.stores[id.index()] = Some(store);
    }

    // ── Spawn / Despawn ─────────────────────────────────────────────

    /// Spawn an entity with no components.
    pub fn spawn(&mut self) -> Entity {
        self.allocator.allocate()
    }

    /// Spawn an entity with a single component.
    pub fn spawn_one<T: Component>(&mut self, component: T) -> Entity {
        let entity = self.spawn();
        self.insert(entity, component);
        entity
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    /// All live entities in slot order.
    pub fn entities(&self) -> Vec<Entity> {
        self.allocator.iter_alive().collect()
    }

    /// Despawn an entity, everything it owns, its name and all its
    /// components. Stale or already-despawned handles are a no-op.
    ///
    /// Returns `true` if the entity was alive.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.allocator.is_alive(entity) {
            return false;
        }

        let mut pending = vec![entity];
        while let Some(current) = pending.pop() {
            if !self.allocator.is_alive(current) {
                continue;
            }
            if let Some(owned) = self.owned.remove(&current) {
                pending.extend(owned);
            }
            self.entity_names.remove_handle(current);

            let mut structural = false;
            for index in 0..self.stores.len() {
                let Some(store) = self.stores[index].as_mut() else {
                    continue;
                };
                if store.remove_entity(current)
                    && self.is_hierarchy_component(ComponentId(index as u32))
                {
                    structural = true;
                }
            }
            if structural {
                self.hierarchy_version += 1;
            }
            self.allocator.deallocate(current);
        }
        true
    }

    /// Despawn an entity and every entity that has it as an ancestor.
    pub fn despawn_recursive(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let children = self.children_index();
        let mut to_despawn = vec![entity];
        let mut queue = VecDeque::from([entity]);
        while let Some(current) = queue.pop_front() {
            for &child in children.get(&current).into_iter().flatten() {
                // A parent cycle would otherwise revisit forever.
                if !to_despawn.contains(&child) {
                    to_despawn.push(child);
                    queue.push_back(child);
                }
            }
        }
        for e in to_despawn {
            self.despawn(e);
        }
        true
    }

    /// Despawn every entity in the world.
    pub fn despawn_all(&mut self) {
        for entity in self.entities() {
            self.despawn(entity);
        }
        self.entity_names.clear();
        self.owned.clear();
    }

    /// Tie `owned`'s lifetime to `owner`: despawning `owner` despawns it too.
    pub fn attach_owned(&mut self, owner: Entity, owned: Entity) {
        self.owned.entry(owner).or_default().push(owned);
    }

    /// Undo [`attach_owned`](Self::attach_owned). Returns `true` if the link
    /// existed.
    pub fn detach_owned(&mut self, owner: Entity, owned: Entity) -> bool {
        let Some(list) = self.owned.get_mut(&owner) else {
            return false;
        };
        let before = list.len();
        list.retain(|&e| e != owned);
        let removed = list.len() != before;
        if list.is_empty() {
            self.owned.remove(&owner);
        }
        removed
    }

    /// Live entities owned by `owner`.
    pub fn owned_by(&self, owner: Entity) -> Vec<Entity> {
        self.owned
            .get(&owner)
            .into_iter()
            .flatten()
            .copied()
            .filter(|&e| self.is_alive(e))
            .collect()
    }

    // ── Named Entities ──────────────────────────────────────────────

    /// Bind `name` to `entity`. The entity loses any previous name, and any
    /// other entity holding `name` loses it.
    ///
    /// Returns the entity the name was taken from, if any.
    pub fn set_name(&mut self, entity: Entity, name: &str) -> Option<Entity> {
        if !self.is_alive(entity) {
            log::warn!("cannot name dead entity {entity:?} `{name}`");
            return None;
        }
        self.entity_names.insert(name, entity)
    }

    pub fn clear_name(&mut self, entity: Entity) -> Option<String> {
        self.entity_names.remove_handle(entity)
    }

    /// Look up an entity by name. `None` if no live entity holds it.
    pub fn named(&self, name: &str) -> Option<Entity> {
        self.entity_names.get(name)
    }

    pub fn name_of(&self, entity: Entity) -> Option<&str> {
        self.entity_names.name_of(entity)
    }

    /// An entity's name for diagnostics, falling back to its id.
    pub fn describe(&self, entity: Entity) -> String {
        match self.name_of(entity) {
            Some(name) => format!("`{name}` ({entity})"),
            None => format!("{entity}"),
        }
    }

    // ── Typed Component Access ──────────────────────────────────────

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.store::<T>()?.get(entity)
    }

    /// Mutable access to a component. Borrowing a [`Parent`] mutably counts
    /// as a hierarchy change.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if TypeId::of::<T>() == TypeId::of::<Parent>() && self.has::<T>(entity) {
            self.hierarchy_version += 1;
        }
        self.typed_store_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.store::<T>().is_some_and(|s| s.contains(entity))
    }

    /// Add or replace a component. Returns the replaced value.
    ///
    /// Adding a `Transform` or `Parent`, or replacing a `Parent`, bumps
    /// [`World::hierarchy_version`].
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> Option<T> {
        assert!(
            self.is_alive(entity),
            "Cannot insert component `{}` on dead entity {:?}",
            std::any::type_name::<T>(),
            entity
        );
        let id = self.component_id::<T>();
        let previous = self.typed_store_mut::<T>()?.insert(entity, component);
        let repointed = previous.is_some() && TypeId::of::<T>() == TypeId::of::<Parent>();
        if (previous.is_none() && self.is_hierarchy_component(id)) || repointed {
            self.hierarchy_version += 1;
        }
        previous
    }

    /// Remove a component, returning it.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let id = self.try_component_id::<T>()?;
        let removed = self.typed_store_mut::<T>()?.remove(entity);
        if removed.is_some() && self.is_hierarchy_component(id) {
            self.hierarchy_version += 1;
        }
        removed
    }

    // ── Dynamic Component Access ────────────────────────────────────

    /// Add a registered component with its default value. `Ok(false)` if
    /// the entity already had it.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn add_component(&mut self, entity: Entity, id: ComponentId) -> Result<bool, ConfigError> {
        assert!(
            self.is_alive(entity),
            "Cannot add component `{}` to dead entity {:?}",
            self.component_label(id),
            entity
        );
        let label = self.component_label(id);
        let store = self
            .stores
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| ConfigError::UnknownComponent(label.clone()))?;
        let added = store
            .insert_default(entity)
            .map_err(|()| ConfigError::NotConstructible(label))?;
        if added && self.is_hierarchy_component(id) {
            self.hierarchy_version += 1;
        }
        Ok(added)
    }

    /// Remove a component by id. `true` if it was present.
    pub fn remove_component(&mut self, entity: Entity, id: ComponentId) -> bool {
        let removed = self
            .stores
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .is_some_and(|s| s.remove_entity(entity));
        if removed && self.is_hierarchy_component(id) {
            self.hierarchy_version += 1;
        }
        removed
    }

    pub fn has_component(&self, entity: Entity, id: ComponentId) -> bool {
        self.store_by_id(id).is_some_and(|s| s.contains(entity))
    }

    /// Read a reflected field. `None` if the entity lacks the component or
    /// the field does not exist.
    pub fn read_field(&self, entity: Entity, id: ComponentId, field: &str) -> Option<Vec<f32>> {
        self.store_by_id(id)?.read_field(entity, field)
    }

    /// Write a reflected field. `value` must have the field's arity.
    pub fn write_field(
        &mut self,
        entity: Entity,
        id: ComponentId,
        field: &str,
        value: &[f32],
    ) -> Result<(), FieldError> {
        match self.stores.get_mut(id.index()).and_then(Option::as_mut) {
            Some(store) => store.write_field(entity, field, value),
            None => Err(FieldError::Unknown(field.to_string())),
        }
    }

    // ── Hierarchy ───────────────────────────────────────────────────

    /// Make `child` a child of `parent`. Cycles are not rejected here; the
    /// propagator isolates them.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) {
        if self.get::<Parent>(child).map(Parent::get) == Some(parent) {
            return;
        }
        self.insert(child, Parent(parent));
    }

    pub fn clear_parent(&mut self, child: Entity) -> Option<Entity> {
        self.remove::<Parent>(child).map(|p| p.get())
    }

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.get::<Parent>(entity).map(Parent::get)
    }

    /// Direct children of `parent`, in storage order.
    pub fn children_of(&self, parent: Entity) -> Vec<Entity> {
        self.store::<Parent>()
            .map(|s| {
                s.iter()
                    .filter(|(_, p)| p.get() == parent)
                    .map(|(e, _)| e)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn children_index(&self) -> HashMap<Entity, Vec<Entity>> {
        let mut index: HashMap<Entity, Vec<Entity>> = HashMap::new();
        if let Some(store) = self.store::<Parent>() {
            for (child, parent) in store.iter() {
                index.entry(parent.get()).or_default().push(child);
            }
        }
        index
    }

    /// Bumped whenever a Transform or Parent is added, removed or re-pointed.
    pub fn hierarchy_version(&self) -> u64 {
        self.hierarchy_version
    }

    // ── Query ───────────────────────────────────────────────────────

    /// Call `f` for every entity that has all the requested components.
    ///
    /// # Example
    ///
    /// ```ignore
    /// world.query::<(&mut Transform, &Velocity)>(|entity, (transform, vel)| {
    ///     transform.translation += vel.0;
    /// });
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component twice. The world is left
    /// untouched when that happens.
    pub fn query<Q: QueryParam>(&mut self, mut f: impl FnMut(Entity, Q::Item<'_>)) {
        let mut columns = Vec::new();
        Q::component_types(&mut columns);
        for (i, column) in columns.iter().enumerate() {
            assert!(
                columns[..i].iter().all(|c| c.type_id != column.type_id),
                "a query cannot name the same component `{}` twice",
                column.type_name
            );
        }
        if columns
            .iter()
            .any(|c| c.mutable && c.type_id == TypeId::of::<Parent>())
        {
            self.hierarchy_version += 1;
        }
        let Some(cols) = Q::extract(self) else {
            panic!(
                "a store requested by `{}` is already taken by an enclosing query",
                std::any::type_name::<Q>()
            );
        };
        let mut guard = QueryGuard::<Q> {
            world: self,
            cols: Some(cols),
        };
        let Some(cols) = guard.cols.as_mut() else {
            return;
        };
        let candidates: Vec<Entity> = Q::candidates(cols).to_vec();
        for entity in candidates {
            if let Some(item) = Q::fetch(cols, entity) {
                f(entity, item);
            }
        }
    }

    /// Entities that have a component of type `T`.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        self.store::<T>()
            .map(|s| s.entities().to_vec())
            .unwrap_or_default()
    }

    /// Entities that have every component in `ids`, in the storage order of
    /// the smallest store.
    pub fn entities_matching(&self, ids: &[ComponentId]) -> Vec<Entity> {
        let stores: Option<Vec<&dyn ComponentStore>> =
            ids.iter().map(|&id| self.store_by_id(id)).collect();
        let Some(stores) = stores else {
            return Vec::new();
        };
        let Some(smallest) = stores.iter().min_by_key(|s| s.len()) else {
            return self.entities();
        };
        smallest
            .entities()
            .iter()
            .copied()
            .filter(|&e| stores.iter().all(|s| s.contains(e)))
            .collect()
    }
}

/// Puts taken stores back when a query ends, including when the closure
/// panics and the scheduler recovers from the fault.
struct QueryGuard<'w, Q: QueryParam> {
    world: &'w mut World,
    cols: Option<Q::Column>,
}

impl<Q: QueryParam> Drop for QueryGuard<'_, Q> {
    fn drop(&mut self) {
        if let Some(cols) = self.cols.take() {
            Q::restore(cols, self.world);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::reflect::FieldKind;

    #[test]
    fn panicking_query_restores_stores() {
        let mut world = World::new();
        let e = world.spawn_one(Health { current: 1.0 });
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            world.query::<&Health>(|_, _| panic!("boom"));
        }));
        assert!(result.is_err());
        assert_eq!(world.get::<Health>(e).map(|h| h.current), Some(1.0));
    }

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Health {
        current: f32,
    }

    impl Component for Health {
        fn fields() -> &'static [FieldInfo] {
            const FIELDS: &[FieldInfo] = &[FieldInfo::new("current", FieldKind::Scalar)];
            FIELDS
        }

        fn read(&self, field: &str) -> Option<Vec<f32>> {
            (field == "current").then(|| vec![self.current])
        }

        fn write(&mut self, field: &str, value: &[f32]) -> Result<(), FieldError> {
            match field {
                "current" => {
                    self.current = value[0];
                    Ok(())
                }
                _ => Err(FieldError::Unknown(field.to_string())),
            }
        }
    }

    #[derive(Debug, PartialEq)]
    struct Marker;
    impl Component for Marker {}

    #[derive(Debug, Default)]
    struct Armor;
    impl Component for Armor {}

    #[test]
    fn spawn_insert_get() {
        let mut world = World::new();
        let e = world.spawn();
        world.insert(e, Health { current: 3.0 });
        assert_eq!(world.get::<Health>(e), Some(&Health { current: 3.0 }));
        assert!(world.has::<Health>(e));
        assert!(!world.has::<Marker>(e));
    }

    #[test]
    fn despawn_removes_components_and_name() {
        let mut world = World::new();
        let e = world.spawn_one(Health::default());
        world.set_name(e, "Player");
        assert!(world.despawn(e));
        assert!(!world.is_alive(e));
        assert!(world.get::<Health>(e).is_none());
        assert_eq!(world.named("player"), None);
        assert!(!world.despawn(e), "second despawn is a no-op");
    }

    #[test]
    fn recycled_entity_does_not_inherit_components() {
        let mut world = World::new();
        let a = world.spawn_one(Health { current: 1.0 });
        world.despawn(a);
        let b = world.spawn();
        assert_eq!(a.index(), b.index());
        assert!(world.get::<Health>(b).is_none());
    }

    #[test]
    fn entity_names_are_one_to_one() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();

        world.set_name(a, "hero");
        assert_eq!(world.set_name(b, "Hero"), Some(a));
        assert_eq!(world.named("hero"), Some(b));
        assert_eq!(world.name_of(a), None);

        world.set_name(b, "villain");
        assert_eq!(world.named("hero"), None);
        assert_eq!(world.name_of(b), Some("villain"));
    }

    #[test]
    fn component_names_round_trip() {
        let mut world = World::new();
        let id = world.register_component::<Health>("Health");
        assert_eq!(world.component_by_name("health"), Some(id));
        assert_eq!(world.component_name(id), Some("health"));
        assert_eq!(world.component_by_name("mana"), None);
    }

    #[test]
    fn reregistering_name_detaches_old_handle() {
        let mut world = World::new();
        let health = world.register_component::<Health>("stat");
        let armor = world.register_component::<Armor>("stat");
        assert_eq!(world.component_by_name("stat"), Some(armor));
        assert_eq!(world.component_name(health), None);

        // The old store is still usable through typed access.
        let e = world.spawn_one(Health { current: 2.0 });
        assert_eq!(world.get::<Health>(e).map(|h| h.current), Some(2.0));
    }

    #[test]
    fn dynamic_add_read_write() {
        let mut world = World::new();
        let id = world.register_component::<Health>("health");
        let e = world.spawn();

        assert_eq!(world.add_component(e, id), Ok(true));
        assert_eq!(world.add_component(e, id), Ok(false));
        world.write_field(e, id, "current", &[7.5]).unwrap();
        assert_eq!(world.read_field(e, id, "current"), Some(vec![7.5]));
        assert!(matches!(
            world.write_field(e, id, "current", &[1.0, 2.0]),
            Err(FieldError::Arity { .. })
        ));
        assert!(world.remove_component(e, id));
        assert!(!world.has_component(e, id));
    }

    #[test]
    fn opaque_component_cannot_be_added_by_name() {
        let mut world = World::new();
        let id = world.register_opaque_component::<Marker>("marker");
        let e = world.spawn();
        assert_eq!(
            world.add_component(e, id),
            Err(ConfigError::NotConstructible("marker".into()))
        );
    }

    #[test]
    fn query_tuple_skips_partial_matches() {
        let mut world = World::new();
        let both = world.spawn_one(Health { current: 1.0 });
        world.insert(both, Marker);
        let _only_health = world.spawn_one(Health { current: 5.0 });

        let mut seen = Vec::new();
        world.query::<(&mut Health, &Marker)>(|entity, (health, _)| {
            health.current += 1.0;
            seen.push(entity);
        });
        assert_eq!(seen, vec![both]);
        assert_eq!(world.get::<Health>(both).map(|h| h.current), Some(2.0));
    }

    #[test]
    #[should_panic(expected = "same component")]
    fn query_same_component_twice_panics() {
        let mut world = World::new();
        world.spawn_one(Health::default());
        world.query::<(&Health, &mut Health)>(|_, _| {});
    }

    #[test]
    fn query_same_component_twice_leaves_stores_in_place() {
        let mut world = World::new();
        let e = world.spawn_one(Health { current: 1.0 });
        world.insert(e, Marker);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            world.query::<(&Marker, &Health, &mut Health)>(|_, _| {});
        }));
        assert!(result.is_err());
        assert_eq!(world.get::<Health>(e).map(|h| h.current), Some(1.0));
        assert!(world.has::<Marker>(e));

        let mut seen = 0;
        world.query::<(&Marker, &mut Health)>(|_, (_, health)| {
            health.current += 1.0;
            seen += 1;
        });
        assert_eq!(seen, 1);
        assert_eq!(world.get::<Health>(e).map(|h| h.current), Some(2.0));
    }

    #[test]
    fn entities_matching_by_id() {
        let mut world = World::new();
        let health = world.register_component::<Health>("health");
        let armor = world.register_component::<Armor>("armor");
        let a = world.spawn();
        let b = world.spawn();
        world.add_component(a, health).unwrap();
        world.add_component(a, armor).unwrap();
        world.add_component(b, health).unwrap();

        assert_eq!(world.entities_matching(&[health, armor]), vec![a]);
        let mut with_health = world.entities_matching(&[health]);
        with_health.sort();
        assert_eq!(with_health, vec![a, b]);
    }

    #[test]
    fn owned_entities_are_co_destroyed() {
        let mut world = World::new();
        let owner = world.spawn();
        let owned = world.spawn();
        let nested = world.spawn();
        world.attach_owned(owner, owned);
        world.attach_owned(owned, nested);

        world.despawn(owner);
        assert!(!world.is_alive(owned));
        assert!(!world.is_alive(nested));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn hierarchy_version_tracks_structure() {
        let mut world = World::new();
        let parent = world.spawn_one(Transform::default());
        let child = world.spawn_one(Transform::default());
        let v0 = world.hierarchy_version();

        world.set_parent(child, parent);
        let v1 = world.hierarchy_version();
        assert!(v1 > v0);

        // Same parent again: no change.
        world.set_parent(child, parent);
        assert_eq!(world.hierarchy_version(), v1);

        // Mutating a local transform is not structural.
        world.get_mut::<Transform>(child).unwrap().translation.x = 4.0;
        assert_eq!(world.hierarchy_version(), v1);

        // Replacing a Parent outside `set_parent` is still structural.
        let other = world.spawn_one(Transform::default());
        let v2 = world.hierarchy_version();
        world.insert(child, Parent(other));
        assert!(world.hierarchy_version() > v2);

        world.despawn(child);
        assert!(world.hierarchy_version() > v2);
    }

    #[test]
    fn despawn_recursive_survives_parent_cycle() {
        let mut world = World::new();
        let a = world.spawn();
        let b = world.spawn();
        let c = world.spawn();
        world.set_parent(b, a);
        world.set_parent(c, b);
        world.set_parent(a, c);

        world.despawn_recursive(a);
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn resources_extract_reinsert() {
        let mut world = World::new();
        world.insert_resource(5u32);
        let value = world.resource_remove::<u32>().unwrap();
        assert!(!world.has_resource::<u32>());
        world.insert_resource(value + 1);
        assert_eq!(*world.resource::<u32>(), 6);
    }
}
