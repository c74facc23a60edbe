//! # Store — Columnar Per-Component Storage
//!
//! Each component type gets one [`Store`]: a sparse set keyed by entity slot.
//!
//! ```text
//! slots:  [·, 0, ·, 2, 1]      ← indexed by Entity::index, · = empty
//! owners: [e1, e4, e3]         ← dense, parallel to values
//! values: [v1, v4, v3]
//! ```
//!
//! Lookups are two array reads, iteration is a linear scan of `values`, and
//! removal is a swap-remove that patches one slot. Adding and removing
//! components never moves the entity's other components, which keeps the
//! composer's "add each component in turn" construction cheap.
//!
//! Stores are type-erased behind [`ComponentStore`] (read-only, public) and
//! [`ErasedStore`] (mutation, crate-private) so the world can reach them by
//! name without knowing `T`.

use std::any::Any;

use super::entity::Entity;
use super::reflect::{Component, FieldError, FieldInfo, find_field};

const EMPTY: u32 = u32::MAX;

/// Sparse-set column holding every `T` in the world.
pub struct Store<T> {
    values: Vec<T>,
    owners: Vec<Entity>,
    slots: Vec<u32>,
    make_default: Option<fn() -> T>,
}

impl<T> Store<T> {
    pub(crate) fn new() -> Self {
        Self {
            values: Vec::new(),
            owners: Vec::new(),
            slots: Vec::new(),
            make_default: None,
        }
    }

    pub(crate) fn set_default(&mut self, make: fn() -> T) {
        self.make_default = Some(make);
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let slot = *self.slots.get(entity.index as usize)?;
        if slot == EMPTY {
            return None;
        }
        let dense = slot as usize;
        (self.owners[dense] == entity).then_some(dense)
    }

    /// Insert or replace. Returns the previous value.
    pub(crate) fn insert(&mut self, entity: Entity, value: T) -> Option<T> {
        let slot = entity.index as usize;
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, EMPTY);
        }
        match self.slots[slot] {
            EMPTY => {
                self.slots[slot] = self.values.len() as u32;
                self.values.push(value);
                self.owners.push(entity);
                None
            }
            dense => {
                // Same slot: either a replace, or a leftover from a stale
                // generation that we simply take over.
                let dense = dense as usize;
                self.owners[dense] = entity;
                Some(std::mem::replace(&mut self.values[dense], value))
            }
        }
    }

    pub(crate) fn remove(&mut self, entity: Entity) -> Option<T> {
        let dense = self.dense_index(entity)?;
        self.slots[entity.index as usize] = EMPTY;
        let value = self.values.swap_remove(dense);
        self.owners.swap_remove(dense);
        if let Some(&moved) = self.owners.get(dense) {
            self.slots[moved.index as usize] = dense as u32;
        }
        Some(value)
    }

    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|i| &self.values[i])
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(move |i| &mut self.values[i])
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Entities that own a value, in dense (storage) order.
    pub fn entities(&self) -> &[Entity] {
        &self.owners
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.owners.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.owners.iter().copied().zip(self.values.iter_mut())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read-only, type-erased view of a store. Returned by
/// [`World::store_by_name`](super::world::World::store_by_name).
pub trait ComponentStore {
    fn type_name(&self) -> &'static str;
    fn fields(&self) -> &'static [FieldInfo];
    fn entities(&self) -> &[Entity];
    fn contains(&self, entity: Entity) -> bool;
    fn read_field(&self, entity: Entity, field: &str) -> Option<Vec<f32>>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mutating half of the erased interface, used by the world.
pub(crate) trait ErasedStore: Send + Sync {
    fn view(&self) -> &dyn ComponentStore;
    fn remove_entity(&mut self, entity: Entity) -> bool;
    /// Insert `T::default()` if the component was registered with one.
    /// `Ok(false)` when the entity already had the component.
    fn insert_default(&mut self, entity: Entity) -> Result<bool, ()>;
    fn write_field(&mut self, entity: Entity, field: &str, value: &[f32])
    -> Result<(), FieldError>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Component> ComponentStore for Store<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn fields(&self) -> &'static [FieldInfo] {
        T::fields()
    }

    fn entities(&self) -> &[Entity] {
        &self.owners
    }

    fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    fn read_field(&self, entity: Entity, field: &str) -> Option<Vec<f32>> {
        let info = find_field(T::fields(), field)?;
        self.get(entity)?.read(info.name)
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

impl<T: Component> ErasedStore for Store<T> {
    fn view(&self) -> &dyn ComponentStore {
        self
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn insert_default(&mut self, entity: Entity) -> Result<bool, ()> {
        if self.contains(entity) {
            return Ok(false);
        }
        let make = self.make_default.ok_or(())?;
        self.insert(entity, make());
        Ok(true)
    }

    fn write_field(
        &mut self,
        entity: Entity,
        field: &str,
        value: &[f32],
    ) -> Result<(), FieldError> {
        let info = find_field(T::fields(), field)
            .ok_or_else(|| FieldError::Unknown(field.to_string()))?;
        if !info.writable {
            return Err(FieldError::ReadOnly(info.name.to_string()));
        }
        let expected = info.kind.arity();
        if value.len() != expected {
            return Err(FieldError::Arity {
                field: info.name.to_string(),
                expected,
                got: value.len(),
            });
        }
        match self.get_mut(entity) {
            Some(component) => component.write(info.name, value),
            None => Err(FieldError::Unknown(field.to_string())),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
