//! # Query — Iterating Entities by Component Type
//!
//! ```text
//! world.query::<(&Transform, &mut WorldTransform)>(|entity, (local, world)| {
//!     // ...
//! });
//!
//! 1. Take the Transform and WorldTransform stores out of the world.
//! 2. Walk the smaller store's owner list.
//! 3. For each owner present in every store, fetch and call the closure.
//! 4. Put the stores back.
//! ```
//!
//! Taking stores out (rather than borrowing them) is what lets the borrow
//! checker see that `&Transform` and `&mut WorldTransform` never alias: each
//! parameter owns its column for the duration of the query. Asking for the
//! same component twice in one query panics, since there is only one store
//! to take. That check runs before any store leaves the world.

use std::any::TypeId;

use super::entity::Entity;
use super::reflect::Component;
use super::store::Store;
use super::world::World;

/// One column a query takes.
#[derive(Debug, Clone, Copy)]
pub struct ColumnAccess {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub mutable: bool,
}

impl ColumnAccess {
    fn of<T: Component>(mutable: bool) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            mutable,
        }
    }
}

/// Something a query can fetch per entity: `&T`, `&mut T`, or a tuple.
pub trait QueryParam {
    /// The item yielded per entity.
    type Item<'w>;

    /// Owned column data taken out of the world for the query's duration.
    type Column;

    /// Push the component type of every column this parameter takes, and
    /// whether it is taken mutably.
    fn component_types(out: &mut Vec<ColumnAccess>);

    /// Take every column, or none: on `None` the world is as it was.
    fn extract(world: &mut World) -> Option<Self::Column>;

    fn restore(col: Self::Column, world: &mut World);

    /// The shortest owner list among the extracted columns.
    fn candidates(col: &Self::Column) -> &[Entity];

    /// Fetch the item for `entity`, or `None` if any column lacks it.
    fn fetch(col: &mut Self::Column, entity: Entity) -> Option<Self::Item<'_>>;
}

impl<T: Component> QueryParam for &T {
    type Item<'w> = &'w T;
    type Column = Box<Store<T>>;

    fn component_types(out: &mut Vec<ColumnAccess>) {
        out.push(ColumnAccess::of::<T>(false));
    }

    fn extract(world: &mut World) -> Option<Self::Column> {
        world.take_store::<T>()
    }

    fn restore(col: Self::Column, world: &mut World) {
        world.restore_store(col);
    }

    fn candidates(col: &Self::Column) -> &[Entity] {
        col.entities()
    }

    fn fetch(col: &mut Self::Column, entity: Entity) -> Option<Self::Item<'_>> {
        col.get(entity)
    }
}

impl<T: Component> QueryParam for &mut T {
    type Item<'w> = &'w mut T;
    type Column = Box<Store<T>>;

    fn component_types(out: &mut Vec<ColumnAccess>) {
        out.push(ColumnAccess::of::<T>(true));
    }

    fn extract(world: &mut World) -> Option<Self::Column> {
        world.take_store::<T>()
    }

    fn restore(col: Self::Column, world: &mut World) {
        world.restore_store(col);
    }

    fn candidates(col: &Self::Column) -> &[Entity] {
        col.entities()
    }

    fn fetch(col: &mut Self::Column, entity: Entity) -> Option<Self::Item<'_>> {
        col.get_mut(entity)
    }
}

macro_rules! impl_query_param_tuple {
    ($($P:ident),+) => {
        impl<$($P: QueryParam),+> QueryParam for ($($P,)+) {
            type Item<'w> = ($($P::Item<'w>,)+);
            type Column = ($($P::Column,)+);

            fn component_types(out: &mut Vec<ColumnAccess>) {
                $($P::component_types(out);)+
            }

            #[allow(non_snake_case)]
            fn extract(world: &mut World) -> Option<Self::Column> {
                let ($($P,)+) = ($($P::extract(world),)+);
                match ($($P,)+) {
                    ($(Some($P),)+) => Some(($($P,)+)),
                    ($($P,)+) => {
                        $(
                            if let Some(col) = $P {
                                $P::restore(col, world);
                            }
                        )+
                        None
                    }
                }
            }

            #[allow(non_snake_case)]
            fn restore(col: Self::Column, world: &mut World) {
                let ($($P,)+) = col;
                $($P::restore($P, world);)+
            }

            #[allow(non_snake_case)]
            fn candidates(col: &Self::Column) -> &[Entity] {
                let ($($P,)+) = col;
                let mut best: Option<&[Entity]> = None;
                $(
                    let list = $P::candidates($P);
                    if best.is_none_or(|b| list.len() < b.len()) {
                        best = Some(list);
                    }
                )+
                best.unwrap_or(&[])
            }

            #[allow(non_snake_case)]
            fn fetch(col: &mut Self::Column, entity: Entity) -> Option<Self::Item<'_>> {
                let ($($P,)+) = col;
                Some(($($P::fetch($P, entity)?,)+))
            }
        }
    };
}

impl_query_param_tuple!(A);
impl_query_param_tuple!(A, B);
impl_query_param_tuple!(A, B, C);
impl_query_param_tuple!(A, B, C, D);
impl_query_param_tuple!(A, B, C, D, E);
impl_query_param_tuple!(A, B, C, D, E, F);
