//! # Collaborators — Rendering, Physics and Networking Seams
//!
//! The runtime draws nothing, simulates no rigid bodies and opens no
//! sockets. Those jobs belong to external backends that plug in through
//! three traits, each wrapped into a [`System`] in the phase where it has to
//! run:
//!
//! ```text
//! Fixed        physics.step(world, fixed_delta)   writes local Transforms
//! Simulation   network.poll(world)                before tweens
//!              tween-advance, sequence-advance
//! Draw         transform-propagate
//!              render.draw(&world)                 after propagation
//! ```
//!
//! A renderer therefore always sees this tick's world transforms, and a
//! physics step's writes are picked up by the propagator in the same tick.
//!
//! `NetworkSync::poll` must not block: a backend with I/O in flight returns
//! immediately and publishes results into components on a later tick.

use crate::ecs::{Phase, System, TransformPlugin, World};
use crate::runtime::Runtime;
use crate::time::Time;
use crate::tween::TweenPlugin;

/// Draws the world. Runs in [`Phase::Draw`] with read-only access.
pub trait RenderBackend {
    fn draw(&mut self, world: &World);
}

/// Steps a physics simulation. Runs in [`Phase::Fixed`], once per fixed
/// step, and writes results back into local `Transform`s.
pub trait PhysicsBackend {
    fn step(&mut self, world: &mut World, fixed_delta: f32);
}

/// Exchanges state with remote peers. Runs early in
/// [`Phase::Simulation`]. Must return without blocking.
pub trait NetworkSync {
    fn poll(&mut self, world: &mut World);
}

pub const RENDER: &str = "render";
pub const PHYSICS: &str = "physics";
pub const NETWORK_SYNC: &str = "network-sync";

/// Wrap a renderer into a Draw-phase system. Ordered after transform
/// propagation when that system is scheduled.
pub fn render_system<B: RenderBackend + 'static>(mut backend: B) -> System {
    System::new(RENDER)
        .in_phase(Phase::Draw)
        .on_update(move |world: &mut World| backend.draw(world))
}

/// Wrap a physics backend into a Fixed-phase system.
pub fn physics_system<B: PhysicsBackend + 'static>(mut backend: B) -> System {
    System::new(PHYSICS)
        .in_phase(Phase::Fixed)
        .on_update(move |world: &mut World| {
            let dt = world.resource::<Time>().delta_secs();
            backend.step(world, dt);
        })
}

/// Wrap a network backend into a Simulation-phase system.
pub fn network_system<N: NetworkSync + 'static>(mut sync: N) -> System {
    System::new(NETWORK_SYNC)
        .in_phase(Phase::Simulation)
        .on_update(move |world: &mut World| sync.poll(world))
}

impl Runtime {
    /// Schedule a renderer after `transform-propagate` (if installed).
    pub fn add_render_backend<B: RenderBackend + 'static>(&mut self, backend: B) -> bool {
        let mut system = render_system(backend);
        if self.scheduler().contains(TransformPlugin::SYSTEM) {
            system = system.after(TransformPlugin::SYSTEM);
        }
        self.add_system(system)
    }

    pub fn add_physics_backend<B: PhysicsBackend + 'static>(&mut self, backend: B) -> bool {
        self.add_system(physics_system(backend))
    }

    /// Schedule a network backend before `tween-advance` (if installed).
    pub fn add_network_sync<N: NetworkSync + 'static>(&mut self, sync: N) -> bool {
        let mut system = network_system(sync);
        if self.scheduler().contains(TweenPlugin::ADVANCE) {
            system = system.before(TweenPlugin::ADVANCE);
        }
        self.add_system(system)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::ecs::{Entity, WorldTransform};
    use crate::math::Transform;
    use crate::runtime::RuntimeConfig;

    struct Recorder {
        seen: Rc<RefCell<Vec<f32>>>,
        entity: Entity,
    }

    impl RenderBackend for Recorder {
        fn draw(&mut self, world: &World) {
            if let Some(wt) = world.get::<WorldTransform>(self.entity) {
                self.seen.borrow_mut().push(wt.translation().x);
            }
        }
    }

    struct Pusher;

    impl PhysicsBackend for Pusher {
        fn step(&mut self, world: &mut World, _fixed_delta: f32) {
            world.query::<&mut Transform>(|_, transform| {
                transform.translation.x += 1.0;
            });
        }
    }

    struct Inbox(Rc<RefCell<u32>>);

    impl NetworkSync for Inbox {
        fn poll(&mut self, _world: &mut World) {
            *self.0.borrow_mut() += 1;
        }
    }

    #[test]
    fn renderer_sees_transforms_written_by_physics_this_tick() {
        let mut runtime = Runtime::with_config(RuntimeConfig {
            fixed_delta: 0.25,
            ..RuntimeConfig::default()
        });
        let e = runtime.create_from_recipe("entity", &[]).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        assert!(runtime.add_render_backend(Recorder {
            seen: seen.clone(),
            entity: e,
        }));
        assert!(runtime.add_physics_backend(Pusher));

        assert_eq!(
            runtime.system_order(Phase::Draw).unwrap(),
            [TransformPlugin::SYSTEM, RENDER]
        );
        runtime.step(0.25).unwrap();
        runtime.step(0.25).unwrap();
        assert_eq!(*seen.borrow(), [1.0, 2.0]);
    }

    #[test]
    fn network_polls_before_tweens() {
        let mut runtime = Runtime::new();
        let polls = Rc::new(RefCell::new(0));
        runtime.add_network_sync(Inbox(polls.clone()));
        assert_eq!(
            runtime.system_order(Phase::Simulation).unwrap(),
            [NETWORK_SYNC, TweenPlugin::ADVANCE, TweenPlugin::SEQUENCES]
        );
        runtime.step(0.1).unwrap();
        assert_eq!(*polls.borrow(), 1);
    }

    #[test]
    fn adapters_work_without_default_plugins() {
        let mut runtime = Runtime::empty();
        let entity = runtime.spawn();
        runtime.add_network_sync(Inbox(Rc::new(RefCell::new(0))));
        runtime.add_render_backend(Recorder {
            seen: Rc::new(RefCell::new(Vec::new())),
            entity,
        });
        assert!(runtime.startup().is_ok());
    }
}
