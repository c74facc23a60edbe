//! A moon orbiting a planet orbiting a sun, driven by a custom component.
//!
//! Run with `RUST_LOG=info cargo run --example orbit`.

use smidja::prelude::*;

/// Spins an entity about its local Y axis.
#[derive(Debug, Default)]
struct Spin {
    degrees_per_sec: f32,
}

impl Component for Spin {
    fn fields() -> &'static [FieldInfo] {
        const FIELDS: &[FieldInfo] = &[FieldInfo::new("speed", FieldKind::Scalar)];
        FIELDS
    }

    fn read(&self, field: &str) -> Option<Vec<f32>> {
        (field == "speed").then(|| vec![self.degrees_per_sec])
    }

    fn write(&mut self, field: &str, value: &[f32]) -> Result<(), FieldError> {
        match field {
            "speed" => {
                self.degrees_per_sec = value[0];
                Ok(())
            }
            _ => Err(FieldError::Unknown(field.to_string())),
        }
    }
}

fn spin(world: &mut World) {
    let dt = world.resource::<Time>().delta_secs();
    world.query::<(&mut Transform, &Spin)>(|_, (transform, spin)| {
        let step = Quat::from_rotation_y((spin.degrees_per_sec * dt).to_radians());
        transform.rotation = (step * transform.rotation).normalize();
    });
}

/// Logs world positions twice a second instead of drawing.
struct ConsoleRenderer {
    frame: u64,
}

impl RenderBackend for ConsoleRenderer {
    fn draw(&mut self, world: &World) {
        self.frame += 1;
        if self.frame % 30 != 0 {
            return;
        }
        for name in ["planet", "moon"] {
            let Some(entity) = world.named(name) else {
                continue;
            };
            if let Some(wt) = world.get::<WorldTransform>(entity) {
                let p = wt.translation();
                log::info!("{name:>6}: ({:6.2}, {:6.2}, {:6.2})", p.x, p.y, p.z);
            }
        }
    }
}

const WORLD: &str = r#"
<world>
  <entity name="sun" spin="20">
    <entity name="planet" transform.pos="6 0 0" spin="90">
      <entity name="moon" transform="pos: 1.5 0 0; scale: 0.3"/>
    </entity>
  </entity>
</world>
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut runtime = Runtime::new();
    runtime.register_component::<Spin>("spin");
    runtime.add_system(System::new("spin").on_update(spin));
    runtime.add_render_backend(ConsoleRenderer { frame: 0 });

    let composed = runtime.load_world(WORLD)?;
    log::info!("loaded {} entities", composed.entities.len());

    for _ in 0..300 {
        runtime.step(1.0 / 60.0)?;
    }
    Ok(())
}
