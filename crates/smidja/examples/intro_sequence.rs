//! A camera-style intro: fly in, hold, scale up, driven by a sequence
//! declared in markup. Restarts the sequence halfway to show re-triggering.
//!
//! Run with `RUST_LOG=debug cargo run --example intro_sequence`.

use smidja::prelude::*;

const WORLD: &str = r#"
<world>
  <entity name="logo" transform="pos: 0 -4 0; scale: 0.5"/>

  <sequence name="intro" autoplay="true">
    <tween target="logo" attribute="transform.pos.y" to="0" duration="1" easing="cubic-out"/>
    <pause duration="0.5"/>
    <tween target="logo" attribute="transform.scale" to="1" duration="0.75" easing="back-out"/>
  </sequence>

  <tween target="logo" attribute="transform.euler.y" from="0" to="360" duration="3"/>
</world>
"#;

fn report(runtime: &Runtime, label: &str) {
    let Some(logo) = runtime.named("logo") else {
        return;
    };
    if let Some(t) = runtime.world().get::<Transform>(logo) {
        log::info!(
            "{label:>10}: y = {:5.2}, scale = {:4.2}",
            t.translation.y,
            t.scale.x
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = RuntimeConfig::from_json(r#"{ "fixed_delta": 0.02 }"#)?;
    let mut runtime = Runtime::with_config(config);
    runtime.load_world(WORLD)?;

    for frame in 0..180 {
        runtime.step(1.0 / 60.0)?;
        if frame % 20 == 0 {
            report(&runtime, &format!("frame {frame}"));
        }
        if frame == 90 {
            log::info!("restarting intro");
            runtime.play_sequence("intro")?;
        }
    }
    report(&runtime, "done");
    Ok(())
}
