//! # Composer — Markup to Live Entities
//!
//! Turns a tree of [`Element`]s into entities through the recipe registry.
//! Each element's tag names a recipe; its attributes set component fields;
//! nesting makes parent/child links.
//!
//! ## Walk Order
//!
//! Depth-first, one element at a time. For every entity element:
//!
//! ```text
//! resolve recipe ──► spawn ──► add recipe components ──► recipe defaults
//!        │                                                     │
//!  UnknownRecipe                                               ▼
//!                 children ◄── set Parent ◄── bind name ◄── attributes
//! ```
//!
//! A parent is fully built and named before any of its children are
//! visited, and entities are live as soon as they are spawned. If an
//! element's attributes fail, that one entity is despawned and the error
//! is returned; entities built before it stay.
//!
//! ## Attribute Forms
//!
//! | Form                          | Meaning                                  |
//! |-------------------------------|------------------------------------------|
//! | `name="ship"`                 | bind the entity name                     |
//! | `transform.pos="0 1 0"`       | set one field                            |
//! | `transform="pos: 0 1 0; scale: 2"` | add the component, set listed fields |
//! | `speed="3"`                   | single-field component shorthand         |
//! | `marker=""`                   | just add the component                   |
//!
//! Recipe defaults use the same forms.
//!
//! ## Distinguished Elements
//!
//! - `<world>` is transparent: its children compose as if they were at its
//!   level.
//! - `<sequence>` makes a [`Sequence`] entity. Its `<tween>`/`<pause>`
//!   children are the steps, and an enclosing entity is the default target.
//!   A nested sequence is owned by that entity and despawned with it.
//! - `<tween>` makes a free-running tween. Tweens are instantiated after the
//!   rest of the document, so they may target any named entity in it.

pub mod grammar;
pub mod markup;
pub mod recipe;

use crate::ecs::reflect::find_field;
use crate::ecs::{ComponentId, Entity, World};
use crate::error::ConfigError;
use crate::names::canonical;
use crate::tween::{Sequence, TweenSpec, spawn_tween};

pub use markup::Element;
pub use recipe::{Recipe, RecipeRegistry};

/// Recipe used for elements with an empty tag.
pub const DEFAULT_RECIPE: &str = "entity";

/// What a composition produced, in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Composed {
    /// Entities created at the top level of the document.
    pub roots: Vec<Entity>,
    /// Every recipe entity, parents before children.
    pub entities: Vec<Entity>,
    pub sequences: Vec<Entity>,
    pub tweens: Vec<Entity>,
}

/// Builds entities from elements. See the module docs.
pub struct Composer<'a> {
    world: &'a mut World,
    recipes: &'a RecipeRegistry,
    deferred: Vec<(&'a Element, Option<Entity>)>,
    composed: Composed,
}

impl<'a> Composer<'a> {
    pub fn new(world: &'a mut World, recipes: &'a RecipeRegistry) -> Self {
        Self {
            world,
            recipes,
            deferred: Vec::new(),
            composed: Composed::default(),
        }
    }

    /// Compose a list of top-level elements.
    pub fn compose(mut self, elements: &'a [Element]) -> Result<Composed, ConfigError> {
        for element in elements {
            self.element(element, None)?;
        }

        for (element, parent) in std::mem::take(&mut self.deferred) {
            let spec = tween_spec(element)?;
            let tween = spawn_tween(self.world, &spec, parent)?;
            self.composed.tweens.push(tween);
        }

        log::debug!(
            "composed {} entities, {} sequences, {} tweens",
            self.composed.entities.len(),
            self.composed.sequences.len(),
            self.composed.tweens.len()
        );
        Ok(self.composed)
    }

    fn element(&mut self, element: &'a Element, parent: Option<Entity>) -> Result<(), ConfigError> {
        match canonical(&element.tag).as_str() {
            "world" => {
                for child in &element.children {
                    self.element(child, parent)?;
                }
                Ok(())
            }
            "sequence" => self.sequence(element, parent),
            "tween" => {
                self.deferred.push((element, parent));
                Ok(())
            }
            "pause" => Err(ConfigError::MalformedAttribute {
                element: "pause".to_string(),
                attribute: "duration".to_string(),
                value: element.attribute("duration").unwrap_or_default().to_string(),
                reason: "<pause> is only valid inside a <sequence>".to_string(),
            }),
            _ => self.entity(element, parent),
        }
    }

    fn entity(&mut self, element: &'a Element, parent: Option<Entity>) -> Result<(), ConfigError> {
        let tag = if element.tag.trim().is_empty() {
            DEFAULT_RECIPE
        } else {
            element.tag.as_str()
        };
        let recipes = self.recipes;
        let recipe = recipes
            .get(tag)
            .ok_or_else(|| ConfigError::UnknownRecipe(tag.to_string()))?;

        let entity = self.world.spawn();
        let attributes = element
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()));
        if let Err(err) = populate(self.world, entity, recipe, attributes, tag) {
            self.world.despawn(entity);
            return Err(err);
        }
        if let Some(name) = element.attribute("name") {
            self.world.set_name(entity, name);
        }
        if let Some(parent) = parent {
            self.world.set_parent(entity, parent);
        } else {
            self.composed.roots.push(entity);
        }
        self.composed.entities.push(entity);

        for child in &element.children {
            self.element(child, Some(entity))?;
        }
        Ok(())
    }

    fn sequence(&mut self, element: &'a Element, parent: Option<Entity>) -> Result<(), ConfigError> {
        let steps = element
            .children
            .iter()
            .map(tween_spec)
            .collect::<Result<Vec<_>, _>>()?;

        let mut autoplay = false;
        let entity = self.world.spawn();
        for (key, value) in &element.attributes {
            let result = match canonical(key).as_str() {
                "name" => Ok(()),
                "autoplay" => grammar::parse_flag(value)
                    .map(|flag| autoplay = flag)
                    .map_err(|reason| malformed("sequence", key, value, reason)),
                _ => apply_attribute(self.world, "sequence", entity, key, value),
            };
            if let Err(err) = result {
                self.world.despawn(entity);
                return Err(err);
            }
        }

        let mut sequence = Sequence::new(steps).with_autoplay(autoplay);
        if let Some(parent) = parent {
            sequence = sequence.with_default_target(parent);
            self.world.attach_owned(parent, entity);
        }
        self.world.insert(entity, sequence);
        if let Some(name) = element.attribute("name") {
            self.world.set_name(entity, name);
        }
        self.composed.sequences.push(entity);
        Ok(())
    }
}

/// Spawn one entity from a recipe and apply `attributes` on top of the
/// recipe's defaults. Nothing is parented; `name` binds the entity name.
pub fn instantiate<'s>(
    world: &mut World,
    recipe: &Recipe,
    attributes: impl IntoIterator<Item = (&'s str, &'s str)>,
) -> Result<Entity, ConfigError> {
    let attributes: Vec<(&str, &str)> = attributes.into_iter().collect();
    let entity = world.spawn();
    let result = populate(
        world,
        entity,
        recipe,
        attributes.iter().map(|&(k, v)| (k, v)),
        recipe.name(),
    );
    if let Err(err) = result {
        world.despawn(entity);
        return Err(err);
    }
    if let Some(&(_, name)) = attributes.iter().find(|(k, _)| canonical(k) == "name") {
        world.set_name(entity, name);
    }
    Ok(entity)
}

/// Recipe components, then recipe defaults, then `attributes`. `name` is
/// skipped here; the caller binds it.
fn populate<'s>(
    world: &mut World,
    entity: Entity,
    recipe: &Recipe,
    attributes: impl Iterator<Item = (&'s str, &'s str)>,
    element: &str,
) -> Result<(), ConfigError> {
    for component in recipe.components() {
        let id = world
            .component_by_name(component)
            .ok_or_else(|| ConfigError::UnknownComponent(component.clone()))?;
        world.add_component(entity, id)?;
    }
    for (path, value) in recipe.defaults() {
        apply_attribute(world, recipe.name(), entity, path, value)?;
    }
    for (key, value) in attributes {
        if canonical(key) == "name" {
            continue;
        }
        apply_attribute(world, element, entity, key, value)?;
    }
    Ok(())
}

// ── Attributes ──────────────────────────────────────────────────────

fn malformed(element: &str, attribute: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedAttribute {
        element: element.to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Apply one attribute in any of the supported forms. The component is
/// added with its default value first if the entity lacks it.
pub fn apply_attribute(
    world: &mut World,
    element: &str,
    entity: Entity,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let (component, field) = match key.split_once('.') {
        Some((component, field)) => (component, Some(field)),
        None => (key, None),
    };
    let id = world
        .component_by_name(component)
        .ok_or_else(|| ConfigError::UnknownComponent(component.to_string()))?;
    world.add_component(entity, id)?;

    if let Some(field) = field {
        return write_field(world, element, entity, id, key, field, value);
    }
    if value.trim().is_empty() {
        return Ok(());
    }
    if grammar::is_field_list(value) {
        let pairs = grammar::split_fields(value)
            .map_err(|reason| malformed(element, key, value, reason))?;
        for (field, text) in pairs {
            write_field(world, element, entity, id, key, field, text)?;
        }
        return Ok(());
    }

    let mut writable = world.component_fields(id).iter().filter(|f| f.writable);
    match (writable.next(), writable.next()) {
        (Some(only), None) => write_field(world, element, entity, id, key, only.name, value),
        _ => Err(malformed(
            element,
            key,
            value,
            format!(
                "`{}` has no single settable field; use `field: value` pairs",
                world.component_label(id)
            ),
        )),
    }
}

fn write_field(
    world: &mut World,
    element: &str,
    entity: Entity,
    id: ComponentId,
    attribute: &str,
    field: &str,
    text: &str,
) -> Result<(), ConfigError> {
    let info = find_field(world.component_fields(id), field).ok_or_else(|| {
        ConfigError::UnknownField {
            component: world.component_label(id),
            field: field.to_string(),
        }
    })?;
    if !info.writable {
        return Err(malformed(
            element,
            attribute,
            text,
            format!("field `{}` is read-only", info.name),
        ));
    }
    let values = grammar::parse_value(info.kind, text)
        .map_err(|reason| malformed(element, attribute, text, reason))?;
    world
        .write_field(entity, id, info.name, &values)
        .map_err(|err| malformed(element, attribute, text, err.to_string()))
}

// ── Tween Elements ──────────────────────────────────────────────────

/// Read a `<tween>` or `<pause>` element into a spec.
///
/// ```text
/// <tween target="ship" attribute="transform.pos.y" from="0" to="2"
///        duration="1.5" easing="quad-out"/>
/// <pause duration="0.5"/>
/// ```
pub fn tween_spec(element: &Element) -> Result<TweenSpec, ConfigError> {
    let tag = canonical(&element.tag);
    let duration_text = element.attribute("duration").ok_or_else(|| {
        malformed(&tag, "duration", "", "missing required attribute `duration`")
    })?;
    let duration = grammar::parse_number(duration_text)
        .map_err(|reason| malformed(&tag, "duration", duration_text, reason))?;

    match tag.as_str() {
        "pause" => {
            if let Some((key, value)) = element
                .attributes
                .iter()
                .find(|(k, _)| canonical(k) != "duration")
            {
                return Err(malformed(&tag, key, value, "a pause only takes `duration`"));
            }
            Ok(TweenSpec::pause(duration))
        }
        "tween" => {
            let attribute = element.attribute("attribute").ok_or_else(|| {
                malformed(&tag, "attribute", "", "missing required attribute `attribute`")
            })?;
            let to_text = element
                .attribute("to")
                .ok_or_else(|| malformed(&tag, "to", "", "missing required attribute `to`"))?;
            let to = grammar::parse_numbers(to_text)
                .map_err(|reason| malformed(&tag, "to", to_text, reason))?;

            let mut spec = TweenSpec::new(attribute, &to, duration);
            for (key, value) in &element.attributes {
                match canonical(key).as_str() {
                    "attribute" | "to" | "duration" => {}
                    "target" => spec = spec.target(value.as_str()),
                    "easing" => spec = spec.easing(value),
                    "from" => {
                        let from = grammar::parse_numbers(value)
                            .map_err(|reason| malformed(&tag, key, value, reason))?;
                        spec = spec.starting_at(&from);
                    }
                    _ => return Err(malformed(&tag, key, value, "unknown tween attribute")),
                }
            }
            Ok(spec)
        }
        _ => Err(malformed(
            &tag,
            "",
            "",
            "only <tween> and <pause> may appear inside a <sequence>",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{Component, FieldError, FieldInfo, FieldKind, Parent};
    use crate::math::{Transform, Vec3, euler_degrees_from_quat};
    use crate::tween::Tween;

    #[derive(Debug, Default)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn fields() -> &'static [FieldInfo] {
            const FIELDS: &[FieldInfo] = &[
                FieldInfo::new("current", FieldKind::Scalar),
                FieldInfo::new("max", FieldKind::Scalar),
            ];
            FIELDS
        }

        fn read(&self, field: &str) -> Option<Vec<f32>> {
            match field {
                "current" => Some(vec![self.current]),
                "max" => Some(vec![self.max]),
                _ => None,
            }
        }

        fn write(&mut self, field: &str, value: &[f32]) -> Result<(), FieldError> {
            match field {
                "current" => self.current = value[0],
                "max" => self.max = value[0],
                _ => return Err(FieldError::Unknown(field.to_string())),
            }
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct Speed(f32);

    impl Component for Speed {
        fn fields() -> &'static [FieldInfo] {
            const FIELDS: &[FieldInfo] = &[FieldInfo::new("value", FieldKind::Scalar)];
            FIELDS
        }

        fn read(&self, field: &str) -> Option<Vec<f32>> {
            (field == "value").then(|| vec![self.0])
        }

        fn write(&mut self, field: &str, value: &[f32]) -> Result<(), FieldError> {
            match field {
                "value" => {
                    self.0 = value[0];
                    Ok(())
                }
                _ => Err(FieldError::Unknown(field.to_string())),
            }
        }
    }

    fn setup() -> (World, RecipeRegistry) {
        let mut world = World::new();
        world.register_component::<Transform>("transform");
        world.register_component::<Health>("health");
        world.register_component::<Speed>("speed");
        world.register_opaque_component::<Parent>("parent");

        let mut recipes = RecipeRegistry::new();
        recipes.register(Recipe::new("entity").with_component("transform"));
        recipes.register(
            Recipe::new("ship")
                .with_component("transform")
                .with_component("health")
                .with_default("health", "current: 10; max: 10")
                .with_default("transform.scale", "2"),
        );
        (world, recipes)
    }

    fn compose(world: &mut World, recipes: &RecipeRegistry, source: &str) -> Result<Composed, ConfigError> {
        let elements = markup::parse(source)?;
        Composer::new(world, recipes).compose(&elements)
    }

    #[test]
    fn nesting_builds_parent_links() {
        let (mut world, recipes) = setup();
        let composed = compose(
            &mut world,
            &recipes,
            r#"<world>
                 <entity name="a">
                   <entity name="b">
                     <entity name="c"/>
                   </entity>
                 </entity>
               </world>"#,
        )
        .unwrap();

        assert_eq!(composed.entities.len(), 3);
        assert_eq!(composed.roots.len(), 1);
        let [a, b, c] = [0, 1, 2].map(|i| composed.entities[i]);
        assert_eq!(world.parent_of(a), None);
        assert_eq!(world.parent_of(b), Some(a));
        assert_eq!(world.parent_of(c), Some(b));
        assert_eq!(world.named("c"), Some(c));
    }

    #[test]
    fn unknown_recipe_is_named() {
        let (mut world, recipes) = setup();
        let err = compose(&mut world, &recipes, "<station/>").unwrap_err();
        assert_eq!(err, ConfigError::UnknownRecipe("station".into()));
        assert_eq!(world.entity_count(), 0);
    }

    #[test]
    fn attribute_forms() {
        let (mut world, recipes) = setup();
        compose(
            &mut world,
            &recipes,
            r#"<entity name="probe"
                       transform="pos: 1 2 3; scale: 0.5"
                       transform.euler="0 90 0"
                       health.max="7"
                       speed="4"/>"#,
        )
        .unwrap();

        let probe = world.named("probe").unwrap();
        let t = world.get::<Transform>(probe).unwrap();
        assert_eq!(t.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scale, Vec3::splat(0.5));
        assert!((euler_degrees_from_quat(t.rotation).y - 90.0).abs() < 1e-2);
        assert_eq!(world.get::<Health>(probe).unwrap().max, 7.0);
        assert_eq!(world.get::<Speed>(probe).unwrap().0, 4.0);
    }

    #[test]
    fn recipe_defaults_apply_before_attributes() {
        let (mut world, recipes) = setup();
        compose(&mut world, &recipes, r#"<ship name="s" health.current="3"/>"#).unwrap();
        let ship = world.named("s").unwrap();
        let health = world.get::<Health>(ship).unwrap();
        assert_eq!((health.current, health.max), (3.0, 10.0));
        assert_eq!(world.get::<Transform>(ship).unwrap().scale, Vec3::splat(2.0));
    }

    #[test]
    fn malformed_attributes_are_reported() {
        let (mut world, recipes) = setup();
        let err = compose(&mut world, &recipes, r#"<entity transform.pos="1 2"/>"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MalformedAttribute { ref attribute, ref value, .. }
                if attribute == "transform.pos" && value == "1 2"
        ));
        // The half-built entity is gone.
        assert_eq!(world.entity_count(), 0);

        let err = compose(&mut world, &recipes, r#"<entity health.current="lots"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedAttribute { .. }));

        let err = compose(&mut world, &recipes, r#"<entity shield="5"/>"#).unwrap_err();
        assert_eq!(err, ConfigError::UnknownComponent("shield".into()));

        let err = compose(&mut world, &recipes, r#"<entity health.armor="5"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownField { ref field, .. } if field == "armor"));

        let err = compose(&mut world, &recipes, r#"<entity health="5"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedAttribute { .. }));
    }

    #[test]
    fn opaque_component_cannot_be_added_by_name() {
        let (mut world, recipes) = setup();
        let err = compose(&mut world, &recipes, r#"<entity parent=""/>"#).unwrap_err();
        assert_eq!(err, ConfigError::NotConstructible("parent".into()));
    }

    #[test]
    fn deferred_tweens_see_later_entities() {
        let (mut world, recipes) = setup();
        let composed = compose(
            &mut world,
            &recipes,
            r#"<world>
                 <tween target="late" attribute="transform.pos.x" to="5" duration="1"/>
                 <entity name="late"/>
               </world>"#,
        )
        .unwrap();
        assert_eq!(composed.tweens.len(), 1);
        let tween = world.get::<Tween>(composed.tweens[0]).unwrap();
        assert_eq!(tween.target(), world.named("late"));
    }

    #[test]
    fn nested_tween_targets_enclosing_entity() {
        let (mut world, recipes) = setup();
        let composed = compose(
            &mut world,
            &recipes,
            r#"<entity name="box">
                 <tween attribute="transform.scale" to="3" duration="0.5" easing="quad-out"/>
               </entity>"#,
        )
        .unwrap();
        let tween = world.get::<Tween>(composed.tweens[0]).unwrap();
        assert_eq!(tween.target(), world.named("box"));
        assert_eq!(tween.values().len(), 3);
    }

    #[test]
    fn sequences_collect_steps() {
        let (mut world, recipes) = setup();
        let composed = compose(
            &mut world,
            &recipes,
            r#"<entity name="ship">
                 <sequence name="intro" autoplay="true">
                   <tween attribute="transform.pos.y" to="2" duration="1"/>
                   <pause duration="0.5"/>
                   <tween target="ship" attribute="transform.scale" from="1" to="2" duration="1"/>
                 </sequence>
               </entity>"#,
        )
        .unwrap();

        let seq = world.named("intro").unwrap();
        assert_eq!(composed.sequences, vec![seq]);
        let sequence = world.get::<Sequence>(seq).unwrap();
        assert_eq!(sequence.steps().len(), 3);
        assert!(sequence.steps()[1].is_pause());
        assert_eq!(sequence.steps()[2].from, Some(vec![1.0]));

        // Owned by the enclosing entity.
        world.despawn(world.named("ship").unwrap());
        assert!(!world.is_alive(seq));
    }

    #[test]
    fn stray_pause_is_rejected() {
        let (mut world, recipes) = setup();
        let err = compose(&mut world, &recipes, r#"<pause duration="1"/>"#).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedAttribute { ref element, .. } if element == "pause"));
    }

    #[test]
    fn instantiate_applies_attributes() {
        let (mut world, recipes) = setup();
        let ship = instantiate(
            &mut world,
            recipes.get("ship").unwrap(),
            [("name", "hero"), ("health.max", "50")],
        )
        .unwrap();
        assert_eq!(world.named("hero"), Some(ship));
        assert_eq!(world.get::<Health>(ship).unwrap().max, 50.0);
    }
}
