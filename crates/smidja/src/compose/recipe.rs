//! Recipes: named entity templates for declarative instantiation.
//!
//! A recipe lists the components an entity starts with and, optionally,
//! default attribute values written right after those components are added
//! and before the caller's own attributes:
//!
//! ```ignore
//! Recipe::new("turret")
//!     .with_component("transform")
//!     .with_component("weapon")
//!     .with_default("weapon.cooldown", "0.5")
//!     .with_default("transform.scale", "0.5");
//! ```
//!
//! Recipes refer to components by name only. Names are resolved when the
//! recipe is instantiated, so a recipe can be registered before the plugin
//! that provides its components.

use serde::{Deserialize, Serialize};

use crate::names::{NameMap, canonical};

/// A named component set plus default attribute overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    name: String,
    #[serde(default)]
    components: Vec<String>,
    /// `(dotted path, value)` pairs, applied in order.
    #[serde(default)]
    defaults: Vec<(String, String)>,
}

impl Recipe {
    pub fn new(name: &str) -> Self {
        Self {
            name: canonical(name),
            components: Vec::new(),
            defaults: Vec::new(),
        }
    }

    pub fn with_component(mut self, component: &str) -> Self {
        let component = canonical(component);
        if !self.components.contains(&component) {
            self.components.push(component);
        }
        self
    }

    pub fn with_default(mut self, path: &str, value: &str) -> Self {
        self.defaults.push((path.to_string(), value.to_string()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn defaults(&self) -> &[(String, String)] {
        &self.defaults
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RecipeId(u32);

/// Recipe registry. Registering a name again replaces the recipe.
#[derive(Debug, Default)]
pub struct RecipeRegistry {
    recipes: Vec<Recipe>,
    names: NameMap<RecipeId>,
}

impl RecipeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a recipe. Returns the recipe it replaced.
    pub fn register(&mut self, recipe: Recipe) -> Option<Recipe> {
        match self.names.get(recipe.name()) {
            Some(id) => {
                log::debug!("replacing recipe `{}`", recipe.name());
                Some(std::mem::replace(&mut self.recipes[id.0 as usize], recipe))
            }
            None => {
                let id = RecipeId(self.recipes.len() as u32);
                self.names.insert(recipe.name(), id);
                self.recipes.push(recipe);
                None
            }
        }
    }

    /// Look up a recipe. `None` for unknown names.
    pub fn get(&self, name: &str) -> Option<&Recipe> {
        self.names.get(name).map(|id| &self.recipes[id.0 as usize])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Recipe names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.names()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup_canonicalized() {
        let mut recipes = RecipeRegistry::new();
        recipes.register(Recipe::new("SpaceShip").with_component("Transform"));
        let ship = recipes.get("space_ship").unwrap();
        assert_eq!(ship.name(), "space-ship");
        assert_eq!(ship.components(), &["transform".to_string()]);
        assert!(recipes.get("station").is_none());
    }

    #[test]
    fn reregistering_replaces_in_place() {
        let mut recipes = RecipeRegistry::new();
        recipes.register(Recipe::new("a"));
        recipes.register(Recipe::new("b"));
        let old = recipes.register(Recipe::new("a").with_component("transform"));
        assert_eq!(old, Some(Recipe::new("a")));
        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(recipes.get("a").unwrap().components().len(), 1);
    }

    #[test]
    fn recipes_load_from_json() {
        let recipe: Recipe = serde_json::from_str(
            r#"{ "name": "crate", "components": ["transform"],
                 "defaults": [["transform.scale", "0.5"]] }"#,
        )
        .unwrap();
        assert_eq!(recipe.components(), &["transform".to_string()]);
        assert_eq!(recipe.defaults()[0].1, "0.5");
    }
}
