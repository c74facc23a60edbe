//! Error types.
//!
//! Two families, matching when they can happen:
//!
//! - [`ConfigError`]: something is wrong with what was registered or
//!   declared (recipes, components, systems, markup). Raised at setup or
//!   composition time and always names the offending identifier.
//! - [`RuntimeError`]: returned from [`Runtime::step`](crate::Runtime::step).
//!   Faults inside systems are normally recovered and only logged; they turn
//!   into an error under [`FaultPolicy::Halt`](crate::ecs::schedule::FaultPolicy).

use thiserror::Error;

use crate::ecs::schedule::Phase;

/// Configuration errors: fatal at setup/composition time.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown recipe `{0}`")]
    UnknownRecipe(String),

    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    #[error("component `{component}` has no field `{field}`")]
    UnknownField { component: String, field: String },

    #[error("system `{system}` is ordered against unknown system `{reference}`")]
    UnknownSystem { system: String, reference: String },

    #[error("no entity named `{0}`")]
    UnknownEntity(String),

    #[error("unknown easing `{0}`")]
    UnknownEasing(String),

    #[error("component `{0}` has no default value and cannot be added by name")]
    NotConstructible(String),

    #[error("dependency cycle in {phase:?} phase among systems: [{}]", .systems.join(", "))]
    DependencyCycle { phase: Phase, systems: Vec<String> },

    #[error(
        "system `{system}` ({phase:?}) cannot be ordered against `{reference}` in the {other:?} phase"
    )]
    CrossPhaseDependency {
        system: String,
        phase: Phase,
        reference: String,
        other: Phase,
    },

    #[error("malformed attribute `{attribute}` = \"{value}\" on <{element}>: {reason}")]
    MalformedAttribute {
        element: String,
        attribute: String,
        value: String,
        reason: String,
    },

    #[error("markup error at line {line}, column {column}: {message}")]
    Markup {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("invalid JSON document: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Errors surfaced while advancing the simulation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    /// The schedule could not be built (cycle, unknown reference, ...).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A system panicked and the fault policy is `Halt`.
    #[error("system `{system}` faulted: {message}")]
    SystemFault { system: String, message: String },
}

pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = ConfigError::UnknownRecipe("spaceship".into());
        assert!(err.to_string().contains("spaceship"));

        let err = ConfigError::DependencyCycle {
            phase: Phase::Simulation,
            systems: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle in Simulation phase among systems: [a, b]"
        );
    }

    #[test]
    fn config_error_converts_into_runtime_error() {
        let err: RuntimeError = ConfigError::UnknownComponent("body".into()).into();
        assert_eq!(err.to_string(), "unknown component `body`");
    }
}
