//! # Component — Plain Data With Named Fields
//!
//! Any `'static + Send + Sync` type can be a component. Implementing
//! [`Component`] additionally describes its fields so the runtime can reach
//! them by name: the composer writes parsed markup attributes through
//! [`Component::write`], and tweens read and write individual scalars of a
//! field through the same two methods.
//!
//! Field values travel as `f32` slices whose length is the field's
//! [`FieldKind::arity`]. Parsing text into such a slice (scalars, vectors,
//! flags) happens at the composition boundary, not here.

use thiserror::Error;

/// Value shape of a component field. Also selects the attribute grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One number.
    Scalar,
    /// `n` space-separated numbers; a single number broadcasts to all lanes.
    Vector(usize),
    /// Orientation quaternion `x y z w`. Interpolated spherically.
    Quat,
    /// `true`/`false` (or a number, non-zero meaning true).
    Flag,
}

impl FieldKind {
    /// Number of scalars a value of this kind carries.
    pub fn arity(self) -> usize {
        match self {
            Self::Scalar | Self::Flag => 1,
            Self::Vector(n) => n,
            Self::Quat => 4,
        }
    }

    pub fn is_orientation(self) -> bool {
        matches!(self, Self::Quat)
    }
}

/// Static description of one reflected field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Canonical (kebab-case) field name.
    pub name: &'static str,
    pub kind: FieldKind,
    pub writable: bool,
}

impl FieldInfo {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            writable: true,
        }
    }

    pub const fn read_only(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            writable: false,
        }
    }
}

/// Why a field read or write was refused.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldError {
    #[error("no field `{0}`")]
    Unknown(String),
    #[error("field `{0}` is read-only")]
    ReadOnly(String),
    #[error("field `{field}` expects {expected} value(s), got {got}")]
    Arity {
        field: String,
        expected: usize,
        got: usize,
    },
}

/// A component with reflected fields.
///
/// The defaults describe an opaque component with no fields, which is all a
/// marker or an engine-internal component needs.
///
/// # Example
///
/// ```ignore
/// #[derive(Default)]
/// struct Health { current: f32 }
///
/// impl Component for Health {
///     fn fields() -> &'static [FieldInfo] {
///         const FIELDS: &[FieldInfo] = &[FieldInfo::new("current", FieldKind::Scalar)];
///         FIELDS
///     }
///     fn read(&self, field: &str) -> Option<Vec<f32>> {
///         (field == "current").then(|| vec![self.current])
///     }
///     fn write(&mut self, field: &str, value: &[f32]) -> Result<(), FieldError> {
///         match field {
///             "current" => { self.current = value[0]; Ok(()) }
///             _ => Err(FieldError::Unknown(field.to_string())),
///         }
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    fn fields() -> &'static [FieldInfo]
    where
        Self: Sized,
    {
        &[]
    }

    /// Read a field by canonical name.
    fn read(&self, field: &str) -> Option<Vec<f32>> {
        let _ = field;
        None
    }

    /// Write a field by canonical name. `value.len()` has already been
    /// checked against the field's arity by the caller.
    fn write(&mut self, field: &str, value: &[f32]) -> Result<(), FieldError> {
        let _ = value;
        Err(FieldError::Unknown(field.to_string()))
    }
}

/// Find a field by (canonicalized) name.
pub fn find_field<'a>(fields: &'a [FieldInfo], name: &str) -> Option<&'a FieldInfo> {
    let key = crate::names::canonical(name);
    fields.iter().find(|f| f.name == key)
}

/// Read three lanes as a `Vec3`.
pub(crate) fn vec3(value: &[f32]) -> crate::math::Vec3 {
    crate::math::Vec3::new(value[0], value[1], value[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_per_kind() {
        assert_eq!(FieldKind::Scalar.arity(), 1);
        assert_eq!(FieldKind::Flag.arity(), 1);
        assert_eq!(FieldKind::Vector(3).arity(), 3);
        assert_eq!(FieldKind::Quat.arity(), 4);
        assert!(FieldKind::Quat.is_orientation());
    }

    #[test]
    fn find_field_canonicalizes() {
        const FIELDS: &[FieldInfo] = &[FieldInfo::new("max-speed", FieldKind::Scalar)];
        assert!(find_field(FIELDS, "maxSpeed").is_some());
        assert!(find_field(FIELDS, "max_speed").is_some());
        assert!(find_field(FIELDS, "speed").is_none());
    }
}
