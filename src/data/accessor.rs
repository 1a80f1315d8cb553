use std::fmt;
use std::rc::Rc;

use serde_json::Value;

type ComputedFn = Rc<dyn Fn(&Value, usize, &Value) -> Value>;

/// Reads one attribute of a datum.
///
/// Accessors are applied as `(datum, index, metadata)` where `metadata` is
/// the owning dataset's metadata object.
#[derive(Clone)]
pub enum Accessor {
    /// Field lookup on an object datum; missing fields read as `null`.
    Field(String),
    /// Same value for every datum.
    Constant(Value),
    /// Position of the datum within its dataset.
    Index,
    Computed(ComputedFn),
}

impl Accessor {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Constant(value.into())
    }

    #[must_use]
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&Value, usize, &Value) -> Value + 'static,
    {
        Self::Computed(Rc::new(f))
    }

    #[must_use]
    pub fn apply(&self, datum: &Value, index: usize, metadata: &Value) -> Value {
        match self {
            Self::Field(name) => datum.get(name).cloned().unwrap_or(Value::Null),
            Self::Constant(value) => value.clone(),
            Self::Index => Value::from(index),
            Self::Computed(f) => f(datum, index, metadata),
        }
    }

    /// The constant value, when the accessor does not depend on the datum.
    #[must_use]
    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Self::Constant(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Index => f.write_str("Index"),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl From<&str> for Accessor {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

impl From<f64> for Accessor {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::Accessor;

    #[test]
    fn accessors_read_datum_index_and_metadata() {
        let datum = json!({"x": 3, "label": "a"});
        let meta = json!({"scale": 10});

        assert_eq!(Accessor::field("x").apply(&datum, 0, &meta), json!(3));
        assert_eq!(Accessor::field("missing").apply(&datum, 0, &meta), json!(null));
        assert_eq!(Accessor::Index.apply(&datum, 4, &meta), json!(4));
        assert_eq!(Accessor::from(2.5).apply(&datum, 0, &meta), json!(2.5));

        let scaled = Accessor::computed(|datum, _, meta| {
            let x = datum["x"].as_f64().unwrap_or(0.0);
            let factor = meta["scale"].as_f64().unwrap_or(1.0);
            json!(x * factor)
        });
        assert_eq!(scaled.apply(&datum, 0, &meta), json!(30.0));
    }
}
