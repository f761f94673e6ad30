//! Value traits and the built-in value types.

use std::any::Any;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Owned, type-erased value storage of a data port.
pub type ErasedValue = Box<dyn Any + Send + Sync>;

/// Anything that can be stored in a data port.
///
/// This is implemented automatically for every type with the required
/// bounds; it exists so the bounds are spelled out once.
pub trait DataValue:
    Clone + PartialEq + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> DataValue for T where
    T: Clone + PartialEq + Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// A base value type that can be registered with a
/// [`TypeRegistry`](super::TypeRegistry).
///
/// The name is what persisted documents use to refer to the type. The text
/// form of a value goes through [`ValueType::to_json`] and
/// [`ValueType::from_json`]; lists and animations of the type are built from
/// the same two functions.
pub trait ValueType: DataValue {
    /// Human-readable type name, unique within a registry.
    const NAME: &'static str;

    /// The JSON form of a value. Defaults to the serde representation.
    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Read a value back from its JSON form.
    fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }
}

impl ValueType for i32 {
    const NAME: &'static str = "integer";
}

impl ValueType for f64 {
    const NAME: &'static str = "real";

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        real::serialize(self, serde_json::value::Serializer)
    }

    fn from_json(value: serde_json::Value) -> serde_json::Result<Self> {
        real::deserialize(value)
    }
}

/// Serde representation of a real that keeps non-finite values.
///
/// JSON has no infinity or NaN: those are written as the strings `"inf"`,
/// `"-inf"` and `"nan"`, every other value as a plain number.
pub(crate) mod real {
    use serde::{de, Deserialize, Deserializer, Serializer};

    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";
    const NAN: &str = "nan";

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() && value.is_sign_positive() {
            serializer.serialize_str(INFINITY)
        } else if value.is_infinite() {
            serializer.serialize_str(NEG_INFINITY)
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(f64),
            Token(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Token(token) => match token.as_str() {
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                NAN => Ok(f64::NAN),
                other => Err(de::Error::custom(format!("invalid real {other:?}"))),
            },
        }
    }
}

impl ValueType for String {
    const NAME: &'static str = "text";
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    #[serde(with = "real")]
    pub x: f64,
    #[serde(with = "real")]
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl ValueType for Point {
    const NAME: &'static str = "point";
}

/// An RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    #[serde(with = "real")]
    pub r: f64,
    #[serde(with = "real")]
    pub g: f64,
    #[serde(with = "real")]
    pub b: f64,
    #[serde(with = "real")]
    pub a: f64,
}

impl Color {
    /// Create a new color, clamping every component to `[0, 1]`.
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }
}

impl ValueType for Color {
    const NAME: &'static str = "color";
}

/// A keyframe track: values keyed by time, sorted by key.
///
/// Sampling is step-wise: a track holds the value of the last key at or
/// before the sampled time, and the first key before that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animation<T> {
    keys: Vec<(f64, T)>,
}

impl<T> Default for Animation<T> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<T> Animation<T> {
    /// Create an empty track.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, replacing any key at the same time.
    pub fn insert(&mut self, time: f64, value: T) {
        match self.keys.binary_search_by(|(t, _)| t.total_cmp(&time)) {
            Ok(pos) => self.keys[pos].1 = value,
            Err(pos) => self.keys.insert(pos, (time, value)),
        }
    }

    /// Remove the key at the given time, returning its value.
    pub fn remove(&mut self, time: f64) -> Option<T> {
        let pos = self
            .keys
            .binary_search_by(|(t, _)| t.total_cmp(&time))
            .ok()?;
        Some(self.keys.remove(pos).1)
    }

    /// Sample the track.
    pub fn value_at(&self, time: f64) -> Option<&T> {
        let pos = self.keys.partition_point(|(t, _)| *t <= time);
        self.keys.get(pos.saturating_sub(1)).map(|(_, v)| v)
    }

    /// Iterate over `(time, value)` keys in time order.
    pub fn keys(&self) -> impl Iterator<Item = (f64, &T)> {
        self.keys.iter().map(|(t, v)| (*t, v))
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the track has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animation_keeps_keys_sorted() {
        let mut anim = Animation::new();
        anim.insert(2.0, 20);
        anim.insert(0.0, 0);
        anim.insert(1.0, 10);
        anim.insert(1.0, 11);

        let keys: Vec<_> = anim.keys().map(|(t, v)| (t, *v)).collect();
        assert_eq!(keys, vec![(0.0, 0), (1.0, 11), (2.0, 20)]);
    }

    #[test]
    fn animation_samples_step_wise() {
        let mut anim = Animation::new();
        anim.insert(1.0, "a".to_string());
        anim.insert(3.0, "b".to_string());

        assert_eq!(anim.value_at(0.0).map(String::as_str), Some("a"));
        assert_eq!(anim.value_at(2.9).map(String::as_str), Some("a"));
        assert_eq!(anim.value_at(3.0).map(String::as_str), Some("b"));
        assert_eq!(anim.value_at(100.0).map(String::as_str), Some("b"));
        assert!(Animation::<i32>::new().value_at(0.0).is_none());
    }

    #[test]
    fn animation_remove() {
        let mut anim = Animation::new();
        anim.insert(1.0, 1);
        assert_eq!(anim.remove(1.0), Some(1));
        assert_eq!(anim.remove(1.0), None);
        assert!(anim.is_empty());
    }

    #[test]
    fn color_components_are_clamped() {
        let c = Color::new(2.0, -1.0, 0.5, 1.0);
        assert_eq!(c, Color { r: 1.0, g: 0.0, b: 0.5, a: 1.0 });
    }
}
