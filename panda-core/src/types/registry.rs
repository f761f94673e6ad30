//! Type Registry
//!
//! The registry maps Rust types to [`DataTypeId`]s and keeps, per id, the
//! function tables the rest of the engine uses to handle type-erased values.
//!
//! # Lifecycle
//!
//! A registry is built during start-up through `&mut` access and is then
//! shared read-only behind an `Arc`. Nothing mutates it afterwards, so
//! lookups need no locking. [`TypeRegistry::global`] provides a process-wide
//! instance holding the built-in types; tests and embedders that need extra
//! types build their own and hand it to the document.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use super::id::DataTypeId;
use super::value::{Animation, Color, DataValue, ErasedValue, Point, ValueType};
use super::TypeError;

type SizeFn = fn(&dyn Any) -> usize;
type FormatFn = fn(&dyn Any) -> Option<String>;
type ParseFn = fn(&str) -> Result<ErasedValue, serde_json::Error>;
type ConvertFn = Box<dyn Fn(&dyn Any) -> Option<ErasedValue> + Send + Sync>;

/// Function table for one registered type.
///
/// Every operation checks the concrete type of its arguments and fails
/// softly (returning `false`/`None`) when handed a value of another type.
pub struct ValueTrait {
    id: DataTypeId,
    name: String,
    rust_type: TypeId,
    create: fn() -> ErasedValue,
    clone_value: fn(&dyn Any) -> Option<ErasedValue>,
    equals: fn(&dyn Any, &dyn Any) -> bool,
    format: FormatFn,
    parse: ParseFn,
    size: SizeFn,
}

impl ValueTrait {
    fn of<S: DataValue>(id: DataTypeId, name: String, codec: Codec, size: SizeFn) -> Self {
        Self {
            id,
            name,
            rust_type: TypeId::of::<S>(),
            create: create_value::<S>,
            clone_value: clone_value::<S>,
            equals: equal_values::<S>,
            format: codec.format,
            parse: codec.parse,
            size,
        }
    }

    /// The type's id.
    pub fn id(&self) -> DataTypeId {
        self.id
    }

    /// The type's persisted name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `value` is of this type.
    pub fn holds(&self, value: &dyn Any) -> bool {
        Any::type_id(value) == self.rust_type
    }

    /// Create a default value.
    pub fn create(&self) -> ErasedValue {
        (self.create)()
    }

    /// Clone a value of this type.
    pub fn clone_value(&self, value: &dyn Any) -> Option<ErasedValue> {
        (self.clone_value)(value)
    }

    /// Compare two values of this type.
    pub fn equals(&self, a: &dyn Any, b: &dyn Any) -> bool {
        (self.equals)(a, b)
    }

    /// Turn a value into its string form.
    pub fn format_value(&self, value: &dyn Any) -> Result<String, TypeError> {
        (self.format)(value).ok_or_else(|| TypeError::Format {
            type_name: self.name.clone(),
        })
    }

    /// Parse a value from its string form.
    pub fn parse_value(&self, text: &str) -> Result<ErasedValue, TypeError> {
        (self.parse)(text).map_err(|source| TypeError::Parse {
            type_name: self.name.clone(),
            source,
        })
    }

    /// Number of elements: list length, key count of an animation, 1 for a
    /// single value.
    pub fn size(&self, value: &dyn Any) -> usize {
        (self.size)(value)
    }
}

impl fmt::Debug for ValueTrait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueTrait")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Assigns a value into existing storage of the same type.
///
/// Used when a linked data mirrors its parent.
#[derive(Clone, Copy)]
pub struct Copier {
    copy: fn(&dyn Any, &mut dyn Any) -> bool,
}

impl Copier {
    /// Copy `src` into `dst`. Returns `false` if either is of another type.
    pub fn copy(&self, src: &dyn Any, dst: &mut dyn Any) -> bool {
        (self.copy)(src, dst)
    }
}

impl fmt::Debug for Copier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Copier")
    }
}

/// Explicit coercion between two registered types.
pub struct Converter {
    from: DataTypeId,
    to: DataTypeId,
    convert: ConvertFn,
}

impl Converter {
    /// Source type.
    pub fn from_type(&self) -> DataTypeId {
        self.from
    }

    /// Target type.
    pub fn to_type(&self) -> DataTypeId {
        self.to
    }

    /// Convert a value of the source type into a new value of the target type.
    pub fn convert(&self, value: &dyn Any) -> Option<ErasedValue> {
        (self.convert)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Registry of value types, their function tables, copiers and converters.
#[derive(Debug)]
pub struct TypeRegistry {
    /// Number of base value types registered so far.
    value_count: u32,
    by_rust_type: HashMap<TypeId, DataTypeId>,
    by_name: HashMap<String, DataTypeId>,
    traits: HashMap<DataTypeId, ValueTrait>,
    copiers: HashMap<DataTypeId, Copier>,
    converters: HashMap<(DataTypeId, DataTypeId), Converter>,
}

static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();

impl TypeRegistry {
    /// Create a registry that only knows the generic connector type.
    pub fn new() -> Self {
        let mut registry = Self {
            value_count: 0,
            by_rust_type: HashMap::new(),
            by_name: HashMap::new(),
            traits: HashMap::new(),
            copiers: HashMap::new(),
            converters: HashMap::new(),
        };
        registry.insert::<()>(
            DataTypeId::GENERIC,
            "generic".to_string(),
            Codec::serde::<()>(),
            size_one,
        );
        registry
    }

    /// Create a registry holding the built-in value types and converters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<i32>();
        registry.register::<f64>();
        registry.register::<String>();
        registry.register::<Point>();
        registry.register::<Color>();

        let converters = [
            registry.register_converter::<i32, f64>(|v| f64::from(*v)),
            registry.register_converter::<f64, i32>(|v| *v as i32),
            registry.register_converter::<Vec<i32>, Vec<f64>>(|v| {
                v.iter().map(|x| f64::from(*x)).collect()
            }),
            registry.register_converter::<Vec<f64>, Vec<i32>>(|v| v.iter().map(|x| *x as i32).collect()),
        ];
        for err in converters.into_iter().filter_map(Result::err) {
            tracing::error!(%err, "failed to register built-in converter");
        }
        registry
    }

    /// The process-wide registry with the built-in types.
    pub fn global() -> Arc<TypeRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::with_builtins())))
    }

    /// Register a base value type together with its list and animation
    /// forms. Registering the same type again returns the same id.
    pub fn register<T: ValueType>(&mut self) -> DataTypeId {
        if let Some(&id) = self.by_rust_type.get(&TypeId::of::<T>()) {
            return id;
        }

        assert!(
            self.value_count < DataTypeId::MAX_VALUE_TYPES,
            "too many value types registered"
        );
        self.value_count += 1;
        let id = DataTypeId::from_value_index(self.value_count);

        self.insert::<T>(id, T::NAME.to_string(), Codec::single::<T>(), size_one);
        self.insert::<Vec<T>>(
            id.vector_of(),
            format!("{}_list", T::NAME),
            Codec::list::<T>(),
            size_list::<T>,
        );
        self.insert::<Animation<T>>(
            id.animation_of(),
            format!("{}_animation", T::NAME),
            Codec::animation::<T>(),
            size_animation::<T>,
        );

        tracing::debug!(type_name = T::NAME, %id, "registered value type");
        id
    }

    fn insert<S: DataValue>(&mut self, id: DataTypeId, name: String, codec: Codec, size: SizeFn) {
        self.by_rust_type.insert(TypeId::of::<S>(), id);
        if let Some(existing) = self.by_name.get(&name) {
            tracing::warn!(%name, %existing, %id, "type name already registered, keeping the first");
        } else {
            self.by_name.insert(name.clone(), id);
        }
        self.traits.insert(id, ValueTrait::of::<S>(id, name, codec, size));
        self.copiers.insert(id, Copier { copy: copy_value::<S> });
    }

    /// Register an explicit conversion from `A` to `B`.
    ///
    /// Both types must already be registered.
    pub fn register_converter<A: DataValue, B: DataValue>(
        &mut self,
        convert: fn(&A) -> B,
    ) -> Result<(), TypeError> {
        let from = self.id_of::<A>()?;
        let to = self.id_of::<B>()?;
        let convert: ConvertFn = Box::new(move |value| {
            value
                .downcast_ref::<A>()
                .map(|a| Box::new(convert(a)) as ErasedValue)
        });
        self.converters.insert((from, to), Converter { from, to, convert });
        Ok(())
    }

    /// Get the id of a registered Rust type.
    pub fn id_of<T: 'static>(&self) -> Result<DataTypeId, TypeError> {
        self.by_rust_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or_else(|| TypeError::UnknownType(std::any::type_name::<T>().to_string()))
    }

    /// Resolve a persisted type name.
    pub fn id_by_name(&self, name: &str) -> Result<DataTypeId, TypeError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))
    }

    /// Get the function table of a type.
    pub fn value_trait(&self, id: DataTypeId) -> Result<&ValueTrait, TypeError> {
        self.traits.get(&id).ok_or(TypeError::UnknownTypeId(id))
    }

    /// Get the copier of a type.
    pub fn copier(&self, id: DataTypeId) -> Result<&Copier, TypeError> {
        self.copiers.get(&id).ok_or(TypeError::UnknownTypeId(id))
    }

    /// Get the converter between two types, if one is registered.
    pub fn converter(&self, from: DataTypeId, to: DataTypeId) -> Option<&Converter> {
        self.converters.get(&(from, to))
    }

    /// Whether a value of type `from` can feed a port of type `to`.
    pub fn can_convert(&self, from: DataTypeId, to: DataTypeId) -> bool {
        from == to || self.converters.contains_key(&(from, to))
    }

    /// Name of a type, or a placeholder for unknown ids.
    pub fn type_name(&self, id: DataTypeId) -> String {
        self.traits
            .get(&id)
            .map_or_else(|| id.to_string(), |t| t.name.clone())
    }

    /// The list form of a registered base type.
    pub fn full_type_of_vector(&self, value_type: DataTypeId) -> Result<DataTypeId, TypeError> {
        self.known(value_type.vector_of())
    }

    /// The animation form of a registered base type.
    pub fn full_type_of_animation(&self, value_type: DataTypeId) -> Result<DataTypeId, TypeError> {
        self.known(value_type.animation_of())
    }

    /// The base value type of a registered full type.
    pub fn value_type(&self, full_type: DataTypeId) -> Result<DataTypeId, TypeError> {
        self.known(full_type.value_type())
    }

    fn known(&self, id: DataTypeId) -> Result<DataTypeId, TypeError> {
        if self.traits.contains_key(&id) {
            Ok(id)
        } else {
            Err(TypeError::UnknownTypeId(id))
        }
    }

    /// Iterate over every registered id, sorted.
    pub fn type_ids(&self) -> Vec<DataTypeId> {
        let mut ids: Vec<_> = self.traits.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn create_value<S: DataValue>() -> ErasedValue {
    Box::new(S::default())
}

fn clone_value<S: DataValue>(value: &dyn Any) -> Option<ErasedValue> {
    value
        .downcast_ref::<S>()
        .map(|v| Box::new(v.clone()) as ErasedValue)
}

fn copy_value<S: DataValue>(src: &dyn Any, dst: &mut dyn Any) -> bool {
    match (src.downcast_ref::<S>(), dst.downcast_mut::<S>()) {
        (Some(src), Some(dst)) => {
            dst.clone_from(src);
            true
        }
        _ => false,
    }
}

fn equal_values<S: DataValue>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<S>(), b.downcast_ref::<S>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Text codec of a type: JSON, built from [`ValueType::to_json`] and
/// [`ValueType::from_json`] for registered value types.
#[derive(Clone, Copy)]
struct Codec {
    format: FormatFn,
    parse: ParseFn,
}

impl Codec {
    fn serde<S: DataValue>() -> Self {
        Self {
            format: |value| serde_json::to_string(value.downcast_ref::<S>()?).ok(),
            parse: |text| serde_json::from_str::<S>(text).map(|v| Box::new(v) as ErasedValue),
        }
    }

    fn single<T: ValueType>() -> Self {
        Self {
            format: format_single::<T>,
            parse: parse_single::<T>,
        }
    }

    fn list<T: ValueType>() -> Self {
        Self {
            format: format_list::<T>,
            parse: parse_list::<T>,
        }
    }

    fn animation<T: ValueType>() -> Self {
        Self {
            format: format_animation::<T>,
            parse: parse_animation::<T>,
        }
    }
}

fn format_single<T: ValueType>(value: &dyn Any) -> Option<String> {
    let json = value.downcast_ref::<T>()?.to_json().ok()?;
    serde_json::to_string(&json).ok()
}

fn parse_single<T: ValueType>(text: &str) -> Result<ErasedValue, serde_json::Error> {
    let value = T::from_json(serde_json::from_str(text)?)?;
    Ok(Box::new(value))
}

fn format_list<T: ValueType>(value: &dyn Any) -> Option<String> {
    let items = value
        .downcast_ref::<Vec<T>>()?
        .iter()
        .map(T::to_json)
        .collect::<serde_json::Result<Vec<_>>>()
        .ok()?;
    serde_json::to_string(&items).ok()
}

fn parse_list<T: ValueType>(text: &str) -> Result<ErasedValue, serde_json::Error> {
    let items: Vec<serde_json::Value> = serde_json::from_str(text)?;
    let list = items
        .into_iter()
        .map(T::from_json)
        .collect::<serde_json::Result<Vec<T>>>()?;
    Ok(Box::new(list))
}

/// Animations are written as `{"keys": [[time, value], ...]}`.
#[derive(serde::Serialize, serde::Deserialize)]
struct AnimationKeys {
    keys: Vec<(serde_json::Value, serde_json::Value)>,
}

fn format_animation<T: ValueType>(value: &dyn Any) -> Option<String> {
    let keys = value
        .downcast_ref::<Animation<T>>()?
        .keys()
        .map(|(time, key)| -> serde_json::Result<_> { Ok((time.to_json()?, key.to_json()?)) })
        .collect::<serde_json::Result<Vec<_>>>()
        .ok()?;
    serde_json::to_string(&AnimationKeys { keys }).ok()
}

fn parse_animation<T: ValueType>(text: &str) -> Result<ErasedValue, serde_json::Error> {
    let AnimationKeys { keys } = serde_json::from_str(text)?;
    let mut animation = Animation::new();
    for (time, value) in keys {
        animation.insert(f64::from_json(time)?, T::from_json(value)?);
    }
    Ok(Box::new(animation))
}

fn size_one(_: &dyn Any) -> usize {
    1
}

fn size_list<T: ValueType>(value: &dyn Any) -> usize {
    value.downcast_ref::<Vec<T>>().map_or(0, Vec::len)
}

fn size_animation<T: ValueType>(value: &dyn Any) -> usize {
    value.downcast_ref::<Animation<T>>().map_or(0, Animation::len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
    struct Mesh {
        vertices: Vec<Point>,
    }

    impl ValueType for Mesh {
        const NAME: &'static str = "mesh";
    }

    #[test]
    fn registration_is_idempotent() {
        let mut registry = TypeRegistry::new();
        let first = registry.register::<Mesh>();
        let second = registry.register::<Mesh>();
        assert_eq!(first, second);
        assert_eq!(registry.id_of::<Mesh>().unwrap(), first);
    }

    #[test]
    fn list_and_animation_forms_are_registered() {
        let registry = TypeRegistry::with_builtins();
        let real = registry.id_of::<f64>().unwrap();

        assert_eq!(registry.id_of::<Vec<f64>>().unwrap(), real.vector_of());
        assert_eq!(registry.id_of::<Animation<f64>>().unwrap(), real.animation_of());
        assert_eq!(registry.full_type_of_vector(real).unwrap(), real.vector_of());
        assert_eq!(registry.value_type(real.animation_of()).unwrap(), real);
        assert_eq!(registry.type_name(real.vector_of()), "real_list");
        assert_eq!(registry.id_by_name("real_animation").unwrap(), real.animation_of());
    }

    #[test]
    fn unknown_type_lookup_fails() {
        let registry = TypeRegistry::with_builtins();
        assert!(matches!(registry.id_of::<Mesh>(), Err(TypeError::UnknownType(_))));
        assert!(registry.id_by_name("mesh").is_err());
    }

    #[test]
    fn copy_then_compare_holds_for_every_builtin() {
        let registry = TypeRegistry::with_builtins();
        let mut samples: Vec<(DataTypeId, ErasedValue)> = vec![
            (registry.id_of::<i32>().unwrap(), Box::new(42i32)),
            (registry.id_of::<f64>().unwrap(), Box::new(2.5f64)),
            (registry.id_of::<String>().unwrap(), Box::new("panda".to_string())),
            (registry.id_of::<Point>().unwrap(), Box::new(Point::new(1.0, -2.0))),
            (registry.id_of::<Color>().unwrap(), Box::new(Color::new(0.1, 0.2, 0.3, 1.0))),
            (registry.id_of::<Vec<f64>>().unwrap(), Box::new(vec![1.0f64, 2.0, 3.0])),
        ];
        let mut anim = Animation::new();
        anim.insert(0.5, Point::new(3.0, 4.0));
        samples.push((registry.id_of::<Animation<Point>>().unwrap(), Box::new(anim)));

        samples.push((registry.id_of::<f64>().unwrap(), Box::new(f64::INFINITY)));
        samples.push((registry.id_of::<f64>().unwrap(), Box::new(f64::NEG_INFINITY)));
        samples.push((
            registry.id_of::<Point>().unwrap(),
            Box::new(Point::new(f64::INFINITY, -1.0)),
        ));
        samples.push((
            registry.id_of::<Vec<f64>>().unwrap(),
            Box::new(vec![1.0, f64::NEG_INFINITY]),
        ));
        let mut anim = Animation::new();
        anim.insert(f64::INFINITY, f64::NEG_INFINITY);
        samples.push((registry.id_of::<Animation<f64>>().unwrap(), Box::new(anim)));

        for (id, src) in &samples {
            let value_trait = registry.value_trait(*id).unwrap();
            let mut dst = value_trait.create();
            assert!(registry.copier(*id).unwrap().copy(&**src, &mut *dst));
            assert!(value_trait.equals(&**src, &*dst), "{}", value_trait.name());

            let text = value_trait.format_value(&**src).unwrap();
            assert!(!text.contains("null"), "{text}");
            let parsed = value_trait.parse_value(&text).unwrap();
            assert!(value_trait.equals(&**src, &*parsed), "{text}");
        }

        // NaN never compares equal, so check the copy and the text form instead.
        let nan_samples: Vec<(DataTypeId, ErasedValue)> = vec![
            (registry.id_of::<f64>().unwrap(), Box::new(f64::NAN)),
            (
                registry.id_of::<Color>().unwrap(),
                Box::new(Color { r: f64::NAN, g: 0.0, b: 0.0, a: 1.0 }),
            ),
            (registry.id_of::<Vec<Point>>().unwrap(), Box::new(vec![Point::new(0.0, f64::NAN)])),
        ];
        for (id, src) in &nan_samples {
            let value_trait = registry.value_trait(*id).unwrap();
            let mut dst = value_trait.create();
            assert!(registry.copier(*id).unwrap().copy(&**src, &mut *dst));

            let text = value_trait.format_value(&**src).unwrap();
            assert!(text.contains("nan"), "{text}");
            let parsed = value_trait.parse_value(&text).unwrap();
            assert_eq!(value_trait.format_value(&*parsed).unwrap(), text);
            assert_eq!(value_trait.format_value(&*dst).unwrap(), text);
        }
    }

    #[test]
    fn reals_use_plain_numbers_when_finite() {
        let registry = TypeRegistry::with_builtins();
        let real = registry.value_trait(registry.id_of::<f64>().unwrap()).unwrap();
        assert_eq!(real.format_value(&2.5f64).unwrap(), "2.5");
        assert_eq!(real.format_value(&f64::INFINITY).unwrap(), "\"inf\"");

        let parsed = real.parse_value("3").unwrap();
        assert_eq!(parsed.downcast_ref::<f64>(), Some(&3.0));
        assert!(real.parse_value("\"infinity\"").is_err());
        assert!(real.parse_value("null").is_err());
    }

    #[test]
    fn copier_rejects_other_types() {
        let registry = TypeRegistry::with_builtins();
        let real = registry.id_of::<f64>().unwrap();
        let mut dst: ErasedValue = Box::new(0i32);
        assert!(!registry.copier(real).unwrap().copy(&1.0f64, &mut *dst));
    }

    #[test]
    fn size_counts_elements() {
        let registry = TypeRegistry::with_builtins();
        let list = registry.value_trait(registry.id_of::<Vec<i32>>().unwrap()).unwrap();
        let single = registry.value_trait(registry.id_of::<i32>().unwrap()).unwrap();
        assert_eq!(list.size(&vec![1, 2, 3]), 3);
        assert_eq!(single.size(&7i32), 1);
    }

    #[test]
    fn converters_coerce_values() {
        let registry = TypeRegistry::with_builtins();
        let int = registry.id_of::<i32>().unwrap();
        let real = registry.id_of::<f64>().unwrap();

        let converted = registry.converter(int, real).unwrap().convert(&3i32).unwrap();
        assert_eq!(converted.downcast_ref::<f64>(), Some(&3.0));
        assert!(registry.can_convert(int.vector_of(), real.vector_of()));
        assert!(!registry.can_convert(int, int.vector_of()));
    }

    #[test]
    fn parse_error_names_the_type() {
        let registry = TypeRegistry::with_builtins();
        let int = registry.value_trait(registry.id_of::<i32>().unwrap()).unwrap();
        let err = int.parse_value("not a number").unwrap_err();
        assert!(err.to_string().contains("integer"));
    }
}
