use crate::mapper::ObjectMapper;
use crate::tree::JsonNodeExt;
use crate::types::*;
use serde_json::{json, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Replaces the default writer for `T`. The returned tree is the whole JSON
/// shape of the value; nothing of the default shape is kept.
pub trait ValueSerializer<T>: Send + Sync {
    fn serialize(&self, value: &T, mapper: &ObjectMapper) -> Result<Value, MapperError>;
}

/// Replaces the default binding for `T`. Strictness features are not applied
/// to the tree handed to a deserializer hook.
pub trait ValueDeserializer<T>: Send + Sync {
    fn deserialize(&self, node: Value, mapper: &ObjectMapper) -> Result<T, MapperError>;
}

impl<T, F> ValueSerializer<T> for F
where
    F: Fn(&T, &ObjectMapper) -> Result<Value, MapperError> + Send + Sync,
{
    fn serialize(&self, value: &T, mapper: &ObjectMapper) -> Result<Value, MapperError> {
        self(value, mapper)
    }
}

impl<T, F> ValueDeserializer<T> for F
where
    F: Fn(Value, &ObjectMapper) -> Result<T, MapperError> + Send + Sync,
{
    fn deserialize(&self, node: Value, mapper: &ObjectMapper) -> Result<T, MapperError> {
        self(node, mapper)
    }
}

/// Writes a car as `{"car_brand": <type>}`, dropping its color.
#[derive(Debug, Clone, Copy, Default)]
pub struct CarBrandSerializer;

impl ValueSerializer<Car> for CarBrandSerializer {
    fn serialize(&self, car: &Car, _mapper: &ObjectMapper) -> Result<Value, MapperError> {
        Ok(json!({ "car_brand": car.car_type() }))
    }
}

/// Reads only the color of a car; the type is always left unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct CarColorDeserializer;

impl ValueDeserializer<Car> for CarColorDeserializer {
    fn deserialize(&self, node: Value, _mapper: &ObjectMapper) -> Result<Car, MapperError> {
        let color = node
            .get_field("color")
            .map(JsonNodeExt::as_text)
            .ok_or_else(|| mapping_error("missing field `color`"))?;
        Ok(Car::from_parts(color, None))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A named bundle of hooks, installed with [`ObjectMapper::register_module`].
#[derive(Debug, Clone)]
pub struct SimpleModule {
    name: String,
    version: Version,
    hooks: HookRegistry,
}

impl SimpleModule {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            hooks: HookRegistry::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn add_serializer<T, S>(&mut self, serializer: S) -> &mut Self
    where
        T: 'static,
        S: ValueSerializer<T> + 'static,
    {
        self.hooks.insert_serializer::<T>(Box::new(serializer));
        self
    }

    pub fn add_deserializer<T, D>(&mut self, deserializer: D) -> &mut Self
    where
        T: 'static,
        D: ValueDeserializer<T> + 'static,
    {
        self.hooks.insert_deserializer::<T>(Box::new(deserializer));
        self
    }

    pub(crate) fn into_parts(self) -> (String, Version, HookRegistry) {
        (self.name, self.version, self.hooks)
    }
}

struct SerializerSlot<T>(Box<dyn ValueSerializer<T>>);

struct DeserializerSlot<T>(Box<dyn ValueDeserializer<T>>);

#[derive(Clone)]
struct RegisteredHook {
    type_name: &'static str,
    slot: Arc<dyn Any + Send + Sync>,
}

/// Hooks keyed by the record type they handle.
#[derive(Clone, Default)]
pub(crate) struct HookRegistry {
    serializers: HashMap<TypeId, RegisteredHook>,
    deserializers: HashMap<TypeId, RegisteredHook>,
}

impl HookRegistry {
    fn insert_serializer<T: 'static>(&mut self, serializer: Box<dyn ValueSerializer<T>>) {
        self.serializers.insert(
            TypeId::of::<T>(),
            RegisteredHook {
                type_name: std::any::type_name::<T>(),
                slot: Arc::new(SerializerSlot(serializer)),
            },
        );
    }

    fn insert_deserializer<T: 'static>(&mut self, deserializer: Box<dyn ValueDeserializer<T>>) {
        self.deserializers.insert(
            TypeId::of::<T>(),
            RegisteredHook {
                type_name: std::any::type_name::<T>(),
                slot: Arc::new(DeserializerSlot(deserializer)),
            },
        );
    }

    pub(crate) fn serializer<T: 'static>(&self) -> Option<&dyn ValueSerializer<T>> {
        let hook = self.serializers.get(&TypeId::of::<T>())?;
        (*hook.slot)
            .downcast_ref::<SerializerSlot<T>>()
            .map(|slot| slot.0.as_ref())
    }

    pub(crate) fn deserializer<T: 'static>(&self) -> Option<&dyn ValueDeserializer<T>> {
        let hook = self.deserializers.get(&TypeId::of::<T>())?;
        (*hook.slot)
            .downcast_ref::<DeserializerSlot<T>>()
            .map(|slot| slot.0.as_ref())
    }

    /// Installs every hook of `other`, replacing hooks for the same type.
    pub(crate) fn extend(&mut self, other: HookRegistry) {
        self.serializers.extend(other.serializers);
        self.deserializers.extend(other.deserializers);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.serializers.is_empty() && self.deserializers.is_empty()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializers: Vec<_> = self.serializers.values().map(|h| h.type_name).collect();
        let mut deserializers: Vec<_> = self.deserializers.values().map(|h| h.type_name).collect();
        serializers.sort_unstable();
        deserializers.sort_unstable();
        f.debug_struct("HookRegistry")
            .field("serializers", &serializers)
            .field("deserializers", &deserializers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_car_brand_serializer_drops_color() {
        let mapper = ObjectMapper::new();
        let tree = CarBrandSerializer
            .serialize(&Car::new("yellow", "renault"), &mapper)
            .unwrap();
        assert_eq!(tree, json!({"car_brand": "renault"}));
    }

    #[test]
    fn test_car_brand_serializer_writes_null_for_unset_type() {
        let mapper = ObjectMapper::new();
        let tree = CarBrandSerializer
            .serialize(&Car::from_parts("yellow", None), &mapper)
            .unwrap();
        assert_eq!(tree, json!({"car_brand": null}));
    }

    #[test]
    fn test_car_color_deserializer_ignores_type() {
        let mapper = ObjectMapper::new();
        let car = CarColorDeserializer
            .deserialize(json!({"color": "Black", "type": "BMW", "year": 1970}), &mapper)
            .unwrap();
        assert_eq!(car.color(), "Black");
        assert_eq!(car.car_type(), None);
    }

    #[test]
    fn test_car_color_deserializer_requires_color() {
        let mapper = ObjectMapper::new();
        let err = CarColorDeserializer
            .deserialize(json!({"type": "BMW"}), &mapper)
            .unwrap_err();
        assert!(matches!(err, MapperError::Mapping(_)));
    }

    #[test]
    fn test_registry_lookup_by_type() {
        let mut module = SimpleModule::new("CarHooks", Version::new(1, 0, 0));
        module.add_serializer::<Car, _>(CarBrandSerializer);
        let (_, _, hooks) = module.into_parts();

        assert!(hooks.serializer::<Car>().is_some());
        assert!(hooks.serializer::<User>().is_none());
        assert!(hooks.deserializer::<Car>().is_none());
    }

    #[test]
    fn test_closure_hooks() {
        let mut module = SimpleModule::new("Closures", Version::default());
        module
            .add_serializer::<User, _>(
                |user: &User, _: &ObjectMapper| -> Result<Value, MapperError> {
                    Ok(json!(user.nick()))
                },
            )
            .add_deserializer::<User, _>(
                |node: Value, _: &ObjectMapper| -> Result<User, MapperError> {
                    Ok(User::new("anonymous", node.as_text(), 0))
                },
            );
        let (_, _, hooks) = module.into_parts();
        let mapper = ObjectMapper::new();

        let tree = hooks
            .serializer::<User>()
            .unwrap()
            .serialize(&User::new("Ada", "countess", 36), &mapper)
            .unwrap();
        assert_eq!(tree, json!("countess"));

        let user = hooks
            .deserializer::<User>()
            .unwrap()
            .deserialize(json!("countess"), &mapper)
            .unwrap();
        assert_eq!(user.nick(), "countess");
    }

    #[test]
    fn test_later_hook_replaces_earlier() {
        let mut first = SimpleModule::new("First", Version::default());
        first.add_serializer::<Car, _>(CarBrandSerializer);
        let mut second = SimpleModule::new("Second", Version::default());
        second.add_serializer::<Car, _>(
            |car: &Car, _: &ObjectMapper| -> Result<Value, MapperError> { Ok(json!(car.color())) },
        );

        let (_, _, mut hooks) = first.into_parts();
        hooks.extend(second.into_parts().2);

        let tree = hooks
            .serializer::<Car>()
            .unwrap()
            .serialize(&Car::new("yellow", "renault"), &ObjectMapper::new())
            .unwrap();
        assert_eq!(tree, json!("yellow"));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::new(1, 0, 0).to_string(), "1.0.0");
    }
}
