use crate::date::{DateFormat, ISO_DATE_TIME};
use crate::hooks::{HookRegistry, SimpleModule};
use crate::types::*;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// A type the mapper can bind to and from JSON.
///
/// The default conversions delegate to serde; override them when a record
/// nests other records or holds dates, so that hooks and the date format of
/// the mapper apply to those parts too.
pub trait Record: Serialize + DeserializeOwned + 'static {
    const NAME: &'static str;

    /// JSON property names the record declares, in declaration order.
    const PROPERTIES: &'static [&'static str];

    /// Zero value for a primitive property, `None` for anything nullable.
    fn primitive_default(_property: &str) -> Option<Value> {
        None
    }

    /// Value bound for an absent property when null primitives are
    /// tolerated. `None` leaves the property absent.
    fn absent_default(property: &str) -> Option<Value> {
        Self::primitive_default(property)
    }

    fn to_tree(&self, _mapper: &ObjectMapper) -> Result<Value, MapperError> {
        serde_json::to_value(self).map_err(MapperError::Serialization)
    }

    fn from_tree(node: Value, _mapper: &ObjectMapper) -> Result<Self, MapperError> {
        serde_json::from_value(node).map_err(MapperError::Mapping)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ObjectMapper {
    config: MapperConfig,
    date_format: Option<DateFormat>,
    hooks: HookRegistry,
    modules: Vec<String>,
}

impl ObjectMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MapperConfig) -> Result<Self, MapperError> {
        let date_format = config
            .date_format
            .as_deref()
            .map(DateFormat::new)
            .transpose()?;
        Ok(Self {
            config,
            date_format,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn configure(&mut self, feature: Feature, enabled: bool) -> &mut Self {
        self.config.set(feature, enabled);
        self
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        self.config.is_enabled(feature)
    }

    /// Applies `format` to every date property written or read by this mapper.
    pub fn set_date_format(&mut self, format: DateFormat) -> &mut Self {
        self.config.date_format = Some(format.pattern().to_string());
        self.date_format = Some(format);
        self
    }

    pub fn date_format(&self) -> Option<&DateFormat> {
        self.date_format.as_ref()
    }

    /// Installs the hooks of `module`. A module whose name is already
    /// registered is ignored.
    pub fn register_module(&mut self, module: SimpleModule) -> &mut Self {
        let (name, version, hooks) = module.into_parts();
        if self.modules.contains(&name) {
            tracing::debug!(module = %name, "module already registered, ignoring");
            return self;
        }
        if hooks.is_empty() {
            tracing::debug!(module = %name, "module registers no hooks");
        }
        tracing::debug!(module = %name, %version, "registering module");
        self.hooks.extend(hooks);
        self.modules.push(name);
        self
    }

    pub fn registered_modules(&self) -> &[String] {
        &self.modules
    }

    pub fn read_tree(&self, json: &str) -> Result<Value, MapperError> {
        serde_json::from_str(json).map_err(MapperError::Parse)
    }

    pub fn read_value<T: Record>(&self, json: &str) -> Result<T, MapperError> {
        let node = self.read_tree(json)?;
        self.tree_to_value(node)
    }

    pub fn read_list<T: Record>(&self, json: &str) -> Result<Vec<T>, MapperError> {
        match self.read_tree(json)? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.tree_to_value(item))
                .collect(),
            other => Err(mapping_error(format!(
                "invalid type: {}, expected a sequence of {}",
                json_kind(&other),
                T::NAME
            ))),
        }
    }

    pub fn read_value_from_path<T: Record>(&self, path: impl AsRef<Path>) -> Result<T, MapperError> {
        let json = fs::read_to_string(path)?;
        self.read_value(&json)
    }

    pub fn write_value_as_string<T: Record>(&self, value: &T) -> Result<String, MapperError> {
        let tree = self.value_to_tree(value)?;
        self.write_tree(&tree, self.config.indent_output)
    }

    pub fn write_value_as_string_pretty<T: Record>(&self, value: &T) -> Result<String, MapperError> {
        let tree = self.value_to_tree(value)?;
        self.write_tree(&tree, true)
    }

    pub fn write_values_as_string<T: Record>(&self, values: &[T]) -> Result<String, MapperError> {
        let items = values
            .iter()
            .map(|value| self.value_to_tree(value))
            .collect::<Result<Vec<_>, _>>()?;
        self.write_tree(&Value::Array(items), self.config.indent_output)
    }

    pub fn write_value_to_path<T: Record>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
    ) -> Result<(), MapperError> {
        let json = self.write_value_as_string(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn write_tree(&self, tree: &Value, pretty: bool) -> Result<String, MapperError> {
        let written = if pretty {
            serde_json::to_string_pretty(tree)
        } else {
            serde_json::to_string(tree)
        };
        written.map_err(MapperError::Serialization)
    }

    pub fn value_to_tree<T: Record>(&self, value: &T) -> Result<Value, MapperError> {
        if let Some(serializer) = self.hooks.serializer::<T>() {
            tracing::trace!(record = T::NAME, "writing through custom serializer");
            return serializer.serialize(value, self);
        }
        value.to_tree(self)
    }

    pub fn tree_to_value<T: Record>(&self, node: Value) -> Result<T, MapperError> {
        if let Some(deserializer) = self.hooks.deserializer::<T>() {
            tracing::trace!(record = T::NAME, "reading through custom deserializer");
            return deserializer.deserialize(node, self);
        }
        let node = self.check_properties::<T>(node)?;
        T::from_tree(node, self)
    }

    /// Rebinds `value` as another record shape through its JSON tree.
    pub fn convert_value<S: Record, T: Record>(&self, value: &S) -> Result<T, MapperError> {
        let tree = self.value_to_tree(value)?;
        self.tree_to_value(tree)
    }

    pub fn write_date(&self, date: &NaiveDateTime) -> Value {
        if let Some(format) = &self.date_format {
            return Value::String(format.format(date));
        }
        if self.config.write_dates_as_timestamps {
            return Value::from(date.and_utc().timestamp_millis());
        }
        Value::String(date.format(ISO_DATE_TIME).to_string())
    }

    /// Reads a date written by [`write_date`](Self::write_date) under any
    /// configuration: epoch milliseconds, the configured pattern, or ISO-8601.
    pub fn read_date(&self, node: &Value) -> Result<NaiveDateTime, MapperError> {
        match node {
            Value::Number(millis) => millis
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(|date| date.naive_utc())
                .ok_or_else(|| mapping_error(format!("timestamp {} is out of range", millis))),
            Value::String(text) => match &self.date_format {
                Some(format) => format.parse(text),
                None => text.parse::<NaiveDateTime>().map_err(|_| MapperError::DateParse {
                    value: text.clone(),
                    pattern: ISO_DATE_TIME.to_string(),
                }),
            },
            other => Err(mapping_error(format!(
                "invalid type: {}, expected a date",
                json_kind(other)
            ))),
        }
    }

    fn check_properties<T: Record>(&self, node: Value) -> Result<Value, MapperError> {
        let mut fields = match node {
            Value::Object(fields) => fields,
            other => return Ok(other),
        };

        for name in fields.keys() {
            if T::PROPERTIES.contains(&name.as_str()) {
                continue;
            }
            if self.config.fail_on_unknown_properties {
                return Err(MapperError::UnknownProperty {
                    record: T::NAME,
                    property: name.clone(),
                });
            }
            tracing::debug!(record = T::NAME, property = %name, "ignoring unknown property");
        }

        for (name, value) in fields.iter_mut() {
            if !value.is_null() {
                continue;
            }
            let Some(default) = T::primitive_default(name) else {
                continue;
            };
            if self.config.fail_on_null_for_primitives {
                return Err(MapperError::NullForPrimitive {
                    record: T::NAME,
                    property: name.clone(),
                });
            }
            tracing::debug!(record = T::NAME, property = %name, "substituting default for null primitive");
            *value = default;
        }

        if !self.config.fail_on_null_for_primitives {
            for name in T::PROPERTIES {
                if fields.contains_key(*name) {
                    continue;
                }
                if let Some(default) = T::absent_default(name) {
                    tracing::debug!(record = T::NAME, property = %name, "substituting default for absent property");
                    fields.insert(name.to_string(), default);
                }
            }
        }

        Ok(Value::Object(fields))
    }
}
