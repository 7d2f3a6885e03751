use crate::mapper::{ObjectMapper, Record};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;
use thiserror::Error;

/// Toggles understood by [`ObjectMapper::configure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Reject properties the target record does not declare.
    FailOnUnknownProperties,
    /// Reject `null` where the record holds a primitive.
    FailOnNullForPrimitives,
    /// Pretty-print written JSON.
    IndentOutput,
    /// Write dates as epoch milliseconds when no date format is set.
    WriteDatesAsTimestamps,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub fail_on_unknown_properties: bool,
    pub fail_on_null_for_primitives: bool,
    pub indent_output: bool,
    pub write_dates_as_timestamps: bool,
    pub date_format: Option<String>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            fail_on_unknown_properties: true,
            fail_on_null_for_primitives: true,
            indent_output: false,
            write_dates_as_timestamps: false,
            date_format: None,
        }
    }
}

impl MapperConfig {
    /// Lenient binding: unknown properties are ignored and null primitives become zero.
    pub fn lenient() -> Self {
        Self {
            fail_on_unknown_properties: false,
            fail_on_null_for_primitives: false,
            ..Self::default()
        }
    }

    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::FailOnUnknownProperties => self.fail_on_unknown_properties,
            Feature::FailOnNullForPrimitives => self.fail_on_null_for_primitives,
            Feature::IndentOutput => self.indent_output,
            Feature::WriteDatesAsTimestamps => self.write_dates_as_timestamps,
        }
    }

    pub fn set(&mut self, feature: Feature, enabled: bool) {
        let flag = match feature {
            Feature::FailOnUnknownProperties => &mut self.fail_on_unknown_properties,
            Feature::FailOnNullForPrimitives => &mut self.fail_on_null_for_primitives,
            Feature::IndentOutput => &mut self.indent_output,
            Feature::WriteDatesAsTimestamps => &mut self.write_dates_as_timestamps,
        };
        *flag = enabled;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    color: String,
    #[serde(rename = "type")]
    car_type: Option<String>,
}

impl Car {
    pub fn new(color: impl Into<String>, car_type: impl Into<String>) -> Self {
        Self {
            color: color.into(),
            car_type: Some(car_type.into()),
        }
    }

    /// Builds a car whose type may be unset, as custom deserializers do.
    pub fn from_parts(color: impl Into<String>, car_type: Option<String>) -> Self {
        Self {
            color: color.into(),
            car_type,
        }
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn car_type(&self) -> Option<&str> {
        self.car_type.as_deref()
    }
}

impl Record for Car {
    const NAME: &'static str = "Car";
    const PROPERTIES: &'static [&'static str] = &["color", "type"];

    fn absent_default(property: &str) -> Option<Value> {
        match property {
            "color" => Some(Value::String(String::new())),
            _ => None,
        }
    }
}

/// A purchase of a [`Car`]; the purchase date is written through the
/// mapper's date format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    car: Car,
    date_purchased: Option<NaiveDateTime>,
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    pub fn car(&self) -> &Car {
        &self.car
    }

    pub fn date_purchased(&self) -> Option<NaiveDateTime> {
        self.date_purchased
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    car: Option<Car>,
    date_purchased: Option<NaiveDateTime>,
}

impl RequestBuilder {
    pub fn car(mut self, car: Car) -> Self {
        self.car = Some(car);
        self
    }

    pub fn date_purchased(mut self, date: NaiveDateTime) -> Self {
        self.date_purchased = Some(date);
        self
    }

    pub fn build(self) -> Result<Request, MapperError> {
        let car = self.car.ok_or(MapperError::IncompleteRecord {
            record: Request::NAME,
            property: "car",
        })?;
        Ok(Request {
            car,
            date_purchased: self.date_purchased,
        })
    }
}

impl Record for Request {
    const NAME: &'static str = "Request";
    const PROPERTIES: &'static [&'static str] = &["car", "datePurchased"];

    /// An absent car binds as an empty object, so the car's own defaults apply.
    fn absent_default(property: &str) -> Option<Value> {
        match property {
            "car" => Some(Value::Object(serde_json::Map::new())),
            _ => None,
        }
    }

    fn to_tree(&self, mapper: &ObjectMapper) -> Result<Value, MapperError> {
        let mut fields = serde_json::Map::new();
        fields.insert("car".to_string(), mapper.value_to_tree(&self.car)?);
        let date = match &self.date_purchased {
            Some(date) => mapper.write_date(date),
            None => Value::Null,
        };
        fields.insert("datePurchased".to_string(), date);
        Ok(Value::Object(fields))
    }

    fn from_tree(node: Value, mapper: &ObjectMapper) -> Result<Self, MapperError> {
        let mut fields = match node {
            Value::Object(fields) => fields,
            other => {
                return Err(mapping_error(format!(
                    "invalid type: {}, expected struct {}",
                    json_kind(&other),
                    Self::NAME
                )))
            }
        };

        let car = fields
            .remove("car")
            .ok_or_else(|| mapping_error("missing field `car`"))?;
        let car = mapper.tree_to_value::<Car>(car)?;

        let date_purchased = match fields.remove("datePurchased") {
            None | Some(Value::Null) => None,
            Some(node) => Some(mapper.read_date(&node)?),
        };

        Ok(Self {
            car,
            date_purchased,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    name: String,
    nick: String,
    age: u32,
}

impl User {
    pub fn new(name: impl Into<String>, nick: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            nick: nick.into(),
            age,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn set_nick(&mut self, nick: impl Into<String>) {
        self.nick = nick.into();
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn set_age(&mut self, age: u32) {
        self.age = age;
    }
}

impl Record for User {
    const NAME: &'static str = "User";
    const PROPERTIES: &'static [&'static str] = &["name", "nick", "age"];

    fn primitive_default(property: &str) -> Option<Value> {
        match property {
            "age" => Some(Value::from(0u32)),
            _ => None,
        }
    }

    fn absent_default(property: &str) -> Option<Value> {
        match property {
            "name" | "nick" => Some(Value::String(String::new())),
            other => Self::primitive_default(other),
        }
    }
}

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("JSON parsing error: {0}")]
    Parse(serde_json::Error),

    #[error("Mapping error: {0}")]
    Mapping(serde_json::Error),

    #[error("Unrecognized property \"{property}\" for {record}")]
    UnknownProperty { record: &'static str, property: String },

    #[error("Cannot map null into primitive property \"{property}\" of {record}")]
    NullForPrimitive { record: &'static str, property: String },

    #[error("Cannot build {record}: \"{property}\" is not set")]
    IncompleteRecord {
        record: &'static str,
        property: &'static str,
    },

    #[error("Invalid date pattern \"{pattern}\": {reason}")]
    DatePattern { pattern: String, reason: String },

    #[error("Cannot parse \"{value}\" as a date with pattern \"{pattern}\"")]
    DateParse { value: String, pattern: String },

    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wraps a message as a [`MapperError::Mapping`], the error raised by the
/// binding step itself.
pub fn mapping_error(msg: impl Display) -> MapperError {
    MapperError::Mapping(<serde_json::Error as serde::de::Error>::custom(msg))
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "map",
    }
}
