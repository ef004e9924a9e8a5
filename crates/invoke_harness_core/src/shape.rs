//! Input shapes and payload adaptation.
//!
//! An entry point's input shape is read off its `Deserialize` impl: a probing
//! deserializer records which `deserialize_*` call the type makes and stops.
//! Strings are raw input, structs are structured input with a closed field
//! set, maps are structured input with an open field set.

use std::fmt;

use serde::de::{DeserializeOwned, Visitor};
use serde::forward_to_deserialize_any;
use serde::Deserializer;
use serde_json::{Map, Value};

use crate::error::HarnessError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputShape {
    Raw,
    Structured {
        type_name: &'static str,
        fields: &'static [&'static str],
    },
    Map,
}

impl InputShape {
    /// Introspects `I`. Returns a description of the unsupported shape when
    /// `I` is neither a string, a struct nor a map.
    pub fn of<I: DeserializeOwned>() -> Result<Self, String> {
        match I::deserialize(ShapeProbe) {
            Err(ProbeStop::Found(shape)) => Ok(shape),
            Err(ProbeStop::Unsupported(message)) => Err(message),
            Ok(_) => Err("input type accepted an empty probe".to_string()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Structured { .. } => "structured",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw string"),
            Self::Structured { type_name, fields } => {
                write!(f, "{type_name} {{{}}}", fields.join(", "))
            }
            Self::Map => f.write_str("map"),
        }
    }
}

#[derive(Debug)]
enum ProbeStop {
    Found(InputShape),
    Unsupported(String),
}

impl fmt::Display for ProbeStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(shape) => write!(f, "found {shape}"),
            Self::Unsupported(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for ProbeStop {}

impl serde::de::Error for ProbeStop {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Unsupported(msg.to_string())
    }
}

#[derive(Debug, Clone, Copy)]
struct ShapeProbe;

impl<'de> Deserializer<'de> for ShapeProbe {
    type Error = ProbeStop;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(ProbeStop::Unsupported(
            "input must be a string, a struct with named fields or a map".to_string(),
        ))
    }

    fn deserialize_str<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(ProbeStop::Found(InputShape::Raw))
    }

    fn deserialize_string<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(ProbeStop::Found(InputShape::Raw))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(ProbeStop::Found(InputShape::Structured {
            type_name: name,
            fields,
        }))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(ProbeStop::Found(InputShape::Map))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char bytes byte_buf
        option unit unit_struct seq tuple tuple_struct enum identifier ignored_any
    }
}

/// Stdin payload adapted to an entry point's shape, before binding to the
/// entry point's concrete input type.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedInput {
    Raw(String),
    Structured(Map<String, Value>),
}

impl DecodedInput {
    /// Adapts `raw` to `shape`. Structured shapes keep only the declared
    /// fields present in the payload; absent fields stay absent.
    pub fn decode(raw: &str, shape: &InputShape) -> Result<Self, HarnessError> {
        match shape {
            InputShape::Raw => Ok(Self::Raw(raw.to_string())),
            InputShape::Structured { fields, .. } => {
                let object = parse_object(raw)?;
                Ok(Self::Structured(
                    object
                        .into_iter()
                        .filter(|(key, _)| fields.contains(&key.as_str()))
                        .collect(),
                ))
            }
            InputShape::Map => Ok(Self::Structured(parse_object(raw)?)),
        }
    }

    pub fn field_count(&self) -> usize {
        match self {
            Self::Raw(_) => 0,
            Self::Structured(map) => map.len(),
        }
    }

    pub fn bind<I: DeserializeOwned>(self) -> Result<I, HarnessError> {
        match self {
            Self::Raw(text) => serde_json::from_value(Value::String(text)).map_err(|error| {
                HarnessError::payload_decode(format!("raw payload does not fit input: {error}"))
            }),
            Self::Structured(map) => serde_json::from_value(Value::Object(map)).map_err(|error| {
                HarnessError::payload_decode(format!("payload does not fit input: {error}"))
            }),
        }
    }
}

fn parse_object(raw: &str) -> Result<Map<String, Value>, HarnessError> {
    if raw.is_empty() {
        return Ok(Map::new());
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(HarnessError::payload_decode(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(error) => Err(HarnessError::payload_decode(format!(
            "payload is not valid JSON: {error}"
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
