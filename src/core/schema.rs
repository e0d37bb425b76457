//! Request-body schema validation and filtering.
//!
//! A [`Schema`] declares `required` and `optional` fields, each with one of the
//! closed set of [`FieldType`]s. Validation reports every missing required field
//! and every present field whose value has the wrong type in a single
//! [`SchemaErrors`] value; filtering projects a body onto the declared keys so
//! handlers never see over-posted fields.
use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while building a schema. These are configuration faults, not
/// validation failures of a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("Invalid type: {0}")]
    UnknownType(String),

    #[error("Malformed schema: {0}")]
    Malformed(String),
}

/// Primitive type a schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    /// Whether `value` satisfies this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Int => checks::is_int(value),
            FieldType::Float => checks::is_float(value),
            FieldType::String => checks::is_string(value),
            FieldType::Bool => checks::is_bool(value),
            FieldType::Array => checks::is_array(value),
            FieldType::Object => checks::is_object(value),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "int" => Ok(FieldType::Int),
            "float" => Ok(FieldType::Float),
            "string" => Ok(FieldType::String),
            "bool" => Ok(FieldType::Bool),
            "array" => Ok(FieldType::Array),
            "object" => Ok(FieldType::Object),
            other => Err(SchemaError::UnknownType(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Structured detail of a failed validation.
///
/// Both lists keep schema declaration order. Empty lists are omitted when
/// serialized so the client only sees the categories that actually failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaErrors {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invalid: Vec<String>,
}

impl SchemaErrors {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.invalid.is_empty()
    }
}

/// Required/optional field-to-type map for a request body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    required: IndexMap<String, FieldType>,
    #[serde(default)]
    optional: IndexMap<String, FieldType>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a required field.
    pub fn required(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.required.insert(name.into(), ty);
        self
    }

    /// Declare an optional field.
    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.optional.insert(name.into(), ty);
        self
    }

    /// Parse a declarative schema such as
    /// `{"required": {"name": "string"}, "optional": {"age": "int"}}`.
    ///
    /// Field order follows the document, which is the order errors are reported in.
    pub fn from_json(source: &str) -> Result<Self, SchemaError> {
        let raw: RawSchema =
            serde_json::from_str(source).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        raw.try_into()
    }

    /// Same as [`Schema::from_json`] for an already parsed value.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let raw: RawSchema =
            serde_json::from_value(value).map_err(|e| SchemaError::Malformed(e.to_string()))?;
        raw.try_into()
    }

    pub fn required_fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.required.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn optional_fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.optional.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Check `object` against the schema.
    pub fn validate(&self, object: &Map<String, Value>) -> Result<(), SchemaErrors> {
        let mut errors = SchemaErrors::default();

        for (key, ty) in &self.required {
            match object.get(key) {
                None => errors.missing.push(key.clone()),
                Some(value) if !ty.accepts(value) => errors.invalid.push(key.clone()),
                Some(_) => {}
            }
        }

        for (key, ty) in &self.optional {
            if let Some(value) = object.get(key) {
                if !ty.accepts(value) {
                    errors.invalid.push(key.clone());
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, object: &Map<String, Value>) -> bool {
        self.validate(object).is_ok()
    }

    /// Keep only the declared keys that are present on `object`.
    pub fn filter(&self, object: &Map<String, Value>) -> Map<String, Value> {
        self.required
            .keys()
            .chain(self.optional.keys())
            .filter_map(|key| object.get(key).map(|value| (key.clone(), value.clone())))
            .collect()
    }
}

#[derive(Deserialize)]
struct RawSchema {
    #[serde(default)]
    required: IndexMap<String, String>,
    #[serde(default)]
    optional: IndexMap<String, String>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = SchemaError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        let parse = |fields: IndexMap<String, String>| {
            fields
                .into_iter()
                .map(|(name, ty)| Ok((name, ty.parse::<FieldType>()?)))
                .collect::<Result<IndexMap<_, _>, SchemaError>>()
        };

        Ok(Schema {
            required: parse(raw.required)?,
            optional: parse(raw.optional)?,
        })
    }
}

/// Primitive checks on decoded JSON values.
pub mod checks {
    use serde_json::Value;

    /// Integral number; `1.0` is not an int.
    pub fn is_int(value: &Value) -> bool {
        value.is_i64() || value.is_u64()
    }

    /// Integral or floating number.
    pub fn is_float(value: &Value) -> bool {
        value.is_number()
    }

    /// Floating number only.
    pub fn is_float_strict(value: &Value) -> bool {
        value.is_f64()
    }

    pub fn is_string(value: &Value) -> bool {
        value.is_string()
    }

    pub fn is_bool(value: &Value) -> bool {
        value.is_boolean()
    }

    /// Booleans plus `0`, `1`, `"0"`, `"1"`, `"true"` and `"false"`.
    pub fn is_bool_loose(value: &Value) -> bool {
        match value {
            Value::Bool(_) => true,
            Value::String(s) => matches!(s.as_str(), "true" | "false" | "1" | "0"),
            Value::Number(n) => matches!(n.as_i64(), Some(0) | Some(1)),
            _ => false,
        }
    }

    pub fn is_array(value: &Value) -> bool {
        value.is_array()
    }

    pub fn is_object(value: &Value) -> bool {
        value.is_object()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{checks::*, *};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn person_schema() -> Schema {
        Schema::new()
            .required("name", FieldType::String)
            .optional("age", FieldType::Int)
            .optional("isHuman", FieldType::Bool)
            .optional("na", FieldType::String)
    }

    #[test]
    fn test_int_check() {
        assert!(is_int(&json!(1)));
        assert!(is_int(&json!(0)));
        assert!(!is_int(&json!(0.0)));
        assert!(!is_int(&Value::Null));
        assert!(!is_int(&json!(false)));
        assert!(!is_int(&json!("1")));
    }

    #[test]
    fn test_float_checks() {
        assert!(is_float(&json!(0.0)));
        assert!(is_float(&json!(1)));
        assert!(!is_float(&Value::Null));
        assert!(!is_float(&json!([])));

        assert!(is_float_strict(&json!(0.0)));
        assert!(!is_float_strict(&json!(1)));
        assert!(!is_float_strict(&json!(false)));
    }

    #[test]
    fn test_string_and_bool_checks() {
        assert!(is_string(&json!("")));
        assert!(is_string(&json!("true")));
        assert!(!is_string(&json!(0)));
        assert!(!is_string(&json!(true)));

        assert!(is_bool(&json!(true)));
        assert!(is_bool(&json!(false)));
        for value in [json!(0), json!(1), json!("1"), json!("true"), json!(""), Value::Null] {
            assert!(!is_bool(&value), "{value} should not be a strict bool");
        }
    }

    #[test]
    fn test_loose_bool_check() {
        for value in [json!(true), json!(0), json!(1), json!("0"), json!("false")] {
            assert!(is_bool_loose(&value), "{value} should be a loose bool");
        }
        for value in [json!(""), json!(3), Value::Null, json!([])] {
            assert!(!is_bool_loose(&value), "{value} should not be a loose bool");
        }
    }

    #[test]
    fn test_array_and_object_checks() {
        assert!(is_array(&json!([])));
        assert!(!is_array(&json!({})));
        assert!(!is_array(&json!("FooBar")));

        assert!(is_object(&json!({})));
        assert!(!is_object(&json!([])));
        assert!(!is_object(&json!(true)));
    }

    #[test]
    fn test_validate_accepts_required_and_optional() {
        let schema = person_schema();
        assert!(schema.is_valid(&object(json!({"name": "Foo", "age": 10, "isHuman": true}))));
        assert!(schema.is_valid(&object(json!({"name": "Foo"}))));
    }

    #[test]
    fn test_validate_reports_missing() {
        let errors = person_schema()
            .validate(&object(json!({"age": 10})))
            .unwrap_err();
        assert_eq!(errors.missing, vec!["name"]);
        assert!(errors.invalid.is_empty());
    }

    #[test]
    fn test_validate_reports_invalid() {
        let schema = person_schema();
        for name in [json!(1), json!(true), json!([])] {
            let errors = schema
                .validate(&object(json!({ "name": name })))
                .unwrap_err();
            assert_eq!(errors.invalid, vec!["name"]);
        }

        let errors = schema
            .validate(&object(json!({"name": "Foo", "age": "Bar"})))
            .unwrap_err();
        assert_eq!(errors.invalid, vec!["age"]);
    }

    #[test]
    fn test_validate_is_repeatable() {
        let schema = person_schema();
        let body = object(json!({"age": "x"}));
        assert_eq!(schema.validate(&body), schema.validate(&body));
    }

    #[test]
    fn test_filter_drops_undeclared_keys() {
        let schema = Schema::new()
            .required("name", FieldType::String)
            .optional("age", FieldType::Int);
        let expected = object(json!({"name": "Foo", "age": 10}));

        assert_eq!(schema.filter(&expected), expected);

        let over_posted = object(json!({"name": "Foo", "age": 10, "height": 1.85}));
        let filtered = schema.filter(&over_posted);
        assert_eq!(filtered, expected);
        assert_eq!(schema.filter(&filtered), filtered);
    }

    #[test]
    fn test_from_json_preserves_declaration_order() {
        let schema = Schema::from_json(
            r#"{"required": {"street": "string", "name": "string"}, "optional": {"age": "int"}}"#,
        )
        .unwrap();
        let errors = schema.validate(&Map::new()).unwrap_err();
        assert_eq!(errors.missing, vec!["street", "name"]);
    }

    #[test]
    fn test_unknown_type_is_a_configuration_fault() {
        let err = Schema::from_value(json!({"required": {"name": "na"}})).unwrap_err();
        assert_eq!(err, SchemaError::UnknownType("na".to_string()));

        let err = Schema::from_json(r#"{"required": "name"}"#).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed(_)));
    }
}
