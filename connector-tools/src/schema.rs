//! Builders for the JSON schemas attached to tool inputs.

use serde_json::{Map, Value, json};

/// One property of an object schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    inner: Map<String, Value>,
}

impl Property {
    /// A property of the given JSON type (`string`, `integer`, ...).
    #[must_use]
    pub fn of_type(kind: &str) -> Self {
        let mut inner = Map::new();
        inner.insert("type".into(), Value::String(kind.to_owned()));
        Self { inner }
    }

    /// A string property.
    #[must_use]
    pub fn string() -> Self {
        Self::of_type("string")
    }

    /// An integer property.
    #[must_use]
    pub fn integer() -> Self {
        Self::of_type("integer")
    }

    /// An array property whose items have the given type.
    #[must_use]
    pub fn array_of(item_kind: &str) -> Self {
        Self::of_type("array").items(item_kind)
    }

    /// Sets the description.
    #[must_use]
    pub fn description(self, description: impl Into<String>) -> Self {
        self.with("description", Value::String(description.into()))
    }

    /// Restricts the value to an enumerated set.
    #[must_use]
    pub fn one_of(self, values: Vec<Value>) -> Self {
        if values.is_empty() {
            return self;
        }
        self.with("enum", Value::Array(values))
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(self, value: Value) -> Self {
        self.with("default", value)
    }

    /// Sets the format hint (`date-time`, `email`, ...).
    #[must_use]
    pub fn format(self, format: impl Into<String>) -> Self {
        self.with("format", Value::String(format.into()))
    }

    /// Sets the item type of an array property.
    #[must_use]
    pub fn items(self, item_kind: &str) -> Self {
        self.with("items", json!({ "type": item_kind }))
    }

    /// Sets an inclusive lower bound.
    #[must_use]
    pub fn minimum(self, minimum: i64) -> Self {
        self.with("minimum", Value::from(minimum))
    }

    /// Sets an inclusive upper bound.
    #[must_use]
    pub fn maximum(self, maximum: i64) -> Self {
        self.with("maximum", Value::from(maximum))
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.inner.insert(key.to_owned(), value);
        self
    }

    /// Converts into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.inner)
    }
}

/// An object schema with named properties.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObjectSchema {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ObjectSchema {
    /// An object schema with no properties.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an optional property.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property.into_value());
        self
    }

    /// Adds a required property.
    #[must_use]
    pub fn required(mut self, name: impl Into<String>, property: Property) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), property.into_value());
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Property names, sorted.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Converts into a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(self.properties));
        if !self.required.is_empty() {
            schema.insert(
                "required".into(),
                Value::Array(self.required.into_iter().map(Value::String).collect()),
            );
        }
        schema.insert("additionalProperties".into(), Value::Bool(false));
        Value::Object(schema)
    }
}
