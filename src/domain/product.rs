use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A product as served by the remote gateway.
///
/// Only the key and the price are typed; every other property the service
/// returns is kept in `fields` so the views can show it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "Id", alias = "ID", alias = "id", deserialize_with = "key_text")]
    pub id: String,
    #[serde(rename = "Price", alias = "price", deserialize_with = "lenient_number")]
    pub price: f64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Product {
    #[allow(dead_code)]
    pub fn new(id: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            price,
            fields: Map::new(),
        }
    }

    #[allow(dead_code)]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The `Name` property, or an empty string when the service omits it.
    pub fn display_name(&self) -> &str {
        self.fields
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Display properties other than `Name`, skipping protocol annotations.
    pub fn extra_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .filter(|(name, _)| {
                name.as_str() != "Name" && !name.starts_with('@') && !name.starts_with("__")
            })
            .map(|(name, value)| {
                let text = match value {
                    Value::String(text) => text.clone(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                (name.clone(), text)
            })
            .collect()
    }
}

/// Partial update for a product. Unset fields are left out of the wire body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductPatch {
    #[serde(rename = "Price", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl ProductPatch {
    pub fn price(price: f64) -> Self {
        Self { price: Some(price) }
    }
}

// Integer keys (Edm.Int32) are kept as their decimal text.
fn key_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(D::Error::custom(format!("unsupported key value: {other}"))),
    }
}

// OData v2 serializes Edm.Decimal as a JSON string.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("price out of range: {number}"))),
        Value::String(text) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("price is not numeric: {text}"))),
        other => Err(D::Error::custom(format!("unsupported price value: {other}"))),
    }
}
