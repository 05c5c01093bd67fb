use crate::{common, error};

use serde_dynamo::to_attribute_value;
use serde_json::Value;

/// Default separator between composite key parts.
const DEFAULT_SEPARATOR: &str = "#";

/// The single-table column convention: which physical attributes hold the
/// partition key, the range key and the entity type discriminator.
///
/// One layout is built at schema-definition time and shared read-only by key
/// encoding, transactions and the join engine.
#[derive(Clone, Debug, PartialEq)]
pub struct TableLayout {
    /// Physical attribute holding the partition key string.
    pub partition_attribute: String,
    /// Physical attribute holding the range key string.
    pub range_attribute: String,
    /// Physical attribute holding the entity type discriminator.
    pub type_attribute: String,
    /// Keep the type attribute in join results instead of stripping it.
    pub retain_type: bool,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            partition_attribute: "pk".to_string(),
            range_attribute: "sk".to_string(),
            type_attribute: "_et".to_string(),
            retain_type: false,
        }
    }
}

/// A logical key: one scalar, or an ordered list of parts.
///
/// Parts may be missing. Encoding collapses at the first missing part, so a
/// partially specified composite key encodes to the joined prefix of its
/// present leading parts - which is exactly what a `begins_with` range
/// condition wants.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyValue {
    /// A single scalar key value.
    Scalar(Value),
    /// An ordered list of key parts, possibly with missing entries.
    Parts(Vec<Option<Value>>),
}

/// Encodes logical keys into physical key strings.
///
/// ```rust
/// use dynamodb_single_table::common::key;
/// use serde_json::json;
///
/// let codec = key::KeyCodec::default();
/// let encoded = codec.encode(&key::KeyValue::Parts(vec![
///     Some(json!("order")),
///     Some(json!(42)),
/// ]));
/// assert_eq!(encoded, "order#42");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct KeyCodec {
    /// Separator joined between composite key parts.
    pub separator: String,
}

impl Default for KeyCodec {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }
}

impl KeyCodec {
    /// Encode a logical key into its physical string form.
    ///
    /// A missing scalar encodes as the empty string; a composite key collapses
    /// at its first missing part.
    pub fn encode(&self, value: &KeyValue) -> String {
        match value {
            KeyValue::Scalar(Value::Null) => String::new(),
            KeyValue::Scalar(scalar) => Self::stringify(scalar),
            KeyValue::Parts(parts) => {
                let mut encoded = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        Some(value) if !value.is_null() => encoded.push(Self::stringify(value)),
                        _ => break,
                    }
                }
                encoded.join(&self.separator)
            }
        }
    }

    /// Encode a partition/range pair into a physical [`PrimaryKey`] under the
    /// given layout.
    pub fn primary_key(
        &self,
        layout: &TableLayout,
        partition: &KeyValue,
        range: Option<&KeyValue>,
    ) -> PrimaryKey<String> {
        PrimaryKey {
            partition: Key {
                name: layout.partition_attribute.clone(),
                value: self.encode(partition),
            },
            range: range.map(|range| Key {
                name: layout.range_attribute.clone(),
                value: self.encode(range),
            }),
        }
    }

    fn stringify(value: &Value) -> String {
        match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// A named key attribute.
///
/// ```rust
/// use dynamodb_single_table::common::key;
///
/// let key = key::Key {
///     name: "pk".to_string(),
///     value: "customer#42".to_string(),
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Key<T> {
    /// The physical attribute name of the key.
    pub name: String,
    /// The value of the key.
    pub value: T,
}

/// A primary key: partition key and optional range key.
///
/// ```rust
/// use dynamodb_single_table::common::key;
///
/// let key = key::PrimaryKey {
///     partition: key::Key {
///         name: "pk".to_string(),
///         value: "customer#42".to_string(),
///     },
///     ..Default::default()
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrimaryKey<T> {
    /// The partition key (required).
    pub partition: Key<T>,
    /// The range key (optional, only for tables with composite primary keys).
    pub range: Option<Key<T>>,
}

impl<T: serde::Serialize> TryFrom<PrimaryKey<T>> for common::Attributes {
    type Error = error::Error;

    fn try_from(key: PrimaryKey<T>) -> error::Result<Self> {
        let partition_value = to_attribute_value(key.partition.value)?;
        let mut attributes = Self::from([(key.partition.name, partition_value)]);
        if let Some(range) = key.range {
            let range_value = to_attribute_value(range.value)?;
            attributes.insert(range.name, range_value);
        }
        Ok(attributes)
    }
}
