//! STAC catalogue records accepted by the ingestion pipeline.
//!
//! Records keep their full JSON document so unknown extension fields survive
//! the round trip into pgstac. Only the fields the pipeline relies on are
//! validated and lifted into typed accessors.

use serde_json::{Map, Value, json};

const FEATURE_TYPE: &str = "Feature";
const COLLECTION_TYPE: &str = "Collection";

/// Reasons a JSON document is not an acceptable catalogue record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The document is not a JSON object.
    #[error("STAC document must be a JSON object")]
    NotAnObject,
    /// The document has no string `type` field.
    #[error("STAC document is missing a string 'type' field")]
    MissingType,
    /// The `type` is neither `Feature` nor `Collection`.
    #[error("expected either a 'Feature' or a 'Collection', received a {found}")]
    UnsupportedType {
        /// The `type` value that was found.
        found: String,
    },
    /// A required field is absent or blank.
    #[error("{kind} is missing required field '{field}'")]
    MissingField {
        /// Record kind (`item` or `collection`).
        kind: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },
    /// A field is present but has the wrong JSON shape.
    #[error("{kind} field '{field}' must be {expected}")]
    InvalidField {
        /// Record kind (`item` or `collection`).
        kind: &'static str,
        /// Name of the malformed field.
        field: &'static str,
        /// Human-readable description of the expected shape.
        expected: &'static str,
    },
}

/// A STAC Item with its originating document.
#[derive(Debug, Clone, PartialEq)]
pub struct StacItem {
    id: String,
    collection: String,
    stac_version: String,
    document: Map<String, Value>,
}

impl StacItem {
    /// Validate and wrap an item document.
    ///
    /// # Examples
    /// ```
    /// use serde_json::json;
    /// use stac_backend::domain::StacItem;
    ///
    /// let item = StacItem::from_value(json!({
    ///     "type": "Feature",
    ///     "stac_version": "1.1.0",
    ///     "id": "item-1",
    ///     "collection": "col-a",
    ///     "geometry": null,
    ///     "properties": {"datetime": "2021-01-01T00:00:00Z"}
    /// }))
    /// .expect("valid item");
    /// assert_eq!(item.collection(), "col-a");
    /// ```
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(document) = value else {
            return Err(RecordError::NotAnObject);
        };
        require_type(&document, FEATURE_TYPE)?;

        let id = required_string(&document, "item", "id")?;
        let collection = required_string(&document, "item", "collection")?;
        let stac_version = required_string(&document, "item", "stac_version")?;
        if !document.contains_key("geometry") {
            return Err(RecordError::MissingField {
                kind: "item",
                field: "geometry",
            });
        }
        match document.get("properties") {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(RecordError::InvalidField {
                    kind: "item",
                    field: "properties",
                    expected: "an object",
                });
            }
            None => {
                return Err(RecordError::MissingField {
                    kind: "item",
                    field: "properties",
                });
            }
        }

        Ok(Self {
            id,
            collection,
            stac_version,
            document,
        })
    }

    /// Item identifier, unique within its collection.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Identifier of the owning collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// STAC version declared by the item.
    pub fn stac_version(&self) -> &str {
        &self.stac_version
    }

    /// Borrow the full item document.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Consume the item, returning its JSON document.
    pub fn into_value(self) -> Value {
        Value::Object(self.document)
    }
}

/// A STAC Collection with its originating document.
#[derive(Debug, Clone, PartialEq)]
pub struct StacCollection {
    id: String,
    document: Map<String, Value>,
}

impl StacCollection {
    /// Validate and wrap a collection document.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(document) = value else {
            return Err(RecordError::NotAnObject);
        };
        require_type(&document, COLLECTION_TYPE)?;

        let id = required_string(&document, "collection", "id")?;
        required_string(&document, "collection", "license")?;
        match document.get("extent") {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(RecordError::InvalidField {
                    kind: "collection",
                    field: "extent",
                    expected: "an object",
                });
            }
            None => {
                return Err(RecordError::MissingField {
                    kind: "collection",
                    field: "extent",
                });
            }
        }
        match document.get("links") {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(RecordError::InvalidField {
                    kind: "collection",
                    field: "links",
                    expected: "an array",
                });
            }
            None => {
                return Err(RecordError::MissingField {
                    kind: "collection",
                    field: "links",
                });
            }
        }

        Ok(Self { id, document })
    }

    /// Synthesise the stand-in collection used when items arrive before
    /// their collection and auto-creation is enabled.
    ///
    /// # Examples
    /// ```
    /// use stac_backend::domain::StacCollection;
    ///
    /// let placeholder = StacCollection::placeholder("landsat", "1.1.0");
    /// assert_eq!(placeholder.id(), "landsat");
    /// assert_eq!(placeholder.document()["license"], "proprietary");
    /// ```
    pub fn placeholder(collection_id: &str, stac_version: &str) -> Self {
        let value = json!({
            "type": COLLECTION_TYPE,
            "id": collection_id,
            "description": collection_id,
            "links": [{"href": "placeholder", "rel": "self"}],
            "license": "proprietary",
            "extent": {
                "spatial": {"bbox": [[-180.0, -90.0, 180.0, 90.0]]},
                "temporal": {"interval": [[null, null]]}
            },
            "stac_version": stac_version
        });
        let document = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: collection_id.to_owned(),
            document,
        }
    }

    /// Collection identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Borrow the full collection document.
    pub fn document(&self) -> &Map<String, Value> {
        &self.document
    }

    /// Consume the collection, returning its JSON document.
    pub fn into_value(self) -> Value {
        Value::Object(self.document)
    }
}

/// A catalogue record: an Item or a Collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogRecord {
    /// STAC Item (`type: "Feature"`).
    Item(StacItem),
    /// STAC Collection (`type: "Collection"`).
    Collection(StacCollection),
}

impl CatalogRecord {
    /// Dispatch on the document `type` and validate the matching shape.
    ///
    /// # Examples
    /// ```
    /// use serde_json::json;
    /// use stac_backend::domain::{CatalogRecord, RecordError};
    ///
    /// let err = CatalogRecord::from_value(json!({"type": "Catalog", "id": "root"}))
    ///     .expect_err("catalogs are not ingested");
    /// assert!(matches!(err, RecordError::UnsupportedType { .. }));
    /// ```
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let record_type = value
            .as_object()
            .ok_or(RecordError::NotAnObject)?
            .get("type")
            .and_then(Value::as_str)
            .ok_or(RecordError::MissingType)?
            .to_owned();

        match record_type.as_str() {
            FEATURE_TYPE => StacItem::from_value(value).map(Self::Item),
            COLLECTION_TYPE => StacCollection::from_value(value).map(Self::Collection),
            _ => Err(RecordError::UnsupportedType { found: record_type }),
        }
    }

    /// Record identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::Item(item) => item.id(),
            Self::Collection(collection) => collection.id(),
        }
    }
}

fn require_type(document: &Map<String, Value>, expected: &'static str) -> Result<(), RecordError> {
    match document.get("type").and_then(Value::as_str) {
        Some(found) if found == expected => Ok(()),
        Some(found) => Err(RecordError::UnsupportedType {
            found: found.to_owned(),
        }),
        None => Err(RecordError::MissingType),
    }
}

fn required_string(
    document: &Map<String, Value>,
    kind: &'static str,
    field: &'static str,
) -> Result<String, RecordError> {
    match document.get(field) {
        Some(Value::String(value)) if !value.trim().is_empty() => Ok(value.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            Err(RecordError::MissingField { kind, field })
        }
        Some(_) => Err(RecordError::InvalidField {
            kind,
            field,
            expected: "a string",
        }),
    }
}
