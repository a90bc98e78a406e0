//! Compiled-schema cache shared across requests.
//!
//! Document types change rarely compared to document writes, so each type's
//! schema is compiled once and reused. An entry remembers the schema source it
//! was compiled from; if the stored `allowedAttributes` have since changed
//! (an administrative update, possibly from another process sharing the
//! database) the entry is recompiled on next use.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use crate::schema::{check_document, Schema};
use crate::types::{Document, DocumentType};
use crate::violation::{ResolutionError, Violation};

struct Entry {
    source: Value,
    schema: Arc<Schema>,
}

/// Thread-safe map of document type id to compiled [`Schema`].
#[derive(Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<String, Entry>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled schema for `document_type`, compiling it on a miss or
    /// when its source no longer matches the cached one.
    pub fn schema_for(&self, document_type: &DocumentType) -> Result<Arc<Schema>, ResolutionError> {
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(&document_type.id) {
                if entry.source == document_type.allowed_attributes {
                    return Ok(Arc::clone(&entry.schema));
                }
            }
        }

        if document_type.allowed_attributes.is_null() {
            return Err(ResolutionError::MalformedSchema {
                pointer: String::new(),
                reason: format!("document type {} has no schema", document_type.type_name),
            });
        }
        let schema = Arc::new(Schema::compile(&document_type.allowed_attributes)?);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                document_type.id.clone(),
                Entry {
                    source: document_type.allowed_attributes.clone(),
                    schema: Arc::clone(&schema),
                },
            );
        Ok(schema)
    }

    /// Validate `document` against its resolved type using the cache.
    ///
    /// Same contract as [`validate_document`](crate::schema::validate_document).
    pub fn validate(
        &self,
        document: &Document,
        document_type: Option<&DocumentType>,
    ) -> Result<Vec<Violation>, ResolutionError> {
        let document_type = document_type
            .filter(|t| t.id == document.document_type)
            .ok_or_else(|| ResolutionError::MissingDocumentType(document.document_type.clone()))?;
        let schema = self.schema_for(document_type)?;
        Ok(check_document(document, &schema))
    }

    /// Drop the entry for a document type (after it is updated or deleted).
    pub fn invalidate(&self, document_type_id: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(document_type_id);
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn titled() -> DocumentType {
        DocumentType::new(
            "note",
            json!({ "type": "object", "required": ["title"] }),
        )
    }

    #[test]
    fn compiles_once_and_reuses() {
        let cache = SchemaCache::new();
        let t = titled();
        let a = cache.schema_for(&t).unwrap();
        let b = cache.schema_for(&t).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn changed_schema_is_recompiled() {
        let cache = SchemaCache::new();
        let mut t = titled();
        let doc = Document::new(&t.id, json!({}));
        assert_eq!(cache.validate(&doc, Some(&t)).unwrap().len(), 1);

        t.allowed_attributes = json!({ "type": "object" });
        assert!(cache.validate(&doc, Some(&t)).unwrap().is_empty());
    }

    #[test]
    fn invalidate_drops_entry() {
        let cache = SchemaCache::new();
        let t = titled();
        cache.schema_for(&t).unwrap();
        cache.invalidate(&t.id);
        assert!(cache.is_empty());
    }

    #[test]
    fn malformed_schema_is_not_cached() {
        let cache = SchemaCache::new();
        let t = DocumentType::new("broken", json!({ "type": 7 }));
        assert!(cache.schema_for(&t).is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn wrong_type_is_a_resolution_error() {
        let cache = SchemaCache::new();
        let doc = Document::new("somewhere-else", json!({}));
        assert_eq!(
            cache.validate(&doc, Some(&titled())),
            Err(ResolutionError::MissingDocumentType("somewhere-else".into()))
        );
    }
}
