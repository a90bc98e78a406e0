//! Document type and document bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use yads::{Document, DocumentType};

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// Body of `POST /document_types` and `PUT /document_types/{id}`.
///
/// `PATCH /document_types/{id}` takes a merge patch over this same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentTypeRequest {
    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(alias = "allowed_attributes")]
    pub allowed_attributes: Value,

    #[serde(default)]
    pub defaults: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl DocumentTypeRequest {
    /// A new document type with a fresh id.
    pub fn into_document_type(self) -> DocumentType {
        let mut t = DocumentType::new(self.type_name, self.allowed_attributes);
        t.defaults = self.defaults;
        t.icon = self.icon;
        t
    }

    /// Overwrite every attribute of `target` except its id.
    pub fn apply_to(self, target: &mut DocumentType) {
        target.type_name = self.type_name;
        target.allowed_attributes = self.allowed_attributes;
        target.defaults = self.defaults;
        target.icon = self.icon;
    }
}

impl From<&DocumentType> for DocumentTypeRequest {
    fn from(t: &DocumentType) -> Self {
        Self {
            type_name: t.type_name.clone(),
            allowed_attributes: t.allowed_attributes.clone(),
            defaults: t.defaults.clone(),
            icon: t.icon.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Body of `POST /documents` and `PUT /documents/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    /// Id of the document's [`DocumentType`].
    #[serde(alias = "document_type")]
    pub document_type: String,

    pub data: Value,
}

impl DocumentRequest {
    pub fn into_document(self) -> Document {
        Document::new(self.document_type, self.data)
    }

    /// Replace type and data of `target`, bumping `updatedAt`.
    pub fn apply_to(self, target: &mut Document) {
        target.document_type = self.document_type;
        target.data = self.data;
        target.touch();
    }
}

/// Body of `PATCH /documents/{id}` (`application/merge-patch+json`).
///
/// `data` is merged onto the stored data with [`yads::merge`], so keys
/// prefixed with `-` delete the named key. When `updatedAt` is supplied the
/// patch only applies while the stored document still carries that value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "document_type")]
    pub document_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "updated_at")]
    pub updated_at: Option<String>,
}

impl DocumentPatch {
    /// The document that results from applying this patch to `current`.
    ///
    /// `current` is left untouched; the result carries a new `updatedAt`.
    pub fn apply(&self, current: &Document) -> Document {
        let mut next = current.clone();
        if let Some(document_type) = &self.document_type {
            next.document_type = document_type.clone();
        }
        if let Some(patch) = &self.data {
            next.data = yads::merge(&current.data, patch);
        }
        next.touch();
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_type_request_uses_type_key() {
        let req: DocumentTypeRequest = serde_json::from_value(json!({
            "type": "note",
            "allowed_attributes": { "type": "object" }
        }))
        .unwrap();
        assert_eq!(req.type_name, "note");
        assert!(req.defaults.is_empty());
        let t = req.into_document_type();
        assert_eq!(t.type_name, "note");
        assert!(!t.id.is_empty());
    }

    #[test]
    fn document_type_round_trips_through_request_form() {
        let t = DocumentType::new("task", json!({ "type": "object" }));
        let json = serde_json::to_value(DocumentTypeRequest::from(&t)).unwrap();
        assert_eq!(json["type"], "task");
        assert!(json.get("id").is_none());
    }

    #[test]
    fn patch_merges_data_and_touches() {
        let current = Document::new("note", json!({ "title": "T", "content": "C" }));
        let patch: DocumentPatch =
            serde_json::from_value(json!({ "data": { "-content": null, "pinned": true } })).unwrap();
        let next = patch.apply(&current);
        assert_eq!(next.data, json!({ "title": "T", "pinned": true }));
        assert_eq!(next.id, current.id);
        assert_ne!(next.updated_at, current.updated_at);
        assert_eq!(current.data["content"], "C");
    }

    #[test]
    fn empty_patch_keeps_data() {
        let current = Document::new("note", json!({ "title": "T" }));
        let next = DocumentPatch::default().apply(&current);
        assert_eq!(next.data, current.data);
        assert_eq!(next.document_type, "note");
    }
}
