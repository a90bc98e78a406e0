//! Evaluation of document schemas.
//!
//! Each [`DocumentType`] carries its `allowedAttributes` as schema-as-data: a
//! draft 2020-12 JSON Schema stored as a plain [`Value`]. [`Schema::compile`]
//! builds a `jsonschema` validator for it once, and [`Schema::validate`] runs
//! a document's `data` through it, collecting every [`Violation`] rather than
//! stopping at the first.
//!
//! Formats are asserted, not just annotated: `date`, `time` and `date-time`
//! follow RFC 3339, so `"2026-03-01 10:00:00Z"` (no `T`) and `"09:15:00"`
//! (no offset) are rejected. Unknown formats are ignored.
//!
//! Violation paths are JSON Pointers into the validated value. A missing
//! `required` property and a forbidden additional property are reported at
//! the property's own pointer (`/title`), not at the enclosing object.

use std::fmt;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, ValidationError, Validator};
use serde_json::Value;

use crate::types::{Document, DocumentType};
use crate::violation::{pointer_push, ResolutionError, Violation};

/// A compiled document schema.
pub struct Schema {
    validator: Validator,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").finish_non_exhaustive()
    }
}

impl Schema {
    /// Compile a schema document.
    ///
    /// The schema is checked against the draft 2020-12 meta-schema first.
    /// Fails with [`ResolutionError::MalformedSchema`] naming the JSON Pointer
    /// of the offending keyword inside the schema.
    pub fn compile(schema: &Value) -> Result<Self, ResolutionError> {
        if !(schema.is_object() || schema.is_boolean()) {
            return Err(ResolutionError::malformed(
                "",
                "a schema must be an object or a boolean",
            ));
        }
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .should_validate_formats(true)
            .build(schema)
            .map_err(|e| ResolutionError::malformed(&e.instance_path.to_string(), e.to_string()))?;
        Ok(Self { validator })
    }

    /// Validate `data`, returning every violation found, ordered by path.
    /// Empty means valid.
    pub fn validate(&self, data: &Value) -> Vec<Violation> {
        let mut out = Vec::new();
        for error in self.validator.iter_errors(data) {
            push_violations(&error, &mut out);
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }
}

/// Translate one `jsonschema` error into violations at property pointers.
fn push_violations(error: &ValidationError<'_>, out: &mut Vec<Violation>) {
    let at = error.instance_path.to_string();
    match &error.kind {
        ValidationErrorKind::Required { property } => {
            let name = property
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| property.to_string());
            out.push(Violation::new(
                pointer_push(&at, &name),
                format!("the property {name} is required"),
            ));
        }
        ValidationErrorKind::AdditionalProperties { unexpected } => {
            for key in unexpected {
                out.push(Violation::new(
                    pointer_push(&at, key),
                    format!("the property {key} is not allowed"),
                ));
            }
        }
        _ => out.push(Violation::new(at, error.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Document entry points
// ---------------------------------------------------------------------------

/// Validate a bare `data` value against a schema document.
pub fn validate_data(data: &Value, schema: &Value) -> Result<Vec<Violation>, ResolutionError> {
    Ok(Schema::compile(schema)?.validate(data))
}

/// Validate a document's `data` against an already compiled schema.
///
/// `data` must be a JSON object; anything else yields a single root violation.
pub fn check_document(document: &Document, schema: &Schema) -> Vec<Violation> {
    if !document.data.is_object() {
        return vec![Violation::new("", "data must be an object")];
    }
    schema.validate(&document.data)
}

/// Validate a document against its resolved [`DocumentType`].
///
/// Fails with [`ResolutionError::MissingDocumentType`] when `document_type`
/// is absent or is not the type the document references, and with
/// [`ResolutionError::MalformedSchema`] when the type has no usable schema.
pub fn validate_document(
    document: &Document,
    document_type: Option<&DocumentType>,
) -> Result<Vec<Violation>, ResolutionError> {
    let document_type = document_type
        .filter(|t| t.id == document.document_type)
        .ok_or_else(|| ResolutionError::MissingDocumentType(document.document_type.clone()))?;
    if document_type.allowed_attributes.is_null() {
        return Err(ResolutionError::malformed("", "document type has no schema"));
    }
    let schema = Schema::compile(&document_type.allowed_attributes)?;
    Ok(check_document(document, &schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn note_schema() -> Value {
        json!({
            "$id": "https://example.com/note.schema.json",
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "type": "object",
            "additionalProperties": false,
            "required": ["title"],
            "properties": {
                "title": { "type": "string", "minLength": 1, "maxLength": 10 },
                "description": { "type": ["string", "null"] },
                "priority": { "type": "integer", "minimum": 0 },
                "due": { "type": ["string", "null"], "format": "date" },
                "at": { "type": "string", "format": "time" },
                "done": { "type": "string", "format": "date-time" }
            }
        })
    }

    fn violations(data: Value) -> Vec<Violation> {
        validate_data(&data, &note_schema()).unwrap()
    }

    fn paths(v: &[Violation]) -> Vec<&str> {
        v.iter().map(|v| v.path.as_str()).collect()
    }

    #[test]
    fn conforming_data_is_valid() {
        let v = violations(json!({
            "title": "Groceries",
            "description": null,
            "priority": 2,
            "due": "2026-03-01",
            "at": "14:30:00+02:00",
            "done": "2026-03-01T10:00:00Z"
        }));
        assert!(v.is_empty(), "{v:?}");
    }

    #[test]
    fn missing_required_field_is_reported_at_its_path() {
        let v = violations(json!({ "description": "no title" }));
        assert_eq!(v, vec![Violation::new("/title", "the property title is required")]);
    }

    #[test]
    fn each_additional_property_is_reported() {
        let v = violations(json!({ "title": "x", "colour": "red", "size": 3 }));
        assert_eq!(
            v,
            vec![
                Violation::new("/colour", "the property colour is not allowed"),
                Violation::new("/size", "the property size is not allowed"),
            ]
        );
    }

    #[test]
    fn collects_every_violation_in_path_order() {
        let v = violations(json!({ "title": "", "priority": -1, "extra": 1 }));
        assert_eq!(paths(&v), vec!["/extra", "/priority", "/title"]);
    }

    #[test]
    fn type_mismatch_is_reported_at_the_property() {
        let v = violations(json!({ "title": "x", "description": 3 }));
        assert_eq!(paths(&v), vec!["/description"]);
        assert!(v[0].message.contains("string"), "{}", v[0].message);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert!(violations(json!({ "title": "éééééééééé" })).is_empty());
        assert_eq!(violations(json!({ "title": "ééééééééééé" })).len(), 1);
    }

    #[test]
    fn integer_rejects_fractions() {
        assert!(violations(json!({ "title": "x", "priority": 3 })).is_empty());
        assert_eq!(paths(&violations(json!({ "title": "x", "priority": 3.5 }))), vec!["/priority"]);
    }

    #[test]
    fn date_format() {
        assert!(violations(json!({ "title": "x", "due": "2026-02-28" })).is_empty());
        assert_eq!(violations(json!({ "title": "x", "due": "2026-02-30" })).len(), 1);
        assert_eq!(violations(json!({ "title": "x", "due": "01.03.2026" })).len(), 1);
    }

    #[test]
    fn time_format_requires_an_offset() {
        assert!(violations(json!({ "title": "x", "at": "23:59:59.5Z" })).is_empty());
        assert!(violations(json!({ "title": "x", "at": "09:15:00-05:00" })).is_empty());
        assert_eq!(paths(&violations(json!({ "title": "x", "at": "09:15:00" }))), vec!["/at"]);
        assert_eq!(violations(json!({ "title": "x", "at": "24:00:00Z" })).len(), 1);
    }

    #[test]
    fn date_time_format_requires_the_t_separator() {
        assert!(violations(json!({ "title": "x", "done": "2026-03-01T10:00:00+01:00" })).is_empty());
        assert_eq!(
            paths(&violations(json!({ "title": "x", "done": "2026-03-01 10:00:00Z" }))),
            vec!["/done"]
        );
        assert_eq!(violations(json!({ "title": "x", "done": "2026-03-01" })).len(), 1);
    }

    #[test]
    fn nullable_format_accepts_null() {
        assert!(violations(json!({ "title": "x", "due": null })).is_empty());
    }

    #[test]
    fn nested_objects_and_items() {
        let schema = json!({
            "type": "object",
            "properties": {
                "checklist": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "required": ["label"],
                        "properties": { "label": { "type": "string" } }
                    }
                }
            }
        });
        let v = validate_data(
            &json!({ "checklist": [ { "label": "a" }, { "lbl": "b" } ] }),
            &schema,
        )
        .unwrap();
        assert_eq!(paths(&v), vec!["/checklist/1/label"]);
    }

    #[test]
    fn boolean_and_enum_schemas() {
        let schema = json!({
            "type": "object",
            "properties": {
                "status": { "enum": ["open", "closed"] },
                "locked": false
            }
        });
        let v = validate_data(&json!({ "status": "pending", "locked": 1 }), &schema).unwrap();
        assert_eq!(paths(&v), vec!["/locked", "/status"]);
    }

    #[test]
    fn malformed_schemas_are_resolution_errors() {
        let bad = [
            json!("object"),
            json!({ "type": "text" }),
            json!({ "type": [] }),
            json!({ "required": "title" }),
            json!({ "properties": { "a": { "minLength": -1 } } }),
            json!({ "items": [ { "type": "string" } ] }),
        ];
        for schema in bad {
            assert!(
                matches!(Schema::compile(&schema), Err(ResolutionError::MalformedSchema { .. })),
                "{schema} should not compile"
            );
        }
    }

    #[test]
    fn malformed_schema_names_the_keyword() {
        let err = Schema::compile(&json!({ "properties": { "a": { "maximum": "ten" } } }))
            .unwrap_err();
        match err {
            ResolutionError::MalformedSchema { pointer, .. } => {
                assert_eq!(pointer, "/properties/a/maximum")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_keywords_and_formats_are_ignored() {
        let schema = json!({ "type": "string", "format": "x-colour", "x-ui": { "widget": "text" } });
        assert!(validate_data(&json!("not a colour"), &schema).unwrap().is_empty());
    }

    #[test]
    fn document_requires_matching_type() {
        let t = DocumentType::new("note", note_schema());
        let doc = Document::new(&t.id, json!({ "title": "x" }));
        assert_eq!(validate_document(&doc, Some(&t)), Ok(vec![]));

        let other = DocumentType::new("task", note_schema());
        assert!(matches!(
            validate_document(&doc, Some(&other)),
            Err(ResolutionError::MissingDocumentType(_))
        ));
        assert!(matches!(
            validate_document(&doc, None),
            Err(ResolutionError::MissingDocumentType(_))
        ));
    }

    #[test]
    fn document_data_must_be_an_object() {
        let t = DocumentType::new("note", json!(true));
        let doc = Document::new(&t.id, json!(["x"]));
        let v = validate_document(&doc, Some(&t)).unwrap();
        assert_eq!(v, vec![Violation::new("", "data must be an object")]);
    }

    #[test]
    fn document_type_without_schema_is_a_resolution_error() {
        let t = DocumentType::new("note", Value::Null);
        let doc = Document::new(&t.id, json!({}));
        assert!(matches!(
            validate_document(&doc, Some(&t)),
            Err(ResolutionError::MalformedSchema { .. })
        ));
    }
}
