//! Deep merge of PATCH bodies onto stored document data.
//!
//! A partial update (`patch`) is merged onto the previously stored value
//! (`base`) in two phases:
//!
//! 1. **Deletions.** Every key in `patch` whose name starts with `-` is a
//!    deletion marker: `"-title"` removes `title`. Markers nested inside an
//!    object under key `k` act on `base[k]`. All markers are collected in one
//!    pass ([`collect_deletions`]) and applied to both `base` and `patch`
//!    before anything is merged, so nothing the patch deletes can be
//!    re-introduced by the merge step.
//! 2. **Recursive replace** ([`replace_recursive`]). Objects merge key by key;
//!    arrays and scalars in `patch` overwrite whatever `base` holds.
//!
//! ```rust,ignore
//! use serde_json::json;
//!
//! let base = json!({ "title": "T", "description": "D" });
//! let merged = yads::merge(&base, &json!({ "-title": null }));
//! assert_eq!(merged, json!({ "description": "D" }));
//! ```

use serde_json::{Map, Value};

/// Prefix that turns a patch key into a deletion marker.
pub const DELETION_PREFIX: char = '-';

/// Merge `patch` onto `base` and return the result. Neither input is modified.
pub fn merge(base: &Value, patch: &Value) -> Value {
    merge_owned(base.clone(), patch.clone())
}

/// [`merge`] for callers that already own both values.
pub fn merge_owned(mut base: Value, mut patch: Value) -> Value {
    let deletions = collect_deletions(&patch);
    if !deletions.is_empty() {
        deletions.apply(&mut base, &mut patch);
    }
    replace_recursive(base, patch)
}

// ---------------------------------------------------------------------------
// Deletions
// ---------------------------------------------------------------------------

/// The deletion markers found in a patch, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionSet {
    markers: Vec<Marker>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Marker {
    /// Keys leading from the root to the object holding the marker.
    parents: Vec<String>,
    /// The marker key itself, prefix included.
    key: String,
}

impl Marker {
    fn target(&self) -> &str {
        &self.key[DELETION_PREFIX.len_utf8()..]
    }
}

impl DeletionSet {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Remove every targeted key from `base`, and both the marker and the
    /// targeted key from `patch`. Targets missing from `base` are skipped.
    pub fn apply(&self, base: &mut Value, patch: &mut Value) {
        for marker in &self.markers {
            if let Some(obj) = object_at_mut(patch, &marker.parents) {
                obj.remove(&marker.key);
                obj.remove(marker.target());
            }
            if let Some(obj) = object_at_mut(base, &marker.parents) {
                obj.remove(marker.target());
            }
        }
    }
}

/// Scan `patch` for deletion markers at every object depth.
pub fn collect_deletions(patch: &Value) -> DeletionSet {
    let mut set = DeletionSet::default();
    let mut parents = Vec::new();
    collect_into(patch, &mut parents, &mut set);
    set
}

fn collect_into(value: &Value, parents: &mut Vec<String>, set: &mut DeletionSet) {
    let Value::Object(map) = value else {
        return;
    };
    for (key, child) in map {
        if key.starts_with(DELETION_PREFIX) {
            set.markers.push(Marker {
                parents: parents.clone(),
                key: key.clone(),
            });
        } else if child.is_object() {
            parents.push(key.clone());
            collect_into(child, parents, set);
            parents.pop();
        }
    }
}

fn object_at_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for key in path {
        current = current.as_object_mut()?.get_mut(key)?;
    }
    current.as_object_mut()
}

// ---------------------------------------------------------------------------
// Recursive replace
// ---------------------------------------------------------------------------

/// Merge `patch` into `base`: objects merge key by key, recursively; any
/// other value in `patch` (arrays included) replaces the value in `base`.
pub fn replace_recursive(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut target), Value::Object(source)) => {
            for (key, incoming) in source {
                let merged = match target.remove(&key) {
                    Some(existing) => replace_recursive(existing, incoming),
                    None => incoming,
                };
                target.insert(key, merged);
            }
            Value::Object(target)
        }
        (_, patch) => patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_patch_is_identity() {
        let base = json!({ "title": "T", "nested": { "a": [1, 2] } });
        assert_eq!(merge(&base, &json!({})), base);
    }

    #[test]
    fn top_level_deletion() {
        let merged = merge(
            &json!({ "title": "T", "description": "D" }),
            &json!({ "-title": null }),
        );
        assert_eq!(merged, json!({ "description": "D" }));
    }

    #[test]
    fn nested_deletion_acts_on_nested_base() {
        let merged = merge(
            &json!({ "titles": { "a": "1", "b": "2" }, "description": "D" }),
            &json!({ "titles": { "-b": null } }),
        );
        assert_eq!(merged, json!({ "titles": { "a": "1" }, "description": "D" }));
    }

    #[test]
    fn nested_marker_does_not_touch_top_level() {
        let merged = merge(
            &json!({ "b": "top", "titles": { "a": "1" } }),
            &json!({ "titles": { "-b": null } }),
        );
        assert_eq!(merged, json!({ "b": "top", "titles": { "a": "1" } }));
    }

    #[test]
    fn arrays_replace_wholesale() {
        assert_eq!(merge(&json!([1, 2, 3]), &json!([4, 5, 6])), json!([4, 5, 6]));
        assert_eq!(
            merge(&json!({ "tags": [1, 2, 3] }), &json!({ "tags": [9] })),
            json!({ "tags": [9] })
        );
    }

    #[test]
    fn objects_merge_recursively_and_scalars_overwrite() {
        let merged = merge(
            &json!({ "title": "T", "meta": { "a": 1, "b": { "c": 2 } } }),
            &json!({ "title": "U", "meta": { "b": { "d": 3 } }, "new": true }),
        );
        assert_eq!(
            merged,
            json!({ "title": "U", "meta": { "a": 1, "b": { "c": 2, "d": 3 } }, "new": true })
        );
    }

    #[test]
    fn null_overwrites() {
        assert_eq!(
            merge(&json!({ "due": "2026-01-01" }), &json!({ "due": null })),
            json!({ "due": null })
        );
    }

    #[test]
    fn deleting_missing_key_is_a_no_op() {
        let base = json!({ "title": "T" });
        assert_eq!(merge(&base, &json!({ "-nothing": null })), base);
        assert_eq!(
            merge(&base, &json!({ "missing": { "-x": null } })),
            json!({ "title": "T", "missing": {} })
        );
    }

    #[test]
    fn deletion_wins_over_same_request_assignment() {
        let merged = merge(
            &json!({ "title": "T", "description": "D" }),
            &json!({ "-title": null, "title": "resurrected" }),
        );
        assert_eq!(merged, json!({ "description": "D" }));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let base = json!({ "title": "T" });
        let patch = json!({ "-title": null });
        let _ = merge(&base, &patch);
        assert_eq!(base, json!({ "title": "T" }));
        assert_eq!(patch, json!({ "-title": null }));
    }

    #[test]
    fn merged_value_is_the_validated_value() {
        let schema = crate::schema::Schema::compile(&json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["title"],
            "properties": { "title": { "type": "string" }, "description": { "type": "string" } }
        }))
        .unwrap();
        let base = json!({ "title": "T", "description": "D" });
        let merged = merge(&base, &json!({ "-title": null }));
        let violations = schema.validate(&merged);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "/title");
    }
}
