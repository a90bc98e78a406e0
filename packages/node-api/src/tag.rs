//! Tag and document-tag bodies.

use serde::{Deserialize, Serialize};

use yads::{DocumentTag, Tag};

/// Body of `POST /tags` and `PUT /tags/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TagRequest {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Id of the parent tag.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "parent_tag")]
    pub parent_tag: Option<String>,
}

impl TagRequest {
    pub fn into_tag(self) -> Tag {
        let mut t = Tag::new(self.name);
        t.description = self.description;
        t.parent_tag = self.parent_tag;
        t
    }

    pub fn apply_to(self, target: &mut Tag) {
        target.name = self.name;
        target.description = self.description;
        target.parent_tag = self.parent_tag;
    }
}

/// Body of `POST /document_tags`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentTagRequest {
    pub document: String,
    pub tag: String,
}

impl DocumentTagRequest {
    pub fn into_document_tag(self) -> DocumentTag {
        DocumentTag::new(self.document, self.tag)
    }
}
