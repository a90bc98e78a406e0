//! Keyset pagination shared by every collection endpoint.

use serde::{Deserialize, Serialize};

use yads::{Document, DocumentTag, DocumentType, Graph, GraphRule, GraphType, Role, Tag};

/// Default page size when `limit` is absent.
pub const DEFAULT_LIMIT: u32 = 50;
/// Largest page size a client may ask for.
pub const MAX_LIMIT: u32 = 500;

/// Pagination parameters common to all list endpoints.
///
/// Constructed by the server from the URL query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Return only records whose `id` sorts after this UUIDv7 string.
    pub after: Option<String>,

    /// Maximum number of records to return.
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Effective limit, clamped to `[1, max]`. Returns `default` if not
    /// specified.
    pub fn effective_limit(&self, default: u32, max: u32) -> u32 {
        self.limit.map(|l| l.clamp(1, max)).unwrap_or(default.min(max))
    }
}

/// Anything listed by id.
pub trait Identified {
    fn id(&self) -> &str;
}

macro_rules! identified {
    ($($t:ty),* $(,)?) => {
        $(impl Identified for $t {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

identified!(DocumentType, Document, GraphType, Role, GraphRule, Graph, Tag, DocumentTag);

/// One page of a collection.
///
/// ```json
/// {
///   "items": [ { ... }, { ... } ],
///   "cursor": "019526b2-f68a-7c3e-a0b4-1d2e3f4a5b6d",
///   "hasMore": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// The records on this page, in ascending `id` order.
    pub items: Vec<T>,

    /// The `id` of the last record in `items`. Pass as `?after=` to fetch the
    /// next page. Absent when `items` is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,

    /// `true` if there are more records after this page.
    pub has_more: bool,
}

impl<T: Identified> ListResponse<T> {
    pub fn from_page(items: Vec<T>, has_more: bool) -> Self {
        let cursor = items.last().map(|i| i.id().to_string());
        Self {
            items,
            cursor,
            has_more,
        }
    }
}

impl<T> ListResponse<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            has_more: false,
        }
    }
}
