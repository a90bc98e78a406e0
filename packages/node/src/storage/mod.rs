//! Storage abstraction layer for the YADS node.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and persistence. Schema and graph rule validation lives in the handlers;
//! storage enforces only identity and referential constraints: unique keys,
//! refusing to delete reference data that is still in use, cascading
//! document deletes, and the compare-and-swap on document updates.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral nodes |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use yads::{
    Document, DocumentTag, DocumentType, Graph, GraphRule, GraphType, ResolutionError, Role, Tag,
};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint, an in-use reference, or a stale
    /// compare-and-swap precondition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The store is missing reference data the validators depend on.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Keyset pagination over UUIDv7 ids.
#[derive(Debug, Clone)]
pub struct Page {
    /// Include only records whose `id > after`. `None` starts from the
    /// beginning.
    pub after: Option<String>,

    /// Maximum number of records to return. Implementations fetch
    /// `limit + 1` internally to determine `has_more`, then truncate.
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            after: None,
            limit: yads_api::DEFAULT_LIMIT,
        }
    }
}

/// Query parameters for [`Storage::list_documents`].
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Include only documents of this document type id.
    pub document_type: Option<String>,
    pub page: Page,
}

/// Query parameters for [`Storage::list_graphs`].
#[derive(Debug, Clone, Default)]
pub struct GraphFilter {
    /// Include only edges with this document as source or target.
    pub document: Option<String>,
    pub page: Page,
}

/// Query parameters for [`Storage::list_document_tags`].
#[derive(Debug, Clone, Default)]
pub struct DocumentTagFilter {
    pub document: Option<String>,
    pub tag: Option<String>,
    pub page: Page,
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for a YADS node.
///
/// All methods are `async` and return `Result<_, StorageError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an `Arc<dyn Storage>`.
///
/// `put_*` fails with [`StorageError::Conflict`] when the id (or another
/// unique key) is taken. `update_*` and `delete_*` fail with
/// [`StorageError::NotFound`] when the id is unknown. `list_*` return
/// `(records, has_more)` in ascending `id` order.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Document types ------------------------------------------------------

    /// The type name is unique.
    async fn put_document_type(&self, document_type: &DocumentType) -> Result<(), StorageError>;

    async fn get_document_type(&self, id: &str) -> Result<Option<DocumentType>, StorageError>;

    async fn list_document_types(
        &self,
        page: &Page,
    ) -> Result<(Vec<DocumentType>, bool), StorageError>;

    async fn update_document_type(&self, document_type: &DocumentType)
        -> Result<(), StorageError>;

    /// Conflict while any document or graph rule references the type.
    async fn delete_document_type(&self, id: &str) -> Result<(), StorageError>;

    // --- Documents -----------------------------------------------------------

    async fn put_document(&self, document: &Document) -> Result<(), StorageError>;

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StorageError>;

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<(Vec<Document>, bool), StorageError>;

    /// Replace a stored document, but only while its `updatedAt` still equals
    /// `expected_updated_at`. A mismatch is a [`StorageError::Conflict`].
    async fn update_document(
        &self,
        document: &Document,
        expected_updated_at: &str,
    ) -> Result<(), StorageError>;

    /// Delete a document together with every graph edge and document tag
    /// that references it.
    async fn delete_document(&self, id: &str) -> Result<(), StorageError>;

    // --- Graph types ---------------------------------------------------------

    async fn put_graph_type(&self, graph_type: &GraphType) -> Result<(), StorageError>;

    async fn get_graph_type(&self, id: &str) -> Result<Option<GraphType>, StorageError>;

    async fn list_graph_types(&self, page: &Page) -> Result<(Vec<GraphType>, bool), StorageError>;

    async fn update_graph_type(&self, graph_type: &GraphType) -> Result<(), StorageError>;

    /// Conflict while any graph rule or graph edge uses the type.
    async fn delete_graph_type(&self, id: &str) -> Result<(), StorageError>;

    // --- Roles ---------------------------------------------------------------

    async fn put_role(&self, role: &Role) -> Result<(), StorageError>;

    async fn get_role(&self, id: &str) -> Result<Option<Role>, StorageError>;

    async fn list_roles(&self, page: &Page) -> Result<(Vec<Role>, bool), StorageError>;

    async fn update_role(&self, role: &Role) -> Result<(), StorageError>;

    /// Conflict while any graph rule or graph edge carries the role.
    async fn delete_role(&self, id: &str) -> Result<(), StorageError>;

    // --- Graph rules ---------------------------------------------------------

    /// The `(source type, target type, graph type)` triple is unique.
    async fn put_graph_rule(&self, rule: &GraphRule) -> Result<(), StorageError>;

    async fn get_graph_rule(&self, id: &str) -> Result<Option<GraphRule>, StorageError>;

    async fn list_graph_rules(&self, page: &Page) -> Result<(Vec<GraphRule>, bool), StorageError>;

    async fn update_graph_rule(&self, rule: &GraphRule) -> Result<(), StorageError>;

    async fn delete_graph_rule(&self, id: &str) -> Result<(), StorageError>;

    /// The rule for an exact triple, if one exists.
    async fn find_graph_rule(
        &self,
        document_type_source: &str,
        document_type_target: &str,
        graph_type: &str,
    ) -> Result<Option<GraphRule>, StorageError>;

    // --- Graphs --------------------------------------------------------------

    async fn put_graph(&self, graph: &Graph) -> Result<(), StorageError>;

    async fn get_graph(&self, id: &str) -> Result<Option<Graph>, StorageError>;

    async fn list_graphs(&self, filter: &GraphFilter) -> Result<(Vec<Graph>, bool), StorageError>;

    async fn update_graph(&self, graph: &Graph) -> Result<(), StorageError>;

    async fn delete_graph(&self, id: &str) -> Result<(), StorageError>;

    /// Every edge with `document` as source or target, unpaginated.
    ///
    /// Used by the link and subgraph handlers.
    async fn graphs_touching(&self, document: &str) -> Result<Vec<Graph>, StorageError>;

    // --- Tags ----------------------------------------------------------------

    async fn put_tag(&self, tag: &Tag) -> Result<(), StorageError>;

    async fn get_tag(&self, id: &str) -> Result<Option<Tag>, StorageError>;

    async fn list_tags(&self, page: &Page) -> Result<(Vec<Tag>, bool), StorageError>;

    async fn update_tag(&self, tag: &Tag) -> Result<(), StorageError>;

    /// Delete a tag, its document tags, and detach its child tags (their
    /// `parentTag` becomes null).
    async fn delete_tag(&self, id: &str) -> Result<(), StorageError>;

    // --- Document tags -------------------------------------------------------

    /// The `(document, tag)` pair is unique.
    async fn put_document_tag(&self, document_tag: &DocumentTag) -> Result<(), StorageError>;

    async fn get_document_tag(&self, id: &str) -> Result<Option<DocumentTag>, StorageError>;

    async fn list_document_tags(
        &self,
        filter: &DocumentTagFilter,
    ) -> Result<(Vec<DocumentTag>, bool), StorageError>;

    async fn delete_document_tag(&self, id: &str) -> Result<(), StorageError>;
}
