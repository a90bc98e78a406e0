//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and ephemeral nodes.
//!
//! Every collection is a [`BTreeMap`] keyed by UUIDv7 id. Because UUIDv7 ids
//! sort lexicographically in creation order, keyset pagination with
//! `id > cursor` is simply a range query on the map; no secondary index needed.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use yads::{Document, DocumentTag, DocumentType, Graph, GraphRule, GraphType, Role, Tag};

use super::{DocumentFilter, DocumentTagFilter, GraphFilter, Page, Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    document_types: BTreeMap<String, DocumentType>,
    documents: BTreeMap<String, Document>,
    graph_types: BTreeMap<String, GraphType>,
    roles: BTreeMap<String, Role>,
    graph_rules: BTreeMap<String, GraphRule>,
    graphs: BTreeMap<String, Graph>,
    tags: BTreeMap<String, Tag>,
    document_tags: BTreeMap<String, DocumentTag>,
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves maps that are each still
    // internally consistent, so a poisoned lock is recovered.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- helpers -----------------------------------------------------------------

fn page_of<T: Clone>(
    map: &BTreeMap<String, T>,
    page: &Page,
    keep: impl Fn(&T) -> bool,
) -> (Vec<T>, bool) {
    let limit = page.limit as usize;
    let iter: Box<dyn Iterator<Item = &T>> = match &page.after {
        Some(after) => Box::new(
            map.range::<String, _>((Bound::Excluded(after), Bound::Unbounded))
                .map(|(_, v)| v),
        ),
        None => Box::new(map.values()),
    };
    let mut items: Vec<T> = iter.filter(|v| keep(v)).take(limit + 1).cloned().collect();
    let has_more = items.len() > limit;
    items.truncate(limit);
    (items, has_more)
}

fn insert_new<T: Clone>(
    map: &mut BTreeMap<String, T>,
    id: &str,
    value: &T,
    what: &str,
) -> Result<(), StorageError> {
    if map.contains_key(id) {
        return Err(StorageError::Conflict(format!("{what} {id} already exists")));
    }
    map.insert(id.to_string(), value.clone());
    Ok(())
}

fn replace_existing<T: Clone>(
    map: &mut BTreeMap<String, T>,
    id: &str,
    value: &T,
) -> Result<(), StorageError> {
    match map.get_mut(id) {
        Some(slot) => {
            *slot = value.clone();
            Ok(())
        }
        None => Err(StorageError::NotFound),
    }
}

fn remove_existing<T>(map: &mut BTreeMap<String, T>, id: &str) -> Result<T, StorageError> {
    map.remove(id).ok_or(StorageError::NotFound)
}

fn in_use(what: &str, id: &str, by: &str) -> StorageError {
    StorageError::Conflict(format!("{what} {id} is still referenced by {by}"))
}

impl Inner {
    fn type_name_taken(&self, name: &str, except: &str) -> bool {
        self.document_types
            .values()
            .any(|t| t.type_name == name && t.id != except)
    }

    fn triple_taken(&self, rule: &GraphRule) -> bool {
        self.graph_rules.values().any(|r| {
            r.id != rule.id
                && r.matches(
                    &rule.document_type_source,
                    &rule.document_type_target,
                    &rule.graph_type,
                )
        })
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Document types ------------------------------------------------------

    async fn put_document_type(&self, document_type: &DocumentType) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.type_name_taken(&document_type.type_name, &document_type.id) {
            return Err(StorageError::Conflict(format!(
                "document type {} already exists",
                document_type.type_name
            )));
        }
        insert_new(
            &mut inner.document_types,
            &document_type.id,
            document_type,
            "document type",
        )
    }

    async fn get_document_type(&self, id: &str) -> Result<Option<DocumentType>, StorageError> {
        Ok(self.read().document_types.get(id).cloned())
    }

    async fn list_document_types(
        &self,
        page: &Page,
    ) -> Result<(Vec<DocumentType>, bool), StorageError> {
        Ok(page_of(&self.read().document_types, page, |_| true))
    }

    async fn update_document_type(
        &self,
        document_type: &DocumentType,
    ) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.type_name_taken(&document_type.type_name, &document_type.id) {
            return Err(StorageError::Conflict(format!(
                "document type {} already exists",
                document_type.type_name
            )));
        }
        replace_existing(&mut inner.document_types, &document_type.id, document_type)
    }

    async fn delete_document_type(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.write();
        if !inner.document_types.contains_key(id) {
            return Err(StorageError::NotFound);
        }
        if inner.documents.values().any(|d| d.document_type == id) {
            return Err(in_use("document type", id, "documents"));
        }
        if inner
            .graph_rules
            .values()
            .any(|r| r.document_type_source == id || r.document_type_target == id)
        {
            return Err(in_use("document type", id, "graph rules"));
        }
        remove_existing(&mut inner.document_types, id).map(drop)
    }

    // --- Documents -----------------------------------------------------------

    async fn put_document(&self, document: &Document) -> Result<(), StorageError> {
        insert_new(&mut self.write().documents, &document.id, document, "document")
    }

    async fn get_document(&self, id: &str) -> Result<Option<Document>, StorageError> {
        Ok(self.read().documents.get(id).cloned())
    }

    async fn list_documents(
        &self,
        filter: &DocumentFilter,
    ) -> Result<(Vec<Document>, bool), StorageError> {
        Ok(page_of(&self.read().documents, &filter.page, |d| {
            filter
                .document_type
                .as_ref()
                .is_none_or(|t| &d.document_type == t)
        }))
    }

    async fn update_document(
        &self,
        document: &Document,
        expected_updated_at: &str,
    ) -> Result<(), StorageError> {
        let mut inner = self.write();
        let slot = inner
            .documents
            .get_mut(&document.id)
            .ok_or(StorageError::NotFound)?;
        if slot.updated_at != expected_updated_at {
            return Err(StorageError::Conflict(format!(
                "document {} was modified concurrently",
                document.id
            )));
        }
        *slot = document.clone();
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.write();
        remove_existing(&mut inner.documents, id)?;
        inner.graphs.retain(|_, g| !g.touches(id));
        inner.document_tags.retain(|_, dt| dt.document != id);
        Ok(())
    }

    // --- Graph types ---------------------------------------------------------

    async fn put_graph_type(&self, graph_type: &GraphType) -> Result<(), StorageError> {
        insert_new(&mut self.write().graph_types, &graph_type.id, graph_type, "graph type")
    }

    async fn get_graph_type(&self, id: &str) -> Result<Option<GraphType>, StorageError> {
        Ok(self.read().graph_types.get(id).cloned())
    }

    async fn list_graph_types(&self, page: &Page) -> Result<(Vec<GraphType>, bool), StorageError> {
        Ok(page_of(&self.read().graph_types, page, |_| true))
    }

    async fn update_graph_type(&self, graph_type: &GraphType) -> Result<(), StorageError> {
        replace_existing(&mut self.write().graph_types, &graph_type.id, graph_type)
    }

    async fn delete_graph_type(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.write();
        if !inner.graph_types.contains_key(id) {
            return Err(StorageError::NotFound);
        }
        if inner.graph_rules.values().any(|r| r.graph_type == id) {
            return Err(in_use("graph type", id, "graph rules"));
        }
        if inner.graphs.values().any(|g| g.graph_type == id) {
            return Err(in_use("graph type", id, "graphs"));
        }
        remove_existing(&mut inner.graph_types, id).map(drop)
    }

    // --- Roles ---------------------------------------------------------------

    async fn put_role(&self, role: &Role) -> Result<(), StorageError> {
        insert_new(&mut self.write().roles, &role.id, role, "role")
    }

    async fn get_role(&self, id: &str) -> Result<Option<Role>, StorageError> {
        Ok(self.read().roles.get(id).cloned())
    }

    async fn list_roles(&self, page: &Page) -> Result<(Vec<Role>, bool), StorageError> {
        Ok(page_of(&self.read().roles, page, |_| true))
    }

    async fn update_role(&self, role: &Role) -> Result<(), StorageError> {
        replace_existing(&mut self.write().roles, &role.id, role)
    }

    async fn delete_role(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.write();
        if !inner.roles.contains_key(id) {
            return Err(StorageError::NotFound);
        }
        if inner.graph_rules.values().any(|r| r.role.as_deref() == Some(id)) {
            return Err(in_use("role", id, "graph rules"));
        }
        if inner.graphs.values().any(|g| g.role.as_deref() == Some(id)) {
            return Err(in_use("role", id, "graphs"));
        }
        remove_existing(&mut inner.roles, id).map(drop)
    }

    // --- Graph rules ---------------------------------------------------------

    async fn put_graph_rule(&self, rule: &GraphRule) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.triple_taken(rule) {
            return Err(duplicate_rule(rule));
        }
        insert_new(&mut inner.graph_rules, &rule.id, rule, "graph rule")
    }

    async fn get_graph_rule(&self, id: &str) -> Result<Option<GraphRule>, StorageError> {
        Ok(self.read().graph_rules.get(id).cloned())
    }

    async fn list_graph_rules(&self, page: &Page) -> Result<(Vec<GraphRule>, bool), StorageError> {
        Ok(page_of(&self.read().graph_rules, page, |_| true))
    }

    async fn update_graph_rule(&self, rule: &GraphRule) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.triple_taken(rule) {
            return Err(duplicate_rule(rule));
        }
        replace_existing(&mut inner.graph_rules, &rule.id, rule)
    }

    async fn delete_graph_rule(&self, id: &str) -> Result<(), StorageError> {
        remove_existing(&mut self.write().graph_rules, id).map(drop)
    }

    async fn find_graph_rule(
        &self,
        document_type_source: &str,
        document_type_target: &str,
        graph_type: &str,
    ) -> Result<Option<GraphRule>, StorageError> {
        Ok(self
            .read()
            .graph_rules
            .values()
            .find(|r| r.matches(document_type_source, document_type_target, graph_type))
            .cloned())
    }

    // --- Graphs --------------------------------------------------------------

    async fn put_graph(&self, graph: &Graph) -> Result<(), StorageError> {
        insert_new(&mut self.write().graphs, &graph.id, graph, "graph")
    }

    async fn get_graph(&self, id: &str) -> Result<Option<Graph>, StorageError> {
        Ok(self.read().graphs.get(id).cloned())
    }

    async fn list_graphs(&self, filter: &GraphFilter) -> Result<(Vec<Graph>, bool), StorageError> {
        Ok(page_of(&self.read().graphs, &filter.page, |g| {
            filter.document.as_deref().is_none_or(|d| g.touches(d))
        }))
    }

    async fn update_graph(&self, graph: &Graph) -> Result<(), StorageError> {
        replace_existing(&mut self.write().graphs, &graph.id, graph)
    }

    async fn delete_graph(&self, id: &str) -> Result<(), StorageError> {
        remove_existing(&mut self.write().graphs, id).map(drop)
    }

    async fn graphs_touching(&self, document: &str) -> Result<Vec<Graph>, StorageError> {
        Ok(self
            .read()
            .graphs
            .values()
            .filter(|g| g.touches(document))
            .cloned()
            .collect())
    }

    // --- Tags ----------------------------------------------------------------

    async fn put_tag(&self, tag: &Tag) -> Result<(), StorageError> {
        insert_new(&mut self.write().tags, &tag.id, tag, "tag")
    }

    async fn get_tag(&self, id: &str) -> Result<Option<Tag>, StorageError> {
        Ok(self.read().tags.get(id).cloned())
    }

    async fn list_tags(&self, page: &Page) -> Result<(Vec<Tag>, bool), StorageError> {
        Ok(page_of(&self.read().tags, page, |_| true))
    }

    async fn update_tag(&self, tag: &Tag) -> Result<(), StorageError> {
        replace_existing(&mut self.write().tags, &tag.id, tag)
    }

    async fn delete_tag(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.write();
        remove_existing(&mut inner.tags, id)?;
        inner.document_tags.retain(|_, dt| dt.tag != id);
        for child in inner.tags.values_mut() {
            if child.parent_tag.as_deref() == Some(id) {
                child.parent_tag = None;
            }
        }
        Ok(())
    }

    // --- Document tags -------------------------------------------------------

    async fn put_document_tag(&self, document_tag: &DocumentTag) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner
            .document_tags
            .values()
            .any(|dt| dt.document == document_tag.document && dt.tag == document_tag.tag)
        {
            return Err(StorageError::Conflict(format!(
                "document {} is already tagged {}",
                document_tag.document, document_tag.tag
            )));
        }
        insert_new(
            &mut inner.document_tags,
            &document_tag.id,
            document_tag,
            "document tag",
        )
    }

    async fn get_document_tag(&self, id: &str) -> Result<Option<DocumentTag>, StorageError> {
        Ok(self.read().document_tags.get(id).cloned())
    }

    async fn list_document_tags(
        &self,
        filter: &DocumentTagFilter,
    ) -> Result<(Vec<DocumentTag>, bool), StorageError> {
        Ok(page_of(&self.read().document_tags, &filter.page, |dt| {
            filter.document.as_ref().is_none_or(|d| &dt.document == d)
                && filter.tag.as_ref().is_none_or(|t| &dt.tag == t)
        }))
    }

    async fn delete_document_tag(&self, id: &str) -> Result<(), StorageError> {
        remove_existing(&mut self.write().document_tags, id).map(drop)
    }
}

fn duplicate_rule(rule: &GraphRule) -> StorageError {
    StorageError::Conflict(format!(
        "a graph rule for {} -> {} ({}) already exists",
        rule.document_type_source, rule.document_type_target, rule.graph_type
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yads::GraphDirection;

    fn page(after: Option<&str>, limit: u32) -> Page {
        Page {
            after: after.map(str::to_string),
            limit,
        }
    }

    async fn note_type(s: &MemoryStorage) -> DocumentType {
        let t = DocumentType::new("note", json!({ "type": "object" }));
        s.put_document_type(&t).await.unwrap();
        t
    }

    #[tokio::test]
    async fn put_and_get_document() {
        let s = MemoryStorage::new();
        let t = note_type(&s).await;
        let d = Document::new(&t.id, json!({ "title": "T" }));
        s.put_document(&d).await.unwrap();
        assert_eq!(s.get_document(&d.id).await.unwrap().unwrap(), d);
        assert!(s.get_document("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_id_is_conflict() {
        let s = MemoryStorage::new();
        let t = note_type(&s).await;
        let d = Document::new(&t.id, json!({}));
        s.put_document(&d).await.unwrap();
        assert!(matches!(
            s.put_document(&d).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_type_name_is_conflict() {
        let s = MemoryStorage::new();
        note_type(&s).await;
        let again = DocumentType::new("note", json!(true));
        assert!(matches!(
            s.put_document_type(&again).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn list_paginates_by_id() {
        let s = MemoryStorage::new();
        let t = note_type(&s).await;
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut d = Document::new(&t.id, json!({}));
            d.id = format!("doc-{i}");
            s.put_document(&d).await.unwrap();
            ids.push(d.id);
        }
        let first = DocumentFilter {
            document_type: None,
            page: page(None, 2),
        };
        let (items, more) = s.list_documents(&first).await.unwrap();
        assert_eq!(items.len(), 2);
        assert!(more);

        let rest = DocumentFilter {
            document_type: Some(t.id.clone()),
            page: page(Some(&items[1].id), 10),
        };
        let (items, more) = s.list_documents(&rest).await.unwrap();
        assert_eq!(items.len(), 3);
        assert!(!more);
        assert_eq!(items[0].id, "doc-2");
    }

    #[tokio::test]
    async fn update_document_is_compare_and_swap() {
        let s = MemoryStorage::new();
        let t = note_type(&s).await;
        let d = Document::new(&t.id, json!({ "title": "A" }));
        s.put_document(&d).await.unwrap();

        let mut first = d.clone();
        first.data = json!({ "title": "B" });
        first.touch();
        s.update_document(&first, &d.updated_at).await.unwrap();

        let mut second = d.clone();
        second.data = json!({ "title": "C" });
        second.touch();
        assert!(matches!(
            s.update_document(&second, &d.updated_at).await,
            Err(StorageError::Conflict(_))
        ));
        assert_eq!(
            s.get_document(&d.id).await.unwrap().unwrap().data,
            json!({ "title": "B" })
        );
    }

    #[tokio::test]
    async fn delete_document_cascades() {
        let s = MemoryStorage::new();
        let t = note_type(&s).await;
        let a = Document::new(&t.id, json!({}));
        let b = Document::new(&t.id, json!({}));
        s.put_document(&a).await.unwrap();
        s.put_document(&b).await.unwrap();
        let gt = GraphType::new("linked", GraphDirection::NotDirected);
        s.put_graph_type(&gt).await.unwrap();
        s.put_graph(&Graph::new(&a.id, &b.id, &gt.id)).await.unwrap();
        let tag = Tag::new("urgent");
        s.put_tag(&tag).await.unwrap();
        s.put_document_tag(&DocumentTag::new(&a.id, &tag.id)).await.unwrap();

        s.delete_document(&a.id).await.unwrap();
        assert!(s.graphs_touching(&b.id).await.unwrap().is_empty());
        let (tags, _) = s
            .list_document_tags(&DocumentTagFilter::default())
            .await
            .unwrap();
        assert!(tags.is_empty());
        assert!(matches!(
            s.delete_document(&a.id).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn referenced_document_type_cannot_be_deleted() {
        let s = MemoryStorage::new();
        let t = note_type(&s).await;
        let d = Document::new(&t.id, json!({}));
        s.put_document(&d).await.unwrap();
        assert!(matches!(
            s.delete_document_type(&t.id).await,
            Err(StorageError::Conflict(_))
        ));
        s.delete_document(&d.id).await.unwrap();
        s.delete_document_type(&t.id).await.unwrap();
    }

    #[tokio::test]
    async fn graph_rule_triple_is_unique_and_findable() {
        let s = MemoryStorage::new();
        let rule = GraphRule::new("group", "notebook", "contains", None);
        s.put_graph_rule(&rule).await.unwrap();
        let dup = GraphRule::new("group", "notebook", "contains", Some("owner".into()));
        assert!(matches!(
            s.put_graph_rule(&dup).await,
            Err(StorageError::Conflict(_))
        ));
        // Updating a rule onto its own triple is fine.
        s.update_graph_rule(&rule).await.unwrap();

        let found = s
            .find_graph_rule("group", "notebook", "contains")
            .await
            .unwrap();
        assert_eq!(found.unwrap().id, rule.id);
        assert!(s
            .find_graph_rule("notebook", "group", "contains")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn document_tag_pair_is_unique() {
        let s = MemoryStorage::new();
        s.put_document_tag(&DocumentTag::new("d", "t")).await.unwrap();
        assert!(matches!(
            s.put_document_tag(&DocumentTag::new("d", "t")).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_tag_detaches_children() {
        let s = MemoryStorage::new();
        let parent = Tag::new("work");
        let mut child = Tag::new("meetings");
        child.parent_tag = Some(parent.id.clone());
        s.put_tag(&parent).await.unwrap();
        s.put_tag(&child).await.unwrap();

        s.delete_tag(&parent.id).await.unwrap();
        assert!(s.get_tag(&child.id).await.unwrap().unwrap().parent_tag.is_none());
    }

    #[tokio::test]
    async fn role_in_use_cannot_be_deleted() {
        let s = MemoryStorage::new();
        let role = Role::new("owner");
        s.put_role(&role).await.unwrap();
        let mut g = Graph::new("a", "b", "t");
        g.role = Some(role.id.clone());
        s.put_graph(&g).await.unwrap();
        assert!(matches!(
            s.delete_role(&role.id).await,
            Err(StorageError::Conflict(_))
        ));
    }
}
