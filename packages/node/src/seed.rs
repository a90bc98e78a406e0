//! Startup seeding of the reference fixtures.

use yads::Fixtures;

use crate::storage::{Page, Storage, StorageError};

/// Store the reference document types, graph types, roles and graph rules,
/// unless the store already holds any document type.
///
/// Returns `true` if the fixtures were written.
pub async fn load_fixtures(storage: &dyn Storage) -> Result<bool, StorageError> {
    let first_page = Page {
        after: None,
        limit: 1,
    };
    let (existing, _) = storage.list_document_types(&first_page).await?;
    if !existing.is_empty() {
        tracing::info!("seed: store already has document types, skipping fixtures");
        return Ok(false);
    }

    let fixtures = Fixtures::build();
    for document_type in &fixtures.document_types {
        storage.put_document_type(document_type).await?;
    }
    for graph_type in &fixtures.graph_types {
        storage.put_graph_type(graph_type).await?;
    }
    for role in &fixtures.roles {
        storage.put_role(role).await?;
    }
    for rule in &fixtures.graph_rules {
        storage.put_graph_rule(rule).await?;
    }

    tracing::info!(
        document_types = fixtures.document_types.len(),
        graph_types = fixtures.graph_types.len(),
        roles = fixtures.roles.len(),
        graph_rules = fixtures.graph_rules.len(),
        "seed: fixtures loaded"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStorage;

    #[tokio::test]
    async fn seeds_an_empty_store_once() {
        let storage = MemoryStorage::new();
        assert!(load_fixtures(&storage).await.unwrap());
        assert!(!load_fixtures(&storage).await.unwrap());

        let (types, _) = storage.list_document_types(&Page::default()).await.unwrap();
        let mut names: Vec<_> = types.into_iter().map(|t| t.type_name).collect();
        names.sort();
        assert_eq!(names, ["group", "note", "notebook", "task"]);

        let (rules, _) = storage.list_graph_rules(&Page::default()).await.unwrap();
        assert_eq!(rules.len(), Fixtures::build().graph_rules.len());
    }
}
