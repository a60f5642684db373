use async_trait::async_trait;
use tracing::{debug, info};

use crate::contract::{ObjectStore, RemoteCatalog, RemoteObjectRef};
use crate::error::Result;

/// [`RemoteCatalog`] backed by a full listing of the folder on every lookup.
/// Nothing is cached between calls.
pub struct FolderCatalog<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> FolderCatalog<'a, S> {
    pub fn new(store: &'a S) -> Self {
        FolderCatalog { store }
    }
}

#[async_trait]
impl<'a, S: ObjectStore + ?Sized> RemoteCatalog for FolderCatalog<'a, S> {
    async fn find_by_name(&self, folder_id: &str, name: &str) -> Result<Option<RemoteObjectRef>> {
        let items = self.store.list_folder_items(folder_id).await?;
        debug!(folder_id, items = items.len(), "[SYNC] Listed remote folder");

        // Exact and case-sensitive; the first entry in listing order wins.
        let found = items
            .into_iter()
            .find(|item| item.name == name)
            .map(|item| RemoteObjectRef {
                name: item.name,
                id: item.id,
            });

        match &found {
            Some(object) => info!(name, id = %object.id, "[SYNC] Found existing remote item"),
            None => info!(name, folder_id, "[SYNC] No remote item with this name"),
        }
        Ok(found)
    }
}
