use box_archiver_core::catalog::FolderCatalog;
use box_archiver_core::contract::{ItemKind, MockObjectStore, RemoteCatalog, RemoteItem};
use box_archiver_core::{Error, RemoteApiError};

fn item(id: &str, name: &str, kind: ItemKind) -> RemoteItem {
    RemoteItem {
        id: id.to_string(),
        name: name.to_string(),
        kind,
    }
}

fn store_listing(items: Vec<RemoteItem>) -> MockObjectStore {
    let mut store = MockObjectStore::new();
    store
        .expect_list_folder_items()
        .withf(|folder_id| folder_id == "folder-1")
        .times(1)
        .return_once(move |_| Ok(items));
    store
}

#[tokio::test]
async fn test_find_by_name_in_empty_folder_is_not_found() {
    let store = store_listing(vec![]);
    let catalog = FolderCatalog::new(&store);

    let found = catalog.find_by_name("folder-1", "2024-05.zip").await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_find_by_name_requires_exact_case_sensitive_match() {
    let store = store_listing(vec![
        item("1", "2024-05.ZIP", ItemKind::File),
        item("2", "2024-05.zip.bak", ItemKind::File),
        item("3", " 2024-05.zip", ItemKind::File),
    ]);
    let catalog = FolderCatalog::new(&store);

    let found = catalog.find_by_name("folder-1", "2024-05.zip").await.unwrap();
    assert!(found.is_none(), "No entry matches exactly, got: {found:?}");
}

#[tokio::test]
async fn test_find_by_name_returns_matching_id() {
    let store = store_listing(vec![
        item("10", "2024-04.zip", ItemKind::File),
        item("11", "2024-05.zip", ItemKind::File),
    ]);
    let catalog = FolderCatalog::new(&store);

    let found = catalog
        .find_by_name("folder-1", "2024-05.zip")
        .await
        .unwrap()
        .expect("Should find the existing file");
    assert_eq!(found.id, "11");
    assert_eq!(found.name, "2024-05.zip");
}

#[tokio::test]
async fn test_find_by_name_first_match_wins_whatever_its_kind() {
    let store = store_listing(vec![
        item("20", "2024-05.zip", ItemKind::Folder),
        item("21", "2024-05.zip", ItemKind::File),
    ]);
    let catalog = FolderCatalog::new(&store);

    let found = catalog.find_by_name("folder-1", "2024-05.zip").await.unwrap();
    assert_eq!(found.map(|f| f.id).as_deref(), Some("20"));
}

#[tokio::test]
async fn test_find_by_name_matches_folder_when_it_is_the_only_entry() {
    let store = store_listing(vec![item("20", "2024-05.zip", ItemKind::Folder)]);
    let catalog = FolderCatalog::new(&store);

    let found = catalog
        .find_by_name("folder-1", "2024-05.zip")
        .await
        .unwrap()
        .expect("Name match should resolve regardless of kind");
    assert_eq!(found.id, "20");
}

#[tokio::test]
async fn test_find_by_name_propagates_listing_failure() {
    let mut store = MockObjectStore::new();
    store.expect_list_folder_items().return_once(|_| {
        Err(Error::RemoteApi(RemoteApiError::with_status(404, "Not Found")))
    });
    let catalog = FolderCatalog::new(&store);

    match catalog.find_by_name("missing", "a.zip").await {
        Err(Error::RemoteApi(e)) => assert_eq!(e.status, Some(404)),
        other => panic!("Expected RemoteApi error, got: {other:?}"),
    }
}
