use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use box_archiver::upload::{BoxClient, Credentials, RemoteConfig, Subject};
use box_archiver_core::contract::{ItemKind, ObjectStore};
use box_archiver_core::Error;
use serde_json::json;
use sha1::{Digest, Sha1};
use std::fs;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn client(server: &MockServer) -> BoxClient {
    BoxClient::new(server.uri(), format!("{}/", server.uri()), "token")
}

fn local_file(name: &str, contents: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn file_collection(id: &str, name: &str) -> serde_json::Value {
    json!({
        "total_count": 1,
        "entries": [{ "type": "file", "id": id, "name": name }]
    })
}

fn sha_header(bytes: &[u8]) -> String {
    format!("sha={}", STANDARD.encode(Sha1::digest(bytes)))
}

#[tokio::test]
async fn test_list_folder_items_follows_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/folders/123/items"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "1000"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "entries": [
                { "type": "file", "id": "1", "name": "2024-04.zip" },
                { "type": "folder", "id": "2", "name": "old" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/folders/123/items"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 3,
            "entries": [{ "type": "web_link", "id": "3", "name": "docs" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let items = client(&server).list_folder_items("123").await.unwrap();

    let summary: Vec<(&str, ItemKind)> = items.iter().map(|i| (i.id.as_str(), i.kind)).collect();
    assert_eq!(
        summary,
        vec![
            ("1", ItemKind::File),
            ("2", ItemKind::Folder),
            ("3", ItemKind::WebLink)
        ]
    );
}

#[tokio::test]
async fn test_upload_sends_name_and_parent_attributes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/content"))
        .and(header("authorization", "Bearer token"))
        .and(body_string_contains(r#""parent":{"id":"123"}"#))
        .and(body_string_contains(r#""name":"2024-05.zip""#))
        .and(body_string_contains("zip-bytes"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(file_collection("555", "2024-05.zip")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = local_file("2024-05.zip", b"zip-bytes");
    let uploaded = client(&server).upload("123", &file).await.unwrap();

    assert_eq!(uploaded.id, "555");
    assert_eq!(uploaded.name, "2024-05.zip");
}

#[tokio::test]
async fn test_update_contents_posts_to_file_without_attributes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/77/content"))
        .and(body_string_contains("new-version"))
        .and(|req: &Request| !String::from_utf8_lossy(&req.body).contains("attributes"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_collection("77", "a.zip")))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = local_file("a.zip", b"new-version");
    let updated = client(&server).update_contents("77", &file).await.unwrap();

    assert_eq!(updated.id, "77");
}

#[tokio::test]
async fn test_box_error_body_maps_to_remote_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/content"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "type": "error",
            "status": 409,
            "code": "item_name_in_use",
            "message": "Item with the same name already exists",
            "context_info": { "conflicts": { "type": "file", "id": "12" } }
        })))
        .mount(&server)
        .await;

    let (_dir, file) = local_file("a.zip", b"x");
    let err = client(&server).upload("123", &file).await.unwrap_err();

    match err {
        Error::RemoteApi(e) => {
            assert_eq!(e.status, Some(409));
            assert_eq!(e.code.as_deref(), Some("item_name_in_use"));
            assert_eq!(e.message, "Item with the same name already exists");
            assert_eq!(
                e.context.unwrap()["conflicts"]["id"],
                json!("12"),
            );
        }
        other => panic!("Expected RemoteApi error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_non_json_error_keeps_raw_body_as_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/folders/123/items"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).list_folder_items("123").await.unwrap_err();

    match err {
        Error::RemoteApi(e) => {
            assert_eq!(e.status, Some(500));
            assert_eq!(e.code, None);
            assert_eq!(e.context, Some(json!("upstream exploded")));
        }
        other => panic!("Expected RemoteApi error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_chunked_runs_session_and_commits_with_whole_file_digest() {
    let server = MockServer::start().await;
    let contents = b"0123456789";

    Mock::given(method("POST"))
        .and(path("/files/upload_sessions"))
        .and(body_string_contains(r#""folder_id":"123""#))
        .and(body_string_contains(r#""file_size":10"#))
        .and(body_string_contains(r#""file_name":"big.zip""#))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "sess-1",
            "part_size": 4,
            "total_parts": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    for (index, (range, chunk)) in [
        ("bytes 0-3/10", &contents[0..4]),
        ("bytes 4-7/10", &contents[4..8]),
        ("bytes 8-9/10", &contents[8..10]),
    ]
    .into_iter()
    .enumerate()
    {
        let digest = sha_header(chunk);
        Mock::given(method("PUT"))
            .and(path("/files/upload_sessions/sess-1"))
            .and(header("content-range", range))
            .and(header("digest", digest.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "part": {
                    "part_id": format!("p{index}"),
                    "offset": index * 4,
                    "size": chunk.len(),
                    "sha1": "ignored"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let whole_digest = sha_header(contents);
    // First commit is still processing; the second one completes.
    Mock::given(method("POST"))
        .and(path("/files/upload_sessions/sess-1/commit"))
        .and(header("digest", whole_digest.as_str()))
        .respond_with(ResponseTemplate::new(202).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/upload_sessions/sess-1/commit"))
        .and(header("digest", whole_digest.as_str()))
        .and(body_string_contains(r#""part_id":"p0""#))
        .and(body_string_contains(r#""part_id":"p2""#))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_collection("999", "big.zip")))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = local_file("big.zip", contents);
    let uploaded = client(&server).upload_chunked("123", &file).await.unwrap();

    assert_eq!(uploaded.id, "999");
    assert_eq!(uploaded.name, "big.zip");
}

#[tokio::test]
async fn test_update_contents_chunked_opens_session_on_existing_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files/77/upload_sessions"))
        .and(body_string_contains(r#""file_size":3"#))
        .and(|req: &Request| !String::from_utf8_lossy(&req.body).contains("file_name"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "sess-2",
            "part_size": 8,
            "total_parts": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/files/upload_sessions/sess-2"))
        .and(header("content-range", "bytes 0-2/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "part": { "part_id": "only", "offset": 0, "size": 3, "sha1": "ignored" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/files/upload_sessions/sess-2/commit"))
        .respond_with(ResponseTemplate::new(201).set_body_json(file_collection("77", "a.zip")))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, file) = local_file("a.zip", b"abc");
    let updated = client(&server)
        .update_contents_chunked("77", &file)
        .await
        .unwrap();

    assert_eq!(updated.id, "77");
}

#[tokio::test]
async fn test_connect_exchanges_client_credentials_for_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=abc"))
        .and(body_string_contains("box_subject_type=enterprise"))
        .and(body_string_contains("box_subject_id=987"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "expires_in": 3600,
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/folders/0/items"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 0,
            "entries": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = RemoteConfig {
        api_base: server.uri(),
        upload_base: server.uri(),
        token_url: format!("{}/oauth2/token", server.uri()),
        credentials: Credentials::ClientCredentials {
            client_id: "abc".to_string(),
            client_secret: "s3cret".to_string(),
            subject: Subject::Enterprise("987".to_string()),
        },
    };
    let client = BoxClient::connect(&remote).await.unwrap();
    let items = client.list_folder_items("0").await.unwrap();

    assert!(items.is_empty());
}

#[tokio::test]
async fn test_connect_surfaces_rejected_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "The client credentials are invalid"
        })))
        .mount(&server)
        .await;

    let remote = RemoteConfig {
        api_base: server.uri(),
        upload_base: server.uri(),
        token_url: format!("{}/oauth2/token", server.uri()),
        credentials: Credentials::ClientCredentials {
            client_id: "abc".to_string(),
            client_secret: "wrong".to_string(),
            subject: Subject::User("42".to_string()),
        },
    };

    match BoxClient::connect(&remote).await {
        Err(Error::RemoteApi(e)) => assert_eq!(e.status, Some(400)),
        Err(other) => panic!("Expected RemoteApi error, got: {other:?}"),
        Ok(_) => panic!("Connect should fail on rejected credentials"),
    }
}

#[test]
fn test_credentials_debug_redacts_secrets() {
    let creds = Credentials::ClientCredentials {
        client_id: "abc".to_string(),
        client_secret: "s3cret".to_string(),
        subject: Subject::Enterprise("987".to_string()),
    };
    let token = Credentials::AccessToken("dev-token-value".to_string());

    assert!(!format!("{creds:?}").contains("s3cret"));
    assert!(!format!("{token:?}").contains("dev-token-value"));
}
