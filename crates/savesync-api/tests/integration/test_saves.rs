//! Upload, download, delete and list against a mocked server

use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use savesync_core::domain::CredentialRejected;
use savesync_core::ports::{ITransferGateway, UploadFile};

use crate::common::{bearer, resource, setup_anonymous_mock, setup_api_mock};

#[tokio::test]
async fn test_upload_sends_multipart_with_relative_names() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/saves/upload"))
        .and(header("authorization", bearer().as_str()))
        .and(body_string_contains("name=\"gameId\""))
        .and(body_string_contains("chess"))
        .and(body_string_contains("filename=\"slot1/board.pgn\""))
        .and(body_string_contains("1. e4 e5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "uploaded": 1,
            "keys": ["1/chess/slot1/board.pgn"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    client
        .upload(
            &resource("chess"),
            vec![UploadFile::new("slot1/board.pgn", b"1. e4 e5".to_vec())],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_unauthorized_fails() {
    let (server, client) = setup_anonymous_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/saves/upload"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "No session" })))
        .mount(&server)
        .await;

    let err = client
        .upload(&resource("chess"), vec![UploadFile::new("a.sav", vec![1])])
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("No session"));
    assert!(CredentialRejected::in_chain(&err));
}

#[tokio::test]
async fn test_download_returns_archive_bytes() {
    let (server, client) = setup_api_mock().await;
    let archive = vec![0x50, 0x4b, 0x03, 0x04, 0x00];

    Mock::given(method("GET"))
        .and(path("/api/saves/download/chess"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/zip")
                .set_body_bytes(archive.clone()),
        )
        .mount(&server)
        .await;

    let bytes = client.download(&resource("chess")).await.unwrap();
    assert_eq!(bytes, archive);
}

#[tokio::test]
async fn test_download_missing_is_error() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/saves/download/empty-game"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "No saves found" })))
        .mount(&server)
        .await;

    let err = client.download(&resource("empty-game")).await.unwrap_err();
    assert!(format!("{err:#}").contains("No saves found"));
}

#[tokio::test]
async fn test_delete_resource() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/api/saves/chess"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true, "deleted": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    client.delete(&resource("chess")).await.unwrap();
}

#[tokio::test]
async fn test_list_saves_filtered() {
    let (server, client) = setup_api_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/saves/list"))
        .and(query_param("gameId", "chess"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "saves": [
                { "key": "1/chess/board.pgn", "gameId": "chess", "fileName": "board.pgn" },
                { "key": "1/chess/opts.ini", "gameId": "chess", "fileName": "opts.ini" }
            ]
        })))
        .mount(&server)
        .await;

    let saves = client.list_saves(Some(&resource("chess"))).await.unwrap();
    assert_eq!(saves.len(), 2);
    assert_eq!(saves[0].file_name, "board.pgn");
    assert_eq!(saves[1].game_id, "chess");
}
