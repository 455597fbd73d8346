//! Workspace commands end to end: discovery, selection, and batch runs

mod common;

use common::{fixed_result, ScriptedClient};
use morph_common::types::{FileStatus, MigrationConfig, SAMPLE_FILE_PATH};
use morph_pipeline::discovery::GitHubProvider;
use morph_pipeline::{Workspace, WorkspaceError};
use serde_json::json;
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

async fn mock_repository(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/repos/acme/billing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"default_branch": "main"})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/billing/git/trees/main"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tree": [
                {"path": "b/Invoice.java", "type": "blob"},
                {"path": "a/Ledger.java", "type": "blob"}
            ]
        })))
        .mount(server)
        .await;
}

fn workspace(server: &MockServer, client: Arc<ScriptedClient>) -> Workspace {
    let github = GitHubProvider::new(Duration::from_secs(5))
        .unwrap()
        .with_api_base(&server.uri())
        .unwrap()
        .with_raw_base(&server.uri())
        .unwrap();

    Workspace::builder()
        .transformation_client(client)
        .repository_provider(Arc::new(github))
        .with_sample()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_repository_import_lazy_loads_first_file_only() {
    let server = MockServer::start().await;
    mock_repository(&server).await;

    Mock::given(method("GET"))
        .and(path("/acme/billing/main/a/Ledger.java"))
        .respond_with(ResponseTemplate::new(200).set_body_string("class Ledger {}"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/acme/billing/main/b/Invoice.java"))
        .respond_with(ResponseTemplate::new(200).set_body_string("class Invoice {}"))
        .expect(0)
        .mount(&server)
        .await;

    let workspace = workspace(&server, Arc::new(ScriptedClient::new()));
    let installed = workspace
        .import_repository("https://github.com/acme/billing")
        .await
        .unwrap();

    assert_eq!(installed, 2);
    let active = workspace.active_file().unwrap().unwrap();
    assert_eq!(active.path, "a/Ledger.java");
    assert_eq!(active.content.as_deref(), Some("class Ledger {}"));
    assert!(!workspace
        .registry()
        .get("b/Invoice.java")
        .unwrap()
        .unwrap()
        .has_content());
}

#[tokio::test]
async fn test_repository_batch_fetches_remaining_content() {
    let server = MockServer::start().await;
    mock_repository(&server).await;

    for (raw, body) in [
        ("/acme/billing/main/a/Ledger.java", "class Ledger {}"),
        ("/acme/billing/main/b/Invoice.java", "class Invoice {}"),
    ] {
        Mock::given(method("GET"))
            .and(path(raw))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = Arc::new(ScriptedClient::new());
    let workspace = workspace(&server, client.clone());
    workspace
        .import_repository("https://github.com/acme/billing")
        .await
        .unwrap();

    let summary = workspace.run_batch(&MigrationConfig::default()).await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(client.started(), vec!["a/Ledger.java", "b/Invoice.java"]);
    let invoice = workspace.registry().get("b/Invoice.java").unwrap().unwrap();
    assert_eq!(invoice.result(), Some(&fixed_result("b/Invoice.java")));
}

#[tokio::test]
async fn test_selection_fetch_failure_is_not_an_error() {
    let server = MockServer::start().await;
    mock_repository(&server).await;

    Mock::given(method("GET"))
        .and(path("/acme/billing/main/a/Ledger.java"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let workspace = workspace(&server, Arc::new(ScriptedClient::new()));
    workspace
        .import_repository("https://github.com/acme/billing")
        .await
        .unwrap();

    let selected = workspace.select_file("a/Ledger.java").await.unwrap();
    assert!(selected.content.is_none());
    assert_eq!(selected.status(), FileStatus::Pending);
}

#[tokio::test]
async fn test_failed_discovery_keeps_previous_files() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/private/git/trees/main"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let workspace = workspace(&server, Arc::new(ScriptedClient::new()));
    let err = workspace
        .import_repository("https://github.com/acme/private")
        .await
        .unwrap_err();

    assert!(matches!(err, WorkspaceError::Discovery(_)));
    assert_eq!(workspace.active_path().as_deref(), Some(SAMPLE_FILE_PATH));
    assert_eq!(workspace.snapshot().unwrap().len(), 1);
}

#[tokio::test]
async fn test_archive_import_then_batch() {
    let server = MockServer::start().await;
    let client = Arc::new(ScriptedClient::new().failing_on("src/Broken.java"));
    let workspace = workspace(&server, client.clone());

    let installed = workspace
        .import_archive(&zip_of(&[
            ("src/Broken.java", "class Broken {}"),
            ("src/App.java", "class App {}"),
            ("__MACOSX/src/._App.java", "fork"),
            ("src/.DS_Store", "junk"),
        ]))
        .unwrap();

    assert_eq!(installed, 2);
    assert_eq!(workspace.active_path().as_deref(), Some("src/App.java"));

    let summary = workspace.run_batch(&MigrationConfig::default()).await.unwrap();
    assert_eq!((summary.completed, summary.failed), (1, 1));
    assert!(!workspace.is_batch_running());

    let counts = workspace.registry().status_counts().unwrap();
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.failed, 1);
}

#[tokio::test]
async fn test_remote_archive_import() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/legacy.zip"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(zip_of(&[("src/App.java", "class App {}")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let workspace = workspace(&server, Arc::new(ScriptedClient::new()));
    let installed = workspace
        .import_archive_url(&format!("{}/downloads/legacy.zip", server.uri()))
        .await
        .unwrap();

    assert_eq!(installed, 1);
    let app = workspace.active_file().unwrap().unwrap();
    assert_eq!(app.path, "src/App.java");
    assert_eq!(app.content.as_deref(), Some("class App {}"));
}

#[tokio::test]
async fn test_remote_archive_download_failure_keeps_previous_files() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/downloads/missing.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let workspace = workspace(&server, Arc::new(ScriptedClient::new()));
    let err = workspace
        .import_archive_url(&format!("{}/downloads/missing.zip", server.uri()))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("failed with HTTP 404"));
    assert_eq!(workspace.active_path().as_deref(), Some(SAMPLE_FILE_PATH));
}

#[tokio::test]
async fn test_sample_workspace_migrates() {
    let server = MockServer::start().await;
    let workspace = workspace(&server, Arc::new(ScriptedClient::new()));

    let summary = workspace.run_batch(&MigrationConfig::default()).await.unwrap();

    assert_eq!(summary.completed, 1);
    let sample = workspace.active_file().unwrap().unwrap();
    assert_eq!(sample.result(), Some(&fixed_result(SAMPLE_FILE_PATH)));
}
