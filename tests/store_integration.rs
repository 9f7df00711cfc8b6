//! Local state integration tests
//!
//! Exercises the chat and knowledge stores against a real embedded
//! database in a temporary directory: seeding, reopening, the shared
//! database file, and the on-disk JSON shape the browser client also
//! reads.  Deletion guards are verified against a `wiremock` server so
//! the tests can prove no network traffic happens before a rejection.

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use qachat::config::ServerConfig;
use qachat::store::chat::DEFAULT_SESSION_TITLE;
use qachat::store::persistence::{ACTIVE_CHAT_KEY, KNOWLEDGE_KEY, SESSIONS_KEY};
use qachat::store::{
    ChatStore, DeleteOutcome, Document, KnowledgeStore, LocalStore, DEFAULT_KB_ID,
};
use qachat::ApiClient;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Open a `LocalStore` in a fresh temporary directory.
fn open_local() -> (LocalStore, TempDir) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let local = LocalStore::open_at(temp_dir.path()).expect("failed to open store");
    (local, temp_dir)
}

/// Construct an `ApiClient` pointing at the given wiremock server.
fn make_client(server: &MockServer) -> ApiClient {
    ApiClient::new(&ServerConfig {
        origin: server.uri(),
        timeout_seconds: 5,
    })
    .expect("failed to build api client")
}

/// Mount a create mock answering with the given base id and name.
async fn mount_create_kb(server: &MockServer, id: &str, name: &str) {
    Mock::given(method("POST"))
        .and(path("/api/knowledge_base/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "ok",
            "data": {"id": id, "name": name, "description": ""}
        })))
        .mount(server)
        .await;
}

/// Document record of the kind an upload produces.
fn sample_document(id: &str, name: &str) -> Document {
    Document {
        id: id.to_string(),
        name: name.to_string(),
        size: 1024,
        uploaded_at: "2024-04-24T20:30:00.000Z".to_string(),
        file_key: format!("{}.md", id),
        saved_name: format!("{}.md", id),
        path: format!("/api/uploads/{}.md", id),
        download_url: format!("http://localhost:8000/api/uploads/{}.md", id),
    }
}

// ---------------------------------------------------------------------------
// Seeding and reopening
// ---------------------------------------------------------------------------

/// A fresh database seeds one session and the default knowledge base.
#[test]
fn test_fresh_database_seeds_defaults() {
    let (local, _dir) = open_local();

    let chat = ChatStore::load(local.clone());
    assert_eq!(chat.sessions().len(), 1);
    assert_eq!(chat.sessions()[0].title, DEFAULT_SESSION_TITLE);
    assert_eq!(chat.active_id(), chat.sessions()[0].id);

    let knowledge = KnowledgeStore::load(local);
    assert_eq!(knowledge.bases().len(), 1);
    assert_eq!(knowledge.bases()[0].id, DEFAULT_KB_ID);
    assert_eq!(knowledge.active_id(), DEFAULT_KB_ID);
}

/// Sessions and the active id survive closing and reopening the store.
#[test]
fn test_chat_state_survives_reopen() {
    let temp_dir = TempDir::new().expect("failed to create tempdir");

    let newest_id = {
        let local = LocalStore::open_at(temp_dir.path()).expect("failed to open store");
        let mut store = ChatStore::load(local);
        store.create_session();
        store.create_session().id.clone()
    };

    let local = LocalStore::open_at(temp_dir.path()).expect("failed to reopen store");
    let store = ChatStore::load(local);

    // Three sessions: the seeded default plus two created, newest first.
    assert_eq!(store.sessions().len(), 3);
    assert_eq!(store.sessions()[0].id, newest_id);
    assert_eq!(store.active_id(), newest_id);
}

/// Documents and counts survive closing and reopening the store.
#[test]
fn test_knowledge_state_survives_reopen() {
    let temp_dir = TempDir::new().expect("failed to create tempdir");

    {
        let local = LocalStore::open_at(temp_dir.path()).expect("failed to open store");
        let mut store = KnowledgeStore::load(local);
        store
            .register_document(DEFAULT_KB_ID, sample_document("1714000000001", "handbook.md"))
            .expect("register failed");
        store
            .register_document(DEFAULT_KB_ID, sample_document("1714000000002", "faq.md"))
            .expect("register failed");
        store
            .remove_document(DEFAULT_KB_ID, "1714000000001")
            .expect("remove failed");
    }

    let local = LocalStore::open_at(temp_dir.path()).expect("failed to reopen store");
    let store = KnowledgeStore::load(local);

    let docs = store.documents_for(DEFAULT_KB_ID);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].name, "faq.md");
    assert_eq!(store.bases()[0].document_count, 1);
}

/// Both stores write through one database file.
#[test]
fn test_chat_and_knowledge_share_one_database() {
    let temp_dir = TempDir::new().expect("failed to create tempdir");

    {
        let local = LocalStore::open_at(temp_dir.path()).expect("failed to open store");
        let mut chat = ChatStore::load(local.clone());
        let mut knowledge = KnowledgeStore::load(local);

        chat.create_session();
        knowledge
            .register_document(DEFAULT_KB_ID, sample_document("1714000000001", "handbook.md"))
            .expect("register failed");
    }

    assert!(temp_dir.path().join("state.db").exists());

    let local = LocalStore::open_at(temp_dir.path()).expect("failed to reopen store");
    let chat = ChatStore::load(local.clone());
    let knowledge = KnowledgeStore::load(local);

    assert_eq!(chat.sessions().len(), 2);
    assert_eq!(knowledge.documents_for(DEFAULT_KB_ID).len(), 1);
}

// ---------------------------------------------------------------------------
// Browser client compatibility
// ---------------------------------------------------------------------------

/// State written by the browser client loads unchanged.
///
/// Verifies that camelCase records dumped from the web client's local
/// storage deserialize into both stores.
#[test]
fn test_browser_client_state_loads() {
    let (local, _dir) = open_local();

    local
        .save(
            SESSIONS_KEY,
            &json!([{
                "id": "1714000000000",
                "title": "Deployment questions",
                "messages": [
                    {
                        "id": "1714000000001",
                        "role": "user",
                        "content": "How do I deploy?",
                        "timestamp": "2024-04-24T20:26:40.000Z"
                    },
                    {
                        "id": "1714000000002",
                        "role": "assistant",
                        "content": "Use the staging pipeline first.",
                        "timestamp": "2024-04-24T20:26:41.000Z"
                    }
                ],
                "createdAt": "2024-04-24T20:26:40.000Z"
            }]),
        )
        .expect("save failed");
    local
        .save(ACTIVE_CHAT_KEY, &"1714000000000")
        .expect("save failed");
    local
        .save(
            KNOWLEDGE_KEY,
            &json!({
                "knowledgeBases": [
                    {
                        "id": "0",
                        "name": "Default Knowledge Base",
                        "description": "Built-in default knowledge base",
                        "documentCount": 1,
                        "createdAt": "2024-04-24T20:00:00.000Z"
                    },
                    {
                        "id": "5",
                        "name": "Research Papers",
                        "documentCount": 0,
                        "createdAt": "2024-04-24T20:10:00.000Z"
                    }
                ],
                "documents": {
                    "0": [{
                        "id": "1714000000003",
                        "name": "handbook.pdf",
                        "size": 2048,
                        "uploadedAt": "2024-04-24T20:30:00.000Z",
                        "fileKey": "abc123.pdf",
                        "savedName": "abc123.pdf",
                        "path": "/api/uploads/abc123.pdf",
                        "downloadUrl": "http://localhost:8000/api/uploads/abc123.pdf"
                    }]
                }
            }),
        )
        .expect("save failed");

    let chat = ChatStore::load(local.clone());
    assert_eq!(chat.active_id(), "1714000000000");
    let session = chat.active_session();
    assert_eq!(session.title, "Deployment questions");
    assert_eq!(session.messages.len(), 2);
    assert_eq!(session.messages[1].content, "Use the staging pipeline first.");

    let knowledge = KnowledgeStore::load(local);
    assert_eq!(knowledge.bases().len(), 2);
    let papers = knowledge.base("5").expect("base 5 missing");
    assert_eq!(papers.name, "Research Papers");
    assert_eq!(papers.description, "");
    let docs = knowledge.documents_for("0");
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].saved_name, "abc123.pdf");
}

/// State written by this client keeps the browser's field names.
///
/// Verifies the raw JSON on disk uses camelCase keys, never the Rust
/// field names, so the web client could pick the file up.
#[test]
fn test_state_written_in_browser_shape() {
    let (local, _dir) = open_local();

    let mut chat = ChatStore::load(local.clone());
    chat.create_session();
    let mut knowledge = KnowledgeStore::load(local.clone());
    knowledge
        .register_document(DEFAULT_KB_ID, sample_document("1714000000001", "handbook.md"))
        .expect("register failed");

    let sessions: serde_json::Value = local
        .load(SESSIONS_KEY)
        .expect("load failed")
        .expect("sessions missing");
    let first = &sessions[0];
    assert!(first.get("createdAt").is_some());
    assert!(first.get("created_at").is_none());

    let data: serde_json::Value = local
        .load(KNOWLEDGE_KEY)
        .expect("load failed")
        .expect("knowledge missing");
    let base = &data["knowledgeBases"][0];
    assert!(base.get("documentCount").is_some());
    assert!(base.get("document_count").is_none());
    let doc = &data["documents"]["0"][0];
    assert!(doc.get("uploadedAt").is_some());
    assert!(doc.get("savedName").is_some());
}

// ---------------------------------------------------------------------------
// Active id invariants
// ---------------------------------------------------------------------------

/// The active session id points at a real session through any deletes.
#[test]
fn test_active_session_tracks_deletes() {
    let (local, _dir) = open_local();
    let mut store = ChatStore::load(local);

    let default_id = store.sessions()[0].id.clone();
    let first_id = store.create_session().id.clone();
    let second_id = store.create_session().id.clone();

    // Deleting the active session promotes the first remaining one.
    store.delete_session(&second_id).expect("delete failed");
    assert_eq!(store.active_id(), first_id);

    // Deleting an inactive session leaves the active one alone.
    store.delete_session(&default_id).expect("delete failed");
    assert_eq!(store.active_id(), first_id);

    // Deleting the last session reseeds a fresh default.
    store.delete_session(&first_id).expect("delete failed");
    assert_eq!(store.sessions().len(), 1);
    assert_eq!(store.sessions()[0].title, DEFAULT_SESSION_TITLE);
    assert_eq!(store.active_id(), store.sessions()[0].id);
}

/// A stale persisted active id falls back to a real session.
#[test]
fn test_stale_active_id_falls_back() {
    let (local, _dir) = open_local();

    {
        let mut store = ChatStore::load(local.clone());
        store.create_session();
    }
    local
        .save(ACTIVE_CHAT_KEY, &"9999999999999")
        .expect("save failed");

    let store = ChatStore::load(local);
    let active = store.active_id().to_string();
    assert!(store.sessions().iter().any(|s| s.id == active));
}

// ---------------------------------------------------------------------------
// Knowledge base deletion guards
// ---------------------------------------------------------------------------

/// The default base is never deleted, and the server never hears of it.
///
/// Verifies the guard fires before the confirmation prompt and before
/// any network traffic: the mock expects zero requests.
#[tokio::test]
async fn test_default_base_delete_rejected_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (local, _dir) = open_local();
    let mut store = KnowledgeStore::load(local);
    let client = make_client(&server);

    let result = store
        .delete_knowledge_base(&client, DEFAULT_KB_ID, || {
            panic!("confirm must not run for a guarded delete")
        })
        .await;

    let err = result.expect_err("expected an error");
    assert!(err.to_string().contains("cannot be deleted"), "got: {}", err);
    server.verify().await;
}

/// A base that still holds documents is rejected before the prompt.
#[tokio::test]
async fn test_delete_with_documents_rejected_without_network() {
    let server = MockServer::start().await;
    mount_create_kb(&server, "7", "archive").await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (local, _dir) = open_local();
    let mut store = KnowledgeStore::load(local);
    let client = make_client(&server);

    store
        .create_knowledge_base(&client, "archive", "")
        .await
        .expect("create failed");
    store
        .register_document("7", sample_document("1714000000001", "handbook.md"))
        .expect("register failed");

    let result = store
        .delete_knowledge_base(&client, "7", || {
            panic!("confirm must not run for a guarded delete")
        })
        .await;

    let err = result.expect_err("expected an error");
    assert!(err.to_string().contains("remove them first"), "got: {}", err);
    server.verify().await;
}

/// A declined confirmation is a quiet no-op.
#[tokio::test]
async fn test_declined_delete_changes_nothing() {
    let server = MockServer::start().await;
    mount_create_kb(&server, "7", "archive").await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (local, _dir) = open_local();
    let mut store = KnowledgeStore::load(local);
    let client = make_client(&server);

    store
        .create_knowledge_base(&client, "archive", "")
        .await
        .expect("create failed");

    let outcome = store
        .delete_knowledge_base(&client, "7", || false)
        .await
        .expect("delete errored");

    assert_eq!(outcome, DeleteOutcome::Cancelled);
    assert!(store.base("7").is_some());
    server.verify().await;
}

/// A confirmed delete of an empty base removes it and reassigns activity.
///
/// Verifies the full path: server acknowledgement, local removal, the
/// active base handed back to the default, and the removal persisted.
#[tokio::test]
async fn test_confirmed_delete_removes_base_and_reassigns_active() {
    let server = MockServer::start().await;
    mount_create_kb(&server, "7", "archive").await;
    Mock::given(method("DELETE"))
        .and(path("/api/knowledge_base/delete/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200,
            "message": "deleted"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create tempdir");
    {
        let local = LocalStore::open_at(temp_dir.path()).expect("failed to open store");
        let mut store = KnowledgeStore::load(local);
        let client = make_client(&server);

        store
            .create_knowledge_base(&client, "archive", "")
            .await
            .expect("create failed");
        store.set_active("7").expect("set_active failed");

        let outcome = store
            .delete_knowledge_base(&client, "7", || true)
            .await
            .expect("delete errored");

        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(store.base("7").is_none());
        assert_eq!(store.active_id(), DEFAULT_KB_ID);
    }
    server.verify().await;

    let local = LocalStore::open_at(temp_dir.path()).expect("failed to reopen store");
    let store = KnowledgeStore::load(local);
    assert_eq!(store.bases().len(), 1);
    assert_eq!(store.bases()[0].id, DEFAULT_KB_ID);
}
