//! End-to-end pipeline tests against a disposable SQLite-backed metadata
//! store (same `cetane` migrations as production), an in-memory object
//! store, and a deterministic fake PDF engine.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use pdf_workman::error::{EngineError, ObjectStoreError};
use pdf_workman::invocation::{BookmarkInput, InvocationPayload, Operation};
use pdf_workman::models::DocumentStatus;
use pdf_workman::object_store::{object_key, ObjectStore, Stage};
use pdf_workman::pdf_engine::{PdfEngine, RedactionBox};
use pdf_workman::progress::ProgressReporter;
use pdf_workman::repository::{DbPool, MetadataStore};
use pdf_workman::Pipeline;

/// A PDF is represented as one byte per page. `0` is untouched, `0xFF`
/// marks a page rasterized by a redaction, anything else records an
/// applied rotation angle divided by 90.
struct FakePdfEngine;

#[async_trait]
impl PdfEngine for FakePdfEngine {
    async fn page_count(&self, bytes: &[u8]) -> Result<usize, EngineError> {
        Ok(bytes.len())
    }

    async fn page_dimensions(&self, bytes: &[u8]) -> Result<Vec<(f64, f64)>, EngineError> {
        Ok(vec![(612.0, 792.0); bytes.len()])
    }

    async fn set_rotation(&self, mut bytes: Vec<u8>, page_index: usize, angle: i32) -> Result<Vec<u8>, EngineError> {
        bytes[page_index] = (angle.rem_euclid(360) / 90) as u8 + 1;
        Ok(bytes)
    }

    async fn delete_pages(&self, mut bytes: Vec<u8>, descending_indices: &[usize]) -> Result<Vec<u8>, EngineError> {
        for &index in descending_indices {
            bytes.remove(index);
        }
        Ok(bytes)
    }

    async fn extract_range(&self, bytes: &[u8], start: usize, end: usize) -> Result<Vec<u8>, EngineError> {
        Ok(bytes[start..end].to_vec())
    }

    async fn redact_and_rasterize(
        &self,
        mut bytes: Vec<u8>,
        boxes_by_page: BTreeMap<usize, Vec<RedactionBox>>,
    ) -> Result<(Vec<u8>, Vec<usize>), EngineError> {
        let mut rasterized = Vec::new();
        for (&page_index, boxes) in &boxes_by_page {
            if !boxes.is_empty() {
                bytes[page_index] = 0xFF;
                rasterized.push(page_index);
            }
        }
        Ok((bytes, rasterized))
    }
}

#[derive(Default, Clone)]
struct FakeObjectStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl FakeObjectStore {
    fn seed(&self, key: &str, bytes: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
    }

    fn get_sync(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<(), ObjectStoreError> {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(())
    }

    async fn head(&self, key: &str) -> Result<bool, ObjectStoreError> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), ObjectStoreError> {
        let bytes = self.get(src).await?;
        self.put(dst, bytes, "application/pdf").await
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

const PATH_FRAGMENT: &str = "2024/01";

struct Fixture {
    _dir: tempfile::TempDir,
    db_path: std::path::PathBuf,
}

impl Fixture {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("test.sqlite3");
        pdf_workman::repository::migrations::run_sqlite_migrations(db_path.to_str().unwrap())
            .await
            .expect("migrations");
        Self { _dir: dir, db_path }
    }

    fn conn(&self) -> rusqlite::Connection {
        rusqlite::Connection::open(&self.db_path).expect("open sqlite")
    }

    fn store(&self) -> MetadataStore {
        MetadataStore::new(DbPool::sqlite_from_path(&self.db_path))
    }

    fn insert_document(&self, id: i64, page_count: i32, status: i32, doc_type_id: Option<i64>) {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO documents (id, offering_id, loan_id, path_fragment, status, page_count,
                is_redacted, deleted, doc_type_id, document_date, comments, split_from_document_id,
                created_at, updated_at)
             VALUES (?1, 1, 1, ?2, ?3, ?4, 0, 0, ?5, NULL, NULL, NULL, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
            rusqlite::params![id, PATH_FRAGMENT, status, page_count, doc_type_id],
        )
        .expect("insert document");
    }

    fn insert_redaction(&self, id: i64, document_id: i64, page_number: i32, x: f64, y: f64, w: f64, h: f64) {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO redactions (id, document_id, page_number, page_x, page_y, page_width, page_height,
                draw_orientation, text, applied, date_applied)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 'secret', 0, NULL)",
            rusqlite::params![id, document_id, page_number, x, y, w, h],
        )
        .expect("insert redaction");
    }

    fn insert_deletion(&self, id: i64, document_id: i64, page_index: i32) {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO page_deletions (id, document_id, page_index, applied) VALUES (?1, ?2, ?3, 0)",
            rusqlite::params![id, document_id, page_index],
        )
        .expect("insert deletion");
    }

    fn insert_break(&self, id: i64, document_id: i64, page_index: i32, doc_type_id: i64, doc_type_name: &str) {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO page_breaks (id, document_id, page_index, doc_type_id, doc_type_name,
                document_date, comments, result_document_id, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL, NULL, NULL, 0)",
            rusqlite::params![id, document_id, page_index, doc_type_id, doc_type_name],
        )
        .expect("insert break");
    }

    fn document_status(&self, id: i64) -> i32 {
        self.conn()
            .query_row("SELECT status FROM documents WHERE id = ?1", [id], |r| r.get(0))
            .expect("read status")
    }

    fn document_deleted(&self, id: i64) -> bool {
        self.conn()
            .query_row("SELECT deleted FROM documents WHERE id = ?1", [id], |r| r.get(0))
            .expect("read deleted")
    }

    fn document_doc_type(&self, id: i64) -> Option<i64> {
        self.conn()
            .query_row("SELECT doc_type_id FROM documents WHERE id = ?1", [id], |r| r.get(0))
            .expect("read doc_type_id")
    }

    fn derived_document_ids(&self, source_id: i64) -> Vec<i64> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, page_count FROM documents WHERE split_from_document_id = ?1 ORDER BY id")
            .unwrap();
        stmt.query_map([source_id], |r| r.get(0))
            .unwrap()
            .collect::<Result<Vec<i64>, _>>()
            .unwrap()
    }

    fn split_log_count(&self, source_id: i64) -> i64 {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM split_log WHERE source_document_id = ?1",
                [source_id],
                |r| r.get(0),
            )
            .unwrap()
    }
}

fn payload(image_id: i64, operation: Operation, timeout: Option<u64>) -> InvocationPayload {
    InvocationPayload {
        operation,
        image_id,
        session_id: Some(format!("session-{image_id}")),
        timeout,
        progress_callback_url: None,
        bookmarks: Vec::new(),
        metadata: None,
    }
}

fn build_pipeline(fixture: &Fixture, objects: FakeObjectStore) -> Pipeline {
    Pipeline::new(
        fixture.store(),
        Box::new(objects),
        Box::new(FakePdfEngine),
        ProgressReporter::disabled(),
        Duration::from_secs(14 * 60),
    )
}

#[tokio::test]
async fn no_op_leaves_object_store_untouched() {
    let fixture = Fixture::new().await;
    fixture.insert_document(1, 5, DocumentStatus::NeedsProcessing.code(), None);

    let objects = FakeObjectStore::default();
    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 1);
    objects.seed(&processing_key, vec![0u8; 5]);

    let pipeline = build_pipeline(&fixture, objects.clone());
    let response = pipeline.run(payload(1, Operation::ProcessManipulations, None)).await;

    assert_eq!(response.status_code, 200);
    assert!(response.body.success);
    assert_eq!(fixture.document_status(1), DocumentStatus::NeedsProcessing.code());

    let backup_key = object_key(Stage::RedactOriginal, PATH_FRAGMENT, 1);
    assert!(!objects.contains(&backup_key));
    assert_eq!(objects.get_sync(&processing_key), Some(vec![0u8; 5]));
}

#[tokio::test]
async fn pure_redaction_rasterizes_target_page_only() {
    let fixture = Fixture::new().await;
    fixture.insert_document(2, 3, DocumentStatus::NeedsProcessing.code(), None);
    fixture.insert_redaction(1, 2, 1, 50.0, 50.0, 100.0, 20.0);

    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 2);
    let backup_key = object_key(Stage::RedactOriginal, PATH_FRAGMENT, 2);

    let objects = FakeObjectStore::default();
    objects.seed(&processing_key, vec![0u8; 3]);
    let pipeline = build_pipeline(&fixture, objects.clone());

    let response = pipeline.run(payload(2, Operation::ProcessManipulations, None)).await;
    assert!(response.body.success, "{:?}", response.body.error);
    assert_eq!(fixture.document_status(2), DocumentStatus::NeedsProcessing.code());

    assert_eq!(objects.get_sync(&backup_key), Some(vec![0u8; 3]));
    assert_eq!(objects.get_sync(&processing_key), Some(vec![0u8, 0xFF, 0u8]));

    let conn = fixture.conn();
    let applied: i32 = conn
        .query_row("SELECT applied FROM redactions WHERE id = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn second_run_with_no_pending_edits_is_a_noop() {
    let fixture = Fixture::new().await;
    fixture.insert_document(2, 3, DocumentStatus::NeedsProcessing.code(), None);
    fixture.insert_redaction(1, 2, 1, 50.0, 50.0, 100.0, 20.0);

    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 2);
    let backup_key = object_key(Stage::RedactOriginal, PATH_FRAGMENT, 2);

    let objects = FakeObjectStore::default();
    objects.seed(&processing_key, vec![0u8; 3]);

    let first_run = build_pipeline(&fixture, objects.clone())
        .run(payload(2, Operation::ProcessManipulations, None))
        .await;
    assert!(first_run.body.success, "{:?}", first_run.body.error);

    let status_after_first = fixture.document_status(2);
    let processing_after_first = objects.get_sync(&processing_key);
    let backup_after_first = objects.get_sync(&backup_key);
    assert_eq!(processing_after_first, Some(vec![0u8, 0xFF, 0u8]));

    // No new pending edits exist; the redaction row is already `applied = 1`
    // and excluded from the loader's pending query, so this second run
    // should take the same no-op path as `no_op_leaves_object_store_untouched`.
    let second_run = build_pipeline(&fixture, objects.clone())
        .run(payload(2, Operation::ProcessManipulations, None))
        .await;
    assert!(second_run.body.success, "{:?}", second_run.body.error);

    assert_eq!(fixture.document_status(2), status_after_first);
    assert_eq!(objects.get_sync(&processing_key), processing_after_first);
    assert_eq!(objects.get_sync(&backup_key), backup_after_first);
}

#[tokio::test]
async fn delete_all_pages_tombstones_document() {
    let fixture = Fixture::new().await;
    fixture.insert_document(3, 2, DocumentStatus::NeedsProcessing.code(), None);
    fixture.insert_deletion(1, 3, 0);
    fixture.insert_deletion(2, 3, 1);

    let objects = FakeObjectStore::default();
    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 3);
    objects.seed(&processing_key, vec![0u8; 2]);

    let pipeline = build_pipeline(&fixture, objects);
    let response = pipeline.run(payload(3, Operation::ProcessManipulations, None)).await;

    assert!(response.body.success, "{:?}", response.body.error);
    assert!(fixture.document_deleted(3));
    assert_eq!(
        response.body.result.as_ref().unwrap()["documentDeleted"],
        serde_json::json!(true)
    );
}

#[tokio::test]
async fn rename_only_split_retypes_source_in_place() {
    let fixture = Fixture::new().await;
    fixture.insert_document(4, 4, DocumentStatus::NeedsProcessing.code(), Some(1));
    fixture.insert_break(1, 4, 0, 42, "Loan Agreement");

    let objects = FakeObjectStore::default();
    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 4);
    objects.seed(&processing_key, vec![0u8; 4]);

    let pipeline = build_pipeline(&fixture, objects);
    let response = pipeline.run(payload(4, Operation::ProcessManipulations, None)).await;

    assert!(response.body.success, "{:?}", response.body.error);
    assert_eq!(fixture.document_doc_type(4), Some(42));
    assert!(fixture.derived_document_ids(4).is_empty());
    assert_eq!(fixture.split_log_count(4), 0);
    assert_eq!(fixture.document_status(4), DocumentStatus::NeedsProcessing.code());
}

#[tokio::test]
async fn full_split_with_front_section_partitions_pages() {
    let fixture = Fixture::new().await;
    fixture.insert_document(5, 10, DocumentStatus::NeedsProcessing.code(), Some(1));
    fixture.insert_break(1, 5, 3, 10, "Note A");
    fixture.insert_break(2, 5, 7, 11, "Note B");

    let objects = FakeObjectStore::default();
    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 5);
    objects.seed(&processing_key, vec![0u8; 10]);

    let pipeline = build_pipeline(&fixture, objects);
    let response = pipeline.run(payload(5, Operation::ProcessManipulations, None)).await;

    assert!(response.body.success, "{:?}", response.body.error);
    assert_eq!(fixture.document_status(5), DocumentStatus::Obsolete.code());

    let derived = fixture.derived_document_ids(5);
    assert_eq!(derived.len(), 3);
    assert_eq!(fixture.split_log_count(5), 3);

    let conn = fixture.conn();
    let mut page_counts: Vec<i32> = derived
        .iter()
        .map(|id| {
            conn.query_row("SELECT page_count FROM documents WHERE id = ?1", [id], |r| r.get(0))
                .unwrap()
        })
        .collect();
    page_counts.sort();
    assert_eq!(page_counts, vec![3, 3, 4]);
}

#[tokio::test]
async fn deadline_exceeded_resets_status_without_consuming_breaks() {
    let fixture = Fixture::new().await;
    fixture.insert_document(6, 100, DocumentStatus::NeedsProcessing.code(), None);
    fixture.insert_redaction(1, 6, 0, 10.0, 10.0, 50.0, 50.0);

    let objects = FakeObjectStore::default();
    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 6);
    objects.seed(&processing_key, vec![0u8; 100]);

    let pipeline = build_pipeline(&fixture, objects);
    let response = pipeline.run(payload(6, Operation::ProcessManipulations, Some(1))).await;

    assert!(!response.body.success);
    assert!(response.body.error.as_ref().unwrap().to_lowercase().contains("deadline"));
    assert_eq!(fixture.document_status(6), DocumentStatus::NeedsImageManipulation.code());
}

#[tokio::test]
async fn health_check_reports_success_without_touching_any_document() {
    let fixture = Fixture::new().await;
    let pipeline = build_pipeline(&fixture, FakeObjectStore::default());
    let response = pipeline.run(payload(999, Operation::HealthCheck, None)).await;
    assert!(response.body.success);
    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn split_document_operation_accepts_payload_supplied_bookmarks() {
    let fixture = Fixture::new().await;
    fixture.insert_document(7, 6, DocumentStatus::NeedsProcessing.code(), Some(1));

    let objects = FakeObjectStore::default();
    let processing_key = object_key(Stage::IProcessing, PATH_FRAGMENT, 7);
    objects.seed(&processing_key, vec![0u8; 6]);

    let pipeline = build_pipeline(&fixture, objects);
    let mut request = payload(7, Operation::SplitDocument, None);
    request.bookmarks = vec![BookmarkInput {
        bookmark_id: 1,
        page_index: 3,
        document_type_id: 99,
        document_type_name: "Appendix".to_string(),
        document_date: None,
        comments: None,
    }];

    let response = pipeline.run(request).await;
    assert!(response.body.success, "{:?}", response.body.error);
    assert_eq!(fixture.document_status(7), DocumentStatus::Obsolete.code());
    assert_eq!(fixture.derived_document_ids(7).len(), 2);
}
