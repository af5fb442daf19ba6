//! Typed Metadata Store Adapter (spec component 4.8).
//!
//! One accessor method per operation the pipeline needs; no ad-hoc SQL
//! leaks into stage code. Diesel row structs are kept private to this module
//! and converted to the public domain models in [`crate::models`] at the
//! boundary, mirroring the teacher's `records_to_documents`-style conversion
//! functions in its document repository.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::error::MetaError;
use crate::models::{Document, DocumentStatus, PageBreak, PageDeletion, Redaction, Rotation};
use crate::repository::pool::DbPool;
use crate::repository::util::{parse_datetime, parse_datetime_opt};
use crate::schema::{documents, page_breaks, page_deletions, processing_audit, redactions, rotations};
use crate::with_conn;

#[derive(Debug, Clone, Queryable)]
struct DocumentRow {
    id: i64,
    offering_id: i64,
    loan_id: i64,
    path_fragment: String,
    status: i32,
    page_count: i32,
    is_redacted: bool,
    deleted: bool,
    doc_type_id: Option<i64>,
    document_date: Option<String>,
    comments: Option<String>,
    split_from_document_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl From<DocumentRow> for Document {
    fn from(r: DocumentRow) -> Self {
        Document {
            id: r.id,
            offering_id: r.offering_id,
            loan_id: r.loan_id,
            path_fragment: r.path_fragment,
            status: r.status,
            page_count: r.page_count,
            is_redacted: r.is_redacted,
            deleted: r.deleted,
            doc_type_id: r.doc_type_id,
            document_date: parse_datetime_opt(r.document_date),
            comments: r.comments,
            split_from_document_id: r.split_from_document_id,
            created_at: parse_datetime(&r.created_at),
            updated_at: parse_datetime(&r.updated_at),
        }
    }
}

#[derive(Debug, Clone, Queryable)]
struct RedactionRow {
    id: i64,
    document_id: i64,
    page_number: i32,
    page_x: f64,
    page_y: f64,
    page_width: f64,
    page_height: f64,
    draw_orientation: i32,
    text: Option<String>,
    applied: bool,
    date_applied: Option<String>,
}

impl From<RedactionRow> for Redaction {
    fn from(r: RedactionRow) -> Self {
        Redaction {
            id: r.id,
            document_id: r.document_id,
            page_number: r.page_number,
            page_x: r.page_x,
            page_y: r.page_y,
            page_width: r.page_width,
            page_height: r.page_height,
            draw_orientation: r.draw_orientation,
            text: r.text,
            applied: r.applied,
            date_applied: parse_datetime_opt(r.date_applied),
        }
    }
}

#[derive(Debug, Clone, Queryable)]
struct RotationRow {
    id: i64,
    document_id: i64,
    page_index: i32,
    angle: i32,
    #[diesel(column_name = applied)]
    _applied: bool,
}

impl From<RotationRow> for Rotation {
    fn from(r: RotationRow) -> Self {
        Rotation {
            id: r.id,
            document_id: r.document_id,
            page_index: r.page_index,
            angle: r.angle,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
struct DeletionRow {
    id: i64,
    document_id: i64,
    page_index: i32,
    #[diesel(column_name = applied)]
    _applied: bool,
}

impl From<DeletionRow> for PageDeletion {
    fn from(r: DeletionRow) -> Self {
        PageDeletion {
            id: r.id,
            document_id: r.document_id,
            page_index: r.page_index,
        }
    }
}

#[derive(Debug, Clone, Queryable)]
struct PageBreakRow {
    id: i64,
    document_id: i64,
    page_index: i32,
    doc_type_id: i64,
    doc_type_name: String,
    document_date: Option<String>,
    comments: Option<String>,
    result_document_id: Option<i64>,
    deleted: bool,
}

impl From<PageBreakRow> for PageBreak {
    fn from(r: PageBreakRow) -> Self {
        PageBreak {
            id: r.id,
            document_id: r.document_id,
            page_index: r.page_index,
            doc_type_id: r.doc_type_id,
            doc_type_name: r.doc_type_name,
            document_date: parse_datetime_opt(r.document_date),
            comments: r.comments,
            result_document_id: r.result_document_id,
            deleted: r.deleted,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = documents)]
pub(crate) struct NewDocumentRow {
    offering_id: i64,
    loan_id: i64,
    path_fragment: String,
    status: i32,
    page_count: i32,
    is_redacted: bool,
    deleted: bool,
    doc_type_id: Option<i64>,
    document_date: Option<String>,
    comments: Option<String>,
    split_from_document_id: Option<i64>,
    created_at: String,
    updated_at: String,
}

/// Data describing a split-derived document, passed to
/// [`MetadataStore::insert_derived_document`].
pub struct DerivedDocumentInput<'a> {
    pub source: &'a Document,
    pub doc_type_id: i64,
    pub page_count: i32,
    pub document_date: Option<chrono::DateTime<Utc>>,
    pub comments: String,
}

#[derive(Clone)]
pub struct MetadataStore {
    pool: DbPool,
}

impl MetadataStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn get_document(&self, id: i64) -> Result<Document, MetaError> {
        let row: DocumentRow = with_conn!(self.pool, conn => {
            documents::table.find(id).first(&mut conn).await
        })
        .map_err(|_| MetaError::DocumentNotFound(id))?;
        Ok(row.into())
    }

    pub async fn list_redactions_pending(&self, document_id: i64) -> Result<Vec<Redaction>, MetaError> {
        let rows: Vec<RedactionRow> = with_conn!(self.pool, conn => {
            redactions::table
                .filter(redactions::document_id.eq(document_id))
                .filter(redactions::applied.eq(false))
                .order((redactions::page_number.asc(), redactions::page_y.asc(), redactions::page_x.asc()))
                .load(&mut conn)
                .await
        })?;
        Ok(rows.into_iter().map(Redaction::from).collect())
    }

    pub async fn list_rotations(&self, document_id: i64) -> Result<Vec<Rotation>, MetaError> {
        let rows: Vec<RotationRow> = with_conn!(self.pool, conn => {
            rotations::table
                .filter(rotations::document_id.eq(document_id))
                .filter(rotations::applied.eq(false))
                .load(&mut conn)
                .await
        })?;
        Ok(rows.into_iter().map(Rotation::from).collect())
    }

    pub async fn list_deletions(&self, document_id: i64) -> Result<Vec<PageDeletion>, MetaError> {
        let rows: Vec<DeletionRow> = with_conn!(self.pool, conn => {
            page_deletions::table
                .filter(page_deletions::document_id.eq(document_id))
                .filter(page_deletions::applied.eq(false))
                .load(&mut conn)
                .await
        })?;
        Ok(rows.into_iter().map(PageDeletion::from).collect())
    }

    pub async fn list_breaks(&self, document_id: i64) -> Result<Vec<PageBreak>, MetaError> {
        let rows: Vec<PageBreakRow> = with_conn!(self.pool, conn => {
            page_breaks::table
                .filter(page_breaks::document_id.eq(document_id))
                .filter(page_breaks::deleted.eq(false))
                .order(page_breaks::page_index.asc())
                .load(&mut conn)
                .await
        })?;
        Ok(rows.into_iter().map(PageBreak::from).collect())
    }

    pub async fn mark_redaction_applied(&self, id: i64) -> Result<(), MetaError> {
        let now = Utc::now().to_rfc3339();
        with_conn!(self.pool, conn => {
            diesel::update(redactions::table.find(id))
                .set((redactions::applied.eq(true), redactions::date_applied.eq(now)))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn mark_rotation_applied(&self, id: i64) -> Result<(), MetaError> {
        with_conn!(self.pool, conn => {
            diesel::update(rotations::table.find(id))
                .set(rotations::applied.eq(true))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn mark_deletion_applied(&self, id: i64) -> Result<(), MetaError> {
        with_conn!(self.pool, conn => {
            diesel::update(page_deletions::table.find(id))
                .set(page_deletions::applied.eq(true))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn set_status(&self, document_id: i64, status: DocumentStatus) -> Result<(), MetaError> {
        let now = Utc::now().to_rfc3339();
        with_conn!(self.pool, conn => {
            diesel::update(documents::table.find(document_id))
                .set((documents::status.eq(status.code()), documents::updated_at.eq(now)))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn set_page_count(&self, document_id: i64, page_count: i32) -> Result<(), MetaError> {
        let now = Utc::now().to_rfc3339();
        with_conn!(self.pool, conn => {
            diesel::update(documents::table.find(document_id))
                .set((documents::page_count.eq(page_count), documents::updated_at.eq(now)))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn set_redacted(&self, document_id: i64, redacted: bool) -> Result<(), MetaError> {
        with_conn!(self.pool, conn => {
            diesel::update(documents::table.find(document_id))
                .set(documents::is_redacted.eq(redacted))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn set_doc_type_and_meta(
        &self,
        document_id: i64,
        doc_type_id: i64,
        document_date: Option<chrono::DateTime<Utc>>,
        comments: Option<String>,
    ) -> Result<(), MetaError> {
        let now = Utc::now().to_rfc3339();
        with_conn!(self.pool, conn => {
            diesel::update(documents::table.find(document_id))
                .set((
                    documents::doc_type_id.eq(Some(doc_type_id)),
                    documents::document_date.eq(document_date.map(|d| d.to_rfc3339())),
                    documents::comments.eq(comments),
                    documents::updated_at.eq(now),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn tombstone_document(&self, document_id: i64) -> Result<(), MetaError> {
        let now = Utc::now().to_rfc3339();
        with_conn!(self.pool, conn => {
            diesel::update(documents::table.find(document_id))
                .set((
                    documents::deleted.eq(true),
                    documents::page_count.eq(0),
                    documents::updated_at.eq(now),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn mark_break_processed(&self, break_id: i64, result_document_id: i64) -> Result<(), MetaError> {
        with_conn!(self.pool, conn => {
            diesel::update(page_breaks::table.find(break_id))
                .set((
                    page_breaks::result_document_id.eq(Some(result_document_id)),
                    page_breaks::deleted.eq(true),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub async fn record_audit(
        &self,
        document_id: i64,
        session_id: &str,
        from_status: Option<i32>,
        to_status: i32,
        detail: Option<String>,
    ) -> Result<(), MetaError> {
        let now = Utc::now().to_rfc3339();
        with_conn!(self.pool, conn => {
            diesel::insert_into(processing_audit::table)
                .values((
                    processing_audit::document_id.eq(document_id),
                    processing_audit::session_id.eq(session_id),
                    processing_audit::from_status.eq(from_status),
                    processing_audit::to_status.eq(to_status),
                    processing_audit::detail.eq(detail),
                    processing_audit::created_at.eq(now),
                ))
                .execute(&mut conn)
                .await
        })?;
        Ok(())
    }

    pub(crate) fn new_document_row_pub(input: &DerivedDocumentInput<'_>) -> NewDocumentRow {
        Self::new_document_row(input)
    }

    fn new_document_row(input: &DerivedDocumentInput<'_>) -> NewDocumentRow {
        let now = Utc::now().to_rfc3339();
        NewDocumentRow {
            offering_id: input.source.offering_id,
            loan_id: input.source.loan_id,
            path_fragment: input.source.path_fragment.clone(),
            status: DocumentStatus::Sync.code(),
            page_count: input.page_count,
            is_redacted: false,
            deleted: false,
            doc_type_id: Some(input.doc_type_id),
            document_date: input.document_date.map(|d| d.to_rfc3339()),
            comments: Some(input.comments.clone()),
            split_from_document_id: Some(input.source.id),
            created_at: now.clone(),
            updated_at: now,
        }
    }

    /// Inserts a derived document row. Not transactional by itself — callers
    /// performing a split must run this inside [`crate::repository::split_tx`].
    pub async fn insert_derived_document(&self, input: &DerivedDocumentInput<'_>) -> Result<i64, MetaError> {
        let new_row = Self::new_document_row(input);
        with_conn!(self.pool, conn => {
            let row: DocumentRow = diesel::insert_into(documents::table)
                .values(&new_row)
                .get_result(&mut conn)
                .await?;
            Ok::<i64, diesel::result::Error>(row.id)
        })
    }
}
