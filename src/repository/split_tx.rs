//! The single transactional scope the Split Stage commits through (spec
//! §4.6's atomicity requirement): every derived-document insert, the source
//! document's transition to `Obsolete`, the consumed page-break updates, and
//! the split-log rows land in one commit or none of them do.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::error::MetaError;
use crate::models::DocumentStatus;
use crate::repository::metadata_store::{DerivedDocumentInput, MetadataStore};
use crate::repository::pool::DbPool;
use crate::schema::{documents, page_breaks, split_log};

/// One produced document: its database id, and the page-break row it
/// consumed (`None` for the front section, which has no originating break).
pub struct SplitOutcome {
    pub derived_document_id: i64,
    pub source_break_id: Option<i64>,
}

impl MetadataStore {
    /// Commits every effect of a completed split in one transaction.
    pub async fn commit_split(
        &self,
        source_document_id: i64,
        session_id: &str,
        inputs: &[(DerivedDocumentInput<'_>, Option<i64>)],
    ) -> Result<Vec<SplitOutcome>, MetaError> {
        let now = Utc::now().to_rfc3339();

        match &self.pool {
            DbPool::Sqlite(pool) => {
                let mut conn = pool.get().await?;
                conn.transaction(|conn| {
                    async move {
                        let mut outcomes = Vec::with_capacity(inputs.len());
                        for (input, break_id) in inputs {
                            let new_row = MetadataStore::new_document_row_pub(input);
                            let row_id: i64 = diesel::insert_into(documents::table)
                                .values(&new_row)
                                .returning(documents::id)
                                .get_result(conn)
                                .await?;

                            if let Some(break_id) = break_id {
                                diesel::update(page_breaks::table.find(*break_id))
                                    .set((
                                        page_breaks::result_document_id.eq(Some(row_id)),
                                        page_breaks::deleted.eq(true),
                                    ))
                                    .execute(conn)
                                    .await?;
                            }

                            diesel::insert_into(split_log::table)
                                .values((
                                    split_log::source_document_id.eq(source_document_id),
                                    split_log::split_document_id.eq(row_id),
                                    split_log::split_by.eq(1i64),
                                    split_log::created_at.eq(now.clone()),
                                ))
                                .execute(conn)
                                .await?;

                            outcomes.push(SplitOutcome {
                                derived_document_id: row_id,
                                source_break_id: *break_id,
                            });
                        }

                        diesel::update(documents::table.find(source_document_id))
                            .set((
                                documents::status.eq(DocumentStatus::Obsolete.code()),
                                documents::updated_at.eq(now.clone()),
                            ))
                            .execute(conn)
                            .await?;

                        Ok(outcomes)
                    }
                    .scope_boxed()
                })
                .await
                .map_err(MetaError::Database)
            }
            #[cfg(feature = "postgres")]
            DbPool::Postgres(pool) => {
                let mut conn = pool.get().await.map_err(|e| MetaError::Pool(e.to_string()))?;
                conn.transaction(|conn| {
                    async move {
                        let mut outcomes = Vec::with_capacity(inputs.len());
                        for (input, break_id) in inputs {
                            let new_row = MetadataStore::new_document_row_pub(input);
                            let row_id: i64 = diesel::insert_into(documents::table)
                                .values(&new_row)
                                .returning(documents::id)
                                .get_result(conn)
                                .await?;

                            if let Some(break_id) = break_id {
                                diesel::update(page_breaks::table.find(*break_id))
                                    .set((
                                        page_breaks::result_document_id.eq(Some(row_id)),
                                        page_breaks::deleted.eq(true),
                                    ))
                                    .execute(conn)
                                    .await?;
                            }

                            diesel::insert_into(split_log::table)
                                .values((
                                    split_log::source_document_id.eq(source_document_id),
                                    split_log::split_document_id.eq(row_id),
                                    split_log::split_by.eq(1i64),
                                    split_log::created_at.eq(now.clone()),
                                ))
                                .execute(conn)
                                .await?;

                            outcomes.push(SplitOutcome {
                                derived_document_id: row_id,
                                source_break_id: *break_id,
                            });
                        }

                        diesel::update(documents::table.find(source_document_id))
                            .set((
                                documents::status.eq(DocumentStatus::Obsolete.code()),
                                documents::updated_at.eq(now.clone()),
                            ))
                            .execute(conn)
                            .await?;

                        Ok(outcomes)
                    }
                    .scope_boxed()
                })
                .await
                .map_err(MetaError::Database)
            }
        }
    }
}
