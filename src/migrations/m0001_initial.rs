use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        .operation(
            CreateTable::new("documents")
                .add_field(Field::new("id", FieldType::Integer).primary_key())
                .add_field(Field::new("offering_id", FieldType::Integer).not_null())
                .add_field(Field::new("loan_id", FieldType::Integer).not_null())
                .add_field(Field::new("path_fragment", FieldType::Text).not_null())
                .add_field(Field::new("status", FieldType::Integer).not_null())
                .add_field(Field::new("page_count", FieldType::Integer).not_null().default("0"))
                .add_field(Field::new("is_redacted", FieldType::Boolean).not_null().default("0"))
                .add_field(Field::new("deleted", FieldType::Boolean).not_null().default("0"))
                .add_field(Field::new("doc_type_id", FieldType::Integer))
                .add_field(Field::new("document_date", FieldType::Text))
                .add_field(Field::new("comments", FieldType::Text))
                .add_field(Field::new("split_from_document_id", FieldType::Integer))
                .add_field(Field::new("created_at", FieldType::Text).not_null())
                .add_field(Field::new("updated_at", FieldType::Text).not_null()),
        )
        .operation(
            CreateTable::new("redactions")
                .add_field(Field::new("id", FieldType::Integer).primary_key())
                .add_field(Field::new("document_id", FieldType::Integer).not_null().references("documents", "id"))
                .add_field(Field::new("page_number", FieldType::Integer).not_null())
                .add_field(Field::new("page_x", FieldType::Float).not_null())
                .add_field(Field::new("page_y", FieldType::Float).not_null())
                .add_field(Field::new("page_width", FieldType::Float).not_null())
                .add_field(Field::new("page_height", FieldType::Float).not_null())
                .add_field(Field::new("draw_orientation", FieldType::Integer).not_null().default("0"))
                .add_field(Field::new("text", FieldType::Text))
                .add_field(Field::new("applied", FieldType::Boolean).not_null().default("0"))
                .add_field(Field::new("date_applied", FieldType::Text)),
        )
        .operation(
            CreateTable::new("rotations")
                .add_field(Field::new("id", FieldType::Integer).primary_key())
                .add_field(Field::new("document_id", FieldType::Integer).not_null().references("documents", "id"))
                .add_field(Field::new("page_index", FieldType::Integer).not_null())
                .add_field(Field::new("angle", FieldType::Integer).not_null())
                .add_field(Field::new("applied", FieldType::Boolean).not_null().default("0")),
        )
        .operation(
            CreateTable::new("page_deletions")
                .add_field(Field::new("id", FieldType::Integer).primary_key())
                .add_field(Field::new("document_id", FieldType::Integer).not_null().references("documents", "id"))
                .add_field(Field::new("page_index", FieldType::Integer).not_null())
                .add_field(Field::new("applied", FieldType::Boolean).not_null().default("0")),
        )
        .operation(
            CreateTable::new("page_breaks")
                .add_field(Field::new("id", FieldType::Integer).primary_key())
                .add_field(Field::new("document_id", FieldType::Integer).not_null().references("documents", "id"))
                .add_field(Field::new("page_index", FieldType::Integer).not_null())
                .add_field(Field::new("doc_type_id", FieldType::Integer).not_null())
                .add_field(Field::new("doc_type_name", FieldType::Text).not_null())
                .add_field(Field::new("document_date", FieldType::Text))
                .add_field(Field::new("comments", FieldType::Text))
                .add_field(Field::new("result_document_id", FieldType::Integer))
                .add_field(Field::new("deleted", FieldType::Boolean).not_null().default("0")),
        )
        .operation(
            CreateTable::new("split_log")
                .add_field(Field::new("id", FieldType::Integer).primary_key())
                .add_field(Field::new("source_document_id", FieldType::Integer).not_null().references("documents", "id"))
                .add_field(Field::new("split_document_id", FieldType::Integer).not_null().references("documents", "id"))
                .add_field(Field::new("split_by", FieldType::Integer).not_null().default("1"))
                .add_field(Field::new("created_at", FieldType::Text).not_null()),
        )
        .operation(
            CreateTable::new("processing_audit")
                .add_field(Field::new("id", FieldType::Integer).primary_key())
                .add_field(Field::new("document_id", FieldType::Integer).not_null().references("documents", "id"))
                .add_field(Field::new("session_id", FieldType::Text).not_null())
                .add_field(Field::new("from_status", FieldType::Integer))
                .add_field(Field::new("to_status", FieldType::Integer).not_null())
                .add_field(Field::new("detail", FieldType::Text))
                .add_field(Field::new("created_at", FieldType::Text).not_null()),
        )
        .operation(AddIndex::new("documents", Index::new("idx_documents_status").column("status")))
        .operation(AddIndex::new("documents", Index::new("idx_documents_loan").column("loan_id")))
        .operation(AddIndex::new("redactions", Index::new("idx_redactions_document").column("document_id")))
        .operation(AddIndex::new("redactions", Index::new("idx_redactions_pending").column("document_id").filter("applied = 0")))
        .operation(AddIndex::new("rotations", Index::new("idx_rotations_document").column("document_id")))
        .operation(AddIndex::new("page_deletions", Index::new("idx_deletions_document").column("document_id")))
        .operation(AddIndex::new("page_breaks", Index::new("idx_breaks_document").column("document_id")))
        .operation(AddIndex::new("page_breaks", Index::new("idx_breaks_pending").column("document_id").filter("deleted = 0")))
        .operation(AddIndex::new("split_log", Index::new("idx_split_log_source").column("source_document_id")))
        .operation(AddIndex::new("processing_audit", Index::new("idx_audit_document").column("document_id")))
}
