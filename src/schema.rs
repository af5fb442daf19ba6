// Diesel table definitions for the manipulation pipeline's metadata store.

diesel::table! {
    documents (id) {
        id -> BigInt,
        offering_id -> BigInt,
        loan_id -> BigInt,
        path_fragment -> Text,
        status -> Integer,
        page_count -> Integer,
        is_redacted -> Bool,
        deleted -> Bool,
        doc_type_id -> Nullable<BigInt>,
        document_date -> Nullable<Text>,
        comments -> Nullable<Text>,
        split_from_document_id -> Nullable<BigInt>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    redactions (id) {
        id -> BigInt,
        document_id -> BigInt,
        page_number -> Integer,
        page_x -> Double,
        page_y -> Double,
        page_width -> Double,
        page_height -> Double,
        draw_orientation -> Integer,
        text -> Nullable<Text>,
        applied -> Bool,
        date_applied -> Nullable<Text>,
    }
}

diesel::table! {
    rotations (id) {
        id -> BigInt,
        document_id -> BigInt,
        page_index -> Integer,
        angle -> Integer,
        applied -> Bool,
    }
}

diesel::table! {
    page_deletions (id) {
        id -> BigInt,
        document_id -> BigInt,
        page_index -> Integer,
        applied -> Bool,
    }
}

diesel::table! {
    page_breaks (id) {
        id -> BigInt,
        document_id -> BigInt,
        page_index -> Integer,
        doc_type_id -> BigInt,
        doc_type_name -> Text,
        document_date -> Nullable<Text>,
        comments -> Nullable<Text>,
        result_document_id -> Nullable<BigInt>,
        deleted -> Bool,
    }
}

diesel::table! {
    split_log (id) {
        id -> BigInt,
        source_document_id -> BigInt,
        split_document_id -> BigInt,
        split_by -> BigInt,
        created_at -> Text,
    }
}

diesel::table! {
    processing_audit (id) {
        id -> BigInt,
        document_id -> BigInt,
        session_id -> Text,
        from_status -> Nullable<Integer>,
        to_status -> Integer,
        detail -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::joinable!(redactions -> documents (document_id));
diesel::joinable!(rotations -> documents (document_id));
diesel::joinable!(page_deletions -> documents (document_id));
diesel::joinable!(page_breaks -> documents (document_id));
diesel::joinable!(split_log -> documents (source_document_id));

diesel::allow_tables_to_appear_in_same_query!(
    documents,
    redactions,
    rotations,
    page_deletions,
    page_breaks,
    split_log,
    processing_audit,
);
