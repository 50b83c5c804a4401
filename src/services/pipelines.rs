//! Prescribed operation pipelines (spec §4.3): fixed, canonical ordered
//! lists used to expand a high-level intent into dispatchable units.

use crate::domain::operation;

pub const CREATE_NEW_REPOSITORY: &[&str] = &[operation::CLONE_REPOSITORY];

pub const SYNC_REPOSITORY: &[&str] = &[operation::SYNC_REPOSITORY];

/// The 15-step sequence that scans and fully indexes one commit.
pub const SCAN_AND_INDEX_COMMIT: &[&str] = &[
    operation::SCAN_COMMIT,
    operation::EXTRACT_SNIPPETS,
    operation::EXTRACT_EXAMPLES,
    operation::CREATE_BM25_INDEX,
    operation::CREATE_CODE_EMBEDDINGS,
    operation::CREATE_EXAMPLE_CODE_EMBEDDINGS,
    operation::CREATE_SUMMARY_ENRICHMENT,
    operation::CREATE_EXAMPLE_SUMMARY,
    operation::CREATE_SUMMARY_EMBEDDINGS,
    operation::CREATE_EXAMPLE_SUMMARY_EMBEDDINGS,
    operation::CREATE_ARCHITECTURE_ENRICHMENT,
    operation::CREATE_PUBLIC_API_DOCS,
    operation::CREATE_COMMIT_DESCRIPTION,
    operation::CREATE_DATABASE_SCHEMA,
    operation::CREATE_COOKBOOK,
];

/// `ScanAndIndexCommit` with the leading `scan_commit` and `extract_examples`
/// steps removed — used when the commit has already been scanned.
pub const INDEX_COMMIT: &[&str] = &[
    operation::EXTRACT_SNIPPETS,
    operation::CREATE_BM25_INDEX,
    operation::CREATE_CODE_EMBEDDINGS,
    operation::CREATE_EXAMPLE_CODE_EMBEDDINGS,
    operation::CREATE_SUMMARY_ENRICHMENT,
    operation::CREATE_EXAMPLE_SUMMARY,
    operation::CREATE_SUMMARY_EMBEDDINGS,
    operation::CREATE_EXAMPLE_SUMMARY_EMBEDDINGS,
    operation::CREATE_ARCHITECTURE_ENRICHMENT,
    operation::CREATE_PUBLIC_API_DOCS,
    operation::CREATE_COMMIT_DESCRIPTION,
    operation::CREATE_DATABASE_SCHEMA,
    operation::CREATE_COOKBOOK,
];
