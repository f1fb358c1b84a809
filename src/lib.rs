mod config;
mod paths;
mod zstd_jsonl;

mod filters;
mod progress;
mod streaming;
mod util;
mod pipeline;
mod integrity;

mod table;
mod literal;
mod join;
mod combine;
mod structure;

pub use crate::config::{CorpusOptions, RecordKind, COMMENT_FIELDS, COMMUNITY_FIELD, POST_FIELDS};
pub use crate::pipeline::{CorpusETL, MASTER_DROP_COLUMNS};
pub use crate::paths::{discover_archives, discover_live_snapshots, discover_live_sources, ArchiveJob, LiveSnapshot};

// Archive streaming and per-line filtering.
pub use crate::zstd_jsonl::{check_archive, open_archive, ArchiveLines, IntegrityMode};
pub use crate::filters::{classify_line, is_valid_record, project, Allowlist, LineOutcome, SkipReason};
pub use crate::streaming::{open_append_csv, stream_lines, FilterStats};

// Tables and the consolidation stages.
pub use crate::table::{Cell, Table};
pub use crate::literal::{format_list, parse_list};
pub use crate::join::{attach_comments, join_comments, strip_type_prefix, CommentIndex, JoinStats};
pub use crate::combine::{
    community_counts, high_missing_columns, reconcile_columns, union_tables, CombineReport, NamedSource, Reconciled,
};
pub use crate::structure::{
    build_document, clean_text, normalize_comments, structure_table, truncate_chars, CommentShape, DOCUMENT_COLUMN,
};

pub use crate::progress::ProgressScope;
pub use crate::util::{default_communities, init_tracing_once, write_json_report};
