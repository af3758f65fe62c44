//! Index engine services

pub mod descriptor_builder;
pub mod file_source;
pub mod filename_parser;
pub mod pattern_compiler;
pub mod reconciler;
pub mod recordings_index;

pub use descriptor_builder::{reparse_from_filename, DescriptorBuilder, MetadataOrigin};
pub use file_source::{FileSource, FileSourceError, LocalDirectory, MemoryDirectory};
pub use filename_parser::{assemble_timestamp, extract_from_filename, TimestampError};
pub use pattern_compiler::{
    accept_template, compile, extract_placeholders, validate_template, CompiledPattern,
    FilenameTemplate, PatternError, PatternField, PatternMatch, SUPPORTED_PLACEHOLDERS,
    WELL_KNOWN_TEMPLATES,
};
pub use reconciler::{DirectoryListing, ReconciliationResult, Reconciler};
pub use recordings_index::{DeleteReport, RecordingsIndex, RefreshOutcome, RefreshSummary};
