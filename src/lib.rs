/// Office Suite MCP - a Model Context Protocol server for document automation.
/// Creates, reads, converts, summarizes, searches, compares, merges, splits and
/// templates office documents kept in one documents directory.

pub mod config;
pub mod lexicon;
pub mod modes;
pub mod text_utils;

pub mod text_analytics;
pub mod structure_analysis;
pub mod document_relations;
pub mod segmentation;
pub mod template_engine;

pub mod xml_package;
pub mod odf;
pub mod ooxml;
pub mod pdf;
pub mod tables;
pub mod document_store;
pub mod style_transfer;
pub mod template_registry;

pub mod document_service;
pub mod mcp_handler;

/// Re-export the tool server
pub use mcp_handler::{start_server, OfficeAutomation};

/// Re-export request handling
pub use document_service::DocumentService;
pub use document_store::{DocumentContent, DocumentKind, DocumentMetadata, DocumentStore, FsDocumentStore, SheetGrid, TableGrid};

/// Re-export the analysis engines
pub use document_relations::{compare, merge_documents, SourceDocument};
pub use segmentation::{split, Section, SplitOutcome};
pub use structure_analysis::analyze_structure;
pub use template_engine::{apply_placeholders, extract_placeholders, PlaceholderBinding};
pub use text_analytics::{search, summarize, Match, SearchOutcome};

/// Re-export mode parameters
pub use modes::{
    AnalysisDepth, ComparisonMode, ExtractType, MergeStrategy, SearchMode, SplitMethod, SummaryMode, TableFormat,
    TemplateSyntax,
};

/// Re-export library and style tooling
pub use style_transfer::{StyleTransferOptions, StyleTransferReport};
pub use template_registry::{TemplateMetadata, TemplateQuery};
