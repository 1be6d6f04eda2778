use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Result;
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, tool::Parameters},
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
    transport::stdio,
};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::document_service::DocumentService;
use crate::modes::{
    AnalysisDepth, ComparisonMode, ExtractType, MergeStrategy, SearchMode, SplitMethod, SummaryMode, TableFormat,
    TemplateSyntax,
};
use crate::style_transfer::{StyleTransferOptions, DEFAULT_STYLE_FAMILIES};
use crate::template_registry::TemplateQuery;

/// Office document automation tools over a documents directory
#[derive(Clone)]
pub struct OfficeAutomation {
    service: DocumentService,
    tool_router: ToolRouter<Self>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct CreateWriterDocumentRequest {
    #[schemars(description = "Name of the document to create; .odt is added when no text extension is given")]
    pub filename: String,
    #[schemars(description = "Text content of the document")]
    pub content: String,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct CreateCalcSpreadsheetRequest {
    #[schemars(description = "Name of the spreadsheet to create; .ods is added unless it ends in .ods or .csv")]
    pub filename: String,
    #[schemars(description = "Rows of cell values")]
    pub data: Vec<Vec<String>>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct ConvertDocumentRequest {
    #[schemars(description = "Document to convert")]
    pub input_file: String,
    #[schemars(description = "Name of the converted document")]
    pub output_file: String,
    #[schemars(description = "Target format: pdf, docx, odt, txt, md, csv or ods")]
    pub format: String,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct ReadDocumentRequest {
    #[schemars(description = "Document to read")]
    pub filename: String,
    #[schemars(description = "Type of content extraction: 'text' (default), 'structured', or 'metadata'")]
    pub extract_type: Option<String>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct DocumentSummaryRequest {
    #[schemars(description = "Document to summarize")]
    pub filename: String,
    #[schemars(description = "Summary style: 'brief' (default), 'detailed' or 'bullet_points'")]
    pub summary_type: Option<String>,
    #[schemars(description = "Maximum words in a brief summary (default: 200)")]
    pub max_length: Option<usize>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct SearchInDocumentRequest {
    #[schemars(description = "Document to search")]
    pub filename: String,
    #[schemars(description = "Text or pattern to find")]
    pub search_term: String,
    #[schemars(description = "Search type: 'exact', 'fuzzy' (default) or 'regex'")]
    pub search_type: Option<String>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct ExtractTablesRequest {
    #[schemars(description = "Document containing tables")]
    pub filename: String,
    #[schemars(description = "Zero-based table index; -1 (default) returns all tables")]
    pub table_index: Option<i64>,
    #[schemars(description = "Output format: 'json' (default), 'csv' or 'markdown'")]
    pub output_format: Option<String>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct CompareDocumentsRequest {
    #[schemars(description = "First document")]
    pub file1: String,
    #[schemars(description = "Second document")]
    pub file2: String,
    #[schemars(description = "Comparison type: 'content' (default), 'structure', 'metadata' or 'comprehensive'")]
    pub comparison_type: Option<String>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct AnalyzeDocumentStructureRequest {
    #[schemars(description = "Document to analyze")]
    pub filename: String,
    #[schemars(description = "Analysis depth: 'basic', 'detailed' (default) or 'comprehensive'")]
    pub analysis_depth: Option<String>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct MergeDocumentsRequest {
    #[schemars(description = "Documents to merge, in order")]
    pub source_files: Vec<String>,
    #[schemars(description = "Name of the merged document; .odt is added when no text extension is given")]
    pub output_filename: String,
    #[schemars(description = "Merge strategy: 'sequential', 'interleaved' or 'smart' (default)")]
    pub merge_strategy: Option<String>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct SplitDocumentRequest {
    #[schemars(description = "Document to split")]
    pub filename: String,
    #[schemars(description = "Split method: 'by_headings', 'by_pages', 'by_sections' (default) or 'by_size'")]
    pub split_method: Option<String>,
    #[schemars(description = "Words per section for 'by_size' (default: 500)")]
    pub split_criteria: Option<Value>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct TemplateApplyRequest {
    #[schemars(description = "Template document")]
    pub template_filename: String,
    #[schemars(description = "Name of the filled-in document")]
    pub output_filename: String,
    #[schemars(description = "Placeholder names and replacement values, applied in order")]
    pub placeholders: Map<String, Value>,
    #[schemars(description = "Placeholder syntax: 'mustache' (default), 'percent' or 'dollar'")]
    pub template_format: Option<String>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct TemplateCreateRequest {
    #[schemars(description = "Document to turn into a template")]
    pub source_filename: String,
    #[schemars(description = "Name of the template document")]
    pub template_filename: String,
    #[schemars(description = "Text fragments to replace with placeholders")]
    pub placeholder_markers: Vec<String>,
    #[schemars(description = "Placeholder syntax: 'mustache' (default), 'percent' or 'dollar'")]
    pub placeholder_format: Option<String>,
    #[schemars(description = "Optional metadata for the template (title, description, category, etc.)")]
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct TemplateListRequest {
    #[schemars(description = "Match against template names and descriptions")]
    pub search_term: Option<String>,
    #[schemars(description = "Only templates whose metadata has this category")]
    pub category: Option<String>,
    #[schemars(description = "Format filter: 'odt', 'ods', 'docx', 'xlsx' or 'all' (default)")]
    pub format: Option<String>,
    #[schemars(description = "Whether to include detailed metadata in results")]
    pub include_metadata: Option<bool>,
}

#[derive(Deserialize, Debug, schemars::JsonSchema)]
pub struct StyleTransferRequest {
    #[schemars(description = "Document to copy styles from")]
    pub source_filename: String,
    #[schemars(description = "Document to copy styles into")]
    pub target_filename: String,
    #[schemars(description = "Style families: paragraph, character, page, frame, numbering, table (default: paragraph, character)")]
    pub style_types: Option<Vec<String>>,
    #[schemars(description = "Keep the target's content untouched (default: true)")]
    pub preserve_content: Option<bool>,
    #[schemars(description = "Leave styles containing placeholder patterns alone (default: false)")]
    pub template_mode: Option<bool>,
    #[schemars(description = "Rename source styles in the target: source name to target name")]
    pub style_mapping: Option<HashMap<String, String>>,
}

/// Turn a handler outcome into a tool result; failures are reported to the caller, not the protocol
fn tool_result(outcome: Result<String>) -> CallToolResult {
    match outcome {
        Ok(text) => CallToolResult::success(vec![Content::text(text)]),
        Err(e) => {
            log::warn!("Tool call failed: {:#}", e);
            CallToolResult::error(vec![Content::text(format!("ERROR: {:#}", e))])
        }
    }
}

fn criteria_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[tool_router]
impl OfficeAutomation {
    pub fn new(service: DocumentService) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    pub fn service(&self) -> &DocumentService {
        &self.service
    }

    /// Run a document handler on the blocking pool
    async fn run_blocking<F>(&self, task: F) -> Result<CallToolResult, McpError>
    where
        F: FnOnce(&DocumentService) -> Result<String> + Send + 'static,
    {
        let service = self.service.clone();
        let outcome = tokio::task::spawn_blocking(move || task(&service))
            .await
            .map_err(|e| McpError::internal_error(format!("Document task failed: {}", e), None))?;
        Ok(tool_result(outcome))
    }

    #[tool(description = "Create a Writer text document with the given content")]
    pub async fn create_writer_document(
        &self,
        Parameters(req): Parameters<CreateWriterDocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_blocking(move |service| service.create_writer_document(&req.filename, &req.content))
            .await
    }

    #[tool(description = "Create a Calc spreadsheet from rows of cell values")]
    pub async fn create_calc_spreadsheet(
        &self,
        Parameters(req): Parameters<CreateCalcSpreadsheetRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_blocking(move |service| service.create_calc_spreadsheet(&req.filename, req.data))
            .await
    }

    #[tool(description = "Convert a document to another format (pdf, docx, odt, txt, md, csv, ods)")]
    pub async fn convert_document(
        &self,
        Parameters(req): Parameters<ConvertDocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        self.run_blocking(move |service| service.convert_document(&req.input_file, &req.output_file, &req.format))
            .await
    }

    #[tool(description = "Read a document's text, structure or metadata")]
    pub async fn read_document(
        &self,
        Parameters(req): Parameters<ReadDocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let extract_type = ExtractType::parse_or_default(req.extract_type.as_deref());
        self.run_blocking(move |service| service.read_document(&req.filename, extract_type))
            .await
    }

    #[tool(description = "Summarize a document (brief, detailed or bullet points)")]
    pub async fn document_summary(
        &self,
        Parameters(req): Parameters<DocumentSummaryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let summary_type = SummaryMode::parse_or_default(req.summary_type.as_deref());
        let max_length = req.max_length.unwrap_or(crate::lexicon::DEFAULT_SUMMARY_WORDS);
        self.run_blocking(move |service| service.document_summary(&req.filename, summary_type, max_length))
            .await
    }

    #[tool(description = "Search a document for text using exact, fuzzy or regex matching")]
    pub async fn search_in_document(
        &self,
        Parameters(req): Parameters<SearchInDocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let search_type = SearchMode::parse_or_default(req.search_type.as_deref());
        self.run_blocking(move |service| service.search_in_document(&req.filename, &req.search_term, search_type))
            .await
    }

    #[tool(description = "Extract tables from a document as JSON, CSV or Markdown")]
    pub async fn extract_tables(
        &self,
        Parameters(req): Parameters<ExtractTablesRequest>,
    ) -> Result<CallToolResult, McpError> {
        let output_format = TableFormat::parse_or_default(req.output_format.as_deref());
        let table_index = req.table_index.unwrap_or(-1);
        self.run_blocking(move |service| service.extract_tables(&req.filename, table_index, output_format))
            .await
    }

    #[tool(description = "Compare two documents by content, structure, metadata or vocabulary")]
    pub async fn compare_documents(
        &self,
        Parameters(req): Parameters<CompareDocumentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let comparison_type = ComparisonMode::parse_or_default(req.comparison_type.as_deref());
        self.run_blocking(move |service| service.compare_documents(&req.file1, &req.file2, comparison_type))
            .await
    }

    #[tool(description = "Analyze the structure of a document: headings, paragraphs and style")]
    pub async fn analyze_document_structure(
        &self,
        Parameters(req): Parameters<AnalyzeDocumentStructureRequest>,
    ) -> Result<CallToolResult, McpError> {
        let depth = AnalysisDepth::parse_or_default(req.analysis_depth.as_deref());
        self.run_blocking(move |service| service.analyze_document_structure(&req.filename, depth))
            .await
    }

    #[tool(description = "Merge several documents into one")]
    pub async fn merge_documents(
        &self,
        Parameters(req): Parameters<MergeDocumentsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let strategy = MergeStrategy::parse_or_default(req.merge_strategy.as_deref());
        let outcome = self
            .service
            .merge_documents(req.source_files, &req.output_filename, strategy)
            .await;
        Ok(tool_result(outcome))
    }

    #[tool(description = "Split a document into section documents")]
    pub async fn split_document(
        &self,
        Parameters(req): Parameters<SplitDocumentRequest>,
    ) -> Result<CallToolResult, McpError> {
        let method = SplitMethod::parse_or_default(req.split_method.as_deref());
        let criteria = criteria_text(req.split_criteria);
        self.run_blocking(move |service| service.split_document(&req.filename, method, criteria.as_deref()))
            .await
    }

    #[tool(description = "Create a document from a template by replacing placeholders")]
    pub async fn template_apply(
        &self,
        Parameters(req): Parameters<TemplateApplyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let syntax = TemplateSyntax::parse_or_default(req.template_format.as_deref());
        self.run_blocking(move |service| {
            service.template_apply(&req.template_filename, &req.output_filename, &req.placeholders, syntax)
        })
        .await
    }

    #[tool(description = "Create a template from a document by turning text fragments into placeholders")]
    pub async fn template_create(
        &self,
        Parameters(req): Parameters<TemplateCreateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let syntax = TemplateSyntax::parse_or_default(req.placeholder_format.as_deref());
        self.run_blocking(move |service| {
            service.template_create(
                &req.source_filename,
                &req.template_filename,
                &req.placeholder_markers,
                syntax,
                req.metadata.unwrap_or_default(),
            )
        })
        .await
    }

    #[tool(description = "List available templates with optional search, category and format filters")]
    pub async fn template_list(
        &self,
        Parameters(req): Parameters<TemplateListRequest>,
    ) -> Result<CallToolResult, McpError> {
        let query = TemplateQuery::new(
            req.search_term,
            req.category,
            req.format,
            req.include_metadata.unwrap_or(false),
        );
        self.run_blocking(move |service| service.template_list(&query)).await
    }

    #[tool(description = "Copy paragraph, character and other styles from one document into another")]
    pub async fn enhanced_style_transfer(
        &self,
        Parameters(req): Parameters<StyleTransferRequest>,
    ) -> Result<CallToolResult, McpError> {
        let options = StyleTransferOptions {
            style_types: req
                .style_types
                .unwrap_or_else(|| DEFAULT_STYLE_FAMILIES.iter().map(|s| s.to_string()).collect()),
            preserve_content: req.preserve_content.unwrap_or(true),
            template_mode: req.template_mode.unwrap_or(false),
            style_mapping: req.style_mapping.unwrap_or_default(),
        };
        self.run_blocking(move |service| {
            service.enhanced_style_transfer(&req.source_filename, &req.target_filename, &options)
        })
        .await
    }
}

#[tool_handler]
impl ServerHandler for OfficeAutomation {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server creates, reads, converts, analyzes, compares, merges, splits and templates office \
                 documents (ODT, DOCX, ODS, XLSX, PDF, text) stored in its documents directory."
                    .to_string(),
            ),
        }
    }
}

/// Serve the tools over stdio until the client disconnects
pub async fn start_server(documents_dir: PathBuf) -> Result<()> {
    log::info!("Serving documents from {}", documents_dir.display());
    let handler = OfficeAutomation::new(DocumentService::with_documents_dir(documents_dir));

    let server = handler.serve(stdio()).await?;
    let quit_reason = server.waiting().await?;
    log::info!("Server stopped: {:?}", quit_reason);
    Ok(())
}
