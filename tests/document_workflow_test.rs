use std::fs;

use office_suite_mcp::{
    AnalysisDepth, ComparisonMode, DocumentService, ExtractType, MergeStrategy, SearchMode, SplitMethod, StyleTransferOptions,
    SummaryMode, TableFormat, TemplateQuery, TemplateSyntax,
};
use serde_json::json;
use tempfile::TempDir;

const GUIDE: &str = "Installation Guide\n\
Install the tool from the release page. Then install the plugins you need.\n\
Configuration\n\
The system reads its settings at startup. The process is quick.\n\
Final Notes\n\
Contact Acme Corp for support.";

fn service() -> (TempDir, DocumentService) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let service = DocumentService::with_documents_dir(dir.path());
    (dir, service)
}

#[test]
fn test_writer_document_round_trip() {
    let (dir, service) = service();
    let created = service.create_writer_document("guide", GUIDE).unwrap();
    assert_eq!(created, "SUCCESS: Created Writer document guide.odt with content");
    assert!(dir.path().join("guide.odt").is_file());

    let text = service.read_document("guide.odt", ExtractType::Text).unwrap();
    assert_eq!(text, format!("Writer Document Content:\n\n{}", GUIDE));

    let structured = service.read_document("guide.odt", ExtractType::Structured).unwrap();
    assert!(structured.starts_with("Writer Document Structure:\n"));
    assert!(structured.contains("Total Lines: 6\nNon-empty Paragraphs: 6\n"));

    let metadata = service.read_document("guide.odt", ExtractType::Metadata).unwrap();
    assert!(metadata.starts_with("Writer Document Metadata:\nTitle: N/A\n"));
}

#[test]
fn test_missing_documents_are_reported() {
    let (_dir, service) = service();
    let error = service.document_summary("absent.odt", SummaryMode::Brief, 200).unwrap_err();
    assert_eq!(error.to_string(), "File not found: absent.odt");

    let error = service.read_document("../outside.txt", ExtractType::Text).unwrap_err();
    assert_eq!(error.to_string(), "File not found: ../outside.txt");
}

#[test]
fn test_summary_search_and_analysis() {
    let (_dir, service) = service();
    service.create_writer_document("guide.odt", GUIDE).unwrap();

    let summary = service.document_summary("guide.odt", SummaryMode::Brief, 200).unwrap();
    assert!(summary.starts_with("Document Summary for 'guide.odt':\n\n"));

    let found = service.search_in_document("guide.odt", "install", SearchMode::Exact).unwrap();
    assert!(found.contains("Found 3 matches (exact search):"));
    assert!(found.contains("Match 1:\nContext: ..."));

    let none = service.search_in_document("guide.odt", "([", SearchMode::Regex).unwrap();
    assert!(none.contains("No matches found.\nInvalid regex pattern:"));

    let analysis = service.analyze_document_structure("guide.odt", AnalysisDepth::Basic).unwrap();
    assert!(analysis.contains("guide.odt"));
}

#[test]
fn test_spreadsheet_read_and_tables() {
    let (_dir, service) = service();
    let data = vec![
        vec!["Item".to_string(), "Count".to_string()],
        vec!["Pen".to_string(), "4".to_string()],
    ];
    let created = service.create_calc_spreadsheet("stock", data).unwrap();
    assert_eq!(created, "SUCCESS: Created Calc spreadsheet stock.ods with 2 rows");

    let text = service.read_document("stock.ods", ExtractType::Text).unwrap();
    assert_eq!(text, "Calc Spreadsheet Content:\nTotal Sheets: 1\n\n\nSheet 'Sheet1' Data:\nItem | Count\nPen | 4");

    let markdown = service.extract_tables("stock.ods", -1, TableFormat::Markdown).unwrap();
    assert!(markdown.contains("## Table: Sheet1\n\n| Item | Count |\n| --- | --- |\n| Pen | 4 |\n"));

    let error = service.extract_tables("stock.ods", 3, TableFormat::Json).unwrap_err();
    assert_eq!(error.to_string(), "Table index 3 not found. Document has 1 tables.");
}

#[test]
fn test_convert_between_formats() {
    let (dir, service) = service();
    service.create_writer_document("letter.odt", "Dear reader,\nThanks.").unwrap();

    let converted = service.convert_document("letter.odt", "letter", "docx").unwrap();
    assert_eq!(converted, "SUCCESS: Converted letter.odt to letter.docx in docx format");
    assert_eq!(
        service.read_document("letter.docx", ExtractType::Text).unwrap(),
        "Document Content:\n\nDear reader,\nThanks."
    );

    service.convert_document("letter.odt", "letter.pdf", "pdf").unwrap();
    let pdf = service.read_document("letter.pdf", ExtractType::Metadata).unwrap();
    assert!(pdf.starts_with("PDF Document Metadata:"));
    assert!(pdf.contains("Page Count: 1"));

    service.convert_document("letter.odt", "letter.csv", "CSV").unwrap();
    assert_eq!(
        fs::read_to_string(dir.path().join("letter.csv")).unwrap(),
        "\"Dear reader,\"\n\"Thanks.\"\n"
    );

    let error = service.convert_document("letter.odt", "letter.rtf", "rtf").unwrap_err();
    assert_eq!(error.to_string(), "Unsupported format rtf");
}

#[test]
fn test_compare_metadata() {
    let (_dir, service) = service();
    service.create_writer_document("a.txt", "one two three").unwrap();
    service.create_writer_document("b.txt", "one two").unwrap();
    let report = service.compare_documents("a.txt", "b.txt", ComparisonMode::Metadata).unwrap();
    assert!(report.starts_with("Document Metadata Comparison:"));
}

#[test]
fn test_split_writes_section_documents() {
    let (dir, service) = service();
    let text = (1..=600).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
    service.create_writer_document("long.txt", &text).unwrap();

    let result = service.split_document("long.txt", SplitMethod::BySize, Some("250")).unwrap();
    assert!(result.starts_with("SUCCESS: Split 'long.txt' into 3 sections using 'by_size' method:\n\n"));
    assert!(result.contains("3. long_section_3.txt (100 words)\n"));
    for n in 1..=3 {
        assert!(dir.path().join(format!("long_section_{}.txt", n)).is_file());
    }

    let empty = service.create_writer_document("empty.odt", "").and_then(|_| {
        service.split_document("empty.odt", SplitMethod::ByPages, None)
    });
    assert!(empty.is_err());
}

#[test]
fn test_template_create_apply_and_list() {
    let (dir, service) = service();
    service.create_writer_document("guide.odt", GUIDE).unwrap();

    let created = service
        .template_create(
            "guide.odt",
            "support",
            &["Acme Corp".to_string()],
            TemplateSyntax::Mustache,
            json!({"description": "Support guide", "category": "Docs"}).as_object().unwrap().clone(),
        )
        .unwrap();
    assert_eq!(
        created,
        "SUCCESS: Created template 'support.odt' from 'guide.odt' with 1 placeholders (with metadata)"
    );
    assert!(dir.path().join("support.meta.json").is_file());

    let template = service.read_document("support.odt", ExtractType::Text).unwrap();
    assert!(template.contains("Contact {{ACME_CORP}} for support."));

    let placeholders = json!({"ACME_CORP": "Acme Corp"});
    let applied = service
        .template_apply("support.odt", "filled", placeholders.as_object().unwrap(), TemplateSyntax::Mustache)
        .unwrap();
    assert_eq!(
        applied,
        "SUCCESS: Applied template 'support.odt' to create 'filled.odt' with 1 placeholder replacements"
    );
    assert_eq!(
        service.read_document("filled.odt", ExtractType::Text).unwrap(),
        format!("Writer Document Content:\n\n{}", GUIDE)
    );

    let listing = service.template_list(&TemplateQuery::new(None, Some("docs".into()), None, false)).unwrap();
    assert!(listing.contains("Found 1 document(s): 1 confirmed templates, 0 possible templates"));
    assert!(listing.contains("📄 **support.odt**"));
}

#[test]
fn test_spreadsheet_template_output() {
    let (_dir, service) = service();
    service.create_writer_document("rows.txt", "Name: {{NAME}}\n\nTotal: {{TOTAL}}").unwrap();
    let placeholders = json!({"NAME": "Ada", "TOTAL": 42});
    service
        .template_apply("rows.txt", "sheet.ods", placeholders.as_object().unwrap(), TemplateSyntax::Mustache)
        .unwrap();
    let text = service.read_document("sheet.ods", ExtractType::Text).unwrap();
    assert!(text.ends_with("Sheet 'Sheet1' Data:\nName: Ada\nTotal: 42"));
}

#[test]
fn test_style_transfer_without_custom_styles() {
    let (_dir, service) = service();
    service.create_writer_document("a.odt", "First").unwrap();
    service.create_writer_document("b.odt", "Second").unwrap();
    let result = service
        .enhanced_style_transfer("a.odt", "b.odt", &StyleTransferOptions::default())
        .unwrap();
    assert_eq!(
        result,
        "No transferable styles found between 'a.odt' and 'b.odt'. Documents may use only built-in styles."
    );
}

#[tokio::test]
async fn test_merge_documents() {
    let (dir, service) = service();
    service.create_writer_document("a.odt", "Alpha report.").unwrap();
    service.create_writer_document("b.txt", "Beta notes.").unwrap();
    fs::write(dir.path().join("broken.odt"), b"not a zip package").unwrap();

    let missing = service
        .merge_documents(vec!["a.odt".into(), "nope.odt".into()], "merged", MergeStrategy::Sequential)
        .await
        .unwrap_err();
    assert_eq!(missing.to_string(), "Files not found: nope.odt");

    let merged = service
        .merge_documents(
            vec!["a.odt".into(), "broken.odt".into(), "b.txt".into()],
            "merged",
            MergeStrategy::Sequential,
        )
        .await
        .unwrap();
    assert_eq!(
        merged,
        "SUCCESS: Merged 2 documents into 'merged.odt' using sequential strategy\nSkipped (could not be read): broken.odt"
    );

    let text = service.read_document("merged.odt", ExtractType::Text).unwrap();
    assert!(text.contains("Alpha report."));
    assert!(text.contains("Beta notes."));
}
