use rmcp::{
    model::CallToolRequestParam,
    service::{RoleClient, RunningService, ServiceExt},
    transport::TokioChildProcess,
};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::process::Command;

async fn start_server(documents_dir: &TempDir) -> RunningService<RoleClient, ()> {
    let mut command = Command::new(env!("CARGO_BIN_EXE_office_suite_mcp"));
    command
        .env("OFFICE_MCP_DOCUMENTS_DIR", documents_dir.path())
        .env("OFFICE_MCP_LOG_LEVEL", "warn");
    ().serve(TokioChildProcess::new(command).unwrap()).await.unwrap()
}

async fn call(service: &RunningService<RoleClient, ()>, name: &'static str, arguments: Value) -> (bool, String) {
    let result = service
        .call_tool(CallToolRequestParam {
            name: name.into(),
            arguments: arguments.as_object().cloned(),
        })
        .await
        .unwrap();
    let text = result.content.as_ref().expect("content")[0].as_text().unwrap().text.clone();
    (result.is_error.unwrap_or(false), text)
}

#[tokio::test]
async fn test_lists_every_tool() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let service = start_server(&dir).await;

    let tools = service.list_tools(Default::default()).await.unwrap();
    assert_eq!(tools.tools.len(), 15);
    for expected in [
        "create_writer_document",
        "read_document",
        "merge_documents",
        "template_list",
        "enhanced_style_transfer",
    ] {
        assert!(tools.tools.iter().any(|tool| tool.name == expected), "missing tool {}", expected);
    }

    service.cancel().await.unwrap();
}

#[tokio::test]
async fn test_create_then_read_document() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let service = start_server(&dir).await;

    let (failed, text) = call(
        &service,
        "create_writer_document",
        json!({"filename": "notes", "content": "Test document content"}),
    )
    .await;
    assert!(!failed);
    assert_eq!(text, "SUCCESS: Created Writer document notes.odt with content");
    assert!(dir.path().join("notes.odt").is_file());

    let (failed, text) = call(&service, "read_document", json!({"filename": "notes.odt"})).await;
    assert!(!failed);
    assert_eq!(text, "Writer Document Content:\n\nTest document content");

    let (failed, text) = call(
        &service,
        "search_in_document",
        json!({"filename": "notes.odt", "search_term": "document", "search_type": "exact"}),
    )
    .await;
    assert!(!failed);
    assert!(text.contains("Found 1 matches (exact search):"));

    service.cancel().await.unwrap();
}

#[tokio::test]
async fn test_missing_document_is_a_tool_error() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let service = start_server(&dir).await;

    let (failed, text) = call(
        &service,
        "document_summary",
        json!({"filename": "missing.docx", "summary_type": "detailed"}),
    )
    .await;
    assert!(failed);
    assert_eq!(text, "ERROR: File not found: missing.docx");

    service.cancel().await.unwrap();
}
