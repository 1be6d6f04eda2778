use anyhow::Result;
use serde::Serialize;

use crate::document_store::TableGrid;
use crate::modes::TableFormat;

/// One CSV record with every cell quoted
pub fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Serialize)]
struct TableView<'a> {
    table_name: &'a str,
    table_index: usize,
    rows: usize,
    columns: usize,
    data: &'a [Vec<String>],
}

impl<'a> From<&'a TableGrid> for TableView<'a> {
    fn from(table: &'a TableGrid) -> Self {
        Self {
            table_name: &table.name,
            table_index: table.index,
            rows: table.rows.len(),
            columns: table.column_count,
            data: &table.rows,
        }
    }
}

fn markdown_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn markdown_row(cells: &[String], width: usize) -> String {
    let padded: Vec<String> = (0..width)
        .map(|i| cells.get(i).map(|c| markdown_cell(c)).unwrap_or_default())
        .collect();
    format!("| {} |\n", padded.join(" | "))
}

/// Render extracted tables for the `extract_tables` tool
pub fn render_tables(filename: &str, tables: &[TableGrid], format: TableFormat) -> Result<String> {
    let mut out = String::new();
    match format {
        TableFormat::Json => {
            out.push_str(&format!("Table Data from '{}' (JSON format):\n\n", filename));
            let views: Vec<TableView> = tables.iter().map(TableView::from).collect();
            out.push_str(&serde_json::to_string_pretty(&views)?);
            out.push('\n');
        }
        TableFormat::Csv => {
            out.push_str(&format!("Table Data from '{}' (CSV format):\n\n", filename));
            for table in tables {
                out.push_str(&format!(
                    "Table: {} ({} rows x {} columns)\n",
                    table.name,
                    table.rows.len(),
                    table.column_count
                ));
                for row in &table.rows {
                    out.push_str(&csv_line(row));
                    out.push('\n');
                }
                out.push('\n');
            }
        }
        TableFormat::Markdown => {
            out.push_str(&format!("Table Data from '{}' (Markdown format):\n\n", filename));
            for table in tables {
                out.push_str(&format!("## Table: {}\n\n", table.name));
                if let Some((header, body)) = table.rows.split_first() {
                    let width = table.column_count.max(1);
                    out.push_str(&markdown_row(header, width));
                    out.push_str(&format!("| {} |\n", vec!["---"; width].join(" | ")));
                    for row in body {
                        out.push_str(&markdown_row(row, width));
                    }
                }
                out.push('\n');
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<TableGrid> {
        vec![TableGrid {
            name: "Prices".to_string(),
            index: 0,
            rows: vec![
                vec!["Item".to_string(), "Cost".to_string()],
                vec!["Tea \"green\"".to_string()],
            ],
            column_count: 2,
        }]
    }

    #[test]
    fn test_csv_quotes_every_cell() {
        let out = render_tables("menu.odt", &sample(), TableFormat::Csv).unwrap();
        assert!(out.contains("Table: Prices (2 rows x 2 columns)\n\"Item\",\"Cost\"\n\"Tea \"\"green\"\"\"\n"));
    }

    #[test]
    fn test_markdown_pads_short_rows() {
        let out = render_tables("menu.odt", &sample(), TableFormat::Markdown).unwrap();
        assert!(out.contains("## Table: Prices\n\n| Item | Cost |\n| --- | --- |\n| Tea \"green\" |  |\n"));
    }

    #[test]
    fn test_json_is_parseable() {
        let out = render_tables("menu.odt", &sample(), TableFormat::Json).unwrap();
        let json = out.split_once("\n\n").unwrap().1;
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value[0]["table_name"], "Prices");
        assert_eq!(value[0]["rows"], 2);
        assert_eq!(value[0]["data"][1][0], "Tea \"green\"");
    }
}
