//! Transcript export.
//!
//! `GET /api/export-logs?format=md|txt[&tab_id=…]` renders the recorded
//! transcript as plain text or Markdown for download. Rendering is a
//! read-only view over the transcript log; nothing here touches session
//! state.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use webterm_protocol::TranscriptEntry;

use crate::state::AppContext;

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
    pub tab_id: Option<String>,
}

pub async fn export_logs(
    State(ctx): State<AppContext>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let entries = match &query.tab_id {
        Some(tab_id) => ctx.transcripts.for_tab(tab_id),
        None => ctx.transcripts.all(),
    };

    match query.format.as_deref().unwrap_or("txt") {
        "txt" => download(
            "terminal_history.txt",
            "text/plain; charset=utf-8",
            format_text(&entries),
        ),
        "md" => download(
            "terminal_history.md",
            "text/markdown; charset=utf-8",
            format_markdown(&entries),
        ),
        other => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("unsupported format '{other}', expected 'txt' or 'md'"),
            })),
        )
            .into_response(),
    }
}

fn download(filename: &str, content_type: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// `[timestamp] [tab] $ command` with the output indented underneath.
pub fn format_text(entries: &[TranscriptEntry]) -> String {
    let mut lines = Vec::new();
    for entry in entries {
        lines.push(format!(
            "[{}] [{}] $ {}",
            entry.timestamp, entry.tab_id, entry.command
        ));
        if !entry.output.is_empty() {
            for line in entry.output.lines() {
                lines.push(format!("  {line}"));
            }
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

/// Markdown rendering with date headers and fenced command/output blocks.
pub fn format_markdown(entries: &[TranscriptEntry]) -> String {
    let mut lines = vec!["# Terminal Command History".to_string(), String::new()];
    let mut current_date: Option<&str> = None;

    for entry in entries {
        let date = entry
            .timestamp
            .split_whitespace()
            .next()
            .unwrap_or(&entry.timestamp);
        if current_date != Some(date) {
            current_date = Some(date);
            lines.push(format!("## {date}"));
            lines.push(String::new());
        }

        lines.push(format!("### {} (Tab: {})", entry.timestamp, entry.tab_id));
        lines.push(String::new());
        lines.push("```bash".to_string());
        lines.push(format!("$ {}", entry.command));
        lines.push("```".to_string());
        lines.push(String::new());

        if !entry.output.is_empty() {
            lines.push("**Output:**".to_string());
            lines.push(String::new());
            lines.push("```".to_string());
            lines.push(entry.output.clone());
            lines.push("```".to_string());
            lines.push(String::new());
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use webterm_protocol::OutputKind;

    fn entry(ts: &str, tab: &str, command: &str, output: &str) -> TranscriptEntry {
        TranscriptEntry {
            tab_id: tab.to_string(),
            command: command.to_string(),
            output: output.to_string(),
            kind: OutputKind::Standard,
            timestamp: ts.to_string(),
        }
    }

    #[test]
    fn text_format_indents_output() {
        let entries = vec![
            entry("2026-08-08 10:00:00", "t1", "pwd", "/home/user"),
            entry("2026-08-08 10:00:05", "t1", "clear", ""),
        ];
        let text = format_text(&entries);
        assert!(text.contains("[2026-08-08 10:00:00] [t1] $ pwd"));
        assert!(text.contains("  /home/user"));
        assert!(text.contains("[2026-08-08 10:00:05] [t1] $ clear"));
    }

    #[test]
    fn markdown_groups_by_date() {
        let entries = vec![
            entry("2026-08-07 23:59:00", "t1", "ls", "a  b"),
            entry("2026-08-08 00:01:00", "t2", "pwd", "/srv"),
        ];
        let md = format_markdown(&entries);
        assert!(md.starts_with("# Terminal Command History"));
        assert!(md.contains("## 2026-08-07"));
        assert!(md.contains("## 2026-08-08"));
        assert!(md.contains("### 2026-08-08 00:01:00 (Tab: t2)"));
        assert!(md.contains("$ ls"));
        assert!(md.contains("**Output:**"));
    }

    #[test]
    fn markdown_repeats_no_date_header_within_a_day() {
        let entries = vec![
            entry("2026-08-08 10:00:00", "t1", "ls", ""),
            entry("2026-08-08 10:05:00", "t1", "pwd", ""),
        ];
        let md = format_markdown(&entries);
        assert_eq!(md.matches("## 2026-08-08").count(), 1);
    }
}
