//! Saving results to disk as JSON or CSV.

use std::fs::File;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::error::AppError;
use crate::firecrawl::ScrapeData;

/// Writes `value` as pretty JSON.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), AppError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    info!(path = %path.display(), "saved JSON");
    Ok(())
}

/// Writes rows as CSV.
///
/// The header is the union of every row's keys in first-seen order. Missing
/// cells are left empty; nested values are written as JSON.
pub fn save_csv(rows: &[Map<String, Value>], path: &Path) -> Result<usize, AppError> {
    let headers = columns(rows);
    let mut writer = csv::WriterBuilder::new().from_path(path)?;
    writer.write_record(&headers)?;

    for row in rows {
        let record: Vec<String> = headers
            .iter()
            .map(|key| row.get(key).map(cell).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "saved CSV");
    Ok(rows.len())
}

fn columns(rows: &[Map<String, Value>]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::new();
    for key in rows.iter().flat_map(|row| row.keys()) {
        if !headers.iter().any(|h| h == key) {
            headers.push(key.clone());
        }
    }
    headers
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

/// Flattens scraped documents into one row each: url, title, description,
/// status code, markdown, link count and any extracted JSON object fields.
pub fn rows_from_documents(documents: &[ScrapeData]) -> Vec<Map<String, Value>> {
    documents
        .iter()
        .map(|doc| {
            let mut row = Map::new();
            let metadata = doc.metadata.as_ref();
            if let Some(url) = metadata.and_then(|m| m.source_url.clone()) {
                row.insert("url".into(), Value::String(url));
            }
            if let Some(title) = doc.title() {
                row.insert("title".into(), Value::String(title.to_string()));
            }
            if let Some(description) = metadata.and_then(|m| m.description.clone()) {
                row.insert("description".into(), Value::String(description));
            }
            if let Some(code) = metadata.and_then(|m| m.status_code) {
                row.insert("status_code".into(), Value::from(code));
            }
            if let Some(markdown) = &doc.markdown {
                row.insert("markdown".into(), Value::String(markdown.clone()));
            }
            if doc.links.is_some() {
                row.insert("links".into(), Value::from(doc.links().len()));
            }
            match &doc.json {
                Some(Value::Object(fields)) => {
                    for (key, value) in fields {
                        row.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
                Some(other) => {
                    row.insert("json".into(), other.clone());
                }
                None => {}
            }
            row
        })
        .collect()
}

/// Turns a JSON array of objects into rows; scalars become a `value` column.
pub fn rows_from_value(value: &Value) -> Vec<Map<String, Value>> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => map.clone(),
            scalar => {
                let mut row = Map::new();
                row.insert("value".into(), scalar.clone());
                row
            }
        })
        .collect()
}
