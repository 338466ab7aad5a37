//! Values exchanged with collaborators.

use crate::utils::artifact_fingerprint;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// The payload a run starts from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestSource {
    /// A document on disk, handed to the document extractor.
    Path(PathBuf),
    /// Raw request text; extraction is skipped.
    Text(String),
}

impl RequestSource {
    /// Creates a path source.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Creates a raw text source.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// A table pulled out of a document, row by row.
///
/// Cells are optional because extractors report merged or blank cells as
/// missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// The table rows.
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    /// Creates a table from rows.
    #[must_use]
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { rows }
    }

    /// Creates a table where every cell is present.
    #[must_use]
    pub fn from_cells<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(|cell| Some(cell.into())).collect())
                .collect(),
        }
    }

    /// Renders the table as pipe-separated markdown rows.
    ///
    /// Missing cells render as empty strings and empty rows are dropped.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        self.rows
            .iter()
            .filter(|row| !row.is_empty())
            .map(|row| {
                row.iter()
                    .map(|cell| cell.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Output of the document extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Body text.
    pub text: String,
    /// Text recovered by OCR from images.
    pub ocr_text: String,
    /// Tables found in the document.
    pub tables: Vec<Table>,
}

impl ExtractedDocument {
    /// Returns the body text followed by the OCR text.
    #[must_use]
    pub fn combined_text(&self) -> String {
        format!("{}\n\n{}", self.text, self.ocr_text)
    }
}

/// Structured metadata pulled from a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMetadata {
    /// Project name, if stated.
    #[serde(default)]
    pub project_name: String,
    /// Client name, if stated.
    #[serde(default)]
    pub client_name: String,
    /// Submission deadline, if stated.
    #[serde(default)]
    pub deadline: String,
    /// Client industry.
    #[serde(default = "default_industry")]
    pub industry: String,
    /// Client region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Hard constraints the proposal must respect.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Needs the client expressed.
    #[serde(default)]
    pub client_needs: Vec<String>,
}

fn default_industry() -> String {
    "generic".to_string()
}

fn default_region() -> String {
    "global".to_string()
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            client_name: String::new(),
            deadline: String::new(),
            industry: default_industry(),
            region: default_region(),
            constraints: Vec::new(),
            client_needs: Vec::new(),
        }
    }
}

impl RequestMetadata {
    /// Parses collaborator output, falling back to defaults when it is not
    /// valid JSON.
    #[must_use]
    pub fn from_json_lenient(raw: &str) -> Self {
        match serde_json::from_str::<Self>(raw.trim()) {
            Ok(meta) => meta.normalized(),
            Err(e) => {
                tracing::debug!(error = %e, "Metadata output was not valid JSON, using defaults");
                Self::default()
            }
        }
    }

    /// Fills blank industry/region with defaults and removes duplicate list
    /// entries.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.industry.trim().is_empty() {
            self.industry = default_industry();
        }
        if self.region.trim().is_empty() {
            self.region = default_region();
        }
        self.constraints = dedupe(self.constraints);
        self.client_needs = dedupe(self.client_needs);
        self
    }
}

fn dedupe(items: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Result of auditing a draft against the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Whether the draft satisfies the request.
    pub passed: bool,
    /// The auditor's findings.
    pub details: String,
}

impl ComplianceReport {
    /// Creates a passing report.
    #[must_use]
    pub fn passed(details: impl Into<String>) -> Self {
        Self {
            passed: true,
            details: details.into(),
        }
    }

    /// Creates a failing report.
    #[must_use]
    pub fn failed(details: impl Into<String>) -> Self {
        Self {
            passed: false,
            details: details.into(),
        }
    }
}

/// A finished proposal handed to the artifact index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Content-derived identifier.
    pub id: String,
    /// The proposal text.
    pub content: String,
}

impl Artifact {
    /// Creates an artifact whose id is derived from its content.
    #[must_use]
    pub fn from_draft(content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: artifact_fingerprint(&content),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_to_markdown_skips_empty_rows() {
        let table = Table::new(vec![
            vec![Some("Item".into()), Some("Qty".into())],
            vec![],
            vec![Some("Steel".into()), None],
        ]);

        assert_eq!(table.to_markdown(), "Item | Qty\nSteel | ");
    }

    #[test]
    fn test_table_from_cells() {
        let table = Table::from_cells([["a", "b"], ["c", "d"]]);
        assert_eq!(table.to_markdown(), "a | b\nc | d");
    }

    #[test]
    fn test_combined_text() {
        let doc = ExtractedDocument {
            text: "Body".into(),
            ocr_text: "Scanned".into(),
            tables: Vec::new(),
        };
        assert_eq!(doc.combined_text(), "Body\n\nScanned");
    }

    #[test]
    fn test_metadata_lenient_parse_defaults_on_garbage() {
        let meta = RequestMetadata::from_json_lenient("not json at all {");
        assert_eq!(meta, RequestMetadata::default());
        assert_eq!(meta.industry, "generic");
        assert_eq!(meta.region, "global");
    }

    #[test]
    fn test_metadata_lenient_parse_normalizes() {
        let raw = r#"{
            "client_name": "Acme",
            "industry": "",
            "constraints": ["ISO 9001", "ISO 9001", "On-site"],
            "client_needs": ["speed"]
        }"#;
        let meta = RequestMetadata::from_json_lenient(raw);

        assert_eq!(meta.client_name, "Acme");
        assert_eq!(meta.industry, "generic");
        assert_eq!(meta.region, "global");
        assert_eq!(meta.constraints, vec!["ISO 9001".to_string(), "On-site".to_string()]);
    }

    #[test]
    fn test_artifact_id_follows_content() {
        let a = Artifact::from_draft("v1");
        let b = Artifact::from_draft("v1");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, Artifact::from_draft("v2").id);
    }
}
