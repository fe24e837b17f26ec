//! Core data types and error definitions for the classification pipeline.

use crate::anthropic::ClientError;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Media type assigned when the extension maps to nothing known.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// A file prepared for transport to the classification service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Original filename, case preserved.
    pub filename: String,
    /// Media type guessed from the filename extension.
    pub media_type: String,
    /// Standard base64 encoding of the raw file bytes.
    pub encoded: String,
}

/// Routing bucket of a document, derived from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentGroup {
    /// PDF documents, attached whole.
    Document,
    /// Raster images the model accepts natively.
    Image,
    /// Everything else, sent as a text excerpt.
    Text,
}

impl ContentGroup {
    /// Every group, in the order the orchestrator processes them.
    pub const ALL: [ContentGroup; 3] = [Self::Document, Self::Image, Self::Text];

    /// Route a media type to its group.
    pub fn for_media_type(media_type: &str) -> Self {
        match media_type.to_ascii_lowercase().as_str() {
            "application/pdf" => Self::Document,
            "image/jpeg" | "image/png" | "image/gif" | "image/webp" => Self::Image,
            _ => Self::Text,
        }
    }

    /// Short lower-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ContentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a file ended up without a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownReason {
    /// The service answered with the unknown label itself.
    Reported,
    /// The service answered with a label outside the configured set.
    Unrecognized,
    /// No line of the reply could be attributed to the file.
    Unmatched,
}

/// Outcome for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// A label from the configured category set.
    Category(String),
    /// No category could be assigned.
    Unknown(UnknownReason),
    /// Classification failed; carries the rendered error message.
    Failed(String),
}

impl Classification {
    /// Build a failure result from any displayable cause.
    pub fn failed(cause: impl fmt::Display) -> Self {
        Self::Failed(format!("Error classifying file: {cause}"))
    }

    /// Whether the result carries an error instead of a label.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Render the caller-facing string, substituting `unknown_label` for unknown results.
    pub fn render<'a>(&'a self, unknown_label: &'a str) -> &'a str {
        match self {
            Self::Category(label) => label,
            Self::Unknown(_) => unknown_label,
            Self::Failed(message) => message,
        }
    }
}

/// Mapping from original filename to classification outcome.
pub type ClassificationResults = BTreeMap<String, Classification>;

/// Serializable view of results with unknown entries rendered as the configured label.
#[derive(Debug, Clone, Copy)]
pub struct RenderedResults<'a> {
    results: &'a ClassificationResults,
    unknown_label: &'a str,
}

impl<'a> RenderedResults<'a> {
    /// Pair results with the label used for unknown entries.
    pub fn new(results: &'a ClassificationResults, unknown_label: &'a str) -> Self {
        Self {
            results,
            unknown_label,
        }
    }

    /// Flatten into owned strings, for merging with entries the core never saw.
    pub fn into_strings(self) -> BTreeMap<String, String> {
        self.results
            .iter()
            .map(|(name, outcome)| (name.clone(), outcome.render(self.unknown_label).to_string()))
            .collect()
    }
}

impl Serialize for RenderedResults<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.results
                .iter()
                .map(|(name, outcome)| (name, outcome.render(self.unknown_label))),
        )
    }
}

/// Errors that abort classification of an entire request or batch.
///
/// These never escape the service; they are folded into [`Classification::Failed`].
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The provider credential is missing.
    #[error("ANTHROPIC_API_KEY not set in environment")]
    MissingCredential,
    /// The provider client could not be constructed.
    #[error("{0}")]
    ClientSetup(String),
    /// The remote call for a batch failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}
