//! The closed set of labels a file may be classified into.

use super::types::{Classification, UnknownReason};
use crate::config::Config;

/// Configured classification taxonomy plus the label used for "none of the above".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    labels: Vec<String>,
    unknown_label: String,
}

impl CategorySet {
    /// Build a set from raw labels; labels are trimmed, lower-cased, and deduplicated.
    pub fn new<I, S>(labels: I, unknown_label: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unknown_label = unknown_label.into().trim().to_lowercase();
        let mut normalized: Vec<String> = Vec::new();
        for label in labels {
            let label = label.as_ref().trim().to_lowercase();
            if label.is_empty() || label == unknown_label || normalized.contains(&label) {
                continue;
            }
            normalized.push(label);
        }
        Self {
            labels: normalized,
            unknown_label,
        }
    }

    /// Category set described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.categories, config.unknown_label.clone())
    }

    /// Known labels, excluding the unknown label.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label reported for files that match no category.
    pub fn unknown_label(&self) -> &str {
        &self.unknown_label
    }

    /// Labels offered to the model, unknown label last.
    pub fn prompt_labels(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.unknown_label.as_str()))
    }

    /// Map a raw label from the model onto the taxonomy.
    pub fn classify_label(&self, raw: &str) -> Classification {
        let candidate = normalize_label(raw);
        if candidate == self.unknown_label {
            return Classification::Unknown(UnknownReason::Reported);
        }
        match self.labels.iter().find(|label| **label == candidate) {
            Some(label) => Classification::Category(label.clone()),
            None => Classification::Unknown(UnknownReason::Unrecognized),
        }
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Lower-case a label and strip decoration models tend to add (`**invoice**`, `"invoice".`).
fn normalize_label(raw: &str) -> String {
    raw.trim()
        .trim_end_matches('.')
        .trim_matches(|c: char| matches!(c, '*' | '`' | '"' | '\'') || c.is_whitespace())
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_and_dedupes_labels() {
        let set = CategorySet::new([" Invoice", "invoice", "", "Unknown File"], "Unknown File");
        assert_eq!(set.labels(), ["invoice".to_string()]);
        assert_eq!(set.unknown_label(), "unknown file");
    }

    #[test]
    fn classify_label_distinguishes_unknown_reasons() {
        let set = CategorySet::default();
        assert_eq!(
            set.classify_label(" Bank_Statement "),
            Classification::Category("bank_statement".into())
        );
        assert_eq!(
            set.classify_label("**invoice**."),
            Classification::Category("invoice".into())
        );
        assert_eq!(
            set.classify_label("unknown file"),
            Classification::Unknown(UnknownReason::Reported)
        );
        assert_eq!(
            set.classify_label("passport"),
            Classification::Unknown(UnknownReason::Unrecognized)
        );
        assert_eq!(
            set.classify_label(""),
            Classification::Unknown(UnknownReason::Unrecognized)
        );
    }

    #[test]
    fn prompt_labels_end_with_unknown() {
        let set = CategorySet::default();
        let labels: Vec<&str> = set.prompt_labels().collect();
        assert_eq!(
            labels,
            ["drivers_licence", "bank_statement", "invoice", "unknown file"]
        );
    }
}
