//! Parsing of free-text `filename: category` replies.
//!
//! The model is asked for one `filename: category` line per document but the format is not
//! guaranteed: names may be decorated, paraphrased, or missing entirely. Parsing is total over
//! the batch; every filename receives a result, defaulting to unknown.

use super::categories::CategorySet;
use super::types::{Classification, ClassificationResults, UnknownReason, UploadedDocument};

/// Map every document of `batch` to a classification extracted from `response`.
///
/// Lines without a colon are ignored. The part before the first colon is matched against the
/// batch filenames: an exact match wins, then an exact case-insensitive match, otherwise the
/// longest filename contained in it case-insensitively (earlier batch entries win ties). The first line attributed to a filename
/// decides its result; later lines for the same file are ignored.
pub fn parse_response(
    response: &str,
    batch: &[UploadedDocument],
    categories: &CategorySet,
) -> ClassificationResults {
    let names: Vec<&str> = batch
        .iter()
        .map(|document| document.filename.as_str())
        .collect();
    let lowered: Vec<String> = names.iter().map(|name| name.to_lowercase()).collect();
    let mut assigned: Vec<Option<Classification>> = vec![None; batch.len()];

    for line in response.lines() {
        let Some((name_part, label_part)) = line.split_once(':') else {
            continue;
        };
        let Some(idx) = match_filename(clean_filename_part(name_part), &names, &lowered) else {
            tracing::trace!(line, "Reply line matched no batch filename");
            continue;
        };
        if assigned[idx].is_none() {
            assigned[idx] = Some(categories.classify_label(label_part));
        }
    }

    batch
        .iter()
        .zip(assigned)
        .map(|(document, outcome)| {
            (
                document.filename.clone(),
                outcome.unwrap_or(Classification::Unknown(UnknownReason::Unmatched)),
            )
        })
        .collect()
}

fn match_filename(candidate: &str, names: &[&str], lowered: &[String]) -> Option<usize> {
    if candidate.is_empty() {
        return None;
    }
    if let Some(idx) = names.iter().position(|name| *name == candidate) {
        return Some(idx);
    }
    let candidate = candidate.to_lowercase();
    if let Some(idx) = lowered.iter().position(|name| *name == candidate) {
        return Some(idx);
    }

    let mut best: Option<usize> = None;
    for (idx, name) in lowered.iter().enumerate() {
        if name.is_empty() || !candidate.contains(name.as_str()) {
            continue;
        }
        if best.is_none_or(|current| name.len() > lowered[current].len()) {
            best = Some(idx);
        }
    }
    best
}

/// Strip list markers and quoting from the filename part, keeping its case.
fn clean_filename_part(raw: &str) -> &str {
    let mut part = raw.trim();
    part = part.trim_start_matches(['-', '*', '•']).trim_start();

    if let Some((marker, rest)) = part.split_once(char::is_whitespace) {
        let is_ordinal = marker.len() > 1
            && (marker.ends_with('.') || marker.ends_with(')'))
            && marker[..marker.len() - 1].chars().all(|c| c.is_ascii_digit());
        if is_ordinal {
            part = rest.trim_start();
        }
    }

    part.trim_matches(|c: char| matches!(c, '*' | '`' | '"' | '\'') || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::prepare::prepare_document;

    fn batch(names: &[&str]) -> Vec<UploadedDocument> {
        names
            .iter()
            .map(|name| prepare_document(*name, b"content"))
            .collect()
    }

    fn category(label: &str) -> Classification {
        Classification::Category(label.into())
    }

    #[test]
    fn parses_one_line_per_file() {
        let documents = batch(&["a.pdf", "b.pdf"]);
        let results = parse_response(
            "a.pdf: drivers_licence\nb.pdf: invoice",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results["a.pdf"], category("drivers_licence"));
        assert_eq!(results["b.pdf"], category("invoice"));
    }

    #[test]
    fn reply_without_colons_defaults_every_file() {
        let documents = batch(&["scan", "other.txt"]);
        let results = parse_response(
            "I cannot classify these files.",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results.len(), 2);
        assert!(
            results
                .values()
                .all(|outcome| *outcome == Classification::Unknown(UnknownReason::Unmatched))
        );
    }

    #[test]
    fn matches_case_insensitively_and_preserves_original_names() {
        let documents = batch(&["Invoice-March.PDF"]);
        let results = parse_response(
            "1. **invoice-march.pdf**: Invoice",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results["Invoice-March.PDF"], category("invoice"));
    }

    #[test]
    fn paraphrased_lines_fall_back_to_substring_match() {
        let documents = batch(&["statement.pdf"]);
        let results = parse_response(
            "The file statement.pdf appears to be: bank_statement",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results["statement.pdf"], category("bank_statement"));
    }

    #[test]
    fn first_line_for_a_file_wins() {
        let documents = batch(&["a.pdf"]);
        let results = parse_response(
            "a.pdf: invoice\na.pdf: bank_statement",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results["a.pdf"], category("invoice"));
    }

    #[test]
    fn exact_match_beats_shorter_substring() {
        let documents = batch(&["a.pdf", "data.pdf"]);
        let results = parse_response(
            "data.pdf: invoice\na.pdf: drivers_licence",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results["data.pdf"], category("invoice"));
        assert_eq!(results["a.pdf"], category("drivers_licence"));
    }

    #[test]
    fn longest_substring_wins_for_decorated_names() {
        let documents = batch(&["a.pdf", "data.pdf"]);
        let results = parse_response(
            "File data.pdf: bank_statement",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results["data.pdf"], category("bank_statement"));
        assert_eq!(
            results["a.pdf"],
            Classification::Unknown(UnknownReason::Unmatched)
        );
    }

    #[test]
    fn labels_outside_the_set_become_unknown() {
        let documents = batch(&["a.pdf", "b.pdf"]);
        let results = parse_response(
            "a.pdf: passport\nb.pdf: unknown file",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(
            results["a.pdf"],
            Classification::Unknown(UnknownReason::Unrecognized)
        );
        assert_eq!(
            results["b.pdf"],
            Classification::Unknown(UnknownReason::Reported)
        );
    }

    #[test]
    fn numeric_filenames_are_not_mistaken_for_list_markers() {
        assert_eq!(clean_filename_part("1.pdf"), "1.pdf");
        assert_eq!(clean_filename_part("2) 1.pdf"), "1.pdf");
        assert_eq!(clean_filename_part(" - `Scan.png` "), "Scan.png");
    }

    #[test]
    fn names_differing_only_in_case_resolve_separately() {
        let documents = batch(&["Scan.pdf", "scan.pdf"]);
        let results = parse_response(
            "scan.pdf: invoice\nScan.pdf: bank_statement",
            &documents,
            &CategorySet::default(),
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results["Scan.pdf"], category("bank_statement"));
        assert_eq!(results["scan.pdf"], category("invoice"));
    }
}
