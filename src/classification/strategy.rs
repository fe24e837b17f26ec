//! Per-group request shaping.
//!
//! The three content groups share one batch pipeline and differ only in how a document is
//! embedded in the request and how the instruction prompt is worded. Each group gets a
//! [`BatchStrategy`] implementation carrying exactly those differences.

use super::categories::CategorySet;
use super::types::{ContentGroup, UploadedDocument};
use crate::anthropic::{ContentBlock, MediaSource};

/// Wording of the instruction segment for one group.
#[derive(Debug, Clone, Copy)]
pub struct PromptStyle {
    /// Singular noun used for the items ("file", "image").
    pub noun: &'static str,
    /// Filename shown in the example answer line.
    pub example_filename: &'static str,
}

/// Content embedding and prompt rendering for one content group.
pub trait BatchStrategy: Send + Sync {
    /// Group handled by this strategy.
    fn group(&self) -> ContentGroup;

    /// Prompt wording for the group.
    fn style(&self) -> PromptStyle;

    /// Embed one document as a request content block.
    fn embed(&self, document: &UploadedDocument) -> ContentBlock;

    /// System prompt framing the classifier role.
    fn system_prompt(&self) -> String {
        let style = self.style();
        format!(
            "You are a document classification expert. Analyze each {} and determine its type. Be concise.",
            style.noun
        )
    }

    /// Instruction text listing allowed categories, the answer format, and the batch filenames.
    fn render_instructions(&self, categories: &CategorySet, batch: &[UploadedDocument]) -> String {
        let PromptStyle {
            noun,
            example_filename,
        } = self.style();
        let example_label = categories
            .labels()
            .first()
            .map(String::as_str)
            .unwrap_or(categories.unknown_label());

        let mut text =
            format!("Please analyze each {noun} and classify it into one of the following categories:\n");
        for label in categories.prompt_labels() {
            text.push_str(&format!("- {label}\n"));
        }
        text.push_str(&format!(
            "\nFor each {noun}, respond with the filename followed by a colon and the category, \
             one {noun} per line.\n\
             If you can't determine the type, classify it as '{unknown}'.\n\
             Example: {example_filename}: {example_label}\n\n\
             Here are the {noun}s to classify:",
            unknown = categories.unknown_label(),
        ));
        let title = capitalize(noun);
        for (idx, document) in batch.iter().enumerate() {
            text.push_str(&format!("\n{title} {}: {}", idx + 1, document.filename));
        }
        text
    }
}

/// PDFs attached as whole documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentAttachment;

impl BatchStrategy for DocumentAttachment {
    fn group(&self) -> ContentGroup {
        ContentGroup::Document
    }

    fn style(&self) -> PromptStyle {
        PromptStyle {
            noun: "file",
            example_filename: "file1.pdf",
        }
    }

    fn embed(&self, document: &UploadedDocument) -> ContentBlock {
        ContentBlock::Document {
            source: MediaSource::base64(&document.media_type, &document.encoded),
        }
    }
}

/// Raster images attached with their own media type.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageAttachment;

impl BatchStrategy for ImageAttachment {
    fn group(&self) -> ContentGroup {
        ContentGroup::Image
    }

    fn style(&self) -> PromptStyle {
        PromptStyle {
            noun: "image",
            example_filename: "image1.jpg",
        }
    }

    fn embed(&self, document: &UploadedDocument) -> ContentBlock {
        ContentBlock::Image {
            source: MediaSource::base64(&document.media_type, &document.encoded),
        }
    }
}

/// Everything else, inlined as a decoded text prefix.
#[derive(Debug, Clone, Copy)]
pub struct TextExcerpt {
    /// Number of characters kept from the decoded content.
    pub max_chars: usize,
}

impl BatchStrategy for TextExcerpt {
    fn group(&self) -> ContentGroup {
        ContentGroup::Text
    }

    fn style(&self) -> PromptStyle {
        PromptStyle {
            noun: "file",
            example_filename: "file1.txt",
        }
    }

    fn embed(&self, document: &UploadedDocument) -> ContentBlock {
        match text_excerpt(document, self.max_chars) {
            Ok(excerpt) => ContentBlock::text(format!(
                "\nFile: {}\nContent:\n{excerpt}",
                document.filename
            )),
            Err(error) => {
                tracing::debug!(file = %document.filename, %error, "Content not readable as text");
                ContentBlock::text(format!(
                    "\nFile: {}\nNote: Unable to read content as text. Error: {error}",
                    document.filename
                ))
            }
        }
    }
}

/// Decode a document as lossy UTF-8 and keep its first `max_chars` characters.
pub fn text_excerpt(
    document: &UploadedDocument,
    max_chars: usize,
) -> Result<String, base64::DecodeError> {
    let bytes = document.decode()?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(truncate_chars(&text, max_chars).to_string())
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
