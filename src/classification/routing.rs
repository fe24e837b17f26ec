//! Group partitioning and batch construction.

use super::types::{ContentGroup, UploadedDocument};

/// Documents split by content group, each list in submission order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Partitioned {
    /// PDF documents.
    pub documents: Vec<UploadedDocument>,
    /// Natively supported raster images.
    pub images: Vec<UploadedDocument>,
    /// Everything else.
    pub texts: Vec<UploadedDocument>,
}

impl Partitioned {
    /// Documents belonging to `group`.
    pub fn group(&self, group: ContentGroup) -> &[UploadedDocument] {
        match group {
            ContentGroup::Document => &self.documents,
            ContentGroup::Image => &self.images,
            ContentGroup::Text => &self.texts,
        }
    }

    /// Total number of routed documents.
    pub fn len(&self) -> usize {
        self.documents.len() + self.images.len() + self.texts.len()
    }

    /// Whether no document was routed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Route every document into exactly one group.
pub fn partition(documents: impl IntoIterator<Item = UploadedDocument>) -> Partitioned {
    let mut partitioned = Partitioned::default();
    for document in documents {
        match ContentGroup::for_media_type(&document.media_type) {
            ContentGroup::Document => partitioned.documents.push(document),
            ContentGroup::Image => partitioned.images.push(document),
            ContentGroup::Text => partitioned.texts.push(document),
        }
    }
    partitioned
}

/// Consecutive chunks of at most `batch_size` documents.
///
/// A `batch_size` of zero is treated as one so a misconfigured value still makes progress.
pub fn batches(
    documents: &[UploadedDocument],
    batch_size: usize,
) -> impl Iterator<Item = &[UploadedDocument]> {
    documents.chunks(batch_size.max(1))
}
