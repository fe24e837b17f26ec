//! Classification service coordinating preparation, routing, and the per-group classifiers.

use super::group::{ClassifierSettings, GroupClassifier};
use super::prepare::prepare_document;
use super::routing::partition;
use super::strategy::{DocumentAttachment, ImageAttachment, TextExcerpt};
use super::types::{
    Classification, ClassificationError, ClassificationResults, ContentGroup, UploadedDocument,
};
use crate::anthropic::{ClassificationClient, get_classification_client};
use crate::config::Config;
use crate::metrics::{ClassifierMetrics, MetricsSnapshot};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A raw file handed over by the upload surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Original filename as submitted.
    pub filename: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Pair a filename with its content.
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }
}

/// Runs the full pipeline for one request: prepare, partition, classify per group, merge.
///
/// The provider client is constructed once and owned by the service; when it is unavailable
/// (missing credential, client setup failure) every file of every request resolves to the
/// same error. The service never returns an error: the result always holds exactly one entry
/// per distinct submitted filename.
pub struct ClassificationService {
    client: Result<Arc<dyn ClassificationClient>, ClassificationError>,
    settings: ClassifierSettings,
    metrics: Arc<ClassifierMetrics>,
}

/// Abstraction over the classification pipeline used by external surfaces (HTTP, CLI).
#[async_trait]
pub trait ClassificationApi: Send + Sync {
    /// Classify a batch of uploads, returning one result per distinct filename.
    async fn classify_uploads(&self, uploads: Vec<FileUpload>) -> ClassificationResults;

    /// Label rendered for files without a category.
    fn unknown_label(&self) -> &str;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl ClassificationService {
    /// Build a service from configuration, constructing the provider client.
    pub fn new(config: &Config) -> Self {
        let client = match get_classification_client(config) {
            Ok(Some(client)) => Ok(client),
            Ok(None) => Err(ClassificationError::MissingCredential),
            Err(error) => {
                tracing::error!(%error, "Failed to initialize classification client");
                Err(ClassificationError::ClientSetup(error.to_string()))
            }
        };
        Self {
            client,
            settings: ClassifierSettings::from_config(config),
            metrics: Arc::new(ClassifierMetrics::new()),
        }
    }

    /// Build a service around an explicitly supplied client.
    pub fn with_client(client: Arc<dyn ClassificationClient>, settings: ClassifierSettings) -> Self {
        Self {
            client: Ok(client),
            settings,
            metrics: Arc::new(ClassifierMetrics::new()),
        }
    }

    /// Settings applied to every request.
    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    /// Prepare raw uploads and classify them.
    pub async fn classify_uploads(&self, uploads: Vec<FileUpload>) -> ClassificationResults {
        let documents = dedupe_by_filename(uploads)
            .into_iter()
            .map(|upload| prepare_document(upload.filename, &upload.bytes))
            .collect();
        self.classify_documents(documents).await
    }

    /// Classify already prepared documents.
    pub async fn classify_documents(
        &self,
        documents: Vec<UploadedDocument>,
    ) -> ClassificationResults {
        let client = match &self.client {
            Ok(client) => client.as_ref(),
            Err(error) => {
                tracing::warn!(%error, files = documents.len(), "Classification unavailable");
                let outcome = Classification::failed(error);
                return documents
                    .into_iter()
                    .map(|document| (document.filename, outcome.clone()))
                    .collect();
            }
        };

        let expected = documents
            .iter()
            .map(|document| document.filename.as_str())
            .collect::<HashSet<_>>()
            .len();
        let partitioned = partition(documents);
        tracing::info!(
            documents = partitioned.documents.len(),
            images = partitioned.images.len(),
            texts = partitioned.texts.len(),
            batch_size = self.settings.batch_size,
            "Classifying uploads"
        );

        let mut results = ClassificationResults::new();
        for group in ContentGroup::ALL {
            let members = partitioned.group(group);
            if members.is_empty() {
                continue;
            }
            let outcome = match group {
                ContentGroup::Document => {
                    GroupClassifier::new(DocumentAttachment, client, &self.settings, &self.metrics)
                        .classify(members)
                        .await
                }
                ContentGroup::Image => {
                    GroupClassifier::new(ImageAttachment, client, &self.settings, &self.metrics)
                        .classify(members)
                        .await
                }
                ContentGroup::Text => {
                    let strategy = TextExcerpt {
                        max_chars: self.settings.text_truncation_chars,
                    };
                    GroupClassifier::new(strategy, client, &self.settings, &self.metrics)
                        .classify(members)
                        .await
                }
            };
            results.extend(outcome);
        }

        debug_assert_eq!(results.len(), expected);
        let failed = results.values().filter(|outcome| outcome.is_failure()).count();
        tracing::info!(files = results.len(), failed, "Classification finished");
        results
    }

    /// Return the current classification metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Collapse repeated filenames; the last upload wins and keeps the first position.
fn dedupe_by_filename(uploads: Vec<FileUpload>) -> Vec<FileUpload> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<FileUpload> = Vec::with_capacity(uploads.len());
    for upload in uploads {
        match positions.get(&upload.filename) {
            Some(&idx) => {
                tracing::debug!(file = %upload.filename, "Duplicate filename replaced");
                unique[idx] = upload;
            }
            None => {
                positions.insert(upload.filename.clone(), unique.len());
                unique.push(upload);
            }
        }
    }
    unique
}

#[async_trait]
impl ClassificationApi for ClassificationService {
    async fn classify_uploads(&self, uploads: Vec<FileUpload>) -> ClassificationResults {
        ClassificationService::classify_uploads(self, uploads).await
    }

    fn unknown_label(&self) -> &str {
        self.settings.categories.unknown_label()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        ClassificationService::metrics_snapshot(self)
    }
}
