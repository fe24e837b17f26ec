//! Batch pipeline shared by all content groups.

use super::categories::CategorySet;
use super::parser::parse_response;
use super::routing::batches;
use super::strategy::BatchStrategy;
use super::types::{Classification, ClassificationError, ClassificationResults, UploadedDocument};
use crate::anthropic::{ClassificationClient, ContentBlock, MessagesRequest};
use crate::config::Config;
use crate::metrics::ClassifierMetrics;
use futures_util::stream::{self, StreamExt};

/// Request-shaping knobs shared by every group classifier.
#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    /// Model identifier sent with each request.
    pub model: String,
    /// Response length ceiling.
    pub max_tokens: u32,
    /// Maximum documents per remote call.
    pub batch_size: usize,
    /// Characters of text content sent per document.
    pub text_truncation_chars: usize,
    /// Batches of one group allowed in flight at once.
    pub max_concurrent_batches: usize,
    /// Allowed labels.
    pub categories: CategorySet,
}

impl ClassifierSettings {
    /// Settings described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.anthropic_model.clone(),
            max_tokens: config.max_tokens,
            batch_size: config.batch_size,
            text_truncation_chars: config.text_truncation_chars,
            max_concurrent_batches: config.max_concurrent_batches,
            categories: CategorySet::from_config(config),
        }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Classifies the documents of one content group in bounded batches.
pub struct GroupClassifier<'a, S> {
    strategy: S,
    client: &'a dyn ClassificationClient,
    settings: &'a ClassifierSettings,
    metrics: &'a ClassifierMetrics,
}

impl<'a, S: BatchStrategy> GroupClassifier<'a, S> {
    /// Bind a strategy to a client, settings, and metrics sink.
    pub fn new(
        strategy: S,
        client: &'a dyn ClassificationClient,
        settings: &'a ClassifierSettings,
        metrics: &'a ClassifierMetrics,
    ) -> Self {
        Self {
            strategy,
            client,
            settings,
            metrics,
        }
    }

    /// Build the single-turn request for one batch.
    pub fn build_request(&self, batch: &[UploadedDocument]) -> MessagesRequest {
        let mut content = Vec::with_capacity(batch.len() + 1);
        content.push(ContentBlock::text(
            self.strategy
                .render_instructions(&self.settings.categories, batch),
        ));
        content.extend(batch.iter().map(|document| self.strategy.embed(document)));

        MessagesRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            system: self.strategy.system_prompt(),
            content,
        }
    }

    /// Classify every document of the group; the result has one entry per document.
    pub async fn classify(&self, documents: &[UploadedDocument]) -> ClassificationResults {
        let pending: Vec<_> = batches(documents, self.settings.batch_size)
            .enumerate()
            .map(|(index, batch)| self.classify_batch(index, batch))
            .collect();
        let outcomes: Vec<ClassificationResults> = stream::iter(pending)
            .buffered(self.settings.max_concurrent_batches.max(1))
            .collect()
            .await;

        outcomes.into_iter().flatten().collect()
    }

    /// Classify one batch; a failed remote call fails every document of the batch.
    pub async fn classify_batch(
        &self,
        index: usize,
        batch: &[UploadedDocument],
    ) -> ClassificationResults {
        let group = self.strategy.group();
        tracing::debug!(%group, batch = index, size = batch.len(), "Submitting batch");

        let request = self.build_request(batch);
        match self.client.complete(request).await {
            Ok(reply) => {
                self.metrics.record_batch(batch.len() as u64, true);
                let results = parse_response(&reply, batch, &self.settings.categories);
                tracing::info!(%group, batch = index, size = batch.len(), "Batch classified");
                results
            }
            Err(error) => {
                self.metrics.record_batch(batch.len() as u64, false);
                let error = ClassificationError::from(error);
                tracing::warn!(%group, batch = index, size = batch.len(), %error, "Batch failed");
                let outcome = Classification::failed(&error);
                batch
                    .iter()
                    .map(|document| (document.filename.clone(), outcome.clone()))
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anthropic::ClientError;
    use crate::classification::prepare::prepare_document;
    use crate::classification::strategy::{DocumentAttachment, TextExcerpt};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Replies with the next scripted answer; `None` entries fail the call.
    struct ScriptedClient {
        replies: Mutex<Vec<Option<String>>>,
        requests: Mutex<Vec<MessagesRequest>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Option<&str>>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().rev().map(|r| r.map(str::to_string)).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ClassificationClient for ScriptedClient {
        async fn complete(&self, request: MessagesRequest) -> Result<String, ClientError> {
            self.requests.lock().unwrap().push(request);
            match self.replies.lock().unwrap().pop().flatten() {
                Some(reply) => Ok(reply),
                None => Err(ClientError::Transport("connection reset".into())),
            }
        }
    }

    #[test]
    fn request_has_instructions_then_one_block_per_document() {
        let client = ScriptedClient::new(vec![]);
        let settings = ClassifierSettings::default();
        let metrics = ClassifierMetrics::new();
        let classifier = GroupClassifier::new(DocumentAttachment, &client, &settings, &metrics);
        let batch = [prepare_document("a.pdf", b"1"), prepare_document("b.pdf", b"2")];

        let request = classifier.build_request(&batch);

        assert_eq!(request.model, settings.model);
        assert_eq!(request.max_tokens, 1024);
        assert_eq!(request.content.len(), 3);
        assert!(request.content[0].as_text().is_some_and(|text| text.contains("File 2: b.pdf")));
        assert!(matches!(request.content[1], ContentBlock::Document { .. }));
        assert!(matches!(request.content[2], ContentBlock::Document { .. }));
    }

    #[tokio::test]
    async fn failed_batch_only_affects_its_documents() {
        let client = ScriptedClient::new(vec![
            Some("0.txt: invoice\n1.txt: invoice"),
            None,
            Some("4.txt: bank_statement"),
        ]);
        let settings = ClassifierSettings {
            batch_size: 2,
            ..ClassifierSettings::default()
        };
        let metrics = ClassifierMetrics::new();
        let classifier =
            GroupClassifier::new(TextExcerpt { max_chars: 100 }, &client, &settings, &metrics);
        let documents: Vec<_> = (0..5)
            .map(|idx| prepare_document(format!("{idx}.txt"), b"text"))
            .collect();

        let results = classifier.classify(&documents).await;

        assert_eq!(results.len(), 5);
        assert_eq!(results["0.txt"], Classification::Category("invoice".into()));
        assert_eq!(results["1.txt"], Classification::Category("invoice".into()));
        for name in ["2.txt", "3.txt"] {
            let Classification::Failed(message) = &results[name] else {
                panic!("expected failure for {name}: {:?}", results[name]);
            };
            assert!(message.contains("connection reset"), "{message}");
        }
        assert_eq!(
            results["4.txt"],
            Classification::Category("bank_statement".into())
        );

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches_submitted, 3);
        assert_eq!(snapshot.batches_failed, 1);
        assert_eq!(client.requests.lock().unwrap().len(), 3);
    }
}
