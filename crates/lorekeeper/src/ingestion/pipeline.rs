//! Full-rebuild ingestion run over a content source

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;

use crate::config::LoreConfig;
use crate::error::Result;
use crate::providers::{ContentSource, EmbeddingProvider};
use crate::types::{Character, Document, DocumentFailure, IngestReport};

use super::indexer::Indexer;

/// A document waiting to be indexed; characters still need their full text
enum Pending {
    Ready(Document),
    Character(Character),
}

impl Pending {
    fn id(&self) -> &str {
        match self {
            Self::Ready(doc) => doc.id(),
            Self::Character(c) => &c.id,
        }
    }

    fn title(&self) -> &str {
        match self {
            Self::Ready(doc) => doc.title(),
            Self::Character(c) => &c.name,
        }
    }
}

enum Outcome {
    Indexed(usize),
    Empty,
    Failed(DocumentFailure),
}

/// Main ingestion pipeline
///
/// Each run drops and recreates the collection, then indexes every wiki page
/// and character. A failing document is reported and skipped; the rest of
/// the run continues.
pub struct IngestPipeline {
    source: Arc<dyn ContentSource>,
    embedder: Arc<dyn EmbeddingProvider>,
    indexer: Arc<Indexer>,
    parallel_documents: usize,
}

impl IngestPipeline {
    pub fn new(
        source: Arc<dyn ContentSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        indexer: Arc<Indexer>,
        parallel_documents: usize,
    ) -> Self {
        Self {
            source,
            embedder,
            indexer,
            parallel_documents: parallel_documents.max(1),
        }
    }

    /// Build from configuration with explicit collaborators
    pub fn from_config(
        config: &LoreConfig,
        source: Arc<dyn ContentSource>,
        embedder: Arc<dyn EmbeddingProvider>,
        indexer: Arc<Indexer>,
    ) -> Self {
        Self::new(source, embedder, indexer, config.ingestion.parallel_documents)
    }

    /// Rebuild the collection from the content source
    pub async fn run(&self) -> Result<IngestReport> {
        self.run_with_progress(|_, _| {}).await
    }

    /// Like `run`, calling `on_progress(done, total)` after each document
    pub async fn run_with_progress<F>(&self, on_progress: F) -> Result<IngestReport>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let start = Instant::now();
        tracing::info!("Starting ingestion from {}", self.source.name());

        let pages = self.source.list_wiki_pages().await?;
        let characters = self.source.list_characters().await?;

        // Only drop the old index once both listings are in hand
        self.indexer.ensure_collection(true).await?;

        let pending: Vec<Pending> = pages
            .into_iter()
            .map(|page| Pending::Ready(page.into()))
            .chain(characters.into_iter().map(Pending::Character))
            .collect();
        let total = pending.len();
        tracing::info!(
            "Ingesting {} documents into '{}'",
            total,
            self.indexer.collection()
        );

        let mut report = IngestReport {
            documents_seen: total,
            ..IngestReport::default()
        };

        let mut outcomes = stream::iter(pending)
            .map(|item| self.process(item))
            .buffer_unordered(self.parallel_documents);

        let mut done = 0usize;
        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Outcome::Indexed(points) => {
                    report.documents_indexed += 1;
                    report.points_written += points;
                }
                Outcome::Empty => report.documents_empty += 1,
                Outcome::Failed(failure) => report.failures.push(failure),
            }
            done += 1;
            on_progress(done, total);
        }

        report.processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Ingestion finished: {} indexed, {} empty, {} failed, {} points in {}ms",
            report.documents_indexed,
            report.documents_empty,
            report.failures.len(),
            report.points_written,
            report.processing_time_ms
        );
        Ok(report)
    }

    async fn process(&self, item: Pending) -> Outcome {
        let id = item.id().to_string();
        let title = item.title().to_string();

        let result = async {
            let document = match item {
                Pending::Ready(document) => document,
                Pending::Character(summary) => {
                    Document::from(self.source.get_character(&summary.id).await?)
                }
            };
            self.indexer
                .index_document(&document, self.embedder.as_ref())
                .await
        }
        .await;

        match result {
            Ok(0) => Outcome::Empty,
            Ok(points) => {
                tracing::debug!("Indexed '{}' ({} points)", title, points);
                Outcome::Indexed(points)
            }
            Err(e) => {
                tracing::warn!("Failed to ingest '{}' ({}): {}", title, id, e);
                Outcome::Failed(DocumentFailure {
                    document_id: id,
                    title,
                    error: e.to_string(),
                })
            }
        }
    }
}
