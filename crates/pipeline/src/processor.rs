//! Document and batch processing with the memory lifecycle.
//!
//! One document: lock key → load memory → chunk → run stages → reassemble →
//! persist. A batch runs its documents concurrently; documents sharing a
//! memory key queue on that key's lock in submission order.

use chrono::Utc;
use futures::future::join_all;
use scrivener_config::PipelineSettings;
use scrivener_core::{
    Document, DocumentOutput, Error, Memory, MemoryStore, Provider, Result, StageLog,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::chunker::Chunker;
use crate::reassemble::reassemble;
use crate::runner::StageRunner;

// ── Key locks ───────────────────────────────────────────────────────────────

/// One async mutex per memory key.
///
/// Held across load → process → persist so two documents on the same key
/// never interleave. Tokio mutexes are fair, so waiters are served in the
/// order they started waiting. An entry is dropped once its last holder
/// releases it and nobody is queued.
#[derive(Clone, Default)]
pub struct KeyLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.entry(key.to_string()).or_default().clone()
        };
        KeyGuard {
            guard: Some(lock.lock_owned().await),
            key: key.to_string(),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds a key's lock; releasing it prunes the map entry when unused.
pub struct KeyGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map's own reference left: no holder, no waiter.
        if locks.get(&self.key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.key);
        }
    }
}

// ── Memory lifecycle ────────────────────────────────────────────────────────

/// How a document's memory was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrigin {
    /// Read from the store.
    Stored,
    /// No record yet for the key.
    Absent,
    /// The store failed to return the record. The run starts fresh but must
    /// not write back over whatever is stored.
    Unreadable,
}

impl MemoryOrigin {
    pub fn may_persist(self) -> bool {
        self != Self::Unreadable
    }
}

/// Load the record for `key`. Absent or unreadable records start fresh.
pub async fn load_memory(store: &dyn MemoryStore, key: &str) -> (Memory, MemoryOrigin) {
    match store.get(key).await {
        Ok(Some(memory)) => {
            debug!(key, version = memory.version, store = store.name(), "Memory loaded");
            (memory, MemoryOrigin::Stored)
        }
        Ok(None) => {
            debug!(key, store = store.name(), "No memory for key, starting fresh");
            (Memory::new(), MemoryOrigin::Absent)
        }
        Err(e) => {
            warn!(key, store = store.name(), error = %e, "Memory load failed, starting fresh");
            (Memory::new(), MemoryOrigin::Unreadable)
        }
    }
}

/// Bump the version and save. Returns `false` (and leaves `memory` as it
/// was) when the store rejects the write.
pub async fn persist_memory(store: &dyn MemoryStore, key: &str, memory: &mut Memory) -> bool {
    let previous_version = memory.version;
    let previous_updated = memory.last_updated;

    memory.version = previous_version.saturating_add(1);
    memory.last_updated = Utc::now();

    match store.put(key, memory).await {
        Ok(()) => {
            debug!(key, version = memory.version, "Memory persisted");
            true
        }
        Err(e) => {
            warn!(key, store = store.name(), error = %e, "Memory persist failed");
            memory.version = previous_version;
            memory.last_updated = previous_updated;
            false
        }
    }
}

// ── Pipeline ────────────────────────────────────────────────────────────────

/// Outcome of one batch item.
#[derive(Debug)]
pub enum BatchItemResult {
    Completed { index: usize, output: DocumentOutput },
    Failed { index: usize, error: Error },
}

impl BatchItemResult {
    pub fn index(&self) -> usize {
        match self {
            Self::Completed { index, .. } | Self::Failed { index, .. } => *index,
        }
    }

    pub fn output(&self) -> Option<&DocumentOutput> {
        match self {
            Self::Completed { output, .. } => Some(output),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// The refinement pipeline bound to a provider, a store and frozen settings.
pub struct Pipeline {
    provider: Arc<dyn Provider>,
    store: Arc<dyn MemoryStore>,
    settings: PipelineSettings,
    locks: KeyLocks,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn MemoryStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            provider,
            store,
            settings,
            locks: KeyLocks::new(),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// The memory key a document runs under.
    pub fn memory_key_for<'a>(&'a self, document: &'a Document) -> &'a str {
        document
            .memory_key
            .as_deref()
            .unwrap_or(&self.settings.memory_key)
    }

    pub async fn load_memory(&self, key: &str) -> (Memory, MemoryOrigin) {
        load_memory(self.store.as_ref(), key).await
    }

    pub async fn persist(&self, key: &str, memory: &mut Memory) -> bool {
        persist_memory(self.store.as_ref(), key, memory).await
    }

    /// Process one document end to end.
    ///
    /// Chunking and provider errors abort the document before anything is
    /// persisted. A failed save does not: the output reports
    /// `memory_persisted = false`. Neither does a failed load, which also
    /// skips the save so the stored record is left untouched.
    pub async fn process_document(&self, document: &Document) -> Result<DocumentOutput> {
        let key = self.memory_key_for(document).to_string();
        let run_id = Uuid::new_v4();
        let span = info_span!("document", key = %key, run_id = %run_id);

        self.run_document(&key, document).instrument(span).await
    }

    async fn run_document(&self, key: &str, document: &Document) -> Result<DocumentOutput> {
        let _guard = self.locks.acquire(key).await;
        let (mut memory, origin) = self.load_memory(key).await;

        let chunks = Chunker::new(
            self.settings.chunk_size,
            self.settings.overlap_chars,
            self.settings.split_method,
        )
        .chunk(&document.text)?;

        let mut log = StageLog::default();
        let edited = StageRunner::new(self.provider.as_ref(), &self.settings)
            .run(&chunks, &mut memory, &mut log)
            .await?;

        let final_text = reassemble(&edited, self.settings.overlap_chars);
        let memory_persisted = if origin.may_persist() {
            self.persist(key, &mut memory).await
        } else {
            warn!(key, "Stored memory was unreadable, not overwriting it");
            false
        };

        info!(
            chunks = chunks.len(),
            input_chars = document.text.chars().count(),
            output_chars = final_text.chars().count(),
            memory_version = memory.version,
            memory_persisted,
            "Document refined"
        );

        Ok(DocumentOutput {
            original_text: document.preview(),
            final_text,
            chunks_count: chunks.len(),
            stage_outputs: self.settings.verbose.then(|| log.by_stage()),
            memory_version: memory.version,
            memory_persisted,
        })
    }

    /// Process documents concurrently; one failure never affects the others.
    ///
    /// Results come back in input order.
    pub async fn process_batch(&self, documents: &[Document]) -> Vec<BatchItemResult> {
        let runs = documents.iter().enumerate().map(|(index, document)| async move {
            match self.process_document(document).await {
                Ok(output) => BatchItemResult::Completed { index, output },
                Err(error) => {
                    warn!(index, error = %error, "Document failed");
                    BatchItemResult::Failed { index, error }
                }
            }
        });

        let results = join_all(runs).await;
        let failed = results.iter().filter(|r| r.is_failed()).count();
        info!(total = results.len(), failed, "Batch finished");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scrivener_core::{
        GenerationRequest, MemoryError, PipelineError, ProviderError, SplitMethod, StageConfig,
    };
    use scrivener_memory::InMemoryStore;
    use serde_json::{Value, json};

    use crate::prompt::{TEXT_CLOSE, TEXT_OPEN};

    /// Returns the text under edit untouched; fails on text containing "FAIL".
    struct EchoProvider {
        prompts: Mutex<Vec<String>>,
    }

    impl EchoProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, request: GenerationRequest) -> std::result::Result<Value, ProviderError> {
            let start = request.prompt.find(TEXT_OPEN).unwrap() + TEXT_OPEN.len();
            let end = request.prompt.rfind(TEXT_CLOSE).unwrap();
            let text = request.prompt[start..end].to_string();
            self.prompts.lock().unwrap().push(request.prompt.clone());
            if text.contains("FAIL") {
                return Err(ProviderError::ApiError {
                    status_code: 500,
                    message: "scripted failure".into(),
                });
            }
            Ok(json!({ "message": { "content": text } }))
        }
    }

    /// Store whose reads and/or writes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryStore,
        fail_get: bool,
        fail_put: bool,
    }

    #[async_trait]
    impl MemoryStore for FlakyStore {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn get(&self, key: &str) -> std::result::Result<Option<Memory>, MemoryError> {
            if self.fail_get {
                return Err(MemoryError::Storage("read refused".into()));
            }
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, memory: &Memory) -> std::result::Result<(), MemoryError> {
            if self.fail_put {
                return Err(MemoryError::Storage("write refused".into()));
            }
            self.inner.put(key, memory).await
        }

        async fn delete(&self, key: &str) -> std::result::Result<bool, MemoryError> {
            self.inner.delete(key).await
        }
    }

    fn settings(chunk_size: usize, overlap: usize) -> PipelineSettings {
        PipelineSettings::new("echo-model", chunk_size, overlap, vec![StageConfig::new("identity", "Return as is.")])
            .unwrap()
    }

    #[tokio::test]
    async fn identity_stage_round_trips_document() {
        let text: String = (0..38).map(|i| format!("Line {i:02} of the manuscript. ")).collect();
        let settings = settings(300, 50).with_split_method(SplitMethod::Fixed);
        let pipeline = Pipeline::new(EchoProvider::new(), Arc::new(InMemoryStore::new()), settings);

        let output = pipeline.process_document(&Document::new(text.clone())).await.unwrap();

        assert_eq!(output.chunks_count, 4);
        assert_eq!(output.final_text, text);
        assert_eq!(output.memory_version, 1);
        assert!(output.memory_persisted);
        assert!(output.stage_outputs.is_none());
    }

    #[tokio::test]
    async fn version_increments_once_per_document() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = Pipeline::new(EchoProvider::new(), store.clone(), settings(100, 10));
        let long = "Many words in a row. ".repeat(30);

        let first = pipeline.process_document(&Document::new(long.clone())).await.unwrap();
        let second = pipeline.process_document(&Document::new(long)).await.unwrap();

        assert!(first.chunks_count > 3);
        assert_eq!(first.memory_version, 1);
        assert_eq!(second.memory_version, 2);
        assert_eq!(store.get("default").await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn failed_persist_is_reported_not_raised() {
        let store = Arc::new(FlakyStore {
            fail_put: true,
            ..Default::default()
        });
        let pipeline = Pipeline::new(EchoProvider::new(), store, settings(100, 10));

        let output = pipeline.process_document(&Document::new("Short text.")).await.unwrap();

        assert_eq!(output.final_text, "Short text.");
        assert!(!output.memory_persisted);
        assert_eq!(output.memory_version, 0);
    }

    #[tokio::test]
    async fn persist_failure_restores_bookkeeping() {
        let store = FlakyStore {
            fail_put: true,
            ..Default::default()
        };
        let mut memory = Memory::new();
        memory.version = 7;
        let before = memory.last_updated;

        assert!(!persist_memory(&store, "k", &mut memory).await);
        assert_eq!(memory.version, 7);
        assert_eq!(memory.last_updated, before);
    }

    #[tokio::test]
    async fn unreadable_memory_starts_fresh() {
        let store = FlakyStore {
            fail_get: true,
            ..Default::default()
        };
        let (memory, origin) = load_memory(&store, "k").await;
        assert_eq!(memory.version, 0);
        assert!(memory.tail().is_empty());
        assert_eq!(origin, MemoryOrigin::Unreadable);
    }

    #[tokio::test]
    async fn unreadable_memory_is_not_overwritten() {
        let inner = InMemoryStore::new();
        let mut stored = Memory::new();
        stored.version = 5;
        stored.glossary.term_map.insert("Hobbit".into(), "Halfling".into());
        inner.put("default", &stored).await.unwrap();
        let store = Arc::new(FlakyStore {
            inner,
            fail_get: true,
            fail_put: false,
        });
        let pipeline = Pipeline::new(EchoProvider::new(), store.clone(), settings(100, 10));

        let output = pipeline.process_document(&Document::new("Hello.")).await.unwrap();

        assert_eq!(output.final_text, "Hello.");
        assert!(!output.memory_persisted);
        let kept = store.inner.get("default").await.unwrap().unwrap();
        assert_eq!(kept.version, 5);
        assert_eq!(kept.glossary.term_map.len(), 1);
    }

    #[tokio::test]
    async fn verbose_run_reports_stage_outputs() {
        let settings = settings(100, 10).with_verbose(true);
        let pipeline = Pipeline::new(EchoProvider::new(), Arc::new(InMemoryStore::new()), settings);

        let output = pipeline.process_document(&Document::new("Tiny.")).await.unwrap();

        let stages = output.stage_outputs.unwrap();
        assert_eq!(stages[&1].len(), 1);
        assert_eq!(stages[&1][0].output, "Tiny.");
    }

    #[tokio::test]
    async fn boundary_stall_aborts_document() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = Pipeline::new(EchoProvider::new(), store.clone(), settings(100, 60));
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(100));

        let err = pipeline.process_document(&Document::new(text)).await.unwrap_err();

        assert!(matches!(err, Error::Pipeline(PipelineError::BoundaryStall { .. })));
        assert!(store.get("default").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn document_key_overrides_default() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = Pipeline::new(EchoProvider::new(), store.clone(), settings(100, 10));

        pipeline
            .process_document(&Document::new("Keyed.").with_memory_key("novel-7"))
            .await
            .unwrap();

        assert!(store.get("novel-7").await.unwrap().is_some());
        assert!(store.get("default").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn batch_isolates_failures() {
        let store = Arc::new(InMemoryStore::new());
        let pipeline = Pipeline::new(EchoProvider::new(), store, settings(100, 10));
        let docs = vec![
            Document::new("Fine one.").with_memory_key("a"),
            Document::new("This will FAIL.").with_memory_key("b"),
            Document::new("Fine two.").with_memory_key("c"),
        ];

        let results = pipeline.process_batch(&docs).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].output().unwrap().final_text, "Fine one.");
        assert!(matches!(
            &results[1],
            BatchItemResult::Failed { index: 1, error: Error::Provider(ProviderError::ApiError { status_code: 500, .. }) }
        ));
        assert_eq!(results[2].output().unwrap().final_text, "Fine two.");
    }

    #[tokio::test]
    async fn shared_key_items_run_in_submission_order() {
        let provider = EchoProvider::new();
        let pipeline = Pipeline::new(provider.clone(), Arc::new(InMemoryStore::new()), settings(100, 10));
        let docs = vec![
            Document::new("First document body."),
            Document::new("Second document body."),
            Document::new("Third document body."),
        ];

        let results = pipeline.process_batch(&docs).await;

        let versions: Vec<u64> = results.iter().map(|r| r.output().unwrap().memory_version).collect();
        assert_eq!(versions, vec![1, 2, 3]);

        // Each document saw the tail its predecessor persisted.
        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("PREVIOUS EDITED TAIL:\n(none)"));
        assert!(prompts[1].contains("PREVIOUS EDITED TAIL:\nFirst document body."));
        assert!(prompts[2].contains("PREVIOUS EDITED TAIL:\nSecond document body."));
    }

    #[tokio::test]
    async fn key_locks_are_per_key() {
        let locks = KeyLocks::new();
        let _a = locks.acquire("a").await;
        // A different key is not blocked by the held guard.
        let _b = locks.acquire("b").await;
        assert!(locks.locks.lock().unwrap().contains_key("a"));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn released_keys_are_pruned() {
        let locks = KeyLocks::new();
        let first = locks.acquire("a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _second = locks.acquire("a").await;
            })
        };
        tokio::task::yield_now().await;

        // Entry survives while someone is queued on it.
        drop(first);
        assert!(locks.locks.lock().unwrap().contains_key("a"));
        waiter.await.unwrap();

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn batch_leaves_no_locks_behind() {
        let pipeline = Pipeline::new(EchoProvider::new(), Arc::new(InMemoryStore::new()), settings(100, 10));
        let docs = vec![
            Document::new("One.").with_memory_key("a"),
            Document::new("Two.").with_memory_key("b"),
            Document::new("Three.").with_memory_key("a"),
        ];

        pipeline.process_batch(&docs).await;

        assert!(pipeline.locks.is_empty());
    }
}
