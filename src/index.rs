//! Index writer/reader (C4): opens an on-disk index, buffers documents,
//! commits batches, and serves point/range/existence queries.
//!
//! The storage model is intentionally coarse, matching the host crate's own
//! `ContentIndex`/`DefinitionIndex`: the whole index state is one
//! serialisable struct, swapped wholesale on commit rather than maintained
//! as fine-grained on-disk segments. What Lucene-style engines get from
//! segment merging, this gets from `Arc`-swapping an immutable snapshot —
//! cheap because the host's indexes are themselves this size-class (one
//! package-cache's worth of API docs, not a web-scale corpus).

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::analyzer::{field_kind, FieldKind};
use crate::document::Document;
use crate::error::ApiLensError;
use crate::model::{IndexSnapshot, MemberRecord};
use crate::storage;

/// Documents per commit (§4.4 tunables).
pub const BATCH_SIZE: usize = 50_000;
/// Bounded channel capacity between C5's parsers and its single writer.
pub const CHANNEL_CAPACITY: usize = 100_000;

/// The fixed constants from §4.4, collected into one plain struct so a
/// caller can see them together instead of hunting for scattered `const`s.
/// `ram_buffer_mb`, `max_merges_at_once`, `segments_per_tier`, and
/// `compound_format` describe Lucene-style segment-merge tuning that this
/// module's storage model has no use for — the whole index is one
/// `Arc`-swapped snapshot, not on-disk segments merged in tiers (see the
/// module doc comment) — but they are kept here, inert, so the struct still
/// documents every tunable §4.4 names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    pub batch_size: usize,
    pub channel_capacity: usize,
    pub ram_buffer_mb: usize,
    pub max_merges_at_once: usize,
    pub segments_per_tier: usize,
    pub compound_format: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        IndexConfig {
            batch_size: BATCH_SIZE,
            channel_capacity: CHANNEL_CAPACITY,
            ram_buffer_mb: 512,
            max_merges_at_once: 10,
            segments_per_tier: 10,
            compound_format: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Open,
    Writing,
    Committed,
    Closed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexState {
    documents: HashMap<String, Document>,
    /// field -> term -> sorted document ids.
    terms: HashMap<String, HashMap<String, Vec<String>>>,
    /// field -> value -> sorted document ids, for range queries.
    ints: HashMap<String, BTreeMap<i64, Vec<String>>>,
}

impl IndexState {
    fn insert(&mut self, doc: Document) {
        self.remove(&doc.id);
        for (field, terms) in &doc.terms {
            let by_term = self.terms.entry(field.clone()).or_default();
            for term in terms {
                let ids = by_term.entry(term.clone()).or_default();
                if let Err(pos) = ids.binary_search(&doc.id) {
                    ids.insert(pos, doc.id.clone());
                }
            }
        }
        for (field, value) in &doc.ints {
            let ids = self.ints.entry(field.clone()).or_default().entry(*value).or_default();
            if let Err(pos) = ids.binary_search(&doc.id) {
                ids.insert(pos, doc.id.clone());
            }
        }
        self.documents.insert(doc.id.clone(), doc);
    }

    fn remove(&mut self, id: &str) {
        let Some(old) = self.documents.remove(id) else {
            return;
        };
        for (field, terms) in &old.terms {
            if let Some(by_term) = self.terms.get_mut(field) {
                for term in terms {
                    if let Some(ids) = by_term.get_mut(term) {
                        ids.retain(|existing| existing != id);
                    }
                }
            }
        }
        for (field, value) in &old.ints {
            if let Some(by_value) = self.ints.get_mut(field) {
                if let Some(ids) = by_value.get_mut(value) {
                    ids.retain(|existing| existing != id);
                }
            }
        }
    }

    fn remove_by_term(&mut self, field: &str, value: &str) {
        let ids: Vec<String> = self
            .terms
            .get(field)
            .and_then(|by_term| by_term.get(value))
            .cloned()
            .unwrap_or_default();
        for id in ids {
            self.remove(&id);
        }
    }
}

enum PendingOp {
    Upsert(Document),
    DeleteById(String),
    DeleteByTerm { field: String, value: String },
}

#[derive(Default)]
struct PendingBatch {
    ops: Vec<PendingOp>,
}

/// Aggregate counts returned by `index_batch`.
#[derive(Debug, Clone, Default)]
pub struct IndexBatchReport {
    pub documents_indexed: usize,
    pub failed_documents: usize,
    pub elapsed: Duration,
    pub errors: Vec<String>,
}

/// An open, owned index (§9 design notes: the writer's lifecycle maps to a
/// scoped owner; `close()` is guaranteed by the caller).
pub struct Index {
    path: PathBuf,
    state: RwLock<Arc<IndexState>>,
    pending: Mutex<PendingBatch>,
    lifecycle: Mutex<Lifecycle>,
}

impl Index {
    /// Opens the index at `path`, loading any previously committed state.
    /// A missing file is not an error: it just means an empty index.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ApiLensError> {
        let path = path.into();
        let state = if path.exists() {
            storage::load_compressed(&path, "apilens-index")?
        } else {
            IndexState::default()
        };
        Ok(Index {
            path,
            state: RwLock::new(Arc::new(state)),
            pending: Mutex::new(PendingBatch::default()),
            lifecycle: Mutex::new(Lifecycle::Open),
        })
    }

    fn ensure_writable(&self) -> Result<(), ApiLensError> {
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        match *lifecycle {
            Lifecycle::Closed => Err(ApiLensError::usage("index is closed")),
            Lifecycle::Open | Lifecycle::Committed => {
                *lifecycle = Lifecycle::Writing;
                Ok(())
            }
            Lifecycle::Writing => Ok(()),
        }
    }

    fn ensure_readable(&self) -> Result<(), ApiLensError> {
        let lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if *lifecycle == Lifecycle::Closed {
            Err(ApiLensError::usage("index is closed"))
        } else {
            Ok(())
        }
    }

    fn snapshot(&self) -> Arc<IndexState> {
        Arc::clone(&self.state.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Upserts one document: per §4.4, the writer deletes any document whose
    /// `id` term matches, then adds the new one. Buffered until `commit`.
    pub fn upsert(&self, doc: Document) -> Result<(), ApiLensError> {
        self.ensure_writable()?;
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.ops.push(PendingOp::DeleteById(doc.id.clone()));
        pending.ops.push(PendingOp::Upsert(doc));
        Ok(())
    }

    /// Queues a delete-by-term, left pending until `commit` (§4.4).
    pub fn delete_by_term(&self, field: &str, value: &str) -> Result<(), ApiLensError> {
        self.ensure_writable()?;
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.ops.push(PendingOp::DeleteByTerm {
            field: field.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// One `TermQuery` delete per packageId, left pending until commit.
    pub fn delete_by_package_ids(&self, package_ids: &HashSet<String>) -> Result<(), ApiLensError> {
        for id in package_ids {
            self.delete_by_term("packageId", id)?;
        }
        Ok(())
    }

    /// Makes all pending writes durable and visible (§4.4). A commit
    /// failure is fatal and leaves the index in its last durable state.
    pub fn commit(&self) -> Result<(), ApiLensError> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if pending.ops.is_empty() {
            let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
            if *lifecycle != Lifecycle::Closed {
                *lifecycle = Lifecycle::Committed;
            }
            return Ok(());
        }

        let mut next = (*self.snapshot()).clone();
        for op in pending.ops.drain(..) {
            match op {
                PendingOp::Upsert(doc) => next.insert(doc),
                PendingOp::DeleteById(id) => next.remove(&id),
                PendingOp::DeleteByTerm { field, value } => next.remove_by_term(&field, &value),
            }
        }

        storage::save_compressed(&self.path, &next, "apilens-index")
            .map_err(|e| ApiLensError::storage(format!("commit failed: {e}")))?;

        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            *state = Arc::new(next);
        }
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        *lifecycle = Lifecycle::Committed;
        tracing::debug!(path = %self.path.display(), "committed index batch");
        Ok(())
    }

    /// Upserts every record, committing once per `BATCH_SIZE` documents and
    /// once more at the end. Per-record build errors never happen in
    /// practice (`build_document` is infallible) but the signature stays
    /// fallible so a future validating builder can report them here.
    pub fn index_batch(
        &self,
        records: impl IntoIterator<Item = MemberRecord>,
    ) -> Result<IndexBatchReport, ApiLensError> {
        let start = Instant::now();
        let mut report = IndexBatchReport::default();
        let mut since_commit = 0usize;

        for record in records {
            let doc = crate::document::build_document(&record);
            match self.upsert(doc) {
                Ok(()) => {
                    report.documents_indexed += 1;
                    since_commit += 1;
                }
                Err(e) => {
                    report.failed_documents += 1;
                    report.errors.push(e.to_string());
                }
            }
            if since_commit >= BATCH_SIZE {
                self.commit()?;
                since_commit = 0;
            }
        }
        self.commit()?;
        report.elapsed = start.elapsed();
        Ok(report)
    }

    /// Returns documents whose `field` matches `value`: an exact `TermQuery`
    /// for keyword fields, or tokens-all-present matching for identifier
    /// fields (§4.4). Results are sorted by id for determinism, then
    /// truncated to `limit`.
    pub fn search_by_field(&self, field: &str, value: &str, limit: usize) -> Result<Vec<Document>, ApiLensError> {
        self.ensure_readable()?;
        let snapshot = self.snapshot();
        let Some(by_term) = snapshot.terms.get(field) else {
            return Ok(Vec::new());
        };

        let matching_ids: Vec<String> = match field_kind(field) {
            FieldKind::Keyword => by_term.get(value).cloned().unwrap_or_default(),
            FieldKind::Identifier => {
                let query_tokens = crate::tokenizer::tokenize_text(value);
                if query_tokens.is_empty() {
                    Vec::new()
                } else {
                    let mut counts: HashMap<&str, usize> = HashMap::new();
                    for token in &query_tokens {
                        if let Some(ids) = by_term.get(token) {
                            for id in ids {
                                *counts.entry(id.as_str()).or_insert(0) += 1;
                            }
                        }
                    }
                    let needed = query_tokens.len();
                    let mut matches: Vec<&str> = counts
                        .into_iter()
                        .filter(|(_, c)| *c == needed)
                        .map(|(id, _)| id)
                        .collect();
                    matches.sort_unstable();
                    matches.into_iter().map(str::to_string).collect()
                }
            }
            FieldKind::Integer => {
                return Err(ApiLensError::usage(format!(
                    "field {field} is numeric; use search_by_int_range"
                )))
            }
        };

        Ok(matching_ids
            .into_iter()
            .take(limit)
            .filter_map(|id| snapshot.documents.get(&id).cloned())
            .collect())
    }

    /// Inclusive range query over an integer field (§4.4).
    pub fn search_by_int_range(&self, field: &str, lo: i64, hi: i64, limit: usize) -> Result<Vec<Document>, ApiLensError> {
        self.ensure_readable()?;
        if lo > hi {
            return Err(ApiLensError::usage("range lo must be <= hi"));
        }
        let snapshot = self.snapshot();
        let Some(by_value) = snapshot.ints.get(field) else {
            return Ok(Vec::new());
        };
        let mut ids: Vec<&String> = by_value.range(lo..=hi).flat_map(|(_, ids)| ids.iter()).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .into_iter()
            .take(limit)
            .filter_map(|id| snapshot.documents.get(id).cloned())
            .collect())
    }

    /// Any document whose `field` has at least one token (§4.4).
    pub fn search_by_field_exists(&self, field: &str, limit: usize) -> Result<Vec<Document>, ApiLensError> {
        self.ensure_readable()?;
        let snapshot = self.snapshot();
        let Some(by_term) = snapshot.terms.get(field) else {
            return Ok(Vec::new());
        };
        let mut ids: HashSet<&String> = HashSet::new();
        for term_ids in by_term.values() {
            ids.extend(term_ids.iter());
        }
        let mut ids: Vec<&String> = ids.into_iter().collect();
        ids.sort_unstable();
        Ok(ids
            .into_iter()
            .take(limit)
            .filter_map(|id| snapshot.documents.get(id).cloned())
            .collect())
    }

    /// Single-document point lookup (§4.4).
    pub fn get_by_id(&self, id: &str) -> Result<Option<Document>, ApiLensError> {
        self.ensure_readable()?;
        Ok(self.snapshot().documents.get(id).cloned())
    }

    /// Materialises the derived snapshot view (§3.1), skipping logically
    /// deleted documents (already impossible here since deletes are applied
    /// at commit time, not left as tombstones).
    pub fn get_index_snapshot(&self) -> Result<IndexSnapshot, ApiLensError> {
        self.ensure_readable()?;
        let snapshot = self.snapshot();
        let mut packages_by_id_with_framework: HashMap<String, HashSet<(String, String)>> = HashMap::new();
        let mut indexed_xml_paths = HashSet::new();
        let mut empty_xml_paths = HashSet::new();

        for doc in snapshot.documents.values() {
            let is_empty_marker = doc
                .stored
                .get("documentType")
                .map(|v| v.iter().any(|d| d == "EmptyXmlFile"))
                .unwrap_or(false);

            let source_path = doc.stored.get("sourceFilePath").and_then(|v| v.first()).cloned();

            if is_empty_marker {
                if let Some(path) = source_path {
                    empty_xml_paths.insert(path);
                }
                continue;
            }

            if let Some(path) = &source_path {
                if !path.is_empty() {
                    indexed_xml_paths.insert(path.clone());
                }
            }

            if let Some(package_id) = doc.stored.get("packageId").and_then(|v| v.first()) {
                let version = doc
                    .stored
                    .get("packageVersion")
                    .and_then(|v| v.first())
                    .cloned()
                    .unwrap_or_default();
                let framework = doc
                    .stored
                    .get("targetFramework")
                    .and_then(|v| v.first())
                    .cloned()
                    .filter(|f| !f.is_empty())
                    .unwrap_or_else(|| "unknown".to_string());
                packages_by_id_with_framework
                    .entry(package_id.clone())
                    .or_default()
                    .insert((version, framework));
            }
        }

        Ok(IndexSnapshot {
            packages_by_id_with_framework,
            indexed_xml_paths,
            empty_xml_paths,
            total_documents: snapshot.documents.len(),
        })
    }

    /// Term-query over `documentType == "EmptyXmlFile"` (§4.4). Grounded on
    /// §10.7's decision to back this with a real query instead of a side
    /// table, since only one of a member/marker can live at a path at once.
    pub fn get_empty_xml_paths(&self) -> Result<HashSet<String>, ApiLensError> {
        let docs = self.search_by_field("documentType", "EmptyXmlFile", usize::MAX)?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| doc.stored.get("sourceFilePath").and_then(|v| v.first()).cloned())
            .collect())
    }

    /// Transitions the index to `Closed`. Any later operation fails with
    /// `UsageError` (§4.4's state machine).
    pub fn close(&self) -> Result<(), ApiLensError> {
        self.commit()?;
        let mut lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        *lifecycle = Lifecycle::Closed;
        Ok(())
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Compares two documents by their stored `id` — used wherever result
/// ordering needs to be deterministic for tests.
pub fn compare_by_id(a: &Document, b: &Document) -> CmpOrdering {
    a.id.cmp(&b.id)
}

pub fn default_index_path(index_dir: &Path) -> PathBuf {
    index_dir.join(storage::index_file_name(index_dir))
}

#[cfg(test)]
mod index_tests {
    use super::*;
    use crate::model::*;
    use tempfile::tempdir;

    fn sample_record(id: &str, name: &str) -> MemberRecord {
        MemberRecord {
            id: id.to_string(),
            kind: MemberKind::Type,
            name: name.to_string(),
            full_name: format!("N.{name}"),
            namespace: "N".to_string(),
            assembly: "A".to_string(),
            summary: Some("does a thing".to_string()),
            remarks: None,
            returns: None,
            see_also: None,
            parameters: Vec::new(),
            exceptions: Vec::new(),
            code_examples: Vec::new(),
            cross_references: Vec::new(),
            attributes: Vec::new(),
            complexity: None,
            modifiers: MethodModifiers::default(),
            package_id: Some("pkg".to_string()),
            package_version: Some("1.0.0".to_string()),
            target_framework: Some("net8.0".to_string()),
            source_file_path: Some(format!("/cache/pkg/1.0.0/lib/net8.0/{name}.xml")),
            is_from_cache: true,
            content_hash: None,
            indexed_at: None,
        }
    }

    #[test]
    fn upsert_then_commit_is_visible_to_readers() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        let doc = crate::document::build_document(&sample_record("T:N.Foo", "Foo"));
        index.upsert(doc).unwrap();
        index.commit().unwrap();
        assert!(index.get_by_id("T:N.Foo").unwrap().is_some());
    }

    #[test]
    fn upsert_idempotence() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        for _ in 0..5 {
            let doc = crate::document::build_document(&sample_record("T:N.Foo", "Foo"));
            index.upsert(doc).unwrap();
        }
        index.commit().unwrap();
        let snapshot = index.get_index_snapshot().unwrap();
        assert_eq!(snapshot.total_documents, 1);
    }

    #[test]
    fn search_by_keyword_field_is_exact() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        index
            .upsert(crate::document::build_document(&sample_record("T:N.Foo", "Foo")))
            .unwrap();
        index.commit().unwrap();
        let hits = index.search_by_field("name", "Foo", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "T:N.Foo");
        assert!(index.search_by_field("name", "foo", 10).unwrap().is_empty());
    }

    #[test]
    fn search_by_identifier_field_tokenizes_query() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        index
            .upsert(crate::document::build_document(&sample_record("T:N.Foo", "Foo")))
            .unwrap();
        index.commit().unwrap();
        let hits = index.search_by_field("summary", "thing", 10).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn delete_by_package_id_removes_all_its_documents() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        index
            .upsert(crate::document::build_document(&sample_record("T:N.Foo", "Foo")))
            .unwrap();
        index
            .upsert(crate::document::build_document(&sample_record("T:N.Bar", "Bar")))
            .unwrap();
        index.commit().unwrap();

        let mut ids = HashSet::new();
        ids.insert("pkg".to_string());
        index.delete_by_package_ids(&ids).unwrap();
        index.commit().unwrap();

        assert!(index.get_by_id("T:N.Foo").unwrap().is_none());
        assert!(index.get_by_id("T:N.Bar").unwrap().is_none());
    }

    #[test]
    fn search_by_int_range_is_inclusive() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        let mut record = sample_record("M:N.Foo.Bar", "Bar");
        record.kind = MemberKind::Method;
        record.complexity = Some(ComplexityMetrics {
            parameter_count: 0,
            cyclomatic_complexity: 5,
            documentation_line_count: 1,
        });
        index.upsert(crate::document::build_document(&record)).unwrap();
        index.commit().unwrap();

        assert_eq!(index.search_by_int_range("cyclomaticComplexity", 5, 5, 10).unwrap().len(), 1);
        assert_eq!(index.search_by_int_range("cyclomaticComplexity", 6, 10, 10).unwrap().len(), 0);
    }

    #[test]
    fn closed_index_rejects_operations() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        index.close().unwrap();
        let doc = crate::document::build_document(&sample_record("T:N.Foo", "Foo"));
        assert!(matches!(index.upsert(doc), Err(ApiLensError::UsageError(_))));
    }

    #[test]
    fn empty_xml_paths_are_queryable() {
        let dir = tempdir().unwrap();
        let index = Index::open(dir.path().join("idx.bin")).unwrap();
        let marker = EmptyFileMarker::for_path("/x/empty.xml");
        index
            .upsert(crate::document::build_empty_marker_document(&marker))
            .unwrap();
        index.commit().unwrap();
        let paths = index.get_empty_xml_paths().unwrap();
        assert!(paths.contains("/x/empty.xml"));
    }

    #[test]
    fn index_config_defaults_match_spec_tunables() {
        let config = IndexConfig::default();
        assert_eq!(config.batch_size, BATCH_SIZE);
        assert_eq!(config.channel_capacity, CHANNEL_CAPACITY);
        assert_eq!(config.ram_buffer_mb, 512);
        assert_eq!(config.max_merges_at_once, 10);
        assert_eq!(config.segments_per_tier, 10);
        assert!(!config.compound_format);
    }

    #[test]
    fn persists_and_reloads_across_open_calls() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("idx.bin");
        {
            let index = Index::open(&path).unwrap();
            index
                .upsert(crate::document::build_document(&sample_record("T:N.Foo", "Foo")))
                .unwrap();
            index.commit().unwrap();
        }
        let reopened = Index::open(&path).unwrap();
        assert!(reopened.get_by_id("T:N.Foo").unwrap().is_some());
    }
}
