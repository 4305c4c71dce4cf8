//! Full-text search over session documents.
//!
//! The index is rebuilt wholesale whenever the set of indexable documents
//! changes (new part loaded, folder re-scanned) and thereafter serves
//! synchronous queries. Documents are indexed on two fields: display name
//! (weighted far higher) and raw text body, so a query matching a filename
//! always ranks above an equal-strength body match.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
};

use tracing::{debug, warn};

use crate::{
    session::{FileReference, SessionConfig},
    store::{FileStore, TextCache},
};

mod snippet;

use snippet::{build_snippet, strip_markdown};

/// Default result cap for [`SearchIndex::search`].
pub const DEFAULT_MAX_RESULTS: usize = 10;

const NAME_TOKEN_WEIGHT: f64 = 10.0;
const BODY_TOKEN_WEIGHT: f64 = 1.0;
// Large enough that any name match outranks any realistic body-only score;
// ranking additionally partitions on name matches, so this only shapes the
// reported number.
const NAME_MATCH_BOOST: f64 = 1000.0;

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matched document.
    pub reference: FileReference,
    /// Display name of the matched document.
    pub matched_name: String,
    /// Relevance score; higher ranks first.
    pub score: f64,
    /// Plain-text excerpt around the first query-word match.
    pub snippet: String,
}

#[derive(Debug)]
struct IndexedDocument {
    reference: FileReference,
    name_tokens: HashMap<String, u32>,
    body_tokens: HashMap<String, u32>,
    stripped_body: String,
}

/// In-memory search index over session documents.
#[derive(Debug, Default)]
pub struct SearchIndex {
    documents: Vec<IndexedDocument>,
}

impl SearchIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the index from scratch, discarding any prior contents.
    pub fn index_documents(&mut self, documents: Vec<(FileReference, String)>) {
        self.documents = documents
            .into_iter()
            .map(|(reference, raw_content)| IndexedDocument {
                name_tokens: token_frequencies(&reference.name),
                body_tokens: token_frequencies(&raw_content),
                stripped_body: strip_markdown(&raw_content),
                reference,
            })
            .collect();
        debug!(documents = self.documents.len(), "Rebuilt search index");
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the index holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Runs a ranked query, returning at most `max_results` hits.
    ///
    /// A blank query returns no hits. Filename matches rank above body-only
    /// matches regardless of body match counts. Never fails: anything that
    /// would go wrong internally yields empty results instead.
    #[must_use]
    pub fn search(&self, query: &str, max_results: usize) -> Vec<SearchHit> {
        let query_tokens = tokenize(query);
        if query_tokens.is_empty() || max_results == 0 {
            return Vec::new();
        }

        let mut ranked: Vec<(bool, f64, &IndexedDocument)> = self
            .documents
            .iter()
            .filter_map(|doc| {
                let name_hits: u32 = query_tokens
                    .iter()
                    .filter_map(|token| doc.name_tokens.get(token))
                    .sum();
                let body_hits: u32 = query_tokens
                    .iter()
                    .filter_map(|token| doc.body_tokens.get(token))
                    .sum();
                if name_hits == 0 && body_hits == 0 {
                    return None;
                }

                let mut score = f64::from(name_hits) * NAME_TOKEN_WEIGHT
                    + f64::from(body_hits) * BODY_TOKEN_WEIGHT;
                if name_hits > 0 {
                    score += NAME_MATCH_BOOST;
                }
                Some((name_hits > 0, score, doc))
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal))
                .then_with(|| a.2.reference.path.cmp(&b.2.reference.path))
        });

        ranked
            .into_iter()
            .take(max_results)
            .map(|(_, score, doc)| SearchHit {
                reference: doc.reference.clone(),
                matched_name: doc.reference.name.clone(),
                score,
                snippet: build_snippet(&doc.stripped_body, &query_tokens),
            })
            .collect()
    }
}

/// Batch-reads every markdown document a session config references (plan
/// files and support docs, deduplicated by path) through `cache`, ready to
/// be fed into [`SearchIndex::index_documents`].
///
/// Unreadable files are skipped with a warning; one missing document never
/// aborts the batch.
pub async fn load_session_documents<S: FileStore>(
    store: &S,
    cache: &TextCache,
    config: &SessionConfig,
) -> Vec<(FileReference, String)> {
    let mut seen = BTreeSet::new();
    let mut references = Vec::new();
    for part in &config.parts {
        for reference in part.plan_file.iter().chain(part.support_docs.iter()) {
            if seen.insert(reference.path.clone()) {
                references.push(reference.clone());
            }
        }
    }

    let mut documents = Vec::with_capacity(references.len());
    for reference in references {
        match cache.get_or_read(store, &reference.path).await {
            Ok(text) => documents.push((reference, text.to_string())),
            Err(error) => {
                warn!(path = reference.path, %error, "Skipping unreadable document");
            }
        }
    }
    documents
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn token_frequencies(text: &str) -> HashMap<String, u32> {
    let mut frequencies = HashMap::new();
    for token in tokenize(text) {
        *frequencies.entry(token).or_insert(0) += 1;
    }
    frequencies
}
