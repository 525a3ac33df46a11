use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::directory::MmapDirectory;
use tantivy::query::AllQuery;
use tantivy::schema::{
    Field, IndexRecordOption, NumericOptions, STORED, STRING, Schema, TEXT, TextFieldIndexing,
    TextOptions, Value,
};
use tantivy::tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer};
use tantivy::{
    DocAddress, DocSet, Index, IndexReader, IndexWriter, ReloadPolicy, TERMINATED,
    TantivyDocument, TantivyError, Term,
};
use tracing::{debug, info, warn};

use super::{
    BulkItemFailure, BulkResponse, IndexError, SearchDocument, SearchIndex, SuggestInput,
    UNIFORM_SUGGEST_WEIGHT,
};
use crate::models::search::{SuggestField, Suggestion};

/// Whole-value, lower-cased tokens for prefix completion.
pub const COMPLETION_TOKENIZER: &str = "completion";

/// Score multiplier for options that only match within the edit distance.
const FUZZY_SCORE_FACTOR: f32 = 0.5;

#[derive(Clone, Copy)]
struct Fields {
    id: Field,
    name: Field,
    email: Field,
    phone: Field,
    farm_location: Field,
    farm_size: Field,
    crop_types: Field,
    created_at: Field,
    suggest: Field,
    suggest_name: Field,
    suggest_location: Field,
    suggest_crop: Field,
    suggest_weight: Field,
}

impl Fields {
    const fn completion_field(&self, scope: SuggestField) -> Field {
        match scope {
            SuggestField::All => self.suggest,
            SuggestField::Name => self.suggest_name,
            SuggestField::Location => self.suggest_location,
            SuggestField::Crop => self.suggest_crop,
        }
    }
}

fn build_schema() -> (Schema, Fields) {
    let mut builder = Schema::builder();

    let completion_options = TextOptions::default()
        .set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(COMPLETION_TOKENIZER)
                .set_index_option(IndexRecordOption::Basic),
        )
        .set_stored();

    let fields = Fields {
        id: builder.add_u64_field(
            "id",
            NumericOptions::default()
                .set_indexed()
                .set_stored()
                .set_fast(),
        ),
        name: builder.add_text_field("name", TEXT | STORED),
        email: builder.add_text_field("email", STRING | STORED),
        phone: builder.add_text_field("phone", STORED),
        farm_location: builder.add_text_field("farm_location", TEXT | STORED),
        farm_size: builder.add_text_field("farm_size", STRING | STORED),
        crop_types: builder.add_text_field("crop_types", TEXT | STORED),
        created_at: builder.add_text_field("created_at", STRING | STORED),
        suggest: builder.add_text_field("suggest", completion_options.clone()),
        suggest_name: builder.add_text_field("suggest_name", completion_options.clone()),
        suggest_location: builder.add_text_field("suggest_location", completion_options.clone()),
        suggest_crop: builder.add_text_field("suggest_crop", completion_options),
        suggest_weight: builder
            .add_u64_field("suggest_weight", NumericOptions::default().set_stored()),
    };

    (builder.build(), fields)
}

struct Inner {
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: Fields,
}

/// Embedded tantivy index. Cheap to clone; all clones share one writer.
#[derive(Clone)]
pub struct TantivyIndex {
    inner: Arc<Inner>,
}

impl TantivyIndex {
    /// Opens (or creates) the index under `path`, or in memory when `path` is `None`.
    pub fn open(path: Option<&Path>, writer_memory_bytes: usize) -> Result<Self, IndexError> {
        let (schema, fields) = build_schema();

        let index = match path {
            Some(path) => {
                std::fs::create_dir_all(path).map_err(|e| {
                    IndexError::Directory(format!("{}: {e}", path.display()))
                })?;
                let dir = MmapDirectory::open(path).map_err(|e| {
                    IndexError::Directory(format!("{}: {e}", path.display()))
                })?;
                Index::open_or_create(dir, schema)?
            }
            None => Index::create_in_ram(schema),
        };

        let analyzer = TextAnalyzer::builder(RawTokenizer::default())
            .filter(LowerCaser)
            .build();
        index.tokenizers().register(COMPLETION_TOKENIZER, analyzer);

        let writer = index.writer_with_num_threads(1, writer_memory_bytes)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;

        info!(
            event = "search_index_opened",
            location = %path.map_or_else(|| "memory".to_string(), |p| p.display().to_string()),
            "Search index ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                reader,
                writer: Mutex::new(writer),
                fields,
            }),
        })
    }

    /// In-memory index, used by tests and when no index path is configured.
    pub fn in_memory() -> Result<Self, IndexError> {
        Self::open(None, 15_000_000)
    }
}

impl Inner {
    fn encode(&self, document: &SearchDocument, id: u64) -> TantivyDocument {
        let f = &self.fields;
        let mut doc = TantivyDocument::default();

        doc.add_u64(f.id, id);
        doc.add_text(f.name, &document.name);
        doc.add_text(f.email, &document.email);
        if let Some(phone) = &document.phone {
            doc.add_text(f.phone, phone);
        }
        doc.add_text(f.farm_location, &document.farm_location);
        if let Some(size) = &document.farm_size {
            doc.add_text(f.farm_size, size);
        }
        for crop in &document.crop_types {
            doc.add_text(f.crop_types, crop);
        }
        doc.add_text(f.created_at, &document.created_at);

        for input in &document.suggest.input {
            doc.add_text(f.suggest, input);
        }
        for input in document.name_inputs() {
            doc.add_text(f.suggest_name, input);
        }
        for input in document.location_inputs() {
            doc.add_text(f.suggest_location, input);
        }
        for input in document.crop_inputs() {
            doc.add_text(f.suggest_crop, input);
        }
        doc.add_u64(f.suggest_weight, document.suggest.weight);

        doc
    }

    fn decode(&self, doc: &TantivyDocument) -> Option<SearchDocument> {
        let f = &self.fields;
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };
        let all_text = |field: Field| -> Vec<String> {
            doc.get_all(field)
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect()
        };

        let id = doc.get_first(f.id).and_then(|v| v.as_u64())?;

        Some(SearchDocument {
            id: i32::try_from(id).ok()?,
            name: text(f.name).unwrap_or_default(),
            email: text(f.email).unwrap_or_default(),
            phone: text(f.phone),
            farm_location: text(f.farm_location).unwrap_or_default(),
            farm_size: text(f.farm_size),
            crop_types: all_text(f.crop_types),
            created_at: text(f.created_at).unwrap_or_default(),
            suggest: SuggestInput {
                input: all_text(f.suggest),
                weight: doc
                    .get_first(f.suggest_weight)
                    .and_then(|v| v.as_u64())
                    .unwrap_or(UNIFORM_SUGGEST_WEIGHT),
            },
        })
    }

    fn bulk_upsert(&self, documents: &[SearchDocument]) -> Result<BulkResponse, IndexError> {
        let mut response = BulkResponse::default();
        let mut writer = self.writer.lock();

        for document in documents {
            let Ok(id) = u64::try_from(document.id) else {
                response.failures.push(BulkItemFailure {
                    id: document.id,
                    reason: format!("document id {} cannot be used as an index key", document.id),
                });
                continue;
            };

            writer.delete_term(Term::from_field_u64(self.fields.id, id));
            match writer.add_document(self.encode(document, id)) {
                Ok(_) => response.indexed += 1,
                Err(e) => response.failures.push(BulkItemFailure {
                    id: document.id,
                    reason: e.to_string(),
                }),
            }
        }

        writer.commit()?;
        drop(writer);
        self.reader.reload()?;

        Ok(response)
    }

    fn search_completion(
        &self,
        prefix: &str,
        scope: SuggestField,
        limit: usize,
    ) -> Result<Vec<Suggestion>, IndexError> {
        if limit == 0 || prefix.is_empty() {
            return Ok(Vec::new());
        }

        let prefix = prefix.to_lowercase();
        let field = self.fields.completion_field(scope);
        let distance = usize::from(scope.is_scoped());
        let searcher = self.reader.searcher();

        // Keyed by the indexed (lower-cased) term, so every distinct option
        // competes once no matter how many documents carry it.
        let mut ranked: HashMap<String, Suggestion> = HashMap::new();

        for (segment_ord, segment) in searcher.segment_readers().iter().enumerate() {
            let inverted_index = segment.inverted_index(field)?;
            let alive = segment.alive_bitset();
            let terms = inverted_index.terms();

            // Unscoped lookups only need the prefix range; fuzzy ones scan the
            // whole dictionary of the scoped field.
            let mut stream = if distance == 0 {
                terms.range().ge(prefix.as_bytes()).into_stream()
            } else {
                terms.stream()
            }
            .map_err(TantivyError::from)?;

            while stream.advance() {
                let Ok(term) = std::str::from_utf8(stream.key()) else {
                    continue;
                };

                let factor = if term.starts_with(&prefix) {
                    1.0
                } else if distance == 0 {
                    break;
                } else if prefix_edit_distance(&prefix, term) <= distance {
                    FUZZY_SCORE_FACTOR
                } else {
                    continue;
                };

                if ranked.get(term).is_some_and(|s| s.score >= factor) {
                    continue;
                }

                let mut postings = inverted_index
                    .read_postings_from_terminfo(stream.value(), IndexRecordOption::Basic)
                    .map_err(TantivyError::from)?;
                let mut doc_id = postings.doc();
                while doc_id != TERMINATED && alive.is_some_and(|a| a.is_deleted(doc_id)) {
                    doc_id = postings.advance();
                }
                if doc_id == TERMINATED {
                    continue;
                }

                let segment_ord = u32::try_from(segment_ord).unwrap_or(u32::MAX);
                let doc: TantivyDocument = searcher.doc(DocAddress::new(segment_ord, doc_id))?;
                #[allow(clippy::cast_precision_loss)]
                let weight = doc
                    .get_first(self.fields.suggest_weight)
                    .and_then(|v| v.as_u64())
                    .unwrap_or(UNIFORM_SUGGEST_WEIGHT) as f32;
                let text = doc
                    .get_all(field)
                    .filter_map(|v| v.as_str())
                    .find(|v| v.to_lowercase() == term)
                    .unwrap_or(term)
                    .to_string();

                ranked.insert(
                    term.to_string(),
                    Suggestion {
                        text,
                        score: weight * factor,
                    },
                );
            }
        }

        let mut suggestions: Vec<Suggestion> = ranked.into_values().collect();
        suggestions.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.text.chars().count().cmp(&b.text.chars().count()))
                .then_with(|| a.text.cmp(&b.text))
        });
        suggestions.truncate(limit);

        debug!(
            prefix = %prefix,
            scope = %scope,
            options = suggestions.len(),
            "Completion lookup"
        );
        Ok(suggestions)
    }

    fn all_documents(&self) -> Result<Vec<SearchDocument>, IndexError> {
        let searcher = self.reader.searcher();
        let total = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if total == 0 {
            return Ok(Vec::new());
        }

        let hits = searcher.search(&AllQuery, &TopDocs::with_limit(total))?;
        let mut documents = Vec::with_capacity(hits.len());
        for (_score, address) in hits {
            let doc: TantivyDocument = searcher.doc(address)?;
            match self.decode(&doc) {
                Some(document) => documents.push(document),
                None => warn!(
                    event = "search_index_doc_unreadable",
                    "Skipping unreadable document"
                ),
            }
        }
        documents.sort_by_key(|d| d.id);
        Ok(documents)
    }
}

/// Smallest edit distance between `query` and any prefix of `candidate`.
fn prefix_edit_distance(query: &str, candidate: &str) -> usize {
    let query: Vec<char> = query.chars().collect();
    let candidate: Vec<char> = candidate.chars().collect();

    // Column-wise DP: column j holds distances of every query prefix
    // against candidate[..j].
    let mut column: Vec<usize> = (0..=query.len()).collect();
    let mut best = column[query.len()];

    for c in &candidate {
        let mut next = Vec::with_capacity(column.len());
        next.push(column[0] + 1);
        for (i, q) in query.iter().enumerate() {
            let substitution = column[i] + usize::from(q != c);
            let insertion = column[i + 1] + 1;
            let deletion = next[i] + 1;
            next.push(substitution.min(insertion).min(deletion));
        }
        column = next;
        best = best.min(column[query.len()]);
    }

    best
}

#[async_trait::async_trait]
impl SearchIndex for TantivyIndex {
    async fn bulk_upsert(
        &self,
        documents: Vec<SearchDocument>,
    ) -> Result<BulkResponse, IndexError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.bulk_upsert(&documents)).await?
    }

    async fn search_completion(
        &self,
        prefix: &str,
        scope: SuggestField,
        limit: usize,
    ) -> Result<Vec<Suggestion>, IndexError> {
        let inner = Arc::clone(&self.inner);
        let prefix = prefix.to_string();
        tokio::task::spawn_blocking(move || inner.search_completion(&prefix, scope, limit)).await?
    }

    async fn all_documents(&self) -> Result<Vec<SearchDocument>, IndexError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.all_documents()).await?
    }

    async fn ping(&self) -> Result<(), IndexError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.reader.reload().map_err(IndexError::from)).await?
    }

    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(id: i32, name: &str, location: &str, crops: &[&str]) -> SearchDocument {
        SearchDocument::from(&crate::models::farmer::FarmerRecord {
            id,
            name: name.to_string(),
            email: format!("farmer{id}@example.com"),
            phone: None,
            farm_location: location.to_string(),
            farm_size: None,
            crop_types: Some(crops.iter().map(|c| (*c).to_string()).collect()),
            created_at: "2025-03-01T00:00:00.000Z".to_string(),
        })
    }

    #[test]
    fn prefix_edit_distance_measures_best_prefix() {
        assert_eq!(prefix_edit_distance("lim", "lim chu kang"), 0);
        assert_eq!(prefix_edit_distance("lin", "lim chu kang"), 1);
        assert_eq!(prefix_edit_distance("lmi", "lim chu kang"), 2);
        assert_eq!(prefix_edit_distance("", "anything"), 0);
    }

    #[tokio::test]
    async fn upsert_replaces_documents_with_the_same_id() {
        let index = TantivyIndex::in_memory().unwrap();

        index
            .bulk_upsert(vec![document(1, "Tan", "Kranji", &[])])
            .await
            .unwrap();
        index
            .bulk_upsert(vec![document(1, "Tan Wei", "Kranji", &[])])
            .await
            .unwrap();

        let all = index.all_documents().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Tan Wei");
    }

    #[tokio::test]
    async fn negative_ids_are_reported_per_document() {
        let index = TantivyIndex::in_memory().unwrap();

        let response = index
            .bulk_upsert(vec![
                document(-4, "Broken", "Nowhere", &[]),
                document(2, "Ok", "Kranji", &[]),
            ])
            .await
            .unwrap();

        assert_eq!(response.indexed, 1);
        assert_eq!(response.failures.len(), 1);
        assert_eq!(response.failures[0].id, -4);
        assert_eq!(index.all_documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn all_scope_is_plain_prefix() {
        let index = TantivyIndex::in_memory().unwrap();
        index
            .bulk_upsert(vec![
                document(1, "Lim Ah Seng", "Lim Chu Kang", &["leafy greens"]),
                document(2, "Tan", "Kranji", &["lettuce"]),
            ])
            .await
            .unwrap();

        let options = index
            .search_completion("li", SuggestField::All, 10)
            .await
            .unwrap();
        let texts: Vec<&str> = options.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(texts, vec!["Lim Ah Seng", "Lim Chu Kang"]);
        assert!(options.iter().all(|s| (s.score - 1.0).abs() < f32::EPSILON));
    }

    #[tokio::test]
    async fn scoped_lookup_ranks_exact_prefix_above_fuzzy() {
        let index = TantivyIndex::in_memory().unwrap();
        index
            .bulk_upsert(vec![
                document(1, "A", "Lim Chu Kang", &[]),
                document(2, "B", "Lin Road", &[]),
                document(3, "C", "Kranji", &[]),
            ])
            .await
            .unwrap();

        let options = index
            .search_completion("lin", SuggestField::Location, 10)
            .await
            .unwrap();

        assert_eq!(options[0].text, "Lin Road");
        assert_eq!(options[1].text, "Lim Chu Kang");
        assert!(options[0].score > options[1].score);
        assert_eq!(options.len(), 2);
    }

    #[tokio::test]
    async fn duplicate_inputs_collapse_and_limit_applies() {
        let index = TantivyIndex::in_memory().unwrap();
        index
            .bulk_upsert(vec![
                document(1, "A", "Kranji", &["kale"]),
                document(2, "B", "Kranji", &["Kale", "kailan"]),
            ])
            .await
            .unwrap();

        let options = index
            .search_completion("ka", SuggestField::Crop, 10)
            .await
            .unwrap();
        assert_eq!(options.len(), 2);

        let limited = index
            .search_completion("ka", SuggestField::Crop, 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert!(index
            .search_completion("ka", SuggestField::Crop, 0)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn exact_prefix_survives_many_fuzzy_documents() {
        let index = TantivyIndex::in_memory().unwrap();
        let mut documents: Vec<SearchDocument> = (1..=90)
            .map(|id| document(id, &format!("Grower {id}"), "Lin Road", &[]))
            .collect();
        documents.push(document(91, "Tan", "Lim Chu Kang", &[]));
        index.bulk_upsert(documents).await.unwrap();

        let options = index
            .search_completion("lim", SuggestField::Location, 10)
            .await
            .unwrap();

        assert_eq!(options.len(), 2);
        assert_eq!(options[0].text, "Lim Chu Kang");
        assert!((options[0].score - 1.0).abs() < f32::EPSILON);
        assert_eq!(options[1].text, "Lin Road");
    }

    #[tokio::test]
    async fn shared_values_do_not_hide_other_options() {
        let index = TantivyIndex::in_memory().unwrap();
        let mut documents: Vec<SearchDocument> = (1..=90)
            .map(|id| document(id, &format!("Grower {id}"), "Lim Chu Kang", &[]))
            .collect();
        documents.push(document(91, "Lily", "Kranji", &[]));
        index.bulk_upsert(documents).await.unwrap();

        let options = index
            .search_completion("li", SuggestField::All, 10)
            .await
            .unwrap();
        let texts: Vec<&str> = options.iter().map(|s| s.text.as_str()).collect();

        assert_eq!(texts, vec!["Lily", "Lim Chu Kang"]);
    }

    #[tokio::test]
    async fn replaced_values_stop_completing() {
        let index = TantivyIndex::in_memory().unwrap();
        index
            .bulk_upsert(vec![document(1, "Tan", "Lim Chu Kang", &[])])
            .await
            .unwrap();
        index
            .bulk_upsert(vec![document(1, "Tan", "Kranji", &[])])
            .await
            .unwrap();

        let options = index
            .search_completion("lim", SuggestField::Location, 10)
            .await
            .unwrap();

        assert!(options.is_empty());
        index.ping().await.unwrap();
    }
}
