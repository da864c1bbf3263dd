use fst::{IntoStreamer, Map, MapBuilder, Streamer};
use hashbrown::HashMap;
use roaring::RoaringBitmap;
use tracing::debug;

use crate::{
    error::{IndexError, IndexResult},
    postings::{RangeKey, RangePostings, TermPostings},
    value::{FieldPath, Value},
};

pub type DocId = u32;
pub type FieldId = u32;
pub type TermId = u32;

/// One document handed to the segment: its external key and the extracted
/// `path -> value` row.
pub type DocRow = (String, Vec<(FieldPath, Value)>);

/// Per-field term dictionary. The `term -> id` map is retained after
/// finalization for exact lookups; regex iteration goes to the FST.
#[derive(Debug, Default)]
struct TermDict {
    term_ids: HashMap<String, TermId>,
}

/// Build-once inverted index over a single batch of documents.
///
/// Term ids are unique to this segment; they are not stable across
/// segments. After `index_documents` returns the segment is read-only.
pub struct Segment {
    field_ids: HashMap<String, FieldId>,

    term_dicts: HashMap<FieldId, TermDict>,
    term_fsts: HashMap<FieldId, Map<Vec<u8>>>,
    term_postings: Vec<TermPostings>,

    range_postings: HashMap<FieldId, RangePostings>,

    full_doc_ids: RoaringBitmap,
    doc_keys: Vec<String>,
    key_ids: HashMap<String, DocId>,
}

impl Segment {
    pub(crate) fn with_capacity(docs: usize) -> Self {
        Segment {
            field_ids: HashMap::with_capacity(10),
            term_dicts: HashMap::with_capacity(10),
            term_fsts: HashMap::with_capacity(10),
            term_postings: Vec::with_capacity(docs),
            range_postings: HashMap::with_capacity(5),
            full_doc_ids: RoaringBitmap::new(),
            doc_keys: Vec::with_capacity(docs),
            key_ids: HashMap::with_capacity(docs),
        }
    }

    /// Indexes the whole batch in input order and finalizes the term
    /// dictionaries. Must be called exactly once.
    pub(crate) fn index_documents(&mut self, docs: Vec<DocRow>) -> IndexResult<()> {
        for (key, row) in docs {
            let doc_id = self.doc_id(key);
            self.full_doc_ids.insert(doc_id);
            for (path, value) in row {
                match value {
                    Value::Str(term) => self.add_term(doc_id, &path, term),
                    Value::Int(num) => self.add_number(doc_id, &path, num)?,
                    Value::StrList(terms) => {
                        for term in terms {
                            self.add_term(doc_id, &path, term);
                        }
                    }
                    Value::IntList(nums) => {
                        for num in nums {
                            self.add_number(doc_id, &path, num)?;
                        }
                    }
                    Value::Nil | Value::Unsupported(_) => continue,
                }
            }
        }
        self.finalize()
    }

    /// Matching external keys for a query expression, in document
    /// insertion order.
    pub fn search(&self, query: &str) -> IndexResult<Vec<String>> {
        crate::query::execute(self, query)
    }

    pub fn doc_count(&self) -> usize {
        self.doc_keys.len()
    }

    fn doc_id(&mut self, key: String) -> DocId {
        // Duplicated keys keep their first internal id.
        if let Some(&doc_id) = self.key_ids.get(&key) {
            return doc_id;
        }
        let doc_id = self.doc_keys.len() as DocId;
        self.key_ids.insert(key.clone(), doc_id);
        self.doc_keys.push(key);
        doc_id
    }

    fn field_id(&mut self, path: &FieldPath) -> FieldId {
        if let Some(&field_id) = self.field_ids.get(path.as_str()) {
            return field_id;
        }
        let field_id = self.field_ids.len() as FieldId;
        self.field_ids.insert(path.as_str().to_string(), field_id);
        field_id
    }

    fn add_term(&mut self, doc_id: DocId, path: &FieldPath, term: String) {
        let field_id = self.field_id(path);
        let dict = self.term_dicts.entry(field_id).or_default();
        let term_id = match dict.term_ids.get(&term) {
            Some(&term_id) => term_id,
            None => {
                let term_id = self.term_postings.len() as TermId;
                dict.term_ids.insert(term, term_id);
                self.term_postings.push(TermPostings::new());
                term_id
            }
        };
        self.term_postings[term_id as usize].add(doc_id);
    }

    fn add_number(&mut self, doc_id: DocId, path: &FieldPath, num: i64) -> IndexResult<()> {
        let field_id = self.field_id(path);
        self.range_postings
            .entry(field_id)
            .or_default()
            .add(RangeKey::Int(num), doc_id)
    }

    /// Streams every term dictionary, sorted by term bytes, into an FST.
    /// Building them all here keeps the segment immutable at query time.
    fn finalize(&mut self) -> IndexResult<()> {
        for (field_id, dict) in self.term_dicts.iter() {
            let mut terms: Vec<(&str, TermId)> = dict
                .term_ids
                .iter()
                .map(|(term, &term_id)| (term.as_str(), term_id))
                .collect();
            terms.sort_unstable_by_key(|(term, _)| *term);

            let mut builder = MapBuilder::memory();
            for (term, term_id) in terms {
                builder.insert(term.as_bytes(), u64::from(term_id))?;
            }
            let bytes = builder.into_inner()?;
            self.term_fsts.insert(*field_id, Map::new(bytes)?);
        }
        debug!(
            docs = self.doc_keys.len(),
            fields = self.field_ids.len(),
            terms = self.term_postings.len(),
            "segment finalized"
        );
        Ok(())
    }

    fn field_id_of(&self, field: &str) -> IndexResult<FieldId> {
        self.field_ids
            .get(field)
            .copied()
            .ok_or_else(|| IndexError::UnknownField(field.to_string()))
    }

    /// Exact term lookup. An unknown term yields an empty bitmap; a field
    /// without a term dictionary is a type error.
    pub(crate) fn term_docs(
        &self,
        field: &str,
        term: &str,
        op: &'static str,
    ) -> IndexResult<RoaringBitmap> {
        let field_id = self.field_id_of(field)?;
        let dict = self
            .term_dicts
            .get(&field_id)
            .ok_or_else(|| IndexError::TypeMismatch {
                field: field.to_string(),
                op,
                expected: "string literals match term fields only",
            })?;
        match dict.term_ids.get(term) {
            Some(&term_id) => Ok(self.term_postings[term_id as usize].docs.clone()),
            None => Ok(RoaringBitmap::new()),
        }
    }

    /// Union of the postings of every term matching the regex, via the
    /// field's FST.
    pub(crate) fn regex_docs(&self, field: &str, pattern: &str) -> IndexResult<RoaringBitmap> {
        let field_id = self.field_id_of(field)?;
        let fst = self
            .term_fsts
            .get(&field_id)
            .ok_or_else(|| IndexError::TypeMismatch {
                field: field.to_string(),
                op: "like",
                expected: "only string term fields support regex matching",
            })?;

        let dfa = regex_automata::dense::Builder::new()
            .anchored(true)
            .build(pattern)?;

        let mut docs = RoaringBitmap::new();
        let mut stream = fst.search(dfa).into_stream();
        while let Some((_, term_id)) = stream.next() {
            docs |= &self.term_postings[term_id as usize].docs;
        }
        Ok(docs)
    }

    /// The range postings of a field, for comparison queries.
    pub(crate) fn range_postings_of(
        &self,
        field: &str,
        op: &'static str,
    ) -> IndexResult<&RangePostings> {
        let field_id = self.field_id_of(field)?;
        self.range_postings
            .get(&field_id)
            .ok_or_else(|| IndexError::TypeMismatch {
                field: field.to_string(),
                op,
                expected: "integer literals match range fields only",
            })
    }

    /// Universe of all internal doc ids, for logical negation.
    pub(crate) fn all_docs(&self) -> &RoaringBitmap {
        &self.full_doc_ids
    }

    /// Projects internal ids back to external keys, in ascending internal
    /// id order. A hole in the key table is an invariant violation.
    pub(crate) fn external_keys(&self, docs: &RoaringBitmap) -> IndexResult<Vec<String>> {
        let mut keys = Vec::with_capacity(docs.len() as usize);
        for doc_id in docs {
            let key = self
                .doc_keys
                .get(doc_id as usize)
                .ok_or(IndexError::InvariantViolation(doc_id))?;
            keys.push(key.clone());
        }
        Ok(keys)
    }
}
