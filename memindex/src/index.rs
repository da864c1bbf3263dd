use std::cmp::Ordering;

use hashbrown::HashMap;
use tracing::debug;

use crate::{
    document::Document,
    error::{IndexError, IndexResult},
    mapping::Mapping,
    segment::Segment,
};

/// Document preprocessor, run in order before a document is walked.
pub type Preprocess<D> = Box<dyn Fn(D) -> D>;

/// Result shaping for [`Index::get_docs`]: filtering, ordering and paging,
/// applied after candidate retrieval.
pub struct Options<'a, D> {
    filter: Option<Box<dyn Fn(&D) -> bool + 'a>>,
    less: Option<Box<dyn Fn(&D, &D) -> bool + 'a>>,
    from: usize,
    size: usize,
}

impl<'a, D> Default for Options<'a, D> {
    fn default() -> Self {
        Options {
            filter: None,
            less: None,
            from: 0,
            size: 0,
        }
    }
}

impl<'a, D> Options<'a, D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps only documents for which the predicate returns true.
    pub fn filter(mut self, filter: impl Fn(&D) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Ascending order: `less(a, b)` returns true when `a` sorts before
    /// `b`. The sort is stable.
    pub fn order_by(mut self, less: impl Fn(&D, &D) -> bool + 'a) -> Self {
        self.less = Some(Box::new(less));
        self
    }

    /// Start of the paging window. Paging is applied only when `from` or
    /// `size` is non-zero; a `from` past the end of the results yields
    /// [`IndexError::Eof`].
    pub fn from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    /// Size of the paging window.
    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }
}

/// In-memory document index: owns the raw documents and the segment built
/// over them. Created by one `build` call and read-only afterwards.
pub struct Index<D> {
    raw: Vec<D>,
    by_key: HashMap<String, usize>,
    segment: Segment,
}

impl<D: Document> Index<D> {
    /// Builds an index over `keys` and `docs` of equal, non-zero length.
    ///
    /// The index mapping is derived from the first document; every later
    /// document is walked against it. Preprocessors run in order on each
    /// document before anything is extracted.
    pub fn build(
        keys: Vec<String>,
        docs: Vec<D>,
        preprocessors: Vec<Preprocess<D>>,
    ) -> IndexResult<Self> {
        if keys.len() != docs.len() {
            return Err(IndexError::KeyCountMismatch {
                keys: keys.len(),
                docs: docs.len(),
            });
        }
        if docs.is_empty() {
            return Err(IndexError::NoDocuments);
        }

        let mut raw = Vec::with_capacity(docs.len());
        for mut doc in docs {
            for preprocess in &preprocessors {
                doc = preprocess(doc);
            }
            raw.push(doc);
        }

        let mapping = Mapping::from_document(&raw[0])?;
        let mut by_key = HashMap::with_capacity(raw.len());
        let mut batch = Vec::with_capacity(raw.len());
        for (position, (key, doc)) in keys.into_iter().zip(&raw).enumerate() {
            // A duplicated key keeps the last document it was given.
            by_key.insert(key.clone(), position);
            batch.push((key, mapping.extract(doc)));
        }

        let mut segment = Segment::with_capacity(raw.len());
        segment.index_documents(batch)?;
        debug!(docs = raw.len(), fields = mapping.len(), "index built");

        Ok(Index {
            raw,
            by_key,
            segment,
        })
    }

    /// Matching external keys for a query expression, in document
    /// insertion order.
    pub fn query(&self, expression: &str) -> IndexResult<Vec<String>> {
        self.segment.search(expression)
    }

    /// Queries and resolves the matches to documents in one call.
    pub fn query_docs(&self, expression: &str, options: &Options<D>) -> IndexResult<Vec<&D>> {
        let keys = self.query(expression)?;
        self.get_docs(&keys, options)
    }

    /// Resolves external keys to documents, applying the options. Unknown
    /// keys are skipped.
    pub fn get_docs(&self, keys: &[String], options: &Options<D>) -> IndexResult<Vec<&D>> {
        let mut docs: Vec<&D> = keys
            .iter()
            .filter_map(|key| self.by_key.get(key.as_str()).map(|&pos| &self.raw[pos]))
            .collect();

        if let Some(filter) = &options.filter {
            docs.retain(|doc| filter(doc));
        }

        if let Some(less) = &options.less {
            docs.sort_by(|a, b| {
                if less(a, b) {
                    Ordering::Less
                } else if less(b, a) {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            });
        }

        if options.from != 0 || options.size != 0 {
            if options.from >= docs.len() {
                return Err(IndexError::Eof);
            }
            let end = docs.len().min(options.from + options.size);
            docs.truncate(end);
            docs.drain(..options.from);
        }

        Ok(docs)
    }

    pub fn len(&self) -> usize {
        self.segment.doc_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate as memindex;
    use memindex_derive::Document;

    #[derive(Debug, Clone, PartialEq, Document)]
    struct Name {
        #[index("term")]
        first: String,
        #[index("term")]
        last: String,
    }

    #[derive(Debug, Clone, PartialEq, Document)]
    struct Profile {
        id: i64,
        #[index("range")]
        age: i64,
        #[index("range")]
        height: i64,
        name: Option<Name>,
        content: Option<String>,
    }

    fn profile(id: i64, age: i64, height: i64, first: &str, last: &str) -> Profile {
        Profile {
            id,
            age,
            height,
            name: Some(Name {
                first: first.into(),
                last: last.into(),
            }),
            content: Some(String::new()),
        }
    }

    fn fixture() -> (Vec<String>, Vec<Profile>) {
        let keys = (1..=7).map(|k| k.to_string()).collect();
        let docs = vec![
            profile(1, 12, 170, "chirl", "chen"),
            profile(2, 12, 175, "grey", "zhu"),
            profile(3, 22, 175, "vicki", "zhu"),
            profile(4, 22, 178, "vicky", "chu"),
            profile(5, 25, 170, "zhengyu", "chen"),
            profile(6, 26, 178, "zhenhai", "zhu"),
            profile(7, 26, 175, "lucky", "chu"),
        ];
        (keys, docs)
    }

    fn build() -> Index<Profile> {
        let (keys, docs) = fixture();
        Index::build(keys, docs, Vec::new()).unwrap()
    }

    fn ids(docs: &[&Profile]) -> Vec<i64> {
        docs.iter().map(|doc| doc.id).collect()
    }

    #[test]
    fn input_shape_errors() {
        let (keys, docs) = fixture();
        assert!(matches!(
            Index::build(keys[..3].to_vec(), docs, Vec::new()),
            Err(IndexError::KeyCountMismatch { keys: 3, docs: 7 })
        ));
        assert!(matches!(
            Index::<Profile>::build(Vec::new(), Vec::new(), Vec::new()),
            Err(IndexError::NoDocuments)
        ));
    }

    #[test]
    fn query_returns_keys_in_insertion_order() {
        let index = build();
        assert_eq!(index.query("age == 12").unwrap(), ["1", "2"]);
        assert_eq!(
            index
                .query(r#"like(name.first, "vic.*") || in_array(name.last, []string{"zhu", "chu"})"#)
                .unwrap(),
            ["2", "3", "4", "6", "7"]
        );
    }

    #[test]
    fn query_docs_with_filter() {
        let index = build();
        let docs = index
            .query_docs("age == 12", &Options::new().filter(|doc: &Profile| doc.id != 1))
            .unwrap();
        assert_eq!(ids(&docs), [2]);
    }

    #[test]
    fn query_docs_with_ordering() {
        let index = build();
        let docs = index
            .query_docs(
                "age > 22",
                &Options::new().order_by(|a: &Profile, b: &Profile| a.height < b.height),
            )
            .unwrap();
        assert_eq!(ids(&docs), [5, 7, 6]);
    }

    #[test]
    fn paging_and_eof() {
        let index = build();
        let all = index.query("age >= 12").unwrap();
        assert_eq!(all.len(), 7);

        let docs = index
            .get_docs(&all, &Options::new().from(2).size(3))
            .unwrap();
        assert_eq!(ids(&docs), [3, 4, 5]);

        let docs = index
            .get_docs(&all, &Options::new().from(5).size(10))
            .unwrap();
        assert_eq!(ids(&docs), [6, 7]);

        assert!(matches!(
            index.get_docs(&all, &Options::new().from(7).size(1)),
            Err(IndexError::Eof)
        ));
        assert!(matches!(
            index.get_docs(&all, &Options::new().from(9)),
            Err(IndexError::Eof)
        ));

        // No paging requested: empty results are not EOF.
        let none = index.query("age == 99").unwrap();
        assert_eq!(index.get_docs(&none, &Options::new()).unwrap().len(), 0);
    }

    #[test]
    fn duplicate_keys_keep_one_document() {
        let keys = vec!["a".to_string(), "a".to_string()];
        let docs = vec![
            profile(1, 12, 170, "chirl", "chen"),
            profile(2, 30, 170, "grey", "zhu"),
        ];
        let index = Index::build(keys, docs, Vec::new()).unwrap();
        assert_eq!(index.len(), 1);

        // Both generations of the key answer queries, but only one result
        // comes back and it resolves to the last document.
        let matches = index.query("age == 12").unwrap();
        assert_eq!(matches, ["a"]);
        let docs = index.get_docs(&matches, &Options::new()).unwrap();
        assert_eq!(ids(&docs), [2]);
    }

    #[test]
    fn preprocessors_run_in_order() {
        let (keys, docs) = fixture();
        let index = Index::build(
            keys,
            docs,
            vec![
                Box::new(|mut doc: Profile| {
                    doc.age += 1;
                    doc
                }),
                Box::new(|mut doc: Profile| {
                    doc.age *= 2;
                    doc
                }),
            ],
        )
        .unwrap();
        // (12 + 1) * 2
        assert_eq!(index.query("age == 26").unwrap(), ["1", "2"]);
    }

    #[test]
    fn rebuilds_answer_identically() {
        let queries = [
            "age == 12",
            "age >= 22 && age < 26",
            r#"in_array(age, []int{12,22,25}) && name.last == "zhu""#,
            r#"!(name.first == "chirl") && age == 12"#,
        ];
        let first = build();
        let second = build();
        for query in queries {
            assert_eq!(first.query(query).unwrap(), second.query(query).unwrap());
        }
    }

    #[test]
    fn missing_subtree_stays_out_of_postings() {
        let keys = vec!["a".to_string(), "b".to_string()];
        let mut anonymous = profile(2, 20, 170, "x", "y");
        anonymous.name = None;
        let docs = vec![profile(1, 10, 170, "chirl", "chen"), anonymous];
        let index = Index::build(keys, docs, Vec::new()).unwrap();

        assert_eq!(index.query(r#"name.first == "chirl""#).unwrap(), ["a"]);
        // Negation runs against the full universe, so the document missing
        // the field matches.
        assert_eq!(
            index.query(r#"name.first != "chirl""#).unwrap(),
            ["b"]
        );
    }
}
