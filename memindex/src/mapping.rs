use hashbrown::HashMap;

use crate::{
    document::Document,
    error::{IndexError, IndexResult},
    value::{FieldPath, Value},
};

/// How a field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Verbatim string terms, exact and regex matching.
    Term,
    /// Ordered numeric postings, comparison queries.
    Range,
    /// Decided per value: strings go to the term index, integers to the
    /// range index.
    On,
}

impl IndexKind {
    fn from_annotation(annotation: &str) -> Option<Self> {
        match annotation {
            "term" => Some(IndexKind::Term),
            "range" => Some(IndexKind::Range),
            "on" => Some(IndexKind::On),
            _ => None,
        }
    }
}

/// Field-path to index-strategy table, derived once from the first document
/// of a batch. Immutable afterwards; every later document of the batch is
/// walked against it.
#[derive(Debug)]
pub struct Mapping {
    kinds: HashMap<FieldPath, IndexKind>,
}

impl Mapping {
    pub fn from_document<D: Document>(doc: &D) -> IndexResult<Self> {
        let mut kinds = HashMap::new();
        for field in doc.fields() {
            let Some(annotation) = field.annotation else {
                continue;
            };
            if let Value::Unsupported(type_name) = field.value {
                return Err(IndexError::Schema {
                    field: field.path.to_string(),
                    reason: format!("type `{type_name}` does not support indexing"),
                });
            }
            let Some(kind) = IndexKind::from_annotation(annotation) else {
                return Err(IndexError::Schema {
                    field: field.path.to_string(),
                    reason: format!("unknown index annotation `{annotation}`"),
                });
            };
            kinds.insert(field.path, kind);
        }
        Ok(Mapping { kinds })
    }

    pub fn kind(&self, path: &str) -> Option<IndexKind> {
        self.kinds.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// The `path -> value` row of one document, restricted to mapped paths.
    /// Absent and unsupported values are dropped here, so a document simply
    /// does not appear in the postings of fields it is missing.
    pub fn extract<D: Document>(&self, doc: &D) -> Vec<(FieldPath, Value)> {
        doc.fields()
            .into_iter()
            .filter(|field| {
                !matches!(field.value, Value::Nil | Value::Unsupported(_))
                    && self.kinds.contains_key(field.path.as_str())
            })
            .map(|field| (field.path, field.value))
            .collect()
    }
}
