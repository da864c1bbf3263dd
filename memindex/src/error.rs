use thiserror::Error;

pub type IndexResult<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("keys and documents length mismatch ({keys} keys, {docs} documents)")]
    KeyCountMismatch { keys: usize, docs: usize },

    #[error("no documents")]
    NoDocuments,

    #[error("field `{field}`: {reason}")]
    Schema { field: String, reason: String },

    #[error("field `{field}` does not support `{op}`: {expected}")]
    TypeMismatch {
        field: String,
        op: &'static str,
        expected: &'static str,
    },

    #[error("numeric kind mismatch: field committed to {expected}, got {got}")]
    RangeKind {
        expected: &'static str,
        got: &'static str,
    },

    #[error("no field named `{0}` in the index")]
    UnknownField(String),

    #[error("function `{0}` is not supported")]
    UnknownFunction(String),

    #[error("invalid query: {0}")]
    Parse(String),

    #[error("term dictionary build failed")]
    DictionaryBuild(#[from] fst::Error),

    #[error("invalid regex")]
    Regex(#[from] regex_automata::Error),

    #[error("internal doc id {0} has no external key")]
    InvariantViolation(u32),

    #[error("EOF")]
    Eof,
}
