use crate::value::{FieldPath, Value};

/// One field produced by walking a document: its dotted path, the raw
/// `index` annotation carried by the field (if any) and the extracted value.
#[derive(Debug, Clone)]
pub struct RawField {
    pub path: FieldPath,
    pub annotation: Option<&'static str>,
    pub value: Value,
}

/// A record whose fields can be walked for indexing.
///
/// One walker serves both phases: mapping derivation reads the annotations
/// of the first document of a batch, row extraction reads the values of
/// every document. Implemented with `#[derive(Document)]`, which generates
/// the walk per struct so nothing is inspected at runtime:
///
/// - `#[index("term")]` / `#[index("range")]` / `#[index("on")]` annotate a
///   field; absence means not indexed.
/// - A field whose type also derives `Document` is a record: the walker
///   descends into it unconditionally and the path becomes `parent.child`.
///   An annotation on the record field is inherited by children that carry
///   none of their own.
/// - `#[index("...", custom)]` routes through [`crate::CustomValue`].
/// - `Option` and `Box` wrappers are transparent; an absent optional yields
///   no field.
pub trait Document {
    fn walk(
        &self,
        prefix: &FieldPath,
        inherited: Option<&'static str>,
        out: &mut Vec<RawField>,
    );

    /// Walks the whole document from the root.
    fn fields(&self) -> Vec<RawField> {
        let mut out = Vec::new();
        self.walk(&FieldPath::root(), None, &mut out);
        out
    }
}
