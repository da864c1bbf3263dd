//! Embeddable in-memory document index.
//!
//! A homogeneous batch of documents is indexed in one pass: the index
//! mapping is derived from the `#[index(...)]` annotations of the first
//! document, string fields land in per-field term dictionaries (an FST for
//! regex matching plus a direct map for exact lookups) and integer fields
//! in ordered range postings. Queries are boolean expressions over those
//! fields, evaluated as roaring-bitmap set operations:
//!
//! ```text
//! age >= 22 && age < 26
//! in_array(age, []int{12,22,25}) && name.last == "zhu"
//! like(name.first, "vic.*") || !(name.last == "chen")
//! ```
//!
//! The segment is build-once: there is no update or deletion protocol, and
//! results always come back in document insertion order.

pub mod document;
pub mod error;
pub mod index;
pub mod mapping;
pub mod parser;
pub mod postings;
pub mod query;
pub mod segment;
pub mod value;

pub use document::{Document, RawField};
pub use error::{IndexError, IndexResult};
pub use index::{Index, Options, Preprocess};
pub use mapping::{IndexKind, Mapping};
pub use segment::Segment;
pub use value::{CustomValue, FieldPath, Value};

pub use memindex_derive::Document;

#[cfg(test)]
mod tests {
    use crate as memindex;
    use crate::{Index, IndexError, IndexResult, Options};
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
        name: Name,
    }

    #[test]
    fn usage() -> IndexResult<()> {
        let people = [
            (12, "chirl", "chen"),
            (12, "grey", "zhu"),
            (22, "vicki", "zhu"),
            (22, "vicky", "chu"),
            (25, "zhengyu", "chen"),
            (26, "zhenhai", "zhu"),
            (26, "lucky", "chu"),
        ];
        let keys = (1..=people.len()).map(|k| k.to_string()).collect();
        let docs = people
            .iter()
            .enumerate()
            .map(|(pos, (age, first, last))| Profile {
                id: pos as i64 + 1,
                age: *age,
                name: Name {
                    first: first.to_string(),
                    last: last.to_string(),
                },
            })
            .collect();

        let index = Index::build(keys, docs, Vec::new())?;

        assert_eq!(index.query("age == 12")?, ["1", "2"]);
        assert_eq!(index.query("age >= 22 && age < 26")?, ["3", "4", "5"]);
        assert_eq!(
            index.query(r#"in_array(age, []int{12,22,25}) && name.last == "zhu""#)?,
            ["2", "3"]
        );
        assert_eq!(
            index.query(
                r#"like(name.first, "vic.*") || in_array(name.last, []string{"zhu", "chu"})"#
            )?,
            ["2", "3", "4", "6", "7"]
        );
        assert_eq!(
            index.query(r#"!(name.first == "chirl") && age == 12"#)?,
            ["2"]
        );
        assert!(matches!(
            index.query(r#"name.first > "eric""#),
            Err(IndexError::TypeMismatch { .. })
        ));

        let docs = index.query_docs(
            "age > 12",
            &Options::new()
                .filter(|doc: &Profile| doc.name.last == "zhu")
                .order_by(|a: &Profile, b: &Profile| a.age > b.age),
        )?;
        assert_eq!(
            docs.iter().map(|doc| doc.id).collect::<Vec<_>>(),
            [6, 3]
        );

        Ok(())
    }
}
