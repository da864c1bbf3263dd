use roaring::RoaringBitmap;
use tracing::debug;

use crate::{
    error::{IndexError, IndexResult},
    parser::{CallArg, CmpOp, Expr, Literal},
    postings::RangeKey,
    segment::Segment,
};

/// Parses and evaluates a query expression against a segment, returning the
/// matching external keys in document insertion order.
pub fn execute(segment: &Segment, query: &str) -> IndexResult<Vec<String>> {
    let expr = Expr::parse(query)?;
    let docs = evaluate(segment, &expr)?;
    debug!(query, matches = docs.len(), "query evaluated");
    segment.external_keys(&docs)
}

/// Post-order walk; every node yields a bitmap of internal doc ids. The AST
/// operator alone determines how child bitmaps combine.
fn evaluate(segment: &Segment, expr: &Expr) -> IndexResult<RoaringBitmap> {
    match expr {
        Expr::And(children) => {
            let mut children = children.iter();
            let mut docs = match children.next() {
                Some(child) => evaluate(segment, child)?,
                None => return Ok(RoaringBitmap::new()),
            };
            for child in children {
                docs &= evaluate(segment, child)?;
            }
            Ok(docs)
        }
        Expr::Or(children) => {
            let mut docs = RoaringBitmap::new();
            for child in children {
                docs |= evaluate(segment, child)?;
            }
            Ok(docs)
        }
        Expr::Not(inner) => Ok(complement(segment, evaluate(segment, inner)?)),
        Expr::Compare { field, op, literal } => compare(segment, field, *op, literal),
        Expr::Call { name, field, arg } => match name.as_str() {
            "in_array" => in_array(segment, field, arg),
            "like" => like(segment, field, arg),
            _ => Err(IndexError::UnknownFunction(name.clone())),
        },
    }
}

fn complement(segment: &Segment, mut docs: RoaringBitmap) -> RoaringBitmap {
    docs ^= segment.all_docs();
    docs
}

fn compare(
    segment: &Segment,
    field: &str,
    op: CmpOp,
    literal: &Literal,
) -> IndexResult<RoaringBitmap> {
    match op {
        CmpOp::Eq | CmpOp::Ne => {
            let docs = equality(segment, field, op.symbol(), literal)?;
            if op == CmpOp::Ne {
                // Note: this includes documents without any value for the
                // field.
                Ok(complement(segment, docs))
            } else {
                Ok(docs)
            }
        }
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let Literal::Int(num) = literal else {
                return Err(IndexError::TypeMismatch {
                    field: field.to_string(),
                    op: op.symbol(),
                    expected: "only integer literals are accepted",
                });
            };
            let postings = segment.range_postings_of(field, op.symbol())?;
            let key = RangeKey::Int(*num);
            Ok(match op {
                CmpOp::Lt => postings.lt(key),
                CmpOp::Le => postings.le(key),
                CmpOp::Gt => postings.gt(key),
                CmpOp::Ge => postings.ge(key),
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            })
        }
    }
}

/// Term equality dispatched by literal kind: strings hit the term
/// dictionary, integers the range postings.
fn equality(
    segment: &Segment,
    field: &str,
    op: &'static str,
    literal: &Literal,
) -> IndexResult<RoaringBitmap> {
    match literal {
        Literal::Str(term) => segment.term_docs(field, term, op),
        Literal::Int(num) => Ok(segment
            .range_postings_of(field, op)?
            .eq(RangeKey::Int(*num))),
        Literal::Float(_) => Err(IndexError::TypeMismatch {
            field: field.to_string(),
            op,
            expected: "float literals cannot be matched against the index",
        }),
    }
}

fn in_array(segment: &Segment, field: &str, arg: &CallArg) -> IndexResult<RoaringBitmap> {
    let CallArg::Array(elements) = arg else {
        return Err(IndexError::TypeMismatch {
            field: field.to_string(),
            op: "in_array",
            expected: "second argument must be an array literal",
        });
    };
    let mut docs = RoaringBitmap::new();
    for element in elements {
        docs |= equality(segment, field, "in_array", element)?;
    }
    Ok(docs)
}

fn like(segment: &Segment, field: &str, arg: &CallArg) -> IndexResult<RoaringBitmap> {
    let CallArg::Literal(Literal::Str(pattern)) = arg else {
        return Err(IndexError::TypeMismatch {
            field: field.to_string(),
            op: "like",
            expected: "pattern must be a string literal",
        });
    };
    segment.regex_docs(field, pattern)
}
