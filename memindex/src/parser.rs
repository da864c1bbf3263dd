//! BNF grammar:
//!
//! ```text
//! expression = or EOF
//! or         = and (WS* "||" and)*
//! and        = unary (WS* "&&" unary)*
//! unary      = WS* "!" unary | primary
//! primary    = WS* "(" or WS* ")" | call | comparison
//! comparison = path WS* ("==" | "!=" | "<=" | ">=" | "<" | ">") literal
//! call       = ident WS* "(" path WS* "," (array | literal) WS* ")"
//! array      = "[]" ident WS* "{" (literal ("," literal)*)? WS* "}"
//! path       = ident ("." ident)*
//! ident      = (alpha | "_") (alphanumeric | "_")*
//! literal    = "-"? digit+ ("." digit+)? | doubleQuoted
//! ```
//!
//! The element type identifier of an array literal (`[]int{...}`,
//! `[]string{...}`) is accepted and ignored; elements validate by literal
//! kind during evaluation. The parser also accepts any call name, so that
//! unknown functions surface as evaluation errors rather than parse errors.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while};
use nom::character::complete::{char, digit1, multispace0, satisfy};
use nom::combinator::{eof, map, opt, recognize};
use nom::multi::{many0, separated_list0, separated_list1};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::Finish;

use crate::error::{IndexError, IndexResult};

type IResult<'a, O> = nom::IResult<&'a str, O>;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallArg {
    Literal(Literal),
    Array(Vec<Literal>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        field: String,
        op: CmpOp,
        literal: Literal,
    },
    Call {
        name: String,
        field: String,
        arg: CallArg,
    },
}

impl Expr {
    pub fn parse(input: &str) -> IndexResult<Expr> {
        match terminated(parse_or, preceded(multispace0, eof))(input).finish() {
            Ok((_, expr)) => Ok(expr),
            Err(err) if err.input.is_empty() => {
                Err(IndexError::Parse("unexpected end of input".to_string()))
            }
            Err(err) => Err(IndexError::Parse(format!(
                "unexpected input at `{}`",
                err.input
            ))),
        }
    }
}

/// Removes optional whitespace before and after the inner parser.
fn ws<'a, O>(
    inner: impl FnMut(&'a str) -> IResult<'a, O>,
) -> impl FnMut(&'a str) -> IResult<'a, O> {
    delimited(multispace0, inner, multispace0)
}

fn parse_or(input: &str) -> IResult<Expr> {
    let (input, first) = parse_and(input)?;
    let (input, mut rest) = many0(preceded(ws(tag("||")), parse_and))(input)?;
    if rest.is_empty() {
        Ok((input, first))
    } else {
        rest.insert(0, first);
        Ok((input, Expr::Or(rest)))
    }
}

fn parse_and(input: &str) -> IResult<Expr> {
    let (input, first) = parse_unary(input)?;
    let (input, mut rest) = many0(preceded(ws(tag("&&")), parse_unary))(input)?;
    if rest.is_empty() {
        Ok((input, first))
    } else {
        rest.insert(0, first);
        Ok((input, Expr::And(rest)))
    }
}

fn parse_unary(input: &str) -> IResult<Expr> {
    alt((
        map(preceded(ws(char('!')), parse_unary), |expr| {
            Expr::Not(Box::new(expr))
        }),
        parse_primary,
    ))(input)
}

fn parse_primary(input: &str) -> IResult<Expr> {
    alt((
        delimited(ws(char('(')), parse_or, ws(char(')'))),
        parse_call,
        parse_comparison,
    ))(input)
}

fn parse_comparison(input: &str) -> IResult<Expr> {
    let (input, field) = ws(field_path)(input)?;
    let (input, op) = alt((
        tag("=="),
        tag("!="),
        tag("<="),
        tag(">="),
        tag("<"),
        tag(">"),
    ))(input)?;
    let (input, literal) = ws(parse_literal)(input)?;
    let op = match op {
        "==" => CmpOp::Eq,
        "!=" => CmpOp::Ne,
        "<=" => CmpOp::Le,
        ">=" => CmpOp::Ge,
        "<" => CmpOp::Lt,
        ">" => CmpOp::Gt,
        _ => unreachable!(),
    };
    Ok((input, Expr::Compare { field, op, literal }))
}

fn parse_call(input: &str) -> IResult<Expr> {
    let (input, name) = ws(identifier)(input)?;
    let (input, _) = char('(')(input)?;
    let (input, field) = ws(field_path)(input)?;
    let (input, _) = char(',')(input)?;
    let (input, arg) = ws(alt((
        map(parse_array, CallArg::Array),
        map(parse_literal, CallArg::Literal),
    )))(input)?;
    let (input, _) = char(')')(input)?;
    Ok((
        input,
        Expr::Call {
            name: name.to_string(),
            field,
            arg,
        },
    ))
}

/// array = "[]" ident "{" literal ("," literal)* "}"
fn parse_array(input: &str) -> IResult<Vec<Literal>> {
    let (input, _) = tag("[]")(input)?;
    let (input, _) = identifier(input)?;
    delimited(
        ws(char('{')),
        separated_list0(char(','), ws(parse_literal)),
        char('}'),
    )(input)
}

fn identifier(input: &str) -> IResult<&str> {
    recognize(pair(
        satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn field_path(input: &str) -> IResult<String> {
    map(
        recognize(separated_list1(char('.'), identifier)),
        str::to_string,
    )(input)
}

fn parse_literal(input: &str) -> IResult<Literal> {
    alt((parse_string, parse_number))(input)
}

/// Double-quoted string; a backslash escapes the next character.
fn parse_string(input: &str) -> IResult<Literal> {
    let (input, _) = char('"')(input)?;
    let mut value = String::new();
    let mut iter = input.char_indices();
    while let Some((idx, c)) = iter.next() {
        match c {
            '"' => return Ok((&input[idx + 1..], Literal::Str(value))),
            '\\' => match iter.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            _ => value.push(c),
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn parse_number(input: &str) -> IResult<Literal> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;
    let literal = if text.contains('.') {
        match text.parse::<f64>() {
            Ok(num) => Literal::Float(num),
            Err(_) => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Float,
                )))
            }
        }
    } else {
        match text.parse::<i64>() {
            Ok(num) => Literal::Int(num),
            Err(_) => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Digit,
                )))
            }
        }
    };
    Ok((rest, literal))
}
