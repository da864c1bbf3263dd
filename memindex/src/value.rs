use std::borrow::Borrow;
use std::fmt;

/// Dotted path of a field inside a (possibly nested) document,
/// e.g. `name.first`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn root() -> Self {
        FieldPath(String::new())
    }

    /// Appends a path segment: `name` joined with `first` is `name.first`.
    pub fn join(&self, segment: &str) -> Self {
        if self.0.is_empty() {
            FieldPath(segment.to_string())
        } else {
            FieldPath(format!("{}.{}", self.0, segment))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FieldPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath(path.to_string())
    }
}

impl From<String> for FieldPath {
    fn from(path: String) -> Self {
        FieldPath(path)
    }
}

/// Tagged value extracted from a document field.
///
/// List values index every element under the same field path. `Nil` marks an
/// absent value and is skipped everywhere. `Unsupported` carries the type
/// name of an annotated field that cannot be indexed; mapping initialization
/// rejects it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    IntList(Vec<i64>),
    StrList(Vec<String>),
    Nil,
    Unsupported(&'static str),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::IntList(_) => "int list",
            Value::StrList(_) => "string list",
            Value::Nil => "nil",
            Value::Unsupported(name) => name,
        }
    }
}

/// Types that report their own index value instead of being recognized
/// structurally. A timestamp type would return `Value::Int(epoch_seconds)`
/// here; the walker substitutes the returned value before indexing.
///
/// Selected per field with `#[index("...", custom)]`.
pub trait CustomValue {
    fn index_value(&self) -> Value;
}

impl CustomValue for String {
    fn index_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl CustomValue for Vec<String> {
    fn index_value(&self) -> Value {
        Value::StrList(self.clone())
    }
}

impl<T: CustomValue> CustomValue for Option<T> {
    fn index_value(&self) -> Value {
        match self {
            Some(value) => value.index_value(),
            None => Value::Nil,
        }
    }
}

impl<T: CustomValue> CustomValue for Box<T> {
    fn index_value(&self) -> Value {
        (**self).index_value()
    }
}

macro_rules! impl_int_custom_value {
    ($($int:ty),*) => {
        $(
            impl CustomValue for $int {
                fn index_value(&self) -> Value {
                    Value::Int(*self as i64)
                }
            }

            impl CustomValue for Vec<$int> {
                fn index_value(&self) -> Value {
                    Value::IntList(self.iter().map(|v| *v as i64).collect())
                }
            }
        )*
    };
}

impl_int_custom_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
