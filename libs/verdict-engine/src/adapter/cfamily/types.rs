//! Static types the C-family lowering tracks.
//!
//! Only as much typing as the translation needs: integer division must
//! truncate, `char` arithmetic works on code points, and collection methods
//! map differently for maps, sets, stacks and queues.

use super::Dialect;
use crate::adapter::ir::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqKind {
    /// Fixed-size array (`int[]`, `int a[n]`).
    Array,
    /// `vector`, `List`, `ArrayList`
    List,
    Stack,
    Queue,
    Deque,
}

/// What an iterator-typed expression stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// `begin()`/`end()` and their reverse forms: the expression is the
    /// container, only usable as a range bound.
    Begin,
    End,
    ReverseBegin,
    ReverseEnd,
    /// Result of `find`: the expression is a presence test that is only
    /// compared against `end()`.
    Found,
    /// Result of `max_element` and friends: the expression is the element.
    Element,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Float,
    Bool,
    Char,
    Str,
    /// `StringBuilder`: a mutable string kept in a plain variable.
    Builder,
    Void,
    Seq(SeqKind, Box<Type>),
    Map {
        key: Box<Type>,
        value: Box<Type>,
        ordered: bool,
    },
    Set {
        elem: Box<Type>,
        ordered: bool,
    },
    Pair(Box<Type>, Box<Type>),
    /// Iterator into `container`. Iterators are never materialized; the
    /// expression carrying one depends on `position`.
    Iter {
        container: Box<Type>,
        position: Position,
    },
    /// Class-like name used for static members (`Math`, `Integer`, ...).
    Namespace(String),
    /// `Integer::sum` and similar.
    MethodRef(String),
    Unknown,
}

impl Type {
    pub fn seq(kind: SeqKind, elem: Type) -> Self {
        Type::Seq(kind, Box::new(elem))
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Int | Type::Char)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Char)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Type::Str | Type::Builder)
    }

    /// Values shared by reference in the common form.
    pub fn is_container(&self) -> bool {
        matches!(self, Type::Seq(..) | Type::Map { .. } | Type::Set { .. } | Type::Pair(..))
    }

    pub fn iter(container: &Type, position: Position) -> Self {
        Type::Iter {
            container: Box::new(container.clone()),
            position,
        }
    }

    /// Type of `value[i]`.
    pub fn element(&self) -> Type {
        match self {
            Type::Seq(_, elem) => (**elem).clone(),
            Type::Str | Type::Builder => Type::Char,
            Type::Map { value, .. } => (**value).clone(),
            _ => Type::Unknown,
        }
    }

    /// Type produced by iterating over a value of this type.
    pub fn item(&self) -> Type {
        match self {
            Type::Seq(_, elem) => (**elem).clone(),
            Type::Str | Type::Builder => Type::Char,
            Type::Set { elem, .. } => (**elem).clone(),
            Type::Map { key, value, .. } => Type::Pair(key.clone(), value.clone()),
            _ => Type::Unknown,
        }
    }

    /// Value a declaration without initializer starts with.
    pub fn default_value(&self, dialect: Dialect) -> Expr {
        match self {
            Type::Char => Expr::string("\0"),
            Type::Int | Type::Float => Expr::number(0),
            Type::Bool => Expr::Bool(false),
            // Java references start out null; C++ objects are constructed empty.
            _ if dialect == Dialect::Java => Expr::Null,
            Type::Str | Type::Builder => Expr::string(""),
            Type::Seq(..) => Expr::Array(vec![]),
            Type::Pair(a, b) => Expr::Array(vec![a.default_value(dialect), b.default_value(dialect)]),
            Type::Map { .. } => Expr::construct("Map", vec![]),
            Type::Set { .. } => Expr::construct("Set", vec![]),
            _ => Expr::Null,
        }
    }

    /// Element default for `new T[n]` and `vector<T>(n)`, which zero-fill
    /// primitives and default-construct C++ objects.
    pub fn fill_value(&self, dialect: Dialect) -> Expr {
        match self {
            Type::Int | Type::Float | Type::Char | Type::Bool => self.default_value(dialect),
            _ if dialect == Dialect::Java => Expr::Null,
            _ => self.default_value(dialect),
        }
    }

    /// Result type of arithmetic on two operands.
    pub fn arithmetic(lhs: &Type, rhs: &Type) -> Type {
        match (lhs, rhs) {
            (Type::Float, r) if r.is_numeric() => Type::Float,
            (l, Type::Float) if l.is_numeric() => Type::Float,
            (l, r) if l.is_integral() && r.is_integral() => Type::Int,
            _ => Type::Unknown,
        }
    }
}

/// Resolve a single-word type name and its generic arguments. `Ok(None)`
/// means the name is not a type in `dialect`.
pub fn named(name: &str, args: Vec<Type>, dialect: Dialect) -> Result<Option<Type>, &'static str> {
    if is_primitive(name) {
        return Ok(Some(primitive(&[name])));
    }
    let mut args = args.into_iter();
    let mut arg = || args.next().unwrap_or(Type::Unknown);
    let ty = match (dialect, name) {
        (_, "void") => Type::Void,
        (Dialect::Java, "Integer" | "Long" | "Short" | "Byte") => Type::Int,
        (Dialect::Java, "Float" | "Double") => Type::Float,
        (Dialect::Java, "Boolean") => Type::Bool,
        (Dialect::Java, "Character") => Type::Char,
        (Dialect::Java, "String") | (Dialect::Cpp, "string") => Type::Str,
        (Dialect::Java, "StringBuilder" | "StringBuffer") => Type::Builder,
        (Dialect::Java, "var" | "Object") | (Dialect::Cpp, "auto") => Type::Unknown,
        (Dialect::Cpp, "size_t" | "int64_t" | "int32_t" | "uint64_t" | "uint32_t") => Type::Int,
        (Dialect::Java, "List" | "ArrayList" | "LinkedList" | "Collection") | (Dialect::Cpp, "vector") => {
            Type::seq(SeqKind::List, arg())
        }
        (Dialect::Java, "Stack") | (Dialect::Cpp, "stack") => Type::seq(SeqKind::Stack, arg()),
        (Dialect::Java, "Queue") | (Dialect::Cpp, "queue") => Type::seq(SeqKind::Queue, arg()),
        (Dialect::Java, "Deque" | "ArrayDeque") | (Dialect::Cpp, "deque") => {
            Type::seq(SeqKind::Deque, arg())
        }
        (Dialect::Java, "Map" | "HashMap" | "LinkedHashMap") | (Dialect::Cpp, "unordered_map") => {
            Type::Map {
                key: Box::new(arg()),
                value: Box::new(arg()),
                ordered: false,
            }
        }
        (Dialect::Java, "TreeMap") | (Dialect::Cpp, "map") => Type::Map {
            key: Box::new(arg()),
            value: Box::new(arg()),
            ordered: true,
        },
        (Dialect::Java, "Set" | "HashSet" | "LinkedHashSet") | (Dialect::Cpp, "unordered_set") => {
            Type::Set {
                elem: Box::new(arg()),
                ordered: false,
            }
        }
        (Dialect::Java, "TreeSet") | (Dialect::Cpp, "set") => Type::Set {
            elem: Box::new(arg()),
            ordered: true,
        },
        (Dialect::Java, "Entry") | (Dialect::Cpp, "pair") => {
            let first = arg();
            Type::Pair(Box::new(first), Box::new(arg()))
        }
        (Dialect::Java, "PriorityQueue") | (Dialect::Cpp, "priority_queue") => {
            return Err("priority queue")
        }
        (Dialect::Cpp, "multiset" | "multimap" | "unordered_multiset" | "unordered_multimap") => {
            return Err("multi-valued container")
        }
        (Dialect::Java, "Iterator" | "Scanner" | "BufferedReader" | "Optional" | "Comparator")
        | (Dialect::Cpp, "tuple" | "array" | "bitset" | "list" | "function") => {
            return Err("standard library type")
        }
        _ => return Ok(None),
    };
    Ok(Some(ty))
}

/// Words that spell primitive types, including C++ multi-word forms such
/// as `unsigned long long`.
pub fn is_primitive(name: &str) -> bool {
    matches!(
        name,
        "int" | "long" | "short" | "byte" | "float" | "double" | "char" | "bool" | "boolean"
            | "unsigned" | "signed"
    )
}

/// Type spelled by a run of primitive words.
pub fn primitive(words: &[&str]) -> Type {
    if words.iter().any(|w| matches!(*w, "double" | "float")) {
        Type::Float
    } else if words.contains(&"char") {
        Type::Char
    } else if words.iter().any(|w| matches!(*w, "bool" | "boolean")) {
        Type::Bool
    } else {
        Type::Int
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_arguments() {
        let ty = named(
            "unordered_map",
            vec![Type::Str, Type::seq(SeqKind::List, Type::Int)],
            Dialect::Cpp,
        )
        .unwrap()
        .unwrap();
        assert_eq!(ty.element(), Type::seq(SeqKind::List, Type::Int));
        assert_eq!(
            ty.item(),
            Type::Pair(Box::new(Type::Str), Box::new(Type::seq(SeqKind::List, Type::Int)))
        );
    }

    #[test]
    fn test_unknown_and_rejected_names() {
        assert_eq!(named("Solution", vec![], Dialect::Java), Ok(None));
        assert_eq!(named("PriorityQueue", vec![Type::Int], Dialect::Java), Err("priority queue"));
    }

    #[test]
    fn test_names_are_per_dialect() {
        assert_eq!(named("set", vec![], Dialect::Java), Ok(None));
        assert!(matches!(named("set", vec![Type::Int], Dialect::Cpp), Ok(Some(Type::Set { ordered: true, .. }))));
        assert_eq!(named("String", vec![], Dialect::Cpp), Ok(None));
        assert_eq!(primitive(&["unsigned", "long", "long"]), Type::Int);
        assert_eq!(primitive(&["long", "double"]), Type::Float);
    }

    #[test]
    fn test_arithmetic_promotion() {
        assert_eq!(Type::arithmetic(&Type::Int, &Type::Char), Type::Int);
        assert_eq!(Type::arithmetic(&Type::Int, &Type::Float), Type::Float);
        assert_eq!(Type::arithmetic(&Type::Unknown, &Type::Int), Type::Unknown);
    }

    #[test]
    fn test_defaults_per_dialect() {
        assert_eq!(Type::Str.default_value(Dialect::Java), Expr::Null);
        assert_eq!(Type::Str.default_value(Dialect::Cpp), Expr::string(""));
        assert_eq!(Type::Int.default_value(Dialect::Java), Expr::number(0));
        assert_eq!(
            Type::seq(SeqKind::List, Type::Int).fill_value(Dialect::Java),
            Expr::Null
        );
    }
}
