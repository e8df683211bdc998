//! Type-directed lowering of operators, assignments and standard library
//! calls.
//!
//! Strings and `StringBuilder`s are plain JavaScript strings, lists, arrays,
//! stacks, queues and deques are arrays, maps and sets are `Map`/`Set`, and
//! pairs are two-element arrays. Anything outside these tables is rejected
//! as an unsupported construct.

use super::parser::{Parser, Typed};
use super::types::{Position, SeqKind, Type};
use super::Dialect;
use crate::adapter::ir::{AssignOp, BinaryOp, Expr, Helper, PropKey, UnaryOp};
use crate::error::{AdapterError, AdapterResult};

const CPP_BUILTINS: &[&str] = &[
    "max", "min", "abs", "fabs", "labs", "llabs", "sqrt", "pow", "floor", "ceil", "log", "log2",
    "log10", "exp", "sin", "cos", "tan", "atan", "atan2", "hypot", "cbrt", "round", "trunc",
    "swap", "to_string", "stoi", "stol", "stoll", "atoi", "stod", "stof", "sort", "stable_sort",
    "reverse", "accumulate", "max_element", "min_element", "count", "find", "fill", "isdigit",
    "isalpha", "isalnum", "isupper", "islower", "isspace", "toupper", "tolower", "make_pair",
    "runtime_error", "invalid_argument", "out_of_range", "logic_error", "length_error",
    "domain_error", "exception",
];

/// Code point of a one-character string.
pub(super) fn char_code(expr: Expr) -> Expr {
    if let Expr::Str(text) = &expr {
        let mut chars = text.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Expr::number(c as u32);
        }
    }
    Expr::method(expr, "charCodeAt", vec![Expr::number(0)])
}

/// One-character string for a code point.
pub(super) fn from_code(expr: Expr) -> Expr {
    if let Expr::Number(text) = &expr {
        if let Some(c) = text.parse::<u32>().ok().and_then(char::from_u32) {
            return Expr::string(c);
        }
    }
    Expr::method(Expr::ident("String"), "fromCharCode", vec![expr])
}

/// `char` operands take part in arithmetic as their code point.
pub(super) fn numeric(expr: Expr, ty: &Type) -> Expr {
    if *ty == Type::Char {
        char_code(expr)
    } else {
        expr
    }
}

/// Implicit conversion of a value of type `from` into a slot of type `to`.
pub(super) fn coerce(expr: Expr, from: &Type, to: &Type) -> Expr {
    match (from, to) {
        (Type::Float, Type::Int) => Expr::math("trunc", vec![expr]),
        (Type::Char, Type::Int | Type::Float) => char_code(expr),
        (Type::Int, Type::Char) => from_code(expr),
        _ => expr,
    }
}

/// Explicit `(T) value` conversion.
pub(super) fn cast(expr: Expr, from: &Type, to: &Type) -> Expr {
    match (from, to) {
        (Type::Unknown, Type::Int) => Expr::math("trunc", vec![expr]),
        (Type::Bool, Type::Int) => Expr::call(Expr::ident("Number"), vec![expr]),
        _ => coerce(expr, from, to),
    }
}

/// C++ copies containers on assignment and by-value passing; the common
/// form shares them, so copies are made explicit.
pub(super) fn copy_value(expr: Expr, ty: &Type, dialect: Dialect) -> Expr {
    let place = matches!(expr, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. })
        || matches!(expr, Expr::Helper { helper: Helper::MapEntry, .. });
    if dialect == Dialect::Cpp && ty.is_container() && place {
        Expr::call(Expr::ident("structuredClone"), vec![expr])
    } else {
        expr
    }
}

/// `count` copies of `value`, each one fresh.
pub(super) fn repeat_value(count: Expr, value: Expr) -> Expr {
    match value {
        Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) => Expr::method(
            Expr::construct("Array", vec![count]),
            "fill",
            vec![value],
        ),
        Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. } => array_from(
            count,
            Expr::call(Expr::ident("structuredClone"), vec![value]),
        ),
        other => array_from(count, other),
    }
}

/// `Array.from({ length: count }, () => value)`
pub(super) fn array_from(count: Expr, value: Expr) -> Expr {
    Expr::method(
        Expr::ident("Array"),
        "from",
        vec![
            Expr::Object(vec![(PropKey::Static("length".to_string()), count)]),
            Expr::arrow(&[], value),
        ],
    )
}

/// Numeric literal text, negated through a unary minus when needed.
pub(super) fn literal(text: &str) -> Expr {
    match text.strip_prefix('-') {
        Some(positive) => Expr::unary(UnaryOp::Neg, Expr::Number(positive.to_string())),
        None => Expr::Number(text.to_string()),
    }
}

fn values(args: Vec<Typed>) -> Vec<Expr> {
    args.into_iter().map(|(expr, _)| expr).collect()
}

fn numerics(args: Vec<Typed>) -> Vec<Expr> {
    args.into_iter().map(|(expr, ty)| numeric(expr, &ty)).collect()
}

fn arity<const N: usize>(line: usize, name: &str, args: Vec<Typed>) -> AdapterResult<[Typed; N]> {
    args.try_into().map_err(|args: Vec<Typed>| {
        AdapterError::syntax(
            line,
            format!("'{name}' expects {N} argument(s), got {}", args.len()),
        )
    })
}

fn length(expr: Expr) -> Expr {
    Expr::member(expr, "length")
}

fn is_empty(size: Expr) -> Expr {
    Expr::binary(BinaryOp::Eq, size, Expr::number(0))
}

fn first(expr: Expr) -> Expr {
    Expr::index(expr, Expr::number(0))
}

fn last(expr: Expr) -> Expr {
    let index = Expr::binary(BinaryOp::Sub, length(expr.clone()), Expr::number(1));
    Expr::index(expr, index)
}

fn assign(target: Expr, value: Expr) -> Expr {
    Expr::assign(AssignOp::Assign, target, value)
}

/// `[a, b] = [b, a]`
fn swap(a: Expr, b: Expr) -> Expr {
    assign(
        Expr::Array(vec![a.clone(), b.clone()]),
        Expr::Array(vec![b, a]),
    )
}

/// `text.slice(0, start) + insert + text.slice(end)`
fn splice(text: &Expr, start: Expr, end: Expr, insert: Option<Expr>) -> Expr {
    let head = Expr::method(text.clone(), "slice", vec![Expr::number(0), start]);
    let tail = Expr::method(text.clone(), "slice", vec![end]);
    let head = match insert {
        Some(insert) => Expr::binary(BinaryOp::Add, head, insert),
        None => head,
    };
    Expr::binary(BinaryOp::Add, head, tail)
}

fn plus_one(expr: Expr) -> Expr {
    Expr::binary(BinaryOp::Add, expr, Expr::number(1))
}

/// Three-way comparison returning -1, 0 or 1.
fn compare(a: Expr, b: Expr) -> Expr {
    Expr::conditional(
        Expr::binary(BinaryOp::Lt, a.clone(), b.clone()),
        literal("-1"),
        Expr::conditional(
            Expr::binary(BinaryOp::Gt, a, b),
            Expr::number(1),
            Expr::number(0),
        ),
    )
}

fn is_char_at(expr: &Expr) -> bool {
    matches!(expr, Expr::Call { callee, .. }
        if matches!(&**callee, Expr::Member { property, .. } if property == "charAt"))
}

fn compound(op: BinaryOp) -> Option<AssignOp> {
    Some(match op {
        BinaryOp::Add => AssignOp::Add,
        BinaryOp::Sub => AssignOp::Sub,
        BinaryOp::Mul => AssignOp::Mul,
        BinaryOp::Div => AssignOp::Div,
        BinaryOp::Mod => AssignOp::Mod,
        BinaryOp::BitAnd => AssignOp::BitAnd,
        BinaryOp::BitOr => AssignOp::BitOr,
        BinaryOp::BitXor => AssignOp::BitXor,
        BinaryOp::Shl => AssignOp::Shl,
        BinaryOp::Shr => AssignOp::Shr,
        _ => return None,
    })
}

/// Variable a `StringBuilder` expression ultimately writes to.
fn builder_base(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. } => Some(expr.clone()),
        Expr::Assign { target, .. } => Some((**target).clone()),
        Expr::Sequence(items) => items.last().and_then(builder_base),
        _ => None,
    }
}

/// Chain a builder update after whatever the receiver already did.
fn rebind(previous: Expr, next: Expr) -> Expr {
    match previous {
        Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. } => next,
        Expr::Sequence(mut items) => {
            items.push(next);
            Expr::Sequence(items)
        }
        other => Expr::Sequence(vec![other, next]),
    }
}

fn map_keys(map: Expr, ordered: bool) -> Expr {
    let keys = Expr::method(map, "keys", vec![]);
    if ordered {
        Expr::helper(Helper::Sorted, vec![keys])
    } else {
        Expr::Array(vec![Expr::Spread(Box::new(keys))])
    }
}

fn map_entries(map: Expr, ordered: bool) -> Expr {
    if ordered {
        Expr::helper(Helper::Sorted, vec![map])
    } else {
        Expr::Array(vec![Expr::Spread(Box::new(map))])
    }
}

fn spread(expr: Expr) -> Expr {
    Expr::Array(vec![Expr::Spread(Box::new(expr))])
}

impl Parser {
    fn method_unsupported<T>(&self, line: usize, owner: &str, name: &str) -> AdapterResult<T> {
        Err(AdapterError::unsupported(
            line,
            format!("method '{name}' on {owner}"),
        ))
    }

    // ---- operators ------------------------------------------------------

    pub(super) fn binary(
        &self,
        line: usize,
        op: BinaryOp,
        (lhs, lhs_ty): Typed,
        (rhs, rhs_ty): Typed,
    ) -> AdapterResult<Typed> {
        if matches!(lhs_ty, Type::Iter { .. }) || matches!(rhs_ty, Type::Iter { .. }) {
            return self.iterator_comparison(line, op, (lhs, lhs_ty), (rhs, rhs_ty));
        }
        Ok(match op {
            BinaryOp::Add if lhs_ty.is_text() || rhs_ty.is_text() => {
                (Expr::binary(op, lhs, rhs), Type::Str)
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let ty = Type::arithmetic(&lhs_ty, &rhs_ty);
                let expr = Expr::binary(op, numeric(lhs, &lhs_ty), numeric(rhs, &rhs_ty));
                if op == BinaryOp::Div && ty == Type::Int {
                    (Expr::math("trunc", vec![expr]), ty)
                } else {
                    (expr, ty)
                }
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge
                if self.dialect == Dialect::Cpp
                    && (is_container(&lhs_ty) || is_container(&rhs_ty)) =>
            {
                return container_comparison(line, op, (lhs, lhs_ty), (rhs, rhs_ty));
            }
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => {
                // A `char` compared with a number compares its code.
                let mixed = |a: &Type, b: &Type| *a == Type::Char && b.is_numeric() && *b != Type::Char;
                let lhs = if mixed(&lhs_ty, &rhs_ty) { char_code(lhs) } else { lhs };
                let rhs = if mixed(&rhs_ty, &lhs_ty) { char_code(rhs) } else { rhs };
                (Expr::binary(op, lhs, rhs), Type::Bool)
            }
            BinaryOp::And | BinaryOp::Or => (Expr::binary(op, lhs, rhs), Type::Bool),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
                if lhs_ty == Type::Bool && rhs_ty == Type::Bool =>
            {
                let bits = Expr::binary(op, lhs, rhs);
                (Expr::call(Expr::ident("Boolean"), vec![bits]), Type::Bool)
            }
            _ => (
                Expr::binary(op, numeric(lhs, &lhs_ty), numeric(rhs, &rhs_ty)),
                Type::Int,
            ),
        })
    }

    /// Only `find(...) != end()` and its negation survive lowering.
    fn iterator_comparison(
        &self,
        line: usize,
        op: BinaryOp,
        (lhs, lhs_ty): Typed,
        (rhs, rhs_ty): Typed,
    ) -> AdapterResult<Typed> {
        let position = |ty: &Type| match ty {
            Type::Iter { position, .. } => Some(*position),
            _ => None,
        };
        let found = match (position(&lhs_ty), position(&rhs_ty)) {
            (Some(Position::Found), Some(Position::End)) => lhs,
            (Some(Position::End), Some(Position::Found)) => rhs,
            _ => return Err(AdapterError::unsupported(line, "iterator arithmetic")),
        };
        match op {
            BinaryOp::NotEq => Ok((found, Type::Bool)),
            BinaryOp::Eq => Ok((Expr::unary(UnaryOp::Not, found), Type::Bool)),
            _ => Err(AdapterError::unsupported(line, "iterator arithmetic")),
        }
    }

    /// `target = value` or `target op= value`.
    pub(super) fn assignment(
        &self,
        line: usize,
        (target, target_ty): Typed,
        op: Option<BinaryOp>,
        (value, value_ty): Typed,
    ) -> AdapterResult<Typed> {
        let combine = |value: Expr, value_ty: Type| -> AdapterResult<Expr> {
            match op {
                None => Ok(copy_value(
                    coerce(value, &value_ty, &target_ty),
                    &value_ty,
                    self.dialect,
                )),
                Some(op) => {
                    let current = (target.clone(), target_ty.clone());
                    let (combined, ty) = self.binary(line, op, current, (value, value_ty))?;
                    Ok(coerce(combined, &ty, &target_ty))
                }
            }
        };

        // m[k] = v
        if let Expr::Helper {
            helper: Helper::MapEntry,
            args,
        } = &target
        {
            if let [map, key, _] = args.as_slice() {
                let value = combine(value, value_ty)?;
                let set = Expr::method(map.clone(), "set", vec![key.clone(), value]);
                return Ok((set, target_ty));
            }
        }

        // s[i] = c rebuilds the string.
        if let Expr::Call { callee, args } = &target {
            if let (Expr::Member { object, property }, [index]) = (&**callee, args.as_slice()) {
                if property == "charAt" && object.is_assignable() {
                    let value = combine(value, value_ty)?;
                    let rebuilt = splice(object, index.clone(), plus_one(index.clone()), Some(value));
                    return Ok((assign((**object).clone(), rebuilt), Type::Char));
                }
            }
        }

        if !target.is_assignable() {
            return Err(AdapterError::syntax(line, "invalid assignment target"));
        }
        let Some(op) = op else {
            let value = combine(value, value_ty)?;
            return Ok((assign(target, value), target_ty));
        };
        let expand = matches!(target_ty, Type::Char | Type::Bool)
            || (op == BinaryOp::Div && target_ty == Type::Int)
            || (target_ty == Type::Int && value_ty == Type::Float);
        match compound(op) {
            Some(assign_op) if !expand => {
                let value = if target_ty.is_numeric() {
                    numeric(value, &value_ty)
                } else {
                    value
                };
                Ok((Expr::assign(assign_op, target, value), target_ty))
            }
            _ => {
                let value = combine(value, value_ty)?;
                Ok((assign(target, value), target_ty))
            }
        }
    }

    pub(super) fn update(
        &self,
        line: usize,
        (target, ty): Typed,
        increment: bool,
        prefix: bool,
    ) -> AdapterResult<Typed> {
        if matches!(ty, Type::Iter { .. }) {
            return Err(AdapterError::unsupported(line, "iterator increment"));
        }
        let rebuilt = ty == Type::Char
            || is_char_at(&target)
            || matches!(target, Expr::Helper { helper: Helper::MapEntry, .. });
        if rebuilt {
            let op = if increment { BinaryOp::Add } else { BinaryOp::Sub };
            return self.assignment(line, (target, ty), Some(op), (Expr::number(1), Type::Int));
        }
        if !target.is_assignable() {
            return Err(AdapterError::syntax(line, "invalid increment target"));
        }
        Ok((
            Expr::Update {
                increment,
                prefix,
                target: Box::new(target),
            },
            ty,
        ))
    }

    // ---- members --------------------------------------------------------

    pub(super) fn field(&self, (object, ty): Typed, name: &str) -> AdapterResult<Typed> {
        Ok(match (&ty, name) {
            (Type::Namespace(namespace), _) => return self.static_field(namespace, name),
            (Type::Seq(..), "length") => (length(object), Type::Int),
            (Type::Pair(a, _), "first") => (first(object), (**a).clone()),
            (Type::Pair(_, b), "second") => (Expr::index(object, Expr::number(1)), (**b).clone()),
            (Type::Unknown, _) => (Expr::member(object, name), Type::Unknown),
            _ => return self.syntax(format!("unknown field '{name}'")),
        })
    }

    fn static_field(&self, namespace: &str, name: &str) -> AdapterResult<Typed> {
        let number = |ns: &str, property: &str| Expr::member(Expr::ident(ns), property);
        Ok(match (namespace, name) {
            ("Integer", "MAX_VALUE") => (literal("2147483647"), Type::Int),
            ("Integer", "MIN_VALUE") => (literal("-2147483648"), Type::Int),
            ("Long", "MAX_VALUE") => (literal("9223372036854775807"), Type::Int),
            ("Long", "MIN_VALUE") => (literal("-9223372036854775808"), Type::Int),
            ("Double", "MAX_VALUE") => (number("Number", "MAX_VALUE"), Type::Float),
            ("Double", "MIN_VALUE") => (number("Number", "MIN_VALUE"), Type::Float),
            ("Double", "POSITIVE_INFINITY") => (Expr::ident("Infinity"), Type::Float),
            ("Double", "NEGATIVE_INFINITY") => {
                (Expr::unary(UnaryOp::Neg, Expr::ident("Infinity")), Type::Float)
            }
            ("Math", "PI" | "E") => (number("Math", name), Type::Float),
            ("System", "out" | "err") => (Expr::Null, Type::Namespace("System.out".to_string())),
            _ if namespace == "this" || self.is_class(namespace) => match self.lookup(name) {
                Some(ty) => (Expr::ident(name), ty),
                None => return self.syntax(format!("unknown field '{name}'")),
            },
            _ => return self.syntax(format!("unknown field '{namespace}.{name}'")),
        })
    }

    pub(super) fn method_call(
        &self,
        line: usize,
        (recv, ty): Typed,
        name: &str,
        args: Vec<Typed>,
    ) -> AdapterResult<Typed> {
        if self.dialect == Dialect::Cpp && args.is_empty() {
            let position = match name {
                "begin" | "cbegin" => Some(Position::Begin),
                "end" | "cend" => Some(Position::End),
                "rbegin" => Some(Position::ReverseBegin),
                "rend" => Some(Position::ReverseEnd),
                _ => None,
            };
            if let Some(position) = position {
                return Ok((recv, Type::iter(&ty, position)));
            }
        }
        match &ty {
            Type::Namespace(namespace) => self.static_call(line, namespace, name, args),
            Type::Str => self.string_method(line, recv, name, args),
            Type::Builder => self.builder_method(line, recv, name, args),
            Type::Seq(kind, elem) => self.sequence_method(line, recv, *kind, elem, name, args),
            Type::Map {
                key,
                value,
                ordered,
            } => self.map_method(line, recv, (key, value, *ordered), name, args),
            Type::Set { elem, ordered } => self.set_method(line, recv, elem, *ordered, name, args),
            Type::Pair(a, b) => match (name, args.len()) {
                ("getKey", 0) => Ok((first(recv), (**a).clone())),
                ("getValue", 0) => Ok((Expr::index(recv, Expr::number(1)), (**b).clone())),
                _ => self.method_unsupported(line, "entry", name),
            },
            Type::Unknown => Ok(untyped_method(recv, name, args)),
            _ => self.method_unsupported(line, "this value", name),
        }
    }

    fn static_call(
        &self,
        line: usize,
        namespace: &str,
        name: &str,
        args: Vec<Typed>,
    ) -> AdapterResult<Typed> {
        let argc = args.len();
        Ok(match (namespace, name, argc) {
            ("Math", "abs" | "max" | "min", _) => {
                let ty = args
                    .iter()
                    .map(|(_, ty)| ty.clone())
                    .reduce(|a, b| Type::arithmetic(&a, &b))
                    .map(|ty| if ty == Type::Char { Type::Int } else { ty })
                    .unwrap_or(Type::Unknown);
                (Expr::math(name, numerics(args)), ty)
            }
            ("Math", "round", 1) => (Expr::math("round", numerics(args)), Type::Int),
            ("Math", "signum", 1) => (Expr::math("sign", numerics(args)), Type::Float),
            (
                "Math",
                "sqrt" | "cbrt" | "pow" | "floor" | "ceil" | "log" | "log10" | "exp" | "sin"
                | "cos" | "tan" | "atan" | "atan2" | "hypot" | "random",
                _,
            ) => (Expr::math(name, numerics(args)), Type::Float),
            ("Math", "floorMod", 2) => (Expr::helper(Helper::FloorMod, numerics(args)), Type::Int),
            ("Math", "floorDiv", 2) => {
                let [a, b] = arity(line, name, args)?;
                let quotient = Expr::binary(BinaryOp::Div, numeric(a.0, &a.1), numeric(b.0, &b.1));
                (Expr::math("floor", vec![quotient]), Type::Int)
            }
            ("Integer" | "Long", "parseInt" | "parseLong" | "valueOf", 1) => {
                let [(value, ty)] = arity(line, name, args)?;
                if ty.is_text() {
                    let parsed = Expr::call(Expr::ident("parseInt"), vec![value, Expr::number(10)]);
                    (parsed, Type::Int)
                } else {
                    (numeric(value, &ty), Type::Int)
                }
            }
            ("Integer" | "Long" | "Double" | "Character" | "Boolean", "toString", 1)
            | ("String", "valueOf", 1)
                if !matches!(args[0].1, Type::Seq(..)) =>
            {
                (Expr::call(Expr::ident("String"), values(args)), Type::Str)
            }
            ("String", "valueOf" | "copyValueOf", 1) => {
                let [(chars, _)] = arity(line, name, args)?;
                (Expr::method(chars, "join", vec![Expr::string("")]), Type::Str)
            }
            ("Integer" | "Long", "toString", 2) => {
                let [(value, _), (radix, _)] = arity(line, name, args)?;
                (Expr::method(value, "toString", vec![radix]), Type::Str)
            }
            ("Integer" | "Long", "toBinaryString", 1) => {
                let [(value, _)] = arity(line, name, args)?;
                let unsigned = Expr::binary(BinaryOp::UShr, value, Expr::number(0));
                (Expr::method(unsigned, "toString", vec![Expr::number(2)]), Type::Str)
            }
            ("Integer" | "Long" | "Double", "max" | "min", 2) => {
                let ty = Type::arithmetic(&args[0].1, &args[1].1);
                (Expr::math(name, numerics(args)), ty)
            }
            ("Integer" | "Long" | "Double", "sum", 2) => {
                let [a, b] = arity(line, name, args)?;
                self.binary(line, BinaryOp::Add, a, b)?
            }
            ("Integer" | "Long" | "Double" | "Character" | "String", "compare", 2) => {
                let [(a, _), (b, _)] = arity(line, name, args)?;
                (compare(a, b), Type::Int)
            }
            ("Double", "parseDouble" | "valueOf", 1) => {
                (Expr::call(Expr::ident("parseFloat"), values(args)), Type::Float)
            }
            ("Boolean", "parseBoolean", 1) => {
                let [(text, _)] = arity(line, name, args)?;
                (Expr::binary(BinaryOp::Eq, text, Expr::string("true")), Type::Bool)
            }
            ("String", "join", _) if argc >= 2 => {
                let mut args = args.into_iter();
                let separator = args.next().map(|(e, _)| e).unwrap_or_else(|| Expr::string(""));
                let rest: Vec<Typed> = args.collect();
                let items = match rest.as_slice() {
                    [(items, Type::Seq(..))] => items.clone(),
                    _ => Expr::Array(values(rest)),
                };
                (Expr::method(items, "join", vec![separator]), Type::Str)
            }
            ("Character", "isDigit", 1) => (Expr::helper(Helper::IsDigit, values(args)), Type::Bool),
            ("Character", "isLetter" | "isAlphabetic", 1) => {
                (Expr::helper(Helper::IsLetter, values(args)), Type::Bool)
            }
            ("Character", "isLetterOrDigit", 1) => {
                (Expr::helper(Helper::IsAlphanumeric, values(args)), Type::Bool)
            }
            ("Character", "isUpperCase" | "isLowerCase" | "isWhitespace", 1) => {
                let [(c, ty)] = arity(line, name, args)?;
                (char_class(name, coerce(c, &ty, &Type::Char)), Type::Bool)
            }
            ("Character", "toUpperCase" | "toLowerCase", 1) => {
                let [(c, ty)] = arity(line, name, args)?;
                (Expr::method(coerce(c, &ty, &Type::Char), name, vec![]), Type::Char)
            }
            ("Character", "getNumericValue", 1) => {
                let [(c, _)] = arity(line, name, args)?;
                let parsed = Expr::call(Expr::ident("parseInt"), vec![c, Expr::number(36)]);
                (parsed, Type::Int)
            }
            ("Character", "valueOf", 1) => {
                let [(c, _)] = arity(line, name, args)?;
                (c, Type::Char)
            }
            ("Arrays" | "Collections", "sort", 1 | 2) => {
                let mut args = args.into_iter();
                let Some((items, ty)) = args.next() else {
                    return self.syntax("sort expects a collection");
                };
                self.sort_call(line, items, &ty, false, args.next())?
            }
            ("Arrays", "fill", 2) => {
                let [(items, _), (value, _)] = arity(line, name, args)?;
                (Expr::method(items, "fill", vec![value]), Type::Void)
            }
            ("Arrays", "asList", _) | ("List", "of", _) => {
                let elem = args.first().map(|(_, t)| t.clone()).unwrap_or(Type::Unknown);
                match args.as_slice() {
                    [(items, Type::Seq(SeqKind::Array, elem))] => {
                        (spread(items.clone()), Type::seq(SeqKind::List, (**elem).clone()))
                    }
                    _ => (Expr::Array(values(args)), Type::seq(SeqKind::List, elem)),
                }
            }
            ("Set", "of", _) => {
                let elem = args.first().map(|(_, t)| t.clone()).unwrap_or(Type::Unknown);
                let set = Expr::construct("Set", vec![Expr::Array(values(args))]);
                (set, Type::Set { elem: Box::new(elem), ordered: false })
            }
            ("Map", "of", _) if argc % 2 == 0 => {
                let key = args.first().map(|(_, t)| t.clone()).unwrap_or(Type::Unknown);
                let value = args.get(1).map(|(_, t)| t.clone()).unwrap_or(Type::Unknown);
                let flat = values(args);
                let pairs = flat.chunks(2).map(|pair| Expr::Array(pair.to_vec())).collect();
                let map = Expr::construct("Map", vec![Expr::Array(pairs)]);
                (
                    map,
                    Type::Map {
                        key: Box::new(key),
                        value: Box::new(value),
                        ordered: false,
                    },
                )
            }
            ("Arrays", "toString", 1) => {
                let [(items, _)] = arity(line, name, args)?;
                let joined = Expr::method(items, "join", vec![Expr::string(", ")]);
                let text = Expr::binary(
                    BinaryOp::Add,
                    Expr::binary(BinaryOp::Add, Expr::string("["), joined),
                    Expr::string("]"),
                );
                (text, Type::Str)
            }
            ("Arrays", "copyOf", 2) => {
                let [(items, ty), (count, _)] = arity(line, name, args)?;
                (Expr::method(items, "slice", vec![Expr::number(0), count]), ty)
            }
            ("Arrays", "copyOfRange", 3) => {
                let [(items, ty), (from, _), (to, _)] = arity(line, name, args)?;
                (Expr::method(items, "slice", vec![from, to]), ty)
            }
            ("Arrays" | "Objects", "equals", 2) => {
                let [(a, _), (b, _)] = arity(line, name, args)?;
                (Expr::helper(Helper::Equal, vec![a, b]), Type::Bool)
            }
            ("Collections", "reverse", 1) => {
                let [(items, _)] = arity(line, name, args)?;
                (Expr::method(items, "reverse", vec![]), Type::Void)
            }
            ("Collections", "max" | "min", 1) => {
                let [(items, ty)] = arity(line, name, args)?;
                let call = Expr::math(name, vec![Expr::Spread(Box::new(items))]);
                (call, ty.item())
            }
            ("Collections", "swap", 3) => {
                let [(items, _), (i, _), (j, _)] = arity(line, name, args)?;
                let a = Expr::index(items.clone(), i);
                let b = Expr::index(items, j);
                (swap(a, b), Type::Void)
            }
            ("Collections", "frequency", 2) => {
                (Expr::helper(Helper::Count, values(args)), Type::Int)
            }
            ("Collections", "reverseOrder", 0) => (Expr::Null, Type::MethodRef("reverse".to_string())),
            ("Collections", "emptyList", 0) => {
                (Expr::Array(vec![]), Type::seq(SeqKind::List, Type::Unknown))
            }
            ("Collections", "unmodifiableList" | "unmodifiableSet" | "unmodifiableMap", 1) => {
                let [arg] = arity(line, name, args)?;
                arg
            }
            ("System.out", "println" | "printf" | "format", _) => {
                let log = Expr::method(Expr::ident("console"), "log", values(args));
                (log, Type::Void)
            }
            ("System.out", "print", 1) => {
                let [(value, _)] = arity(line, name, args)?;
                let text = Expr::call(Expr::ident("String"), vec![value]);
                let stdout = Expr::member(Expr::ident("process"), "stdout");
                (Expr::method(stdout, "write", vec![text]), Type::Void)
            }
            ("System", "currentTimeMillis", 0) => {
                (Expr::method(Expr::ident("Date"), "now", vec![]), Type::Int)
            }
            ("Objects", "isNull" | "nonNull", 1) => {
                let [(value, _)] = arity(line, name, args)?;
                let op = if name == "isNull" { BinaryOp::Eq } else { BinaryOp::NotEq };
                (Expr::binary(op, value, Expr::Null), Type::Bool)
            }
            _ if namespace == "this" || self.is_class(namespace) => {
                return self.free_call(line, name, args)
            }
            (_, "stream", _) => return Err(AdapterError::unsupported(line, "stream")),
            _ => return self.method_unsupported(line, namespace, name),
        })
    }

    fn string_method(
        &self,
        line: usize,
        text: Expr,
        name: &str,
        args: Vec<Typed>,
    ) -> AdapterResult<Typed> {
        let cpp = self.dialect == Dialect::Cpp;
        let mutate = |value: Expr| -> AdapterResult<Typed> {
            if text.is_assignable() {
                Ok((assign(text.clone(), value), Type::Str))
            } else {
                Err(AdapterError::unsupported(line, "mutation of a temporary string"))
            }
        };
        Ok(match (name, args.len()) {
            ("length" | "size", 0) => (length(text), Type::Int),
            ("isEmpty" | "empty", 0) => (is_empty(length(text)), Type::Bool),
            ("charAt" | "at", 1) => {
                let [(index, ty)] = arity(line, name, args)?;
                (Expr::method(text, "charAt", vec![numeric(index, &ty)]), Type::Char)
            }
            ("front", 0) => (Expr::method(text, "charAt", vec![Expr::number(0)]), Type::Char),
            ("back", 0) => (Expr::method(text, "at", vec![literal("-1")]), Type::Char),
            ("substring", 1 | 2) => (Expr::method(text, "substring", numerics(args)), Type::Str),
            ("substr", 1 | 2) if cpp => (Expr::method(text, "substr", numerics(args)), Type::Str),
            ("indexOf" | "find", 1 | 2) => (Expr::method(text, "indexOf", values(args)), Type::Int),
            ("lastIndexOf" | "rfind", 1 | 2) => {
                (Expr::method(text, "lastIndexOf", values(args)), Type::Int)
            }
            ("contains", 1) => (Expr::method(text, "includes", values(args)), Type::Bool),
            ("startsWith" | "starts_with", 1) => {
                (Expr::method(text, "startsWith", values(args)), Type::Bool)
            }
            ("endsWith" | "ends_with", 1) => {
                (Expr::method(text, "endsWith", values(args)), Type::Bool)
            }
            ("equals", 1) => {
                let [(other, _)] = arity(line, name, args)?;
                (Expr::binary(BinaryOp::Eq, text, other), Type::Bool)
            }
            ("equalsIgnoreCase", 1) => {
                let [(other, _)] = arity(line, name, args)?;
                let lower = |e: Expr| Expr::method(e, "toLowerCase", vec![]);
                (Expr::binary(BinaryOp::Eq, lower(text), lower(other)), Type::Bool)
            }
            ("compareTo" | "compare", 1) => {
                let [(other, _)] = arity(line, name, args)?;
                (compare(text, other), Type::Int)
            }
            ("toCharArray", 0) => (spread(text), Type::seq(SeqKind::Array, Type::Char)),
            ("split", 1) => {
                let [(separator, _)] = arity(line, name, args)?;
                (self.split(line, text, separator)?, Type::seq(SeqKind::Array, Type::Str))
            }
            ("trim" | "strip", 0) => (Expr::method(text, "trim", vec![]), Type::Str),
            ("toUpperCase" | "toLowerCase", 0) => (Expr::method(text, name, vec![]), Type::Str),
            ("replace", 2) if !cpp => (Expr::method(text, "replaceAll", values(args)), Type::Str),
            ("repeat", 1) => (Expr::method(text, "repeat", values(args)), Type::Str),
            ("concat", 1) => {
                let [(other, _)] = arity(line, name, args)?;
                (Expr::binary(BinaryOp::Add, text, other), Type::Str)
            }
            ("c_str" | "toString" | "intern", 0) => (text, Type::Str),
            ("push_back" | "append", 1) if cpp => {
                let [(value, _)] = arity(line, name, args)?;
                if !text.is_assignable() {
                    return Err(AdapterError::unsupported(line, "mutation of a temporary string"));
                }
                (Expr::assign(AssignOp::Add, text, value), Type::Str)
            }
            ("pop_back", 0) if cpp => {
                mutate(Expr::method(text.clone(), "slice", vec![Expr::number(0), literal("-1")]))?
            }
            ("clear", 0) if cpp => mutate(Expr::string(""))?,
            ("insert", 2) if cpp => {
                let [(at, _), (value, _)] = arity(line, name, args)?;
                mutate(splice(&text, at.clone(), at, Some(value)))?
            }
            ("erase", 1) if cpp => {
                let [(at, _)] = arity(line, name, args)?;
                mutate(Expr::method(text.clone(), "slice", vec![Expr::number(0), at]))?
            }
            ("erase", 2) if cpp => {
                let [(at, _), (count, _)] = arity(line, name, args)?;
                let end = Expr::binary(BinaryOp::Add, at.clone(), count);
                mutate(splice(&text, at, end, None))?
            }
            ("chars", 0) => return Err(AdapterError::unsupported(line, "stream")),
            ("matches" | "replaceAll" | "replaceFirst", _) => {
                return Err(AdapterError::unsupported(line, "regular expression"))
            }
            _ => return self.method_unsupported(line, "string", name),
        })
    }

    /// Java `split` takes a regular expression; only plain separators and
    /// whitespace runs are accepted.
    fn split(&self, line: usize, text: Expr, separator: Expr) -> AdapterResult<Expr> {
        let Expr::Str(pattern) = &separator else {
            return Ok(Expr::method(text, "split", vec![separator]));
        };
        if matches!(pattern.as_str(), "\\s+" | "\\s" | " +" | "\\s*") {
            return Ok(Expr::helper(Helper::SplitWhitespace, vec![text]));
        }
        let literal = match pattern.strip_prefix('\\') {
            Some(escaped) if escaped.chars().count() == 1 => escaped.to_string(),
            _ if pattern.contains(|c: char| "\\[](){}.*+?^$|".contains(c)) => {
                return Err(AdapterError::unsupported(line, "regular expression"))
            }
            _ => pattern.clone(),
        };
        Ok(Expr::method(text, "split", vec![Expr::string(literal)]))
    }

    fn builder_method(
        &self,
        line: usize,
        recv: Expr,
        name: &str,
        args: Vec<Typed>,
    ) -> AdapterResult<Typed> {
        let Some(base) = builder_base(&recv) else {
            return Err(AdapterError::unsupported(line, "builder expression"));
        };
        let update = |value: Expr| (rebind(recv.clone(), assign(base.clone(), value)), Type::Builder);
        Ok(match (name, args.len()) {
            ("append", 1) => {
                let [(value, _)] = arity(line, name, args)?;
                let next = Expr::assign(AssignOp::Add, base.clone(), value);
                (rebind(recv, next), Type::Builder)
            }
            ("toString", 0) => (recv, Type::Str),
            ("length", 0) => (length(recv), Type::Int),
            ("isEmpty", 0) => (is_empty(length(recv)), Type::Bool),
            ("charAt", 1) => {
                let [(index, ty)] = arity(line, name, args)?;
                (Expr::method(recv, "charAt", vec![numeric(index, &ty)]), Type::Char)
            }
            ("indexOf", 1) => (Expr::method(recv, "indexOf", values(args)), Type::Int),
            ("reverse", 0) => {
                let reversed = Expr::method(
                    Expr::method(spread(base.clone()), "reverse", vec![]),
                    "join",
                    vec![Expr::string("")],
                );
                update(reversed)
            }
            ("insert", 2) => {
                let [(at, _), (value, _)] = arity(line, name, args)?;
                update(splice(&base, at.clone(), at, Some(value)))
            }
            ("deleteCharAt", 1) => {
                let [(at, _)] = arity(line, name, args)?;
                update(splice(&base, at.clone(), plus_one(at), None))
            }
            ("setCharAt", 2) => {
                let [(at, _), (c, ty)] = arity(line, name, args)?;
                let c = coerce(c, &ty, &Type::Char);
                update(splice(&base, at.clone(), plus_one(at), Some(c)))
            }
            ("delete", 2) => {
                let [(start, _), (end, _)] = arity(line, name, args)?;
                update(splice(&base, start, end, None))
            }
            ("setLength", 1) => {
                let [(size, _)] = arity(line, name, args)?;
                update(Expr::method(base.clone(), "slice", vec![Expr::number(0), size]))
            }
            _ => return self.method_unsupported(line, "StringBuilder", name),
        })
    }

    fn sequence_method(
        &self,
        line: usize,
        items: Expr,
        kind: SeqKind,
        elem: &Type,
        name: &str,
        args: Vec<Typed>,
    ) -> AdapterResult<Typed> {
        let elem = elem.clone();
        let dialect = self.dialect;
        let push = |items: Expr, args: Vec<Typed>, method: &str| {
            let args = args
                .into_iter()
                .map(|(e, t)| copy_value(coerce(e, &t, &elem), &t, dialect))
                .collect();
            (Expr::method(items, method, args), Type::Void)
        };
        let call = |method: &str| (Expr::method(items.clone(), method, vec![]), elem.clone());
        let java = dialect == Dialect::Java;
        use SeqKind::*;
        Ok(match (kind, name, args.len()) {
            (_, "size", 0) => (length(items), Type::Int),
            (_, "isEmpty" | "empty", 0) => (is_empty(length(items)), Type::Bool),
            (_, "clear", 0) => (assign(length(items), Expr::number(0)), Type::Void),
            (_, "contains", 1) => (Expr::method(items, "includes", values(args)), Type::Bool),
            (_, "stream", 0) => return Err(AdapterError::unsupported(line, "stream")),

            // Queues and deques keep their head at index 0, stacks their
            // top at the end.
            (Stack, "push", 1) => push(items, args, "push"),
            (Stack, "pop", 0) => call("pop"),
            (Stack, "peek" | "top", 0) => (last(items), elem),
            (Queue | Deque, "offer" | "add" | "offerLast" | "addLast", 1) if java => {
                push(items, args, "push")
            }
            (Queue, "push" | "emplace", 1) => push(items, args, "push"),
            (Queue | Deque, "poll" | "remove" | "pollFirst" | "removeFirst", 0) if java => {
                call("shift")
            }
            (Queue, "pop", 0) => call("shift"),
            (Queue | Deque, "peek" | "element" | "peekFirst" | "getFirst" | "front", 0) => {
                (first(items), elem)
            }
            (Queue | Deque, "back" | "peekLast" | "getLast", 0) => (last(items), elem),
            (Deque, "push" | "addFirst" | "offerFirst", 1) if java => push(items, args, "unshift"),
            (Deque, "pop", 0) if java => call("shift"),
            (Deque, "pollLast" | "removeLast", 0) => call("pop"),
            (Deque, "push_front" | "emplace_front", 1) => push(items, args, "unshift"),
            (Deque, "pop_front", 0) => call("shift"),
            (List | Deque, "push_back" | "emplace_back", 1) => push(items, args, "push"),
            (List | Deque, "pop_back", 0) => call("pop"),
            (List, "front", 0) => (first(items), elem),
            (List, "back", 0) => (last(items), elem),

            (List | Stack, "add", 1) => push(items, args, "push"),
            (List, "add", 2) => {
                let [(at, _), (value, ty)] = arity(line, name, args)?;
                let value = coerce(value, &ty, &elem);
                (Expr::method(items, "splice", vec![at, Expr::number(0), value]), Type::Void)
            }
            (List | Stack | Deque, "get" | "at", 1) => {
                let [(index, ty)] = arity(line, name, args)?;
                (Expr::index(items, numeric(index, &ty)), elem)
            }
            (List | Stack, "set", 2) => {
                let [(index, _), (value, ty)] = arity(line, name, args)?;
                let value = coerce(value, &ty, &elem);
                (assign(Expr::index(items, index), value), elem)
            }
            (List | Stack, "remove", 1) => {
                let [(arg, ty)] = arity(line, name, args)?;
                if ty == Type::Int {
                    let removed = Expr::method(items, "splice", vec![arg, Expr::number(1)]);
                    (first(removed), elem)
                } else {
                    (Expr::helper(Helper::Remove, vec![items, arg]), Type::Bool)
                }
            }
            (_, "remove", 1) => (Expr::helper(Helper::Remove, vec![items, args_first(args)]), Type::Bool),
            (_, "indexOf" | "lastIndexOf", 1) => (Expr::method(items, name, values(args)), Type::Int),
            (_, "addAll", 1) => {
                let [(other, _)] = arity(line, name, args)?;
                (Expr::method(items, "push", vec![Expr::Spread(Box::new(other))]), Type::Bool)
            }
            (List, "subList", 2) => {
                (Expr::method(items, "slice", values(args)), Type::seq(List, elem))
            }
            (List, "sort", 1) if java => {
                let comparator = args.into_iter().next();
                self.sort_call(line, items, &Type::seq(List, elem), false, comparator)?
            }
            (Array, "clone", 0) | (List, "toArray", _) => (spread(items), Type::seq(Array, elem)),
            (_, "equals", 1) => {
                let [(other, _)] = arity(line, name, args)?;
                (Expr::helper(Helper::Equal, vec![items, other]), Type::Bool)
            }
            (List | Deque, "resize", 1 | 2) if !java => {
                let mut args = args.into_iter();
                let (size, size_ty) = args.next().unwrap_or((Expr::number(0), Type::Int));
                let size = numeric(size, &size_ty);
                let fill = match args.next() {
                    Some((value, ty)) => coerce(value, &ty, &elem),
                    None => elem.fill_value(dialect),
                };
                // Truncate first, then pad with fresh fill values.
                let truncate = assign(
                    length(items.clone()),
                    Expr::math("min", vec![length(items.clone()), size.clone()]),
                );
                let missing = Expr::binary(BinaryOp::Sub, size, length(items.clone()));
                let pad = Expr::method(
                    items,
                    "push",
                    vec![Expr::Spread(Box::new(array_from(missing, fill)))],
                );
                (Expr::Sequence(vec![truncate, pad]), Type::Void)
            }
            (List, "assign", 2) if !java && items.is_assignable() => {
                let [(count, count_ty), (value, ty)] = arity(line, name, args)?;
                let filled = repeat_value(numeric(count, &count_ty), coerce(value, &ty, &elem));
                (assign(items, filled), Type::Void)
            }
            (List | Deque, "insert", 2) if !java => {
                let [(_, at_ty), (value, ty)] = arity(line, name, args)?;
                let method = match at_ty {
                    Type::Iter { position: Position::Begin, .. } => "unshift",
                    Type::Iter { position: Position::End, .. } => "push",
                    _ => return Err(AdapterError::unsupported(line, "insert at an iterator")),
                };
                push(items, vec![(value, ty)], method)
            }
            (List | Deque, "erase", 1) if !java => {
                let [(_, at_ty)] = arity(line, name, args)?;
                match at_ty {
                    Type::Iter { position: Position::Begin, .. } => call("shift"),
                    _ => return Err(AdapterError::unsupported(line, "erase at an iterator")),
                }
            }
            (_, "reserve" | "shrink_to_fit", _) if !java => (Expr::Null, Type::Void),
            (_, "swap", 1) if !java && items.is_assignable() => {
                let [(other, _)] = arity(line, name, args)?;
                (swap(items, other), Type::Void)
            }
            _ => return self.method_unsupported(line, seq_name(kind), name),
        })
    }

    fn map_method(
        &self,
        line: usize,
        map: Expr,
        (key, value, ordered): (&Type, &Type, bool),
        name: &str,
        args: Vec<Typed>,
    ) -> AdapterResult<Typed> {
        let key_of = |(k, ty): Typed| coerce(k, &ty, key);
        let has = |k: Expr| Expr::method(map.clone(), "has", vec![k]);
        let java = self.dialect == Dialect::Java;
        Ok(match (name, args.len()) {
            ("size", 0) => (Expr::member(map, "size"), Type::Int),
            ("isEmpty" | "empty", 0) => (is_empty(Expr::member(map, "size")), Type::Bool),
            ("clear", 0) => (Expr::method(map, "clear", vec![]), Type::Void),
            ("containsKey" | "contains", 1) => {
                let [k] = arity(line, name, args)?;
                (has(key_of(k)), Type::Bool)
            }
            ("put", 2) => {
                let [k, (v, v_ty)] = arity(line, name, args)?;
                let set = Expr::method(map, "set", vec![key_of(k), coerce(v, &v_ty, value)]);
                (set, value.clone())
            }
            ("get", 1) if java => {
                let [k] = arity(line, name, args)?;
                (Expr::helper(Helper::GetOr, vec![map, key_of(k)]), value.clone())
            }
            ("at", 1) => {
                let [k] = arity(line, name, args)?;
                (Expr::method(map, "get", vec![key_of(k)]), value.clone())
            }
            ("getOrDefault", 2) => {
                let [k, (fallback, _)] = arity(line, name, args)?;
                let get = Expr::helper(Helper::GetOr, vec![map, key_of(k), fallback]);
                (get, value.clone())
            }
            ("containsValue", 1) => {
                let values = spread(Expr::method(map, "values", vec![]));
                (Expr::method(values, "includes", self::values(args)), Type::Bool)
            }
            ("remove" | "erase", 1) => {
                let [k] = arity(line, name, args)?;
                if matches!(k.1, Type::Iter { .. }) {
                    return Err(AdapterError::unsupported(line, "erase at an iterator"));
                }
                (Expr::method(map, "delete", vec![key_of(k)]), Type::Void)
            }
            ("keySet", 0) => (map_keys(map, ordered), Type::seq(SeqKind::List, key.clone())),
            ("values", 0) => {
                let entries = map_entries(map, ordered);
                let second = Expr::arrow(&["entry"], Expr::index(Expr::ident("entry"), Expr::number(1)));
                (
                    Expr::method(entries, "map", vec![second]),
                    Type::seq(SeqKind::List, value.clone()),
                )
            }
            ("entrySet", 0) => (
                map_entries(map, ordered),
                Type::seq(
                    SeqKind::List,
                    Type::Pair(Box::new(key.clone()), Box::new(value.clone())),
                ),
            ),
            ("putIfAbsent", 2) | ("emplace", 2) => {
                let [k, (v, v_ty)] = arity(line, name, args)?;
                let k = key_of(k);
                let set = Expr::method(map.clone(), "set", vec![k.clone(), coerce(v, &v_ty, value)]);
                (Expr::binary(BinaryOp::Or, has(k), set), Type::Void)
            }
            ("insert", 1) if !java => {
                let [(pair, _)] = arity(line, name, args)?;
                let Expr::Array(mut parts) = pair else {
                    return Err(AdapterError::unsupported(line, "insert of a pair variable"));
                };
                if parts.len() != 2 {
                    return self.syntax("insert expects a key and a value");
                }
                let v = parts.remove(1);
                let k = parts.remove(0);
                let set = Expr::method(map.clone(), "set", vec![k.clone(), v]);
                (Expr::binary(BinaryOp::Or, has(k), set), Type::Void)
            }
            ("merge", 3) => {
                let [k, (v, _), (_, combiner)] = arity(line, name, args)?;
                let k = key_of(k);
                let current = Expr::method(map.clone(), "get", vec![k.clone()]);
                let merged = match &combiner {
                    Type::MethodRef(name) if name.ends_with("::sum") => {
                        Expr::binary(BinaryOp::Add, current, v.clone())
                    }
                    Type::MethodRef(name) if name.ends_with("::max") || name.ends_with("::min") => {
                        let which = if name.ends_with("::max") { "max" } else { "min" };
                        Expr::math(which, vec![current, v.clone()])
                    }
                    _ => return Err(AdapterError::unsupported(line, "merge function")),
                };
                let next = Expr::conditional(has(k.clone()), merged, v);
                (Expr::method(map, "set", vec![k, next]), value.clone())
            }
            ("firstKey" | "lastKey", 0) if ordered => {
                let keys = Expr::helper(Helper::Sorted, vec![Expr::method(map, "keys", vec![])]);
                let key_expr = if name == "firstKey" { first(keys) } else { last(keys) };
                (key_expr, key.clone())
            }
            ("count", 1) if !java => {
                let [k] = arity(line, name, args)?;
                (Expr::call(Expr::ident("Number"), vec![has(key_of(k))]), Type::Int)
            }
            ("find", 1) if !java => {
                let [k] = arity(line, name, args)?;
                let container = Type::Map {
                    key: Box::new(key.clone()),
                    value: Box::new(value.clone()),
                    ordered,
                };
                (has(key_of(k)), Type::iter(&container, Position::Found))
            }
            _ => return self.method_unsupported(line, "map", name),
        })
    }

    fn set_method(
        &self,
        line: usize,
        set: Expr,
        elem: &Type,
        ordered: bool,
        name: &str,
        args: Vec<Typed>,
    ) -> AdapterResult<Typed> {
        let item_of = |(x, ty): Typed| coerce(x, &ty, elem);
        let has = |x: Expr| Expr::method(set.clone(), "has", vec![x]);
        let java = self.dialect == Dialect::Java;
        Ok(match (name, args.len()) {
            ("size", 0) => (Expr::member(set, "size"), Type::Int),
            ("isEmpty" | "empty", 0) => (is_empty(Expr::member(set, "size")), Type::Bool),
            ("clear", 0) => (Expr::method(set, "clear", vec![]), Type::Void),
            ("contains", 1) => {
                let [x] = arity(line, name, args)?;
                (has(item_of(x)), Type::Bool)
            }
            // Java reports whether the element was new.
            ("add", 1) if java => {
                let [x] = arity(line, name, args)?;
                let x = item_of(x);
                let add = Expr::method(set.clone(), "add", vec![x.clone()]);
                let added = Expr::Sequence(vec![add, Expr::Bool(true)]);
                (
                    Expr::binary(BinaryOp::And, Expr::unary(UnaryOp::Not, has(x)), added),
                    Type::Bool,
                )
            }
            ("insert" | "emplace", 1) if !java => {
                let [x] = arity(line, name, args)?;
                (Expr::method(set, "add", vec![item_of(x)]), Type::Void)
            }
            ("remove" | "erase", 1) => {
                let [x] = arity(line, name, args)?;
                if matches!(x.1, Type::Iter { .. }) {
                    return Err(AdapterError::unsupported(line, "erase at an iterator"));
                }
                (Expr::method(set, "delete", vec![item_of(x)]), Type::Bool)
            }
            ("addAll", 1) if set.is_assignable() => {
                let [(other, _)] = arity(line, name, args)?;
                let union = Expr::Array(vec![
                    Expr::Spread(Box::new(set.clone())),
                    Expr::Spread(Box::new(other)),
                ]);
                (assign(set, Expr::construct("Set", vec![union])), Type::Bool)
            }
            ("first" | "last", 0) if ordered => {
                let sorted = Expr::helper(Helper::Sorted, vec![set]);
                let item = if name == "first" { first(sorted) } else { last(sorted) };
                (item, elem.clone())
            }
            ("count", 1) if !java => {
                let [x] = arity(line, name, args)?;
                (Expr::call(Expr::ident("Number"), vec![has(item_of(x))]), Type::Int)
            }
            ("find", 1) if !java => {
                let [x] = arity(line, name, args)?;
                let container = Type::Set {
                    elem: Box::new(elem.clone()),
                    ordered,
                };
                (has(item_of(x)), Type::iter(&container, Position::Found))
            }
            _ => return self.method_unsupported(line, "set", name),
        })
    }

    // ---- free functions -------------------------------------------------

    pub(super) fn free_call(&self, line: usize, name: &str, args: Vec<Typed>) -> AdapterResult<Typed> {
        if let Some(signature) = self.signature(name) {
            let args = args
                .into_iter()
                .enumerate()
                .map(|(i, (expr, ty))| match signature.params.get(i) {
                    Some(param) => coerce(expr, &ty, param),
                    None => expr,
                })
                .collect();
            return Ok((Expr::call(Expr::ident(name), args), signature.ret));
        }
        if self.dialect == Dialect::Cpp && CPP_BUILTINS.contains(&name) {
            return self.cpp_builtin(line, name, args);
        }
        if self.learning() {
            return Ok((Expr::call(Expr::ident(name), values(args)), Type::Unknown));
        }
        Err(AdapterError::syntax(line, format!("undeclared function '{name}'")))
    }

    fn cpp_builtin(&self, line: usize, name: &str, args: Vec<Typed>) -> AdapterResult<Typed> {
        let argc = args.len();
        Ok(match (name, argc) {
            ("max" | "min", 1) => {
                let [(list, _)] = arity(line, name, args)?;
                let items = match list {
                    Expr::Array(items) => items,
                    other => vec![Expr::Spread(Box::new(other))],
                };
                (Expr::math(name, items), Type::Unknown)
            }
            ("max" | "min", 2) => {
                let [(a, a_ty), (b, b_ty)] = arity(line, name, args)?;
                let textual = |t: &Type| t.is_text() || *t == Type::Char;
                if textual(&a_ty) && textual(&b_ty) {
                    let op = if name == "max" { BinaryOp::Ge } else { BinaryOp::Le };
                    let pick = Expr::binary(op, a.clone(), b.clone());
                    (Expr::conditional(pick, a, b), a_ty)
                } else {
                    let ty = Type::arithmetic(&a_ty, &b_ty);
                    (Expr::math(name, vec![numeric(a, &a_ty), numeric(b, &b_ty)]), ty)
                }
            }
            ("abs" | "labs" | "llabs", 1) => {
                let [(value, ty)] = arity(line, name, args)?;
                let ty = if ty == Type::Char { Type::Int } else { ty };
                (Expr::math("abs", vec![numeric(value, &ty)]), ty)
            }
            ("fabs", 1) => (Expr::math("abs", numerics(args)), Type::Float),
            (
                "sqrt" | "pow" | "floor" | "ceil" | "log" | "log2" | "log10" | "exp" | "sin" | "cos"
                | "tan" | "atan" | "atan2" | "hypot" | "cbrt" | "round" | "trunc",
                _,
            ) => (Expr::math(name, numerics(args)), Type::Float),
            ("swap", 2) => {
                let [(a, _), (b, _)] = arity(line, name, args)?;
                if !a.is_assignable() || !b.is_assignable() {
                    return Err(AdapterError::unsupported(line, "swap of these operands"));
                }
                (swap(a, b), Type::Void)
            }
            ("to_string", 1) => (Expr::call(Expr::ident("String"), values(args)), Type::Str),
            ("stoi" | "stol" | "stoll" | "atoi", 1) => {
                let [(text, _)] = arity(line, name, args)?;
                let parsed = Expr::call(Expr::ident("parseInt"), vec![text, Expr::number(10)]);
                (parsed, Type::Int)
            }
            ("stod" | "stof", 1) => {
                (Expr::call(Expr::ident("parseFloat"), values(args)), Type::Float)
            }
            ("sort" | "stable_sort", 2 | 3) => {
                let mut args = args.into_iter();
                let (Some(begin), Some(end)) = (args.next(), args.next()) else {
                    return self.syntax("sort expects an iterator range");
                };
                let (items, ty, reversed) = self.range(line, begin, end)?;
                self.sort_call(line, items, &ty, reversed, args.next())?
            }
            ("reverse", 2) => {
                let [begin, end] = arity(line, name, args)?;
                let (items, ty, _) = self.range(line, begin, end)?;
                if ty.is_text() {
                    if !items.is_assignable() {
                        return Err(AdapterError::unsupported(line, "mutation of a temporary string"));
                    }
                    let reversed = Expr::method(
                        Expr::method(spread(items.clone()), "reverse", vec![]),
                        "join",
                        vec![Expr::string("")],
                    );
                    (assign(items, reversed), Type::Void)
                } else {
                    (Expr::method(items, "reverse", vec![]), Type::Void)
                }
            }
            ("accumulate", 3) => {
                let [begin, end, (init, init_ty)] = arity(line, name, args)?;
                let (items, _, _) = self.range(line, begin, end)?;
                (Expr::helper(Helper::Sum, vec![items, init]), init_ty)
            }
            ("max_element" | "min_element", 2) => {
                let [begin, end] = arity(line, name, args)?;
                let (items, ty, _) = self.range(line, begin, end)?;
                let which = if name == "max_element" { "max" } else { "min" };
                let value = Expr::math(which, vec![Expr::Spread(Box::new(items))]);
                (value, Type::iter(&ty, Position::Element))
            }
            ("count", 3) => {
                let [begin, end, (item, _)] = arity(line, name, args)?;
                let (items, _, _) = self.range(line, begin, end)?;
                (Expr::helper(Helper::Count, vec![items, item]), Type::Int)
            }
            ("find", 3) => {
                let [begin, end, (item, _)] = arity(line, name, args)?;
                let (items, ty, _) = self.range(line, begin, end)?;
                (Expr::method(items, "includes", vec![item]), Type::iter(&ty, Position::Found))
            }
            ("fill", 3) => {
                let [begin, end, (value, _)] = arity(line, name, args)?;
                let (items, _, _) = self.range(line, begin, end)?;
                (Expr::method(items, "fill", vec![value]), Type::Void)
            }
            ("isdigit", 1) => (Expr::helper(Helper::IsDigit, values(args)), Type::Bool),
            ("isalpha", 1) => (Expr::helper(Helper::IsLetter, values(args)), Type::Bool),
            ("isalnum", 1) => (Expr::helper(Helper::IsAlphanumeric, values(args)), Type::Bool),
            ("isupper" | "islower" | "isspace", 1) => {
                let [(c, ty)] = arity(line, name, args)?;
                let java_name = match name {
                    "isupper" => "isUpperCase",
                    "islower" => "isLowerCase",
                    _ => "isWhitespace",
                };
                (char_class(java_name, coerce(c, &ty, &Type::Char)), Type::Bool)
            }
            ("toupper" | "tolower", 1) => {
                let [(c, ty)] = arity(line, name, args)?;
                let method = if name == "toupper" { "toUpperCase" } else { "toLowerCase" };
                (Expr::method(coerce(c, &ty, &Type::Char), method, vec![]), Type::Char)
            }
            ("make_pair", 2) => {
                let [(a, a_ty), (b, b_ty)] = arity(line, name, args)?;
                (Expr::Array(vec![a, b]), Type::Pair(Box::new(a_ty), Box::new(b_ty)))
            }
            (
                "runtime_error" | "invalid_argument" | "out_of_range" | "logic_error"
                | "length_error" | "domain_error" | "exception",
                _,
            ) => {
                let message = args
                    .into_iter()
                    .next()
                    .map(|(e, _)| e)
                    .unwrap_or_else(|| Expr::string(""));
                (Expr::named_error(name, message), Type::Unknown)
            }
            _ => {
                return Err(AdapterError::syntax(
                    line,
                    format!("'{name}' does not take {argc} argument(s)"),
                ))
            }
        })
    }

    /// Container behind a `begin()`/`end()` pair, and whether the range
    /// runs backwards.
    fn range(&self, line: usize, (begin, begin_ty): Typed, (_, end_ty): Typed) -> AdapterResult<(Expr, Type, bool)> {
        match (&begin_ty, &end_ty) {
            (
                Type::Iter {
                    container,
                    position: Position::Begin,
                },
                Type::Iter {
                    position: Position::End,
                    ..
                },
            ) => Ok((begin, (**container).clone(), false)),
            (
                Type::Iter {
                    container,
                    position: Position::ReverseBegin,
                },
                Type::Iter {
                    position: Position::ReverseEnd,
                    ..
                },
            ) => Ok((begin, (**container).clone(), true)),
            _ => Err(AdapterError::unsupported(line, "iterator range")),
        }
    }

    fn sort_call(
        &self,
        line: usize,
        items: Expr,
        ty: &Type,
        reversed: bool,
        comparator: Option<Typed>,
    ) -> AdapterResult<Typed> {
        let descending = match comparator {
            None | Some((Expr::Null, Type::Unknown)) => false,
            Some((_, Type::MethodRef(order))) if order == "greater" || order == "reverse" => true,
            Some((_, Type::MethodRef(order))) if order == "less" => false,
            Some(_) => return Err(AdapterError::unsupported(line, "custom comparator")),
        };
        // Sorting a reversed range ascending leaves the container descending.
        let descending = descending != reversed;
        if ty.is_text() {
            if !items.is_assignable() {
                return Err(AdapterError::unsupported(line, "mutation of a temporary string"));
            }
            let sorted = Expr::helper(Helper::Sorted, vec![items.clone(), Expr::Bool(descending)]);
            let joined = Expr::method(sorted, "join", vec![Expr::string("")]);
            return Ok((assign(items, joined), Type::Void));
        }
        Ok((
            Expr::helper(Helper::SortInPlace, vec![items, Expr::Bool(descending)]),
            Type::Void,
        ))
    }

    /// Value-producing construction: `vector<int>(n, 0)`, `new HashSet<>(xs)`.
    pub(super) fn construct(&self, ty: &Type, args: Vec<Typed>) -> AdapterResult<Expr> {
        let line = self.line();
        let java = self.dialect == Dialect::Java;
        if args.is_empty() {
            return Ok(ty.default_value(Dialect::Cpp));
        }
        let iterators = args.len() == 2 && args.iter().all(|(_, t)| matches!(t, Type::Iter { .. }));
        let ranged = |args: Vec<Typed>| -> AdapterResult<(Expr, Type, bool)> {
            let [begin, end] = arity(line, "range", args)?;
            self.range(line, begin, end)
        };
        Ok(match ty {
            Type::Seq(..) if iterators => {
                let (items, _, reversed) = ranged(args)?;
                let copy = spread(items);
                if reversed {
                    Expr::method(copy, "reverse", vec![])
                } else {
                    copy
                }
            }
            Type::Seq(_, elem) => match <[Typed; 1]>::try_from(args) {
                Ok([(size, size_ty)]) if size_ty.is_numeric() => {
                    if java {
                        // Java's argument is a capacity.
                        Expr::Array(vec![])
                    } else {
                        repeat_value(numeric(size, &size_ty), elem.fill_value(self.dialect))
                    }
                }
                Ok([(source, source_ty)]) => {
                    if java || !matches!(source_ty, Type::Seq(..)) {
                        spread(source)
                    } else {
                        copy_value(source, &source_ty, self.dialect)
                    }
                }
                Err(args) => {
                    let [(size, size_ty), (value, value_ty)] = arity(line, "vector", args)?;
                    let value = coerce(value, &value_ty, elem);
                    repeat_value(numeric(size, &size_ty), value)
                }
            },
            Type::Str if iterators => {
                let (items, _, reversed) = ranged(args)?;
                let chars = if reversed {
                    Expr::method(spread(items), "reverse", vec![])
                } else {
                    spread(items)
                };
                Expr::method(chars, "join", vec![Expr::string("")])
            }
            Type::Str | Type::Builder => match <[Typed; 1]>::try_from(args) {
                Ok([(text, text_ty)]) if text_ty.is_text() || text_ty == Type::Char => text,
                Ok([(_, size_ty)]) if *ty == Type::Builder && size_ty.is_numeric() => Expr::string(""),
                Ok([(chars, Type::Seq(..))]) => Expr::method(chars, "join", vec![Expr::string("")]),
                Ok([(value, _)]) => Expr::call(Expr::ident("String"), vec![value]),
                Err(args) => {
                    let [(count, count_ty), (c, c_ty)] = arity(line, "string", args)?;
                    let c = coerce(c, &c_ty, &Type::Char);
                    Expr::method(c, "repeat", vec![numeric(count, &count_ty)])
                }
            },
            Type::Map { .. } | Type::Set { .. } => {
                let class = if matches!(ty, Type::Map { .. }) { "Map" } else { "Set" };
                let source = if iterators {
                    ranged(args)?.0
                } else {
                    let [(source, _)] = arity(line, class, args)?;
                    source
                };
                Expr::construct(class, vec![source])
            }
            Type::Pair(a, b) => {
                let [(x, x_ty), (y, y_ty)] = arity(line, "pair", args)?;
                Expr::Array(vec![coerce(x, &x_ty, a), coerce(y, &y_ty, b)])
            }
            Type::Int | Type::Float | Type::Char | Type::Bool => {
                let [(value, value_ty)] = arity(line, "conversion", args)?;
                cast(value, &value_ty, ty)
            }
            _ => return Err(AdapterError::unsupported(line, "construction of this type")),
        })
    }
}

fn args_first(args: Vec<Typed>) -> Expr {
    args.into_iter().next().map(|(e, _)| e).unwrap_or(Expr::Null)
}

fn seq_name(kind: SeqKind) -> &'static str {
    match kind {
        SeqKind::Array => "array",
        SeqKind::List => "list",
        SeqKind::Stack => "stack",
        SeqKind::Queue => "queue",
        SeqKind::Deque => "deque",
    }
}

/// `isUpperCase`, `isLowerCase` and `isWhitespace` over a one-character string.
fn char_class(name: &str, c: Expr) -> Expr {
    let case = |method: &str| Expr::method(c.clone(), method, vec![]);
    match name {
        "isUpperCase" => Expr::binary(
            BinaryOp::And,
            Expr::binary(BinaryOp::Eq, c.clone(), case("toUpperCase")),
            Expr::binary(BinaryOp::NotEq, c.clone(), case("toLowerCase")),
        ),
        "isLowerCase" => Expr::binary(
            BinaryOp::And,
            Expr::binary(BinaryOp::Eq, c.clone(), case("toLowerCase")),
            Expr::binary(BinaryOp::NotEq, c.clone(), case("toUpperCase")),
        ),
        _ => Expr::binary(
            BinaryOp::And,
            Expr::binary(BinaryOp::NotEq, c.clone(), Expr::string("")),
            Expr::binary(BinaryOp::Eq, case("trim"), Expr::string("")),
        ),
    }
}

/// Receivers of unknown type only get the size queries every container
/// answers.
fn untyped_method(recv: Expr, name: &str, args: Vec<Typed>) -> Typed {
    match (name, args.len()) {
        ("size" | "length", 0) => (Expr::helper(Helper::Len, vec![recv]), Type::Int),
        ("isEmpty" | "empty", 0) => (is_empty(Expr::helper(Helper::Len, vec![recv])), Type::Bool),
        _ => (Expr::method(recv, name, values(args)), Type::Unknown),
    }
}

/// C++ values compared by contents rather than identity.
fn is_container(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Seq(..) | Type::Map { .. } | Type::Set { .. } | Type::Pair(..)
    )
}

/// `==` and the orderings over vectors, pairs, maps and sets.
fn container_comparison(
    line: usize,
    op: BinaryOp,
    (lhs, lhs_ty): Typed,
    (rhs, rhs_ty): Typed,
) -> AdapterResult<Typed> {
    let equal = || Expr::helper(Helper::Equal, vec![lhs.clone(), rhs.clone()]);
    let expr = match op {
        BinaryOp::Eq => equal(),
        BinaryOp::NotEq => Expr::unary(UnaryOp::Not, equal()),
        _ => {
            let associative = |ty: &Type| matches!(ty, Type::Map { .. } | Type::Set { .. });
            if associative(&lhs_ty) || associative(&rhs_ty) {
                return Err(AdapterError::unsupported(line, "ordering of maps or sets"));
            }
            let order = Expr::helper(Helper::Compare, vec![lhs, rhs]);
            Expr::binary(op, order, Expr::number(0))
        }
    };
    Ok((expr, Type::Bool))
}

#[cfg(test)]
mod tests {
    use super::super::parser::parse;
    use super::*;
    use crate::adapter::emit::emit_program;

    fn java(body: &str) -> String {
        let source = format!("class Solution {{\n{body}\n}}");
        emit_program(&parse(&source, Dialect::Java).unwrap())
    }

    fn cpp(source: &str) -> String {
        emit_program(&parse(source, Dialect::Cpp).unwrap())
    }

    #[test]
    fn test_literal_conversions() {
        assert_eq!(char_code(Expr::string("a")), Expr::number(97));
        assert_eq!(from_code(Expr::number(98)), Expr::string("b"));
        assert_eq!(
            literal("-1"),
            Expr::unary(UnaryOp::Neg, Expr::Number("1".to_string()))
        );
        assert_eq!(
            coerce(Expr::ident("x"), &Type::Float, &Type::Int),
            Expr::math("trunc", vec![Expr::ident("x")])
        );
    }

    #[test]
    fn test_java_frequency_map() {
        let code = java(
            "Map<Character, Integer> count(String s) {\n\
               Map<Character, Integer> freq = new HashMap<>();\n\
               for (char c : s.toCharArray()) {\n\
                 freq.put(c, freq.getOrDefault(c, 0) + 1);\n\
               }\n\
               return freq;\n\
             }",
        );
        assert!(code.contains("for (let c of [...s]) {"), "{code}");
        assert!(
            code.contains("freq.set(c, __judge_get(freq, c, 0) + 1);"),
            "{code}"
        );
    }

    #[test]
    fn test_java_merge_with_method_reference() {
        let code = java("void f(Map<String, Integer> m, String k) { m.merge(k, 1, Integer::sum); }");
        assert!(
            code.contains("m.set(k, m.has(k) ? m.get(k) + 1 : 1);"),
            "{code}"
        );
    }

    #[test]
    fn test_java_string_builder_chain() {
        let code = java(
            "String wrap(String s) {\n\
               StringBuilder sb = new StringBuilder();\n\
               sb.append('[').append(s).append(']');\n\
               return sb.reverse().toString();\n\
             }",
        );
        assert!(code.contains("let sb = \"\";"), "{code}");
        assert!(code.contains("sb += \"[\", sb += s, sb += \"]\";"), "{code}");
        assert!(code.contains("return sb = [...sb].reverse().join(\"\");"), "{code}");
    }

    #[test]
    fn test_java_set_add_as_statement_and_value() {
        let code = java(
            "boolean dup(int[] xs) {\n\
               Set<Integer> seen = new HashSet<>();\n\
               for (int x : xs) {\n\
                 if (!seen.add(x)) return true;\n\
               }\n\
               seen.add(0);\n\
               return false;\n\
             }",
        );
        assert!(
            code.contains("if (!(!seen.has(x) && (seen.add(x), true))) {"),
            "{code}"
        );
        assert!(code.contains("  seen.add(0);"), "{code}");
    }

    #[test]
    fn test_java_deque_as_stack() {
        let code = java(
            "int top(int[] xs) {\n\
               Deque<Integer> stack = new ArrayDeque<>();\n\
               for (int x : xs) stack.push(x);\n\
               stack.pop();\n\
               return stack.peek();\n\
             }",
        );
        assert!(code.contains("stack.unshift(x);"), "{code}");
        assert!(code.contains("stack.shift();"), "{code}");
        assert!(code.contains("return stack[0];"), "{code}");
    }

    #[test]
    fn test_java_list_remove_by_index_and_value() {
        let code = java(
            "void f(List<Integer> xs, List<String> names) {\n\
               xs.remove(0);\n\
               names.remove(\"x\");\n\
             }",
        );
        assert!(code.contains("xs.splice(0, 1)[0];"), "{code}");
        assert!(code.contains("__judge_remove(names, \"x\");"), "{code}");
    }

    #[test]
    fn test_cpp_string_index_assignment() {
        let code = cpp("string f(string s) { s[0] = 'X'; return s; }");
        assert!(
            code.contains("s = s.slice(0, 0) + \"X\" + s.slice(0 + 1);"),
            "{code}"
        );
    }

    #[test]
    fn test_cpp_map_subscript_counts() {
        let code = cpp(
            "int f(vector<int>& xs) {\n  unordered_map<int, int> cnt;\n  for (int x : xs) cnt[x]++;\n  return cnt.size();\n}",
        );
        assert!(code.contains("let cnt = new Map();"), "{code}");
        assert!(code.contains("cnt.set(x, __judge_entry(cnt, x, 0) + 1);"), "{code}");
        assert!(code.contains("return cnt.size;"), "{code}");
    }

    #[test]
    fn test_cpp_find_against_end() {
        let code = cpp(
            "bool f(set<int> s, int x) {\n  auto it = s.find(x);\n  return it != s.end();\n}",
        );
        assert!(code.contains("let it = s.has(x);"), "{code}");
        assert!(code.contains("return it;"), "{code}");
    }

    #[test]
    fn test_cpp_sort_and_accumulate() {
        let code = cpp(
            "int f(vector<int>& v) {\n  sort(v.begin(), v.end(), greater<int>());\n  return accumulate(v.begin(), v.end(), 0);\n}",
        );
        assert!(code.contains("__judge_sort(v, true);"), "{code}");
        assert!(code.contains("return __judge_sum(v, 0);"), "{code}");
    }

    #[test]
    fn test_cpp_sort_string_rebinds() {
        let code = cpp("string f(string s) { sort(s.begin(), s.end()); return s; }");
        assert!(code.contains("s = __judge_sorted(s, false).join(\"\");"), "{code}");
    }

    #[test]
    fn test_cpp_queue_and_stack_ends() {
        let code = cpp(
            "int f() {\n  queue<int> q;\n  stack<int> st;\n  q.push(1);\n  st.push(2);\n  q.pop();\n  return st.top();\n}",
        );
        assert!(code.contains("q.shift();"), "{code}");
        assert!(code.contains("return st[st.length - 1];"), "{code}");
    }

    #[test]
    fn test_cpp_push_back_copies_places() {
        let code = cpp(
            "vector<vector<int>> f(vector<int>& cur) {\n  vector<vector<int>> out;\n  out.push_back(cur);\n  return out;\n}",
        );
        assert!(code.contains("out.push(structuredClone(cur));"), "{code}");
        assert!(code.contains("return out;"), "{code}");
    }

    #[test]
    fn test_boolean_compound_assignment_stays_boolean() {
        let code = java("boolean f(boolean a, boolean b) { a |= b; return a; }");
        assert!(code.contains("a = Boolean(a | b);"), "{code}");
    }

    #[test]
    fn test_unknown_method_is_unsupported() {
        let err = parse(
            "class S { int f(String s) { return s.codePointAt(0); } }",
            Dialect::Java,
        )
        .unwrap_err();
        assert_eq!(
            err,
            AdapterError::unsupported(1, "method 'codePointAt' on string")
        );
    }

    #[test]
    fn test_regex_split_is_unsupported_but_whitespace_works() {
        let code = java("String[] f(String s) { return s.trim().split(\"\\\\s+\"); }");
        assert!(code.contains("return __judge_split(s.trim());"), "{code}");

        let err = parse(
            "class S { String[] f(String s) { return s.split(\"[,;]\"); } }",
            Dialect::Java,
        )
        .unwrap_err();
        assert_eq!(err, AdapterError::unsupported(1, "regular expression"));
    }
}
