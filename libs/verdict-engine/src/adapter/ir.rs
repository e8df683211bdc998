//! Language-neutral program representation.
//!
//! Foreign parsers lower straight into these types; nothing is rendered as
//! JavaScript text until [`crate::adapter::emit`] walks the finished tree.

#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    /// Names declared with a single `let` before the body (Python globals).
    pub globals: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    /// Locals hoisted to the top of the function body.
    pub locals: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Function(Function),
    /// One `let` with any number of bindings.
    Let(Vec<(String, Option<Expr>)>),
    Expr(Expr),
    If {
        cond: Expr,
        then_block: Vec<Stmt>,
        else_block: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    DoWhile {
        body: Vec<Stmt>,
        cond: Expr,
    },
    /// C-style three-clause loop.
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Vec<Stmt>,
    },
    /// Iteration over a collection. `declare` introduces a fresh binding,
    /// otherwise `target` assigns to already-declared names.
    ForOf {
        target: Expr,
        declare: bool,
        iterable: Expr,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Throw(Expr),
    Break,
    Continue,
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Static(String),
    Computed(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    UShr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment applies.
    pub fn binary(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
            AssignOp::Mod => Some(BinaryOp::Mod),
            AssignOp::Pow => Some(BinaryOp::Pow),
            AssignOp::BitAnd => Some(BinaryOp::BitAnd),
            AssignOp::BitOr => Some(BinaryOp::BitOr),
            AssignOp::BitXor => Some(BinaryOp::BitXor),
            AssignOp::Shl => Some(BinaryOp::Shl),
            AssignOp::Shr => Some(BinaryOp::Shr),
        }
    }
}

/// Runtime support functions. The emitter prepends a definition for each
/// one the program references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Helper {
    /// Lazy integer range with Python's start/stop/step rules.
    Range,
    /// Modulo whose sign follows the divisor.
    FloorMod,
    /// Membership test over strings, arrays, maps, sets and objects.
    Contains,
    /// Copying sort with a total order over numbers and strings.
    Sorted,
    /// In-place sort with the same order as `Sorted`.
    SortInPlace,
    /// Lookup with a fallback for objects and maps.
    GetOr,
    /// Whitespace split that drops empty fields.
    SplitWhitespace,
    Zip,
    Sum,
    /// `map[key]` read that inserts a default first.
    MapEntry,
    IsDigit,
    IsLetter,
    IsAlphanumeric,
    /// Keys for plain objects, the value itself for other iterables.
    Iter,
    /// Length of strings, arrays, maps, sets and objects.
    Len,
    /// Occurrences of an item in a string or array.
    Count,
    /// Remove the first matching item from an array or a set.
    Remove,
    /// Repetition of a string or an array.
    Repeat,
    /// Python slice with a step over strings and arrays.
    Slice,
    /// Python truthiness: empty collections are false.
    Truthy,
    /// Accept a plain object where a `Map` is expected.
    ToMap,
    /// Accept an array where a `Set` is expected.
    ToSet,
    /// Structural equality over arrays, objects, maps and sets.
    Equal,
    /// Three-way ordering with lexicographic arrays.
    Compare,
    /// `+` over numbers, strings and arrays.
    Add,
    /// `+=` that extends an array in place.
    InPlaceAdd,
    /// `*` over numbers, or repetition of a string or an array.
    Multiply,
    /// `-`, `|`, `&` and `^` over numbers or sets.
    SetOp,
    /// Text of a value the way Python prints it.
    Str,
    /// Rounding half to even, optionally to a number of digits.
    Round,
}

impl Helper {
    /// Helpers whose definitions this helper calls.
    pub fn requires(self) -> &'static [Helper] {
        match self {
            Helper::Sorted => &[Helper::SortInPlace],
            Helper::Contains | Helper::Count | Helper::Remove => &[Helper::Equal],
            Helper::InPlaceAdd => &[Helper::Add],
            Helper::Multiply => &[Helper::Repeat],
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    /// Literal text, already valid in the common form.
    Number(String),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(PropKey, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Update {
        increment: bool,
        prefix: bool,
        target: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Arrow {
        params: Vec<String>,
        body: Box<Expr>,
    },
    Spread(Box<Expr>),
    /// Comma operator, e.g. `i++, j--` in a loop update.
    Sequence(Vec<Expr>),
    Helper {
        helper: Helper,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn number(value: impl ToString) -> Self {
        Expr::Number(value.to_string())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Str(value.into())
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn assign(op: AssignOp, target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: property.into(),
        }
    }

    pub fn index(object: Expr, index: Expr) -> Self {
        Expr::Index {
            object: Box::new(object),
            index: Box::new(index),
        }
    }

    /// `object.method(args)`
    pub fn method(object: Expr, method: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::member(object, method), args)
    }

    /// `new <class>(args)`
    pub fn construct(class: &str, args: Vec<Expr>) -> Self {
        Expr::New {
            callee: Box::new(Expr::ident(class)),
            args,
        }
    }

    /// `Math.<name>(args)`
    pub fn math(name: &str, args: Vec<Expr>) -> Self {
        Expr::method(Expr::ident("Math"), name, args)
    }

    pub fn helper(helper: Helper, args: Vec<Expr>) -> Self {
        Expr::Helper { helper, args }
    }

    pub fn conditional(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn let_one(name: impl Into<String>, init: Option<Expr>) -> Stmt {
        Stmt::Let(vec![(name.into(), init)])
    }

    pub fn arrow(params: &[&str], body: Expr) -> Self {
        Expr::Arrow {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Box::new(body),
        }
    }

    /// An `Error` carrying `name`, so the harness reports `name: message`.
    pub fn named_error(name: &str, message: Expr) -> Self {
        let message = match message {
            Expr::Str(_) => message,
            other => Expr::call(Expr::ident("String"), vec![other]),
        };
        Expr::method(
            Expr::ident("Object"),
            "assign",
            vec![
                Expr::New {
                    callee: Box::new(Expr::ident("Error")),
                    args: vec![message],
                },
                Expr::Object(vec![(PropKey::Static("name".to_string()), Expr::string(name))]),
            ],
        )
    }

    /// Direct subexpressions, in evaluation order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Null | Expr::Bool(_) | Expr::Number(_) | Expr::Str(_) | Expr::Ident(_) => vec![],
            Expr::Array(items) | Expr::Sequence(items) => items.iter().collect(),
            Expr::Object(props) => props
                .iter()
                .flat_map(|(key, value)| match key {
                    PropKey::Computed(key) => vec![key, value],
                    PropKey::Static(_) => vec![value],
                })
                .collect(),
            Expr::Unary { operand, .. } => vec![&**operand],
            Expr::Binary { lhs, rhs, .. } => vec![&**lhs, &**rhs],
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => vec![&**cond, &**then, &**otherwise],
            Expr::Assign { target, value, .. } => vec![&**target, &**value],
            Expr::Update { target, .. } => vec![&**target],
            Expr::Call { callee, args } | Expr::New { callee, args } => {
                std::iter::once(&**callee).chain(args.iter()).collect()
            }
            Expr::Member { object, .. } => vec![&**object],
            Expr::Index { object, index } => vec![&**object, &**index],
            Expr::Arrow { body, .. } => vec![&**body],
            Expr::Spread(inner) => vec![&**inner],
            Expr::Helper { args, .. } => args.iter().collect(),
        }
    }

    /// True for plain names, member accesses and subscripts.
    pub fn is_assignable(&self) -> bool {
        matches!(
            self,
            Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }
        ) || matches!(self, Expr::Array(items) if items.iter().all(Expr::is_assignable))
    }
}
