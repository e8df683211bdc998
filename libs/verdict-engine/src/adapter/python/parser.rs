//! Recursive-descent parser lowering Python into the common IR.
//!
//! Scoping follows Python: every name bound anywhere in a function is local
//! to the whole function, so locals are collected while parsing and hoisted
//! into one declaration. Names marked `global` or `nonlocal` are left to
//! the enclosing scope.

use std::collections::{HashMap, HashSet};

use super::lexer::{decode_fstring_literal, tokenize, PyToken, Tok};
use crate::adapter::emit::js_identifier;
use crate::adapter::Depth;
use crate::adapter::ir::{
    AssignOp, BinaryOp, Expr, Function, Helper, Program, PropKey, Stmt, UnaryOp,
};
use crate::error::{AdapterError, AdapterResult};

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Globals the lowered program refers to; user names that collide are renamed.
const RUNTIME_NAMES: &[&str] = &[
    "Array", "Boolean", "Error", "Infinity", "Math", "NaN", "Number", "Object", "Reflect", "Set",
    "String", "console", "parseInt", "undefined",
];

/// Builtins that make sense as first-class values, e.g. `map(int, xs)`.
const VALUE_BUILTINS: &[&str] = &["int", "float", "str", "len", "abs", "bool", "sorted", "sum"];

const REJECTED_BUILTINS: &[&str] = &[
    "isinstance", "type", "input", "open", "eval", "exec", "iter", "next", "super", "getattr",
    "setattr", "hasattr", "id", "hash", "globals", "locals", "vars", "callable", "format", "repr",
];

const MATH_FUNCTIONS: &[&str] = &[
    "sqrt", "floor", "ceil", "exp", "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "hypot",
    "log2", "log10", "trunc", "pow",
];

static EOF: Tok = Tok::Eof;

pub fn parse(source: &str) -> AdapterResult<Program> {
    let mut parser = Parser {
        tokens: tokenize(source)?,
        pos: 0,
        scopes: vec![Scope::default()],
        math_modules: HashSet::new(),
        math_aliases: HashMap::new(),
        depth: Depth::default(),
    };
    let body = parser.file()?;
    let globals = parser
        .scopes
        .pop()
        .map(|scope| scope.hoisted())
        .unwrap_or_default();
    Ok(Program { globals, body })
}

#[derive(Default)]
struct Scope {
    assigned: Vec<String>,
    params: Vec<String>,
    outer: HashSet<String>,
    functions: HashSet<String>,
}

impl Scope {
    fn declare(&mut self, name: &str) {
        if !self.assigned.iter().any(|n| n == name) {
            self.assigned.push(name.to_string());
        }
    }

    fn binds(&self, name: &str) -> bool {
        self.assigned.iter().any(|n| n == name)
            || self.params.iter().any(|n| n == name)
            || self.functions.contains(name)
    }

    fn hoisted(&self) -> Vec<String> {
        self.assigned
            .iter()
            .filter(|n| {
                !self.params.contains(n) && !self.outer.contains(*n) && !self.functions.contains(*n)
            })
            .cloned()
            .collect()
    }
}

struct Clause {
    target: Expr,
    iterable: Expr,
    conditions: Vec<Expr>,
}

struct Parser {
    tokens: Vec<PyToken>,
    pos: usize,
    scopes: Vec<Scope>,
    math_modules: HashSet<String>,
    /// `from math import sqrt as root` maps `root` to `sqrt`.
    math_aliases: HashMap<String, String>,
    depth: Depth,
}

impl Parser {
    // ---- token access ---------------------------------------------------

    fn peek(&self) -> &Tok {
        self.tokens.get(self.pos).map(|t| &t.tok).unwrap_or(&EOF)
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        self.tokens
            .get(self.pos + offset)
            .map(|t| &t.tok)
            .unwrap_or(&EOF)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Tok {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn is_op(&self, op: &str) -> bool {
        matches!(self.peek(), Tok::Op(o) if o == op)
    }

    fn is_name(&self, name: &str) -> bool {
        matches!(self.peek(), Tok::Name(n) if n == name)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.is_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> AdapterResult<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{op}'")))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> AdapterResult<()> {
        if self.is_name(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{keyword}'")))
        }
    }

    fn expect_name(&mut self) -> AdapterResult<String> {
        match self.peek().clone() {
            Tok::Name(name) if !KEYWORDS.contains(&name.as_str()) => {
                self.advance();
                Ok(local_name(&name))
            }
            _ => Err(self.unexpected("expected a name")),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), Tok::Newline | Tok::Eof) || self.is_op(";")
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> AdapterResult<T>) -> AdapterResult<T> {
        let mark = self.depth.enter(self.line())?;
        let result = parse(self);
        self.depth.restore(mark);
        result
    }

    /// Count one more link of an operator chain.
    fn chain(&mut self) -> AdapterResult<()> {
        let line = self.line();
        self.depth.extend(line)
    }

    fn unexpected(&self, message: &str) -> AdapterError {
        let found = match self.peek() {
            Tok::Name(n) | Tok::Op(n) | Tok::Number(n) => format!("'{n}'"),
            Tok::Str(_) | Tok::FString(_) => "string literal".to_string(),
            Tok::Newline => "end of line".to_string(),
            Tok::Indent => "indent".to_string(),
            Tok::Dedent => "dedent".to_string(),
            Tok::Eof => "end of input".to_string(),
        };
        AdapterError::syntax(self.line(), format!("{message}, found {found}"))
    }

    // ---- scopes ---------------------------------------------------------

    fn scope(&mut self) -> &mut Scope {
        if self.scopes.is_empty() {
            self.scopes.push(Scope::default());
        }
        let last = self.scopes.len() - 1;
        &mut self.scopes[last]
    }

    fn is_bound(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.binds(name))
    }

    fn bind_target(&mut self, target: &Expr, line: usize) -> AdapterResult<()> {
        match target {
            Expr::Ident(name) => {
                self.scope().declare(name);
                Ok(())
            }
            Expr::Array(items) => items.iter().try_for_each(|item| self.bind_target(item, line)),
            Expr::Member { .. } | Expr::Index { .. } => Ok(()),
            Expr::Spread(_) => Err(AdapterError::unsupported(line, "starred assignment")),
            Expr::Call { callee, .. }
                if matches!(&**callee, Expr::Member { property, .. } if property == "slice") =>
            {
                Err(AdapterError::unsupported(line, "slice assignment"))
            }
            Expr::Helper {
                helper: Helper::Slice,
                ..
            } => Err(AdapterError::unsupported(line, "slice assignment")),
            _ => Err(AdapterError::syntax(line, "cannot assign to expression")),
        }
    }

    /// Validate and bind an assignment target, turning negative-index reads
    /// back into writable subscripts.
    fn assign_target(&mut self, target: Expr, line: usize) -> AdapterResult<Expr> {
        let target = match target {
            Expr::Call { callee, mut args } if args.len() == 1 => match *callee {
                Expr::Member { object, property } if property == "at" => {
                    let offset = match args.pop() {
                        Some(Expr::Unary {
                            op: UnaryOp::Neg,
                            operand,
                        }) => *operand,
                        Some(other) => other,
                        None => Expr::number(0),
                    };
                    let length = Expr::member((*object).clone(), "length");
                    Expr::index(*object, Expr::binary(BinaryOp::Sub, length, offset))
                }
                callee => Expr::Call {
                    callee: Box::new(callee),
                    args,
                },
            },
            Expr::Array(items) => Expr::Array(
                items
                    .into_iter()
                    .map(|item| self.assign_target(item, line))
                    .collect::<AdapterResult<_>>()?,
            ),
            other => other,
        };
        self.bind_target(&target, line)?;
        Ok(target)
    }

    // ---- statements -----------------------------------------------------

    fn file(&mut self) -> AdapterResult<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Tok::Eof => break,
                Tok::Newline => {
                    self.advance();
                }
                _ => self.statement(&mut body)?,
            }
        }
        Ok(body)
    }

    fn statement(&mut self, out: &mut Vec<Stmt>) -> AdapterResult<()> {
        let line = self.line();
        let keyword = match self.peek() {
            Tok::Name(name) => name.clone(),
            Tok::Indent => return Err(AdapterError::syntax(line, "unexpected indent")),
            Tok::Op(op) if op == "@" => return Err(AdapterError::unsupported(line, "decorator")),
            _ => String::new(),
        };
        match keyword.as_str() {
            "def" => out.push(self.function_def()?),
            "if" => out.push(self.if_stmt()?),
            "while" => out.push(self.while_stmt()?),
            "for" => out.push(self.for_stmt()?),
            "class" => return Err(AdapterError::unsupported(line, "class definition")),
            "try" | "except" | "finally" => {
                return Err(AdapterError::unsupported(line, "exception handling"))
            }
            "with" => return Err(AdapterError::unsupported(line, "with statement")),
            "async" | "await" => return Err(AdapterError::unsupported(line, "async code")),
            _ => self.simple_statements(out)?,
        }
        Ok(())
    }

    fn simple_statements(&mut self, out: &mut Vec<Stmt>) -> AdapterResult<()> {
        loop {
            self.small_statement(out)?;
            if !self.eat_op(";") || matches!(self.peek(), Tok::Newline | Tok::Eof) {
                break;
            }
        }
        match self.peek() {
            Tok::Newline => {
                self.advance();
                Ok(())
            }
            Tok::Eof => Ok(()),
            _ => Err(self.unexpected("invalid syntax")),
        }
    }

    fn block(&mut self) -> AdapterResult<Vec<Stmt>> {
        self.nested(Self::suite)
    }

    fn suite(&mut self) -> AdapterResult<Vec<Stmt>> {
        self.expect_op(":")?;
        let mut out = Vec::new();
        if *self.peek() != Tok::Newline {
            self.simple_statements(&mut out)?;
            return Ok(out);
        }
        self.advance();
        if *self.peek() != Tok::Indent {
            return Err(self.unexpected("expected an indented block"));
        }
        self.advance();
        loop {
            match self.peek() {
                Tok::Dedent => {
                    self.advance();
                    break;
                }
                Tok::Eof => break,
                Tok::Newline => {
                    self.advance();
                }
                _ => self.statement(&mut out)?,
            }
        }
        Ok(out)
    }

    fn function_def(&mut self) -> AdapterResult<Stmt> {
        let line = self.line();
        self.advance();
        let name = self.expect_name()?;
        self.scope().functions.insert(name.clone());

        self.expect_op("(")?;
        let mut params = Vec::new();
        let mut defaults = Vec::new();
        while !self.is_op(")") {
            if self.is_op("*") || self.is_op("**") || self.is_op("/") {
                return Err(AdapterError::unsupported(line, "variadic or positional-only parameters"));
            }
            let param = self.expect_name()?;
            if self.eat_op(":") {
                self.test()?;
            }
            if self.eat_op("=") {
                defaults.push((param.clone(), self.test()?));
            }
            params.push(param);
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        if self.eat_op("->") {
            self.test()?;
        }

        self.scopes.push(Scope {
            params: params.clone(),
            ..Scope::default()
        });
        let body = self.block();
        let scope = self.scopes.pop().unwrap_or_default();
        let mut body = body?;

        let mut prologue: Vec<Stmt> = defaults
            .into_iter()
            .map(|(param, value)| Stmt::If {
                cond: Expr::binary(BinaryOp::Eq, Expr::ident(&param), Expr::ident("undefined")),
                then_block: vec![Stmt::Expr(Expr::assign(
                    AssignOp::Assign,
                    Expr::ident(param),
                    value,
                ))],
                else_block: None,
            })
            .collect();
        prologue.append(&mut body);

        Ok(Stmt::Function(Function {
            name,
            params,
            locals: scope.hoisted(),
            body: prologue,
        }))
    }

    fn if_stmt(&mut self) -> AdapterResult<Stmt> {
        self.advance();
        let cond = condition(self.test()?);
        let then_block = self.block()?;
        let else_block = if self.is_name("elif") {
            Some(vec![self.nested(Self::if_stmt)?])
        } else if self.is_name("else") {
            self.advance();
            Some(self.block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn while_stmt(&mut self) -> AdapterResult<Stmt> {
        self.advance();
        let cond = condition(self.test()?);
        let body = self.block()?;
        if self.is_name("else") {
            return Err(AdapterError::unsupported(self.line(), "while-else"));
        }
        Ok(Stmt::While { cond, body })
    }

    fn for_stmt(&mut self) -> AdapterResult<Stmt> {
        let line = self.line();
        self.advance();
        let target = self.target_list()?;
        let target = self.assign_target(target, line)?;
        self.expect_keyword("in")?;
        let iterable = self.testlist()?;
        let body = self.block()?;
        if self.is_name("else") {
            return Err(AdapterError::unsupported(self.line(), "for-else"));
        }
        Ok(Stmt::ForOf {
            target,
            declare: false,
            iterable: iterable_of(iterable),
            body,
        })
    }

    fn small_statement(&mut self, out: &mut Vec<Stmt>) -> AdapterResult<()> {
        let line = self.line();
        let keyword = match self.peek() {
            Tok::Name(name) => name.clone(),
            _ => String::new(),
        };
        match keyword.as_str() {
            "pass" => {
                self.advance();
            }
            "break" => {
                self.advance();
                out.push(Stmt::Break);
            }
            "continue" => {
                self.advance();
                out.push(Stmt::Continue);
            }
            "return" => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.testlist()?)
                };
                out.push(Stmt::Return(value));
            }
            "global" | "nonlocal" => {
                self.advance();
                loop {
                    let name = self.expect_name()?;
                    self.scope().outer.insert(name);
                    if !self.eat_op(",") {
                        break;
                    }
                }
            }
            "raise" => out.push(self.raise_stmt()?),
            "assert" => {
                self.advance();
                let cond = condition(self.test()?);
                let message = if self.eat_op(",") {
                    self.test()?
                } else {
                    Expr::string("")
                };
                out.push(Stmt::If {
                    cond: Expr::unary(UnaryOp::Not, cond),
                    then_block: vec![Stmt::Throw(Expr::named_error("AssertionError", message))],
                    else_block: None,
                });
            }
            "del" => {
                self.advance();
                loop {
                    let target = self.bitor()?;
                    out.push(Stmt::Expr(delete(target, line)?));
                    if !self.eat_op(",") {
                        break;
                    }
                }
            }
            "import" | "from" => self.import_stmt()?,
            "yield" => return Err(AdapterError::unsupported(line, "generator")),
            _ => self.expression_statement(out)?,
        }
        Ok(())
    }

    fn raise_stmt(&mut self) -> AdapterResult<Stmt> {
        let line = self.line();
        self.advance();
        if self.at_statement_end() {
            return Err(AdapterError::unsupported(line, "bare raise"));
        }
        let (name, mut args) = match self.test()? {
            Expr::Call { callee, args } => match *callee {
                Expr::Ident(name) => (name, args),
                _ => return Err(AdapterError::unsupported(line, "raise of a computed exception")),
            },
            Expr::Ident(name) => (name, Vec::new()),
            _ => return Err(AdapterError::unsupported(line, "raise of a computed exception")),
        };
        if self.is_name("from") {
            self.advance();
            self.test()?;
        }
        let message = if args.is_empty() {
            Expr::string("")
        } else {
            args.swap_remove(0)
        };
        Ok(Stmt::Throw(Expr::named_error(&name, message)))
    }

    fn import_stmt(&mut self) -> AdapterResult<()> {
        let line = self.line();
        if self.is_name("import") {
            self.advance();
            loop {
                let module = self.dotted_name()?;
                let alias = if self.is_name("as") {
                    self.advance();
                    self.expect_name()?
                } else {
                    module.clone()
                };
                match module.as_str() {
                    "math" => {
                        self.math_modules.insert(alias);
                    }
                    "typing" | "__future__" => {}
                    _ => {
                        return Err(AdapterError::unsupported(
                            line,
                            format!("import of module '{module}'"),
                        ))
                    }
                }
                if !self.eat_op(",") {
                    return Ok(());
                }
            }
        }

        self.advance();
        let module = self.dotted_name()?;
        self.expect_keyword("import")?;
        let parenthesized = self.eat_op("(");
        let mut names = Vec::new();
        if self.eat_op("*") {
            if module == "math" {
                for name in MATH_FUNCTIONS {
                    names.push((name.to_string(), name.to_string()));
                }
            }
        } else {
            loop {
                let name = self.expect_name()?;
                let alias = if self.is_name("as") {
                    self.advance();
                    self.expect_name()?
                } else {
                    name.clone()
                };
                names.push((name, alias));
                if !self.eat_op(",") || (parenthesized && self.is_op(")")) {
                    break;
                }
            }
        }
        if parenthesized {
            self.expect_op(")")?;
        }
        match module.as_str() {
            "math" => {
                self.math_aliases
                    .extend(names.into_iter().map(|(name, alias)| (alias, name)));
                Ok(())
            }
            "typing" | "__future__" => Ok(()),
            _ => Err(AdapterError::unsupported(
                line,
                format!("import of module '{module}'"),
            )),
        }
    }

    fn dotted_name(&mut self) -> AdapterResult<String> {
        let mut name = self.expect_name()?;
        while self.eat_op(".") {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    fn expression_statement(&mut self, out: &mut Vec<Stmt>) -> AdapterResult<()> {
        let line = self.line();
        let first = self.testlist_star()?;

        if self.is_op("=") {
            let mut chain = vec![first];
            let mark = self.depth;
            while self.eat_op("=") {
                if let Err(e) = self.chain() {
                    self.depth.restore(mark);
                    return Err(e);
                }
                chain.push(self.testlist_star()?);
            }
            self.depth.restore(mark);
            let mut value = chain.pop().unwrap_or(Expr::Null);
            for target in chain.into_iter().rev() {
                let target = self.assign_target(target, line)?;
                value = Expr::assign(AssignOp::Assign, target, value);
            }
            out.push(Stmt::Expr(value));
            return Ok(());
        }

        if self.eat_op(":") {
            // Annotated assignment; the annotation is dropped.
            self.test()?;
            let target = self.assign_target(first, line)?;
            if self.eat_op("=") {
                let value = self.testlist()?;
                out.push(Stmt::Expr(Expr::assign(AssignOp::Assign, target, value)));
            }
            return Ok(());
        }

        if let Tok::Op(op) = self.peek().clone() {
            if op.len() >= 2 && op.ends_with('=') && !matches!(op.as_str(), "==" | "!=" | "<=" | ">=") {
                self.advance();
                let value = self.testlist()?;
                if matches!(first, Expr::Array(_)) {
                    return Err(AdapterError::syntax(line, "illegal expression for augmented assignment"));
                }
                let target = self.assign_target(first, line)?;
                out.push(Stmt::Expr(augmented(&op, target, value, line)?));
                return Ok(());
            }
        }

        // Bare string literals are docstrings.
        if !matches!(first, Expr::Str(_)) {
            out.push(Stmt::Expr(first));
        }
        Ok(())
    }

    // ---- expressions ----------------------------------------------------

    /// Comma-separated values; more than one becomes an array.
    fn testlist(&mut self) -> AdapterResult<Expr> {
        self.sequence(Self::test)
    }

    fn testlist_star(&mut self) -> AdapterResult<Expr> {
        self.sequence(Self::star_or_test)
    }

    /// Loop and comprehension targets: no comparisons, so `in` is left alone.
    fn target_list(&mut self) -> AdapterResult<Expr> {
        self.sequence(Self::bitor)
    }

    fn sequence(
        &mut self,
        mut item: impl FnMut(&mut Self) -> AdapterResult<Expr>,
    ) -> AdapterResult<Expr> {
        let first = item(self)?;
        if !self.is_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            let closed = [")", "]", "}", "=", ":"].iter().any(|op| self.is_op(op));
            if closed || self.at_statement_end() || self.is_name("in") {
                break;
            }
            items.push(item(self)?);
        }
        Ok(Expr::Array(items))
    }

    fn star_or_test(&mut self) -> AdapterResult<Expr> {
        if self.eat_op("*") {
            return Ok(Expr::Spread(Box::new(self.nested(Self::bitor)?)));
        }
        self.test()
    }

    fn test(&mut self) -> AdapterResult<Expr> {
        self.nested(Self::conditional_test)
    }

    fn conditional_test(&mut self) -> AdapterResult<Expr> {
        if self.is_name("lambda") {
            return self.lambda();
        }
        let value = self.or_test()?;
        if self.is_name("if") {
            self.advance();
            let cond = self.or_test()?;
            self.expect_keyword("else")?;
            let otherwise = self.test()?;
            return Ok(Expr::conditional(condition(cond), value, otherwise));
        }
        if self.is_op(":=") {
            return Err(AdapterError::unsupported(self.line(), "assignment expression"));
        }
        Ok(value)
    }

    fn lambda(&mut self) -> AdapterResult<Expr> {
        let line = self.line();
        self.advance();
        let mut params = Vec::new();
        while !self.is_op(":") {
            if self.is_op("*") || self.is_op("**") {
                return Err(AdapterError::unsupported(line, "variadic lambda parameters"));
            }
            params.push(self.expect_name()?);
            if self.is_op("=") {
                return Err(AdapterError::unsupported(line, "lambda default arguments"));
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(":")?;
        let body = self.test()?;
        Ok(Expr::Arrow {
            params,
            body: Box::new(body),
        })
    }

    fn or_test(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.and_test()?;
        while self.is_name("or") {
            self.advance();
            self.chain()?;
            let rhs = self.and_test()?;
            lhs = Expr::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_test(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.not_test()?;
        while self.is_name("and") {
            self.advance();
            self.chain()?;
            let rhs = self.not_test()?;
            lhs = Expr::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not_test(&mut self) -> AdapterResult<Expr> {
        if self.is_name("not") {
            self.advance();
            let operand = self.nested(Self::not_test)?;
            return Ok(Expr::unary(UnaryOp::Not, condition(operand)));
        }
        self.comparison()
    }

    fn comparison_op(&mut self) -> Option<&'static str> {
        let op = match self.peek() {
            Tok::Op(op) => match op.as_str() {
                "<" => "<",
                ">" => ">",
                "==" => "==",
                "!=" => "!=",
                "<=" => "<=",
                ">=" => ">=",
                _ => return None,
            },
            Tok::Name(name) => match name.as_str() {
                "in" => "in",
                "not" if matches!(self.peek_at(1), Tok::Name(n) if n == "in") => "not in",
                "is" if matches!(self.peek_at(1), Tok::Name(n) if n == "not") => "is not",
                "is" => "is",
                _ => return None,
            },
            _ => return None,
        };
        self.advance();
        if op == "not in" || op == "is not" {
            self.advance();
        }
        Some(op)
    }

    fn comparison(&mut self) -> AdapterResult<Expr> {
        let mut current = self.bitor()?;
        let mut links: Vec<Expr> = Vec::new();
        while let Some(op) = self.comparison_op() {
            self.chain()?;
            let rhs = self.bitor()?;
            links.push(compare(op, current, rhs.clone()));
            current = rhs;
        }
        // `a < b < c` is `a < b and b < c`.
        Ok(links
            .into_iter()
            .reduce(|acc, link| Expr::binary(BinaryOp::And, acc, link))
            .unwrap_or(current))
    }

    fn bitor(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.bitxor()?;
        while self.eat_op("|") {
            self.chain()?;
            lhs = set_or_bits(BinaryOp::BitOr, lhs, self.bitxor()?);
        }
        Ok(lhs)
    }

    fn bitxor(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.bitand()?;
        while self.eat_op("^") {
            self.chain()?;
            lhs = set_or_bits(BinaryOp::BitXor, lhs, self.bitand()?);
        }
        Ok(lhs)
    }

    fn bitand(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.shift()?;
        while self.eat_op("&") {
            self.chain()?;
            lhs = set_or_bits(BinaryOp::BitAnd, lhs, self.shift()?);
        }
        Ok(lhs)
    }

    fn shift(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.arith()?;
        loop {
            let op = if self.eat_op("<<") {
                BinaryOp::Shl
            } else if self.eat_op(">>") {
                BinaryOp::Shr
            } else {
                return Ok(lhs);
            };
            self.chain()?;
            lhs = Expr::binary(op, lhs, self.arith()?);
        }
    }

    fn arith(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            if self.eat_op("+") {
                self.chain()?;
                let rhs = self.term()?;
                lhs = plus(lhs, rhs);
            } else if self.eat_op("-") {
                self.chain()?;
                lhs = set_or_bits(BinaryOp::Sub, lhs, self.term()?);
            } else {
                return Ok(lhs);
            }
        }
    }

    fn term(&mut self) -> AdapterResult<Expr> {
        let mut lhs = self.factor()?;
        loop {
            let line = self.line();
            let op = match self.peek() {
                Tok::Op(op) if matches!(op.as_str(), "*" | "/" | "//" | "%" | "@") => op.clone(),
                _ => return Ok(lhs),
            };
            self.advance();
            self.chain()?;
            let rhs = self.factor()?;
            lhs = match op.as_str() {
                "*" => times(lhs, rhs),
                "/" => Expr::binary(BinaryOp::Div, lhs, rhs),
                "//" => Expr::math("floor", vec![Expr::binary(BinaryOp::Div, lhs, rhs)]),
                "%" if matches!(lhs, Expr::Str(_)) => {
                    return Err(AdapterError::unsupported(line, "printf-style string formatting"))
                }
                "%" => Expr::helper(Helper::FloorMod, vec![lhs, rhs]),
                _ => return Err(AdapterError::unsupported(line, "matrix multiplication")),
            };
        }
    }

    fn factor(&mut self) -> AdapterResult<Expr> {
        let op = if self.eat_op("-") {
            UnaryOp::Neg
        } else if self.eat_op("+") {
            UnaryOp::Plus
        } else if self.eat_op("~") {
            UnaryOp::BitNot
        } else {
            return self.power();
        };
        Ok(Expr::unary(op, self.nested(Self::factor)?))
    }

    fn power(&mut self) -> AdapterResult<Expr> {
        if self.is_name("await") {
            return Err(AdapterError::unsupported(self.line(), "async code"));
        }
        let base = self.atom_expr()?;
        if self.eat_op("**") {
            let exponent = self.nested(Self::factor)?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn atom_expr(&mut self) -> AdapterResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            let line = self.line();
            if self.is_op("(") || self.is_op("[") || self.is_op(".") {
                self.chain()?;
            }
            if self.is_op("(") {
                let (args, kwargs) = self.arguments()?;
                expr = self.call(expr, args, kwargs, line)?;
            } else if self.is_op("[") {
                expr = self.subscript(expr)?;
            } else if self.eat_op(".") {
                let attr = match self.advance() {
                    Tok::Name(name) => name,
                    _ => return Err(AdapterError::syntax(line, "expected attribute name")),
                };
                if self.is_op("(") {
                    let (args, kwargs) = self.arguments()?;
                    expr = self.method(expr, &attr, args, kwargs, line)?;
                } else {
                    expr = self.attribute(expr, attr);
                }
            } else {
                return Ok(expr);
            }
        }
    }

    fn arguments(&mut self) -> AdapterResult<(Vec<Expr>, Vec<(String, Expr)>)> {
        let line = self.line();
        self.expect_op("(")?;
        let mut args = Vec::new();
        let mut kwargs = Vec::new();
        while !self.is_op(")") {
            if self.is_op("**") {
                return Err(AdapterError::unsupported(line, "keyword argument unpacking"));
            }
            if self.eat_op("*") {
                args.push(Expr::Spread(Box::new(self.test()?)));
            } else if matches!(self.peek(), Tok::Name(_)) && matches!(self.peek_at(1), Tok::Op(o) if o == "=")
            {
                let name = self.expect_name()?;
                self.advance();
                let value = self.test()?;
                kwargs.push((name, self.callable_value(value)));
            } else {
                let value = self.test()?;
                let value = if self.is_name("for") {
                    self.comprehension(value)?
                } else {
                    value
                };
                args.push(self.callable_value(value));
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok((args, kwargs))
    }

    /// Builtins passed as values become arrows, e.g. `key=len`.
    fn callable_value(&mut self, value: Expr) -> Expr {
        match value {
            Expr::Ident(name) if VALUE_BUILTINS.contains(&name.as_str()) && !self.is_bound(&name) => {
                let line = self.line();
                match self.builtin(&name, vec![Expr::ident("__value")], Vec::new(), line) {
                    Ok(body) => Expr::arrow(&["__value"], body),
                    Err(_) => Expr::Ident(name),
                }
            }
            other => other,
        }
    }

    fn subscript(&mut self, object: Expr) -> AdapterResult<Expr> {
        self.expect_op("[")?;
        let start = if self.is_op(":") {
            None
        } else {
            Some(self.testlist()?)
        };
        if !self.eat_op(":") {
            self.expect_op("]")?;
            let index = start.unwrap_or(Expr::Null);
            return Ok(if is_negative_literal(&index) {
                Expr::method(object, "at", vec![index])
            } else {
                Expr::index(object, index)
            });
        }

        let stop = if self.is_op(":") || self.is_op("]") {
            None
        } else {
            Some(self.test()?)
        };
        let step = if self.eat_op(":") && !self.is_op("]") {
            Some(self.test()?)
        } else {
            None
        };
        self.expect_op("]")?;

        Ok(match step {
            Some(step) => Expr::helper(
                Helper::Slice,
                vec![
                    object,
                    start.unwrap_or(Expr::Null),
                    stop.unwrap_or(Expr::Null),
                    step,
                ],
            ),
            None => {
                let mut args = vec![start.unwrap_or_else(|| Expr::number(0))];
                args.extend(stop);
                Expr::method(object, "slice", args)
            }
        })
    }

    fn atom(&mut self) -> AdapterResult<Expr> {
        let line = self.line();
        match self.peek().clone() {
            Tok::Number(text) => {
                self.advance();
                Ok(Expr::Number(text))
            }
            Tok::Str(_) | Tok::FString(_) => self.strings(),
            Tok::Name(name) => {
                match name.as_str() {
                    "True" => {
                        self.advance();
                        Ok(Expr::Bool(true))
                    }
                    "False" => {
                        self.advance();
                        Ok(Expr::Bool(false))
                    }
                    "None" => {
                        self.advance();
                        Ok(Expr::Null)
                    }
                    // Submissions run as an imported module, never as `__main__`.
                    "__name__" => {
                        self.advance();
                        Ok(Expr::string("__solution__"))
                    }
                    "yield" => Err(AdapterError::unsupported(line, "generator")),
                    "await" | "async" => Err(AdapterError::unsupported(line, "async code")),
                    _ => Ok(Expr::Ident(self.expect_name()?)),
                }
            }
            Tok::Op(op) => {
                self.advance();
                match op.as_str() {
                    "(" => self.parenthesized(),
                    "[" => self.list_display(),
                    "{" => self.brace_display(),
                    "..." => Err(AdapterError::unsupported(line, "Ellipsis")),
                    _ => Err(AdapterError::syntax(line, format!("invalid syntax near '{op}'"))),
                }
            }
            _ => Err(self.unexpected("invalid syntax")),
        }
    }

    fn parenthesized(&mut self) -> AdapterResult<Expr> {
        if self.eat_op(")") {
            return Ok(Expr::Array(Vec::new()));
        }
        let first = self.star_or_test()?;
        if self.is_name("for") {
            let list = self.comprehension(first)?;
            self.expect_op(")")?;
            return Ok(list);
        }
        if !self.is_op(",") {
            self.expect_op(")")?;
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") && !self.is_op(")") {
            items.push(self.star_or_test()?);
        }
        self.expect_op(")")?;
        Ok(Expr::Array(items))
    }

    fn list_display(&mut self) -> AdapterResult<Expr> {
        if self.eat_op("]") {
            return Ok(Expr::Array(Vec::new()));
        }
        let first = self.star_or_test()?;
        if self.is_name("for") {
            let list = self.comprehension(first)?;
            self.expect_op("]")?;
            return Ok(list);
        }
        let mut items = vec![first];
        while self.eat_op(",") && !self.is_op("]") {
            items.push(self.star_or_test()?);
        }
        self.expect_op("]")?;
        Ok(Expr::Array(items))
    }

    fn brace_display(&mut self) -> AdapterResult<Expr> {
        let line = self.line();
        if self.eat_op("}") {
            return Ok(Expr::Object(Vec::new()));
        }
        if self.is_op("**") {
            return Err(AdapterError::unsupported(line, "dictionary unpacking"));
        }
        let first = self.test()?;
        if self.eat_op(":") {
            let value = self.test()?;
            if self.is_name("for") {
                let pairs = self.comprehension(Expr::Array(vec![first, value]))?;
                self.expect_op("}")?;
                return Ok(Expr::method(Expr::ident("Object"), "fromEntries", vec![pairs]));
            }
            let mut entries = vec![(property_key(first), value)];
            while self.eat_op(",") && !self.is_op("}") {
                let key = self.test()?;
                self.expect_op(":")?;
                entries.push((property_key(key), self.test()?));
            }
            self.expect_op("}")?;
            return Ok(Expr::Object(entries));
        }

        let items = if self.is_name("for") {
            self.comprehension(first)?
        } else {
            let mut items = vec![first];
            while self.eat_op(",") && !self.is_op("}") {
                items.push(self.test()?);
            }
            Expr::Array(items)
        };
        self.expect_op("}")?;
        Ok(new_set(vec![items]))
    }

    /// `elt for target in iterable if cond ...`, lowered to array pipelines.
    fn comprehension(&mut self, element: Expr) -> AdapterResult<Expr> {
        let mut clauses = Vec::new();
        while self.is_name("for") {
            self.advance();
            self.chain()?;
            let target = self.target_list()?;
            self.expect_keyword("in")?;
            let iterable = self.or_test()?;
            let mut conditions = Vec::new();
            while self.is_name("if") {
                self.advance();
                conditions.push(condition(self.or_test()?));
            }
            clauses.push(Clause {
                target,
                iterable,
                conditions,
            });
        }
        let line = self.line();
        build_comprehension(clauses, element, line)
    }

    fn strings(&mut self) -> AdapterResult<Expr> {
        let mut parts: Vec<Expr> = Vec::new();
        loop {
            let line = self.line();
            match self.peek().clone() {
                Tok::Str(value) => {
                    self.advance();
                    push_literal(&mut parts, value);
                }
                Tok::FString(raw) => {
                    self.advance();
                    self.fstring(&raw, line, &mut parts)?;
                }
                _ => break,
            }
        }
        for _ in 1..parts.len() {
            self.chain()?;
        }
        let mut parts = parts.into_iter();
        let first = match parts.next() {
            Some(first) if is_text(&first) => first,
            Some(other) => Expr::binary(BinaryOp::Add, Expr::string(""), other),
            None => Expr::string(""),
        };
        Ok(parts.fold(first, |acc, part| Expr::binary(BinaryOp::Add, acc, part)))
    }

    fn fstring(&mut self, raw: &str, line: usize, parts: &mut Vec<Expr>) -> AdapterResult<()> {
        let chars: Vec<char> = raw.chars().collect();
        let mut literal = String::new();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '{' && chars.get(i + 1) == Some(&'{') {
                literal.push('{');
                i += 2;
                continue;
            }
            if c == '}' {
                if chars.get(i + 1) == Some(&'}') {
                    literal.push('}');
                    i += 2;
                    continue;
                }
                return Err(AdapterError::syntax(line, "f-string: single '}' is not allowed"));
            }
            if c != '{' {
                literal.push(c);
                i += 1;
                continue;
            }

            push_literal(parts, decode_fstring_literal(&literal));
            literal.clear();

            let mut depth = 0usize;
            let mut quote: Option<char> = None;
            let mut spec_start = None;
            let mut end = i + 1;
            while end < chars.len() {
                let d = chars[end];
                if let Some(q) = quote {
                    if d == q {
                        quote = None;
                    }
                } else {
                    match d {
                        '\'' | '"' => quote = Some(d),
                        '(' | '[' | '{' => depth += 1,
                        ')' | ']' => depth = depth.saturating_sub(1),
                        '}' if depth == 0 => break,
                        '}' => depth -= 1,
                        ':' if depth == 0 && spec_start.is_none() => spec_start = Some(end),
                        _ => {}
                    }
                }
                end += 1;
            }
            if end >= chars.len() {
                return Err(AdapterError::syntax(line, "f-string: expecting '}'"));
            }

            let mut source: String = chars[i + 1..spec_start.unwrap_or(end)].iter().collect();
            let trimmed = source.trim_end();
            if trimmed.ends_with('=') && !trimmed.ends_with("==") {
                return Err(AdapterError::unsupported(line, "self-documenting f-string expression"));
            }
            for conversion in ["!r", "!s", "!a"] {
                if let Some(stripped) = trimmed.strip_suffix(conversion) {
                    source = stripped.to_string();
                    break;
                }
            }
            let spec: Option<String> = spec_start.map(|s| chars[s + 1..end].iter().collect());
            let value = self.sub_expression(&source, line)?;
            parts.push(format_value(value, spec.as_deref(), line)?);
            i = end + 1;
        }
        push_literal(parts, decode_fstring_literal(&literal));
        Ok(())
    }

    /// Parse an f-string interpolation with the current scopes in effect.
    fn sub_expression(&mut self, source: &str, line: usize) -> AdapterResult<Expr> {
        let relocate = |err: AdapterError| match err {
            AdapterError::Syntax { message, .. } => AdapterError::Syntax { line, message },
            AdapterError::UnsupportedConstruct { construct, .. } => {
                AdapterError::UnsupportedConstruct { line, construct }
            }
            other => other,
        };
        let tokens = tokenize(source.trim())
            .map_err(relocate)?
            .into_iter()
            .map(|t| PyToken { line, ..t })
            .collect();
        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let value = self.test();
        let complete = matches!(self.peek(), Tok::Newline | Tok::Eof);
        self.tokens = saved_tokens;
        self.pos = saved_pos;
        let value = value.map_err(relocate)?;
        if !complete {
            return Err(AdapterError::syntax(line, "f-string: invalid expression"));
        }
        Ok(value)
    }

    fn attribute(&self, object: Expr, attr: String) -> Expr {
        if self.is_math_module(&object) {
            return match attr.as_str() {
                "pi" => Expr::member(Expr::ident("Math"), "PI"),
                "e" => Expr::member(Expr::ident("Math"), "E"),
                "tau" => Expr::binary(
                    BinaryOp::Mul,
                    Expr::number(2),
                    Expr::member(Expr::ident("Math"), "PI"),
                ),
                "inf" => Expr::ident("Infinity"),
                "nan" => Expr::ident("NaN"),
                _ => Expr::member(Expr::ident("Math"), attr),
            };
        }
        Expr::member(object, attr)
    }

    fn is_math_module(&self, object: &Expr) -> bool {
        matches!(object, Expr::Ident(name) if self.math_modules.contains(name) && !self.is_bound(name))
    }

    fn call(
        &mut self,
        callee: Expr,
        args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        line: usize,
    ) -> AdapterResult<Expr> {
        if let Expr::Ident(name) = &callee {
            if !self.is_bound(name) {
                if let Some(function) = self.math_aliases.get(name).cloned() {
                    return math_call(&function, args, line);
                }
                return self.builtin(name, args, kwargs, line);
            }
        }
        if !kwargs.is_empty() {
            return Err(AdapterError::unsupported(line, "keyword arguments"));
        }
        Ok(Expr::call(callee, args))
    }

    fn builtin(
        &mut self,
        name: &str,
        mut args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        line: usize,
    ) -> AdapterResult<Expr> {
        if REJECTED_BUILTINS.contains(&name) {
            return Err(AdapterError::unsupported(line, format!("builtin '{name}'")));
        }
        let mut kwargs: HashMap<String, Expr> = kwargs.into_iter().collect();
        let allowed: &[&str] = match name {
            "sorted" => &["reverse", "key"],
            "print" => &["sep", "end"],
            _ => &[],
        };
        if name != "dict" {
            if let Some(extra) = kwargs.keys().find(|k| !allowed.contains(&k.as_str())) {
                return Err(AdapterError::unsupported(
                    line,
                    format!("keyword argument '{extra}' to {name}()"),
                ));
            }
        }
        let arity = |min: usize, max: usize| -> AdapterResult<()> {
            let count = args.len();
            if (min..=max).contains(&count) {
                return Ok(());
            }
            let expected = if max == usize::MAX {
                format!("at least {min}")
            } else if min == max {
                min.to_string()
            } else {
                format!("{min} to {max}")
            };
            Err(AdapterError::syntax(
                line,
                format!("{name}() takes {expected} arguments, got {count}"),
            ))
        };
        let first = |args: &mut Vec<Expr>| -> Expr {
            if args.is_empty() {
                Expr::Null
            } else {
                args.remove(0)
            }
        };
        let value = match name {
            "print" => Expr::method(Expr::ident("console"), "log", args),
            "len" => {
                arity(1, 1)?;
                Expr::helper(Helper::Len, args)
            }
            "int" => {
                arity(0, 2)?;
                match args.len() {
                    0 => Expr::number(0),
                    1 => Expr::math("trunc", vec![Expr::call(Expr::ident("Number"), args)]),
                    _ => Expr::call(Expr::ident("parseInt"), args),
                }
            }
            "float" => {
                arity(0, 1)?;
                match args.pop() {
                    None => Expr::number(0),
                    Some(Expr::Str(text)) if matches!(text.trim(), "inf" | "+inf" | "infinity") => {
                        Expr::ident("Infinity")
                    }
                    Some(Expr::Str(text)) if matches!(text.trim(), "-inf" | "-infinity") => {
                        Expr::unary(UnaryOp::Neg, Expr::ident("Infinity"))
                    }
                    Some(Expr::Str(text)) if text.trim() == "nan" => Expr::ident("NaN"),
                    Some(value) => Expr::call(Expr::ident("Number"), vec![value]),
                }
            }
            "str" => {
                arity(0, 1)?;
                match args.pop() {
                    None => Expr::string(""),
                    Some(value) => to_text(value),
                }
            }
            "bool" => {
                arity(0, 1)?;
                match args.pop() {
                    None => Expr::Bool(false),
                    Some(value) => Expr::helper(Helper::Truthy, vec![value]),
                }
            }
            "abs" => {
                arity(1, 1)?;
                Expr::math("abs", args)
            }
            "min" | "max" => {
                arity(1, usize::MAX)?;
                if args.len() == 1 && !matches!(args[0], Expr::Spread(_)) {
                    let items = first(&mut args);
                    Expr::math(name, vec![Expr::Spread(Box::new(iterable_of(items)))])
                } else {
                    Expr::math(name, args)
                }
            }
            "sum" => {
                arity(1, 2)?;
                Expr::helper(Helper::Sum, args)
            }
            "sorted" => {
                arity(1, 1)?;
                let reverse = kwargs.remove("reverse").unwrap_or(Expr::Bool(false));
                args.push(reverse);
                args.extend(kwargs.remove("key"));
                Expr::helper(Helper::Sorted, args)
            }
            "reversed" => {
                arity(1, 1)?;
                Expr::method(array_from(first(&mut args)), "reverse", vec![])
            }
            "list" | "tuple" => {
                arity(0, 1)?;
                match args.pop() {
                    None => Expr::Array(Vec::new()),
                    Some(items) => array_from(items),
                }
            }
            "set" => {
                arity(0, 1)?;
                new_set(args.into_iter().map(iterable_of).collect())
            }
            "dict" => {
                arity(0, 1)?;
                if let Some(pairs) = args.pop() {
                    if !kwargs.is_empty() {
                        return Err(AdapterError::unsupported(line, "dict() with both positional and keyword arguments"));
                    }
                    Expr::method(Expr::ident("Object"), "fromEntries", vec![pairs])
                } else {
                    let mut entries: Vec<(String, Expr)> = kwargs.drain().collect();
                    entries.sort_by(|a, b| a.0.cmp(&b.0));
                    Expr::Object(
                        entries
                            .into_iter()
                            .map(|(k, v)| (PropKey::Static(k), v))
                            .collect(),
                    )
                }
            }
            "range" => {
                arity(1, 3)?;
                Expr::helper(Helper::Range, args)
            }
            "enumerate" => {
                arity(1, 2)?;
                let items = first(&mut args);
                let index = match args.pop() {
                    Some(start) => Expr::binary(BinaryOp::Add, Expr::ident("__index"), start),
                    None => Expr::ident("__index"),
                };
                Expr::method(
                    Expr::ident("Array"),
                    "from",
                    vec![
                        iterable_of(items),
                        Expr::arrow(
                            &["__value", "__index"],
                            Expr::Array(vec![index, Expr::ident("__value")]),
                        ),
                    ],
                )
            }
            "zip" => Expr::helper(Helper::Zip, args),
            "round" => {
                arity(1, 2)?;
                Expr::helper(Helper::Round, args)
            }
            "pow" => {
                arity(2, 2)?;
                let base = first(&mut args);
                Expr::binary(BinaryOp::Pow, base, first(&mut args))
            }
            "divmod" => {
                arity(2, 2)?;
                let a = first(&mut args);
                let b = first(&mut args);
                Expr::Array(vec![
                    Expr::math(
                        "floor",
                        vec![Expr::binary(BinaryOp::Div, a.clone(), b.clone())],
                    ),
                    Expr::helper(Helper::FloorMod, vec![a, b]),
                ])
            }
            "ord" => {
                arity(1, 1)?;
                Expr::method(first(&mut args), "charCodeAt", vec![Expr::number(0)])
            }
            "chr" => {
                arity(1, 1)?;
                Expr::method(Expr::ident("String"), "fromCharCode", args)
            }
            "any" | "all" => {
                arity(1, 1)?;
                let method = if name == "any" { "some" } else { "every" };
                Expr::method(
                    array_from(first(&mut args)),
                    method,
                    vec![Expr::arrow(
                        &["__value"],
                        Expr::helper(Helper::Truthy, vec![Expr::ident("__value")]),
                    )],
                )
            }
            "map" => {
                arity(2, 2)?;
                let function = first(&mut args);
                let items = first(&mut args);
                Expr::method(
                    Expr::ident("Array"),
                    "from",
                    vec![
                        iterable_of(items),
                        Expr::arrow(&["__value"], Expr::call(function, vec![Expr::ident("__value")])),
                    ],
                )
            }
            "filter" => {
                arity(2, 2)?;
                let function = first(&mut args);
                let items = first(&mut args);
                let test = match function {
                    Expr::Null => Expr::ident("__value"),
                    function => Expr::call(function, vec![Expr::ident("__value")]),
                };
                Expr::method(
                    array_from(items),
                    "filter",
                    vec![Expr::arrow(&["__value"], Expr::helper(Helper::Truthy, vec![test]))],
                )
            }
            _ => {
                if !kwargs.is_empty() {
                    return Err(AdapterError::unsupported(line, "keyword arguments"));
                }
                Expr::call(Expr::ident(name), args)
            }
        };
        Ok(value)
    }

    fn method(
        &mut self,
        object: Expr,
        name: &str,
        mut args: Vec<Expr>,
        kwargs: Vec<(String, Expr)>,
        line: usize,
    ) -> AdapterResult<Expr> {
        if self.is_math_module(&object) {
            return math_call(name, args, line);
        }
        let mut kwargs: HashMap<String, Expr> = kwargs.into_iter().collect();
        if name != "sort" || kwargs.keys().any(|k| k != "reverse" && k != "key") {
            if let Some(extra) = kwargs.keys().next() {
                return Err(AdapterError::unsupported(
                    line,
                    format!("keyword argument '{extra}' to {name}()"),
                ));
            }
        }

        let js = |method: &str, args: Vec<Expr>| -> AdapterResult<Expr> {
            Ok(Expr::method(object.clone(), method, args))
        };
        match (name, args.len()) {
            ("append", 1) => js("push", args),
            ("extend", 1) => {
                let items = args.remove(0);
                js("push", vec![Expr::Spread(Box::new(iterable_of(items)))])
            }
            ("pop", 1) => Ok(Expr::index(
                Expr::method(object, "splice", vec![args.remove(0), Expr::number(1)]),
                Expr::number(0),
            )),
            ("insert", 2) => {
                let index = args.remove(0);
                js("splice", vec![index, Expr::number(0), args.remove(0)])
            }
            ("remove", 1) => Ok(Expr::helper(Helper::Remove, vec![object, args.remove(0)])),
            ("index", 1) | ("find", 1) => js("indexOf", args),
            ("count", 1) => Ok(Expr::helper(Helper::Count, vec![object, args.remove(0)])),
            ("sort", 0) => {
                let reverse = kwargs.remove("reverse").unwrap_or(Expr::Bool(false));
                let mut args = vec![object, reverse];
                args.extend(kwargs.remove("key"));
                Ok(Expr::helper(Helper::SortInPlace, args))
            }
            ("copy", 0) => Ok(Expr::method(
                Expr::ident("Object"),
                "assign",
                vec![
                    Expr::conditional(
                        Expr::method(Expr::ident("Array"), "isArray", vec![object.clone()]),
                        Expr::Array(Vec::new()),
                        Expr::Object(Vec::new()),
                    ),
                    object,
                ],
            )),
            ("upper", 0) => js("toUpperCase", args),
            ("lower", 0) => js("toLowerCase", args),
            ("strip", 0) => js("trim", args),
            ("lstrip", 0) => js("trimStart", args),
            ("rstrip", 0) => js("trimEnd", args),
            ("split", 0) => Ok(Expr::helper(Helper::SplitWhitespace, vec![object])),
            ("join", 1) => {
                let items = args.remove(0);
                Ok(Expr::method(array_from(items), "join", vec![object]))
            }
            ("replace", 2) => js("replaceAll", args),
            ("startswith", 1) => js("startsWith", args),
            ("endswith", 1) => js("endsWith", args),
            ("isdigit", 0) => Ok(Expr::helper(Helper::IsDigit, vec![object])),
            ("isalpha", 0) => Ok(Expr::helper(Helper::IsLetter, vec![object])),
            ("isalnum", 0) => Ok(Expr::helper(Helper::IsAlphanumeric, vec![object])),
            ("isupper", 0) | ("islower", 0) => {
                let (same, other) = if name == "isupper" {
                    ("toUpperCase", "toLowerCase")
                } else {
                    ("toLowerCase", "toUpperCase")
                };
                Ok(Expr::binary(
                    BinaryOp::And,
                    Expr::binary(BinaryOp::Eq, Expr::method(object.clone(), same, vec![]), object.clone()),
                    Expr::binary(BinaryOp::NotEq, Expr::method(object.clone(), other, vec![]), object),
                ))
            }
            ("get", 1) | ("get", 2) => {
                let mut helper_args = vec![object];
                helper_args.append(&mut args);
                if helper_args.len() == 2 {
                    helper_args.push(Expr::Null);
                }
                Ok(Expr::helper(Helper::GetOr, helper_args))
            }
            ("keys", 0) | ("values", 0) | ("items", 0) => {
                let method = match name {
                    "keys" => "keys",
                    "values" => "values",
                    _ => "entries",
                };
                Ok(Expr::method(Expr::ident("Object"), method, vec![object]))
            }
            ("discard", 1) => js("delete", args),
            ("format", _) => Err(AdapterError::unsupported(line, "str.format")),
            _ => js(name, args),
        }
    }
}

fn local_name(name: &str) -> String {
    if RUNTIME_NAMES.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

fn math_call(function: &str, mut args: Vec<Expr>, line: usize) -> AdapterResult<Expr> {
    match function {
        "fabs" => Ok(Expr::math("abs", args)),
        "isqrt" => Ok(Expr::math("floor", vec![Expr::math("sqrt", args)])),
        "log" if args.len() == 2 => {
            let base = args.pop().unwrap_or(Expr::Null);
            let value = args.pop().unwrap_or(Expr::Null);
            Ok(Expr::binary(
                BinaryOp::Div,
                Expr::math("log", vec![value]),
                Expr::math("log", vec![base]),
            ))
        }
        "log" => Ok(Expr::math("log", args)),
        f if MATH_FUNCTIONS.contains(&f) => Ok(Expr::math(f, args)),
        other => Err(AdapterError::unsupported(line, format!("math.{other}"))),
    }
}

/// Comparisons stay primitive when either side is a known scalar;
/// otherwise they compare structurally.
fn compare(op: &str, lhs: Expr, rhs: Expr) -> Expr {
    let scalar = is_scalar(&lhs) || is_scalar(&rhs);
    let binary = |op| Expr::binary(op, lhs.clone(), rhs.clone());
    let ordered = |op| {
        if scalar {
            binary(op)
        } else {
            let order = Expr::helper(Helper::Compare, vec![lhs.clone(), rhs.clone()]);
            Expr::binary(op, order, Expr::number(0))
        }
    };
    let equal = || Expr::helper(Helper::Equal, vec![lhs.clone(), rhs.clone()]);
    match op {
        "<" => ordered(BinaryOp::Lt),
        ">" => ordered(BinaryOp::Gt),
        "<=" => ordered(BinaryOp::Le),
        ">=" => ordered(BinaryOp::Ge),
        "==" if scalar => binary(BinaryOp::Eq),
        "==" => equal(),
        "!=" if scalar => binary(BinaryOp::NotEq),
        "!=" => Expr::unary(UnaryOp::Not, equal()),
        "is" => binary(BinaryOp::Eq),
        "is not" => binary(BinaryOp::NotEq),
        "in" => Expr::helper(Helper::Contains, vec![rhs, lhs]),
        _ => Expr::unary(UnaryOp::Not, Expr::helper(Helper::Contains, vec![rhs, lhs])),
    }
}

/// `a + b`: array concatenation, primitive addition, or a runtime dispatch
/// when neither operand's kind is known.
fn plus(lhs: Expr, rhs: Expr) -> Expr {
    if matches!(lhs, Expr::Array(_)) || matches!(rhs, Expr::Array(_)) {
        Expr::method(lhs, "concat", vec![rhs])
    } else if is_scalar(&lhs) || is_scalar(&rhs) {
        Expr::binary(BinaryOp::Add, lhs, rhs)
    } else {
        Expr::helper(Helper::Add, vec![lhs, rhs])
    }
}

/// `a * b`: repetition when a side is a sequence, multiplication when
/// both are numbers.
fn times(lhs: Expr, rhs: Expr) -> Expr {
    let sequence = |e: &Expr| is_sequence_literal(e) || is_text(e);
    if sequence(&lhs) || sequence(&rhs) {
        Expr::helper(Helper::Repeat, vec![lhs, rhs])
    } else if is_numeric(&lhs) && is_numeric(&rhs) {
        Expr::binary(BinaryOp::Mul, lhs, rhs)
    } else {
        Expr::helper(Helper::Multiply, vec![lhs, rhs])
    }
}

/// `-`, `|`, `&` and `^` also work on sets.
fn set_or_bits(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    if is_scalar(&lhs) || is_scalar(&rhs) {
        return Expr::binary(op, lhs, rhs);
    }
    let symbol = match op {
        BinaryOp::Sub => "-",
        BinaryOp::BitOr => "|",
        BinaryOp::BitAnd => "&",
        _ => "^",
    };
    Expr::helper(Helper::SetOp, vec![Expr::string(symbol), lhs, rhs])
}

fn augmented(op: &str, target: Expr, value: Expr, line: usize) -> AdapterResult<Expr> {
    let assign = |op| Ok(Expr::assign(op, target.clone(), value.clone()));
    match op {
        "+=" if matches!(value, Expr::Array(_)) => Ok(Expr::method(
            target.clone(),
            "push",
            vec![Expr::Spread(Box::new(value.clone()))],
        )),
        "+=" if is_scalar(&value) => assign(AssignOp::Add),
        "+=" => Ok(Expr::assign(
            AssignOp::Assign,
            target.clone(),
            Expr::helper(Helper::InPlaceAdd, vec![target.clone(), value.clone()]),
        )),
        "-=" | "&=" | "|=" | "^=" if !is_scalar(&value) => {
            let op = match op {
                "-=" => BinaryOp::Sub,
                "&=" => BinaryOp::BitAnd,
                "|=" => BinaryOp::BitOr,
                _ => BinaryOp::BitXor,
            };
            Ok(Expr::assign(
                AssignOp::Assign,
                target.clone(),
                set_or_bits(op, target.clone(), value.clone()),
            ))
        }
        "-=" => assign(AssignOp::Sub),
        "*=" => Ok(Expr::assign(
            AssignOp::Assign,
            target.clone(),
            times(target.clone(), value.clone()),
        )),
        "/=" => assign(AssignOp::Div),
        "//=" => Ok(Expr::assign(
            AssignOp::Assign,
            target.clone(),
            Expr::math("floor", vec![Expr::binary(BinaryOp::Div, target.clone(), value.clone())]),
        )),
        "%=" => Ok(Expr::assign(
            AssignOp::Assign,
            target.clone(),
            Expr::helper(Helper::FloorMod, vec![target.clone(), value.clone()]),
        )),
        "**=" => assign(AssignOp::Pow),
        "&=" => assign(AssignOp::BitAnd),
        "|=" => assign(AssignOp::BitOr),
        "^=" => assign(AssignOp::BitXor),
        "<<=" => assign(AssignOp::Shl),
        ">>=" => assign(AssignOp::Shr),
        other => Err(AdapterError::unsupported(line, format!("operator '{other}'"))),
    }
}

fn delete(target: Expr, line: usize) -> AdapterResult<Expr> {
    match target {
        Expr::Index { object, index } => Ok(Expr::conditional(
            Expr::method(Expr::ident("Array"), "isArray", vec![(*object).clone()]),
            Expr::method((*object).clone(), "splice", vec![(*index).clone(), Expr::number(1)]),
            Expr::method(Expr::ident("Reflect"), "deleteProperty", vec![*object, *index]),
        )),
        _ => Err(AdapterError::unsupported(line, "del of a non-subscript target")),
    }
}

/// Rewrite an expression used as a condition so Python truthiness holds:
/// empty collections are false.
fn condition(expr: Expr) -> Expr {
    match expr {
        Expr::Binary {
            op: op @ (BinaryOp::And | BinaryOp::Or),
            lhs,
            rhs,
        } => Expr::binary(op, condition(*lhs), condition(*rhs)),
        expr if is_boolean(&expr) => expr,
        other => Expr::helper(Helper::Truthy, vec![other]),
    }
}

fn is_boolean(expr: &Expr) -> bool {
    match expr {
        Expr::Binary { op, .. } => matches!(
            op,
            BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        ),
        Expr::Unary {
            op: UnaryOp::Not, ..
        }
        | Expr::Bool(_)
        | Expr::Null
        | Expr::Number(_)
        | Expr::Str(_) => true,
        Expr::Helper { helper, .. } => matches!(
            helper,
            Helper::Contains
                | Helper::IsDigit
                | Helper::IsLetter
                | Helper::IsAlphanumeric
                | Helper::Truthy
                | Helper::Equal
        ),
        Expr::Call { callee, .. } => matches!(&**callee, Expr::Member { property, .. }
            if matches!(property.as_str(), "startsWith" | "endsWith" | "some" | "every" | "has" | "isArray")),
        _ => false,
    }
}

/// Wrap a loop source so that iterating a plain object yields its keys.
fn iterable_of(expr: Expr) -> Expr {
    let iterable = match &expr {
        Expr::Array(_) | Expr::Str(_) | Expr::Spread(_) => true,
        Expr::Helper { helper, .. } => matches!(
            helper,
            Helper::Range
                | Helper::Zip
                | Helper::Iter
                | Helper::Sorted
                | Helper::Slice
                | Helper::SplitWhitespace
        ),
        Expr::Call { callee, .. } => matches!(&**callee, Expr::Member { object, .. }
            if matches!(&**object, Expr::Ident(name) if name == "Object" || name == "Array")),
        _ => false,
    };
    if iterable {
        expr
    } else {
        Expr::helper(Helper::Iter, vec![expr])
    }
}

fn array_from(expr: Expr) -> Expr {
    Expr::method(Expr::ident("Array"), "from", vec![iterable_of(expr)])
}

fn new_set(args: Vec<Expr>) -> Expr {
    Expr::New {
        callee: Box::new(Expr::ident("Set")),
        args,
    }
}

/// Expressions that already produce a string.
fn is_text(expr: &Expr) -> bool {
    match expr {
        Expr::Str(_) => true,
        Expr::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
        } => is_text(lhs) || is_text(rhs),
        Expr::Helper {
            helper: Helper::Str,
            ..
        } => true,
        Expr::Call { callee, .. } => match &**callee {
            Expr::Ident(name) => name == "String",
            Expr::Member { property, .. } => matches!(
                property.as_str(),
                "toFixed"
                    | "padStart"
                    | "padEnd"
                    | "toUpperCase"
                    | "toLowerCase"
                    | "trim"
                    | "trimStart"
                    | "trimEnd"
                    | "replaceAll"
                    | "join"
                    | "fromCharCode"
            ),
            _ => false,
        },
        _ => false,
    }
}

/// Expressions statically known to produce a number.
fn is_numeric(expr: &Expr) -> bool {
    match expr {
        Expr::Number(_) => true,
        Expr::Ident(name) => name == "Infinity" || name == "NaN",
        Expr::Unary { op, .. } => *op != UnaryOp::Not,
        Expr::Binary { op, lhs, rhs } => match op {
            BinaryOp::Add => is_numeric(lhs) && is_numeric(rhs),
            BinaryOp::And
            | BinaryOp::Or
            | BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => false,
            _ => true,
        },
        Expr::Helper { helper, .. } => matches!(
            helper,
            Helper::Len | Helper::Count | Helper::FloorMod | Helper::Round
        ),
        Expr::Member { object, .. } => matches!(&**object, Expr::Ident(name) if name == "Math"),
        Expr::Call { callee, .. } => match &**callee {
            Expr::Ident(name) => name == "Number" || name == "parseInt",
            Expr::Member { object, property } => {
                matches!(&**object, Expr::Ident(name) if name == "Math")
                    || matches!(property.as_str(), "charCodeAt" | "indexOf")
            }
            _ => false,
        },
        _ => false,
    }
}

/// Numbers, strings, booleans and `None`: values `===` compares correctly.
fn is_scalar(expr: &Expr) -> bool {
    is_numeric(expr) || is_text(expr) || is_boolean(expr)
}

/// `str(value)` with Python's spelling of booleans, `None` and containers.
fn to_text(value: Expr) -> Expr {
    if is_text(&value) {
        value
    } else if is_numeric(&value) {
        Expr::call(Expr::ident("String"), vec![value])
    } else {
        Expr::helper(Helper::Str, vec![value])
    }
}

fn is_sequence_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Array(_) | Expr::Str(_))
}

fn is_negative_literal(expr: &Expr) -> bool {
    matches!(expr, Expr::Unary { op: UnaryOp::Neg, operand } if matches!(**operand, Expr::Number(_)))
}

fn property_key(key: Expr) -> PropKey {
    match key {
        Expr::Str(name) => PropKey::Static(name),
        Expr::Number(text) => PropKey::Static(text),
        other => PropKey::Computed(other),
    }
}

fn push_literal(parts: &mut Vec<Expr>, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(Expr::Str(previous)) = parts.last_mut() {
        previous.push_str(&text);
    } else {
        parts.push(Expr::Str(text));
    }
}

fn format_value(value: Expr, spec: Option<&str>, line: usize) -> AdapterResult<Expr> {
    let text = to_text;
    let Some(spec) = spec.filter(|s| !s.is_empty()) else {
        return Ok(text(value));
    };
    let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if let Some(precision) = spec.strip_prefix('.').and_then(|s| s.strip_suffix('f')) {
        if digits(precision) {
            return Ok(Expr::method(value, "toFixed", vec![Expr::Number(precision.to_string())]));
        }
    }
    if matches!(spec, "d" | "s") {
        return Ok(text(value));
    }
    let width = spec.trim_end_matches(['d', 's']);
    if let Some(zero_padded) = width.strip_prefix('0').filter(|w| digits(w)) {
        return Ok(Expr::method(
            text(value),
            "padStart",
            vec![Expr::Number(zero_padded.to_string()), Expr::string("0")],
        ));
    }
    for (align, method) in [('>', "padStart"), ('<', "padEnd")] {
        if let Some(width) = width.strip_prefix(align).filter(|w| digits(w)) {
            return Ok(Expr::method(text(value), method, vec![Expr::Number(width.to_string())]));
        }
    }
    Err(AdapterError::unsupported(line, format!("format specification ':{spec}'")))
}

fn pattern_param(target: &Expr, line: usize) -> AdapterResult<String> {
    match target {
        Expr::Ident(name) => Ok(js_identifier(name)),
        Expr::Array(items) => {
            let names = items
                .iter()
                .map(|item| pattern_param(item, line))
                .collect::<AdapterResult<Vec<_>>>()?;
            Ok(format!("[{}]", names.join(", ")))
        }
        _ => Err(AdapterError::syntax(line, "invalid comprehension target")),
    }
}

fn build_comprehension(mut clauses: Vec<Clause>, element: Expr, line: usize) -> AdapterResult<Expr> {
    if clauses.is_empty() {
        return Err(AdapterError::syntax(line, "comprehension without a for clause"));
    }
    let Clause {
        target,
        iterable,
        conditions,
    } = clauses.remove(0);
    let param = pattern_param(&target, line)?;
    let arrow = |body: Expr| Expr::Arrow {
        params: vec![param.clone()],
        body: Box::new(body),
    };

    let mut source = array_from(iterable);
    if let Some(test) = conditions
        .into_iter()
        .reduce(|acc, c| Expr::binary(BinaryOp::And, acc, c))
    {
        source = Expr::method(source, "filter", vec![arrow(test)]);
    }
    if clauses.is_empty() {
        Ok(Expr::method(source, "map", vec![arrow(element)]))
    } else {
        let inner = build_comprehension(clauses, element, line)?;
        Ok(Expr::method(source, "flatMap", vec![arrow(inner)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::emit::emit_program;

    fn js(source: &str) -> String {
        emit_program(&parse(source).unwrap())
    }

    #[test]
    fn test_simple_function() {
        let out = js("def inc(a):\n    return a + 1\n");
        assert_eq!(out, "function inc(a) {\n  return a + 1;\n}\n");
    }

    #[test]
    fn test_locals_are_hoisted_once() {
        let out = js("def f(n):\n    total = 0\n    for i in range(n):\n        total += i\n    return total\n");
        assert!(out.contains("let total, i;"));
        assert!(out.contains("for (i of __judge_range(n)) {"));
        assert!(out.contains("total = __judge_iadd(total, i);"));
    }

    #[test]
    fn test_global_names_are_not_local() {
        let out = js("count = 0\ndef bump():\n    global count\n    count += 1\n    return count\n");
        assert!(out.starts_with("let count;\ncount = 0;"));
        assert!(!out.contains("  let count"));
    }

    #[test]
    fn test_floor_division_and_modulo() {
        let out = js("def f(a, b):\n    return a // b, a % b\n");
        assert!(out.contains("return [Math.floor(a / b), __judge_mod(a, b)];"));
    }

    #[test]
    fn test_chained_comparison() {
        let out = js("def f(x):\n    return 0 < x < 10\n");
        assert!(out.contains("return 0 < x && x < 10;"));
    }

    #[test]
    fn test_truthiness_of_collections() {
        let out = js("def f(stack):\n    while stack:\n        stack.pop()\n    return not stack\n");
        assert!(out.contains("while (__judge_truthy(stack)) {"));
        assert!(out.contains("return !__judge_truthy(stack);"));
    }

    #[test]
    fn test_comprehension_with_filter() {
        let out = js("def evens(xs):\n    return [x * 2 for x in xs if x % 2 == 0]\n");
        assert!(out.contains(
            "return Array.from(__judge_iter(xs)).filter((x) => __judge_mod(x, 2) === 0).map((x) => __judge_mul(x, 2));"
        ));
    }

    #[test]
    fn test_list_repetition_and_negative_index() {
        let out = js("def f(n, xs):\n    dp = [0] * (n + 1)\n    dp[-1] = xs[-1]\n    return dp\n");
        assert!(out.contains("dp = __judge_repeat([0], n + 1);"));
        assert!(out.contains("dp[dp.length - 1] = xs.at(-1);"));
    }

    #[test]
    fn test_tuple_swap() {
        let out = js("def f(a, b):\n    a, b = b, a\n    return a\n");
        assert!(out.contains("[a, b] = [b, a];"));
    }

    #[test]
    fn test_fstring() {
        let out = js("def f(name, x):\n    return f\"{name}: {x:.2f}\"\n");
        assert!(out.contains("return __judge_str(name) + \": \" + x.toFixed(2);"));
    }

    #[test]
    fn test_dict_methods() {
        let out = js("def f(d):\n    for k, v in d.items():\n        d[k] = d.get(k, 0) + v\n    return d\n");
        assert!(out.contains("for ([k, v] of Object.entries(d)) {"));
        assert!(out.contains("d[k] = __judge_add(__judge_get(d, k, 0), v);"));
    }

    #[test]
    fn test_main_guard_never_runs() {
        let out = js("def f():\n    return 1\nif __name__ == \"__main__\":\n    print(f())\n");
        assert!(out.contains("if (\"__solution__\" === \"__main__\") {"));
    }

    #[test]
    fn test_typing_imports_and_annotations_are_dropped() {
        let out = js("from typing import List\n\ndef total(xs: List[int]) -> int:\n    acc: int = 0\n    return acc\n");
        assert!(out.contains("function total(xs) {"));
        assert!(out.contains("acc = 0;"));
    }

    #[test]
    fn test_math_module() {
        let out = js("import math\ndef f(x):\n    return math.sqrt(x) + math.pi\n");
        assert!(out.contains("return Math.sqrt(x) + Math.PI;"));
    }

    #[test]
    fn test_default_parameters() {
        let out = js("def f(a, b=2):\n    return a * b\n");
        assert!(out.contains("if (b === undefined) {\n    b = 2;\n  }"));
    }

    #[test]
    fn test_raise_keeps_exception_name() {
        let out = js("def f(x):\n    if x < 0:\n        raise ValueError(\"negative\")\n    return x\n");
        assert!(out.contains(
            "throw Object.assign(new Error(\"negative\"), { name: \"ValueError\" });"
        ));
    }

    #[test]
    fn test_builtin_as_value() {
        let out = js("def f(xs):\n    return list(map(int, xs))\n");
        assert!(out.contains("(__value) => Math.trunc(Number(__value))"));
    }

    #[test]
    fn test_unsupported_constructs_are_rejected() {
        let err = parse("class Solution:\n    pass\n").unwrap_err();
        assert_eq!(err, AdapterError::unsupported(1, "class definition"));

        let err = parse("def f():\n    try:\n        pass\n    except:\n        pass\n").unwrap_err();
        assert_eq!(err, AdapterError::unsupported(2, "exception handling"));

        let err = parse("import numpy as np\n").unwrap_err();
        assert_eq!(err, AdapterError::unsupported(1, "import of module 'numpy'"));
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = parse("def f(x):\n    return (x +\n").unwrap_err();
        assert!(matches!(err, AdapterError::Syntax { .. }));

        let err = parse("def f(x)\n    return x\n").unwrap_err();
        assert!(matches!(err, AdapterError::Syntax { line: 1, .. }));
    }

    #[test]
    fn test_nested_function_is_not_a_local() {
        let out = js("def outer(n):\n    def inner(k):\n        return k + 1\n    result = inner(n)\n    return result\n");
        assert!(out.contains("  let result;\n  function inner(k) {"));
    }

    #[test]
    fn test_container_comparisons_are_structural() {
        let out = js("def f(a, b):\n    return a == b, a != b, sorted(a) == [1, 2], a < b\n");
        assert!(out.contains("__judge_eq(a, b)"));
        assert!(out.contains("!__judge_eq(a, b)"));
        assert!(out.contains("__judge_eq(__judge_sorted(a), [1, 2])"));
        assert!(out.contains("__judge_cmp(a, b) < 0"));
        assert!(out.contains("function __judge_eq("));
        assert!(out.contains("function __judge_cmp("));

        let out = js("def f(x):\n    return x == 3 or x is None\n");
        assert!(out.contains("x === 3 || x === null"));
        assert!(!out.contains("__judge_eq"));
    }

    #[test]
    fn test_operators_dispatch_on_unknown_operands() {
        let out = js("def f(a, b, n):\n    return a + b, a * n, \"ab\" * n, n * 2.5 * 2\n");
        assert!(out.contains("__judge_add(a, b)"));
        assert!(out.contains("__judge_mul(a, n)"));
        assert!(out.contains("__judge_repeat(\"ab\", n)"));
        assert!(out.contains("function __judge_repeat("));

        let out = js("def f(xs, ys):\n    xs += ys\n    return xs\n");
        assert!(out.contains("xs = __judge_iadd(xs, ys);"));
        assert!(out.contains("function __judge_add("));
    }

    #[test]
    fn test_set_operators() {
        let out = js("def f(a, b):\n    a |= b\n    return a - b, a & b, a ^ b, 6 & 3\n");
        assert!(out.contains("a = __judge_setop(\"|\", a, b);"));
        assert!(out.contains("__judge_setop(\"-\", a, b)"));
        assert!(out.contains("__judge_setop(\"&\", a, b)"));
        assert!(out.contains("__judge_setop(\"^\", a, b)"));
        assert!(out.contains("6 & 3"));
    }

    #[test]
    fn test_str_and_round_follow_python() {
        let out = js("def f(flag, x):\n    return str(flag), str(len(x)), round(2.5), round(x, 2)\n");
        assert!(out.contains("__judge_str(flag)"));
        assert!(out.contains("String(__judge_len(x))"));
        assert!(out.contains("__judge_round(2.5)"));
        assert!(out.contains("__judge_round(x, 2)"));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let source = format!("def f(x):\n    return {}x{}\n", "[".repeat(500), "]".repeat(500));
        let err = parse(&source).unwrap_err();
        assert!(matches!(err, AdapterError::UnsupportedConstruct { line: 2, .. }), "{err:?}");

        let source = format!("def f(x):\n    return {}x\n", "-".repeat(500));
        assert!(matches!(
            parse(&source).unwrap_err(),
            AdapterError::UnsupportedConstruct { .. }
        ));

        let source = format!("def f(x):\n    return x{}\n", " + x".repeat(1000));
        assert!(matches!(
            parse(&source).unwrap_err(),
            AdapterError::UnsupportedConstruct { .. }
        ));

        let source = format!("def f(x):\n    return {}\n", "f(".repeat(300) + "x" + &")".repeat(300));
        assert!(parse(&source).is_err());
    }

    #[test]
    fn test_ordinary_nesting_still_parses() {
        let source = format!("def f(x):\n    return {}x{}\n", "(".repeat(40), ")".repeat(40));
        assert!(parse(&source).is_ok());

        let source = format!("def f(x):\n    return x{}\n", " + 1".repeat(100));
        assert!(parse(&source).is_ok());

        let mut source = String::from("def f(x):\n");
        for level in 0..30 {
            source.push_str(&"    ".repeat(level + 1));
            source.push_str("if x:\n");
        }
        source.push_str(&"    ".repeat(31));
        source.push_str("return x\n");
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn test_runtime_name_collision_is_renamed() {
        let out = js("def f(Set):\n    return Set\n");
        assert!(out.contains("function f(Set_) {\n  return Set_;\n}"));
    }
}
