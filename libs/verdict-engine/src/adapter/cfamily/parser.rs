//! Recursive-descent parser for Java and C++.
//!
//! Classes are flattened: fields become top-level bindings and methods
//! become top-level functions. Declared types are tracked in a scope stack
//! so the library mapping in [`super::library`] can pick the right lowering
//! per receiver type.
//!
//! Parsing runs twice over the same tokens. The first pass only learns
//! function signatures and field types, so calls and field reads that
//! precede their declarations are typed in the second pass.

use std::collections::{HashMap, HashSet};

use super::library::{array_from, cast, coerce, copy_value, literal, numeric, repeat_value};
use super::types::{self, Position, SeqKind, Type};
use super::Dialect;
use crate::adapter::ir::{
    AssignOp, BinaryOp, Expr, Function, Helper, Program, Stmt, UnaryOp,
};
use crate::adapter::lexer::{tokenize, LexOptions, Token, TokenKind};
use crate::adapter::Depth;
use crate::error::{AdapterError, AdapterResult};

/// An expression with its static type.
pub(super) type Typed = (Expr, Type);

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "static", "final", "abstract", "synchronized", "native",
    "transient", "strictfp", "inline", "virtual", "explicit", "friend", "extern",
];

/// Java classes whose members are reached statically (`Math.max`).
const JAVA_NAMESPACES: &[&str] = &[
    "Math", "Integer", "Long", "Double", "Float", "Character", "String", "Boolean", "Arrays",
    "Collections", "System", "List", "Set", "Map", "Objects",
];

/// Binary operator table, loosest binding first. Shifts and `>` are
/// resolved separately because `>` is never merged by the lexer.
const LEVELS: &[&[(&str, BinaryOp)]] = &[
    &[("||", BinaryOp::Or)],
    &[("&&", BinaryOp::And)],
    &[("|", BinaryOp::BitOr)],
    &[("^", BinaryOp::BitXor)],
    &[("&", BinaryOp::BitAnd)],
    &[("==", BinaryOp::Eq), ("!=", BinaryOp::NotEq)],
    &[("<=", BinaryOp::Le), (">=", BinaryOp::Ge), ("<", BinaryOp::Lt), (">", BinaryOp::Gt)],
    &[("<<", BinaryOp::Shl)],
    &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
    &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
];
const RELATIONAL: usize = 6;
const SHIFT: usize = 7;

pub fn parse(source: &str, dialect: Dialect) -> AdapterResult<Program> {
    let options = match dialect {
        Dialect::Java => LexOptions::java(),
        Dialect::Cpp => LexOptions::cpp(),
    };
    let tokens = tokenize(source, options)?;

    // Whatever the first pass learned before failing is still useful; the
    // second pass reports the error again with full type information.
    let mut first = Parser::new(tokens.clone(), dialect, None);
    first.file().ok();

    let mut second = Parser::new(tokens, dialect, Some(first.learned));
    let body = second.file()?;
    Ok(Program {
        globals: vec![],
        body,
    })
}

#[derive(Debug, Clone)]
pub(super) struct Signature {
    pub ret: Type,
    pub params: Vec<Type>,
}

#[derive(Debug, Clone, Default)]
pub(super) struct Knowledge {
    functions: HashMap<String, Signature>,
    globals: HashMap<String, Type>,
    classes: HashSet<String>,
}

pub(super) struct ParsedType {
    pub ty: Type,
    pub reference: bool,
    pub constant: bool,
}

struct Param {
    name: String,
    ty: Type,
    reference: bool,
    constant: bool,
}

pub(super) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub(super) dialect: Dialect,
    /// Signatures from the first pass; `None` while running it.
    known: Option<Knowledge>,
    learned: Knowledge,
    defined: HashSet<String>,
    scopes: Vec<HashMap<String, Type>>,
    aliases: HashMap<String, Type>,
    return_type: Type,
    depth: Depth,
}

impl Parser {
    fn new(tokens: Vec<Token>, dialect: Dialect, known: Option<Knowledge>) -> Self {
        Self {
            tokens,
            pos: 0,
            dialect,
            known,
            learned: Knowledge::default(),
            defined: HashSet::new(),
            scopes: vec![HashMap::new()],
            aliases: HashMap::new(),
            return_type: Type::Void,
            depth: Depth::default(),
        }
    }

    // ---- token access ---------------------------------------------------

    pub(super) fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    pub(super) fn peek_at(&self, offset: usize) -> &Token {
        // The lexer always terminates the stream with an end-of-input token.
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + offset).min(last)]
    }

    pub(super) fn line(&self) -> usize {
        self.peek().line
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Current token is the punctuator or word `text`.
    pub(super) fn at(&self, text: &str) -> bool {
        self.at_offset(0, text)
    }

    fn at_offset(&self, offset: usize, text: &str) -> bool {
        let token = self.peek_at(offset);
        matches!(token.kind, TokenKind::Punct | TokenKind::Ident) && token.text == text
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> AdapterResult<()> {
        if self.eat(text) {
            Ok(())
        } else {
            self.syntax(format!("expected '{text}', found {}", self.describe()))
        }
    }

    fn describe(&self) -> String {
        match self.peek().kind {
            TokenKind::Eof => "end of input".to_string(),
            _ => format!("'{}'", self.peek().text),
        }
    }

    fn ident(&mut self) -> AdapterResult<String> {
        if self.peek().kind == TokenKind::Ident {
            Ok(self.advance().text)
        } else {
            self.syntax(format!("expected identifier, found {}", self.describe()))
        }
    }

    pub(super) fn syntax<T>(&self, message: impl Into<String>) -> AdapterResult<T> {
        Err(AdapterError::syntax(self.line(), message))
    }

    pub(super) fn unsupported<T>(&self, construct: impl Into<String>) -> AdapterResult<T> {
        Err(AdapterError::unsupported(self.line(), construct))
    }

    /// Skip a `{ ... }` or `( ... )` group starting at the current token.
    fn skip_balanced(&mut self) -> AdapterResult<()> {
        let mut depth = 0usize;
        loop {
            let token = self.advance();
            match token.text.as_str() {
                _ if token.kind == TokenKind::Eof => {
                    return Err(AdapterError::syntax(token.line, "unbalanced brackets"))
                }
                "{" | "(" | "[" if token.kind == TokenKind::Punct => depth += 1,
                "}" | ")" | "]" if token.kind == TokenKind::Punct => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    fn skip_past(&mut self, text: &str) {
        while self.peek().kind != TokenKind::Eof && !self.eat(text) {
            self.advance();
        }
    }

    /// Shift operators spelled with adjacent `>` tokens: returns the
    /// operator, whether it is the compound-assignment form and how many
    /// tokens it spans.
    fn angle_operator(&self) -> Option<(BinaryOp, bool, usize)> {
        if !self.at(">") {
            return None;
        }
        let joined = |offset: usize, text: &str| {
            self.at_offset(offset, text) && self.peek_at(offset).adjacent
        };
        if joined(1, ">") && joined(2, ">=") {
            Some((BinaryOp::UShr, true, 3))
        } else if joined(1, ">") && joined(2, ">") {
            Some((BinaryOp::UShr, false, 3))
        } else if joined(1, ">=") {
            Some((BinaryOp::Shr, true, 2))
        } else if joined(1, ">") {
            Some((BinaryOp::Shr, false, 2))
        } else {
            None
        }
    }

    // ---- names and scopes -----------------------------------------------

    fn declare(&mut self, name: &str, ty: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), ty);
        }
    }

    pub(super) fn lookup(&self, name: &str) -> Option<Type> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .or_else(|| self.known.as_ref().and_then(|k| k.globals.get(name)))
            .or_else(|| self.learned.globals.get(name))
            .cloned()
    }

    fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().skip(1).any(|scope| scope.contains_key(name))
    }

    pub(super) fn signature(&self, name: &str) -> Option<Signature> {
        self.known
            .as_ref()
            .and_then(|k| k.functions.get(name))
            .or_else(|| self.learned.functions.get(name))
            .cloned()
    }

    pub(super) fn is_class(&self, name: &str) -> bool {
        self.learned.classes.contains(name)
            || self.known.as_ref().is_some_and(|k| k.classes.contains(name))
    }

    /// First pass: unknown names are tolerated.
    pub(super) fn learning(&self) -> bool {
        self.known.is_none()
    }

    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> AdapterResult<T>) -> AdapterResult<T> {
        self.scopes.push(HashMap::new());
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> AdapterResult<T>) -> AdapterResult<T> {
        let mark = self.depth.enter(self.line())?;
        let result = f(self);
        self.depth.restore(mark);
        result
    }

    /// Count one more link of an operator or member chain.
    fn chain(&mut self) -> AdapterResult<()> {
        let line = self.line();
        self.depth.extend(line)
    }

    // ---- top level ------------------------------------------------------

    fn file(&mut self) -> AdapterResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while self.peek().kind != TokenKind::Eof {
            self.top_level(&mut body, None)?;
        }
        Ok(body)
    }

    fn top_level(&mut self, body: &mut Vec<Stmt>, class: Option<&str>) -> AdapterResult<()> {
        if self.eat(";") {
            return Ok(());
        }
        if self.at("package") || self.at("import") {
            self.skip_past(";");
            return Ok(());
        }
        if self.at("using") || self.at("typedef") {
            return self.alias();
        }
        for keyword in ["template", "namespace", "interface", "enum", "record", "union"] {
            if self.at(keyword) {
                return self.unsupported(keyword);
            }
        }
        if matches!(self.peek().text.as_str(), "public" | "private" | "protected")
            && self.at_offset(1, ":")
        {
            self.advance();
            self.advance();
            return Ok(());
        }
        if self.at("static") && self.at_offset(1, "{") {
            return self.unsupported("static initializer");
        }
        self.skip_modifiers()?;
        if self.at("class") || self.at("struct") {
            if class.is_some() {
                return self.unsupported("nested class");
            }
            return self.class(body);
        }
        self.member(body, class)
    }

    fn skip_modifiers(&mut self) -> AdapterResult<()> {
        loop {
            if self.at("@") {
                self.advance();
                self.ident()?;
                if self.at("(") {
                    self.skip_balanced()?;
                }
            } else if MODIFIERS.contains(&self.peek().text.as_str())
                && self.peek().kind == TokenKind::Ident
            {
                self.advance();
            } else {
                return Ok(());
            }
        }
    }

    /// `using namespace std;`, `using Name = Type;`, `typedef Type Name;`
    fn alias(&mut self) -> AdapterResult<()> {
        if self.eat("typedef") {
            let parsed = self.require_type()?;
            let name = self.ident()?;
            self.aliases.insert(name, parsed.ty);
            return self.expect(";");
        }
        self.expect("using")?;
        if self.eat("namespace") {
            self.skip_past(";");
            return Ok(());
        }
        let name = self.ident()?;
        if !self.eat("=") {
            // `using std::vector;`
            self.skip_past(";");
            return Ok(());
        }
        let parsed = self.require_type()?;
        self.aliases.insert(name, parsed.ty);
        self.expect(";")
    }

    fn class(&mut self, body: &mut Vec<Stmt>) -> AdapterResult<()> {
        self.advance();
        let name = self.ident()?;
        self.learned.classes.insert(name.clone());
        if self.at("<") {
            return self.unsupported("generic class");
        }
        if self.at("extends") || self.at("implements") || self.at(":") {
            return self.unsupported("inheritance");
        }
        self.expect("{")?;
        while !self.eat("}") {
            if self.peek().kind == TokenKind::Eof {
                return self.syntax(format!("unterminated class '{name}'"));
            }
            self.top_level(body, Some(&name))?;
        }
        self.eat(";");
        Ok(())
    }

    fn member(&mut self, body: &mut Vec<Stmt>, class: Option<&str>) -> AdapterResult<()> {
        if let Some(class) = class {
            if self.at(class) && self.at_offset(1, "(") {
                return self.unsupported("constructor");
            }
        }
        if self.at("~") {
            return self.unsupported("destructor");
        }
        if self.at("<") {
            return self.unsupported("generic method");
        }
        let line = self.line();
        let Some(parsed) = self.parse_type()? else {
            return self.syntax(format!("expected a declaration, found {}", self.describe()));
        };
        if self.at("operator") {
            return self.unsupported("operator overloading");
        }
        let name = self.ident()?;
        if self.at("(") {
            if let Some(function) = self.function(name, parsed.ty, line)? {
                body.push(Stmt::Function(function));
            }
            return Ok(());
        }
        let bindings = self.declarators(name, &parsed)?;
        self.expect(";")?;
        for (name, _) in &bindings {
            if let Some(ty) = self.lookup(name) {
                self.learned.globals.insert(name.clone(), ty);
            }
        }
        body.push(Stmt::Let(bindings));
        Ok(())
    }

    fn function(&mut self, name: String, ret: Type, line: usize) -> AdapterResult<Option<Function>> {
        self.expect("(")?;
        self.scopes.push(HashMap::new());
        let params = self.params()?;
        loop {
            if self.eat("const") || self.eat("noexcept") || self.eat("override") {
                continue;
            }
            if self.eat("throws") {
                self.ident()?;
                while self.eat(",") {
                    self.ident()?;
                }
                continue;
            }
            break;
        }
        if self.at("=") {
            return self.unsupported("special member function");
        }

        let signature = Signature {
            ret: ret.clone(),
            params: params.iter().map(|p| p.ty.clone()).collect(),
        };
        if self.eat(";") {
            // Prototype; the definition follows later.
            self.scopes.pop();
            self.learned.functions.insert(name, signature);
            return Ok(None);
        }
        if !self.defined.insert(name.clone()) {
            return Err(AdapterError::unsupported(
                line,
                format!("overloaded function '{name}'"),
            ));
        }
        self.learned.functions.insert(name.clone(), signature);

        let previous = std::mem::replace(&mut self.return_type, ret);
        let depth = self.scopes.len();
        let start = self.pos;
        let mut body = match self.block_statements() {
            Ok(body) => body,
            // A driver `main` often reads input; keep the rest of the file usable.
            Err(AdapterError::UnsupportedConstruct { line, construct }) if name == "main" => {
                self.scopes.truncate(depth);
                self.pos = start;
                self.skip_balanced()?;
                vec![Stmt::Throw(Expr::named_error(
                    "UnsupportedConstruct",
                    Expr::string(format!("line {line}: {construct}")),
                ))]
            }
            Err(err) => return Err(err),
        };
        self.return_type = previous;
        self.scopes.truncate(depth - 1);

        let mut prologue = Vec::new();
        for param in &params {
            if param.reference
                && !param.constant
                && !param.ty.is_container()
                && assigns(&body, &param.name)
            {
                return Err(AdapterError::unsupported(
                    line,
                    format!("assignment through reference parameter '{}'", param.name),
                ));
            }
            prologue.extend(self.param_prologue(param));
        }
        prologue.append(&mut body);

        Ok(Some(Function {
            name,
            params: params.into_iter().map(|p| p.name).collect(),
            locals: vec![],
            body: prologue,
        }))
    }

    fn params(&mut self) -> AdapterResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.eat(")") {
            return Ok(params);
        }
        if self.at("void") && self.at_offset(1, ")") {
            self.advance();
            self.advance();
            return Ok(params);
        }
        loop {
            self.skip_modifiers()?;
            let parsed = self.require_type()?;
            let name = self.ident()?;
            let mut ty = parsed.ty;
            while self.eat("[") {
                self.skip_past("]");
                ty = Type::seq(SeqKind::Array, ty);
            }
            if self.at("=") {
                return self.unsupported("default argument");
            }
            self.declare(&name, ty.clone());
            params.push(Param {
                name,
                ty,
                reference: parsed.reference,
                constant: parsed.constant,
            });
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(params)
    }

    /// Conversions applied on entry: maps and sets arrive from test input
    /// as plain objects and arrays, and C++ copies by-value containers.
    fn param_prologue(&self, param: &Param) -> Vec<Stmt> {
        let name = || Expr::ident(&param.name);
        let mut stmts = Vec::new();
        let converted = match &param.ty {
            Type::Map { key, .. } => Some(Expr::helper(
                Helper::ToMap,
                vec![name(), Expr::Bool(key.is_numeric())],
            )),
            Type::Set { .. } => Some(Expr::helper(Helper::ToSet, vec![name()])),
            _ => None,
        };
        if let Some(converted) = converted {
            stmts.push(Stmt::Expr(Expr::assign(AssignOp::Assign, name(), converted)));
        }
        if self.dialect == Dialect::Cpp
            && !param.reference
            && !param.constant
            && param.ty.is_container()
        {
            let copied = copy_value(name(), &param.ty, Dialect::Cpp);
            stmts.push(Stmt::Expr(Expr::assign(AssignOp::Assign, name(), copied)));
        }
        stmts
    }

    // ---- types ----------------------------------------------------------

    fn require_type(&mut self) -> AdapterResult<ParsedType> {
        match self.parse_type()? {
            Some(parsed) => Ok(parsed),
            None => self.syntax(format!("expected a type, found {}", self.describe())),
        }
    }

    /// Parse a type if one starts here; otherwise leave the position alone.
    pub(super) fn parse_type(&mut self) -> AdapterResult<Option<ParsedType>> {
        let start = self.pos;
        let mut constant = false;
        loop {
            if self.at("const") || self.at("final") || self.at("constexpr") {
                constant = true;
                self.advance();
            } else if self.at("static") || self.at("volatile") || self.at("mutable") {
                self.advance();
            } else if self.at("@") {
                self.skip_modifiers()?;
            } else {
                break;
            }
        }
        let Some(mut ty) = self.base_type()? else {
            self.pos = start;
            return Ok(None);
        };
        let mut reference = false;
        loop {
            if self.eat("const") {
                constant = true;
            } else if self.at("[") && self.at_offset(1, "]") {
                self.advance();
                self.advance();
                ty = Type::seq(SeqKind::Array, ty);
            } else if self.at("&") || self.at("&&") {
                self.advance();
                reference = true;
            } else if self.at("*") {
                return self.unsupported("pointer");
            } else if self.at("...") {
                return self.unsupported("variadic parameter");
            } else {
                break;
            }
        }
        Ok(Some(ParsedType {
            ty,
            reference,
            constant,
        }))
    }

    /// A type name with its generic arguments, without array or reference
    /// suffixes.
    pub(super) fn base_type(&mut self) -> AdapterResult<Option<Type>> {
        let start = self.pos;
        if self.dialect == Dialect::Cpp && self.at("std") && self.at_offset(1, "::") {
            self.advance();
            self.advance();
        }
        let token = self.peek().clone();
        if token.kind != TokenKind::Ident || self.lookup(&token.text).is_some() {
            self.pos = start;
            return Ok(None);
        }
        if types::is_primitive(&token.text) {
            let mut words = Vec::new();
            while self.peek().kind == TokenKind::Ident && types::is_primitive(&self.peek().text) {
                words.push(self.advance().text);
            }
            let words: Vec<&str> = words.iter().map(String::as_str).collect();
            return Ok(Some(types::primitive(&words)));
        }
        if let Some(alias) = self.aliases.get(&token.text).cloned() {
            self.advance();
            return Ok(Some(alias));
        }
        let mut name = token.text.clone();
        if self.dialect == Dialect::Java
            && name == "Map"
            && self.at_offset(1, ".")
            && self.at_offset(2, "Entry")
        {
            self.advance();
            self.advance();
            name = "Entry".to_string();
        }
        match types::named(&name, vec![], self.dialect) {
            Ok(Some(_)) => {}
            Ok(None) => {
                let declares = self.peek_at(1).kind == TokenKind::Ident;
                if self.is_class(&name) && declares {
                    return self.unsupported(format!("instances of class '{name}'"));
                }
                self.pos = start;
                return Ok(None);
            }
            Err(construct) => return self.unsupported(construct),
        }
        self.advance();
        let args = if self.at("<") {
            self.type_args()?
        } else {
            vec![]
        };
        match types::named(&name, args, self.dialect) {
            Ok(ty) => Ok(ty),
            Err(construct) => self.unsupported(construct),
        }
    }

    fn type_args(&mut self) -> AdapterResult<Vec<Type>> {
        self.nested(Self::type_arg_list)
    }

    fn type_arg_list(&mut self) -> AdapterResult<Vec<Type>> {
        self.expect("<")?;
        let mut args = Vec::new();
        if self.eat(">") {
            return Ok(args);
        }
        loop {
            if self.eat("?") {
                if self.eat("extends") || self.eat("super") {
                    args.push(self.require_type()?.ty);
                } else {
                    args.push(Type::Unknown);
                }
            } else {
                args.push(self.require_type()?.ty);
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect(">")?;
        Ok(args)
    }

    // ---- statements -----------------------------------------------------

    /// `{ ... }` in the current scope.
    fn block_statements(&mut self) -> AdapterResult<Vec<Stmt>> {
        self.expect("{")?;
        let mut stmts = Vec::new();
        while !self.eat("}") {
            if self.peek().kind == TokenKind::Eof {
                return self.syntax("expected '}', found end of input");
            }
            if let Some(stmt) = self.statement()? {
                stmts.push(stmt);
            }
        }
        Ok(stmts)
    }

    fn block(&mut self) -> AdapterResult<Vec<Stmt>> {
        self.nested(|p| p.scoped(|p| p.block_statements()))
    }

    /// Loop and branch bodies, braced or not.
    fn body(&mut self) -> AdapterResult<Vec<Stmt>> {
        if self.at("{") {
            return self.block();
        }
        self.nested(|p| p.scoped(|p| Ok(p.statement()?.into_iter().collect())))
    }

    fn statement(&mut self) -> AdapterResult<Option<Stmt>> {
        let keyword = if self.peek().kind == TokenKind::Ident {
            self.peek().text.clone()
        } else {
            String::new()
        };
        match keyword.as_str() {
            "if" => return self.if_statement().map(Some),
            "while" => {
                self.advance();
                let cond = self.condition()?;
                let body = self.body()?;
                return Ok(Some(Stmt::While { cond, body }));
            }
            "do" => {
                self.advance();
                let body = self.body()?;
                self.expect("while")?;
                let cond = self.condition()?;
                self.expect(";")?;
                return Ok(Some(Stmt::DoWhile { body, cond }));
            }
            "for" => return self.for_statement().map(Some),
            "return" => {
                self.advance();
                if self.eat(";") {
                    return Ok(Some(Stmt::Return(None)));
                }
                let (value, ty) = self.expression()?;
                self.expect(";")?;
                let local = matches!(&value, Expr::Ident(name) if self.is_local(name));
                let value = coerce(value, &ty, &self.return_type);
                let value = if local {
                    value
                } else {
                    copy_value(value, &ty, self.dialect)
                };
                return Ok(Some(Stmt::Return(Some(value))));
            }
            "break" | "continue" => {
                self.advance();
                self.expect(";")?;
                return Ok(Some(if keyword == "break" {
                    Stmt::Break
                } else {
                    Stmt::Continue
                }));
            }
            "throw" => {
                self.advance();
                let (value, _) = self.expression()?;
                self.expect(";")?;
                return Ok(Some(Stmt::Throw(value)));
            }
            "switch" => return self.unsupported("switch"),
            "try" => return self.unsupported("try/catch"),
            "goto" => return self.unsupported("goto"),
            "class" | "struct" => return self.unsupported("local class"),
            "using" | "typedef" => {
                self.alias()?;
                return Ok(None);
            }
            "cin" => return self.unsupported("input stream"),
            "cout" | "cerr" => return self.output_statement().map(Some),
            "std" if self.at_offset(2, "cout") || self.at_offset(2, "cerr") => {
                self.advance();
                self.advance();
                return self.output_statement().map(Some);
            }
            "std" if self.at_offset(2, "cin") => return self.unsupported("input stream"),
            _ => {}
        }
        if !keyword.is_empty() && self.at_offset(1, ":") {
            return self.unsupported("labeled statement");
        }
        if self.at("{") {
            return Ok(Some(Stmt::Block(self.block()?)));
        }
        if self.eat(";") {
            return Ok(None);
        }
        if let Some(declaration) = self.declaration()? {
            self.expect(";")?;
            return Ok(Some(declaration));
        }
        let (expr, _) = self.expression()?;
        self.expect(";")?;
        Ok(discard_value(expr).map(Stmt::Expr))
    }

    fn condition(&mut self) -> AdapterResult<Expr> {
        self.expect("(")?;
        let (cond, _) = self.expression()?;
        self.expect(")")?;
        Ok(cond)
    }

    fn if_statement(&mut self) -> AdapterResult<Stmt> {
        self.expect("if")?;
        let cond = self.condition()?;
        let then_block = self.body()?;
        let else_block = if self.eat("else") {
            Some(self.body()?)
        } else {
            None
        };
        Ok(Stmt::If {
            cond,
            then_block,
            else_block,
        })
    }

    fn for_statement(&mut self) -> AdapterResult<Stmt> {
        self.expect("for")?;
        self.expect("(")?;
        self.scoped(|p| {
            if p.is_foreach() {
                p.foreach()
            } else {
                p.classic_for()
            }
        })
    }

    /// A `:` at bracket depth zero, outside any `?:`, before the first `;`.
    fn is_foreach(&self) -> bool {
        let mut depth = 0usize;
        let mut pending_ternary = 0usize;
        let mut offset = 0;
        loop {
            let token = self.peek_at(offset);
            if token.kind == TokenKind::Eof {
                return false;
            }
            if token.kind == TokenKind::Punct {
                match token.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" if depth == 0 => return false,
                    ")" | "]" | "}" => depth -= 1,
                    ";" if depth == 0 => return false,
                    "?" if depth == 0 => pending_ternary += 1,
                    ":" if depth == 0 && pending_ternary > 0 => pending_ternary -= 1,
                    ":" if depth == 0 => return true,
                    _ => {}
                }
            }
            offset += 1;
        }
    }

    fn foreach(&mut self) -> AdapterResult<Stmt> {
        let line = self.line();
        let parsed = self.require_type()?;
        let names = if self.eat("[") {
            let mut names = vec![self.ident()?];
            while self.eat(",") {
                names.push(self.ident()?);
            }
            self.expect("]")?;
            names
        } else {
            vec![self.ident()?]
        };
        self.expect(":")?;
        let (iterable, iterable_ty) = self.expression()?;
        self.expect(")")?;

        let item = iterable_ty.item();
        let target = match names.as_slice() {
            [name] => {
                let ty = match parsed.ty {
                    Type::Unknown => item.clone(),
                    ref declared => declared.clone(),
                };
                self.declare(name, ty);
                Expr::ident(name)
            }
            [first, second] => {
                let (a, b) = match &item {
                    Type::Pair(a, b) => ((**a).clone(), (**b).clone()),
                    _ => (Type::Unknown, Type::Unknown),
                };
                self.declare(first, a);
                self.declare(second, b);
                Expr::Array(vec![Expr::ident(first), Expr::ident(second)])
            }
            _ => return self.unsupported("structured binding of more than two names"),
        };
        let iterable = match &iterable_ty {
            Type::Map { ordered: true, .. } | Type::Set { ordered: true, .. } => {
                Expr::helper(Helper::Sorted, vec![iterable])
            }
            _ => iterable,
        };

        let body = self.body()?;
        if let [name] = names.as_slice() {
            if parsed.reference && !parsed.constant && !item.is_container() && assigns(&body, name)
            {
                return Err(AdapterError::unsupported(
                    line,
                    format!("assignment through reference loop variable '{name}'"),
                ));
            }
        }
        Ok(Stmt::ForOf {
            target,
            declare: true,
            iterable,
            body,
        })
    }

    fn classic_for(&mut self) -> AdapterResult<Stmt> {
        let init = if self.eat(";") {
            None
        } else if let Some(declaration) = self.declaration()? {
            self.expect(";")?;
            Some(Box::new(declaration))
        } else {
            let init = self.expression_list()?;
            self.expect(";")?;
            Some(Box::new(Stmt::Expr(init)))
        };
        let cond = if self.at(";") {
            None
        } else {
            Some(self.expression()?.0)
        };
        self.expect(";")?;
        let update = if self.at(")") {
            None
        } else {
            Some(self.expression_list()?)
        };
        self.expect(")")?;
        let body = self.body()?;
        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
        })
    }

    /// Comma-separated expressions, as in loop heads.
    fn expression_list(&mut self) -> AdapterResult<Expr> {
        let mut items = vec![self.expression()?.0];
        while self.eat(",") {
            items.push(self.expression()?.0);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Expr::Sequence(items)
        })
    }

    /// `cout << a << b << endl;` prints one line.
    fn output_statement(&mut self) -> AdapterResult<Stmt> {
        self.advance();
        let mut parts = Vec::new();
        while self.eat("<<") {
            if self.dialect == Dialect::Cpp && self.at("std") && self.at_offset(1, "::") {
                self.advance();
                self.advance();
            }
            if self.eat("endl") {
                parts.push(Expr::string("\n"));
            } else {
                parts.push(self.binary_level(SHIFT + 1)?.0);
            }
        }
        self.expect(";")?;
        if parts.last() == Some(&Expr::string("\n")) {
            parts.pop();
        }
        let text = parts
            .into_iter()
            .fold(Expr::string(""), |acc, part| match (acc, part) {
                (Expr::Str(a), Expr::Str(b)) => Expr::Str(a + &b),
                (acc, part) => Expr::binary(BinaryOp::Add, acc, part),
            });
        Ok(Stmt::Expr(Expr::method(Expr::ident("console"), "log", vec![text])))
    }

    /// A local declaration, without the terminating `;`.
    fn declaration(&mut self) -> AdapterResult<Option<Stmt>> {
        let start = self.pos;
        let Some(parsed) = self.parse_type()? else {
            return Ok(None);
        };
        if parsed.ty == Type::Unknown && self.at("[") {
            return self.structured_binding().map(Some);
        }
        if self.peek().kind != TokenKind::Ident {
            self.pos = start;
            return Ok(None);
        }
        let name = self.ident()?;
        Ok(Some(Stmt::Let(self.declarators(name, &parsed)?)))
    }

    /// `auto [a, b] = pair;`
    fn structured_binding(&mut self) -> AdapterResult<Stmt> {
        self.expect("[")?;
        let mut names = vec![self.ident()?];
        while self.eat(",") {
            names.push(self.ident()?);
        }
        self.expect("]")?;
        self.expect("=")?;
        let (value, ty) = self.expression()?;
        let types = match &ty {
            Type::Pair(a, b) => vec![(**a).clone(), (**b).clone()],
            _ => vec![],
        };
        for (i, name) in names.iter().enumerate() {
            let ty = types.get(i).cloned().unwrap_or(Type::Unknown);
            self.declare(name, ty);
        }
        let pattern = format!("[{}]", names.join(", "));
        Ok(Expr::let_one(pattern, Some(value)))
    }

    /// Declarators after the first name: `a = 1, b[10], c(3, 0)`.
    fn declarators(
        &mut self,
        first: String,
        parsed: &ParsedType,
    ) -> AdapterResult<Vec<(String, Option<Expr>)>> {
        let mut bindings = Vec::new();
        let mut name = first;
        loop {
            let mut dims = Vec::new();
            while self.eat("[") {
                if self.eat("]") {
                    dims.push(None);
                } else {
                    let (size, size_ty) = self.expression()?;
                    self.expect("]")?;
                    dims.push(Some(numeric(size, &size_ty)));
                }
            }
            let mut ty = parsed.ty.clone();
            for _ in &dims {
                ty = Type::seq(SeqKind::Array, ty);
            }

            let init = if self.eat("=") {
                if self.at("{") {
                    self.brace_initializer(&ty, &dims)?
                } else {
                    let (value, value_ty) = self.expression()?;
                    if ty == Type::Unknown {
                        ty = value_ty.clone();
                    }
                    copy_value(coerce(value, &value_ty, &ty), &value_ty, self.dialect)
                }
            } else if !dims.is_empty() {
                self.c_array(&dims, &parsed.ty)?
            } else if self.dialect == Dialect::Cpp && self.at("(") {
                let args = self.call_args()?;
                self.construct(&ty, args)?
            } else if self.dialect == Dialect::Cpp && self.at("{") {
                self.brace_list(&ty)?
            } else {
                ty.default_value(self.dialect)
            };
            self.declare(&name, ty);
            bindings.push((name, Some(init)));
            if !self.eat(",") {
                return Ok(bindings);
            }
            name = self.ident()?;
        }
    }

    /// `= { ... }` initializer; C arrays with a short list are zero-filled.
    fn brace_initializer(&mut self, ty: &Type, dims: &[Option<Expr>]) -> AdapterResult<Expr> {
        let list = self.brace_list(ty)?;
        let Expr::Array(items) = &list else {
            return Ok(list);
        };
        let elem = innermost(ty);
        let zero_fill = dims.first().is_some_and(Option::is_some)
            && (items.is_empty() || (items.len() == 1 && items[0] == elem.fill_value(self.dialect)));
        if zero_fill {
            self.c_array(dims, &elem)
        } else {
            Ok(list)
        }
    }

    /// Fixed-size C array, every element default-initialized.
    fn c_array(&self, dims: &[Option<Expr>], elem: &Type) -> AdapterResult<Expr> {
        let sizes: Option<Vec<Expr>> = dims.iter().cloned().collect();
        match sizes {
            Some(sizes) => Ok(filled_array(&sizes, elem.fill_value(self.dialect))),
            None => self.syntax("array size required"),
        }
    }

    /// `{a, b, c}` shaped by the type it initializes.
    pub(super) fn brace_list(&mut self, ty: &Type) -> AdapterResult<Expr> {
        self.expect("{")?;
        let item_ty = match ty {
            Type::Seq(_, elem) => (**elem).clone(),
            Type::Set { elem, .. } => (**elem).clone(),
            Type::Map { key, value, .. } => Type::Pair(key.clone(), value.clone()),
            _ => Type::Unknown,
        };
        let mut values = Vec::new();
        while !self.at("}") {
            let target = match ty {
                Type::Pair(first, _) if values.is_empty() => (**first).clone(),
                Type::Pair(_, second) => (**second).clone(),
                Type::Seq(..) | Type::Set { .. } | Type::Map { .. } => item_ty.clone(),
                other => other.clone(),
            };
            let value = if self.at("{") {
                self.nested(|p| p.brace_list(&target))?
            } else {
                let (value, value_ty) = self.expression()?;
                coerce(value, &value_ty, &target)
            };
            values.push(value);
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(match ty {
            Type::Map { .. } => Expr::construct("Map", vec![Expr::Array(values)]),
            Type::Set { .. } => Expr::construct("Set", vec![Expr::Array(values)]),
            Type::Seq(..) | Type::Pair(..) | Type::Unknown => Expr::Array(values),
            _ => match values.into_iter().next() {
                Some(value) => value,
                None => ty.default_value(self.dialect),
            },
        })
    }

    // ---- expressions ----------------------------------------------------

    pub(super) fn expression(&mut self) -> AdapterResult<Typed> {
        self.nested(Self::assignment_expression)
    }

    fn assignment_expression(&mut self) -> AdapterResult<Typed> {
        let line = self.line();
        let (target, target_ty) = self.ternary()?;

        let op = if let Some((op, true, width)) = self.angle_operator() {
            for _ in 0..width {
                self.advance();
            }
            Some(Some(op))
        } else {
            let op = match self.peek().text.as_str() {
                _ if self.peek().kind != TokenKind::Punct => None,
                "=" => Some(None),
                "+=" => Some(Some(BinaryOp::Add)),
                "-=" => Some(Some(BinaryOp::Sub)),
                "*=" => Some(Some(BinaryOp::Mul)),
                "/=" => Some(Some(BinaryOp::Div)),
                "%=" => Some(Some(BinaryOp::Mod)),
                "&=" => Some(Some(BinaryOp::BitAnd)),
                "|=" => Some(Some(BinaryOp::BitOr)),
                "^=" => Some(Some(BinaryOp::BitXor)),
                "<<=" => Some(Some(BinaryOp::Shl)),
                _ => None,
            };
            if op.is_some() {
                self.advance();
            }
            op
        };
        let Some(op) = op else {
            return Ok((target, target_ty));
        };

        let value = if self.at("{") {
            (self.brace_list(&target_ty)?, target_ty.clone())
        } else {
            self.expression()?
        };
        self.assignment(line, (target, target_ty), op, value)
    }

    fn ternary(&mut self) -> AdapterResult<Typed> {
        let (cond, cond_ty) = self.binary_level(0)?;
        if !self.eat("?") {
            return Ok((cond, cond_ty));
        }
        let (then, then_ty) = self.expression()?;
        self.expect(":")?;
        let (otherwise, otherwise_ty) = self.expression()?;
        let ty = match (&then_ty, &otherwise_ty) {
            (Type::Unknown, other) => other.clone(),
            (Type::Char, other) if other.is_numeric() && *other != Type::Char => {
                return Ok((
                    Expr::conditional(cond, numeric(then, &then_ty), otherwise),
                    other.clone(),
                ));
            }
            (other, _) => other.clone(),
        };
        Ok((Expr::conditional(cond, then, otherwise), ty))
    }

    fn binary_level(&mut self, level: usize) -> AdapterResult<Typed> {
        if level == LEVELS.len() {
            return self.unary();
        }
        let mut lhs = self.binary_level(level + 1)?;
        loop {
            let line = self.line();
            if level == RELATIONAL && self.at("instanceof") {
                return self.unsupported("instanceof");
            }
            let Some((op, width)) = self.binary_operator(level) else {
                return Ok(lhs);
            };
            for _ in 0..width {
                self.advance();
            }
            self.chain()?;
            let rhs = self.binary_level(level + 1)?;
            lhs = self.binary(line, op, lhs, rhs)?;
        }
    }

    fn binary_operator(&self, level: usize) -> Option<(BinaryOp, usize)> {
        let angle = self.angle_operator();
        if level == SHIFT {
            if self.at("<<") {
                return Some((BinaryOp::Shl, 1));
            }
            return match angle {
                Some((op, false, width)) => Some((op, width)),
                _ => None,
            };
        }
        if self.peek().kind != TokenKind::Punct || (level == RELATIONAL && angle.is_some()) {
            return None;
        }
        LEVELS[level]
            .iter()
            .find(|(text, _)| self.peek().text == *text)
            .map(|(_, op)| (*op, 1))
    }

    fn unary(&mut self) -> AdapterResult<Typed> {
        let line = self.line();
        if self.peek().kind == TokenKind::Punct {
            let op = self.peek().text.clone();
            match op.as_str() {
                "!" => {
                    self.advance();
                    let (operand, _) = self.nested(Self::unary)?;
                    return Ok((Expr::unary(UnaryOp::Not, operand), Type::Bool));
                }
                "-" | "+" | "~" => {
                    self.advance();
                    let (operand, ty) = self.nested(Self::unary)?;
                    let operand = numeric(operand, &ty);
                    let ty = if ty == Type::Char { Type::Int } else { ty };
                    let op = match op.as_str() {
                        "-" => UnaryOp::Neg,
                        "+" => UnaryOp::Plus,
                        _ => UnaryOp::BitNot,
                    };
                    return Ok((Expr::unary(op, operand), ty));
                }
                "++" | "--" => {
                    self.advance();
                    let operand = self.nested(Self::unary)?;
                    return self.update(line, operand, op == "++", true);
                }
                "*" if self.dialect == Dialect::Cpp => {
                    self.advance();
                    let operand = self.nested(Self::unary)?;
                    return self.dereference(operand);
                }
                "&" => return self.unsupported("address-of"),
                "(" => {
                    if let Some(cast) = self.cast()? {
                        return Ok(cast);
                    }
                }
                _ => {}
            }
        }
        if self.at("sizeof") {
            return self.unsupported("sizeof");
        }
        let primary = self.primary()?;
        self.postfix(primary)
    }

    /// `(int) x`, `(char) (c + 1)`, `(String) value`
    fn cast(&mut self) -> AdapterResult<Option<Typed>> {
        let start = self.pos;
        self.advance();
        let word = self.peek().text.clone();
        let castable = types::is_primitive(&word)
            || (self.dialect == Dialect::Java
                && matches!(word.as_str(), "Integer" | "Long" | "Double" | "Character" | "String"));
        if self.peek().kind != TokenKind::Ident || !castable || self.lookup(&word).is_some() {
            self.pos = start;
            return Ok(None);
        }
        let Some(parsed) = self.parse_type()? else {
            self.pos = start;
            return Ok(None);
        };
        if !self.eat(")") {
            self.pos = start;
            return Ok(None);
        }
        let (value, ty) = self.nested(Self::unary)?;
        Ok(Some((cast(value, &ty, &parsed.ty), parsed.ty)))
    }

    fn postfix(&mut self, mut current: Typed) -> AdapterResult<Typed> {
        loop {
            let line = self.line();
            if self.at("[") || self.at(".") || self.at("++") || self.at("--") {
                self.chain()?;
            }
            if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                current = self.subscript(current, index)?;
            } else if self.eat(".") {
                let name = self.ident()?;
                current = if self.at("(") {
                    let args = self.call_args()?;
                    self.method_call(line, current, &name, args)?
                } else {
                    self.field(current, &name)?
                };
            } else if self.at("->") {
                return self.unsupported("pointer member access");
            } else if self.at("::") {
                let Type::Namespace(owner) = &current.1 else {
                    return self.unsupported("method reference");
                };
                let owner = owner.clone();
                self.advance();
                let name = self.ident()?;
                return Ok((Expr::Null, Type::MethodRef(format!("{owner}::{name}"))));
            } else if self.at("++") || self.at("--") {
                let increment = self.advance().text == "++";
                current = self.update(line, current, increment, false)?;
            } else {
                return Ok(current);
            }
        }
    }

    pub(super) fn call_args(&mut self) -> AdapterResult<Vec<Typed>> {
        self.expect("(")?;
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            if self.at("{") {
                let list = self.brace_list(&Type::Unknown)?;
                args.push((list, Type::seq(SeqKind::List, Type::Unknown)));
            } else {
                args.push(self.expression()?);
            }
            if !self.eat(",") {
                break;
            }
        }
        self.expect(")")?;
        Ok(args)
    }

    fn subscript(&self, (object, ty): Typed, (index, index_ty): Typed) -> AdapterResult<Typed> {
        Ok(match &ty {
            Type::Map { key, value, .. } => {
                let key = coerce(index, &index_ty, key);
                let fill = value.fill_value(self.dialect);
                (
                    Expr::helper(Helper::MapEntry, vec![object, key, fill]),
                    (**value).clone(),
                )
            }
            Type::Str | Type::Builder => (
                Expr::method(object, "charAt", vec![numeric(index, &index_ty)]),
                ty.element(),
            ),
            Type::Seq(..) => (Expr::index(object, numeric(index, &index_ty)), ty.element()),
            Type::Unknown => (Expr::index(object, numeric(index, &index_ty)), Type::Unknown),
            _ => return self.syntax("value is not subscriptable"),
        })
    }

    fn dereference(&self, (expr, ty): Typed) -> AdapterResult<Typed> {
        let Type::Iter {
            container,
            position,
        } = &ty
        else {
            return self.unsupported("pointer dereference");
        };
        let item = container.item();
        Ok(match position {
            Position::Element => (expr, item),
            Position::Begin => (Expr::index(expr, Expr::number(0)), item),
            Position::ReverseBegin => (Expr::method(expr, "at", vec![Expr::number(-1)]), item),
            _ => return self.unsupported("dereference of this iterator"),
        })
    }

    fn primary(&mut self) -> AdapterResult<Typed> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number => {
                self.advance();
                let hex = token.text.starts_with("0x") || token.text.starts_with("0X");
                let float = !hex && token.text.contains(&['.', 'e', 'E'][..]);
                let ty = if float { Type::Float } else { Type::Int };
                Ok((Expr::Number(token.text), ty))
            }
            TokenKind::Str => {
                self.advance();
                let mut text = token.text;
                while self.peek().kind == TokenKind::Str {
                    text.push_str(&self.advance().text);
                }
                Ok((Expr::Str(text), Type::Str))
            }
            TokenKind::Char => {
                self.advance();
                Ok((Expr::Str(token.text), Type::Char))
            }
            TokenKind::Ident => self.name_expression(),
            TokenKind::Eof => self.syntax("unexpected end of input"),
            TokenKind::Punct => match token.text.as_str() {
                "(" => {
                    if self.is_lambda_head() {
                        return self.unsupported("lambda");
                    }
                    self.advance();
                    let inner = self.expression()?;
                    self.expect(")")?;
                    Ok(inner)
                }
                "{" => {
                    let list = self.brace_list(&Type::Unknown)?;
                    Ok((list, Type::seq(SeqKind::List, Type::Unknown)))
                }
                "[" => self.unsupported("lambda"),
                other => self.syntax(format!("unexpected '{other}'")),
            },
        }
    }

    /// `(a, b) ->` with the arrow right after the matching parenthesis.
    fn is_lambda_head(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 0;
        loop {
            let token = self.peek_at(offset);
            match token.text.as_str() {
                _ if token.kind == TokenKind::Eof => return false,
                "(" if token.kind == TokenKind::Punct => depth += 1,
                ")" if token.kind == TokenKind::Punct => {
                    depth -= 1;
                    if depth == 0 {
                        return self.at_offset(offset + 1, "->");
                    }
                }
                _ => {}
            }
            offset += 1;
        }
    }

    fn name_expression(&mut self) -> AdapterResult<Typed> {
        let line = self.line();
        let name = self.peek().text.clone();
        match name.as_str() {
            "true" | "false" => {
                self.advance();
                return Ok((Expr::Bool(name == "true"), Type::Bool));
            }
            "null" | "nullptr" | "NULL" => {
                self.advance();
                return Ok((Expr::Null, Type::Unknown));
            }
            "this" if self.dialect == Dialect::Java => {
                self.advance();
                return Ok((Expr::Null, Type::Namespace("this".to_string())));
            }
            "new" if self.dialect == Dialect::Java => return self.new_expression(),
            "new" | "delete" => return self.unsupported("dynamic allocation"),
            "super" => return self.unsupported("inheritance"),
            "std" if self.at_offset(1, "::") => {
                self.advance();
                self.advance();
                return self.name_expression();
            }
            _ => {}
        }
        if self.dialect == Dialect::Java && self.at_offset(1, "->") {
            return self.unsupported("lambda");
        }
        if self.dialect == Dialect::Cpp {
            if let Some(typed) = self.cpp_name(&name)? {
                return Ok(typed);
            }
        }
        if let Some(ty) = self.lookup(&name) {
            self.advance();
            return Ok((Expr::ident(name), ty));
        }
        if self.at_offset(1, "(") && !self.names_type(&name) {
            self.advance();
            let args = self.call_args()?;
            return self.free_call(line, &name, args);
        }
        if self.dialect == Dialect::Cpp {
            let start = self.pos;
            if let Some(parsed) = self.parse_type()? {
                if self.at("(") {
                    let args = self.call_args()?;
                    let value = self.construct(&parsed.ty, args)?;
                    return Ok((value, parsed.ty));
                }
                if self.at("{") {
                    let value = self.brace_list(&parsed.ty)?;
                    return Ok((value, parsed.ty));
                }
                self.pos = start;
            }
        }
        let namespace = (self.dialect == Dialect::Java && JAVA_NAMESPACES.contains(&name.as_str()))
            || self.is_class(&name);
        if namespace {
            self.advance();
            return Ok((Expr::ident(&name), Type::Namespace(name)));
        }
        if self.learning() {
            self.advance();
            return Ok((Expr::ident(name), Type::Unknown));
        }
        self.syntax(format!("undeclared identifier '{name}'"))
    }

    fn names_type(&self, name: &str) -> bool {
        self.dialect == Dialect::Cpp
            && (types::is_primitive(name)
                || self.aliases.contains_key(name)
                || matches!(types::named(name, vec![], Dialect::Cpp), Ok(Some(_)) | Err(_)))
    }

    /// C++ names with special meaning: limits, comparators and streams.
    fn cpp_name(&mut self, name: &str) -> AdapterResult<Option<Typed>> {
        if self.lookup(name).is_some() {
            return Ok(None);
        }
        let number = literal;
        let typed = match name {
            "cout" | "cerr" | "cin" | "endl" => return self.unsupported("stream expression"),
            "INT_MAX" => (number("2147483647"), Type::Int),
            "INT_MIN" => (number("-2147483648"), Type::Int),
            "UINT_MAX" => (number("4294967295"), Type::Int),
            "LLONG_MAX" | "LONG_MAX" => (number("9223372036854775807"), Type::Int),
            "LLONG_MIN" | "LONG_MIN" => (number("-9223372036854775808"), Type::Int),
            "DBL_MAX" => (Expr::member(Expr::ident("Number"), "MAX_VALUE"), Type::Float),
            "INFINITY" => (Expr::ident("Infinity"), Type::Float),
            "M_PI" => (Expr::member(Expr::ident("Math"), "PI"), Type::Float),
            "string" if self.at_offset(1, "::") && self.at_offset(2, "npos") => {
                self.advance();
                self.advance();
                (number("-1"), Type::Int)
            }
            "greater" | "less" if self.at_offset(1, "<") || self.at_offset(1, "(") => {
                self.advance();
                if self.at("<") {
                    self.type_args()?;
                }
                if self.at("(") {
                    self.call_args()?;
                }
                return Ok(Some((Expr::Null, Type::MethodRef(name.to_string()))));
            }
            "numeric_limits" => return self.numeric_limits().map(Some),
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(typed))
    }

    /// `numeric_limits<int>::max()` and friends.
    fn numeric_limits(&mut self) -> AdapterResult<Typed> {
        self.advance();
        let args = self.type_args()?;
        self.expect("::")?;
        let which = self.ident()?;
        self.call_args()?;
        let ty = args.into_iter().next().unwrap_or(Type::Int);
        let largest = || Expr::member(Expr::ident("Number"), "MAX_VALUE");
        let value = match (&ty, which.as_str()) {
            (Type::Float, "max") => largest(),
            (Type::Float, "min") => Expr::member(Expr::ident("Number"), "MIN_VALUE"),
            (Type::Float, "lowest") => Expr::unary(UnaryOp::Neg, largest()),
            (Type::Float, "infinity") => Expr::ident("Infinity"),
            (_, "max") => literal("2147483647"),
            (_, "min" | "lowest") => literal("-2147483648"),
            _ => return self.unsupported(format!("numeric_limits::{which}")),
        };
        Ok((value, ty))
    }

    /// Java `new`: arrays, collections and exceptions.
    fn new_expression(&mut self) -> AdapterResult<Typed> {
        self.expect("new")?;
        let name = self.peek().text.clone();
        if self.peek().kind == TokenKind::Ident
            && (name.ends_with("Exception") || name.ends_with("Error"))
        {
            self.advance();
            let args = self.call_args()?;
            let message = args
                .into_iter()
                .next()
                .map(|(e, _)| e)
                .unwrap_or_else(|| Expr::string(""));
            return Ok((Expr::named_error(&name, message), Type::Unknown));
        }
        let Some(base) = self.base_type()? else {
            if self.is_class(&name) {
                return self.unsupported(format!("construction of '{name}'"));
            }
            return self.syntax(format!("unknown type '{name}'"));
        };
        if self.at("[") {
            let mut sizes = Vec::new();
            let mut open = 0;
            while self.eat("[") {
                if self.eat("]") {
                    open += 1;
                } else if open > 0 {
                    return self.syntax("array dimension after an unsized one");
                } else {
                    let (size, size_ty) = self.expression()?;
                    self.expect("]")?;
                    sizes.push(numeric(size, &size_ty));
                }
            }
            let mut ty = base.clone();
            for _ in 0..sizes.len() + open {
                ty = Type::seq(SeqKind::Array, ty);
            }
            if sizes.is_empty() {
                let list = self.brace_list(&ty)?;
                return Ok((list, ty));
            }
            let fill = if open > 0 {
                Expr::Null
            } else {
                base.fill_value(self.dialect)
            };
            return Ok((filled_array(&sizes, fill), ty));
        }
        let args = self.call_args()?;
        if self.at("{") {
            return self.unsupported("anonymous class");
        }
        let value = self.construct(&base, args)?;
        Ok((value, base))
    }
}

/// Drop the value of an expression statement where a cheaper statement
/// form exists.
fn discard_value(expr: Expr) -> Option<Expr> {
    match expr {
        Expr::Null => None,
        // `!s.has(x) && (s.add(x), true)` as a statement is just the add.
        Expr::Binary {
            op: BinaryOp::And,
            rhs,
            ..
        } if matches!(&*rhs, Expr::Sequence(items) if items.len() == 2 && items[1] == Expr::Bool(true)) =>
        {
            match *rhs {
                Expr::Sequence(mut items) => Some(items.remove(0)),
                other => Some(other),
            }
        }
        other => Some(other),
    }
}

/// Nested arrays of the given sizes; every element is a fresh `fill`.
pub(super) fn filled_array(sizes: &[Expr], fill: Expr) -> Expr {
    match sizes {
        [] => fill,
        [size] => repeat_value(size.clone(), fill),
        [size, rest @ ..] => array_from(size.clone(), filled_array(rest, fill)),
    }
}

fn innermost(ty: &Type) -> Type {
    match ty {
        Type::Seq(SeqKind::Array, elem) => innermost(elem),
        other => other.clone(),
    }
}

/// Whether any statement assigns to the plain name `name`.
pub(super) fn assigns(stmts: &[Stmt], name: &str) -> bool {
    stmts.iter().any(|stmt| stmt_assigns(stmt, name))
}

fn stmt_assigns(stmt: &Stmt, name: &str) -> bool {
    let expr = |e: &Expr| expr_assigns(e, name);
    match stmt {
        Stmt::Function(_) | Stmt::Return(None) | Stmt::Break | Stmt::Continue => false,
        Stmt::Let(bindings) => bindings.iter().filter_map(|(_, init)| init.as_ref()).any(expr),
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Return(Some(e)) => expr(e),
        Stmt::If {
            cond,
            then_block,
            else_block,
        } => {
            expr(cond)
                || assigns(then_block, name)
                || else_block.as_deref().is_some_and(|b| assigns(b, name))
        }
        Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
            expr(cond) || assigns(body, name)
        }
        Stmt::For {
            init,
            cond,
            update,
            body,
        } => {
            init.as_deref().is_some_and(|s| stmt_assigns(s, name))
                || cond.as_ref().is_some_and(expr)
                || update.as_ref().is_some_and(expr)
                || assigns(body, name)
        }
        Stmt::ForOf {
            target,
            declare,
            iterable,
            body,
        } => (!declare && targets(target, name)) || expr(iterable) || assigns(body, name),
        Stmt::Block(body) => assigns(body, name),
    }
}

fn expr_assigns(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Assign { target, .. } | Expr::Update { target, .. } if targets(target, name) => true,
        _ => expr.children().into_iter().any(|child| expr_assigns(child, name)),
    }
}

fn targets(target: &Expr, name: &str) -> bool {
    match target {
        Expr::Ident(ident) => ident == name,
        Expr::Array(items) => items.iter().any(|item| targets(item, name)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::emit::emit_program;

    fn java(source: &str) -> String {
        emit_program(&parse(source, Dialect::Java).unwrap())
    }

    fn cpp(source: &str) -> String {
        emit_program(&parse(source, Dialect::Cpp).unwrap())
    }

    fn cpp_err(source: &str) -> AdapterError {
        parse(source, Dialect::Cpp).unwrap_err()
    }

    #[test]
    fn test_integer_division_truncates() {
        let code = cpp("int half(int n) { return n / 2; }");
        assert!(code.contains("return Math.trunc(n / 2);"), "{code}");

        let code = cpp("double half(double n) { return n / 2; }");
        assert!(code.contains("return n / 2;"), "{code}");
    }

    #[test]
    fn test_char_arithmetic_uses_codes() {
        let code = java(
            "class S { int value(String s, int i) { char c = s.charAt(i); return c - '0'; } }",
        );
        assert!(code.contains("let c = s.charAt(i);"), "{code}");
        assert!(code.contains("return c.charCodeAt(0) - 48;"), "{code}");
    }

    #[test]
    fn test_char_increment_rebuilds_the_character() {
        let code = cpp("char next(char c) { c++; return c; }");
        assert!(
            code.contains("c = String.fromCharCode(c.charCodeAt(0) + 1);"),
            "{code}"
        );
    }

    #[test]
    fn test_nested_generics_and_shift() {
        let code = cpp(
            "int f(int n) {\n  vector<vector<int>> grid(n, vector<int>(n, 0));\n  return n >> 1;\n}",
        );
        assert!(
            code.contains("let grid = Array.from({ length: n }, () => new Array(n).fill(0));"),
            "{code}"
        );
        assert!(code.contains("return n >> 1;"), "{code}");
    }

    #[test]
    fn test_foreach_over_ordered_map() {
        let code = cpp(
            "int f(map<int, int> m) {\n  int total = 0;\n  for (auto& [k, v] : m) total += k * v;\n  return total;\n}",
        );
        assert!(code.contains("for (let [k, v] of __judge_sorted(m)) {"), "{code}");
        assert!(code.contains("m = __judge_map(m, true);"), "{code}");
    }

    #[test]
    fn test_c_array_declarations() {
        let code = cpp("int f() { int cnt[26] = {0}; int dp[3][4]; int xs[] = {1, 2}; return 0; }");
        assert!(code.contains("let cnt = new Array(26).fill(0);"), "{code}");
        assert!(
            code.contains("let dp = Array.from({ length: 3 }, () => new Array(4).fill(0));"),
            "{code}"
        );
        assert!(code.contains("let xs = [1, 2];"), "{code}");
    }

    #[test]
    fn test_java_fields_become_globals() {
        let code = java(
            "class Counter {\n  private static int count = 0;\n  static int bump() { count++; return count; }\n}",
        );
        assert!(code.contains("let count = 0;"), "{code}");
        assert!(code.contains("count++;"), "{code}");
    }

    #[test]
    fn test_method_called_before_declaration_is_typed() {
        let code = java(
            "class S {\n  int outer(int n) { return inner(n) / 2; }\n  int inner(int n) { return n * 3; }\n}",
        );
        assert!(code.contains("return Math.trunc(inner(n) / 2);"), "{code}");
    }

    #[test]
    fn test_unsupported_constructs_report_lines() {
        assert_eq!(
            cpp_err("int f(int x) {\n  switch (x) { default: return 1; }\n}"),
            AdapterError::unsupported(2, "switch")
        );
        assert_eq!(
            cpp_err("int f(int* p) { return 0; }"),
            AdapterError::unsupported(1, "pointer")
        );
        assert_eq!(
            cpp_err("template <typename T>\nT id(T x) { return x; }"),
            AdapterError::unsupported(1, "template")
        );
        assert!(matches!(
            parse("class S { int f(List<Integer> xs) { return xs.stream().count(); } }", Dialect::Java),
            Err(AdapterError::UnsupportedConstruct { .. })
        ));
    }

    #[test]
    fn test_lambda_is_rejected() {
        let err = parse(
            "class S { void f(List<Integer> xs) { xs.forEach(x -> System.out.println(x)); } }",
            Dialect::Java,
        )
        .unwrap_err();
        assert_eq!(err, AdapterError::unsupported(1, "lambda"));
    }

    #[test]
    fn test_mutated_reference_parameter_is_rejected() {
        let err = cpp_err("void bump(int& x) {\n  x += 1;\n}");
        assert_eq!(
            err,
            AdapterError::unsupported(1, "assignment through reference parameter 'x'")
        );
        // Containers are shared, so mutating through a reference works.
        let code = cpp("void add(vector<int>& v) { v.push_back(1); }");
        assert!(code.contains("v.push(1);"), "{code}");
    }

    #[test]
    fn test_by_value_container_is_copied() {
        let code = cpp("int f(vector<int> v) { v.push_back(1); return v.size(); }");
        assert!(code.contains("v = structuredClone(v);"), "{code}");
    }

    #[test]
    fn test_undeclared_identifier_is_a_syntax_error() {
        let err = cpp_err("int f() {\n  return missing + 1;\n}");
        assert_eq!(err, AdapterError::syntax(2, "undeclared identifier 'missing'"));
    }

    #[test]
    fn test_main_with_input_is_replaced() {
        let code = cpp(
            "int twice(int x) { return 2 * x; }\nint main() {\n  int n;\n  cin >> n;\n  return 0;\n}",
        );
        assert!(code.contains("function twice(x) {"), "{code}");
        assert!(code.contains("line 4: input stream"), "{code}");
    }

    #[test]
    fn test_overloads_are_rejected() {
        let err = cpp_err("int f(int a) { return a; }\nint f(int a, int b) { return a + b; }");
        assert_eq!(err, AdapterError::unsupported(2, "overloaded function 'f'"));
    }

    #[test]
    fn test_prototype_then_definition() {
        let code = cpp("int g(int x);\nint f(int x) { return g(x) / 2; }\nint g(int x) { return x; }");
        assert!(code.contains("return Math.trunc(g(x) / 2);"), "{code}");
        assert_eq!(code.matches("function g(").count(), 1);
    }

    #[test]
    fn test_cpp_containers_compare_by_contents() {
        let code = cpp(
            "bool f(vector<int> a, vector<int> b, int x) { return a == b || a != b || a < b || x == 1; }",
        );
        assert!(code.contains("__judge_eq(a, b)"), "{code}");
        assert!(code.contains("!__judge_eq(a, b)"), "{code}");
        assert!(code.contains("__judge_cmp(a, b) < 0"), "{code}");
        assert!(code.contains("x === 1"), "{code}");
        assert!(code.contains("function __judge_eq("), "{code}");

        let code = cpp("bool f(pair<int, int> p) { return p == make_pair(1, 2); }");
        assert!(code.contains("__judge_eq(p, "), "{code}");

        let err = cpp_err("bool f(set<int> a, set<int> b) {\n  return a < b;\n}");
        assert_eq!(err, AdapterError::unsupported(2, "ordering of maps or sets"));
    }

    #[test]
    fn test_java_equals_is_structural() {
        let code = java(
            "class S { boolean f(int[] a, List<Integer> b, List<Integer> c) { return Arrays.equals(a, a) && b.equals(c); } }",
        );
        assert!(code.contains("__judge_eq(a, a) && __judge_eq(b, c)"), "{code}");
        assert!(!code.contains("JSON.stringify"), "{code}");
    }

    #[test]
    fn test_deque_front_and_back() {
        let code = cpp("int f(deque<int> d) { d.push_front(1); return d.front() * 10 + d.back(); }");
        assert!(code.contains("d.unshift(1);"), "{code}");
        assert!(code.contains("d[0] * 10 + d[d.length - 1]"), "{code}");
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let source = format!("int f(int x) {{ return {}x; }}", "-".repeat(1_000));
        assert!(matches!(cpp_err(&source), AdapterError::UnsupportedConstruct { .. }));

        let source = format!("int f(int x) {{ {} return x; {} }}", "{".repeat(1_000), "}".repeat(1_000));
        assert!(matches!(cpp_err(&source), AdapterError::UnsupportedConstruct { .. }));

        let source = format!("int f(int x) {{\n  return x{};\n}}", " + x".repeat(1_000));
        assert!(matches!(
            cpp_err(&source),
            AdapterError::UnsupportedConstruct { line: 2, .. }
        ));

        let source = format!("int f(vector<int> v) {{ return v{}; }}", "[0]".repeat(1_000));
        assert!(parse(&source, Dialect::Cpp).is_err());

        let source = format!("int f() {{ {}vector<int>{} v; return 0; }}", "vector<".repeat(300), ">".repeat(300));
        assert!(parse(&source, Dialect::Cpp).is_err());
    }

    #[test]
    fn test_ordinary_nesting_still_parses() {
        let source = format!("int f(int x) {{ return {}x{}; }}", "(".repeat(40), ")".repeat(40));
        assert!(cpp(&source).contains("return x;"));

        let source = format!("int f(int x) {{ return x{}; }}", " + 1".repeat(100));
        cpp(&source);
    }

    #[test]
    fn test_assigns_walks_nested_blocks() {
        let body = vec![Stmt::If {
            cond: Expr::Bool(true),
            then_block: vec![Stmt::Expr(Expr::Update {
                increment: true,
                prefix: false,
                target: Box::new(Expr::ident("x")),
            })],
            else_block: None,
        }];
        assert!(assigns(&body, "x"));
        assert!(!assigns(&body, "y"));
    }
}
