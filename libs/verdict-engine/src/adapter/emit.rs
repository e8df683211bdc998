//! Serializes the common IR into JavaScript source.
//!
//! Parentheses are inserted from operator precedence, so the output reads
//! like hand-written code instead of a fully bracketed dump.

use std::collections::BTreeSet;

use super::ir::{AssignOp, BinaryOp, Expr, Function, Helper, Program, PropKey, Stmt, UnaryOp};

const INDENT: &str = "  ";

const RESERVED: &[&str] = &[
    "arguments", "await", "case", "catch", "class", "const", "debugger", "default", "delete", "do",
    "enum", "eval", "export", "extends", "finally", "function", "implements", "import",
    "in", "instanceof", "interface", "let", "new", "package", "private", "protected", "public",
    "static", "super", "switch", "this", "throw", "try", "typeof", "var", "void", "with", "yield",
];

/// Rename identifiers that collide with JavaScript reserved words.
pub fn js_identifier(name: &str) -> String {
    if RESERVED.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Render a whole program, helper definitions first.
pub fn emit_program(program: &Program) -> String {
    let mut emitter = Emitter::default();
    if !program.globals.is_empty() {
        let names: Vec<String> = program.globals.iter().map(|n| js_identifier(n)).collect();
        emitter.line(0, &format!("let {};", names.join(", ")));
    }
    emitter.block(&program.body, 0);

    let mut out = String::new();
    for helper in &emitter.helpers {
        out.push_str(helper_source(*helper));
        out.push('\n');
    }
    if !emitter.helpers.is_empty() {
        out.push('\n');
    }
    out.push_str(&emitter.out);
    out
}

/// Render a single expression, returning it with the helpers it needs.
pub fn emit_expression(expr: &Expr) -> (String, BTreeSet<Helper>) {
    let mut emitter = Emitter::default();
    let text = emitter.expr(expr, 0);
    (text, emitter.helpers)
}

#[derive(Default)]
struct Emitter {
    out: String,
    helpers: BTreeSet<Helper>,
}

impl Emitter {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn block(&mut self, stmts: &[Stmt], depth: usize) {
        for stmt in stmts {
            self.stmt(stmt, depth);
        }
    }

    fn function(&mut self, function: &Function, depth: usize) {
        let params: Vec<String> = function.params.iter().map(|p| js_identifier(p)).collect();
        self.line(
            depth,
            &format!(
                "function {}({}) {{",
                js_identifier(&function.name),
                params.join(", ")
            ),
        );
        if !function.locals.is_empty() {
            let locals: Vec<String> = function.locals.iter().map(|l| js_identifier(l)).collect();
            self.line(depth + 1, &format!("let {};", locals.join(", ")));
        }
        self.block(&function.body, depth + 1);
        self.line(depth, "}");
    }

    fn stmt(&mut self, stmt: &Stmt, depth: usize) {
        match stmt {
            Stmt::Function(function) => self.function(function, depth),
            Stmt::Let(_) | Stmt::Expr(_) => {
                let text = self.simple_stmt(stmt);
                self.line(depth, &format!("{text};"));
            }
            Stmt::If { .. } => self.if_chain(stmt, depth, false),
            Stmt::While { cond, body } => {
                let cond = self.expr(cond, 0);
                self.line(depth, &format!("while ({cond}) {{"));
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Stmt::DoWhile { body, cond } => {
                self.line(depth, "do {");
                self.block(body, depth + 1);
                let cond = self.expr(cond, 0);
                self.line(depth, &format!("}} while ({cond});"));
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                let init = init
                    .as_deref()
                    .map(|s| self.simple_stmt(s))
                    .unwrap_or_default();
                let cond = cond.as_ref().map(|c| self.expr(c, 0)).unwrap_or_default();
                let update = update.as_ref().map(|u| self.expr(u, 0)).unwrap_or_default();
                self.line(depth, &format!("for ({init}; {cond}; {update}) {{"));
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Stmt::ForOf {
                target,
                declare,
                iterable,
                body,
            } => {
                let target = self.expr(target, 16);
                let iterable = self.expr(iterable, 2);
                let binding = if *declare { "let " } else { "" };
                self.line(depth, &format!("for ({binding}{target} of {iterable}) {{"));
                self.block(body, depth + 1);
                self.line(depth, "}");
            }
            Stmt::Return(None) => self.line(depth, "return;"),
            Stmt::Return(Some(value)) => {
                let value = self.expr(value, 0);
                self.line(depth, &format!("return {value};"));
            }
            Stmt::Throw(value) => {
                let value = self.expr(value, 0);
                self.line(depth, &format!("throw {value};"));
            }
            Stmt::Break => self.line(depth, "break;"),
            Stmt::Continue => self.line(depth, "continue;"),
            Stmt::Block(stmts) => {
                self.line(depth, "{");
                self.block(stmts, depth + 1);
                self.line(depth, "}");
            }
        }
    }

    /// `let` declarations and expression statements, without the semicolon.
    fn simple_stmt(&mut self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Let(bindings) => {
                let bindings: Vec<String> = bindings
                    .iter()
                    .map(|(name, init)| match init {
                        Some(init) => format!("{} = {}", js_identifier(name), self.expr(init, 2)),
                        None => js_identifier(name),
                    })
                    .collect();
                format!("let {}", bindings.join(", "))
            }
            Stmt::Expr(expr) => {
                let text = self.expr(expr, 0);
                if text.starts_with('{') || text.starts_with("function") {
                    format!("({text})")
                } else {
                    text
                }
            }
            other => {
                // Only declarations and expressions appear in loop heads.
                let mut nested = Emitter::default();
                nested.stmt(other, 0);
                self.helpers.extend(nested.helpers);
                nested.out.trim_end().trim_end_matches(';').to_string()
            }
        }
    }

    fn if_chain(&mut self, stmt: &Stmt, depth: usize, continued: bool) {
        let Stmt::If {
            cond,
            then_block,
            else_block,
        } = stmt
        else {
            return;
        };
        let cond = self.expr(cond, 0);
        if continued {
            self.line(depth, &format!("}} else if ({cond}) {{"));
        } else {
            self.line(depth, &format!("if ({cond}) {{"));
        }
        self.block(then_block, depth + 1);
        match else_block.as_deref() {
            None => self.line(depth, "}"),
            Some([nested @ Stmt::If { .. }]) => self.if_chain(nested, depth, true),
            Some(stmts) => {
                self.line(depth, "} else {");
                self.block(stmts, depth + 1);
                self.line(depth, "}");
            }
        }
    }

    fn expr(&mut self, expr: &Expr, min_prec: u8) -> String {
        let text = match expr {
            Expr::Null => "null".to_string(),
            Expr::Bool(b) => b.to_string(),
            Expr::Number(n) => n.clone(),
            Expr::Str(s) => string_literal(s),
            Expr::Ident(name) => js_identifier(name),
            Expr::Array(items) => {
                let items: Vec<String> = items.iter().map(|i| self.expr(i, 2)).collect();
                format!("[{}]", items.join(", "))
            }
            Expr::Object(props) => {
                if props.is_empty() {
                    "{}".to_string()
                } else {
                    let props: Vec<String> = props
                        .iter()
                        .map(|(key, value)| {
                            let key = match key {
                                PropKey::Static(name) if is_identifier(name) => name.clone(),
                                PropKey::Static(name) => string_literal(name),
                                PropKey::Computed(key) => format!("[{}]", self.expr(key, 2)),
                            };
                            format!("{key}: {}", self.expr(value, 2))
                        })
                        .collect();
                    format!("{{ {} }}", props.join(", "))
                }
            }
            Expr::Unary { op, operand } => {
                let inner = match **operand {
                    Expr::Unary { .. } | Expr::Update { .. } => {
                        format!("({})", self.expr(operand, 0))
                    }
                    _ => self.expr(operand, 15),
                };
                format!("{}{inner}", unary_symbol(*op))
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = binary_precedence(*op);
                let (lhs_min, rhs_min) = if *op == BinaryOp::Pow {
                    (prec + 2, prec)
                } else {
                    (prec, prec + 1)
                };
                let lhs = self.expr(lhs, lhs_min);
                let rhs = self.expr(rhs, rhs_min);
                format!("{lhs} {} {rhs}", binary_symbol(*op))
            }
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.expr(cond, 4);
                let then = self.expr(then, 2);
                let otherwise = self.expr(otherwise, 2);
                format!("{cond} ? {then} : {otherwise}")
            }
            Expr::Assign { op, target, value } => {
                let target = self.expr(target, 16);
                let value = self.expr(value, 2);
                format!("{target} {} {value}", assign_symbol(*op))
            }
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let symbol = if *increment { "++" } else { "--" };
                let target = self.expr(target, 16);
                if *prefix {
                    format!("{symbol}{target}")
                } else {
                    format!("{target}{symbol}")
                }
            }
            Expr::Call { callee, args } => {
                let callee = self.expr(callee, 18);
                let args = self.args(args);
                format!("{callee}({args})")
            }
            Expr::New { callee, args } => {
                let callee = self.expr(callee, 18);
                let args = self.args(args);
                format!("new {callee}({args})")
            }
            Expr::Member { object, property } => {
                let object_text = self.expr(object, 18);
                if matches!(**object, Expr::Number(_)) {
                    format!("({object_text}).{property}")
                } else {
                    format!("{object_text}.{property}")
                }
            }
            Expr::Index { object, index } => {
                let object = self.expr(object, 18);
                let index = self.expr(index, 0);
                format!("{object}[{index}]")
            }
            Expr::Arrow { params, body } => {
                let params: Vec<String> = params.iter().map(|p| js_identifier(p)).collect();
                let body = match **body {
                    Expr::Object(_) => format!("({})", self.expr(body, 0)),
                    _ => self.expr(body, 2),
                };
                format!("({}) => {body}", params.join(", "))
            }
            Expr::Spread(inner) => format!("...{}", self.expr(inner, 2)),
            Expr::Sequence(items) => {
                let items: Vec<String> = items.iter().map(|i| self.expr(i, 2)).collect();
                items.join(", ")
            }
            Expr::Helper { helper, args } => {
                self.require(*helper);
                let args = self.args(args);
                format!("{}({args})", helper_name(*helper))
            }
        };
        if precedence(expr) < min_prec {
            format!("({text})")
        } else {
            text
        }
    }

    fn require(&mut self, helper: Helper) {
        if self.helpers.insert(helper) {
            for dependency in helper.requires() {
                self.require(*dependency);
            }
        }
    }

    fn args(&mut self, args: &[Expr]) -> String {
        let args: Vec<String> = args.iter().map(|a| self.expr(a, 2)).collect();
        args.join(", ")
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence(_) => 1,
        Expr::Arrow { .. } | Expr::Assign { .. } | Expr::Spread(_) => 2,
        Expr::Conditional { .. } => 3,
        Expr::Binary { op, .. } => binary_precedence(*op),
        Expr::Unary { .. } => 15,
        Expr::Update { prefix: true, .. } => 15,
        Expr::Update { prefix: false, .. } => 16,
        Expr::Call { .. }
        | Expr::New { .. }
        | Expr::Member { .. }
        | Expr::Index { .. }
        | Expr::Helper { .. } => 18,
        _ => 20,
    }
}

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 4,
        BinaryOp::And => 5,
        BinaryOp::BitOr => 6,
        BinaryOp::BitXor => 7,
        BinaryOp::BitAnd => 8,
        BinaryOp::Eq | BinaryOp::NotEq => 9,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 10,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 11,
        BinaryOp::Add | BinaryOp::Sub => 12,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 13,
        BinaryOp::Pow => 14,
    }
}

fn binary_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Pow => "**",
        BinaryOp::Eq => "===",
        BinaryOp::NotEq => "!==",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",
        BinaryOp::Shl => "<<",
        BinaryOp::Shr => ">>",
        BinaryOp::UShr => ">>>",
    }
}

fn unary_symbol(op: UnaryOp) -> &'static str {
    match op {
        UnaryOp::Not => "!",
        UnaryOp::Neg => "-",
        UnaryOp::Plus => "+",
        UnaryOp::BitNot => "~",
    }
}

fn assign_symbol(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Assign => "=",
        AssignOp::Add => "+=",
        AssignOp::Sub => "-=",
        AssignOp::Mul => "*=",
        AssignOp::Div => "/=",
        AssignOp::Mod => "%=",
        AssignOp::Pow => "**=",
        AssignOp::BitAnd => "&=",
        AssignOp::BitOr => "|=",
        AssignOp::BitXor => "^=",
        AssignOp::Shl => "<<=",
        AssignOp::Shr => ">>=",
    }
}

pub(crate) fn string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

fn helper_name(helper: Helper) -> &'static str {
    match helper {
        Helper::Range => "__judge_range",
        Helper::FloorMod => "__judge_mod",
        Helper::Contains => "__judge_contains",
        Helper::Sorted => "__judge_sorted",
        Helper::SortInPlace => "__judge_sort",
        Helper::GetOr => "__judge_get",
        Helper::SplitWhitespace => "__judge_split",
        Helper::Zip => "__judge_zip",
        Helper::Sum => "__judge_sum",
        Helper::MapEntry => "__judge_entry",
        Helper::IsDigit => "__judge_isdigit",
        Helper::IsLetter => "__judge_isalpha",
        Helper::IsAlphanumeric => "__judge_isalnum",
        Helper::Iter => "__judge_iter",
        Helper::Len => "__judge_len",
        Helper::Count => "__judge_count",
        Helper::Remove => "__judge_remove",
        Helper::Repeat => "__judge_repeat",
        Helper::Slice => "__judge_slice",
        Helper::Truthy => "__judge_truthy",
        Helper::ToMap => "__judge_map",
        Helper::ToSet => "__judge_set",
        Helper::Equal => "__judge_eq",
        Helper::Compare => "__judge_cmp",
        Helper::Add => "__judge_add",
        Helper::InPlaceAdd => "__judge_iadd",
        Helper::Multiply => "__judge_mul",
        Helper::SetOp => "__judge_setop",
        Helper::Str => "__judge_str",
        Helper::Round => "__judge_round",
    }
}

fn helper_source(helper: Helper) -> &'static str {
    match helper {
        Helper::Range => {
            r#"function* __judge_range(start, stop, step) {
  if (stop === undefined) { stop = start; start = 0; }
  if (step === undefined) step = 1;
  if (step === 0) throw new RangeError("range() step must not be zero");
  for (let i = start; step > 0 ? i < stop : i > stop; i += step) yield i;
}"#
        }
        Helper::FloorMod => {
            r#"function __judge_mod(a, b) {
  if (b === 0) throw new RangeError("integer modulo by zero");
  const r = a % b;
  return r !== 0 && (r < 0) !== (b < 0) ? r + b : r;
}"#
        }
        Helper::Contains => {
            r#"function __judge_contains(container, item) {
  if (typeof container === "string") return container.includes(item);
  if (Array.isArray(container)) return container.some((value) => __judge_eq(value, item));
  if (container instanceof Map || container instanceof Set) {
    if (container.has(item)) return true;
    if (item === null || typeof item !== "object") return false;
    for (const value of container.keys()) if (__judge_eq(value, item)) return true;
    return false;
  }
  return Object.prototype.hasOwnProperty.call(container, item);
}"#
        }
        Helper::Sorted => {
            r#"function __judge_sorted(items, reverse, key) {
  return __judge_sort(Array.from(items), reverse, key);
}"#
        }
        Helper::SortInPlace => {
            r#"function __judge_sort(items, reverse, key) {
  const k = key || ((value) => value);
  const cmp = (a, b) => {
    if (Array.isArray(a) && Array.isArray(b)) {
      for (let i = 0; i < Math.min(a.length, b.length); i++) {
        const c = cmp(a[i], b[i]);
        if (c !== 0) return c;
      }
      return a.length - b.length;
    }
    return a < b ? -1 : a > b ? 1 : 0;
  };
  items.sort((a, b) => cmp(k(a), k(b)));
  if (reverse) items.reverse();
  return items;
}"#
        }
        Helper::GetOr => {
            r#"function __judge_get(container, key, fallback) {
  const missing = fallback === undefined ? null : fallback;
  if (container instanceof Map) return container.has(key) ? container.get(key) : missing;
  return Object.prototype.hasOwnProperty.call(container, key) ? container[key] : missing;
}"#
        }
        Helper::SplitWhitespace => {
            r#"function __judge_split(text) {
  return text.split(/\s+/).filter((part) => part.length > 0);
}"#
        }
        Helper::Zip => {
            r#"function __judge_zip(...lists) {
  const arrays = lists.map((list) => Array.from(list));
  const length = arrays.length ? Math.min(...arrays.map((a) => a.length)) : 0;
  return Array.from({ length }, (_, i) => arrays.map((a) => a[i]));
}"#
        }
        Helper::Sum => {
            r#"function __judge_sum(items, start) {
  let total = start === undefined ? 0 : start;
  for (const item of items) total += item;
  return total;
}"#
        }
        Helper::MapEntry => {
            r#"function __judge_entry(map, key, fallback) {
  if (!map.has(key)) map.set(key, fallback);
  return map.get(key);
}"#
        }
        Helper::IsDigit => {
            r#"function __judge_isdigit(text) {
  return typeof text === "string" && /^[0-9]+$/.test(text);
}"#
        }
        Helper::IsLetter => {
            r#"function __judge_isalpha(text) {
  return typeof text === "string" && /^\p{L}+$/u.test(text);
}"#
        }
        Helper::IsAlphanumeric => {
            r#"function __judge_isalnum(text) {
  return typeof text === "string" && /^[\p{L}\p{N}]+$/u.test(text);
}"#
        }
        Helper::Iter => {
            r#"function __judge_iter(value) {
  if (value === null || value === undefined) throw new TypeError("object is not iterable");
  if (typeof value[Symbol.iterator] === "function") return value;
  return Object.keys(value);
}"#
        }
        Helper::Len => {
            r#"function __judge_len(value) {
  if (typeof value === "string" || Array.isArray(value)) return value.length;
  if (value instanceof Map || value instanceof Set) return value.size;
  if (value !== null && typeof value === "object") return Object.keys(value).length;
  throw new TypeError("object has no len()");
}"#
        }
        Helper::Count => {
            r#"function __judge_count(container, item) {
  if (typeof container === "string") return item === "" ? container.length + 1 : container.split(item).length - 1;
  return Array.from(container).filter((value) => __judge_eq(value, item)).length;
}"#
        }
        Helper::Remove => {
            r#"function __judge_remove(container, item) {
  if (container instanceof Set || container instanceof Map) {
    if (!container.delete(item)) throw new RangeError("item not found");
    return null;
  }
  const index = container.findIndex((value) => __judge_eq(value, item));
  if (index < 0) throw new RangeError("item not found");
  container.splice(index, 1);
  return null;
}"#
        }
        Helper::Repeat => {
            r#"function __judge_repeat(sequence, times) {
  if (typeof times !== "number") [sequence, times] = [times, sequence];
  if (typeof times !== "number" || !(typeof sequence === "string" || Array.isArray(sequence))) {
    throw new TypeError("can't multiply sequence by non-int");
  }
  if (typeof sequence === "string") return sequence.repeat(Math.max(0, times));
  const out = [];
  for (let i = 0; i < times; i++) for (const item of sequence) out.push(item);
  return out;
}"#
        }
        Helper::Slice => {
            r#"function __judge_slice(sequence, start, stop, step) {
  if (step === undefined || step === null) step = 1;
  if (step === 0) throw new RangeError("slice step cannot be zero");
  const items = Array.from(sequence);
  const n = items.length;
  const clamp = (value, low, high) => Math.min(Math.max(value, low), high);
  const norm = (value, fallback, low, high) =>
    value === undefined || value === null ? fallback : clamp(value < 0 ? value + n : value, low, high);
  const out = [];
  if (step > 0) {
    for (let i = norm(start, 0, 0, n), end = norm(stop, n, 0, n); i < end; i += step) out.push(items[i]);
  } else {
    for (let i = norm(start, n - 1, -1, n - 1), end = norm(stop, -1, -1, n - 1); i > end; i += step) out.push(items[i]);
  }
  return typeof sequence === "string" ? out.join("") : out;
}"#
        }
        Helper::Truthy => {
            r#"function __judge_truthy(value) {
  if (Array.isArray(value) || typeof value === "string") return value.length > 0;
  if (value instanceof Map || value instanceof Set) return value.size > 0;
  if (value !== null && typeof value === "object") return Object.keys(value).length > 0;
  return Boolean(value);
}"#
        }
        Helper::ToMap => {
            r#"function __judge_map(value, numericKeys) {
  if (value instanceof Map) return value;
  return new Map(Object.entries(value).map(([k, v]) => [numericKeys ? Number(k) : k, v]));
}"#
        }
        Helper::ToSet => {
            r#"function __judge_set(value) {
  return value instanceof Set ? value : new Set(value);
}"#
        }
        Helper::Equal => {
            r#"function __judge_eq(a, b) {
  if (a === b) return true;
  if (a === null || b === null || typeof a !== "object" || typeof b !== "object") return false;
  if (Array.isArray(a) || Array.isArray(b)) {
    if (!Array.isArray(a) || !Array.isArray(b) || a.length !== b.length) return false;
    return a.every((item, i) => __judge_eq(item, b[i]));
  }
  if (a instanceof Set || b instanceof Set) {
    if (!(a instanceof Set) || !(b instanceof Set) || a.size !== b.size) return false;
    const deep = (item) => typeof item === "object" && item !== null;
    for (const item of a) {
      if (b.has(item)) continue;
      if (!deep(item) || !Array.from(b).some((other) => __judge_eq(item, other))) return false;
    }
    return true;
  }
  const entries = (value) => (value instanceof Map ? Array.from(value.entries()) : Object.entries(value));
  const has = (value, key) =>
    value instanceof Map ? value.has(key) : Object.prototype.hasOwnProperty.call(value, key);
  const get = (value, key) => (value instanceof Map ? value.get(key) : value[key]);
  const left = entries(a);
  if (left.length !== entries(b).length) return false;
  return left.every(([key, value]) => has(b, key) && __judge_eq(value, get(b, key)));
}"#
        }
        Helper::Compare => {
            r#"function __judge_cmp(a, b) {
  if (Array.isArray(a) && Array.isArray(b)) {
    for (let i = 0; i < Math.min(a.length, b.length); i++) {
      const c = __judge_cmp(a[i], b[i]);
      if (c !== 0) return c;
    }
    return a.length - b.length;
  }
  if (a === null || b === null || typeof a === "object" || typeof b === "object" ||
      (typeof a === "string") !== (typeof b === "string")) {
    throw new TypeError("ordering is not supported between these operands");
  }
  return a < b ? -1 : a > b ? 1 : 0;
}"#
        }
        Helper::Add => {
            r#"function __judge_add(a, b) {
  if (Array.isArray(a) && Array.isArray(b)) return a.concat(b);
  const numeric = (value) => typeof value === "number" || typeof value === "boolean";
  if ((typeof a === "string" && typeof b === "string") || (numeric(a) && numeric(b))) return a + b;
  throw new TypeError("unsupported operand types for +");
}"#
        }
        Helper::InPlaceAdd => {
            r#"function __judge_iadd(target, value) {
  if (!Array.isArray(target)) return __judge_add(target, value);
  for (const item of value) target.push(item);
  return target;
}"#
        }
        Helper::Multiply => {
            r#"function __judge_mul(a, b) {
  const numeric = (value) => typeof value === "number" || typeof value === "boolean";
  return numeric(a) && numeric(b) ? a * b : __judge_repeat(a, b);
}"#
        }
        Helper::SetOp => {
            r#"function __judge_setop(op, a, b) {
  if (a instanceof Set && b instanceof Set) {
    const only = (x, y) => Array.from(x).filter((item) => !y.has(item));
    if (op === "|") return new Set([...a, ...b]);
    if (op === "&") return new Set(Array.from(a).filter((item) => b.has(item)));
    if (op === "-") return new Set(only(a, b));
    return new Set([...only(a, b), ...only(b, a)]);
  }
  if (a === null || b === null || typeof a === "object" || typeof b === "object") {
    throw new TypeError("unsupported operand types for " + op);
  }
  if (op === "|") return a | b;
  if (op === "&") return a & b;
  if (op === "-") return a - b;
  return a ^ b;
}"#
        }
        Helper::Str => {
            r#"function __judge_str(value) {
  const repr = (item) => (typeof item === "string" ? "'" + item + "'" : __judge_str(item));
  if (typeof value === "string") return value;
  if (value === true) return "True";
  if (value === false) return "False";
  if (value === null || value === undefined) return "None";
  if (typeof value === "number") {
    if (Number.isNaN(value)) return "nan";
    if (!Number.isFinite(value)) return value > 0 ? "inf" : "-inf";
    return String(value);
  }
  if (Array.isArray(value)) return "[" + value.map(repr).join(", ") + "]";
  if (value instanceof Set) return value.size ? "{" + Array.from(value, repr).join(", ") + "}" : "set()";
  const entries = value instanceof Map ? Array.from(value.entries()) : Object.entries(value);
  return "{" + entries.map(([k, v]) => repr(k) + ": " + repr(v)).join(", ") + "}";
}"#
        }
        Helper::Round => {
            r#"function __judge_round(value, digits) {
  const halfEven = (x) => {
    const r = Math.round(x);
    return Math.abs(x % 1) === 0.5 && r % 2 !== 0 ? r - 1 : r;
  };
  if (digits === undefined || digits === null) return halfEven(value);
  if (digits < 0) {
    const scale = 10 ** -digits;
    return halfEven(value / scale) * scale;
  }
  const scale = 10 ** digits;
  const scaled = value * scale;
  if (Math.abs(scaled % 1) === 0.5) return halfEven(scaled) / scale;
  return Number(value.toFixed(digits));
}"#
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(expr: Expr) -> String {
        emit_expression(&expr).0
    }

    #[test]
    fn test_parenthesizes_by_precedence() {
        let sum = Expr::binary(BinaryOp::Add, Expr::ident("a"), Expr::ident("b"));
        let product = Expr::binary(BinaryOp::Mul, sum, Expr::ident("c"));
        assert_eq!(render(product), "(a + b) * c");

        let left = Expr::binary(
            BinaryOp::Sub,
            Expr::binary(BinaryOp::Sub, Expr::ident("a"), Expr::ident("b")),
            Expr::ident("c"),
        );
        assert_eq!(render(left), "a - b - c");

        let right = Expr::binary(
            BinaryOp::Sub,
            Expr::ident("a"),
            Expr::binary(BinaryOp::Sub, Expr::ident("b"), Expr::ident("c")),
        );
        assert_eq!(render(right), "a - (b - c)");
    }

    #[test]
    fn test_negated_power_base_is_wrapped() {
        let pow = Expr::binary(
            BinaryOp::Pow,
            Expr::unary(UnaryOp::Neg, Expr::number(2)),
            Expr::number(2),
        );
        assert_eq!(render(pow), "(-2) ** 2");
    }

    #[test]
    fn test_reserved_identifiers_are_renamed() {
        assert_eq!(js_identifier("delete"), "delete_");
        assert_eq!(js_identifier("total"), "total");
        assert_eq!(render(Expr::ident("new")), "new_");
    }

    #[test]
    fn test_program_includes_used_helpers_once() {
        let range = Expr::helper(Helper::Range, vec![Expr::number(3)]);
        let program = Program {
            globals: vec![],
            body: vec![
                Stmt::ForOf {
                    target: Expr::ident("i"),
                    declare: true,
                    iterable: range.clone(),
                    body: vec![],
                },
                Stmt::Expr(Expr::call(Expr::ident("f"), vec![range])),
            ],
        };
        let code = emit_program(&program);
        assert_eq!(code.matches("function* __judge_range").count(), 1);
        assert!(code.contains("for (let i of __judge_range(3)) {"));
    }

    #[test]
    fn test_if_else_chain() {
        let program = Program {
            globals: vec![],
            body: vec![Stmt::If {
                cond: Expr::ident("a"),
                then_block: vec![Stmt::Return(Some(Expr::number(1)))],
                else_block: Some(vec![Stmt::If {
                    cond: Expr::ident("b"),
                    then_block: vec![Stmt::Return(Some(Expr::number(2)))],
                    else_block: Some(vec![Stmt::Return(Some(Expr::number(3)))]),
                }]),
            }],
        };
        let expected = "if (a) {\n  return 1;\n} else if (b) {\n  return 2;\n} else {\n  return 3;\n}\n";
        assert_eq!(emit_program(&program), expected);
    }

    #[test]
    fn test_object_keys_and_strings() {
        let object = Expr::Object(vec![
            (PropKey::Static("a".into()), Expr::number(1)),
            (PropKey::Static("two words".into()), Expr::string("x\"y")),
            (PropKey::Computed(Expr::ident("k")), Expr::Bool(true)),
        ]);
        assert_eq!(render(object), r#"{ a: 1, "two words": "x\"y", [k]: true }"#);
    }

    #[test]
    fn test_loop_head_with_several_bindings() {
        let program = Program {
            globals: vec![],
            body: vec![Stmt::For {
                init: Some(Box::new(Stmt::Let(vec![
                    ("i".into(), Some(Expr::number(0))),
                    ("j".into(), Some(Expr::ident("n"))),
                ]))),
                cond: Some(Expr::binary(BinaryOp::Lt, Expr::ident("i"), Expr::ident("j"))),
                update: Some(Expr::Sequence(vec![
                    Expr::Update {
                        increment: true,
                        prefix: false,
                        target: Box::new(Expr::ident("i")),
                    },
                    Expr::Update {
                        increment: false,
                        prefix: false,
                        target: Box::new(Expr::ident("j")),
                    },
                ])),
                body: vec![Stmt::Break],
            }],
        };
        assert_eq!(
            emit_program(&program),
            "for (let i = 0, j = n; i < j; i++, j--) {\n  break;\n}\n"
        );
    }

    #[test]
    fn test_helper_dependencies_are_emitted() {
        let program = Program {
            globals: vec![],
            body: vec![
                Stmt::Expr(Expr::helper(Helper::Contains, vec![Expr::ident("xs"), Expr::ident("x")])),
                Stmt::Return(Some(Expr::helper(
                    Helper::InPlaceAdd,
                    vec![Expr::ident("xs"), Expr::ident("ys")],
                ))),
            ],
        };
        let code = emit_program(&program);
        for name in ["__judge_contains(", "__judge_eq(", "__judge_iadd(", "__judge_add("] {
            assert_eq!(code.matches(&format!("function {name}")).count(), 1, "{name}");
        }
    }

    #[test]
    fn test_sorted_pulls_in_sort() {
        let program = Program {
            globals: vec![],
            body: vec![Stmt::Return(Some(Expr::helper(
                Helper::Sorted,
                vec![Expr::ident("xs")],
            )))],
        };
        let code = emit_program(&program);
        assert!(code.contains("function __judge_sorted("));
        assert!(code.contains("function __judge_sort("));
    }
}
