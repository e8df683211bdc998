//! JavaScript is already the common form: normalization is the identity and
//! the only work is finding the entry point.

use verdict_common::types::Language;

use super::lexer::{tokenize, LexOptions, Token, TokenKind};
use crate::error::{AdapterError, AdapterResult};

/// Name of the first top-level function declaration or function-valued
/// binding.
pub fn resolve_function(code: &str) -> AdapterResult<String> {
    let tokens = tokenize(code, LexOptions::javascript())?;
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Punct {
            match token.text.as_str() {
                "{" | "(" | "[" => depth += 1,
                "}" | ")" | "]" => depth = depth.saturating_sub(1),
                _ => {}
            }
            continue;
        }
        if depth != 0 {
            continue;
        }
        if let Some(name) = declared_function(&tokens, i) {
            return Ok(name);
        }
    }
    Err(AdapterError::FunctionNotFound {
        language: Language::JavaScript,
    })
}

fn declared_function(tokens: &[Token], i: usize) -> Option<String> {
    let at = |offset: usize| tokens.get(i + offset);
    let token = &tokens[i];

    if token.is_ident("function") {
        // `function name(` or `function* name(`
        let mut next = 1;
        if at(next)?.is_punct("*") {
            next += 1;
        }
        let name = at(next)?;
        return (name.kind == TokenKind::Ident && at(next + 1)?.is_punct("("))
            .then(|| name.text.clone());
    }

    if matches!(token.text.as_str(), "const" | "let" | "var") && token.kind == TokenKind::Ident {
        let name = at(1)?;
        if name.kind != TokenKind::Ident || !at(2)?.is_punct("=") {
            return None;
        }
        return function_value(tokens, i + 3).then(|| name.text.clone());
    }
    None
}

/// Whether the expression starting at `start` is a function or arrow.
fn function_value(tokens: &[Token], start: usize) -> bool {
    let Some(first) = tokens.get(start) else {
        return false;
    };
    if first.is_ident("function") {
        return true;
    }
    if first.is_ident("async") {
        return tokens
            .get(start + 1)
            .is_some_and(|t| t.is_ident("function") || t.kind == TokenKind::Ident || t.is_punct("("));
    }
    if first.kind == TokenKind::Ident {
        return tokens.get(start + 1).is_some_and(|t| t.is_punct("=>"));
    }
    if first.is_punct("(") {
        let mut depth = 0usize;
        for (offset, token) in tokens[start..].iter().enumerate() {
            if token.is_punct("(") {
                depth += 1;
            } else if token.is_punct(")") {
                depth -= 1;
                if depth == 0 {
                    return tokens
                        .get(start + offset + 1)
                        .is_some_and(|t| t.is_punct("=>"));
                }
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_declaration() {
        let code = "// helper\nfunction add(a, b) {\n  return a + b;\n}";
        assert_eq!(resolve_function(code).unwrap(), "add");
    }

    #[test]
    fn test_async_and_generator_declarations() {
        assert_eq!(resolve_function("async function fetchIt() {}").unwrap(), "fetchIt");
        assert_eq!(resolve_function("function* gen() { yield 1; }").unwrap(), "gen");
    }

    #[test]
    fn test_arrow_and_expression_bindings() {
        assert_eq!(resolve_function("const twice = (x) => x * 2;").unwrap(), "twice");
        assert_eq!(resolve_function("let inc = x => x + 1;").unwrap(), "inc");
        assert_eq!(resolve_function("var f = function (a) { return a; };").unwrap(), "f");
        assert_eq!(resolve_function("const g = async (a) => a;").unwrap(), "g");
    }

    #[test]
    fn test_skips_plain_bindings() {
        let code = "const LIMIT = 10;\nconst cache = {};\nfunction solve(n) { return n; }";
        assert_eq!(resolve_function(code).unwrap(), "solve");
    }

    #[test]
    fn test_ignores_nested_functions() {
        let code = "const table = { build: function inner() {} };\nconst run = () => 1;";
        assert_eq!(resolve_function(code).unwrap(), "run");
    }

    #[test]
    fn test_first_declaration_wins() {
        let code = "function first() {}\nfunction second() {}";
        assert_eq!(resolve_function(code).unwrap(), "first");
    }

    #[test]
    fn test_no_function() {
        assert_eq!(
            resolve_function("const x = 42;").unwrap_err(),
            AdapterError::FunctionNotFound {
                language: Language::JavaScript
            }
        );
    }

    #[test]
    fn test_commented_out_declaration_is_ignored() {
        let code = "/* function hidden() {} */\nconst shown = () => 0;";
        assert_eq!(resolve_function(code).unwrap(), "shown");
    }
}
