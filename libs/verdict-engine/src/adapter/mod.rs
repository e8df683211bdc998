//! Source adapters: bring every accepted language into the common
//! JavaScript form and decide which function a test case calls.
//!
//! **Pipeline**
//! 1. The wire tag is resolved to a [`Language`]; unknown tags fail with
//!    [`AdapterError::UnsupportedLanguage`].
//! 2. The language's adapter lowers the source (JavaScript passes through
//!    untouched; the others are parsed into [`ir`] and re-emitted).
//! 3. The entry point is the caller's `functionName` when given, otherwise
//!    the first top-level function the adapter found.
//!
//! Anything an adapter cannot translate faithfully is rejected with
//! [`AdapterError::UnsupportedConstruct`] rather than guessed at.

pub mod cfamily;
pub mod emit;
pub mod ir;
pub mod javascript;
pub mod lexer;
pub mod python;

use tracing::debug;
use verdict_common::types::Language;

use crate::error::{AdapterError, AdapterResult};

/// Deepest bracket, block or unary nesting a parser descends into.
pub(crate) const MAX_NESTING: usize = 100;

/// Deepest expression tree a parser builds, operator chains included.
pub(crate) const MAX_DEPTH: usize = 256;

/// Recursion budget shared by the foreign-language parsers. Source far
/// below the size limit can still nest deep enough to exhaust the stack.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Depth {
    nesting: usize,
    tree: usize,
}

impl Depth {
    /// Descend one level; hand the returned mark back to [`Depth::restore`].
    pub(crate) fn enter(&mut self, line: usize) -> AdapterResult<Depth> {
        let mark = *self;
        if self.nesting >= MAX_NESTING {
            return Err(too_deep(line, MAX_NESTING));
        }
        self.nesting += 1;
        self.extend(line)?;
        Ok(mark)
    }

    /// One more link in an operator or postfix chain.
    pub(crate) fn extend(&mut self, line: usize) -> AdapterResult<()> {
        if self.tree >= MAX_DEPTH {
            return Err(too_deep(line, MAX_DEPTH));
        }
        self.tree += 1;
        Ok(())
    }

    pub(crate) fn restore(&mut self, mark: Depth) {
        *self = mark;
    }
}

fn too_deep(line: usize, limit: usize) -> AdapterError {
    AdapterError::unsupported(line, format!("nesting deeper than {limit} levels"))
}

/// Output of lowering one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lowered {
    /// Program text in the common form.
    pub code: String,
    /// First top-level callable, named as it appears in `code`.
    pub entry: Option<String>,
}

pub trait SourceAdapter: Send + Sync {
    fn language(&self) -> Language;

    fn lower(&self, code: &str) -> AdapterResult<Lowered>;
}

struct JavaScriptAdapter;

impl SourceAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn lower(&self, code: &str) -> AdapterResult<Lowered> {
        Ok(Lowered {
            code: code.to_string(),
            entry: javascript::resolve_function(code).ok(),
        })
    }
}

/// Adapter registered for a language.
pub fn adapter_for(language: Language) -> &'static dyn SourceAdapter {
    match language {
        Language::JavaScript => &JavaScriptAdapter,
        Language::Python => &python::PythonAdapter,
        Language::Java => &cfamily::JavaAdapter,
        Language::Cpp => &cfamily::CppAdapter,
    }
}

/// A submission ready to run: common-form code plus the function to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUnit {
    pub language: Language,
    pub code: String,
    pub function: String,
}

pub fn resolve_language(tag: &str) -> AdapterResult<Language> {
    Language::from_tag(tag).ok_or_else(|| AdapterError::UnsupportedLanguage(tag.to_string()))
}

/// First top-level callable of `code`, as it will be named once normalized.
pub fn resolve_function(language: &str, code: &str) -> AdapterResult<String> {
    let language = resolve_language(language)?;
    adapter_for(language)
        .lower(code)?
        .entry
        .ok_or(AdapterError::FunctionNotFound { language })
}

/// Normalize `code` written in `language` and resolve its entry point.
pub fn normalize(
    language: &str,
    code: &str,
    function_name: Option<&str>,
) -> AdapterResult<NormalizedUnit> {
    let language = resolve_language(language)?;
    let lowered = adapter_for(language).lower(code)?;

    let explicit = function_name.map(str::trim).filter(|name| !name.is_empty());
    let function = match explicit {
        Some(name) if language == Language::JavaScript => name.to_string(),
        // Foreign names were renamed the same way when emitted.
        Some(name) => emit::js_identifier(name),
        None => lowered
            .entry
            .ok_or(AdapterError::FunctionNotFound { language })?,
    };

    debug!(
        language = %language,
        function = %function,
        normalized_bytes = lowered.code.len(),
        "Normalized submission"
    );

    Ok(NormalizedUnit {
        language,
        code: lowered.code,
        function,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_language() {
        let err = normalize("cobol", "", None).unwrap_err();
        assert_eq!(err, AdapterError::UnsupportedLanguage("cobol".to_string()));
    }

    #[test]
    fn test_javascript_passes_through() {
        let code = "function add(a, b) { return a + b; }";
        let unit = normalize("javascript", code, None).unwrap();
        assert_eq!(unit.code, code);
        assert_eq!(unit.function, "add");
    }

    #[test]
    fn test_explicit_name_wins() {
        let code = "function helper() {}\nfunction solve() {}";
        let unit = normalize("js", code, Some("solve")).unwrap();
        assert_eq!(unit.function, "solve");
    }

    #[test]
    fn test_blank_explicit_name_falls_back_to_resolution() {
        let unit = normalize("python", "def f(x):\n    return x\n", Some("  ")).unwrap();
        assert_eq!(unit.function, "f");
    }

    #[test]
    fn test_missing_function_per_language() {
        for (tag, code, language) in [
            ("javascript", "const x = 1;", Language::JavaScript),
            ("python", "x = 1\n", Language::Python),
            ("java", "class Main { int x = 1; }", Language::Java),
            ("cpp", "int x = 1;", Language::Cpp),
        ] {
            assert_eq!(
                normalize(tag, code, None).unwrap_err(),
                AdapterError::FunctionNotFound { language },
                "{tag}"
            );
        }
    }

    #[test]
    fn test_foreign_languages_resolve_first_function() {
        let python = normalize("python", "def first(a):\n    return a\n\ndef second():\n    return 0\n", None).unwrap();
        assert_eq!(python.function, "first");

        let java = normalize(
            "java",
            "public class Solution {\n  public int twice(int x) { return x * 2; }\n}",
            None,
        )
        .unwrap();
        assert_eq!(java.function, "twice");

        let cpp = normalize("cpp", "#include <vector>\nint square(int x) { return x * x; }", None).unwrap();
        assert_eq!(cpp.function, "square");
    }

    #[test]
    fn test_resolve_function_without_normalizing_calls() {
        assert_eq!(
            resolve_function("js", "const twice = (x) => x * 2;").unwrap(),
            "twice"
        );
        assert_eq!(
            resolve_function("python", "y = 2\n").unwrap_err(),
            AdapterError::FunctionNotFound {
                language: Language::Python
            }
        );
    }

    #[test]
    fn test_depth_budget() {
        let mut depth = Depth::default();
        let mark = depth.enter(1).unwrap();
        for _ in 1..MAX_DEPTH {
            depth.extend(1).unwrap();
        }
        assert_eq!(
            depth.extend(7).unwrap_err(),
            AdapterError::unsupported(7, "nesting deeper than 256 levels")
        );
        depth.restore(mark);
        assert_eq!(depth, Depth::default());

        for _ in 0..MAX_NESTING {
            depth.enter(1).unwrap();
        }
        assert!(depth.enter(2).is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected_not_fatal() {
        let python = format!("def f():\n    return {}1{}\n", "(".repeat(20_000), ")".repeat(20_000));
        assert!(matches!(
            normalize("python", &python, None).unwrap_err(),
            AdapterError::UnsupportedConstruct { line: 2, .. }
        ));

        let cpp = format!("int f() {{ return {}1{}; }}", "(".repeat(20_000), ")".repeat(20_000));
        assert!(matches!(
            normalize("cpp", &cpp, None).unwrap_err(),
            AdapterError::UnsupportedConstruct { .. }
        ));

        let java = format!(
            "class S {{ int f(int x) {{ return x{}; }} }}",
            " + x".repeat(50_000)
        );
        assert!(matches!(
            normalize("java", &java, None).unwrap_err(),
            AdapterError::UnsupportedConstruct { .. }
        ));

        let chained = format!("def f(x):\n    return x{}\n", ".y".repeat(50_000));
        assert!(normalize("python", &chained, None).is_err());
    }

    #[test]
    fn test_explicit_foreign_name_follows_renaming() {
        let unit = normalize("python", "def delete(x):\n    return x\n", Some("delete")).unwrap();
        assert_eq!(unit.function, "delete_");
        assert!(unit.code.contains("function delete_(x)"));
    }
}
