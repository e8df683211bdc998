//! Java and C++ front end.
//!
//! Both languages share one tokenizer configuration family and one parser;
//! [`Dialect`] selects the type names, library methods and statement forms
//! each accepts.

mod library;
mod parser;
mod types;

use verdict_common::types::Language;

use super::emit::{emit_program, js_identifier};
use super::ir::{Program, Stmt};
use super::{Lowered, SourceAdapter};
use crate::error::AdapterResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Java,
    Cpp,
}

pub struct JavaAdapter;

pub struct CppAdapter;

impl SourceAdapter for JavaAdapter {
    fn language(&self) -> Language {
        Language::Java
    }

    fn lower(&self, code: &str) -> AdapterResult<Lowered> {
        lower(code, Dialect::Java)
    }
}

impl SourceAdapter for CppAdapter {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn lower(&self, code: &str) -> AdapterResult<Lowered> {
        lower(code, Dialect::Cpp)
    }
}

fn lower(code: &str, dialect: Dialect) -> AdapterResult<Lowered> {
    let program = parser::parse(code, dialect)?;
    Ok(Lowered {
        code: emit_program(&program),
        entry: entry_point(&program),
    })
}

/// First function in declaration order, passing over `main` unless it is
/// the only one.
fn entry_point(program: &Program) -> Option<String> {
    let mut functions = program.body.iter().filter_map(|stmt| match stmt {
        Stmt::Function(function) => Some(function.name.as_str()),
        _ => None,
    });
    let first = functions.next()?;
    let chosen = if first == "main" {
        functions.next().unwrap_or(first)
    } else {
        first
    };
    Some(js_identifier(chosen))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_java_solution_class() {
        let code = r#"
            import java.util.*;

            public class Solution {
                public int[] twoSum(int[] nums, int target) {
                    Map<Integer, Integer> seen = new HashMap<>();
                    for (int i = 0; i < nums.length; i++) {
                        int need = target - nums[i];
                        if (seen.containsKey(need)) {
                            return new int[] { seen.get(need), i };
                        }
                        seen.put(nums[i], i);
                    }
                    return new int[0];
                }
            }
        "#;
        let lowered = JavaAdapter.lower(code).unwrap();
        assert_eq!(lowered.entry.as_deref(), Some("twoSum"));
        assert!(lowered.code.contains("function twoSum(nums, target) {"));
        assert!(lowered.code.contains("let seen = new Map();"));
        assert!(lowered.code.contains("if (seen.has(need)) {"));
        assert!(lowered.code.contains("seen.set(nums[i], i);"));
    }

    #[test]
    fn test_cpp_main_is_skipped_for_entry() {
        let code = r#"
            #include <iostream>
            using namespace std;

            int main() {
                cout << add(1, 2) << endl;
                return 0;
            }

            int add(int a, int b) {
                return a + b;
            }
        "#;
        let lowered = CppAdapter.lower(code).unwrap();
        assert_eq!(lowered.entry.as_deref(), Some("add"));
        assert!(lowered.code.contains("console.log(\"\" + add(1, 2));"));
    }

    #[test]
    fn test_lone_main_is_the_entry() {
        let lowered = CppAdapter.lower("int main() { return 0; }").unwrap();
        assert_eq!(lowered.entry.as_deref(), Some("main"));
    }
}
