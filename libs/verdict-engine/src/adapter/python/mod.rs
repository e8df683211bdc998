//! Python front end.

mod lexer;
mod parser;

use verdict_common::types::Language;

use super::emit::{emit_program, js_identifier};
use super::ir::Stmt;
use super::{Lowered, SourceAdapter};
use crate::error::AdapterResult;

pub struct PythonAdapter;

impl SourceAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn lower(&self, code: &str) -> AdapterResult<Lowered> {
        let program = parser::parse(code)?;
        let entry = program.body.iter().find_map(|stmt| match stmt {
            Stmt::Function(function) => Some(js_identifier(&function.name)),
            _ => None,
        });
        Ok(Lowered {
            code: emit_program(&program),
            entry,
        })
    }
}
