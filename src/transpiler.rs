//! Tree-to-text translation from the Python-subset AST to Go source.
//!
//! The translation is a pure structural fold: per-node rendering rules plus
//! a driver that joins statement fragments, manages indentation, and tracks
//! how deeply function definitions are nested. Unsupported constructs are
//! rendered as inline diagnostic comments so the output stays inspectable
//! instead of the whole run aborting.

use std::fmt;

use thiserror::Error;

use self::go_syntax::{GO_ANY, escape_go_string, format_byte_literal, operator_symbol};
use crate::ast::{Expression, Param, Program, Statement};

pub mod go_syntax;

/// Typed errors produced by the transpiler. Unsupported constructs are not
/// errors (they degrade to diagnostic fragments); only structural
/// precondition violations surface here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TranspileError {
    #[error(
        "Cannot assign to {found} at line {line}, column {column}: only a single name is supported"
    )]
    UnsupportedTarget {
        found: String,
        line: usize,
        column: usize,
    },
}

/// Enclosing function definitions, innermost last. Owned by one in-flight
/// translation; depth before a `FunctionDef` is pushed decides whether it
/// renders as a top-level declaration or a local binding.
#[derive(Debug, Default)]
struct ScopeStack {
    frames: Vec<String>,
}

impl ScopeStack {
    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn push(&mut self, name: &str) {
        self.frames.push(name.to_string());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

pub struct Transpiler;

impl Transpiler {
    /// Translates a whole program: statements in source order, fragments
    /// joined with newlines, empty fragments skipped.
    pub fn transpile(&self, program: &Program) -> Result<String, TranspileError> {
        let mut scopes = ScopeStack::default();
        let mut fragments = Vec::new();
        for statement in &program.statements {
            let fragment = self.translate_statement(statement, &mut scopes)?;
            if !fragment.is_empty() {
                fragments.push(fragment);
            }
        }
        debug_assert!(
            scopes.is_empty(),
            "scope stack left unbalanced after translation"
        );
        Ok(fragments.join("\n"))
    }

    fn translate_statement(
        &self,
        statement: &Statement,
        scopes: &mut ScopeStack,
    ) -> Result<String, TranspileError> {
        match statement {
            Statement::FunctionDef {
                name,
                params,
                returns,
                body,
            } => {
                let params_text = params
                    .iter()
                    .map(|param| self.translate_param(param))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                let returns_text = match returns {
                    Some(annotation) => format!(" {}", self.translate_expression(annotation)?),
                    None => String::new(),
                };

                // Depth is read before the push: the node itself renders by
                // where it sits, not by what it contains.
                let header = if scopes.depth() == 0 {
                    format!("func {name}({params_text}){returns_text} {{")
                } else {
                    format!("var {name} = func({params_text}){returns_text} {{")
                };

                let mut lines = vec![header];
                scopes.push(name);
                let body_lines = self.translate_body(body, scopes);
                scopes.pop();
                lines.extend(body_lines?);
                lines.push("}".to_string());
                Ok(lines.join("\n"))
            }
            Statement::Assign {
                target,
                target_span,
                value,
            } => {
                let Expression::Identifier(name) = target else {
                    return Err(TranspileError::UnsupportedTarget {
                        found: describe_target(target).to_string(),
                        line: target_span.line,
                        column: target_span.column,
                    });
                };
                Ok(format!("var {name} = {}", self.translate_expression(value)?))
            }
            Statement::Return(value) => match value {
                Some(value) => Ok(format!("return {}", self.translate_expression(value)?)),
                None => Ok("return".to_string()),
            },
            Statement::Expr(expr) => self.translate_expression(expr),
            Statement::Pass => Ok(String::new()),
            Statement::While { .. } | Statement::If { .. } => Ok(diagnostic(statement)),
        }
    }

    /// Translates a function body, indenting every line of each non-empty
    /// fragment one tab relative to the enclosing signature.
    fn translate_body(
        &self,
        body: &[Statement],
        scopes: &mut ScopeStack,
    ) -> Result<Vec<String>, TranspileError> {
        let mut lines = Vec::new();
        for statement in body {
            let fragment = self.translate_statement(statement, scopes)?;
            if fragment.is_empty() {
                continue;
            }
            for line in fragment.lines() {
                lines.push(format!("\t{line}"));
            }
        }
        Ok(lines)
    }

    fn translate_param(&self, param: &Param) -> Result<String, TranspileError> {
        let annotation = match &param.annotation {
            Some(annotation) => self.translate_expression(annotation)?,
            None => GO_ANY.to_string(),
        };
        Ok(format!("{} {}", param.name, annotation))
    }

    /// Renders one expression. Binary operations are a direct textual join
    /// of their operands: no parenthesization is reconstructed, so trees
    /// whose shape disagrees with operator precedence flatten incorrectly.
    fn translate_expression(&self, expr: &Expression) -> Result<String, TranspileError> {
        match expr {
            Expression::Integer(value) => Ok(value.to_string()),
            Expression::Float(value) => Ok(format!("{value:?}")),
            Expression::String(value) => Ok(format!("\"{}\"", escape_go_string(value))),
            Expression::Bytes(bytes) => Ok(format_byte_literal(bytes)),
            Expression::Boolean(value) => Ok(if *value { "true" } else { "false" }.to_string()),
            Expression::None => Ok("nil".to_string()),
            Expression::Identifier(name) => Ok(name.clone()),
            Expression::List(elements) => {
                let rendered = elements
                    .iter()
                    .map(|element| self.translate_expression(element))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                Ok(format!("[]{GO_ANY}{{{rendered}}}"))
            }
            Expression::Dict(pairs) => {
                let rendered = pairs
                    .iter()
                    .map(|(key, value)| {
                        Ok(format!(
                            "{}: {}",
                            self.translate_expression(key)?,
                            self.translate_expression(value)?
                        ))
                    })
                    .collect::<Result<Vec<_>, TranspileError>>()?
                    .join(", ");
                Ok(format!("map[{GO_ANY}]{GO_ANY}{{{rendered}}}"))
            }
            Expression::BinaryOp { left, op, right } => match operator_symbol(op) {
                Some(symbol) => Ok(format!(
                    "{} {} {}",
                    self.translate_expression(left)?,
                    symbol,
                    self.translate_expression(right)?
                )),
                None => Ok(diagnostic(expr)),
            },
            Expression::Call { callee, args } => {
                let rendered = args
                    .iter()
                    .map(|arg| self.translate_expression(arg))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                Ok(format!("{}({rendered})", self.translate_expression(callee)?))
            }
        }
    }
}

/// Inline placeholder emitted in place of a construct the translator cannot
/// render. The structural dump keeps the output inspectable.
fn diagnostic<N: fmt::Debug>(node: &N) -> String {
    format!("// UNSUPPORTED => {node:?}")
}

fn describe_target(target: &Expression) -> &'static str {
    match target {
        Expression::Integer(_) => "integer literal",
        Expression::Float(_) => "float literal",
        Expression::Identifier(_) => "identifier",
        Expression::Boolean(_) => "boolean literal",
        Expression::String(_) => "string literal",
        Expression::Bytes(_) => "bytes literal",
        Expression::List(_) => "list literal",
        Expression::Dict(_) => "dict literal",
        Expression::None => "None",
        Expression::BinaryOp { .. } => "binary operation",
        Expression::Call { .. } => "call expression",
    }
}
