//! Syntax tree shared by the frontend and the transpiler.
//!
//! The parser builds these nodes once; the transpiler walks them read-only
//! and restates them as Go text. Nothing mutates a node after construction.

use crate::token::Span;

#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    Integer(i64),
    Float(f64),
    Identifier(String),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Expression>),
    /// Pairs keep source order; no deduplication is performed.
    Dict(Vec<(Expression, Expression)>),
    None,
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
    },
}

#[derive(Debug, PartialEq, Clone)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LessThan,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expression>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    FunctionDef {
        name: String,
        params: Vec<Param>,
        returns: Option<Expression>,
        body: Vec<Statement>,
    },
    /// The parser accepts any expression on the left of `=`; the transpiler
    /// rejects everything but a single identifier, so the target's span is
    /// kept for that report.
    Assign {
        target: Expression,
        target_span: Span,
        value: Expression,
    },
    While {
        condition: Expression,
        body: Vec<Statement>,
    },
    If {
        condition: Expression,
        then_body: Vec<Statement>,
        else_body: Vec<Statement>,
    },
    Return(Option<Expression>),
    Pass,
    Expr(Expression),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    pub statements: Vec<Statement>,
}
