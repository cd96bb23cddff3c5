//! # Capture Query Language - Abstract Syntax Tree
//!
//! This module defines the tree a query compiles into. The tree is built once
//! per query string and then evaluated, read-only, against every record.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[operators]** - Equality, comparison, logical and prefix operators
//! - **[expressions]** - One node type per grammar layer
//!
//! ## Precedence
//!
//! From tightest to loosest:
//!
//! 1. prefix `!`, `-`
//! 2. `and`, `or`
//! 3. `>`, `<`, `>=`, `<=`
//! 4. `==`, `!=`
//!
//! `and`/`or` bind tighter than comparisons, so
//!
//! ```text
//! true and 5 == a
//! ```
//!
//! groups as `(true and 5) == a`. Parentheses restart the ladder.
//!
//! ## Examples
//!
//! ```text
//! http and request.method == "GET"
//! (a.b == "hello") and (x.y > 3.14)
//! !http.request.headers["user-agent"].startsWith("kube-probe")
//! service == r"catalogue.*"
//! ```
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::{
    CallExpression, Chain, Comparison, Equality, Expression, HelperCall, Logical, Parameter,
    Pattern, Primary, SelectExpression, Subscript, Unary,
};
pub use operators::{ComparisonOp, EqualityOp, LogicalOp, UnaryOp};
pub use tokens::Token;
