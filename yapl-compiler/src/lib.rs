mod ast;
mod checker;
mod compiler;
mod diagnostics;
mod lexer;
mod parser;
mod scope;
mod source;
mod types;

pub use crate::ast::{
    AssignmentExpression, AttributeDeclaration, BinaryExpression, BinaryOperator, CallExpression,
    ClassDeclaration, ConditionalExpression, DispatchExpression, ExprId, ExprIdAllocator,
    Expression, ExpressionKind, Feature, Formal, Identifier, LetBinding, LetExpression, Literal,
    LoopExpression, MethodDeclaration, Program, SourceSpan, TypeName, UnaryExpression,
    UnaryOperator,
};
pub use crate::checker::{analyze, Analysis, Annotation, Annotations, SemanticChecker};
pub use crate::compiler::{CompileOptions, Compiler};
pub use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use crate::lexer::{Keyword, Lexer, LexerError, Token, TokenKind};
pub use crate::parser::Parser;
pub use crate::scope::{MethodRef, Scope, ScopeId, ScopeKind, ScopeTree, Symbol, SymbolKind};
pub use crate::source::{SourceFile, SourceId};
pub use crate::types::{
    ClassEntry, TypeRegistry, BOOL, BUILTIN_CLASSES, INT, IO, MAIN, OBJECT, SELF_TYPE, STRING,
};
