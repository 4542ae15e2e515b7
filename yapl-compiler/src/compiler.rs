use anyhow::{bail, Result};
use log::debug;

use crate::ast::{Program, SourceSpan};
use crate::checker::{Analysis, SemanticChecker};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::lexer::{Lexer, LexerError, Token};
use crate::parser::Parser;
use crate::source::SourceFile;

#[derive(Debug, Default, Clone)]
pub struct CompileOptions {
    pub dump_tokens: bool,
}

pub struct Compiler {
    diagnostics: Diagnostics,
    options: CompileOptions,
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            diagnostics: Diagnostics::new(),
            options,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Lexes, parses and checks `source`. Fails when any stage reports a
    /// problem; the diagnostics stay available through [`Compiler::diagnostics`].
    pub fn compile(&mut self, source: &SourceFile) -> Result<Analysis> {
        let program = self.parse(source)?;
        let analysis = self.check_program(&program);
        if !analysis.diagnostics.is_empty() {
            bail!("Semantic analysis failed");
        }
        Ok(analysis)
    }

    pub fn tokenize(&mut self, source: &SourceFile) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        match lexer.tokenize() {
            Ok(tokens) => Ok(tokens),
            Err(err) => {
                if let Some(lexer_error) = err.downcast_ref::<LexerError>() {
                    let line = lexer_error.line();
                    let column = lexer_error.column();
                    self.diagnostics.push_with_span(
                        DiagnosticKind::Syntax,
                        lexer_error.to_string(),
                        Some(SourceSpan::single_point(line, column)),
                    );
                } else {
                    self.diagnostics
                        .push(DiagnosticKind::Syntax, err.to_string());
                }
                bail!("Lexing failed");
            }
        }
    }

    pub fn parse(&mut self, source: &SourceFile) -> Result<Program> {
        let tokens = self.tokenize(source)?;

        if self.options.dump_tokens {
            for token in &tokens {
                println!("{token:?}");
            }
        }

        let mut parser = Parser::new(tokens);
        let result = parser.parse();
        self.diagnostics.extend(parser.into_diagnostics());
        let program = result?;
        debug!(
            "parsed {} class(es), {} expression(s) from {}",
            program.classes.len(),
            program.expression_count,
            source.path.display()
        );
        Ok(program)
    }

    /// Runs semantic analysis and always hands back the full analysis, errors included.
    pub fn check_program(&mut self, program: &Program) -> Analysis {
        let mut checker = SemanticChecker::new();
        checker.check_program(program);
        let analysis = checker.into_analysis();
        self.diagnostics.extend(analysis.diagnostics.clone());
        analysis
    }
}
