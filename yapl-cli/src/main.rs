use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use serde_json::json;
use yapl_compiler::{Analysis, CompileOptions, Compiler, Diagnostic, Program, SourceFile, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Ast,
    Types,
    Json,
}

#[derive(Parser)]
#[command(
    name = "yapl",
    version,
    about = "Check YAPL source files for semantic errors.",
    long_about = "Parse a YAPL program and run semantic analysis over it. \
                  `yapl check <INPUT>` is accepted as an alias."
)]
struct CheckCli {
    /// Path to a YAPL source file.
    input: PathBuf,

    /// Dump the token stream produced by the lexer.
    #[arg(long)]
    dump_tokens: bool,

    /// Emit additional output (`ast`, `types`, `json`).
    #[arg(long, value_enum)]
    emit: Vec<Emit>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut raw: Vec<OsString> = std::env::args_os().collect();
    if raw.get(1).map(|arg| arg == "check").unwrap_or(false) {
        raw.remove(1);
    }

    let cli = CheckCli::parse_from(raw);
    run_check(cli)
}

fn run_check(cli: CheckCli) -> Result<()> {
    let contents = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {:?}", cli.input))?;

    let source = SourceFile::new(SourceId(0), cli.input.clone(), contents);
    let line_cache: Vec<&str> = source.contents.lines().collect();
    let mut compiler = Compiler::new(CompileOptions {
        dump_tokens: cli.dump_tokens,
    });

    let program = match compiler.parse(&source) {
        Ok(program) => program,
        Err(err) => {
            for diagnostic in compiler.diagnostics().entries() {
                print_diagnostic(&source, &line_cache, diagnostic);
            }
            return Err(err.context("Compilation failed"));
        }
    };

    let analysis = compiler.check_program(&program);

    if cli.emit.contains(&Emit::Ast) {
        println!("{:#?}", program);
    }

    if cli.emit.contains(&Emit::Types) {
        print_types(&analysis);
    }

    if cli.emit.contains(&Emit::Json) {
        println!("{}", render_json(&program, &analysis)?);
    }

    let errors = analysis.diagnostics.len();
    if errors > 0 {
        for diagnostic in analysis.diagnostics.entries() {
            print_diagnostic(&source, &line_cache, diagnostic);
        }
        bail!("{} semantic error(s)", errors);
    }

    info!(
        "{}: {} class(es) checked",
        source.path.display(),
        program.classes.len()
    );
    Ok(())
}

fn print_types(analysis: &Analysis) {
    for (id, annotation) in analysis.annotations.iter() {
        let span = annotation.span;
        let marker = if annotation.has_error { " !" } else { "" };
        println!(
            "#{:<4} {}:{}-{}:{}  {}{}",
            id.0,
            span.line,
            span.column,
            span.end_line,
            span.end_column,
            annotation.ty.as_deref().unwrap_or("<unresolved>"),
            marker
        );
    }
}

fn render_json(program: &Program, analysis: &Analysis) -> Result<String> {
    let annotations: Vec<_> = analysis
        .annotations
        .iter()
        .map(|(id, annotation)| {
            json!({
                "id": id,
                "span": annotation.span,
                "type": annotation.ty,
                "has_error": annotation.has_error,
            })
        })
        .collect();
    let classes: Vec<_> = analysis
        .types
        .classes()
        .map(|name| json!({ "name": name, "parent": analysis.types.parent_of(name) }))
        .collect();

    let document = json!({
        "classes": classes,
        "expressions": program.expression_count,
        "diagnostics": analysis.diagnostics.entries(),
        "annotations": annotations,
    });
    serde_json::to_string_pretty(&document).context("failed to serialize analysis")
}

fn print_diagnostic(source: &SourceFile, lines: &[&str], diagnostic: &Diagnostic) {
    eprintln!("error[{}]: {}", diagnostic.kind, diagnostic.message);
    let Some(span) = diagnostic.span.filter(|span| span.line > 0) else {
        return;
    };
    eprintln!("  --> {}:{}:{}", source.path.display(), span.line, span.column);

    if let Some(raw_line) = lines.get(span.line.saturating_sub(1)) {
        let display_line = raw_line.replace('\t', "    ");
        eprintln!("   | {}", display_line);

        let mut caret_line = String::from("   | ");
        for ch in raw_line.chars().take(span.column.saturating_sub(1)) {
            match ch {
                '\t' => caret_line.push_str("    "),
                _ => caret_line.push(' '),
            }
        }

        let highlight_len = if span.end_line == span.line {
            span.end_column
                .saturating_sub(span.column)
                .saturating_add(1)
        } else {
            display_line.chars().count().saturating_sub(
                span.column
                    .saturating_sub(1)
                    .min(display_line.chars().count()),
            )
        };

        caret_line.push_str(&"^".repeat(highlight_len.max(1)));
        eprintln!("{}", caret_line);
    }
}
