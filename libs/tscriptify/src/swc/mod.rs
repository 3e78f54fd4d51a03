//! Default [`Compiler`] backed by swc. Each root is parsed for syntax errors when the program is
//! built and compiled in isolation at emit: swc strips types, lowers to the configured target,
//! converts modules and writes inline source maps. There is no type checker, so files are
//! checked one at a time and imports are left to the runtime.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::compiler::{Compiler, EmitResult, Program};
use crate::diagnostic::{sort_and_deduplicate_diagnostics, Diagnostic};
use crate::host::CompilerHost;
use crate::internal::errors::{Error, Result};
use crate::internal::options::CompilerOptions;
use crate::internal::path::{change_extension, extension_of, normalize_path, ScriptKind};
use crate::source::SourceFile;

mod config;
mod emit;

pub use emit::{DECLARATION_ERROR, PARSE_ERROR, TRANSFORM_ERROR};

#[derive(Debug, Clone, Copy, Default)]
pub struct SwcCompiler;

impl SwcCompiler {
  pub fn new() -> Self {
    SwcCompiler
  }
}

/// A root file with the errors swc's parser found in it.
#[derive(Debug)]
pub struct ParsedFile {
  source: Arc<SourceFile>,
  syntactic: Vec<Diagnostic>,
}

impl ParsedFile {
  pub fn parse(source: Arc<SourceFile>) -> Self {
    let syntactic = emit::syntax_diagnostics(&source);
    ParsedFile { source, syntactic }
  }

  pub fn source(&self) -> &Arc<SourceFile> {
    &self.source
  }

  pub fn syntactic_diagnostics(&self) -> &[Diagnostic] {
    &self.syntactic
  }
}

/// Output of one file, held until every target compiled cleanly.
struct PendingFile {
  js_name: String,
  js: String,
  declaration: Option<(String, String)>,
}

#[derive(Debug)]
pub struct SwcProgram {
  root_names: Vec<String>,
  options: CompilerOptions,
  files: Vec<Arc<ParsedFile>>,
  index: HashMap<String, usize>,
  /// Missing roots.
  program_diagnostics: Vec<Diagnostic>,
  reused: usize,
}

impl SwcProgram {
  pub fn files(&self) -> &[Arc<ParsedFile>] {
    &self.files
  }

  pub fn file(&self, name: &str) -> Option<&Arc<ParsedFile>> {
    self.index.get(name).map(|&idx| &self.files[idx])
  }

  /// Compile `file`, returning `None` when swc rejected it.
  fn compile_file(
    &self,
    file: &ParsedFile,
    result: &mut EmitResult,
  ) -> Result<Option<PendingFile>> {
    let source = file.source();
    let name = source.file_name();

    let js = emit::emit_javascript(source, &self.options)?;
    result.diagnostics.extend(js.diagnostics);
    let Some(js_text) = js.text else {
      return Ok(None);
    };

    let declares = matches!(source.script_kind(), ScriptKind::Ts | ScriptKind::Tsx);
    let declaration = if self.options.declaration && declares {
      let dts = emit::emit_declarations(source, &self.options)?;
      result.diagnostics.extend(dts.diagnostics);
      dts.text.map(|text| (declaration_file_name(name), text))
    } else {
      None
    };

    Ok(Some(PendingFile {
      js_name: output_file_name(name),
      js: js_text,
      declaration,
    }))
  }
}

impl Program for SwcProgram {
  fn root_file_names(&self) -> &[String] {
    &self.root_names
  }

  fn pre_emit_diagnostics(&self) -> Vec<Diagnostic> {
    let mut diagnostics = self.program_diagnostics.clone();
    for file in &self.files {
      diagnostics.extend(file.syntactic.iter().cloned());
    }
    sort_and_deduplicate_diagnostics(diagnostics)
  }

  fn emit(&self, target: Option<&SourceFile>, host: &mut dyn CompilerHost) -> Result<EmitResult> {
    let targets: Vec<Arc<ParsedFile>> = match target {
      Some(target) => {
        let key = host.canonical_file_name(&normalize_path(target.file_name()));
        let file = self.file(&key).ok_or_else(|| {
          Error::backend(format!(
            "File '{}' is not part of the program",
            target.file_name()
          ))
        })?;
        vec![Arc::clone(file)]
      }
      None => self
        .root_names
        .iter()
        .filter_map(|name| self.file(&host.canonical_file_name(name)))
        .cloned()
        .collect(),
    };

    let mut result = EmitResult::default();
    if self.options.no_emit {
      result.emit_skipped = true;
      return Ok(result);
    }
    if targets.iter().any(|file| !file.syntactic.is_empty()) {
      debug!("syntax errors, skipping emit");
      result.emit_skipped = true;
      return Ok(result);
    }
    if self.options.no_emit_on_error
      && self.pre_emit_diagnostics().iter().any(Diagnostic::is_error)
    {
      debug!("noEmitOnError with errors, skipping emit");
      result.emit_skipped = true;
      return Ok(result);
    }

    let mut pending = Vec::new();
    for file in &targets {
      let source = file.source();
      if source.is_declaration_file() || source.script_kind() == ScriptKind::Json {
        trace!(file = source.file_name(), "nothing to emit");
        continue;
      }
      match self.compile_file(file, &mut result)? {
        Some(output) => pending.push(output),
        None => {
          debug!(file = source.file_name(), "swc rejected the file, skipping emit");
          result.emit_skipped = true;
          return Ok(result);
        }
      }
    }

    if self.options.no_emit_on_error && result.diagnostics.iter().any(Diagnostic::is_error) {
      debug!("noEmitOnError with declaration errors, skipping emit");
      result.emit_skipped = true;
      return Ok(result);
    }

    for output in pending {
      host
        .write_file(&output.js_name, &output.js, self.options.emit_bom)
        .map_err(|err| err.with_context(format!("Failed to write {}", output.js_name)))?;
      result.emitted_files.push(output.js_name);
      if let Some((dts_name, dts)) = output.declaration {
        host
          .write_file(&dts_name, &dts, self.options.emit_bom)
          .map_err(|err| err.with_context(format!("Failed to write {dts_name}")))?;
        result.emitted_files.push(dts_name);
      }
    }
    trace!(files = ?result.emitted_files, "emitted");
    Ok(result)
  }

  fn reused_file_count(&self) -> usize {
    self.reused
  }
}

impl Compiler for SwcCompiler {
  type Program = SwcProgram;

  fn create_program(
    &self,
    root_names: &[String],
    options: &CompilerOptions,
    host: &dyn CompilerHost,
    old_program: Option<&SwcProgram>,
  ) -> Result<SwcProgram> {
    let root_names: Vec<String> = root_names.iter().map(|name| normalize_path(name)).collect();
    let mut files: Vec<Arc<ParsedFile>> = Vec::new();
    let mut index = HashMap::new();
    let mut program_diagnostics = Vec::new();
    let mut reused = 0;

    for name in &root_names {
      let key = host.canonical_file_name(name);
      if index.contains_key(&key) {
        continue;
      }
      let Some(source) = host.get_source_file(name, options.target)? else {
        trace!(file = name.as_str(), "not found");
        program_diagnostics.push(Diagnostic::error(6053, format!("File '{name}' not found.")));
        continue;
      };

      let previous = old_program
        .and_then(|old| old.file(&key))
        .filter(|previous| {
          previous.source.text() == source.text() && previous.source.target() == source.target()
        });
      let parsed = match previous {
        Some(previous) => {
          trace!(file = name.as_str(), "reusing parsed file");
          reused += 1;
          Arc::clone(previous)
        }
        None => {
          trace!(file = name.as_str(), "parsing");
          Arc::new(ParsedFile::parse(source))
        }
      };
      index.insert(key, files.len());
      files.push(parsed);
    }

    debug!(files = files.len(), reused, "built program");
    Ok(SwcProgram {
      root_names,
      options: options.clone(),
      files,
      index,
      program_diagnostics,
      reused,
    })
  }
}

/// JavaScript output path for `file_name`.
pub fn output_file_name(file_name: &str) -> String {
  let extension = match extension_of(&file_name.to_ascii_lowercase()) {
    ".mts" | ".mjs" => ".mjs",
    ".cts" | ".cjs" => ".cjs",
    _ => ".js",
  };
  change_extension(file_name, extension)
}

/// Declaration output path for `file_name`.
pub fn declaration_file_name(file_name: &str) -> String {
  let extension = match extension_of(&file_name.to_ascii_lowercase()) {
    ".mts" | ".mjs" => ".d.mts",
    ".cts" | ".cjs" => ".d.cts",
    _ => ".d.ts",
  };
  change_extension(file_name, extension)
}
