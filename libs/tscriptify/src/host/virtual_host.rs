use std::sync::Arc;

use tracing::{trace, warn};

use super::{CompilerHost, FormatDiagnosticsHost};
use crate::internal::errors::Result;
use crate::internal::options::ScriptTarget;
use crate::internal::path::is_declaration_file_name;
use crate::source::SourceFile;

/// A declaration file the compiler wrote during emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationOutput {
  /// Path the caller gave the adapter, not the compiler's output path.
  pub file_path: String,
  pub output_path: String,
  pub text: String,
}

/// Everything the compiler tried to write through a [`VirtualFileHost`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
  pub output_text: Option<String>,
  pub output_path: Option<String>,
  pub declarations: Vec<DeclarationOutput>,
  /// Number of non-declaration writes. Only the last one is kept in `output_text`.
  pub output_writes: usize,
}

/// Serves one in-memory source for a single normalised path and delegates every other lookup to
/// `base`. Writes never reach `base`; they are captured for the caller.
pub struct VirtualFileHost<'a, H: CompilerHost + ?Sized> {
  base: &'a H,
  original_path: String,
  target_path: String,
  source: Arc<SourceFile>,
  captured: CapturedOutput,
}

impl<'a, H: CompilerHost + ?Sized> VirtualFileHost<'a, H> {
  pub fn new(base: &'a H, original_path: impl Into<String>, source: Arc<SourceFile>) -> Self {
    VirtualFileHost {
      base,
      original_path: original_path.into(),
      target_path: source.file_name().to_owned(),
      source,
      captured: CapturedOutput::default(),
    }
  }

  pub fn target_path(&self) -> &str {
    &self.target_path
  }

  pub fn captured(&self) -> &CapturedOutput {
    &self.captured
  }

  pub fn into_captured(self) -> CapturedOutput {
    self.captured
  }

  fn intercepts(&self, path: &str) -> bool {
    path == self.target_path
  }
}

impl<H: CompilerHost + ?Sized> FormatDiagnosticsHost for VirtualFileHost<'_, H> {
  fn current_directory(&self) -> String {
    self.base.current_directory()
  }

  fn canonical_file_name(&self, file_name: &str) -> String {
    self.base.canonical_file_name(file_name)
  }

  fn new_line(&self) -> String {
    self.base.new_line()
  }
}

impl<H: CompilerHost + ?Sized> CompilerHost for VirtualFileHost<'_, H> {
  fn file_exists(&self, path: &str) -> bool {
    if self.intercepts(path) {
      trace!(path, "virtual file_exists");
      return true;
    }
    self.base.file_exists(path)
  }

  fn directory_exists(&self, path: &str) -> bool {
    self.base.directory_exists(path)
  }

  fn read_file(&self, path: &str) -> Result<Option<String>> {
    if self.intercepts(path) {
      trace!(path, "virtual read_file");
      return Ok(Some(self.source.text().to_owned()));
    }
    trace!(path, "delegating read_file");
    self.base.read_file(path)
  }

  fn get_source_file(&self, path: &str, target: ScriptTarget) -> Result<Option<Arc<SourceFile>>> {
    if self.intercepts(path) {
      trace!(path, "virtual get_source_file");
      return Ok(Some(Arc::clone(&self.source)));
    }
    trace!(path, "delegating get_source_file");
    self.base.get_source_file(path, target)
  }

  fn write_file(&mut self, path: &str, text: &str, _write_bom: bool) -> Result<()> {
    if is_declaration_file_name(path) {
      trace!(path, "captured declaration output");
      self.captured.declarations.push(DeclarationOutput {
        file_path: self.original_path.clone(),
        output_path: path.to_owned(),
        text: text.to_owned(),
      });
      return Ok(());
    }

    if let Some(previous) = &self.captured.output_path {
      warn!(
        previous = %previous,
        path,
        "compiler wrote more than one output; keeping the last"
      );
    }
    trace!(path, "captured output");
    self.captured.output_text = Some(text.to_owned());
    self.captured.output_path = Some(path.to_owned());
    self.captured.output_writes += 1;
    Ok(())
  }

  fn use_case_sensitive_file_names(&self) -> bool {
    self.base.use_case_sensitive_file_names()
  }
}
