//! File-system abstraction the compiler reads sources through and writes outputs to.

use std::sync::Arc;

use crate::internal::errors::Result;
use crate::internal::options::ScriptTarget;
use crate::source::SourceFile;

mod fs;
mod virtual_host;

pub use fs::FsHost;
pub use virtual_host::{CapturedOutput, DeclarationOutput, VirtualFileHost};

/// The part of a host needed to render diagnostics.
pub trait FormatDiagnosticsHost {
  fn current_directory(&self) -> String;
  fn canonical_file_name(&self, file_name: &str) -> String;
  fn new_line(&self) -> String;
}

pub trait CompilerHost: FormatDiagnosticsHost {
  fn file_exists(&self, path: &str) -> bool;

  fn directory_exists(&self, path: &str) -> bool;

  /// `Ok(None)` when the file does not exist.
  fn read_file(&self, path: &str) -> Result<Option<String>>;

  fn get_source_file(&self, path: &str, target: ScriptTarget) -> Result<Option<Arc<SourceFile>>>;

  fn write_file(&mut self, path: &str, text: &str, write_bom: bool) -> Result<()>;

  fn use_case_sensitive_file_names(&self) -> bool;
}
