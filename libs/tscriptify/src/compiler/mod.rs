//! Seam between the adapter and whichever compiler backs it.

use crate::diagnostic::Diagnostic;
use crate::host::CompilerHost;
use crate::internal::errors::Result;
use crate::internal::options::CompilerOptions;
use crate::source::SourceFile;

mod session;

pub use session::{shared_session, ProjectSession, SessionEmit};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmitResult {
  pub emit_skipped: bool,
  pub diagnostics: Vec<Diagnostic>,
  pub emitted_files: Vec<String>,
}

/// A compilation unit built over a set of root files.
pub trait Program: Send {
  fn root_file_names(&self) -> &[String];

  /// Syntactic, semantic and option diagnostics gathered before emit.
  fn pre_emit_diagnostics(&self) -> Vec<Diagnostic>;

  /// Emit `target` (or every root when `None`) through `host`.
  fn emit(&self, target: Option<&SourceFile>, host: &mut dyn CompilerHost) -> Result<EmitResult>;

  /// Files taken unchanged from the program this one was built from.
  fn reused_file_count(&self) -> usize;
}

pub trait Compiler: Send + Sync {
  type Program: Program;

  /// Build a program for `root_names`. `old_program` is only borrowed, so a failure leaves the
  /// caller's previous program intact.
  fn create_program(
    &self,
    root_names: &[String],
    options: &CompilerOptions,
    host: &dyn CompilerHost,
    old_program: Option<&Self::Program>,
  ) -> Result<Self::Program>;
}
