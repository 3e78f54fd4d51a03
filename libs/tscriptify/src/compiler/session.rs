use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::debug;

use super::{Compiler, EmitResult, Program};
use crate::diagnostic::Diagnostic;
use crate::host::CompilerHost;
use crate::internal::errors::{Error, Result};
use crate::internal::options::CompilerOptions;
use crate::source::SourceFile;
use crate::swc::SwcCompiler;

/// Caller-owned compilation state. Each compile builds a new program from the one retained by
/// the previous compile, then retains the new one. The lock is held from program creation
/// through emit, so compiles sharing a session run one at a time.
pub struct ProjectSession<C: Compiler = SwcCompiler> {
  compiler: C,
  program: Mutex<Option<C::Program>>,
}

/// What one compile produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEmit {
  pub pre_emit_diagnostics: Vec<Diagnostic>,
  pub emit_result: EmitResult,
  pub reused_files: usize,
}

impl<C: Compiler + Default> Default for ProjectSession<C> {
  fn default() -> Self {
    ProjectSession::new(C::default())
  }
}

impl<C: Compiler> ProjectSession<C> {
  pub fn new(compiler: C) -> Self {
    ProjectSession {
      compiler,
      program: Mutex::new(None),
    }
  }

  pub fn compiler(&self) -> &C {
    &self.compiler
  }

  pub fn has_program(&self) -> bool {
    self.recovering_lock().is_some()
  }

  /// Drop the retained program. Also clears a poisoned lock.
  pub fn reset(&self) {
    *self.recovering_lock() = None;
    self.program.clear_poison();
  }

  /// Create a program for `root_names` on top of the retained one, emit `target` and keep the
  /// new program. A failed creation leaves the retained program in place.
  pub fn compile(
    &self,
    root_names: &[String],
    options: &CompilerOptions,
    host: &mut dyn CompilerHost,
    target: &SourceFile,
  ) -> Result<SessionEmit> {
    let mut retained = self
      .program
      .lock()
      .map_err(|err| Error::backend(format!("Project session mutex poisoned: {err}")))?;

    let program = self
      .compiler
      .create_program(root_names, options, &*host, retained.as_ref())
      .map_err(|err| err.with_context("Failed to create program"))?;
    let reused_files = program.reused_file_count();
    debug!(
      roots = root_names.len(),
      reused_files,
      had_previous = retained.is_some(),
      "created program"
    );
    let program = retained.insert(program);

    let emit_result = program.emit(Some(target), host)?;
    let pre_emit_diagnostics = program.pre_emit_diagnostics();
    debug!(
      emit_skipped = emit_result.emit_skipped,
      emitted = emit_result.emitted_files.len(),
      diagnostics = pre_emit_diagnostics.len() + emit_result.diagnostics.len(),
      "emitted program"
    );

    Ok(SessionEmit {
      pre_emit_diagnostics,
      emit_result,
      reused_files,
    })
  }

  fn recovering_lock(&self) -> MutexGuard<'_, Option<C::Program>> {
    self.program.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

/// Process-wide session used by [`crate::create`].
pub fn shared_session() -> Arc<ProjectSession<SwcCompiler>> {
  static SHARED_SESSION: OnceLock<Arc<ProjectSession<SwcCompiler>>> = OnceLock::new();
  Arc::clone(SHARED_SESSION.get_or_init(|| Arc::new(ProjectSession::new(SwcCompiler::new()))))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::host::{FsHost, VirtualFileHost};
  use crate::internal::options::ScriptTarget;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[derive(Default)]
  struct CountingCompiler {
    created: AtomicUsize,
  }

  struct CountingProgram {
    roots: Vec<String>,
    generation: usize,
  }

  impl Program for CountingProgram {
    fn root_file_names(&self) -> &[String] {
      &self.roots
    }

    fn pre_emit_diagnostics(&self) -> Vec<Diagnostic> {
      Vec::new()
    }

    fn emit(&self, target: Option<&SourceFile>, host: &mut dyn CompilerHost) -> Result<EmitResult> {
      let name = target.map(|t| t.file_name()).unwrap_or("none");
      if name == "panic.ts" {
        panic!("backend bug");
      }
      host.write_file("out.js", &format!("{name}#{}", self.generation), false)?;
      Ok(EmitResult::default())
    }

    fn reused_file_count(&self) -> usize {
      self.generation.saturating_sub(1)
    }
  }

  impl Compiler for CountingCompiler {
    type Program = CountingProgram;

    fn create_program(
      &self,
      root_names: &[String],
      _options: &CompilerOptions,
      _host: &dyn CompilerHost,
      old_program: Option<&CountingProgram>,
    ) -> Result<CountingProgram> {
      if root_names.iter().any(|name| name == "fail.ts") {
        return Err(Error::backend("refused"));
      }
      self.created.fetch_add(1, Ordering::SeqCst);
      Ok(CountingProgram {
        roots: root_names.to_vec(),
        generation: old_program.map(|p| p.generation + 1).unwrap_or(1),
      })
    }
  }

  fn compile(session: &ProjectSession<CountingCompiler>, name: &str) -> Result<Option<String>> {
    let base = FsHost::with_current_directory(&CompilerOptions::default(), "/");
    let source = Arc::new(SourceFile::from_file_name(name, "", ScriptTarget::Es3));
    let mut host = VirtualFileHost::new(&base, name, Arc::clone(&source));
    session.compile(&[name.to_owned()], &CompilerOptions::default(), &mut host, &source)?;
    Ok(host.into_captured().output_text)
  }

  #[test]
  fn programs_chain_through_the_session() {
    let session = ProjectSession::new(CountingCompiler::default());
    assert!(!session.has_program());
    assert_eq!(compile(&session, "a.ts").expect("first").as_deref(), Some("a.ts#1"));
    assert_eq!(compile(&session, "b.ts").expect("second").as_deref(), Some("b.ts#2"));
    assert!(session.has_program());
    assert_eq!(session.compiler().created.load(Ordering::SeqCst), 2);

    session.reset();
    assert!(!session.has_program());
    assert_eq!(compile(&session, "c.ts").expect("third").as_deref(), Some("c.ts#1"));
  }

  #[test]
  fn failed_creation_keeps_the_previous_program() {
    let session = ProjectSession::new(CountingCompiler::default());
    compile(&session, "a.ts").expect("first");
    let err = compile(&session, "fail.ts").unwrap_err();
    assert_eq!(err.to_string(), "Failed to create program: refused");
    assert_eq!(compile(&session, "b.ts").expect("after failure").as_deref(), Some("b.ts#2"));
  }

  #[test]
  fn poisoned_sessions_fail_until_reset() {
    let session = ProjectSession::new(CountingCompiler::default());
    compile(&session, "a.ts").expect("first");
    let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
      let _ = compile(&session, "panic.ts");
    }));
    assert!(panicked.is_err());

    let err = compile(&session, "b.ts").unwrap_err();
    assert!(matches!(err, Error::Backend(_)), "{err}");
    assert!(session.has_program());

    session.reset();
    assert_eq!(compile(&session, "c.ts").expect("after reset").as_deref(), Some("c.ts#1"));
  }

  #[test]
  fn separate_sessions_do_not_share_programs() {
    let first = ProjectSession::new(CountingCompiler::default());
    let second = ProjectSession::new(CountingCompiler::default());
    compile(&first, "a.ts").expect("first");
    assert!(!second.has_program());
    assert_eq!(compile(&second, "a.ts").expect("second").as_deref(), Some("a.ts#1"));
  }

  #[test]
  fn shared_session_is_a_single_instance() {
    assert!(Arc::ptr_eq(&shared_session(), &shared_session()));
  }
}
