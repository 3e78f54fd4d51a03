#[cfg(feature = "napi")]
#[macro_use]
extern crate napi_derive;

#[cfg(feature = "napi")]
mod bindings;
mod compiler;
mod diagnostic;
mod host;
mod internal;
mod source;
mod swc;
mod transform;

pub use compiler::{shared_session, Compiler, EmitResult, Program, ProjectSession, SessionEmit};
pub use diagnostic::{
  format_diagnostic, format_diagnostics, sort_and_deduplicate_diagnostics, Diagnostic,
  DiagnosticCategory, DiagnosticSpan,
};
pub use host::{
  CapturedOutput, CompilerHost, DeclarationOutput, FormatDiagnosticsHost, FsHost, VirtualFileHost,
};
pub use internal::charset::Charset;
pub use internal::errors::{Error, Result};
pub use internal::options::{
  fixup_options, CompilerOptions, ConfigMap, EffectiveOptions, ModuleKind, ModuleResolution,
  NewLine, OptionsBuilder, ScriptTarget,
};
pub use internal::path::{normalize_path, ScriptKind};
pub use source::SourceFile;
pub use swc::{
  declaration_file_name, output_file_name, ParsedFile, SwcCompiler, SwcProgram,
  DECLARATION_ERROR, PARSE_ERROR, TRANSFORM_ERROR,
};
pub use transform::{TransformOutput, Tscriptifier};

/// Adapter for `file_path` on the process-wide session.
pub fn create(file_path: impl Into<String>, options: Option<ConfigMap>) -> Result<Tscriptifier> {
  Tscriptifier::create(file_path, options.as_ref())
}
