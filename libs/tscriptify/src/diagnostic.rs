use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::host::FormatDiagnosticsHost;
use crate::internal::path::convert_to_relative_path;
use crate::source::SourceFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticCategory {
  Warning,
  Error,
  Suggestion,
  Message,
}

impl DiagnosticCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      DiagnosticCategory::Warning => "warning",
      DiagnosticCategory::Error => "error",
      DiagnosticCategory::Suggestion => "suggestion",
      DiagnosticCategory::Message => "message",
    }
  }
}

impl fmt::Display for DiagnosticCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Location of a diagnostic. `start` and `length` are byte offsets into the file text, `line`
/// and `character` are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSpan {
  pub file: String,
  pub start: usize,
  pub length: usize,
  pub line: usize,
  pub character: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
  pub category: DiagnosticCategory,
  pub code: u32,
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub span: Option<DiagnosticSpan>,
}

impl Diagnostic {
  pub fn new(category: DiagnosticCategory, code: u32, message: impl Into<String>) -> Self {
    Diagnostic {
      category,
      code,
      message: message.into(),
      span: None,
    }
  }

  pub fn error(code: u32, message: impl Into<String>) -> Self {
    Self::new(DiagnosticCategory::Error, code, message)
  }

  pub fn warning(code: u32, message: impl Into<String>) -> Self {
    Self::new(DiagnosticCategory::Warning, code, message)
  }

  pub fn with_span(mut self, span: DiagnosticSpan) -> Self {
    self.span = Some(span);
    self
  }

  /// Attach a location inside `source`.
  pub fn at(self, source: &SourceFile, start: usize, length: usize) -> Self {
    self.with_span(source.span(start, length))
  }

  pub fn is_error(&self) -> bool {
    self.category == DiagnosticCategory::Error
  }

  pub fn file(&self) -> Option<&str> {
    self.span.as_ref().map(|span| span.file.as_str())
  }
}

/// Render one diagnostic as `file(line,col): category TScode: message` followed by the host's
/// newline, with the file made relative to the host's current directory.
pub fn format_diagnostic(diagnostic: &Diagnostic, host: &dyn FormatDiagnosticsHost) -> String {
  let new_line = host.new_line();
  let body = format!(
    "{} TS{}: {}{}",
    diagnostic.category, diagnostic.code, diagnostic.message, new_line
  );
  match &diagnostic.span {
    Some(span) => {
      let current_directory = host.current_directory();
      let relative = convert_to_relative_path(&span.file, &current_directory, |name| {
        host.canonical_file_name(name)
      });
      format!(
        "{}({},{}): {}",
        relative,
        span.line + 1,
        span.character + 1,
        body
      )
    }
    None => body,
  }
}

pub fn format_diagnostics(diagnostics: &[Diagnostic], host: &dyn FormatDiagnosticsHost) -> String {
  diagnostics
    .iter()
    .map(|diagnostic| format_diagnostic(diagnostic, host))
    .collect()
}

fn compare_diagnostics(a: &Diagnostic, b: &Diagnostic) -> Ordering {
  let position = |d: &Diagnostic| d.span.as_ref().map(|span| (span.start, span.length));
  a.file()
    .cmp(&b.file())
    .then_with(|| position(a).cmp(&position(b)))
    .then_with(|| a.code.cmp(&b.code))
    .then_with(|| a.message.cmp(&b.message))
}

/// Sort by file, position, code and message, dropping entries that compare equal.
pub fn sort_and_deduplicate_diagnostics(mut diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
  diagnostics.sort_by(compare_diagnostics);
  diagnostics.dedup_by(|next, prev| compare_diagnostics(prev, next) == Ordering::Equal);
  diagnostics
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::internal::options::ScriptTarget;

  struct FixedHost;

  impl FormatDiagnosticsHost for FixedHost {
    fn current_directory(&self) -> String {
      "/work/project".to_owned()
    }

    fn canonical_file_name(&self, file_name: &str) -> String {
      file_name.to_owned()
    }

    fn new_line(&self) -> String {
      "\n".to_owned()
    }
  }

  #[test]
  fn formats_located_diagnostics_relative_to_the_host() {
    let source = SourceFile::from_file_name(
      "/work/project/src/a.ts",
      "let x = 1;\nlet y = ;",
      ScriptTarget::Es3,
    );
    let diagnostic = Diagnostic::error(1109, "Expression expected.").at(&source, 19, 1);
    assert_eq!(
      format_diagnostic(&diagnostic, &FixedHost),
      "src/a.ts(2,9): error TS1109: Expression expected.\n"
    );
  }

  #[test]
  fn formats_global_diagnostics_without_location() {
    let diagnostic = Diagnostic::error(6046, "Argument for '--target' option must be: 'es3'.");
    assert_eq!(
      format_diagnostic(&diagnostic, &FixedHost),
      "error TS6046: Argument for '--target' option must be: 'es3'.\n"
    );
    let warning = Diagnostic::warning(90001, "note");
    assert_eq!(
      format_diagnostics(&[diagnostic, warning], &FixedHost),
      "error TS6046: Argument for '--target' option must be: 'es3'.\nwarning TS90001: note\n"
    );
  }

  #[test]
  fn sorting_groups_by_file_and_drops_duplicates() {
    let source = SourceFile::from_file_name("b.ts", "aaaa\nbbbb", ScriptTarget::Es3);
    let late = Diagnostic::error(1005, "';' expected.").at(&source, 6, 1);
    let early = Diagnostic::error(1005, "';' expected.").at(&source, 1, 1);
    let global = Diagnostic::error(6046, "bad option");
    let sorted = sort_and_deduplicate_diagnostics(vec![
      late.clone(),
      early.clone(),
      global.clone(),
      late.clone(),
    ]);
    assert_eq!(sorted, vec![global, early, late]);
  }

  #[test]
  fn serializes_in_camel_case() {
    let source = SourceFile::from_file_name("a.ts", "x", ScriptTarget::Es3);
    let diagnostic = Diagnostic::error(1, "m").at(&source, 0, 1);
    let value = serde_json::to_value(&diagnostic).expect("serialize");
    assert_eq!(value["category"], "error");
    assert_eq!(value["span"]["character"], 0);
    let without_span = serde_json::to_value(Diagnostic::warning(2, "w")).expect("serialize");
    assert!(without_span.get("span").is_none());
  }
}
