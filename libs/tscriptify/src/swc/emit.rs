use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use swc_core::base::config::Options;
use swc_core::base::{Compiler as SwcTransformer, TransformOutput as SwcOutput};
use swc_core::common::errors::Handler;
use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, Globals, SourceMap, Spanned, GLOBALS};
use swc_core::ecma::ast::EsVersion;
use swc_core::ecma::parser::{parse_file_as_program, Syntax};
use tracing::{debug, trace};

use super::config::{swc_options, ISOLATED_DECLARATIONS_KEY};
use crate::diagnostic::{Diagnostic, DiagnosticCategory};
use crate::internal::errors::{Error, Result};
use crate::internal::options::{CompilerOptions, NewLine};
use crate::internal::path::ScriptKind;
use crate::source::SourceFile;

/// Code for errors reported by the parser.
pub const PARSE_ERROR: u32 = 1005;
/// Code for errors reported while stripping types, lowering or generating code.
pub const TRANSFORM_ERROR: u32 = 90001;
/// Code for errors reported while generating isolated declarations.
pub const DECLARATION_ERROR: u32 = 9007;

/// Text produced by one swc run. `text` is `None` when swc reported errors.
#[derive(Debug, Default)]
pub(super) struct Emitted {
  pub text: Option<String>,
  pub diagnostics: Vec<Diagnostic>,
}

fn parser_syntax(source: &SourceFile) -> Option<Syntax> {
  match source.script_kind() {
    ScriptKind::Js | ScriptKind::Jsx => {
      let mut syntax = Syntax::Es(Default::default());
      if let Syntax::Es(config) = &mut syntax {
        config.jsx = source.script_kind() == ScriptKind::Jsx;
      }
      Some(syntax)
    }
    ScriptKind::Ts | ScriptKind::Tsx | ScriptKind::Unknown => {
      let mut syntax = Syntax::Typescript(Default::default());
      if let Syntax::Typescript(config) = &mut syntax {
        config.tsx = source.script_kind() == ScriptKind::Tsx;
        config.decorators = true;
        config.dts = source.is_declaration_file();
      }
      Some(syntax)
    }
    ScriptKind::Json => None,
  }
}

fn load(cm: &Lrc<SourceMap>, source: &SourceFile) -> Lrc<swc_core::common::SourceFile> {
  cm.new_source_file(
    FileName::Real(PathBuf::from(source.file_name())).into(),
    source.text().to_owned(),
  )
}

/// Parse `source` and report every error the parser found, recovered or fatal.
pub(super) fn syntax_diagnostics(source: &SourceFile) -> Vec<Diagnostic> {
  let Some(syntax) = parser_syntax(source) else {
    return Vec::new();
  };
  let cm: Lrc<SourceMap> = Default::default();
  let fm = load(&cm, source);
  let mut recovered = Vec::new();
  let fatal = GLOBALS.set(&Globals::new(), || {
    parse_file_as_program(&fm, syntax, EsVersion::latest(), None, &mut recovered).err()
  });

  recovered
    .into_iter()
    .chain(fatal)
    .map(|error| {
      let span = error.span();
      let start = span.lo().0.saturating_sub(fm.start_pos.0) as usize;
      let end = span.hi().0.saturating_sub(fm.start_pos.0) as usize;
      Diagnostic::error(PARSE_ERROR, error.kind().msg()).at(
        source,
        start,
        end.saturating_sub(start),
      )
    })
    .collect()
}

/// Sink for swc's rendered diagnostics.
#[derive(Debug, Clone, Default)]
struct Reported(Arc<Mutex<Vec<u8>>>);

impl io::Write for Reported {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self
      .0
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl Reported {
  fn text(&self) -> String {
    let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
    String::from_utf8_lossy(&bytes).into_owned()
  }
}

/// Turn swc's rendered report back into diagnostics. Each report starts with a
/// `error: message` or `warning: message` line and may be followed by a `--> file:line:col`
/// location line.
fn parse_report(report: &str, source: &SourceFile, error_code: u32) -> Vec<Diagnostic> {
  let mut diagnostics: Vec<Diagnostic> = Vec::new();
  let mut located = true;
  for line in report.lines() {
    let trimmed = line.trim_start();
    if let Some(location) = trimmed.strip_prefix("--> ") {
      if located {
        continue;
      }
      located = true;
      let Some((line_no, column)) = parse_location(location) else {
        continue;
      };
      if let Some(last) = diagnostics.pop() {
        let start = offset_of(source, line_no, column);
        diagnostics.push(last.at(source, start, 0));
      }
      continue;
    }

    let (category, rest) = if let Some(rest) = line.strip_prefix("error") {
      (DiagnosticCategory::Error, rest)
    } else if let Some(rest) = line.strip_prefix("warning") {
      (DiagnosticCategory::Warning, rest)
    } else {
      continue;
    };
    let Some((_, message)) = rest.split_once(": ") else {
      continue;
    };
    let code = match category {
      DiagnosticCategory::Error => error_code,
      _ => TRANSFORM_ERROR,
    };
    diagnostics.push(Diagnostic::new(category, code, message.trim()));
    located = false;
  }
  diagnostics
}

/// One-based line and column from the tail of `file:line:col`.
fn parse_location(location: &str) -> Option<(usize, usize)> {
  let mut parts = location.trim().rsplitn(3, ':');
  let column = parts.next()?.parse().ok()?;
  let line = parts.next()?.parse().ok()?;
  Some((line, column))
}

fn offset_of(source: &SourceFile, line: usize, column: usize) -> usize {
  let Some(&line_start) = source.line_starts().get(line.saturating_sub(1)) else {
    return source.text().len();
  };
  source.text()[line_start..]
    .char_indices()
    .nth(column.saturating_sub(1))
    .map(|(idx, _)| line_start + idx)
    .unwrap_or(source.text().len())
}

fn with_new_line(text: String, new_line: Option<NewLine>) -> String {
  match new_line {
    Some(NewLine::CarriageReturnLineFeed) => text.replace("\r\n", "\n").replace('\n', "\r\n"),
    _ => text,
  }
}

/// Run swc over `source`, returning its output when it reported no errors.
fn run(
  source: &SourceFile,
  options: &CompilerOptions,
  declarations: bool,
) -> Result<(Option<SwcOutput>, Vec<Diagnostic>)> {
  let swc_options: Options = serde_json::from_value(swc_options(source, options, declarations))
    .map_err(|err| Error::backend(format!("Invalid swc options: {err}")))?;
  let cm: Lrc<SourceMap> = Default::default();
  let fm = load(&cm, source);
  let reported = Reported::default();
  let handler = Handler::with_emitter_writer(Box::new(reported.clone()), Some(cm.clone()));
  let transformer = SwcTransformer::new(cm.clone());

  trace!(file = source.file_name(), declarations, "running swc");
  let outcome = GLOBALS.set(&Globals::new(), || {
    transformer.process_js_file(fm, &handler, &swc_options)
  });

  let error_code = if declarations {
    DECLARATION_ERROR
  } else {
    TRANSFORM_ERROR
  };
  let mut diagnostics = parse_report(&reported.text(), source, error_code);
  match outcome {
    Ok(output) if !handler.has_errors() => Ok((Some(output), diagnostics)),
    Ok(_) => {
      debug!(file = source.file_name(), "swc reported errors");
      Ok((None, diagnostics))
    }
    Err(err) => {
      debug!(file = source.file_name(), error = %err, "swc failed");
      if !diagnostics.iter().any(Diagnostic::is_error) {
        diagnostics.push(Diagnostic::error(error_code, format!("{err:#}")).at(source, 0, 0));
      }
      Ok((None, diagnostics))
    }
  }
}

/// JavaScript for `source`: types stripped, lowered to the target and converted to the
/// configured module format.
pub(super) fn emit_javascript(source: &SourceFile, options: &CompilerOptions) -> Result<Emitted> {
  let (output, diagnostics) = run(source, options, false)?;
  Ok(Emitted {
    text: output.map(|output| with_new_line(output.code, options.new_line)),
    diagnostics,
  })
}

/// Declaration text for `source`, built from its explicit annotations alone.
pub(super) fn emit_declarations(source: &SourceFile, options: &CompilerOptions) -> Result<Emitted> {
  let (output, diagnostics) = run(source, options, true)?;
  let Some(output) = output else {
    return Ok(Emitted {
      text: None,
      diagnostics,
    });
  };
  let declarations = output
    .output
    .as_deref()
    .and_then(|extra| serde_json::from_str::<Value>(extra).ok())
    .and_then(|extra| {
      extra
        .get(ISOLATED_DECLARATIONS_KEY)
        .and_then(Value::as_str)
        .map(str::to_owned)
    })
    .ok_or_else(|| {
      Error::backend(format!(
        "swc produced no declarations for '{}'",
        source.file_name()
      ))
    })?;
  Ok(Emitted {
    text: Some(with_new_line(declarations, options.new_line)),
    diagnostics,
  })
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::internal::options::ScriptTarget;

  #[test]
  fn reports_are_split_into_located_diagnostics() {
    let source = SourceFile::from_file_name("a.ts", "let a = 1;\nclass {}\n", ScriptTarget::Es3);
    let report = "error: Expected ident\n --> a.ts:2:7\n  |\n2 | class {}\n  |       ^\n\nwarning: unused\n";
    let diagnostics = parse_report(report, &source, TRANSFORM_ERROR);
    assert_eq!(diagnostics.len(), 2);
    assert_eq!(diagnostics[0].message, "Expected ident");
    assert_eq!(diagnostics[0].code, TRANSFORM_ERROR);
    let span = diagnostics[0].span.as_ref().expect("span");
    assert_eq!((span.line, span.character), (1, 6));
    assert_eq!(diagnostics[1].category, DiagnosticCategory::Warning);
    assert!(diagnostics[1].span.is_none());
  }

  #[test]
  fn crlf_is_applied_once() {
    assert_eq!(
      with_new_line("a\nb\r\n".to_owned(), Some(NewLine::CarriageReturnLineFeed)),
      "a\r\nb\r\n"
    );
    assert_eq!(with_new_line("a\n".to_owned(), None), "a\n");
  }

  #[test]
  fn parse_errors_carry_their_position() {
    let source = SourceFile::from_file_name("a.ts", "let a = (1;\n", ScriptTarget::Es3);
    let diagnostics = syntax_diagnostics(&source);
    assert!(!diagnostics.is_empty());
    assert!(diagnostics.iter().all(|diagnostic| diagnostic.code == PARSE_ERROR));
    let span = diagnostics[0].span.as_ref().expect("span");
    assert_eq!(span.file, "a.ts");
    assert_eq!(span.line, 0);
  }

  #[test]
  fn json_sources_are_not_parsed() {
    let source = SourceFile::from_file_name("a.json", "{ not json", ScriptTarget::Es3);
    assert!(syntax_diagnostics(&source).is_empty());
  }
}
