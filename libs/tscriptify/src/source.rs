use crate::diagnostic::DiagnosticSpan;
use crate::internal::options::ScriptTarget;
use crate::internal::path::{is_declaration_file_name, script_kind_from_file_name, ScriptKind};

/// In-memory source text handed to a compiler, with the line table used to turn byte offsets
/// into line and column positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
  file_name: String,
  text: String,
  target: ScriptTarget,
  script_kind: ScriptKind,
  is_declaration_file: bool,
  line_starts: Vec<usize>,
}

impl SourceFile {
  pub fn new(
    file_name: impl Into<String>,
    text: impl Into<String>,
    target: ScriptTarget,
    script_kind: ScriptKind,
  ) -> Self {
    let file_name = file_name.into();
    let text = text.into();
    let line_starts = compute_line_starts(&text);
    SourceFile {
      is_declaration_file: is_declaration_file_name(&file_name),
      file_name,
      text,
      target,
      script_kind: script_kind.ensure_known(),
      line_starts,
    }
  }

  /// Build a source file whose script kind is inferred from `file_name`.
  pub fn from_file_name(
    file_name: impl Into<String>,
    text: impl Into<String>,
    target: ScriptTarget,
  ) -> Self {
    let file_name = file_name.into();
    let kind = script_kind_from_file_name(&file_name);
    SourceFile::new(file_name, text, target, kind)
  }

  pub fn file_name(&self) -> &str {
    &self.file_name
  }

  pub fn text(&self) -> &str {
    &self.text
  }

  pub fn target(&self) -> ScriptTarget {
    self.target
  }

  pub fn script_kind(&self) -> ScriptKind {
    self.script_kind
  }

  pub fn is_declaration_file(&self) -> bool {
    self.is_declaration_file
  }

  pub fn line_starts(&self) -> &[usize] {
    &self.line_starts
  }

  /// Zero-based line and character of byte offset `pos`. Characters are counted in UTF-16 code
  /// units, matching editor column conventions.
  pub fn line_and_character(&self, pos: usize) -> (usize, usize) {
    let pos = floor_char_boundary(&self.text, pos.min(self.text.len()));
    let line = match self.line_starts.binary_search(&pos) {
      Ok(line) => line,
      Err(next) => next.saturating_sub(1),
    };
    let line_start = self.line_starts.get(line).copied().unwrap_or(0);
    let character = self.text[line_start..pos].encode_utf16().count();
    (line, character)
  }

  pub fn span(&self, start: usize, length: usize) -> DiagnosticSpan {
    let (line, character) = self.line_and_character(start);
    DiagnosticSpan {
      file: self.file_name.clone(),
      start,
      length,
      line,
      character,
    }
  }
}

fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
  while pos > 0 && !text.is_char_boundary(pos) {
    pos -= 1;
  }
  pos
}

/// Byte offsets at which each line begins. `\r\n`, `\r`, `\n`, U+2028 and U+2029 end a line.
pub fn compute_line_starts(text: &str) -> Vec<usize> {
  let mut starts = vec![0];
  let mut chars = text.char_indices().peekable();
  while let Some((idx, ch)) = chars.next() {
    match ch {
      '\r' => {
        if let Some(&(_, '\n')) = chars.peek() {
          chars.next();
          starts.push(idx + 2);
        } else {
          starts.push(idx + 1);
        }
      }
      '\n' => starts.push(idx + 1),
      '\u{2028}' | '\u{2029}' => starts.push(idx + ch.len_utf8()),
      _ => {}
    }
  }
  starts
}
