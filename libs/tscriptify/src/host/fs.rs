use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use tracing::trace;

use super::{CompilerHost, FormatDiagnosticsHost};
use crate::internal::errors::{Error, Result};
use crate::internal::options::{CompilerOptions, ScriptTarget};
use crate::internal::path::{combine_paths, normalize_path};
use crate::source::SourceFile;

const UTF8_BOM: &str = "\u{feff}";

/// Compiler host backed by the real file system. Relative paths resolve against the host's
/// current directory.
#[derive(Debug, Clone)]
pub struct FsHost {
  current_directory: String,
  new_line: &'static str,
  case_sensitive: bool,
}

impl FsHost {
  pub fn new(options: &CompilerOptions) -> Self {
    let current_directory = std::env::current_dir()
      .map(|dir| dir.to_string_lossy().into_owned())
      .unwrap_or_default();
    Self::with_current_directory(options, current_directory)
  }

  pub fn with_current_directory(options: &CompilerOptions, dir: impl AsRef<str>) -> Self {
    let new_line = match options.new_line {
      Some(new_line) => new_line.as_str(),
      None if cfg!(windows) => "\r\n",
      None => "\n",
    };
    FsHost {
      current_directory: normalize_path(dir.as_ref()),
      new_line,
      case_sensitive: !cfg!(any(windows, target_os = "macos")),
    }
  }

  fn resolve(&self, path: &str) -> String {
    combine_paths(&self.current_directory, path)
  }
}

/// Decode file bytes, honouring UTF-8 and UTF-16 byte order marks.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
  match bytes {
    [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
    [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
    [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
    _ => String::from_utf8_lossy(bytes).into_owned(),
  }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
  let units: Vec<u16> = bytes
    .chunks_exact(2)
    .map(|pair| unit([pair[0], pair[1]]))
    .collect();
  String::from_utf16_lossy(&units)
}

impl FormatDiagnosticsHost for FsHost {
  fn current_directory(&self) -> String {
    self.current_directory.clone()
  }

  fn canonical_file_name(&self, file_name: &str) -> String {
    if self.case_sensitive {
      file_name.to_owned()
    } else {
      file_name.to_lowercase()
    }
  }

  fn new_line(&self) -> String {
    self.new_line.to_owned()
  }
}

impl CompilerHost for FsHost {
  fn file_exists(&self, path: &str) -> bool {
    Path::new(&self.resolve(path)).is_file()
  }

  fn directory_exists(&self, path: &str) -> bool {
    Path::new(&self.resolve(path)).is_dir()
  }

  fn read_file(&self, path: &str) -> Result<Option<String>> {
    let resolved = self.resolve(path);
    trace!(path = %resolved, "reading file");
    match fs::read(&resolved) {
      Ok(bytes) => Ok(Some(decode_text(&bytes))),
      Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
      Err(err) => Err(Error::io(format!("Failed to read {resolved}"), err)),
    }
  }

  fn get_source_file(&self, path: &str, target: ScriptTarget) -> Result<Option<Arc<SourceFile>>> {
    Ok(
      self
        .read_file(path)?
        .map(|text| Arc::new(SourceFile::from_file_name(path, text, target))),
    )
  }

  fn write_file(&mut self, path: &str, text: &str, write_bom: bool) -> Result<()> {
    let resolved = self.resolve(path);
    if let Some(parent) = Path::new(&resolved).parent() {
      fs::create_dir_all(parent)
        .map_err(|err| Error::io(format!("Failed to create directory for {resolved}"), err))?;
    }
    let mut contents = String::with_capacity(text.len() + UTF8_BOM.len());
    if write_bom {
      contents.push_str(UTF8_BOM);
    }
    contents.push_str(text);
    fs::write(&resolved, contents).map_err(|err| Error::io(format!("Failed to write {resolved}"), err))
  }

  fn use_case_sensitive_file_names(&self) -> bool {
    self.case_sensitive
  }
}
