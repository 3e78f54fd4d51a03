use std::fmt;
use std::str::FromStr;

use super::errors::{Error, Result};

/// Output character encoding selected through the `charset` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
  #[default]
  Utf8,
  Utf16Le,
  Latin1,
  Ascii,
}

impl Charset {
  pub fn name(&self) -> &'static str {
    match self {
      Charset::Utf8 => "utf8",
      Charset::Utf16Le => "utf16le",
      Charset::Latin1 => "latin1",
      Charset::Ascii => "ascii",
    }
  }

  /// Encode `text` the way a Node stream would for this encoding. Latin-1 and ASCII keep the low
  /// byte of every UTF-16 code unit.
  pub fn encode(&self, text: &str) -> Vec<u8> {
    match self {
      Charset::Utf8 => text.as_bytes().to_vec(),
      Charset::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
      Charset::Latin1 | Charset::Ascii => text.encode_utf16().map(|unit| unit as u8).collect(),
    }
  }
}

impl FromStr for Charset {
  type Err = Error;

  fn from_str(value: &str) -> Result<Self> {
    match value.trim().to_ascii_lowercase().as_str() {
      "utf8" | "utf-8" => Ok(Charset::Utf8),
      "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Charset::Utf16Le),
      "latin1" | "binary" => Ok(Charset::Latin1),
      "ascii" => Ok(Charset::Ascii),
      other => Err(Error::invalid_options(format!(
        "Unknown charset '{other}'"
      ))),
    }
  }
}

impl fmt::Display for Charset {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
