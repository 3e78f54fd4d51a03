use std::io;

/// Canonical error type used by the adapter and every compiler backend.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The compiler reported that no output was generated. The message is the formatted first
  /// diagnostic of the assembled list; the full list travels through the diagnostics event.
  #[error("{message}")]
  EmitSkipped { file_path: String, message: String },

  #[error("Invalid compiler options: {0}")]
  InvalidOptions(String),

  #[error("{context}: {source}")]
  Io {
    context: String,
    #[source]
    source: io::Error,
  },

  #[error("{0}")]
  Backend(String),
}

impl Error {
  pub fn backend(message: impl Into<String>) -> Self {
    Error::Backend(message.into())
  }

  pub fn invalid_options(message: impl Into<String>) -> Self {
    Error::InvalidOptions(message.into())
  }

  pub fn io(context: impl Into<String>, source: io::Error) -> Self {
    Error::Io {
      context: context.into(),
      source,
    }
  }

  /// Prefix the error with `context`, keeping the variant for emit failures so callers can
  /// still match on them.
  pub fn with_context(self, context: impl AsRef<str>) -> Self {
    match self {
      Error::EmitSkipped { .. } => self,
      Error::Io {
        context: inner,
        source,
      } => Error::Io {
        context: join_context(context.as_ref(), &inner),
        source,
      },
      Error::InvalidOptions(message) => {
        Error::InvalidOptions(join_context(context.as_ref(), &message))
      }
      Error::Backend(message) => Error::Backend(join_context(context.as_ref(), &message)),
    }
  }

  /// Whether this is the emission-skipped failure.
  pub fn is_emit_skipped(&self) -> bool {
    matches!(self, Error::EmitSkipped { .. })
  }
}

fn join_context(context: &str, message: &str) -> String {
  let mut joined = context.to_owned();
  if !joined.ends_with(':') {
    joined.push(':');
  }
  joined.push(' ');
  joined.push_str(message);
  joined
}

/// Result alias bound to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn context_is_joined_with_colon() {
    let err = Error::backend("boom").with_context("Failed to create program");
    assert_eq!(err.to_string(), "Failed to create program: boom");

    let err = Error::backend("boom").with_context("already terminated:");
    assert_eq!(err.to_string(), "already terminated: boom");
  }

  #[test]
  fn emit_skipped_displays_only_the_message() {
    let err = Error::EmitSkipped {
      file_path: "a.ts".into(),
      message: "error TS1005: ';' expected.\n".into(),
    };
    assert!(err.is_emit_skipped());
    assert_eq!(err.to_string(), "error TS1005: ';' expected.\n");
    let err = err.with_context("ignored");
    assert_eq!(err.to_string(), "error TS1005: ';' expected.\n");
  }

  #[test]
  fn io_errors_keep_their_source() {
    let err = Error::io(
      "Failed to read a.ts",
      io::Error::new(io::ErrorKind::NotFound, "missing"),
    );
    assert_eq!(err.to_string(), "Failed to read a.ts: missing");
    assert!(std::error::Error::source(&err).is_some());
  }
}
