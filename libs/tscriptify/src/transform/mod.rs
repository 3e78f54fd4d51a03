//! Streaming adapter: buffers chunks for one file, compiles the buffer through a virtual host on
//! finalize and reports output, declarations and diagnostics.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, debug_span};

use crate::compiler::{shared_session, Compiler, ProjectSession};
use crate::diagnostic::{format_diagnostic, Diagnostic};
use crate::host::{FsHost, VirtualFileHost};
use crate::internal::charset::Charset;
use crate::internal::errors::{Error, Result};
use crate::internal::options::{fixup_options, ConfigMap, EffectiveOptions};
use crate::internal::path::normalize_path;
use crate::source::SourceFile;
use crate::swc::SwcCompiler;


type DeclarationListener = Box<dyn FnMut(&str, &str) + Send>;
type DiagnosticsListener = Box<dyn FnMut(&str, &[Diagnostic]) + Send>;

/// Compiled text produced by a successful finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
  pub text: String,
  pub charset: Charset,
}

impl TransformOutput {
  /// The text encoded with the configured charset.
  pub fn to_bytes(&self) -> Vec<u8> {
    self.charset.encode(&self.text)
  }
}

/// Adapter for one logical file. Consumed by [`Tscriptifier::finalize`].
pub struct Tscriptifier<C: Compiler = SwcCompiler> {
  file_path: String,
  options: EffectiveOptions,
  buffer: Vec<u8>,
  session: Arc<ProjectSession<C>>,
  current_directory: Option<String>,
  declaration_listeners: Vec<DeclarationListener>,
  diagnostics_listeners: Vec<DiagnosticsListener>,
}

impl Tscriptifier<SwcCompiler> {
  /// Adapter on the process-wide session.
  pub fn create(file_path: impl Into<String>, options: Option<&ConfigMap>) -> Result<Self> {
    Self::with_session(file_path, options, shared_session())
  }

  /// Like [`Tscriptifier::create`], taking options as a JSON value (object or null).
  pub fn from_value(file_path: impl Into<String>, options: Option<&Value>) -> Result<Self> {
    let options = EffectiveOptions::from_value(options)?;
    Ok(Self::with_effective_options(file_path, options, shared_session()))
  }
}

impl<C: Compiler> Tscriptifier<C> {
  pub fn with_session(
    file_path: impl Into<String>,
    options: Option<&ConfigMap>,
    session: Arc<ProjectSession<C>>,
  ) -> Result<Self> {
    let options = EffectiveOptions::from_caller(options)?;
    Ok(Self::with_effective_options(file_path, options, session))
  }

  pub fn with_effective_options(
    file_path: impl Into<String>,
    options: EffectiveOptions,
    session: Arc<ProjectSession<C>>,
  ) -> Self {
    Tscriptifier {
      file_path: file_path.into(),
      options,
      buffer: Vec::new(),
      session,
      current_directory: None,
      declaration_listeners: Vec::new(),
      diagnostics_listeners: Vec::new(),
    }
  }

  /// Resolve relative paths against `dir` instead of the process working directory.
  pub fn current_directory(mut self, dir: impl Into<String>) -> Self {
    self.current_directory = Some(dir.into());
    self
  }

  pub fn on_declaration(&mut self, listener: impl FnMut(&str, &str) + Send + 'static) -> &mut Self {
    self.declaration_listeners.push(Box::new(listener));
    self
  }

  pub fn on_diagnostics(
    &mut self,
    listener: impl FnMut(&str, &[Diagnostic]) + Send + 'static,
  ) -> &mut Self {
    self.diagnostics_listeners.push(Box::new(listener));
    self
  }

  pub fn file_path(&self) -> &str {
    &self.file_path
  }

  pub fn options(&self) -> &EffectiveOptions {
    &self.options
  }

  pub fn charset(&self) -> Charset {
    self.options.charset()
  }

  pub fn buffered_len(&self) -> usize {
    self.buffer.len()
  }

  /// Append a chunk. Bytes are decoded once at finalize, so a character split across chunks
  /// decodes the same as when unsplit. Invalid UTF-8 is replaced with U+FFFD.
  pub fn push_chunk(&mut self, chunk: impl AsRef<[u8]>) {
    self.buffer.extend_from_slice(chunk.as_ref());
  }

  pub fn finalize(mut self) -> Result<TransformOutput> {
    let span = debug_span!("finalize", file = %self.file_path);
    let _enter = span.enter();

    let source_text = String::from_utf8_lossy(&std::mem::take(&mut self.buffer)).into_owned();
    let normalized_path = normalize_path(&self.file_path);
    let (compiler_options, mut diagnostics) = fixup_options(&self.options);
    let source = Arc::new(SourceFile::from_file_name(
      normalized_path,
      source_text,
      compiler_options.target,
    ));

    let base = match &self.current_directory {
      Some(dir) => FsHost::with_current_directory(&compiler_options, dir),
      None => FsHost::new(&compiler_options),
    };
    let mut host = VirtualFileHost::new(&base, self.file_path.clone(), Arc::clone(&source));
    let root_names = [self.file_path.clone()];

    let emitted = match self
      .session
      .compile(&root_names, &compiler_options, &mut host, &source)
    {
      Ok(emitted) => emitted,
      Err(err) => {
        self.dispatch_diagnostics(&diagnostics);
        return Err(err);
      }
    };

    diagnostics.extend(emitted.pre_emit_diagnostics);
    diagnostics.extend(emitted.emit_result.diagnostics);

    let skipped_message = emitted.emit_result.emit_skipped.then(|| {
      diagnostics
        .first()
        .map(|first| format_diagnostic(first, &host))
        .unwrap_or_else(|| format!("Emit skipped for '{}' without diagnostics", self.file_path))
    });
    let captured = host.into_captured();

    for declaration in &captured.declarations {
      for listener in &mut self.declaration_listeners {
        listener(&declaration.file_path, &declaration.text);
      }
    }
    self.dispatch_diagnostics(&diagnostics);

    if let Some(message) = skipped_message {
      debug!(diagnostics = diagnostics.len(), "emit skipped");
      return Err(Error::EmitSkipped {
        file_path: self.file_path.clone(),
        message,
      });
    }

    debug!(
      output_len = captured.output_text.as_ref().map(String::len).unwrap_or(0),
      declarations = captured.declarations.len(),
      reused_files = emitted.reused_files,
      "finalized"
    );
    Ok(TransformOutput {
      text: captured.output_text.unwrap_or_default(),
      charset: self.options.charset(),
    })
  }

  /// Read `reader` to its end, finalize, and write the encoded output to `writer`.
  pub fn transform(mut self, mut reader: impl Read, mut writer: impl Write) -> Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
      let read = match reader.read(&mut chunk) {
        Ok(read) => read,
        Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
        Err(err) => {
          return Err(Error::io(
            format!("Failed to read input for {}", self.file_path),
            err,
          ))
        }
      };
      if read == 0 {
        break;
      }
      self.push_chunk(&chunk[..read]);
    }
    let file_path = self.file_path.clone();
    let output = self.finalize()?;
    writer
      .write_all(&output.to_bytes())
      .map_err(|err| Error::io(format!("Failed to write output for {file_path}"), err))
  }

  fn dispatch_diagnostics(&mut self, diagnostics: &[Diagnostic]) {
    for listener in &mut self.diagnostics_listeners {
      listener(&self.file_path, diagnostics);
    }
  }
}

impl<C: Compiler> Write for Tscriptifier<C> {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.push_chunk(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

impl<C: Compiler> fmt::Debug for Tscriptifier<C> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Tscriptifier")
      .field("file_path", &self.file_path)
      .field("options", &self.options)
      .field("buffered", &self.buffer.len())
      .field("declaration_listeners", &self.declaration_listeners.len())
      .field("diagnostics_listeners", &self.diagnostics_listeners.len())
      .finish()
  }
}
