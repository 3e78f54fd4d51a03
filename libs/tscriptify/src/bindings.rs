use std::sync::mpsc;

use napi::bindgen_prelude::*;
use napi::Status;
use serde_json::Value;

use crate::diagnostic::Diagnostic;
use crate::transform::Tscriptifier;

fn napi_error(message: impl Into<String>) -> Error {
  Error::new(Status::GenericFailure, message.into())
}

/// Map an errorful result into a `napi::Result`, annotating the provided context
/// when the error is propagated.
fn map_napi_error<T, E>(result: std::result::Result<T, E>, context: &str) -> Result<T>
where
  E: std::fmt::Display,
{
  result.map_err(|err| napi_error(format!("{context}: {err}")))
}

#[napi(object)]
#[derive(Debug, Clone)]
pub struct JsDeclaration {
  pub file_path: String,
  pub text: String,
}

/// Everything one finalize produced. `error` is set instead of `output` when compilation
/// failed; declarations and diagnostics are reported either way.
#[napi(object)]
pub struct JsFinalizeResult {
  pub output: Option<Buffer>,
  pub charset: String,
  pub error: Option<String>,
  pub emit_skipped: bool,
  pub declarations: Vec<JsDeclaration>,
  #[napi(ts_type = "Array<import('./diagnostic').Diagnostic>")]
  pub diagnostics: Value,
}

/// Streaming adapter for one file.
#[napi(js_name = "Tscriptifier")]
pub struct JsTscriptifier {
  inner: Option<Tscriptifier>,
}

impl JsTscriptifier {
  fn adapter(&mut self) -> Result<&mut Tscriptifier> {
    self
      .inner
      .as_mut()
      .ok_or_else(|| napi_error("Tscriptifier has already been finalized."))
  }
}

#[napi]
impl JsTscriptifier {
  #[napi(
    constructor,
    ts_args_type = "filePath: string, compilerOptions?: Record<string, unknown> | undefined"
  )]
  pub fn new(file_path: String, compiler_options: Option<Value>) -> Result<Self> {
    let inner = map_napi_error(
      Tscriptifier::from_value(file_path, compiler_options.as_ref()),
      "Invalid compiler options",
    )?;
    Ok(JsTscriptifier { inner: Some(inner) })
  }

  /// Append a chunk of source text.
  #[napi]
  pub fn write(&mut self, chunk: Either<String, Buffer>) -> Result<()> {
    let adapter = self.adapter()?;
    match chunk {
      Either::A(text) => adapter.push_chunk(text),
      Either::B(bytes) => adapter.push_chunk(bytes),
    }
    Ok(())
  }

  /// Compile the buffered source. Can be called once.
  #[napi]
  pub fn finalize(&mut self) -> Result<JsFinalizeResult> {
    let mut adapter = self
      .inner
      .take()
      .ok_or_else(|| napi_error("Tscriptifier has already been finalized."))?;
    let charset = adapter.charset();

    let (declaration_tx, declaration_rx) = mpsc::channel();
    adapter.on_declaration(move |file_path, text| {
      let _ = declaration_tx.send(JsDeclaration {
        file_path: file_path.to_owned(),
        text: text.to_owned(),
      });
    });
    let (diagnostics_tx, diagnostics_rx) = mpsc::channel::<Vec<Diagnostic>>();
    adapter.on_diagnostics(move |_, diagnostics| {
      let _ = diagnostics_tx.send(diagnostics.to_vec());
    });

    let outcome = adapter.finalize();
    let diagnostics: Vec<Diagnostic> = diagnostics_rx.try_iter().flatten().collect();
    let diagnostics = map_napi_error(
      serde_json::to_value(&diagnostics),
      "Failed to serialize diagnostics",
    )?;
    let declarations = declaration_rx.try_iter().collect();

    let (output, error, emit_skipped) = match outcome {
      Ok(output) => (Some(Buffer::from(output.to_bytes())), None, false),
      Err(err) => (None, Some(err.to_string()), err.is_emit_skipped()),
    };
    Ok(JsFinalizeResult {
      output,
      charset: charset.name().to_owned(),
      error,
      emit_skipped,
      declarations,
      diagnostics,
    })
  }
}
