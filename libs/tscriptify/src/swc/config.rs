//! Translation of typed compiler options into an swc `Options` document.

use serde_json::{json, Value};

use crate::internal::options::{CompilerOptions, ModuleKind, ScriptTarget};
use crate::internal::path::ScriptKind;
use crate::source::SourceFile;

/// Key swc stores isolated declaration text under in `TransformOutput::output`.
pub(super) const ISOLATED_DECLARATIONS_KEY: &str = "__swc_isolated_declarations__";

pub(super) fn target_name(target: ScriptTarget) -> &'static str {
  match target {
    ScriptTarget::Es3 => "es3",
    ScriptTarget::Es5 => "es5",
    ScriptTarget::Es2015 => "es2015",
    ScriptTarget::Es2016 => "es2016",
    ScriptTarget::Es2017 => "es2017",
    ScriptTarget::Es2018 => "es2018",
    ScriptTarget::Es2019 => "es2019",
    ScriptTarget::Es2020 => "es2020",
    ScriptTarget::Es2021 => "es2021",
    ScriptTarget::Es2022 => "es2022",
    ScriptTarget::EsNext => "esnext",
  }
}

pub(super) fn module_config(module: ModuleKind) -> Value {
  let kind = match module {
    ModuleKind::None | ModuleKind::CommonJs => "commonjs",
    ModuleKind::Amd => "amd",
    ModuleKind::Umd => "umd",
    ModuleKind::System => "systemjs",
    ModuleKind::Es2015 | ModuleKind::Es2020 | ModuleKind::Es2022 | ModuleKind::EsNext => "es6",
    ModuleKind::Node16 | ModuleKind::NodeNext => "nodenext",
  };
  json!({ "type": kind })
}

fn parser_config(source: &SourceFile) -> Value {
  match source.script_kind() {
    ScriptKind::Js | ScriptKind::Jsx => json!({
      "syntax": "ecmascript",
      "jsx": source.script_kind() == ScriptKind::Jsx,
    }),
    _ => json!({
      "syntax": "typescript",
      "tsx": source.script_kind() == ScriptKind::Tsx,
      "decorators": true,
    }),
  }
}

/// swc options for compiling `source`. With `declarations` set, swc also produces the isolated
/// declaration text for TypeScript sources.
pub(super) fn swc_options(
  source: &SourceFile,
  options: &CompilerOptions,
  declarations: bool,
) -> Value {
  let mut jsc = json!({
    "parser": parser_config(source),
    "target": target_name(options.target),
    "externalHelpers": false,
  });
  if declarations {
    jsc["experimental"] = json!({ "emitIsolatedDts": true });
  }
  if options.remove_comments {
    jsc["minify"] = json!({
      "compress": false,
      "mangle": false,
      "format": { "comments": false },
    });
  }

  json!({
    "filename": source.file_name(),
    "swcrc": false,
    "minify": false,
    "jsc": jsc,
    "module": module_config(options.module),
    "sourceMaps": if options.inline_source_map { json!("inline") } else { json!(false) },
    "inlineSourcesContent": true,
  })
}
