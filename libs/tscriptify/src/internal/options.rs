use serde_json::Value;

use super::charset::Charset;
use super::errors::{Error, Result};
use crate::diagnostic::Diagnostic;

/// Option bag accepted from callers, keyed by compiler option name.
pub type ConfigMap = serde_json::Map<String, Value>;

/// A compile-time option value. The default and forced layers are tables of these so neither can
/// be altered at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedValue {
  Bool(bool),
  Str(&'static str),
  EmptyList,
}

impl FixedValue {
  pub fn to_value(self) -> Value {
    match self {
      FixedValue::Bool(flag) => Value::Bool(flag),
      FixedValue::Str(text) => Value::String(text.to_owned()),
      FixedValue::EmptyList => Value::Array(Vec::new()),
    }
  }
}

/// Lowest layer, overridable by callers.
pub const DEFAULT_OPTIONS: &[(&str, FixedValue)] = &[
  ("charset", FixedValue::Str("utf8")),
  ("target", FixedValue::Str("es3")),
];

/// Highest layer. These keep the compiler on a single file whose output is captured in memory.
pub const FORCED_OPTIONS: &[(&str, FixedValue)] = &[
  ("allowNonTsExtensions", FixedValue::Bool(true)),
  ("declarationDir", FixedValue::Str("")),
  ("emitBOM", FixedValue::Bool(false)),
  ("mapRoot", FixedValue::Str("")),
  ("module", FixedValue::Str("commonjs")),
  ("moduleResolution", FixedValue::Str("node")),
  ("noEmit", FixedValue::Bool(false)),
  ("out", FixedValue::Str("")),
  ("outDir", FixedValue::Str("")),
  ("outFile", FixedValue::Str("")),
  ("rootDir", FixedValue::Str("")),
  ("rootDirs", FixedValue::EmptyList),
  ("sourceMap", FixedValue::Bool(false)),
  ("suppressOutputPathCheck", FixedValue::Bool(true)),
];

/// Forced key whose value comes from the caller's `_flag.debug`.
pub const INLINE_SOURCE_MAP: &str = "inlineSourceMap";

/// JavaScript truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
  match value {
    Value::Null => false,
    Value::Bool(flag) => *flag,
    Value::Number(number) => number.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(true),
    Value::String(text) => !text.is_empty(),
    Value::Array(_) | Value::Object(_) => true,
  }
}

/// Three-tier option layering: defaults, then caller overrides, then the forced table.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
  values: ConfigMap,
}

impl OptionsBuilder {
  pub fn from_defaults() -> Self {
    let mut values = ConfigMap::new();
    for (key, value) in DEFAULT_OPTIONS {
      values.insert((*key).to_owned(), value.to_value());
    }
    OptionsBuilder { values }
  }

  /// Overlay caller options key by key.
  pub fn apply_caller(mut self, caller: &ConfigMap) -> Self {
    for (key, value) in caller {
      self.values.insert(key.clone(), value.clone());
    }
    self
  }

  pub fn build(mut self) -> Result<EffectiveOptions> {
    let debug = self
      .values
      .get("_flag")
      .and_then(|flag| flag.get("debug"))
      .map(is_truthy)
      .unwrap_or(false);

    for (key, value) in FORCED_OPTIONS {
      self.values.insert((*key).to_owned(), value.to_value());
    }
    self
      .values
      .insert(INLINE_SOURCE_MAP.to_owned(), Value::Bool(debug));

    let charset = match self.values.get("charset") {
      Some(Value::String(name)) => name.parse::<Charset>()?,
      Some(Value::Null) | None => Charset::default(),
      Some(other) => {
        return Err(Error::invalid_options(format!(
          "charset must be a string, got {other}"
        )))
      }
    };

    Ok(EffectiveOptions {
      values: self.values,
      charset,
    })
  }
}

/// Immutable result of option layering.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveOptions {
  values: ConfigMap,
  charset: Charset,
}

impl EffectiveOptions {
  pub fn from_caller(caller: Option<&ConfigMap>) -> Result<Self> {
    let mut builder = OptionsBuilder::from_defaults();
    if let Some(overrides) = caller {
      builder = builder.apply_caller(overrides);
    }
    builder.build()
  }

  /// Accept options as a loose JSON value, which must be an object or null.
  pub fn from_value(caller: Option<&Value>) -> Result<Self> {
    match caller {
      None | Some(Value::Null) => Self::from_caller(None),
      Some(Value::Object(map)) => Self::from_caller(Some(map)),
      Some(other) => Err(Error::invalid_options(format!(
        "compiler options must be an object, got {other}"
      ))),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.values.get(key)
  }

  pub fn values(&self) -> &ConfigMap {
    &self.values
  }

  pub fn charset(&self) -> Charset {
    self.charset
  }

  pub fn inline_source_map(&self) -> bool {
    self.get(INLINE_SOURCE_MAP).map(is_truthy).unwrap_or(false)
  }
}

macro_rules! option_enum {
  (
    $(#[$meta:meta])*
    $name:ident, $flag:literal, default = $default:ident {
      $($variant:ident = $number:literal => [$($alias:literal),+]),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum $name {
      $($variant,)+
    }

    impl Default for $name {
      fn default() -> Self {
        $name::$default
      }
    }

    impl $name {
      pub const FLAG: &'static str = $flag;

      pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        $(
          if [$($alias),+].contains(&name.as_str()) {
            return Some($name::$variant);
          }
        )+
        None
      }

      pub fn from_number(number: i64) -> Option<Self> {
        match number {
          $($number => Some($name::$variant),)+
          _ => None,
        }
      }

      pub fn allowed_names() -> Vec<&'static str> {
        let mut names = Vec::new();
        $(names.extend_from_slice(&[$($alias),+]);)+
        names
      }
    }
  };
}

option_enum!(
  /// Language level of emitted JavaScript.
  ScriptTarget, "target", default = Es3 {
    Es3 = 0 => ["es3"],
    Es5 = 1 => ["es5"],
    Es2015 = 2 => ["es6", "es2015"],
    Es2016 = 3 => ["es2016"],
    Es2017 = 4 => ["es2017"],
    Es2018 = 5 => ["es2018"],
    Es2019 = 6 => ["es2019"],
    Es2020 = 7 => ["es2020"],
    Es2021 = 8 => ["es2021"],
    Es2022 = 9 => ["es2022"],
    EsNext = 99 => ["esnext"],
  }
);

option_enum!(
  ModuleKind, "module", default = CommonJs {
    None = 0 => ["none"],
    CommonJs = 1 => ["commonjs"],
    Amd = 2 => ["amd"],
    Umd = 3 => ["umd"],
    System = 4 => ["system"],
    Es2015 = 5 => ["es6", "es2015"],
    Es2020 = 6 => ["es2020"],
    Es2022 = 7 => ["es2022"],
    EsNext = 99 => ["esnext"],
    Node16 = 100 => ["node16"],
    NodeNext = 199 => ["nodenext"],
  }
);

option_enum!(
  ModuleResolution, "moduleResolution", default = NodeJs {
    Classic = 1 => ["classic"],
    NodeJs = 2 => ["node", "node10"],
    Node16 = 3 => ["node16"],
    NodeNext = 99 => ["nodenext"],
    Bundler = 100 => ["bundler"],
  }
);

option_enum!(
  NewLine, "newLine", default = LineFeed {
    CarriageReturnLineFeed = 0 => ["crlf"],
    LineFeed = 1 => ["lf"],
  }
);

impl NewLine {
  pub fn as_str(self) -> &'static str {
    match self {
      NewLine::CarriageReturnLineFeed => "\r\n",
      NewLine::LineFeed => "\n",
    }
  }
}

/// Typed options handed to a compiler backend.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilerOptions {
  pub target: ScriptTarget,
  pub module: ModuleKind,
  pub module_resolution: ModuleResolution,
  pub new_line: Option<NewLine>,
  pub declaration: bool,
  pub no_emit: bool,
  pub no_emit_on_error: bool,
  pub remove_comments: bool,
  pub always_strict: bool,
  pub inline_source_map: bool,
  pub emit_bom: bool,
  pub charset: Charset,
  /// Every option as layered, including keys no backend interprets.
  pub raw: ConfigMap,
}

impl CompilerOptions {
  pub fn get_raw(&self, key: &str) -> Option<&Value> {
    self.raw.get(key)
  }
}

/// Convert layered options into typed form. Enumerated options given by name or number are
/// validated; invalid ones are reported as TS6046 and fall back to their default.
pub fn fixup_options(options: &EffectiveOptions) -> (CompilerOptions, Vec<Diagnostic>) {
  let mut diagnostics = Vec::new();
  let raw = options.values().clone();
  let flag = |key: &str| raw.get(key).map(is_truthy).unwrap_or(false);

  macro_rules! typed {
    ($ty:ident) => {
      parse_enum(
        raw.get($ty::FLAG),
        &mut diagnostics,
        $ty::FLAG,
        $ty::from_name,
        $ty::from_number,
        $ty::allowed_names,
      )
    };
  }

  let target = typed!(ScriptTarget).unwrap_or_default();
  let module = typed!(ModuleKind).unwrap_or_default();
  let module_resolution = typed!(ModuleResolution).unwrap_or_default();
  let new_line = typed!(NewLine);

  let compiler_options = CompilerOptions {
    target,
    module,
    module_resolution,
    new_line,
    declaration: flag("declaration"),
    no_emit: flag("noEmit"),
    no_emit_on_error: flag("noEmitOnError"),
    remove_comments: flag("removeComments"),
    always_strict: raw
      .get("alwaysStrict")
      .map(is_truthy)
      .unwrap_or_else(|| flag("strict")),
    inline_source_map: flag(INLINE_SOURCE_MAP),
    emit_bom: flag("emitBOM"),
    charset: options.charset(),
    raw: raw.clone(),
  };
  (compiler_options, diagnostics)
}

fn parse_enum<T>(
  value: Option<&Value>,
  diagnostics: &mut Vec<Diagnostic>,
  flag: &str,
  from_name: fn(&str) -> Option<T>,
  from_number: fn(i64) -> Option<T>,
  allowed_names: fn() -> Vec<&'static str>,
) -> Option<T> {
  let parsed = match value? {
    Value::Null => return None,
    Value::String(name) => from_name(name),
    Value::Number(number) => number.as_i64().and_then(from_number),
    _ => None,
  };
  if parsed.is_none() {
    let allowed = allowed_names()
      .iter()
      .map(|name| format!("'{name}'"))
      .collect::<Vec<_>>()
      .join(", ");
    diagnostics.push(Diagnostic::error(
      6046,
      format!("Argument for '--{flag}' option must be: {allowed}."),
    ));
  }
  parsed
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn caller(value: Value) -> ConfigMap {
    match value {
      Value::Object(map) => map,
      other => panic!("expected object, got {other}"),
    }
  }

  #[test]
  fn defaults_apply_without_caller_options() {
    let options = EffectiveOptions::from_caller(None).expect("options");
    assert_eq!(options.get("target"), Some(&json!("es3")));
    assert_eq!(options.get("charset"), Some(&json!("utf8")));
    assert_eq!(options.charset(), Charset::Utf8);
    assert!(!options.inline_source_map());
  }

  #[test]
  fn caller_overrides_defaults_but_not_forced_keys() {
    let overrides = caller(json!({
      "target": "es5",
      "charset": "latin1",
      "module": "amd",
      "outDir": "dist",
      "noEmit": true,
      "rootDirs": ["a", "b"],
      "inlineSourceMap": true,
    }));
    let options = EffectiveOptions::from_caller(Some(&overrides)).expect("options");
    assert_eq!(options.get("target"), Some(&json!("es5")));
    assert_eq!(options.charset(), Charset::Latin1);
    for (key, value) in FORCED_OPTIONS {
      assert_eq!(options.get(key), Some(&value.to_value()), "forced key {key}");
    }
    assert_eq!(options.get(INLINE_SOURCE_MAP), Some(&json!(false)));
  }

  #[test]
  fn inline_source_map_follows_debug_truthiness() {
    let cases = [
      (json!({ "_flag": { "debug": true } }), true),
      (json!({ "_flag": { "debug": 1 } }), true),
      (json!({ "_flag": { "debug": "yes" } }), true),
      (json!({ "_flag": { "debug": 0 } }), false),
      (json!({ "_flag": { "debug": "" } }), false),
      (json!({ "_flag": { "debug": null } }), false),
      (json!({ "_flag": {} }), false),
      (json!({ "_flag": true }), false),
      (json!({}), false),
    ];
    for (input, expected) in cases {
      let options = EffectiveOptions::from_caller(Some(&caller(input.clone()))).expect("options");
      assert_eq!(options.inline_source_map(), expected, "input {input}");
    }
  }

  #[test]
  fn non_object_options_are_rejected() {
    let err = EffectiveOptions::from_value(Some(&json!(["es5"]))).unwrap_err();
    assert!(matches!(err, Error::InvalidOptions(_)));
    assert!(EffectiveOptions::from_value(Some(&Value::Null)).is_ok());
  }

  #[test]
  fn unknown_charset_fails() {
    let err = EffectiveOptions::from_caller(Some(&caller(json!({ "charset": "koi8" }))))
      .unwrap_err();
    assert!(matches!(err, Error::InvalidOptions(_)));
  }

  #[test]
  fn fixup_types_enumerated_options() {
    let options = EffectiveOptions::from_caller(Some(&caller(json!({
      "target": "ES2015",
      "newLine": 0,
      "declaration": 1,
      "strict": true,
    }))))
    .expect("options");
    let (typed, diagnostics) = fixup_options(&options);
    assert!(diagnostics.is_empty());
    assert_eq!(typed.target, ScriptTarget::Es2015);
    assert_eq!(typed.module, ModuleKind::CommonJs);
    assert_eq!(typed.module_resolution, ModuleResolution::NodeJs);
    assert_eq!(typed.new_line, Some(NewLine::CarriageReturnLineFeed));
    assert!(typed.declaration);
    assert!(typed.always_strict);
    assert!(!typed.inline_source_map);
    assert_eq!(typed.get_raw("strict"), Some(&json!(true)));
  }

  #[test]
  fn invalid_enumerated_options_report_6046_and_fall_back() {
    let options = EffectiveOptions::from_caller(Some(&caller(json!({
      "target": "es1999",
      "newLine": 7,
    }))))
    .expect("options");
    let (typed, diagnostics) = fixup_options(&options);
    assert_eq!(typed.target, ScriptTarget::Es3);
    assert_eq!(typed.new_line, None);
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics.iter().all(|d| d.code == 6046));
    assert!(diagnostics[0]
      .message
      .starts_with("Argument for '--target' option must be: 'es3', 'es5', 'es6'"));
    assert_eq!(
      diagnostics[1].message,
      "Argument for '--newLine' option must be: 'crlf', 'lf'."
    );
  }
}
