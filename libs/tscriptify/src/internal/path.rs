//! String path helpers in the compiler's canonical form: forward slashes, no `.` segments and
//! `..` segments folded wherever a parent exists.

use serde::{Deserialize, Serialize};

/// Kind of script a source file holds, inferred from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptKind {
  Unknown,
  Js,
  Jsx,
  Ts,
  Tsx,
  Json,
}

impl ScriptKind {
  /// `Unknown` is parsed as TypeScript.
  pub fn ensure_known(self) -> Self {
    match self {
      ScriptKind::Unknown => ScriptKind::Ts,
      kind => kind,
    }
  }
}

pub fn script_kind_from_file_name(file_name: &str) -> ScriptKind {
  let lower = file_name.to_ascii_lowercase();
  match extension_of(&lower) {
    ".js" | ".cjs" | ".mjs" => ScriptKind::Js,
    ".jsx" => ScriptKind::Jsx,
    ".ts" | ".cts" | ".mts" | ".d.ts" | ".d.cts" | ".d.mts" => ScriptKind::Ts,
    ".tsx" => ScriptKind::Tsx,
    ".json" => ScriptKind::Json,
    _ => ScriptKind::Unknown,
  }
}

const KNOWN_EXTENSIONS: &[&str] = &[
  ".d.ts", ".d.mts", ".d.cts", ".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs",
  ".json",
];

/// Longest known extension of `path` (so `a.d.ts` yields `.d.ts`), or the text after the last dot
/// of the base name, or `""`.
pub fn extension_of(path: &str) -> &str {
  for ext in KNOWN_EXTENSIONS {
    if file_extension_is(path, ext) {
      return &path[path.len() - ext.len()..];
    }
  }
  let base_start = path.rfind('/').map(|idx| idx + 1).unwrap_or(0);
  match path[base_start..].rfind('.') {
    Some(idx) if idx > 0 => &path[base_start + idx..],
    _ => "",
  }
}

pub fn file_extension_is(path: &str, extension: &str) -> bool {
  path.len() > extension.len() && path.ends_with(extension)
}

/// Replace the extension reported by [`extension_of`] with `new_extension`.
pub fn change_extension(path: &str, new_extension: &str) -> String {
  let ext = extension_of(path);
  let mut changed = path[..path.len() - ext.len()].to_owned();
  changed.push_str(new_extension);
  changed
}

pub fn is_declaration_file_name(file_name: &str) -> bool {
  let lower = file_name.to_ascii_lowercase();
  [".d.ts", ".d.mts", ".d.cts"]
    .iter()
    .any(|ext| file_extension_is(&lower, ext))
}

/// Length of the root portion of `path` (`/`, `c:/`, `//server/share/`), 0 for relative paths.
pub fn root_length(path: &str) -> usize {
  let bytes = path.as_bytes();
  if bytes.is_empty() {
    return 0;
  }
  if bytes[0] == b'/' {
    if bytes.len() > 1 && bytes[1] == b'/' {
      // UNC: //server/share/
      let rest = &path[2..];
      return match rest.find('/') {
        Some(server_end) => {
          let after_server = 2 + server_end + 1;
          match path[after_server..].find('/') {
            Some(share_end) => after_server + share_end + 1,
            None => path.len(),
          }
        }
        None => path.len(),
      };
    }
    return 1;
  }
  if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
    if bytes.len() > 2 && bytes[2] == b'/' {
      return 3;
    }
    return 2;
  }
  0
}

pub fn is_rooted_disk_path(path: &str) -> bool {
  root_length(path) > 0
}

/// Normalise `path` to the compiler's canonical form.
pub fn normalize_path(path: &str) -> String {
  let slashed = path.replace('\\', "/");
  let root_len = root_length(&slashed);
  let root = &slashed[..root_len];
  let had_trailing_separator = slashed.len() > root_len && slashed.ends_with('/');

  let mut components: Vec<&str> = Vec::new();
  for component in slashed[root_len..].split('/') {
    match component {
      "" | "." => {}
      ".." => match components.last() {
        Some(&last) if last != ".." => {
          components.pop();
        }
        _ if root_len > 0 => {}
        _ => components.push(".."),
      },
      other => components.push(other),
    }
  }

  let mut normalized = root.to_owned();
  normalized.push_str(&components.join("/"));
  if had_trailing_separator && !components.is_empty() {
    normalized.push('/');
  }
  normalized
}

/// Directory portion of `path` without the trailing separator (the root is kept intact).
pub fn directory_path(path: &str) -> &str {
  let root_len = root_length(path);
  let trimmed = path.trim_end_matches('/');
  if trimmed.len() <= root_len {
    return &path[..root_len];
  }
  match trimmed.rfind('/') {
    Some(idx) if idx + 1 > root_len => &trimmed[..idx],
    Some(_) => &path[..root_len],
    None => "",
  }
}

/// Join `relative` onto `base` (unless `relative` is rooted) and normalise the result.
pub fn combine_paths(base: &str, relative: &str) -> String {
  if base.is_empty() || is_rooted_disk_path(relative) {
    return normalize_path(relative);
  }
  let mut joined = base.to_owned();
  if !joined.ends_with('/') && !joined.ends_with('\\') {
    joined.push('/');
  }
  joined.push_str(relative);
  normalize_path(&joined)
}

/// Render `path` relative to `base` when it is rooted, comparing components through
/// `canonical_file_name`. Paths on different roots are returned unchanged.
pub fn convert_to_relative_path(
  path: &str,
  base: &str,
  canonical_file_name: impl Fn(&str) -> String,
) -> String {
  if !is_rooted_disk_path(path) {
    return path.to_owned();
  }
  let path = normalize_path(path);
  let base = normalize_path(base);
  let path_root = &path[..root_length(&path)];
  let base_root = &base[..root_length(&base)];
  if canonical_file_name(path_root) != canonical_file_name(base_root) {
    return path;
  }

  let path_components: Vec<&str> = path[path_root.len()..]
    .split('/')
    .filter(|c| !c.is_empty())
    .collect();
  let base_components: Vec<&str> = base[base_root.len()..]
    .split('/')
    .filter(|c| !c.is_empty())
    .collect();

  let mut common = 0;
  while common < path_components.len()
    && common < base_components.len()
    && canonical_file_name(path_components[common])
      == canonical_file_name(base_components[common])
  {
    common += 1;
  }

  let mut relative: Vec<&str> = Vec::new();
  for _ in common..base_components.len() {
    relative.push("..");
  }
  relative.extend_from_slice(&path_components[common..]);
  relative.join("/")
}

#[cfg(test)]
mod tests {
  use super::*;

  fn identity(value: &str) -> String {
    value.to_owned()
  }

  #[test]
  fn normalize_collapses_dots_and_backslashes() {
    assert_eq!(normalize_path("./src\\a.ts"), "src/a.ts");
    assert_eq!(normalize_path("/a/b/../c/./d.ts"), "/a/c/d.ts");
    assert_eq!(normalize_path("a//b///c"), "a/b/c");
    assert_eq!(normalize_path("../x/../../y.ts"), "../../y.ts");
    assert_eq!(normalize_path("/../a.ts"), "/a.ts");
    assert_eq!(normalize_path("C:\\work\\src\\..\\a.ts"), "C:/work/a.ts");
    assert_eq!(normalize_path("a/.."), "");
    assert_eq!(normalize_path("src/lib/"), "src/lib/");
  }

  #[test]
  fn unc_roots_are_preserved() {
    assert_eq!(root_length("//server/share/a.ts"), "//server/share/".len());
    assert_eq!(
      normalize_path("\\\\server\\share\\x\\..\\a.ts"),
      "//server/share/a.ts"
    );
  }

  #[test]
  fn extensions_prefer_the_longest_known_suffix() {
    assert_eq!(extension_of("lib/a.d.ts"), ".d.ts");
    assert_eq!(extension_of("a.tsx"), ".tsx");
    assert_eq!(extension_of("a.vue"), ".vue");
    assert_eq!(extension_of("dir.v1/file"), "");
    assert_eq!(change_extension("src/a.ts", ".js"), "src/a.js");
    assert_eq!(change_extension("src/a.d.ts", ".js"), "src/a.js");
    assert!(file_extension_is("a.d.ts", ".d.ts"));
    assert!(!file_extension_is(".d.ts", ".d.ts"));
  }

  #[test]
  fn script_kinds_follow_extensions() {
    assert_eq!(script_kind_from_file_name("a.ts"), ScriptKind::Ts);
    assert_eq!(script_kind_from_file_name("a.MTS"), ScriptKind::Ts);
    assert_eq!(script_kind_from_file_name("a.tsx"), ScriptKind::Tsx);
    assert_eq!(script_kind_from_file_name("a.cjs"), ScriptKind::Js);
    assert_eq!(script_kind_from_file_name("a.jsx"), ScriptKind::Jsx);
    assert_eq!(script_kind_from_file_name("a.json"), ScriptKind::Json);
    assert_eq!(script_kind_from_file_name("a.coffee"), ScriptKind::Unknown);
    assert_eq!(ScriptKind::Unknown.ensure_known(), ScriptKind::Ts);
  }

  #[test]
  fn directory_and_combine() {
    assert_eq!(directory_path("/a/b/c.ts"), "/a/b");
    assert_eq!(directory_path("/c.ts"), "/");
    assert_eq!(directory_path("c.ts"), "");
    assert_eq!(combine_paths("/a/b", "./c"), "/a/b/c");
    assert_eq!(combine_paths("/a/b", "../c.ts"), "/a/c.ts");
    assert_eq!(combine_paths("/a/b", "/abs.ts"), "/abs.ts");
    assert_eq!(combine_paths("", "x/./y.ts"), "x/y.ts");
  }

  #[test]
  fn relative_paths_for_diagnostics() {
    assert_eq!(
      convert_to_relative_path("/home/u/proj/src/a.ts", "/home/u/proj", identity),
      "src/a.ts"
    );
    assert_eq!(
      convert_to_relative_path("/home/u/other/a.ts", "/home/u/proj", identity),
      "../other/a.ts"
    );
    assert_eq!(
      convert_to_relative_path("src/a.ts", "/home/u/proj", identity),
      "src/a.ts"
    );
    assert_eq!(
      convert_to_relative_path("d:/x/a.ts", "c:/x", identity),
      "d:/x/a.ts"
    );
    assert_eq!(
      convert_to_relative_path("/HOME/a.ts", "/home", |p: &str| p.to_ascii_lowercase()),
      "a.ts"
    );
  }
}
