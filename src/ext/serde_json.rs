// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Dotted-path lookups and lenient typed extraction over serde_json::Value for API payloads and sheet cells
// role: extension/serde_json
// outputs: JsonFetch trait and JsonFetched wrapper (typed, defaulted, text and list extraction)
// invariants: No panics; missing paths yield None; numeric path segments index arrays
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A located JSON value (or nothing) awaiting typed extraction.
pub struct JsonFetched<'a> {
  inner: Option<&'a Value>,
}

impl<'a> JsonFetched<'a> {
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.inner.and_then(|v| T::deserialize(v).ok())
  }

  pub fn to_or_default<T>(&self) -> T
  where
    T: DeserializeOwned + Default,
  {
    self.to::<T>().unwrap_or_default()
  }

  /// Cell-style text: strings are trimmed, numbers and bools are stringified,
  /// null / empty / missing give `None`.
  pub fn text(&self) -> Option<String> {
    let s = match self.inner? {
      Value::String(s) => s.trim().to_string(),
      Value::Number(n) => n.to_string(),
      Value::Bool(b) => b.to_string(),
      _ => return None,
    };
    (!s.is_empty()).then_some(s)
  }

  /// Borrow the array at this location; anything else is an empty slice.
  pub fn items(&self) -> &'a [Value] {
    self.inner.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn exists(&self) -> bool {
    self.inner.is_some_and(|v| !v.is_null())
  }
}

/// Fetch nested values via dotted paths like "user.login" or "values.0".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      let next = match cur {
        Value::Array(arr) => key.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => cur.get(key),
      };
      match next {
        Some(v) => cur = v,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}
