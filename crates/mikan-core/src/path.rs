// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Dot/bracket data paths over JSON values.
//!
//! `setData` patches address nested data with paths like `a.b[2].c`.
//! [`set_path`] creates missing intermediate objects and extends arrays
//! with `null` as needed, so a patch can target a slot that does not
//! exist yet.

use crate::error::PathError;
use serde_json::Value;

/// One step of a parsed data path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// An object key.
    Key(String),
    /// An array index.
    Index(usize),
}

/// Parses `a.b[2].c` into key/index segments.
///
/// Only non-negative integer indices are accepted inside brackets; the
/// compiler never emits anything else.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let mut segments = Vec::new();
    let mut key = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if key.is_empty() {
                    return Err(PathError::Malformed {
                        path: path.to_string(),
                    });
                }
                segments.push(PathSegment::Key(std::mem::take(&mut key)));
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut key)));
                } else if segments.is_empty() {
                    // A path may not start with an index.
                    return Err(PathError::Malformed {
                        path: path.to_string(),
                    });
                }
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        _ => {
                            return Err(PathError::InvalidIndex {
                                segment: format!("[{digits}"),
                            })
                        }
                    }
                }
                let index = digits.parse().map_err(|_| PathError::InvalidIndex {
                    segment: format!("[{digits}]"),
                })?;
                segments.push(PathSegment::Index(index));
                // After `]` only `.`, another `[` or the end may follow.
                if let Some(&next) = chars.peek() {
                    if next == '.' {
                        chars.next();
                    } else if next != '[' {
                        return Err(PathError::Malformed {
                            path: path.to_string(),
                        });
                    }
                }
            }
            _ => key.push(c),
        }
    }

    if !key.is_empty() {
        segments.push(PathSegment::Key(key));
    }
    if segments.is_empty() {
        return Err(PathError::Empty);
    }
    Ok(segments)
}

/// Reads the value at `path`, or `None` when any step is absent.
#[must_use]
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse_path(path).ok()?;
    let mut current = root;
    for segment in &segments {
        current = match segment {
            PathSegment::Key(key) => current.get(key.as_str())?,
            PathSegment::Index(index) => current.get(index)?,
        };
    }
    Some(current)
}

/// Writes `value` at `path`, creating intermediate objects and extending
/// arrays with `null` as needed.
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), PathError> {
    let segments = parse_path(path)?;
    let mut current = root;

    for (pos, segment) in segments.iter().enumerate() {
        let last = pos + 1 == segments.len();
        match segment {
            PathSegment::Key(key) => {
                if !current.is_object() {
                    if current.is_null() {
                        *current = Value::Object(Default::default());
                    } else {
                        return Err(PathError::TypeMismatch {
                            path: path.to_string(),
                        });
                    }
                }
                let map = current.as_object_mut().expect("checked above");
                if last {
                    map.insert(key.clone(), value);
                    return Ok(());
                }
                current = map.entry(key.clone()).or_insert(Value::Null);
            }
            PathSegment::Index(index) => {
                if !current.is_array() {
                    if current.is_null() {
                        *current = Value::Array(Vec::new());
                    } else {
                        return Err(PathError::TypeMismatch {
                            path: path.to_string(),
                        });
                    }
                }
                let array = current.as_array_mut().expect("checked above");
                if array.len() <= *index {
                    array.resize(*index + 1, Value::Null);
                }
                if last {
                    array[*index] = value;
                    return Ok(());
                }
                current = &mut array[*index];
            }
        }
    }
    unreachable!("loop returns on the last segment")
}

/// Splits off the leading top-level key of a (possibly nested) path.
///
/// `"a.b[2]"` and `"a[0]"` both report `"a"`; observer dispatch and
/// child-binding checks group changes by this key.
#[must_use]
pub fn top_level_key(path: &str) -> &str {
    let end = path
        .find(['.', '['])
        .unwrap_or(path.len());
    &path[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_mixed_segments() {
        let segments = parse_path("a.b[2].c").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::Key("a".into()),
                PathSegment::Key("b".into()),
                PathSegment::Index(2),
                PathSegment::Key("c".into()),
            ]
        );
    }

    #[test]
    fn rejects_bad_paths() {
        assert_eq!(parse_path(""), Err(PathError::Empty));
        assert!(matches!(
            parse_path("a[x]"),
            Err(PathError::InvalidIndex { .. })
        ));
        assert!(matches!(parse_path(".a"), Err(PathError::Malformed { .. })));
        assert!(matches!(parse_path("[0]"), Err(PathError::Malformed { .. })));
    }

    #[test]
    fn set_creates_missing_structure() {
        let mut data = json!({});
        set_path(&mut data, "list[1].name", json!("x")).unwrap();
        assert_eq!(data, json!({ "list": [null, { "name": "x" }] }));
    }

    #[test]
    fn set_overwrites_existing_leaf() {
        let mut data = json!({ "a": { "b": 1 } });
        set_path(&mut data, "a.b", json!(2)).unwrap();
        assert_eq!(data, json!({ "a": { "b": 2 } }));
    }

    #[test]
    fn set_refuses_shape_conflicts() {
        let mut data = json!({ "a": "text" });
        assert!(matches!(
            set_path(&mut data, "a.b", json!(1)),
            Err(PathError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn get_walks_nested_values() {
        let data = json!({ "a": { "b": [10, 20] } });
        assert_eq!(get_path(&data, "a.b[1]"), Some(&json!(20)));
        assert_eq!(get_path(&data, "a.missing"), None);
    }

    #[test]
    fn top_level_key_strips_nesting() {
        assert_eq!(top_level_key("a.b.c"), "a");
        assert_eq!(top_level_key("arr[3]"), "arr");
        assert_eq!(top_level_key("plain"), "plain");
    }
}
