use std::collections::HashMap;

use super::error::DocumentError;
use super::Value;

/// A flattened document: dot-separated field paths mapped to one or more values.
///
/// Supports nested paths like `"user.profile.age"`. Array elements are recorded
/// as several values under the array's own path, so `{"tags": ["a", "b"]}`
/// yields `tags -> ["a", "b"]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: HashMap<String, Vec<Value>>,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single value at a path, replacing whatever was there.
    #[must_use]
    pub fn set(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Append a value at a path, turning the field into a multi-valued one.
    #[must_use]
    pub fn push(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.append(path, value.into());
        self
    }

    /// Insert a value at a path (mutable reference version of [`set`](Self::set)).
    pub fn insert(&mut self, path: &str, value: Value) {
        self.fields.insert(path.to_owned(), vec![value]);
    }

    /// Append a value at a path (mutable reference version of [`push`](Self::push)).
    pub fn append(&mut self, path: &str, value: Value) {
        self.fields.entry(path.to_owned()).or_default().push(value);
    }

    /// Values recorded at `path`. Returns `None` when the path is absent.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[Value]> {
        self.fields
            .get(path)
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
    }

    /// Iterate over all `(path, values)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.fields
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of distinct paths.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flatten a JSON value into a document.
    ///
    /// Objects contribute dot-joined paths, arrays contribute every element
    /// under the same path, and `null`s are skipped. A non-object root is
    /// recorded under the empty path.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        let mut doc = Self::new();
        flatten(json, String::new(), &mut doc);
        doc
    }

    /// Parse JSON text and flatten it. The root must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError`] on malformed JSON or a non-object root.
    pub fn parse_json(input: &str) -> Result<Self, DocumentError> {
        let json: serde_json::Value = serde_json::from_str(input)?;
        if !json.is_object() {
            return Err(DocumentError::NotAnObject);
        }
        Ok(Self::from_json(&json))
    }
}

fn flatten(json: &serde_json::Value, path: String, doc: &mut Document) {
    match json {
        serde_json::Value::Null => {}
        serde_json::Value::Bool(b) => doc.append(&path, Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            let value = match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(f)) => Value::Float(f),
                (None, None) => return,
            };
            doc.append(&path, value);
        }
        serde_json::Value::String(s) => doc.append(&path, Value::String(s.clone())),
        serde_json::Value::Array(items) => {
            for item in items {
                flatten(item, path.clone(), doc);
            }
        }
        serde_json::Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten(child, child_path, doc);
            }
        }
    }
}

impl<P: Into<String>, V: Into<Value>> FromIterator<(P, V)> for Document {
    fn from_iter<T: IntoIterator<Item = (P, V)>>(iter: T) -> Self {
        let mut doc = Document::new();
        for (path, value) in iter {
            doc.append(&path.into(), value.into());
        }
        doc
    }
}
