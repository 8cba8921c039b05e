//! List classification and selector resolution.
//!
//! Every list payload is wrapped in a single-key object whose key names the
//! list's type, e.g. `{"vocabulary_list": {...}}` or
//! `{"spanish_verb_list": {...}}`. A key ending in [`VERB_LIST_SUFFIX`]
//! marks a verb list; any other key marks a plain list.

use serde::Serialize;
use serde_json::Value;

use super::ModelError;
use super::payload::as_object;
use crate::transport::JsonObject;

/// Discriminant key suffix that marks a verb list.
pub const VERB_LIST_SUFFIX: &str = "_verb_list";

/// The two kinds of vocabulary list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ListKind {
    /// Items carry translations into the list's target language.
    PlainList,
    /// Items carry conjugations for a selected tense.
    VerbList,
}

impl ListKind {
    /// Classify a discriminant key.
    pub fn from_key(key: &str) -> Self {
        if key.ends_with(VERB_LIST_SUFFIX) {
            ListKind::VerbList
        } else {
            ListKind::PlainList
        }
    }

    pub fn is_verb_list(self) -> bool {
        self == ListKind::VerbList
    }
}

/// What a list's items are projected through for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Selector {
    /// Plain lists: the target language id.
    TargetLanguage(u64),
    /// Verb lists: the selected tense id.
    Tense(u64),
}

impl Selector {
    pub fn id(self) -> u64 {
        match self {
            Selector::TargetLanguage(id) | Selector::Tense(id) => id,
        }
    }
}

/// Split a single-key wrapper object into its key and inner object.
pub(crate) fn unwrap_single(wrapper: &JsonObject) -> Result<(&str, &JsonObject), ModelError> {
    let mut entries = wrapper.iter();
    match (entries.next(), entries.next()) {
        (Some((key, inner)), None) => Ok((key.as_str(), as_object(inner, key)?)),
        (None, _) => Err(ModelError::malformed("expected a single-key object, got an empty one")),
        (Some(_), Some(_)) => Err(ModelError::malformed(format!(
            "expected a single-key object, got keys {:?}",
            wrapper.keys().collect::<Vec<_>>()
        ))),
    }
}

/// Classify a wrapped list payload and return its kind and inner object.
pub fn classify(value: &Value) -> Result<(ListKind, &JsonObject), ModelError> {
    let wrapper = as_object(value, "list payload")?;
    let (key, inner) = unwrap_single(wrapper)?;
    Ok((ListKind::from_key(key), inner))
}

/// Unwrap an element that may or may not carry a type wrapper.
///
/// Objects that already have `field` at the top level are returned as they
/// are; anything else must be a single-key wrapper.
pub(crate) fn unwrap_if_wrapped<'a>(
    value: &'a Value,
    field: &str,
) -> Result<&'a JsonObject, ModelError> {
    let obj = as_object(value, "element")?;
    if obj.contains_key(field) {
        Ok(obj)
    } else {
        unwrap_single(obj).map(|(_, inner)| inner)
    }
}
