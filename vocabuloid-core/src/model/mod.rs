//! Domain model for vocabulario.me.
//!
//! The graph is rooted at a [`User`], who owns [`VocabularyList`]s, which own
//! [`Vocabulary`] items, which own either [`Translation`]s (plain lists) or
//! conjugation lines (verb lists). Every child collection sits in a
//! [`LazySlot`]: the first read fetches it through the [`Transport`], later
//! reads return the cached value, and nothing is ever refreshed.
//!
//! [`Transport`]: crate::transport::Transport

use serde::Serialize;
use thiserror::Error;

use crate::transport::{JsonObject, TransportError};

pub mod format;
pub mod list;
pub mod resolve;
pub mod slot;
pub mod user;
pub mod vocabulary;

pub use format::format_list;
pub use list::{ListBody, Tenses, VocabularyList};
pub use resolve::{ListKind, Selector, VERB_LIST_SUFFIX, classify};
pub use slot::{LazySlot, SlotState};
pub use user::User;
pub use vocabulary::{Translation, Vocabulary};

/// Error type for entity graph operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The fetch behind a lazy field failed. The field stays unloaded.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The payload did not have the expected structure.
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// A verb list was asked for its selector before a tense was chosen.
    #[error("no tense selected for verb list {list_id}")]
    NoTenseSelected { list_id: u64 },

    /// The selected tense is not among the list's supported tenses.
    #[error("tense {tense_id} is not supported by verb list {list_id}")]
    UnknownTense { list_id: u64, tense_id: u64 },

    /// A plain list arrived without `language_to`.
    #[error("vocabulary list {list_id} has no target language")]
    MissingTargetLanguage { list_id: u64 },

    /// The operation only applies to the other kind of list.
    #[error("operation requires a {expected:?}")]
    KindMismatch { expected: ListKind },
}

impl ModelError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }
}

/// A language as the service names it: `{id, word}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Language {
    pub id: u64,
    pub name: String,
}

impl Language {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Parse `{ "id": 1, "word": "English" }`.
    pub(crate) fn from_payload(payload: &JsonObject) -> Result<Self, ModelError> {
        Ok(Self {
            id: payload::u64_field(payload, "id")?,
            name: payload::str_field(payload, "word")?.to_string(),
        })
    }
}

/// Resource paths, relative to the service base URL.
pub mod paths {
    pub fn current_user() -> String {
        "/users/current.json".to_string()
    }

    pub fn user_lists(user_id: u64) -> String {
        format!("/users/{}/lists.json", user_id)
    }

    pub fn list(list_id: u64) -> String {
        format!("/lists/{}.json", list_id)
    }

    pub fn tenses(language_id: u64) -> String {
        format!("/tenses.json?language_id={}", language_id)
    }

    pub fn translations(vocabulary_id: u64, language_id: u64) -> String {
        format!(
            "/vocabularies/{}/translate.json?language_id={}",
            vocabulary_id, language_id
        )
    }

    pub fn conjugations(vocabulary_id: u64, tense_id: u64) -> String {
        format!(
            "/vocabularies/{}/conjugate.json?tense_id={}",
            vocabulary_id, tense_id
        )
    }
}

/// Field accessors for service payloads.
pub(crate) mod payload {
    use serde_json::Value;

    use super::ModelError;
    use crate::transport::{JsonObject, kind_of};

    fn field<'a>(obj: &'a JsonObject, name: &str) -> Result<&'a Value, ModelError> {
        obj.get(name)
            .ok_or_else(|| ModelError::malformed(format!("missing field `{}`", name)))
    }

    /// Ids arrive as numbers, occasionally as numeric strings.
    pub fn u64_field(obj: &JsonObject, name: &str) -> Result<u64, ModelError> {
        match field(obj, name)? {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| ModelError::malformed(format!("`{}` is not an unsigned integer", name))),
            Value::String(s) => s
                .parse()
                .map_err(|_| ModelError::malformed(format!("`{}` is not numeric: {:?}", name, s))),
            other => Err(ModelError::malformed(format!(
                "`{}` should be a number, got {}",
                name,
                kind_of(other)
            ))),
        }
    }

    pub fn str_field<'a>(obj: &'a JsonObject, name: &str) -> Result<&'a str, ModelError> {
        field(obj, name)?
            .as_str()
            .ok_or_else(|| ModelError::malformed(format!("`{}` should be a string", name)))
    }

    /// `None` when absent or `null`.
    pub fn opt_str_field<'a>(obj: &'a JsonObject, name: &str) -> Option<&'a str> {
        obj.get(name).and_then(Value::as_str)
    }

    pub fn bool_field(obj: &JsonObject, name: &str) -> Result<bool, ModelError> {
        field(obj, name)?
            .as_bool()
            .ok_or_else(|| ModelError::malformed(format!("`{}` should be a boolean", name)))
    }

    pub fn object_field<'a>(obj: &'a JsonObject, name: &str) -> Result<&'a JsonObject, ModelError> {
        field(obj, name)?
            .as_object()
            .ok_or_else(|| ModelError::malformed(format!("`{}` should be an object", name)))
    }

    /// `None` when absent or `null`.
    pub fn opt_object_field<'a>(obj: &'a JsonObject, name: &str) -> Option<&'a JsonObject> {
        obj.get(name).and_then(Value::as_object)
    }

    /// `None` when absent or `null`.
    pub fn opt_array_field<'a>(
        obj: &'a JsonObject,
        name: &str,
    ) -> Result<Option<&'a Vec<Value>>, ModelError> {
        match obj.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(ModelError::malformed(format!(
                "`{}` should be an array, got {}",
                name,
                kind_of(other)
            ))),
        }
    }

    pub fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a JsonObject, ModelError> {
        value.as_object().ok_or_else(|| {
            ModelError::malformed(format!("{} should be an object, got {}", what, kind_of(value)))
        })
    }
}
