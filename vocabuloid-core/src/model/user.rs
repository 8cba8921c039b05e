use std::sync::Arc;

use super::list::VocabularyList;
use super::payload::{bool_field, opt_str_field, u64_field};
use super::resolve::unwrap_single;
use super::slot::{LazySlot, SlotState};
use super::{ModelError, paths};
use crate::transport::Transport;

/// The signed-in user, root of the entity graph.
pub struct User {
    id: u64,
    name: Option<String>,
    is_admin: bool,
    lists: LazySlot<Vec<VocabularyList>>,
    transport: Arc<dyn Transport>,
}

impl User {
    /// A user known only by id.
    pub fn new(id: u64, transport: Arc<dyn Transport>) -> Self {
        Self {
            id,
            name: None,
            is_admin: false,
            lists: LazySlot::new(),
            transport,
        }
    }

    /// Fetch the user the stored access token belongs to.
    pub async fn current(transport: Arc<dyn Transport>) -> Result<Option<Self>, ModelError> {
        let Some(wrapper) = transport.fetch_object(&paths::current_user()).await? else {
            return Ok(None);
        };
        let (_, payload) = unwrap_single(&wrapper)?;

        let is_admin = match payload.get("admin") {
            None | Some(serde_json::Value::Null) => false,
            Some(_) => bool_field(payload, "admin")?,
        };

        let user = Self {
            id: u64_field(payload, "id")?,
            name: opt_str_field(payload, "name").map(str::to_string),
            is_admin,
            lists: LazySlot::new(),
            transport,
        };
        tracing::debug!("Current user is {}", user.id);
        Ok(Some(user))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn lists_state(&self) -> SlotState {
        self.lists.state()
    }

    /// The user's vocabulary lists, fetched on first read.
    pub async fn lists(&self) -> Result<Option<&[VocabularyList]>, ModelError> {
        let loaded = self
            .lists
            .get_or_load::<ModelError, _, _>(|| async {
                tracing::debug!("Fetching lists of user {}", self.id);
                let Some(items) = self
                    .transport
                    .fetch_collection(&paths::user_lists(self.id))
                    .await?
                else {
                    return Ok(None);
                };

                let mut lists = Vec::with_capacity(items.len());
                for item in &items {
                    lists.push(VocabularyList::from_summary(item, Arc::clone(&self.transport)).await?);
                }
                Ok(Some(lists))
            })
            .await?;

        Ok(loaded.map(Vec::as_slice))
    }

    /// The list at `position` in the user's collection.
    pub async fn list(&self, position: usize) -> Result<Option<&VocabularyList>, ModelError> {
        Ok(self.lists().await?.and_then(|lists| lists.get(position)))
    }

    pub async fn list_by_id(&self, id: u64) -> Result<Option<&VocabularyList>, ModelError> {
        Ok(self
            .lists()
            .await?
            .and_then(|lists| lists.iter().find(|list| list.id() == id)))
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("is_admin", &self.is_admin)
            .field("lists", &self.lists.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ListKind;
    use crate::transport::StubTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_current_user() {
        let stub = Arc::new(StubTransport::new().with_json(
            "/users/current.json",
            json!({"user": {"id": 7, "name": "ana", "admin": true}}),
        ));

        let user = User::current(stub).await.unwrap().unwrap();
        assert_eq!(user.id(), 7);
        assert_eq!(user.name(), Some("ana"));
        assert!(user.is_admin());
        assert_eq!(user.lists_state(), SlotState::Unloaded);
    }

    #[tokio::test]
    async fn test_current_user_empty_body() {
        let stub = Arc::new(StubTransport::new().with_empty("/users/current.json"));
        assert!(User::current(stub).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lists_lookup() {
        let stub = Arc::new(StubTransport::new().with_json(
            "/users/7/lists.json",
            json!([
                {"vocabulary_list": {"id": 3, "name": "Travel", "size": 2}},
                {"vocabulary_list": {"id": 4, "name": "Food", "size": 10}}
            ]),
        ));
        let user = User::new(7, stub.clone());

        assert_eq!(user.list(1).await.unwrap().map(|l| l.id()), Some(4));
        assert_eq!(user.list_by_id(3).await.unwrap().and_then(|l| l.name()), Some("Travel"));
        assert!(user.list(5).await.unwrap().is_none());
        assert_eq!(user.list(0).await.unwrap().and_then(|l| l.kind()), Some(ListKind::PlainList));
        assert_eq!(stub.request_count("/users/7/lists.json"), 1);
    }

    #[tokio::test]
    async fn test_malformed_list_element_fails_whole_collection() {
        let stub = Arc::new(StubTransport::new().with_json(
            "/users/7/lists.json",
            json!([{"vocabulary_list": {"id": 3}, "extra": {}}]),
        ));
        let user = User::new(7, stub);

        assert!(matches!(
            user.lists().await,
            Err(ModelError::MalformedPayload { .. })
        ));
        assert_eq!(user.lists_state(), SlotState::Unloaded);
    }
}
