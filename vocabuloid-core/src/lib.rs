//! # Vocabuloid Core
//!
//! Client library for the vocabulario.me flashcard service.
//!
//! This crate provides:
//! - An OAuth 1.0a credential store, request signer and authorization flow
//! - A signed JSON transport over HTTPS
//! - A lazily loaded entity graph of users, vocabulary lists, vocabularies
//!   and their translations or conjugations
//! - A [`Session`] facade tying them together
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vocabuloid_core::{Session, load_config};
//!
//! # async fn example() -> Result<(), vocabuloid_core::VocabuloidError> {
//! let config = load_config(None)?;
//! let session = Session::from_config(&config)?;
//!
//! if let Some(user) = session.current_user().await? {
//!     for name in session.load_user_lists(&user).await? {
//!         println!("{}", name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod model;
pub mod oauth;
pub mod session;
pub mod store;
pub mod transport;

pub use config::{ClientConfig, ConfigError, Messages, ServiceConfig, TransportConfig, load_config};

pub use credentials::{CredentialKey, CredentialStore, Credentials, TokenPair, TokenSlot};

pub use error::VocabuloidError;

pub use model::{
    Language,
    ListKind,
    ModelError,
    Selector,
    Translation,
    User,
    Vocabulary,
    VocabularyList,
    format_list,
};

pub use oauth::{AuthorizationError, AuthorizationFlow, AuthorizationState};

pub use session::{Connectivity, Flashcard, Flashcards, Session, TcpProbe};

pub use store::{
    MemoryStore,
    FileStore,
    Secret,
    SecretStore,
    StoreBackend,
    StoreError,
    create_store,
};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;

pub use transport::{SignedTransport, StubTransport, Transport, TransportError};
