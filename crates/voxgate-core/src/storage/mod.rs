//! Persistence: blob store client, conversation history, and archives.

pub mod archive;
pub mod blob;
pub mod history;
pub mod memory;

pub use archive::ConversationArchive;
pub use blob::{BlobStore, HttpBlobStore};
pub use history::{ConversationHistory, Exchange, HistoryBackend, HttpHistoryBackend, TableState};
