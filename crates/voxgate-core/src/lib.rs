//! Voxgate core: clients for the managed conversation, speech, and storage
//! services, plus the transcription orchestrator that ties blob staging,
//! asynchronous jobs, and bounded polling together.

pub mod chat;
pub mod clock;
pub mod config;
pub mod error;
pub mod speech;
pub mod storage;
pub mod transcribe;

pub use config::Config;
pub use error::{Error, Result};
