pub mod cli;
pub mod config;
pub mod note;
pub mod session;
pub mod storage;
pub mod store;
pub mod text;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use note::{Note, NoteCollection, NoteColor, NoteKind};
pub use store::{NoteStore, NoteStoreError};
