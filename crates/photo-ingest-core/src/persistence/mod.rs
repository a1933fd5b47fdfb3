mod db;
mod error;
mod models;

pub use db::{RecordStore, SqliteStore};
pub use error::{PersistenceError, PersistenceResult};
pub use models::{NewPhoto, PhotoRecord};
