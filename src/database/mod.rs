pub mod lancedb;
pub mod sqlite;
