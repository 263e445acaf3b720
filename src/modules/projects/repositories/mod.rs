pub mod memory_store;
pub mod mysql_store;
pub mod store;

pub use memory_store::InMemoryProjectStore;
pub use mysql_store::MySqlProjectStore;
pub use store::{ProjectFilter, ProjectStore, UnitOfWork, Write};
