pub mod directory;
pub mod gateway;
pub mod loader;
pub mod memory;
pub mod save_queue;
pub mod studio;

pub use directory::DirectoryGateway;
pub use gateway::{validate_content_id, GatewayError, LoadOutcome, PersistenceGateway, StoredBlob};
pub use loader::{LoadTicket, LoadTracker};
pub use memory::MemoryGateway;
pub use save_queue::{SaveOutcome, SaveQueue};
pub use studio::{Opened, Studio, StudioError};
