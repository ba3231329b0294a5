//! API endpoint implementations.

mod inventory;
mod search_index;
mod service_instance;
mod session_manager;

pub use inventory::InventoryApi;
pub use search_index::SearchIndexApi;
pub use service_instance::ServiceInstanceApi;
pub use session_manager::SessionManagerApi;
