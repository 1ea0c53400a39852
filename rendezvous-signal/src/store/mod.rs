mod document_store;
mod memory_store;
mod remote_store;
mod room_client;

pub use document_store::*;
pub use memory_store::*;
pub use remote_store::*;
pub use room_client::*;
