pub mod controller;
pub mod error;
pub mod peer;
pub mod server;
pub mod signaling;
pub mod store;

pub use controller::*;
pub use error::*;
pub use peer::*;
pub use server::*;
pub use signaling::*;
pub use store::*;
