mod controller_command;
mod controller_config;
mod negotiation_state;
mod session_handle;
mod signalling_controller;

pub use controller_command::*;
pub use controller_config::*;
pub use negotiation_state::*;
pub use session_handle::*;
pub use signalling_controller::*;
