mod channel_output;
mod signaling_output;

pub use channel_output::*;
pub use signaling_output::*;
