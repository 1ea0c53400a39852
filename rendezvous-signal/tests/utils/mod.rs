pub mod mock_output;

pub use mock_output::*;
pub use mock_peer::*;
pub use session_helpers::*;
