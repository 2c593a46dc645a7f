pub mod types;
pub mod board;
pub mod state;
pub mod rules;

pub use types::*;
pub use board::*;
pub use state::*;
pub use rules::*;
