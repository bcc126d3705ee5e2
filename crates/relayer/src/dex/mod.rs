//! Order manager integration for the relayer.

mod handler;
mod types;

pub use handler::DexHandler;
pub use types::{DexError, DexResult};
