pub mod audio;
pub mod client;
pub mod error;
pub mod http;
pub mod items;
pub mod notes;
pub mod outline;
pub mod pipeline;
pub mod recover;
pub mod render;
pub mod summary;
pub mod transcribe;
pub mod types;
pub mod windows;

pub use error::*;
pub use types::*;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
