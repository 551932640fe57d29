// Public library interface for masonry-layout
// The CLI and the debug-layout tool both drive the engine through these modules

pub mod cache;
pub mod config;
pub mod error;
pub mod handler;
pub mod items;
pub mod layout;
pub mod source;

pub use error::LayoutError;
