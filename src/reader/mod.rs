//! Source reading
//!
//! - `item`: logical items and the one-slot pushback stream interface
//! - `stream`: free-form source to items (continuations, `;`, comments)

pub mod item;
pub mod stream;

pub use item::{Item, ItemKind, ItemQueue, ItemSource};
pub use stream::{FreeFormReader, ReaderOptions};
