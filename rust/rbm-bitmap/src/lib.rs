//! Compressed bitmaps over the `u32` domain.
//!
//! A [`Bitmap`] splits every member into a 16-bit key (the high half) and a
//! 16-bit low half. All members sharing a key live in one [`Container`], and
//! the bitmap keeps a registry of `(key, container, copy_on_write)` entries
//! sorted by key.

pub mod bitmap;
pub mod container;

pub use bitmap::Bitmap;
pub use container::{Container, ContainerKind};
