//! Code-unit images
//!
//! Big-endian binary layout:
//!
//! ```text
//! magic u32 "DRFT" | major u8 | minor u8 | patch u8 | reserved u8
//! unit:
//!   u32 n, n operation bytes
//!   u32 n, n tagged constants
//!       0x00 none | 0x01 f64 | 0x02 string | 0x03 name, u32 arity, unit
//!   u32 n, n names
//!   u32 n, n u32 operand indices
//! strings are u32 length + UTF-8
//! ```

pub mod loader;
pub mod writer;

pub use loader::ImageLoader;
pub use writer::ImageWriter;

/// Image magic: "DRFT"
pub(crate) const IMAGE_MAGIC: u32 = 0x4452_4654;

/// Supported image version
pub(crate) const VERSION_MAJOR: u8 = 1;

/// Deepest function-in-function nesting accepted
pub(crate) const MAX_NESTING: usize = 64;

pub(crate) const TAG_NONE: u8 = 0x00;
pub(crate) const TAG_NUMBER: u8 = 0x01;
pub(crate) const TAG_STRING: u8 = 0x02;
pub(crate) const TAG_FUNCTION: u8 = 0x03;
