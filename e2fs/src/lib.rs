// SPDX-License-Identifier: MIT

//! Second extended filesystem (ext2, revision 1) engine over positioned
//! block I/O: on-disk structure decoding, directory listing, path
//! resolution, byte-addressed file content access, and allocation.

pub mod allocator;
pub mod bitmap;
pub mod block_map;
pub mod checker;
pub mod constant;
pub mod data;
pub mod error;
pub mod formatter;
pub mod injector;
mod macros;
pub mod meta;
pub mod parser;
pub mod reader;
pub mod types;
pub mod volume;

pub mod prelude {
    pub use crate::checker::CheckReport;
    pub use crate::constant::*;
    pub use crate::error::{Ext2Error, Ext2Result};
    pub use crate::formatter::{Ext2FormatParams, Ext2Formatter};
    pub use crate::meta::Ext2Meta;
    pub use crate::reader::InodeReader;
    pub use crate::types::*;
    pub use crate::volume::Ext2Volume;
    pub use e2io::prelude::*;
}
