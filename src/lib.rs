//! MiniFS: a flat-image, two-level filesystem. Block 0 holds the root
//! directory, each subdirectory owns one block of 8.3 file entries, and file
//! contents live in singly linked chains of data blocks.

pub mod cli;
pub mod disk;
pub mod fs;
pub mod logging;
pub mod shell;
