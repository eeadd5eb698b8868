// src/assets/constants.rs
// Asset container layout constants
// For runtime defaults, see defaults.rs

// Header: stored_files u32 | checksum u32 | stored_len u32
pub const CONTAINER_HEADER_SIZE: usize = 12;

// Table entry: name [u8; 32] | size u32 | offset u32 | width u16 | height u16
pub const ENTRY_NAME_LEN: usize = 32;
pub const TABLE_ENTRY_SIZE: usize = ENTRY_NAME_LEN + 4 + 4 + 2 + 2;

// Every payload in the data section is preceded by this marker
pub const ENTRY_MAGIC: [u8; 2] = [0x5A, 0x5A];
pub const ENTRY_MAGIC_SIZE: usize = ENTRY_MAGIC.len();

// Reserved manifest filename inside every asset package
pub const MANIFEST_FILENAME: &str = "index.json";

// Image header preceding icon pixel data:
// magic u8 | cf u8 | flags u16 | w u16 | h u16 | stride u16 | reserved u16
pub const IMAGE_HEADER_SIZE: usize = 12;
