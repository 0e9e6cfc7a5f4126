/// Stable codec ids (i8) carried next to compressed batches on the wire.
pub mod codec_ids {
    pub const NONE: i8   = 0;
    pub const GZIP: i8   = 1;
    pub const SNAPPY: i8 = 2;
    pub const LZ4: i8    = 3;
    pub const ZSTD: i8   = 4;
}

/// Default compression levels (balanced).
pub const DEFAULT_LEVEL_GZIP: u32 = 6;
pub const DEFAULT_LEVEL_ZSTD: i32 = 3;

/// Inclusive level bounds accepted from configuration.
pub const MAX_LEVEL_GZIP: u32 = 9;
pub const MAX_LEVEL_ZSTD: i32 = 22;

/// Bytes pulled from a source per read while decompressing (32 KiB).
pub const READ_BUFFER_SIZE: usize = 32 * 1024;

/// Scratch output window for streaming engines (32 KiB).
pub const SCRATCH_SIZE: usize = 32 * 1024;

/// Xerial framing: "\x82SNAPPY\0" magic, version 1, min-compatible version 1.
pub const XERIAL_HEADER: [u8; 16] = [
    0x82, b'S', b'N', b'A', b'P', b'P', b'Y', 0x00, // magic
    0x00, 0x00, 0x00, 0x01,                         // version
    0x00, 0x00, 0x00, 0x01,                         // min compatible version
];
pub const XERIAL_HEADER_LEN: usize = XERIAL_HEADER.len();
pub const XERIAL_LEN_PREFIX: usize = 4;

/// Default uncompressed size of one xerial chunk when framing (32 KiB).
pub const DEFAULT_XERIAL_BLOCK_SIZE: usize = 32 * 1024;

/// Pooled buffers above this capacity are shrunk on reset (1 MiB).
pub const MAX_RETAINED_BUFFER: usize = 1024 * 1024;
