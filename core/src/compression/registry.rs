//! compression/registry.rs
//! Codec registry: wire code -> codec instance.
//!
//! Industry notes:
//! - Registration and lookup may race freely; the map sits behind an `RwLock`.
//! - A code is claimed once. A second registration is `DuplicateCodec` and the
//!   existing codec stays in place.
//! - The process-wide registry is built on first touch with gzip, snappy,
//!   lz4 and zstd.
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::compression::codecs::{gzip, lz4, snappy, zstd};
use crate::compression::types::{Codec, CodecError};

#[derive(Default)]
pub struct CodecRegistry {
    codecs: RwLock<HashMap<i8, Arc<dyn Codec>>>,
}

impl CodecRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in codecs.
    pub fn with_defaults() -> Result<Self, CodecError> {
        let registry = Self::new();
        registry.register_defaults()?;
        Ok(registry)
    }

    /// Register gzip, snappy, lz4 and zstd.
    pub fn register_defaults(&self) -> Result<(), CodecError> {
        gzip::register(self)?;
        snappy::register(self)?;
        lz4::register(self)?;
        zstd::register(self)?;
        Ok(())
    }

    /// Build a codec with `factory` and claim its code.
    ///
    /// # Errors
    /// `DuplicateCodec` when the code is already taken; the new codec is dropped.
    pub fn register<C, F>(&self, factory: F) -> Result<Arc<dyn Codec>, CodecError>
    where
        C: Codec + 'static,
        F: FnOnce() -> C,
    {
        let codec: Arc<dyn Codec> = Arc::new(factory());
        self.insert(codec)
    }

    /// Claim the code of an already built codec.
    pub fn insert(&self, codec: Arc<dyn Codec>) -> Result<Arc<dyn Codec>, CodecError> {
        let code = codec.code();
        let mut codecs = self.codecs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = codecs.get(&code) {
            return Err(CodecError::DuplicateCodec { code, name: existing.name() });
        }
        codecs.insert(code, Arc::clone(&codec));
        debug!(code, name = codec.name(), "registered codec");
        Ok(codec)
    }

    /// Resolve a wire code.
    pub fn lookup(&self, code: i8) -> Result<Arc<dyn Codec>, CodecError> {
        self.codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&code)
            .cloned()
            .ok_or(CodecError::UnknownCodec { code })
    }

    /// Resolve a codec by its diagnostic name.
    pub fn lookup_name(&self, name: &str) -> Result<Arc<dyn Codec>, CodecError> {
        self.codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|codec| codec.name() == name)
            .cloned()
            .ok_or_else(|| CodecError::UnknownCodecName(name.to_string()))
    }

    /// Registered codes, ascending.
    pub fn codes(&self) -> Vec<i8> {
        let mut codes: Vec<i8> = self
            .codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.codecs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry").field("codes", &self.codes()).finish()
    }
}

static GLOBAL: Lazy<CodecRegistry> = Lazy::new(|| {
    let registry = CodecRegistry::new();
    if let Err(err) = registry.register_defaults() {
        warn!(error = %err, "failed to register built-in codecs");
    }
    registry
});

/// The process-wide registry, initialised with the built-in codecs.
pub fn global() -> &'static CodecRegistry {
    &GLOBAL
}

/// Register a codec in the process-wide registry.
pub fn register_codec<C, F>(factory: F) -> Result<Arc<dyn Codec>, CodecError>
where
    C: Codec + 'static,
    F: FnOnce() -> C,
{
    global().register(factory)
}

/// Resolve a wire code in the process-wide registry.
pub fn lookup(code: i8) -> Result<Arc<dyn Codec>, CodecError> {
    global().lookup(code)
}
