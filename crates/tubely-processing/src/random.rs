use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Source of the unguessable object names used in storage keys.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 32 bytes from the thread-local CSPRNG, base64url without padding.
#[derive(Debug, Clone, Copy)]
pub struct RandomIdGenerator {
    byte_len: usize,
}

impl RandomIdGenerator {
    pub const DEFAULT_BYTE_LEN: usize = 32;

    pub fn new(byte_len: usize) -> Self {
        Self { byte_len }
    }
}

impl Default for RandomIdGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BYTE_LEN)
    }
}

impl IdGenerator for RandomIdGenerator {
    fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.byte_len];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }
}
