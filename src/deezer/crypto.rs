//! Deezer media decryption.
//!
//! Deezer serves media as `BF_CBC_STRIPE`: the file is cut into 2048 byte chunks
//! and every third chunk, starting with the first, is Blowfish CBC encrypted with a
//! key derived from the track id. A trailing partial chunk is never encrypted.

use blowfish::Blowfish;
use cipher::block_padding::NoPadding;
use cipher::{BlockDecryptMut, KeyIvInit};
use md5::{Digest, Md5};

use crate::ports::deezer::DeezerError;

type BlowfishCbc = cbc::Decryptor<Blowfish>;

const CHUNK_SIZE: usize = 2048;
const IV: [u8; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
const SECRET: &[u8; 16] = b"g4el58wc0zvf9na1";

/// Blowfish key for one track
pub fn track_key(track_id: &str) -> [u8; 16] {
    let digest = hex::encode(Md5::digest(track_id.as_bytes()));
    let digest = digest.as_bytes();
    std::array::from_fn(|i| digest[i] ^ digest[i + 16] ^ SECRET[i])
}

fn decrypt_chunk(key: &[u8; 16], chunk: &mut [u8]) -> Result<(), DeezerError> {
    let cipher = BlowfishCbc::new_from_slices(key, &IV)
        .map_err(|e| DeezerError::Decryption(format!("Invalid Blowfish key: {}", e)))?;
    cipher
        .decrypt_padded_mut::<NoPadding>(chunk)
        .map_err(|e| DeezerError::Decryption(e.to_string()))?;
    Ok(())
}

/// Decrypts a stripe-encrypted stream fed in arbitrarily sized pieces.
pub struct StripeDecryptor {
    key: [u8; 16],
    buffer: Vec<u8>,
    chunk_index: u64,
}

impl StripeDecryptor {
    pub fn new(track_id: &str) -> Self {
        Self {
            key: track_key(track_id),
            buffer: Vec::with_capacity(CHUNK_SIZE),
            chunk_index: 0,
        }
    }

    /// Feed more bytes and get back every complete chunk, decrypted
    pub fn update(&mut self, data: &[u8]) -> Result<Vec<u8>, DeezerError> {
        self.buffer.extend_from_slice(data);

        let complete = self.buffer.len() / CHUNK_SIZE * CHUNK_SIZE;
        let mut output: Vec<u8> = self.buffer.drain(..complete).collect();

        for chunk in output.chunks_exact_mut(CHUNK_SIZE) {
            if self.chunk_index % 3 == 0 {
                decrypt_chunk(&self.key, chunk)?;
            }
            self.chunk_index += 1;
        }

        Ok(output)
    }

    /// The unencrypted tail left over once the stream ends
    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}
