//! Streaming AES-256-CBC encryption of archive payloads.
//!
//! Container layout (the one bit-exact contract in this crate):
//! ```text
//! [ 8 bytes: payload size, little-endian u64]
//! [16 bytes: random IV]
//! [ N bytes: AES-256-CBC ciphertext, N a multiple of 16]
//! ```
//!
//! The final plaintext block is zero-padded to the cipher block size;
//! decryption recovers the exact payload by honoring the recorded size, so
//! the pad bytes never need to be distinguishable from real data. The
//! container carries no integrity tag: a wrong key or a corrupted body
//! decrypts to garbage, not to an error.

use std::io::{Read, Seek, SeekFrom, Write};

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryoError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size in bytes.
const BLOCK_SIZE: usize = 16;

/// IV length in bytes.
const IV_LEN: usize = 16;

/// Payloads are streamed through buffers of this size, so memory use is
/// bounded regardless of archive size. Must be a multiple of [`BLOCK_SIZE`].
const CHUNK_SIZE: usize = 24 * 1024;

/// Symmetric stream transform keyed by a passphrase.
///
/// Key material is zeroized on drop to keep it from lingering in memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct StreamCipher {
    key: [u8; 32],
}

impl StreamCipher {
    /// Derive the 256-bit key as the SHA-256 digest of the passphrase.
    ///
    /// Deterministic and unsalted: the same passphrase always opens the
    /// same archives, and the container stores no key-derivation metadata.
    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        Self { key: digest.into() }
    }

    /// Encrypt `input` into `output` as a sized container.
    ///
    /// The input must be seekable: its exact length is measured up front
    /// and recorded in the header, which is what lets decryption discard
    /// the final block's padding. A fresh IV is drawn from the OS RNG on
    /// every call, so encrypting the same payload twice yields different
    /// ciphertext.
    pub fn encrypt<R, W>(&self, input: &mut R, output: &mut W) -> Result<()>
    where
        R: Read + Seek,
        W: Write,
    {
        let original_size = input.seek(SeekFrom::End(0))?;
        input.seek(SeekFrom::Start(0))?;

        let mut iv = [0u8; IV_LEN];
        rand::rngs::OsRng.fill_bytes(&mut iv);

        output.write_all(&original_size.to_le_bytes())?;
        output.write_all(&iv)?;

        let mut enc = Aes256CbcEnc::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(&iv),
        );

        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            // Chunks must be refilled to capacity: only the final chunk of
            // the stream may be partial, since CBC state chains across
            // chunk boundaries.
            let len = fill_chunk(input, &mut buf)?;
            if len == 0 {
                break;
            }
            let padded = padded_len(len);
            buf[len..padded].fill(0);
            for block in buf[..padded].chunks_exact_mut(BLOCK_SIZE) {
                enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            output.write_all(&buf[..padded])?;
        }

        output.flush()?;
        Ok(())
    }

    /// Decrypt a container produced by [`StreamCipher::encrypt`].
    ///
    /// Exactly the recorded payload size is written to `output`; the
    /// trailing pad of the final block is discarded by counting, never by
    /// scanning for a padding marker. A stream too short to hold the
    /// 24-byte header, a ciphertext body that is not a whole number of
    /// cipher blocks, or a body that ends before the recorded size is
    /// reached all fail with [`CryoError::MalformedContainer`].
    pub fn decrypt<R, W>(&self, input: &mut R, output: &mut W) -> Result<()>
    where
        R: Read,
        W: Write,
    {
        let mut size_bytes = [0u8; 8];
        read_header_field(input, &mut size_bytes)?;
        let mut iv = [0u8; IV_LEN];
        read_header_field(input, &mut iv)?;
        let original_size = u64::from_le_bytes(size_bytes);

        let mut dec = Aes256CbcDec::new(
            GenericArray::from_slice(&self.key),
            GenericArray::from_slice(&iv),
        );

        let mut remaining = original_size;
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let len = fill_chunk(input, &mut buf)?;
            if len == 0 {
                break;
            }
            if len % BLOCK_SIZE != 0 {
                return Err(CryoError::MalformedContainer(format!(
                    "ciphertext body length is not a multiple of {BLOCK_SIZE}"
                )));
            }
            for block in buf[..len].chunks_exact_mut(BLOCK_SIZE) {
                dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
            }
            let take = remaining.min(len as u64) as usize;
            output.write_all(&buf[..take])?;
            remaining -= take as u64;
        }

        if remaining > 0 {
            return Err(CryoError::MalformedContainer(format!(
                "container ends {remaining} bytes short of its recorded size"
            )));
        }

        output.flush()?;
        Ok(())
    }
}

fn padded_len(len: usize) -> usize {
    match len % BLOCK_SIZE {
        0 => len,
        rem => len + (BLOCK_SIZE - rem),
    }
}

/// Read until `buf` is full or the stream ends. Returns the bytes read.
fn fill_chunk<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn read_header_field<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            CryoError::MalformedContainer("container shorter than its 24-byte header".into())
        }
        _ => CryoError::Io(e),
    })
}
