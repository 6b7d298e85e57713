//! Erasure recovery across bursts
//!
//! Each successfully decoded burst contributes one chunk of a larger
//! logical payload. Up to twelve chunks are held, keyed by the 16-bit
//! identifier from the chunk header; once enough distinct chunks have
//! arrived, Cauchy Reed-Solomon decoding over GF(2^16) reassembles
//! the original bytes and reports their CRC-32.

use crate::coding::crc::CRC32_CHUNKS;
use crate::coding::crs::CauchyReedSolomon;

/// Number of chunk slots.
pub const SLOTS: usize = 12;
/// Bytes of one erasure-code block.
pub const BLOCK_BYTES: usize = 5376;
/// Wire header stripped from each chunk payload.
pub const HEADER_BYTES: usize = 14;

pub struct EraseRecoverer {
    crs: CauchyReedSolomon,
    chunk_data: Vec<u8>,
    chunk_mesg: Vec<u8>,
    chunk_ident: [u16; SLOTS],
}

impl EraseRecoverer {
    pub fn new() -> Self {
        Self {
            crs: CauchyReedSolomon::new(),
            chunk_data: vec![0; SLOTS * BLOCK_BYTES],
            chunk_mesg: vec![0; BLOCK_BYTES],
            chunk_ident: [0; SLOTS],
        }
    }

    /// Store the body of a received chunk in slot `idx`. The first
    /// `HEADER_BYTES` of `payload` are wire framing and skipped; the
    /// slot tail beyond the supplied bytes is zeroed.
    pub fn chunk(&mut self, payload: &[u8], idx: usize, ident: u16) -> bool {
        if idx >= SLOTS || payload.len() <= HEADER_BYTES {
            return false;
        }
        self.chunk_ident[idx] = ident;
        let body = &payload[HEADER_BYTES..];
        let copy = body.len().min(BLOCK_BYTES);
        let slot = &mut self.chunk_data[idx * BLOCK_BYTES..(idx + 1) * BLOCK_BYTES];
        slot[..copy].copy_from_slice(&body[..copy]);
        slot[copy..].fill(0);
        true
    }

    /// Reassemble `total_size` bytes from the first `count` slots into
    /// `out` and return the CRC-32 of the emitted bytes. The caller
    /// guarantees the identifiers are distinct.
    pub fn recover(&mut self, out: &mut [u8], total_size: usize, count: usize) -> u32 {
        let mut copy = total_size.div_ceil(count);
        let mut digest = CRC32_CHUNKS.digest();
        let mut written = 0;
        for i in 0..count {
            self.crs.decode(
                &mut self.chunk_mesg,
                &self.chunk_data,
                &self.chunk_ident[..count],
                i,
                BLOCK_BYTES,
                count,
            );
            if written + copy > total_size {
                copy = total_size - written;
            }
            out[written..written + copy].copy_from_slice(&self.chunk_mesg[..copy]);
            digest.update(&self.chunk_mesg[..copy]);
            written += copy;
        }
        digest.finalize()
    }
}

impl Default for EraseRecoverer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Transmit side of the chunk stage, mirrored here for loopback.
    fn encode_chunks(message: &[u8], idents: &[u16], count: usize) -> Vec<Vec<u8>> {
        let crs = CauchyReedSolomon::new();
        idents
            .iter()
            .map(|&ident| {
                let mut payload = vec![0u8; HEADER_BYTES + BLOCK_BYTES];
                crs.encode(
                    &mut payload[HEADER_BYTES..],
                    message,
                    ident,
                    BLOCK_BYTES,
                    count,
                );
                payload
            })
            .collect()
    }

    #[test]
    fn test_chunk_rejects_bad_input() {
        let mut er = EraseRecoverer::new();
        assert!(!er.chunk(&[0u8; 100], SLOTS, 1));
        assert!(!er.chunk(&[0u8; HEADER_BYTES], 0, 1));
        assert!(er.chunk(&[0u8; HEADER_BYTES + 1], 0, 1));
    }

    #[test]
    fn test_recover_partial_set() {
        // four chunks, recovery of a size that does not divide evenly:
        // the payload travels as ceil(total/count)-byte slices, each
        // zero-padded into its own block
        let count = 4;
        let total = 4 * BLOCK_BYTES - 100;
        let payload: Vec<u8> = (0..total).map(|i| (i * 11 + 3) as u8).collect();
        let slice = total.div_ceil(count);
        let mut message = vec![0u8; count * BLOCK_BYTES];
        for i in 0..count {
            let lo = i * slice;
            let hi = total.min(lo + slice);
            message[i * BLOCK_BYTES..i * BLOCK_BYTES + (hi - lo)]
                .copy_from_slice(&payload[lo..hi]);
        }
        let idents = [40u16, 41, 42, 43];
        let chunks = encode_chunks(&message, &idents, count);

        let mut er = EraseRecoverer::new();
        for (i, chunk) in chunks.iter().enumerate() {
            assert!(er.chunk(chunk, i, idents[i]));
        }
        let mut out = vec![0u8; total];
        let crc = er.recover(&mut out, total, count);
        assert_eq!(&out[..], &payload[..]);
        assert_eq!(crc, CRC32_CHUNKS.checksum(&payload));
    }
}
