//! Channel coding and protocol arithmetic
//!
//! Everything between raw soft carriers and payload bytes: the MLS
//! sequence generator, protocol CRCs, PSK mappings, the BCH-protected
//! preamble decoder (ordered statistics), the CA-SCL polar payload
//! decoder and the Cauchy Reed-Solomon erasure code over GF(2^16).

pub mod bch;
pub mod crc;
pub mod crs;
pub mod galois;
pub mod mls;
pub mod osd;
pub mod polar;
pub mod psk;
pub mod xorshift;
