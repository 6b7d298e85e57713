//! Loopback transmitter for the round-trip tests
//!
//! Builds complete COFDMTV bursts the way the matching transmitter
//! does: a half-spectrum-repeating training symbol, the BCH-protected
//! metadata symbol, one reference symbol seeding the differential
//! chain, then the polar-coded payload symbols, all glued with
//! raised-cosine guard crossfades and mixed up to an audio carrier.

use cofdmtv::coding::bch::{Bch, MINIMAL_POLYNOMIALS};
use cofdmtv::coding::crc::{metadata_checksum, CRC32_PAYLOAD};
use cofdmtv::coding::mls::Mls;
use cofdmtv::coding::polar::frozen::{FrozenTables, CODE_BITS, DATA_BITS};
use cofdmtv::coding::polar::{encoder as polar_encoder, shorten, CodeProfile};
use cofdmtv::coding::psk::mod_map;
use cofdmtv::coding::xorshift::Xorshift32;
use cofdmtv::message::mode_info;
use bitvec::prelude::*;
use rustfft::num_complex::Complex32;
use std::f32::consts::PI;

const COR_SEQ_POLY: u64 = 0b10001001;
const COR_SEQ_LEN: isize = 127;
const COR_SEQ_OFF: isize = 1 - COR_SEQ_LEN;
const PRE_SEQ_POLY: u64 = 0b100101011;
const PRE_SEQ_LEN: isize = 255;
const PRE_SEQ_OFF: isize = -PRE_SEQ_LEN / 2;
const REF_SEQ_POLY: u64 = 0b100101010001;

fn nrz(bit: bool) -> f32 {
    if bit {
        -1.0
    } else {
        1.0
    }
}

pub struct Transmitter {
    symbol_len: usize,
    guard_len: usize,
    extended_len: usize,
    carrier_shift: isize,
    carrier_count: usize,
    symbol_count: usize,
    mod_bits: usize,
    carrier_offset: isize,
    freq: Vec<Complex32>,
    temp: Vec<Complex32>,
    guard: Vec<Complex32>,
    prev: Vec<Complex32>,
    code: Vec<f32>,
    ref_seq: Mls,
    output: Vec<Complex32>,
}

impl Transmitter {
    /// `carrier_hz` must land on an even subcarrier (the protocol's
    /// 2000 Hz center does for every supported rate).
    pub fn new(rate: u32, mode: u8, carrier_hz: f32) -> Self {
        let symbol_len = (1280 * rate as usize) / 8000;
        let guard_len = symbol_len / 8;
        let info = mode_info(mode).expect("supported mode");
        let carrier_shift =
            (carrier_hz * symbol_len as f32 / rate as f32).round() as isize;
        assert_eq!(carrier_shift % 2, 0, "carrier must preserve half-symbol repetition");
        Self {
            symbol_len,
            guard_len,
            extended_len: symbol_len + guard_len,
            carrier_shift,
            carrier_count: info.carrier_count,
            symbol_count: info.symbol_count,
            mod_bits: info.mod_bits,
            carrier_offset: -(info.carrier_count as isize) / 2,
            freq: vec![Complex32::new(0.0, 0.0); symbol_len],
            temp: vec![Complex32::new(0.0, 0.0); symbol_len],
            guard: vec![Complex32::new(0.0, 0.0); guard_len],
            prev: vec![Complex32::new(0.0, 0.0); info.carrier_count],
            code: Vec::new(),
            ref_seq: Mls::new(REF_SEQ_POLY),
            output: Vec::new(),
        }
    }

    fn bin(&self, carrier: isize) -> usize {
        (carrier + self.carrier_shift + self.symbol_len as isize) as usize
            % self.symbol_len
    }

    fn transform(&mut self) {
        cofdmtv::dsp::fft::inverse_fft(&mut self.temp, &self.freq);
        let scale = ((8 * self.symbol_len) as f32).sqrt();
        for t in self.temp.iter_mut() {
            *t /= scale;
        }
    }

    /// Emit guard (raised-cosine crossfade into the cyclic tail of the
    /// current symbol) followed by the symbol body.
    fn emit(&mut self, data_symbol: bool) {
        for i in 0..self.guard_len {
            let mut x = i as f32 / (self.guard_len - 1) as f32;
            if data_symbol {
                x = if x < 0.5 { x / 0.5 } else { 1.0 };
            }
            let y = 0.5 * (1.0 - (PI * x).cos());
            let tail = self.temp[i + self.symbol_len - self.guard_len];
            let sum = (1.0 - y) * self.guard[i] + y * tail;
            self.output.push(sum);
        }
        for i in 0..self.guard_len {
            self.guard[i] = self.temp[i];
        }
        self.output.extend_from_slice(&self.temp);
    }

    pub fn silence(&mut self, blocks: usize) {
        self.temp.fill(Complex32::new(0.0, 0.0));
        for _ in 0..blocks {
            self.emit(false);
        }
    }

    fn training_symbol(&mut self) {
        let mut seq = Mls::new(COR_SEQ_POLY);
        let factor = ((2 * self.symbol_len) as f32 / COR_SEQ_LEN as f32).sqrt();
        self.freq.fill(Complex32::new(0.0, 0.0));
        let pilot = self.bin(COR_SEQ_OFF - 2);
        self.freq[pilot] = Complex32::new(factor, 0.0);
        for i in 0..COR_SEQ_LEN {
            let idx = self.bin(2 * i + COR_SEQ_OFF);
            self.freq[idx] = Complex32::new(nrz(seq.next()), 0.0);
        }
        for i in 0..COR_SEQ_LEN {
            let prev = self.freq[self.bin(2 * (i - 1) + COR_SEQ_OFF)];
            let idx = self.bin(2 * i + COR_SEQ_OFF);
            self.freq[idx] *= prev;
        }
        self.transform();
        self.emit(true);
    }

    fn metadata_symbol(&mut self, metadata: u64, corrupt_checksum: bool) {
        let mut data = bitarr![u8, Msb0; 0; 256];
        for i in 0..55 {
            data.set(i, (metadata >> i) & 1 == 1);
        }
        let mut cs = metadata_checksum(metadata);
        if corrupt_checksum {
            cs ^= 1;
        }
        for i in 0..16 {
            data.set(i + 55, (cs >> i) & 1 == 1);
        }
        let bch = Bch::new(&MINIMAL_POLYNOMIALS);
        let parity = bch.parity(&data[..71]);

        let factor = (self.symbol_len as f32 / PRE_SEQ_LEN as f32).sqrt();
        self.freq.fill(Complex32::new(0.0, 0.0));
        let pilot = self.bin(PRE_SEQ_OFF - 1);
        self.freq[pilot] = Complex32::new(factor, 0.0);
        for i in 0..71 {
            let idx = self.bin(i as isize + PRE_SEQ_OFF);
            self.freq[idx] = Complex32::new(nrz(data[i]), 0.0);
        }
        for i in 71..PRE_SEQ_LEN as usize {
            let idx = self.bin(i as isize + PRE_SEQ_OFF);
            self.freq[idx] = Complex32::new(nrz(parity[i - 71]), 0.0);
        }
        for i in 0..PRE_SEQ_LEN {
            let prev = self.freq[self.bin(i - 1 + PRE_SEQ_OFF)];
            let idx = self.bin(i + PRE_SEQ_OFF);
            self.freq[idx] *= prev;
        }
        let mut seq = Mls::new(PRE_SEQ_POLY);
        for i in 0..PRE_SEQ_LEN {
            let idx = self.bin(i + PRE_SEQ_OFF);
            self.freq[idx] *= nrz(seq.next());
        }
        self.transform();
        self.emit(true);
    }

    /// Uncoded symbol seeding the differential chain.
    fn reference_symbol(&mut self) {
        let factor = (self.symbol_len as f32 / self.carrier_count as f32).sqrt();
        let amp = factor * std::f32::consts::FRAC_1_SQRT_2;
        self.freq.fill(Complex32::new(0.0, 0.0));
        for i in 0..self.carrier_count {
            let c = Complex32::new(
                amp * nrz(self.ref_seq.next()),
                amp * nrz(self.ref_seq.next()),
            );
            self.prev[i] = c;
            let idx = self.bin(i as isize + self.carrier_offset);
            self.freq[idx] = c;
        }
        self.transform();
        self.emit(true);
    }

    fn payload_symbol(&mut self, symbol_number: usize) {
        self.freq.fill(Complex32::new(0.0, 0.0));
        for i in 0..self.carrier_count {
            let base = self.mod_bits * (self.carrier_count * symbol_number + i);
            let point = mod_map(&self.code[base..base + self.mod_bits], self.mod_bits);
            self.prev[i] *= point;
            let idx = self.bin(i as isize + self.carrier_offset);
            self.freq[idx] = self.prev[i];
        }
        self.transform();
        self.emit(true);
    }

    fn encode_payload(&mut self, payload: &[u8], mode: u8) {
        let profile = CodeProfile::of_mode(mode).expect("supported mode");
        let tables = FrozenTables::construct();
        let table = match profile.cons_bits {
            64800 => &tables.long,
            _ => &tables.short,
        };

        let mut scrambler = Xorshift32::new();
        let mut scrambled = vec![0u8; DATA_BITS / 8];
        for (i, byte) in scrambled.iter_mut().enumerate() {
            let d = if i < payload.len() { payload[i] } else { 0 };
            *byte = d ^ scrambler.next() as u8;
        }
        let crc = CRC32_PAYLOAD.checksum(&scrambled);

        let mut mesg = vec![0u8; profile.mesg_bits];
        for i in 0..DATA_BITS {
            mesg[i] = (scrambled[i / 8] >> (i % 8)) & 1;
        }
        for i in 0..32 {
            mesg[DATA_BITS + i] = ((crc >> i) & 1) as u8;
        }

        let mut codeword = vec![0u8; CODE_BITS];
        polar_encoder::encode_systematic(&mut codeword, &mesg, table);
        self.code = vec![0.0; profile.cons_bits];
        shorten(&mut self.code, &codeword, table, profile);
    }

    /// Build one complete burst around `payload`, with leading and
    /// trailing silence blocks.
    pub fn burst(&mut self, payload: &[u8], metadata: u64, corrupt_checksum: bool) {
        let mode = (metadata & 255) as u8;
        if mode_info(mode).is_some() {
            self.encode_payload(payload, mode);
        }
        self.silence(3);
        self.training_symbol();
        self.metadata_symbol(metadata, corrupt_checksum);
        if mode_info(mode).is_some() && !corrupt_checksum {
            self.reference_symbol();
            for k in 0..self.symbol_count {
                self.payload_symbol(k);
            }
        }
        self.silence(8);
    }

    /// Render the complex stream as real mono PCM on the carrier.
    pub fn mono_blocks(&self) -> Vec<i16> {
        self.output
            .iter()
            .map(|c| (c.re * 32767.0).round().clamp(-32768.0, 32767.0) as i16)
            .collect()
    }

    /// Render as interleaved I/Q PCM.
    pub fn iq_blocks(&self) -> Vec<i16> {
        let mut out = Vec::with_capacity(2 * self.output.len());
        for c in &self.output {
            out.push((c.re * 32767.0).round().clamp(-32768.0, 32767.0) as i16);
            out.push((c.im * 32767.0).round().clamp(-32768.0, 32767.0) as i16);
        }
        out
    }

    pub fn extended_len(&self) -> usize {
        self.extended_len
    }
}
