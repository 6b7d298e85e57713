//! Burst decoder pipeline
//!
//! Owns every stage between raw PCM and payload bits: the analytic
//! front end feeding the ring buffer, the Schmidl-Cox correlator, the
//! BCH/OSD preamble decoder, the differential OFDM symbol demodulator
//! with Theil-Sen equalization, and the polar payload decoder behind
//! `fetch`. One `process` call consumes one extended-symbol block of
//! audio and steps the burst state machine by at most one symbol.

use bitvec::prelude::*;
use rustfft::num_complex::Complex32;
use snafu::Snafu;
use std::f32::consts::TAU;
use tracing::debug;

use crate::coding::bch::{Bch, MINIMAL_POLYNOMIALS};
use crate::coding::crc::metadata_checksum;
use crate::coding::mls::Mls;
use crate::coding::osd::OrderedStatisticsDecoder;
use crate::coding::polar::frozen::{CODE_BITS, DATA_BITS};
use crate::coding::polar::Polar;
use crate::coding::psk::{bpsk_soft, demod_or_erase, mod_hard, mod_map, mod_soft};
use crate::coding::xorshift::Xorshift32;
use crate::dsp::buffer::BipBuffer;
use crate::dsp::fft::forward_fft;
use crate::dsp::filter::{BlockDc, Hilbert};
use crate::dsp::phasor::Phasor;
use crate::dsp::theil_sen::TheilSenEstimator;
use crate::message::{format_call, mode_info, unpack_metadata, CALL_LIMIT};
use crate::sync::SchmidlCox;
use crate::visual::{self, VisualBuffers, SPECTRUM_WIDTH};

/// Result of one `process` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// No burst activity in this block.
    Okay,
    /// Preamble failed to decode; pipeline stays idle.
    Fail,
    /// Preamble accepted, burst locked.
    Sync,
    /// Last data symbol accumulated, payload ready for `fetch`.
    Done,
    /// No decoder instance behind the handle.
    Heap,
    /// Preamble decoded but metadata rejected.
    Nope,
}

/// Input channel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Mono,
    Left,
    Right,
    Sum,
    Iq,
}

#[derive(Debug, Snafu)]
pub enum DecoderError {
    /// Sample rate not supported
    #[snafu(display("unsupported sample rate {rate}"))]
    UnsupportedRate { rate: u32 },
}

/// Most recent successfully parsed preamble, for display.
#[derive(Clone, Copy, Debug)]
pub struct CachedMeta {
    pub cfo_hz: f32,
    pub mode: i32,
    pub call: [u8; 9],
}

const SUPPORTED_RATES: [u32; 5] = [8000, 16000, 32000, 44100, 48000];
const CARRIER_COUNT_MAX: usize = 512;
const MOD_BITS_MAX: usize = 3;
const DB_MIN: f32 = -96.0;
const DB_MAX: f32 = 0.0;
const COR_SEQ_POLY: u64 = 0b10001001;
const COR_SEQ_LEN: isize = 127;
const COR_SEQ_OFF: isize = 1 - COR_SEQ_LEN;
const PRE_SEQ_POLY: u64 = 0b100101011;
const PRE_SEQ_LEN: isize = 255;
const PRE_SEQ_OFF: isize = -PRE_SEQ_LEN / 2;

pub struct Decoder {
    rate: u32,
    symbol_len: usize,
    extended_len: usize,

    block_dc: BlockDc,
    hilbert: Hilbert,
    buffer: BipBuffer,
    correlator: SchmidlCox,
    tse: TheilSenEstimator,
    osc: Phasor,
    osd: OrderedStatisticsDecoder,
    genmat: Vec<i8>,
    polar: Polar,

    temp: Vec<Complex32>,
    freq: Vec<Complex32>,
    prev: Vec<Complex32>,
    cons: Vec<Complex32>,
    power: Vec<f32>,
    index: Vec<f32>,
    phase: Vec<f32>,
    code: Vec<f32>,
    soft: [i8; PRE_SEQ_LEN as usize],
    data: BitArr!(for 256, in u8, Msb0),

    prev_peak: i32,
    carrier_count: usize,
    symbol_count: usize,
    symbol_number: usize,
    carrier_offset: isize,
    mod_bits: usize,
    symbol_position: usize,
    cached_mode: u8,
    operation_mode: u8,
    cached_call: u64,
}

fn nrz(bit: bool) -> f32 {
    if bit {
        -1.0
    } else {
        1.0
    }
}

fn decibel(power: f32) -> f32 {
    10.0 * power.log10()
}

impl Decoder {
    pub fn new(rate: u32) -> Result<Self, DecoderError> {
        if !SUPPORTED_RATES.contains(&rate) {
            return Err(DecoderError::UnsupportedRate { rate });
        }
        let symbol_len = (1280 * rate as usize) / 8000;
        let guard_len = symbol_len / 8;
        let extended_len = symbol_len + guard_len;
        let filter_len = (((21 * rate as usize) / 8000) & !3) | 1;
        let buffer_len = 4 * extended_len;
        let search_pos = extended_len;

        let mut block_dc = BlockDc::new();
        block_dc.samples(2 * extended_len);

        let mut osc = Phasor::new();
        osc.omega_hz(-2000.0, rate as f32);

        let correlator = SchmidlCox::new(
            &Self::cor_seq(symbol_len / 2),
            search_pos,
            symbol_len / 2,
            guard_len,
        );

        let bch = Bch::new(&MINIMAL_POLYNOMIALS);

        Ok(Self {
            rate,
            symbol_len,
            extended_len,
            block_dc,
            hilbert: Hilbert::new(filter_len),
            buffer: BipBuffer::new(buffer_len),
            correlator,
            tse: TheilSenEstimator::new(CARRIER_COUNT_MAX),
            osc,
            osd: OrderedStatisticsDecoder::new(),
            genmat: bch.generator_matrix(),
            polar: Polar::new(),
            temp: vec![Complex32::new(0.0, 0.0); extended_len],
            freq: vec![Complex32::new(0.0, 0.0); symbol_len],
            prev: vec![Complex32::new(0.0, 0.0); CARRIER_COUNT_MAX],
            cons: vec![Complex32::new(0.0, 0.0); CARRIER_COUNT_MAX],
            power: vec![0.0; SPECTRUM_WIDTH],
            index: vec![0.0; CARRIER_COUNT_MAX],
            phase: vec![0.0; CARRIER_COUNT_MAX],
            code: vec![0.0; CODE_BITS],
            soft: [0; PRE_SEQ_LEN as usize],
            data: bitarr![u8, Msb0; 0; 256],
            prev_peak: 0,
            carrier_count: 0,
            symbol_count: 0,
            symbol_number: 0,
            carrier_offset: 0,
            mod_bits: 0,
            symbol_position: search_pos + 2 * extended_len,
            cached_mode: 0,
            operation_mode: 0,
            cached_call: 0,
        })
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Metadata of the most recent accepted preamble.
    pub fn cached(&self) -> CachedMeta {
        let mut call = [0u8; 9];
        format_call(&mut call, self.cached_call);
        CachedMeta {
            cfo_hz: self.correlator.cfo_rad * (self.rate as f32 / TAU),
            mode: self.cached_mode as i32,
            call,
        }
    }

    /// Decode the accumulated burst into 43040 payload bits (5380
    /// bytes, LSB-first) and descramble. Valid right after `Done`.
    pub fn fetch(&mut self, payload: &mut [u8]) -> bool {
        if !self.polar.decode(payload, &self.code, self.operation_mode) {
            return false;
        }
        let mut scrambler = Xorshift32::new();
        for byte in payload.iter_mut().take(DATA_BITS / 8) {
            *byte ^= scrambler.next() as u8;
        }
        true
    }

    fn cor_seq(half_len: usize) -> Vec<Complex32> {
        let mut freq = vec![Complex32::new(0.0, 0.0); half_len];
        let mut seq = Mls::new(COR_SEQ_POLY);
        for i in 0..COR_SEQ_LEN {
            let idx = (i + COR_SEQ_OFF / 2 + half_len as isize) as usize % half_len;
            freq[idx] = Complex32::new(nrz(seq.next()), 0.0);
        }
        freq
    }

    fn bin(&self, carrier: isize) -> usize {
        (carrier + self.symbol_len as isize) as usize % self.symbol_len
    }

    fn update_peak_meter(&mut self, pixels: &mut [u32], samples: &[i16], channel: Channel) {
        let mut peak = 0i32;
        match channel {
            Channel::Left | Channel::Right => {
                let skip = (channel == Channel::Right) as usize;
                for s in samples.iter().skip(skip).step_by(2).take(self.extended_len) {
                    peak = peak.max((*s as i32).abs());
                }
            }
            Channel::Sum | Channel::Iq => {
                for s in samples.iter().take(2 * self.extended_len) {
                    peak = peak.max((*s as i32).abs());
                }
            }
            Channel::Mono => {
                for s in samples.iter().take(self.extended_len) {
                    peak = peak.max((*s as i32).abs());
                }
            }
        }
        visual::draw_peak_meter(pixels, peak, &mut self.prev_peak);
    }

    fn next_sample(&mut self, samples: &[i16], channel: Channel, i: usize) -> Complex32 {
        match channel {
            Channel::Mono => self.analytic(samples[i] as f32 / 32768.0),
            Channel::Left => self.analytic(samples[2 * i] as f32 / 32768.0),
            Channel::Right => self.analytic(samples[2 * i + 1] as f32 / 32768.0),
            Channel::Sum => self.analytic(
                (samples[2 * i] as i32 + samples[2 * i + 1] as i32) as f32 / 65536.0,
            ),
            Channel::Iq => {
                Complex32::new(samples[2 * i] as f32, samples[2 * i + 1] as f32) / 32768.0
            }
        }
    }

    fn analytic(&mut self, sample: f32) -> Complex32 {
        self.hilbert.process(self.block_dc.process(sample))
    }

    fn preamble(&mut self) -> Status {
        let win = self.buffer.window();
        let mut nco = Phasor::new();
        nco.omega(-self.correlator.cfo_rad);
        let base = self.correlator.symbol_pos + self.extended_len;
        for i in 0..self.symbol_len {
            self.temp[i] = win[base + i] * nco.get();
        }
        forward_fft(&mut self.freq, &self.temp[..self.symbol_len]);

        let mut seq = Mls::new(PRE_SEQ_POLY);
        for i in 0..PRE_SEQ_LEN {
            let idx = self.bin(i + PRE_SEQ_OFF);
            self.freq[idx] *= nrz(seq.next());
        }
        for i in 0..PRE_SEQ_LEN {
            let curr = self.freq[self.bin(i + PRE_SEQ_OFF)];
            let prev = self.freq[self.bin(i - 1 + PRE_SEQ_OFF)];
            self.soft[i as usize] = bpsk_soft(demod_or_erase(curr, prev), 32.0);
        }
        if !self
            .osd
            .process(&mut self.data[..PRE_SEQ_LEN as usize], &self.soft, &self.genmat)
        {
            debug!("preamble: ordered statistics decoding failed");
            return Status::Fail;
        }
        let mut md: u64 = 0;
        for i in 0..55 {
            md |= (self.data[i] as u64) << i;
        }
        let mut cs: u16 = 0;
        for i in 0..16 {
            cs |= (self.data[i + 55] as u16) << i;
        }
        if metadata_checksum(md) != cs {
            debug!("preamble: metadata checksum mismatch");
            return Status::Fail;
        }
        let (mode, call) = unpack_metadata(md);
        self.cached_mode = mode;
        self.cached_call = call;
        if !(6..=13).contains(&mode) {
            debug!(mode, "preamble: operation mode out of range");
            return Status::Nope;
        }
        if call == 0 || call >= CALL_LIMIT {
            debug!(call, "preamble: call sign out of range");
            self.cached_call = 0;
            return Status::Nope;
        }
        self.operation_mode = mode;
        debug!(mode, call, "preamble accepted");
        Status::Okay
    }

    fn prepare(&mut self) {
        let info = mode_info(self.operation_mode).expect("mode validated by preamble");
        self.carrier_count = info.carrier_count;
        self.symbol_count = info.symbol_count;
        self.mod_bits = info.mod_bits;
        self.carrier_offset = -(info.carrier_count as isize) / 2;
        self.symbol_number = 0;
    }

    /// Take the residual phase slope (fractional timing error) out of
    /// the equalized carriers.
    fn compensate(&mut self) {
        let mut count = 0;
        for i in 0..self.carrier_count {
            let con = self.cons[i];
            if con.re != 0.0 && con.im != 0.0 {
                let mut tmp = [0.0f32; MOD_BITS_MAX];
                mod_hard(&mut tmp, con, self.mod_bits);
                self.index[count] = (i as isize + self.carrier_offset) as f32;
                self.phase[count] = (con * mod_map(&tmp, self.mod_bits).conj()).arg();
                count += 1;
            }
        }
        self.tse.compute(&self.index[..count], &self.phase[..count]);
        for i in 0..self.carrier_count {
            let x = (i as isize + self.carrier_offset) as f32;
            self.cons[i] *= Complex32::from_polar(1.0, -self.tse.eval(x));
        }
    }

    /// Noise-driven soft bit scale: 1 / sigma^2 of the residual error.
    fn precision(&self) -> f32 {
        let mut signal = 0.0;
        let mut noise = 0.0;
        for i in 0..self.carrier_count {
            let mut tmp = [0.0f32; MOD_BITS_MAX];
            mod_hard(&mut tmp, self.cons[i], self.mod_bits);
            let hard = mod_map(&tmp, self.mod_bits);
            let error = self.cons[i] - hard;
            signal += hard.norm_sqr();
            noise += error.norm_sqr();
        }
        let sigma_sqr = noise / (2.0 * signal);
        1.0 / sigma_sqr
    }

    fn demap(&mut self) {
        let prec = self.precision();
        for i in 0..self.carrier_count {
            let base = self.mod_bits * (self.symbol_number * self.carrier_count + i);
            mod_soft(
                &mut self.code[base..base + self.mod_bits],
                self.cons[i],
                prec,
                self.mod_bits,
            );
        }
    }

    /// Feed one block of audio. Consumes `extended_len` mono samples
    /// or `2 * extended_len` interleaved values for the other
    /// channels.
    pub fn process(
        &mut self,
        view: &mut VisualBuffers,
        audio: &[i16],
        channel: Channel,
    ) -> Status {
        self.update_peak_meter(&mut view.peak_meter, audio, channel);
        let mut status = Status::Okay;
        for i in 0..self.extended_len {
            let sample = self.next_sample(audio, channel, i);
            self.buffer.put(sample);
            if self.correlator.put(self.buffer.window()) {
                status = self.preamble();
                if status == Status::Okay {
                    self.osc.omega(-self.correlator.cfo_rad);
                    self.symbol_position = self.correlator.symbol_pos + self.extended_len + i;
                    self.prepare();
                    status = Status::Sync;
                    debug!(
                        mode = self.operation_mode,
                        position = self.symbol_position,
                        cfo = self.correlator.cfo_rad,
                        "burst locked"
                    );
                }
            }
        }

        {
            let win = self.buffer.window();
            for k in 0..self.extended_len {
                self.temp[k] = win[self.symbol_position + k] * self.osc.get();
            }
        }
        forward_fft(&mut self.freq, &self.temp[..self.symbol_len]);
        for i in 0..SPECTRUM_WIDTH {
            let c = self.freq[self.bin(i as isize - SPECTRUM_WIDTH as isize / 2)];
            let db = decibel((c / self.symbol_len as f32).norm_sqr());
            self.power[i] = ((db - DB_MIN) / (DB_MAX - DB_MIN)).clamp(0.0, 1.0);
        }
        visual::draw_spectrum(&mut view.spectrum, &self.power);
        visual::draw_spectrogram(&mut view.spectrogram, &self.power);

        if status != Status::Sync && self.symbol_number < self.symbol_count {
            for i in 0..self.carrier_count {
                let curr = self.freq[self.bin(i as isize + self.carrier_offset)];
                self.cons[i] = demod_or_erase(curr, self.prev[i]);
            }
            self.compensate();
            self.demap();
            visual::draw_constellation(&mut view.constellation, &self.cons[..self.carrier_count]);
            self.symbol_number += 1;
            if self.symbol_number == self.symbol_count {
                status = Status::Done;
                debug!(mode = self.operation_mode, "burst complete");
            }
        } else {
            visual::draw_oscilloscope(&mut view.constellation, &self.temp);
        }
        if self.symbol_number < self.symbol_count {
            for i in 0..self.carrier_count {
                self.prev[i] = self.freq[self.bin(i as isize + self.carrier_offset)];
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unsupported_rate() {
        assert!(matches!(
            Decoder::new(11025),
            Err(DecoderError::UnsupportedRate { rate: 11025 })
        ));
    }

    #[test]
    fn test_geometry_is_integral_for_all_rates() {
        for &rate in &SUPPORTED_RATES {
            let d = Decoder::new(rate).unwrap();
            assert_eq!(d.symbol_len, 1280 * rate as usize / 8000);
            assert_eq!(d.symbol_len % 8, 0, "guard must divide evenly");
            assert_eq!(d.extended_len, d.symbol_len + d.symbol_len / 8);
            assert_eq!(1280 * rate as usize % 8000, 0, "symbol length integral");
        }
    }

    #[test]
    fn test_silence_reports_okay() {
        let mut d = Decoder::new(8000).unwrap();
        let mut view = VisualBuffers::new();
        let audio = vec![0i16; d.extended_len];
        for _ in 0..4 {
            assert_eq!(d.process(&mut view, &audio, Channel::Mono), Status::Okay);
        }
    }

    #[test]
    fn test_cached_defaults() {
        let d = Decoder::new(8000).unwrap();
        let meta = d.cached();
        assert_eq!(meta.mode, 0);
        assert_eq!(&meta.call, b"         ");
    }
}
