use log::debug;
use serde::{Deserialize, Serialize};

use super::*;
use crate::simulator::Synchronous;

/// What the model shifts out while selected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    /// Fixed 16-bit frame, MSB first, regardless of the request
    Pattern(u16),
    /// Per-channel 10-bit conversion values, sent once the request has been decoded
    Channels([u16; 8]),
}

impl Response {
    /// The value a controller keeping the last ten sampled bits reads back
    pub fn expected(&self, channel: Channel) -> u16 {
        match self {
            Response::Pattern(frame) => frame & RESULT_MASK,
            Response::Channels(values) => values[channel.index() as usize] & RESULT_MASK,
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        // 1101 0101 0101 0000
        Response::Pattern(0xd550)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub single_ended: bool,
    pub channel: Channel,
}

/// Bits after the start bit: single-ended flag and D2..D0
const REQUEST_BITS: u8 = 4;

#[derive(Clone, Debug, Default)]
struct RequestDecoder {
    started: bool,
    bits: u8,
    shift: u8,
}

impl RequestDecoder {
    /// Feeds one sampled MOSI bit, returns the request once complete
    fn push(&mut self, mosi: bool) -> Option<Request> {
        if !self.started {
            // leading zeros are ignored until the start bit
            self.started = mosi;
            return None;
        }

        if self.bits == REQUEST_BITS {
            return None;
        }

        self.shift = (self.shift << 1) | mosi as u8;
        self.bits += 1;

        (self.bits == REQUEST_BITS).then(|| Request {
            single_ended: self.shift & 0b1000 != 0,
            channel: Channel::from_bits(self.shift),
        })
    }
}

/// Behavioral stand-in for an 8-channel, 10-bit SPI ADC.
///
/// Drives MISO on bus clock falling edges and samples MOSI on rising edges, so its output is
/// stable while the clock is low.
#[derive(Clone, Debug)]
pub struct AdcModel {
    response: Response,
    cs_n: EdgeDetector,
    sclk: EdgeDetector,
    out: u16,
    decoder: RequestDecoder,
    request: Option<Request>,
    history: Vec<Request>,
}

impl AdcModel {
    pub fn new(response: Response) -> Self {
        AdcModel {
            response,
            cs_n: EdgeDetector::new(true),
            sclk: EdgeDetector::new(false),
            out: 0,
            decoder: RequestDecoder::default(),
            request: None,
            history: Vec::new(),
        }
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn miso(&self) -> bool {
        !self.cs_n.level() && self.out & 0x8000 != 0
    }

    /// Request decoded in the current transaction
    pub fn request(&self) -> Option<Request> {
        self.request
    }

    /// Requests of all completed transactions, oldest first
    pub fn history(&self) -> &[Request] {
        &self.history
    }

    fn select(&mut self) {
        self.decoder = RequestDecoder::default();
        self.request = None;
        self.out = match self.response {
            Response::Pattern(frame) => frame,
            Response::Channels(_) => 0,
        };
    }

    fn deselect(&mut self) {
        if let Some(req) = self.request.take() {
            self.history.push(req);
        }

        self.out = 0;
    }

    fn sample(&mut self, mosi: bool) {
        let Some(req) = self.decoder.push(mosi) else {
            return;
        };

        debug!("adc request: {} single_ended={}", req.channel, req.single_ended);

        if let Response::Channels(values) = &self.response {
            // null bit after the next falling edge, then B9..B0
            self.out = (values[req.channel.index() as usize] & RESULT_MASK) << 4;
        }

        self.request = Some(req);
    }
}

impl Synchronous for AdcModel {
    type I = ControllerOutputs;
    type O = bool;

    fn step(&mut self, bus: ControllerOutputs) {
        match self.cs_n.update(bus.cs_n) {
            Some(Edge::Falling) => self.select(),
            Some(Edge::Rising) => self.deselect(),
            None => {},
        }

        let edge = self.sclk.update(bus.sclk);

        if bus.cs_n {
            return;
        }

        match edge {
            Some(Edge::Rising) => self.sample(bus.mosi),
            Some(Edge::Falling) => self.out <<= 1,
            None => {},
        }
    }

    fn outputs(&self) -> bool {
        self.miso()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bus(cs_n: bool, sclk: bool, mosi: bool) -> ControllerOutputs {
        ControllerOutputs {
            mosi,
            sclk,
            cs_n,
            result: 0,
            valid: false,
        }
    }

    /// Clocks `mosi` bits in, returning MISO as seen at each rising edge
    fn transfer(adc: &mut AdcModel, mosi: &[bool]) -> Vec<bool> {
        let mut miso = Vec::new();

        adc.step(bus(false, false, false));

        for &m in mosi {
            adc.step(bus(false, false, m));
            miso.push(adc.miso());
            adc.step(bus(false, true, m));
            adc.step(bus(false, false, false));
        }

        adc.step(bus(true, false, false));

        miso
    }

    fn bits(word: u32, n: usize) -> Vec<bool> {
        (0..n).rev().map(|b| word & (1 << b) != 0).collect()
    }

    #[test]
    fn test_pattern_shifted_msb_first() {
        let mut adc = AdcModel::new(Response::Pattern(0xd550));

        let miso = transfer(&mut adc, &bits(0b11_010_00000000000, 16));

        assert_eq!(miso, bits(0xd550, 16));
    }

    #[test]
    fn test_request_decoded_after_leading_zeros() {
        let mut adc = AdcModel::new(Response::default());

        transfer(&mut adc, &bits(0b0001_0110, 8));
        transfer(&mut adc, &bits(0b1_1111, 8));

        assert_eq!(adc.history(), &[
            Request { single_ended: false, channel: Channel::from_bits(6) },
            Request { single_ended: true, channel: Channel::from_bits(7) },
        ]);
        assert_eq!(adc.request(), None);
    }

    #[test]
    fn test_channel_value_follows_request() {
        let values = [0x000, 0x3ff, 0x155, 0x2aa, 0x001, 0x200, 0x123, 0x321];
        let mut adc = AdcModel::new(Response::Channels(values));

        for ch in Channel::all() {
            let mut mosi = bits(0b11_000 | ch.index() as u32, 5);
            mosi.extend([false; 11]);

            let miso = transfer(&mut adc, &mosi);

            assert_eq!(&miso[6..], bits(values[ch.index() as usize] as u32, 10).as_slice(), "{}", ch);
        }

        assert_eq!(adc.history().len(), 8);
    }

    #[test]
    fn test_miso_low_when_deselected() {
        let mut adc = AdcModel::new(Response::Pattern(0xffff));

        adc.step(bus(true, false, false));
        assert!(!adc.miso());

        adc.step(bus(false, false, false));
        assert!(adc.miso());

        adc.step(bus(true, false, false));
        assert!(!adc.miso());
    }

    #[test]
    fn test_expected_value() {
        assert_eq!(Response::default().expected(Channel::from_bits(4)), 0b01_0101_0000);
        assert_eq!(Response::Channels([0xffff; 8]).expected(Channel::from_bits(0)), 0x3ff);
    }
}
