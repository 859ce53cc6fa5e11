use log::debug;

use crate::error::BenchError;
use crate::modules::*;
use crate::simulator::{Synchronous, Trace};

/// Waveform samples kept by a traced bench
pub const TRACE_SAMPLES: usize = 4096;

#[derive(Copy, Clone, Debug, Default)]
pub struct BenchInputs {
    pub start: bool,
    pub rst: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Reading {
    pub channel: Channel,
    pub value: u16,
    /// Ticks from the start tick until the validity pulse
    pub latency: u64,
}

/// Controller wired to the ADC model, with the bus observed from the outside.
pub struct Testbench {
    controller: SpiController,
    adc: AdcModel,
    channel: Channel,
    max_ticks: u64,
    trace: Option<Trace>,
    cs_n: EdgeDetector,
    sclk: EdgeDetector,
    tick: u64,
    valid_pulses: u64,
    sclk_rises: Vec<u64>,
    mosi_samples: Vec<bool>,
}

impl Testbench {
    pub fn new(response: Response, max_ticks: u64) -> Self {
        Testbench {
            controller: SpiController::new(),
            adc: AdcModel::new(response),
            channel: Channel::default(),
            max_ticks,
            trace: None,
            cs_n: EdgeDetector::new(true),
            sclk: EdgeDetector::new(false),
            tick: 0,
            valid_pulses: 0,
            sclk_rises: Vec::new(),
            mosi_samples: Vec::new(),
        }
    }

    pub fn with_trace(mut self) -> Self {
        self.trace = Some(Trace::with_limit(TRACE_SAMPLES));
        self
    }

    pub fn controller(&self) -> &SpiController {
        &self.controller
    }

    pub fn adc(&self) -> &AdcModel {
        &self.adc
    }

    pub fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    /// Ticks elapsed since the bench was created
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    pub fn valid_pulses(&self) -> u64 {
        self.valid_pulses
    }

    /// Ticks at which the bus clock line went high in the latest transaction
    pub fn sclk_rises(&self) -> &[u64] {
        &self.sclk_rises
    }

    /// MOSI level at each bus clock rising edge of the latest transaction
    pub fn mosi_samples(&self) -> &[bool] {
        &self.mosi_samples
    }

    pub fn set_channel(&mut self, channel: Channel) {
        self.channel = channel;
    }

    pub fn reset(&mut self) {
        self.step(BenchInputs { start: false, rst: true });
    }

    /// Runs until the controller is back in Idle
    pub fn wait_idle(&mut self) -> Result<u64, BenchError> {
        self.wait("idle", |tb| tb.controller.state() == State::Idle)
    }

    /// Runs until the validity pulse
    pub fn wait_valid(&mut self) -> Result<u64, BenchError> {
        self.wait("valid", |tb| tb.controller.outputs().valid)
    }

    /// Performs one complete conversion on `channel`
    pub fn read(&mut self, channel: Channel) -> Result<Reading, BenchError> {
        self.wait_idle()?;
        self.set_channel(channel);

        let begin = self.tick;
        self.step(BenchInputs { start: true, rst: false });

        self.wait_valid()?;

        let reading = Reading {
            channel,
            value: self.controller.outputs().result,
            latency: self.tick - begin,
        };

        debug!("read {}: 0x{:03x} after {} ticks", channel, reading.value, reading.latency);

        Ok(reading)
    }

    fn wait(&mut self, what: &'static str, done: impl Fn(&Testbench) -> bool) -> Result<u64, BenchError> {
        let begin = self.tick;

        while !done(self) {
            if self.tick - begin >= self.max_ticks {
                return Err(BenchError::Timeout { what, ticks: self.max_ticks });
            }

            self.step(BenchInputs::default());
        }

        Ok(self.tick - begin)
    }

    fn observe(&mut self) {
        let o = self.controller.outputs();

        if o.valid {
            self.valid_pulses += 1;
        }

        if self.cs_n.update(o.cs_n) == Some(Edge::Falling) {
            self.sclk_rises.clear();
            self.mosi_samples.clear();
        }

        if self.sclk.update(o.sclk) == Some(Edge::Rising) {
            self.sclk_rises.push(self.tick);
            self.mosi_samples.push(o.mosi);
        }

        if let Some(trace) = &mut self.trace {
            trace.snapshot(&[
                ("cs_n", o.cs_n),
                ("sclk", o.sclk),
                ("mosi", o.mosi),
                ("miso", self.adc.miso()),
                ("valid", o.valid),
            ]);
        }
    }
}

impl Synchronous for Testbench {
    type I = BenchInputs;
    type O = ControllerOutputs;

    fn step(&mut self, inp: BenchInputs) {
        let miso = self.adc.miso();

        self.controller.step(ControllerInputs {
            rst: inp.rst,
            start: inp.start,
            channel: self.channel,
            miso,
        });

        self.adc.step(self.controller.outputs());

        self.tick += 1;
        self.observe();
    }

    fn outputs(&self) -> ControllerOutputs {
        self.controller.outputs()
    }
}
