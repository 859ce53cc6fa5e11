use std::fmt;

use log::{info, warn};
use rayon::prelude::*;

use super::testbench::{BenchInputs, Testbench};
use crate::config::BenchConfig;
use crate::error::BenchError;
use crate::modules::*;
use crate::simulator::Synchronous;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// One conversion, checked for value, latency and a single validity pulse
    Single(Channel),
    /// MOSI at each bus clock rising edge matches the request frame
    BitOrder(Channel),
    /// Two conversions separated by the minimum cooldown gap
    BackToBack(Channel, Channel),
    /// Start pulses during cooldown must not arm a transaction
    StartDuringCooldown(Channel),
    /// Synchronous reset while the controller is in the given phase
    ResetDuring(State),
}

#[derive(Clone, Debug)]
pub struct Outcome {
    pub name: String,
    pub mismatches: Vec<String>,
    /// Bus waveform of a failed scenario, when tracing is enabled
    pub waveform: Option<String>,
}

impl Outcome {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
}

impl Report {
    /// Total mismatches across all scenarios
    pub fn failures(&self) -> usize {
        self.outcomes.iter().map(|o| o.mismatches.len()).sum()
    }

    pub fn passed(&self) -> bool {
        self.failures() == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for o in &self.outcomes {
            writeln!(f, "{} {}", if o.passed() { "PASS" } else { "FAIL" }, o.name)?;

            for m in &o.mismatches {
                writeln!(f, "     {}", m)?;
            }

            if let Some(w) = &o.waveform {
                write!(f, "{}", w)?;
            }
        }

        write!(f, "{} scenarios, {} mismatches", self.outcomes.len(), self.failures())
    }
}

struct Checker {
    mismatches: Vec<String>,
}

impl Checker {
    fn eq<T: PartialEq + fmt::Debug>(&mut self, what: &str, got: T, expected: T) {
        if got != expected {
            self.mismatches.push(format!("{}: got {:?}, expected {:?}", what, got, expected));
        }
    }

    fn check(&mut self, what: &str, ok: bool) {
        if !ok {
            self.mismatches.push(what.to_owned());
        }
    }
}

fn request_frame(channel: Channel) -> Vec<bool> {
    let word = command_word(channel);

    (0..SCLK_RISES).map(|i| word & (0x8000 >> i) != 0).collect()
}

fn idle_outputs() -> ControllerOutputs {
    ControllerOutputs {
        mosi: false,
        sclk: false,
        cs_n: true,
        result: 0,
        valid: false,
    }
}

impl Scenario {
    pub fn name(&self) -> String {
        match self {
            Scenario::Single(ch) => format!("single read {}", ch),
            Scenario::BitOrder(ch) => format!("request bit order {}", ch),
            Scenario::BackToBack(a, b) => format!("back-to-back {} {}", a, b),
            Scenario::StartDuringCooldown(ch) => format!("start during cooldown {}", ch),
            Scenario::ResetDuring(state) => format!("reset during {:?}", state),
        }
    }

    pub fn run(&self, config: &BenchConfig) -> Outcome {
        let mut c = Checker { mismatches: Vec::new() };

        let mut tb = Testbench::new(config.response.clone(), config.max_ticks);
        if config.trace {
            tb = tb.with_trace();
        }

        if let Err(e) = self.check(config, &mut tb, &mut c) {
            c.mismatches.push(e.to_string());
        }

        let waveform = if c.mismatches.is_empty() {
            None
        } else {
            tb.trace().map(|t| t.render())
        };

        Outcome {
            name: self.name(),
            mismatches: c.mismatches,
            waveform,
        }
    }

    fn check(&self, config: &BenchConfig, tb: &mut Testbench, c: &mut Checker) -> Result<(), BenchError> {
        let response = &config.response;

        match *self {
            Scenario::Single(ch) => {
                let r = tb.read(ch)?;

                c.eq("result", r.value, response.expected(ch));
                c.eq("latency", r.latency, RESULT_LATENCY);
                c.eq("valid pulses", tb.valid_pulses(), 1);
                c.eq("cs_n after finish", tb.outputs().cs_n, true);

                let rises = tb.sclk_rises().to_vec();
                c.eq("sclk rising edges", rises.len(), SCLK_RISES as usize);
                c.check(
                    "sclk period differs from divider period",
                    rises.windows(2).all(|w| w[1] - w[0] == DIVIDER_PERIOD as u64));

                let idle = tb.wait_idle()?;
                c.eq("cooldown", idle, TRANSACTION_TICKS - RESULT_LATENCY);
                c.eq("sclk rising edges after cooldown", tb.sclk_rises().len(), rises.len());
                c.eq("request", tb.adc().history().last().copied(), Some(Request { single_ended: true, channel: ch }));
            },
            Scenario::BitOrder(ch) => {
                tb.read(ch)?;

                c.eq("mosi at sclk rising edges", tb.mosi_samples().to_vec(), request_frame(ch));
            },
            Scenario::BackToBack(a, b) => {
                let first = tb.read(a)?;
                let start = tb.ticks() - first.latency;

                // hold start until it is accepted
                tb.set_channel(b);
                tb.step_until(BenchInputs { start: true, rst: false }, config.max_ticks as usize, |o| !o.cs_n)
                    .ok_or(BenchError::Timeout { what: "second start", ticks: config.max_ticks })?;
                let second_start = tb.ticks() - 1;

                c.eq("start spacing", second_start - start, TRANSACTION_TICKS);

                tb.wait_valid()?;

                c.eq("first result", first.value, response.expected(a));
                c.eq("second result", tb.outputs().result, response.expected(b));
                c.eq("valid pulses", tb.valid_pulses(), 2);
            },
            Scenario::StartDuringCooldown(ch) => {
                tb.read(ch)?;

                let mut ticks = 0;
                while tb.controller().state() != State::Idle {
                    let start = tb.controller().state() == State::Done;
                    tb.step(BenchInputs { start, rst: false });
                    ticks += 1;

                    if !matches!(tb.controller().state(), State::Done | State::Idle) {
                        c.check("start during cooldown armed a transaction", false);
                        break;
                    }
                }

                c.eq("ticks to idle", ticks, TRANSACTION_TICKS - RESULT_LATENCY);

                tb.step_by(BenchInputs::default(), TRANSACTION_TICKS as usize);

                c.eq("state", tb.controller().state(), State::Idle);
                c.eq("valid pulses", tb.valid_pulses(), 1);
                c.eq("requests", tb.adc().history().len(), 1);
            },
            Scenario::ResetDuring(phase) => {
                let ch = config.channels.first().copied().unwrap_or_default();
                tb.set_channel(ch);
                tb.step(BenchInputs { start: true, rst: false });

                let mut ticks = 0;
                while tb.controller().state() != phase {
                    if ticks >= config.max_ticks {
                        return Err(BenchError::Timeout { what: "phase", ticks });
                    }

                    tb.step(BenchInputs::default());
                    ticks += 1;
                }

                let pulses = tb.valid_pulses();
                tb.reset();

                c.eq("state after reset", tb.controller().state(), State::Idle);
                c.eq("outputs after reset", tb.outputs(), idle_outputs());

                let r = tb.read(ch)?;
                c.eq("result after recovery", r.value, response.expected(ch));
                c.eq("valid pulses", tb.valid_pulses(), pulses + 1);
            },
        }

        Ok(())
    }
}

/// Every scenario for the configured channels
pub fn suite(config: &BenchConfig) -> Vec<Scenario> {
    let mut scenarios = Vec::new();

    for &ch in &config.channels {
        scenarios.push(Scenario::Single(ch));
        scenarios.push(Scenario::BitOrder(ch));
    }

    for pair in config.channels.windows(2) {
        scenarios.push(Scenario::BackToBack(pair[0], pair[1]));
    }

    if let [ch] = config.channels[..] {
        scenarios.push(Scenario::BackToBack(ch, ch));
    }

    if let Some(&ch) = config.channels.first() {
        scenarios.push(Scenario::StartDuringCooldown(ch));
    }

    for phase in [State::SendCommand, State::ReceiveData, State::Finish, State::Done] {
        scenarios.push(Scenario::ResetDuring(phase));
    }

    scenarios
}

pub fn run_suite(config: &BenchConfig) -> Report {
    let scenarios = suite(config);

    info!("running {} scenarios", scenarios.len());

    let outcomes: Vec<Outcome> = scenarios
        .par_iter()
        .map(|s| s.run(config))
        .collect();

    for o in outcomes.iter().filter(|o| !o.passed()) {
        warn!("{}: {} mismatches", o.name, o.mismatches.len());
    }

    let report = Report { outcomes };
    info!("{} mismatches", report.failures());
    report
}
