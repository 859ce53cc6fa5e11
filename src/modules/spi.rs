use log::{debug, trace};

use super::*;
use crate::simulator::Synchronous;

/// Bus clock cycles spent clocking out the request
pub const COMMAND_CYCLES: u8 = 6;

/// Bus clock cycles spent sampling the result
pub const RESULT_CYCLES: u8 = 10;

/// Rising edges visible on the bus clock line per transaction
pub const SCLK_RISES: u8 = COMMAND_CYCLES + RESULT_CYCLES - 1;

/// Ticks from the start tick until the validity pulse is visible
pub const RESULT_LATENCY: u64 =
    1 + (COMMAND_CYCLES + RESULT_CYCLES - 1) as u64 * DIVIDER_PERIOD as u64 + RISE_AT as u64 + 1;

/// Minimum spacing between two accepted start ticks
pub const TRANSACTION_TICKS: u64 = RESULT_LATENCY + 1 + COOLDOWN_TICKS as u64;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    #[default]
    Idle,
    SendCommand,
    ReceiveData,
    Finish,
    Done,
}

impl State {
    /// Bus clock running
    pub fn is_active(self) -> bool {
        matches!(self, State::SendCommand | State::ReceiveData)
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ControllerInputs {
    pub rst: bool,
    pub start: bool,
    pub channel: Channel,
    pub miso: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ControllerOutputs {
    pub mosi: bool,
    pub sclk: bool,
    /// Bus-select, active low
    pub cs_n: bool,
    pub result: u16,
    /// High for exactly one tick when `result` has just been latched
    pub valid: bool,
}

/// SPI mode 0 master that requests one conversion per start pulse.
///
/// Each transaction clocks out a 6-cycle request frame and samples 10 result bits, then holds
/// bus-select high for the cooldown period before accepting the next start.
#[derive(Clone, Debug)]
pub struct SpiController {
    state: State,
    channel: Channel,
    clock: ClockDivider,
    command: CommandRegister,
    shift_in: ResultRegister,
    bit: u8,
    cooldown: Cooldown,
    mosi: bool,
    cs_n: bool,
    result: u16,
    valid: bool,
}

impl Default for SpiController {
    fn default() -> Self {
        SpiController::new()
    }
}

impl SpiController {
    pub fn new() -> Self {
        SpiController {
            state: State::Idle,
            channel: Channel::default(),
            clock: ClockDivider::new(),
            command: CommandRegister::default(),
            shift_in: ResultRegister::default(),
            bit: 0,
            cooldown: Cooldown::default(),
            mosi: false,
            cs_n: true,
            result: 0,
            valid: false,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Channel captured when the current transaction was armed
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Bus clock cycles completed in the current phase
    pub fn bit_count(&self) -> u8 {
        self.bit
    }

    pub fn divider_count(&self) -> u8 {
        self.clock.count()
    }

    pub fn cooldown_count(&self) -> u8 {
        self.cooldown.count()
    }

    fn arm(&mut self, channel: Channel) {
        self.channel = channel;
        self.command = CommandRegister::load(channel);
        self.shift_in.clear();
        self.clock.clear();
        self.bit = 0;
        self.cs_n = false;
        // MSB is on the line before the first rising edge
        self.mosi = self.command.shift_out();
    }

    /// Runs on the last rising-due pulse. The bus clock line stays low as bus-select is
    /// released, so the line shows one rising edge fewer than the samples taken.
    fn finish(&mut self) {
        self.clock.clear();
        self.bit = 0;
        self.mosi = false;
        self.cs_n = true;
        self.result = self.shift_in.value();
        self.valid = true;
        self.cooldown.restart();
    }
}

impl Synchronous for SpiController {
    type I = ControllerInputs;
    type O = ControllerOutputs;

    fn step(&mut self, inp: ControllerInputs) {
        if inp.rst {
            if self.state != State::Idle {
                debug!("reset in {:?}, {} transaction aborted", self.state, self.channel);
            }

            *self = SpiController::new();
            return;
        }

        self.valid = false;

        let next = match self.state {
            State::Idle => {
                if inp.start {
                    self.arm(inp.channel);
                    State::SendCommand
                } else {
                    State::Idle
                }
            },
            State::SendCommand => {
                let edges = self.clock.advance();

                if edges.fall {
                    self.mosi = self.command.shift_out();
                }

                if edges.rise && self.bit == COMMAND_CYCLES - 1 {
                    self.bit = 0;
                    State::ReceiveData
                } else {
                    if edges.rise {
                        self.bit += 1;
                    }
                    State::SendCommand
                }
            },
            State::ReceiveData => {
                let edges = self.clock.advance();

                if edges.fall {
                    self.mosi = false;
                }

                if edges.rise {
                    self.shift_in.shift_in(inp.miso);
                }

                if edges.rise && self.bit == RESULT_CYCLES - 1 {
                    self.finish();
                    State::Finish
                } else {
                    if edges.rise {
                        self.bit += 1;
                    }
                    State::ReceiveData
                }
            },
            State::Finish => State::Done,
            State::Done => {
                if self.cooldown.tick() {
                    self.cooldown.restart();
                    State::Idle
                } else {
                    State::Done
                }
            },
        };

        if next != self.state {
            trace!("{:?} -> {:?}", self.state, next);
        }

        self.state = next;
    }

    fn outputs(&self) -> ControllerOutputs {
        ControllerOutputs {
            mosi: self.mosi,
            sclk: self.clock.sclk(),
            cs_n: self.cs_n,
            result: self.result,
            valid: self.valid,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn inputs(start: bool, channel: u8, miso: bool) -> ControllerInputs {
        ControllerInputs {
            rst: false,
            start,
            channel: Channel::from_bits(channel),
            miso,
        }
    }

    /// Runs one transaction with `miso` presenting `frame` MSB first, one bit per bus clock
    /// falling edge. Returns the ticks at which the validity pulse was seen.
    fn run_frame(spi: &mut SpiController, channel: u8, frame: u16) -> Vec<u64> {
        let mut valid_at = Vec::new();
        let mut out = frame;
        let mut prev_sclk = false;

        spi.step(inputs(true, channel, false));

        for tick in 2..=TRANSACTION_TICKS {
            spi.step(inputs(false, channel, out & 0x8000 != 0));

            let o = spi.outputs();
            if prev_sclk && !o.sclk {
                out <<= 1;
            }
            prev_sclk = o.sclk;

            if o.valid {
                valid_at.push(tick);
            }
        }

        valid_at
    }

    #[test]
    fn test_idle_outputs() {
        let mut spi = SpiController::new();

        spi.step_by(inputs(false, 0, true), 100);

        assert_eq!(spi.state(), State::Idle);
        assert_eq!(spi.outputs(), ControllerOutputs {
            mosi: false,
            sclk: false,
            cs_n: true,
            result: 0,
            valid: false,
        });
    }

    #[test]
    fn test_start_arms_transaction() {
        let mut spi = SpiController::new();

        spi.step(inputs(true, 6, false));

        assert_eq!(spi.state(), State::SendCommand);
        assert!(spi.state().is_active());
        assert_eq!(spi.channel().index(), 6);
        assert!(!spi.outputs().cs_n);
        assert!(!spi.outputs().sclk);
        assert!(spi.outputs().mosi);
        assert_eq!(spi.divider_count(), 0);
    }

    #[test]
    fn test_channel_sampled_at_arming() {
        let mut spi = SpiController::new();

        spi.step(inputs(true, 2, false));
        spi.step_by(inputs(false, 7, false), 50);

        assert_eq!(spi.channel().index(), 2);
    }

    #[test]
    fn test_phase_timing() {
        let mut spi = SpiController::new();

        spi.step(inputs(true, 0, false));

        let mut ticks = 1u64;
        let mut changes = Vec::new();
        let mut state = spi.state();

        while changes.len() < 4 {
            spi.step(inputs(false, 0, false));
            ticks += 1;

            if spi.state() != state {
                state = spi.state();
                changes.push((state, ticks));
            }
        }

        let receive_at = 1 + (COMMAND_CYCLES as u64 - 1) * DIVIDER_PERIOD as u64 + RISE_AT as u64 + 1;

        assert_eq!(changes, vec![
            (State::ReceiveData, receive_at),
            (State::Finish, RESULT_LATENCY),
            (State::Done, RESULT_LATENCY + 1),
            (State::Idle, TRANSACTION_TICKS),
        ]);
    }

    #[test]
    fn test_result_and_single_valid_pulse() {
        let mut spi = SpiController::new();

        let valid_at = run_frame(&mut spi, 3, 0xd550);

        assert_eq!(valid_at, vec![RESULT_LATENCY]);
        assert_eq!(spi.outputs().result, 0b01_0101_0000);
        assert_eq!(spi.state(), State::Idle);
    }

    #[test]
    fn test_result_held_until_next_finish() {
        let mut spi = SpiController::new();

        run_frame(&mut spi, 0, 0x03ff);
        assert_eq!(spi.outputs().result, 0x3ff);

        spi.step(inputs(true, 0, true));
        spi.step_by(inputs(false, 0, false), (RESULT_LATENCY - 2) as usize);
        assert_eq!(spi.state(), State::ReceiveData);
        assert_eq!(spi.outputs().result, 0x3ff);

        spi.step(inputs(false, 0, false));
        assert!(spi.outputs().valid);
        assert_eq!(spi.outputs().result, 0);
    }

    #[test]
    fn test_command_bits_on_mosi() {
        let mut spi = SpiController::new();
        let mut sampled = Vec::new();
        let mut prev_sclk = false;

        spi.step(inputs(true, 0b101, false));

        for _ in 1..RESULT_LATENCY {
            spi.step(inputs(false, 0b101, false));

            let o = spi.outputs();
            if !prev_sclk && o.sclk {
                sampled.push(o.mosi);
            }
            prev_sclk = o.sclk;
        }

        assert_eq!(sampled.len(), SCLK_RISES as usize);
        assert_eq!(&sampled[..6], &[true, true, true, false, true, false]);
        assert!(sampled[6..].iter().all(|b| !b));
    }

    #[test]
    fn test_sclk_period() {
        let mut spi = SpiController::new();
        let mut rising = Vec::new();
        let mut prev_sclk = false;

        spi.step(inputs(true, 0, false));

        for tick in 2..=TRANSACTION_TICKS {
            spi.step(inputs(false, 0, false));

            let o = spi.outputs();
            if !prev_sclk && o.sclk {
                rising.push(tick);
            }
            prev_sclk = o.sclk;

            if o.cs_n {
                assert!(!o.sclk, "sclk high at tick {} in {:?}", tick, spi.state());
            }
        }

        assert_eq!(rising.len(), SCLK_RISES as usize);
        assert!(rising.windows(2).all(|w| w[1] - w[0] == DIVIDER_PERIOD as u64));
    }

    #[test]
    fn test_start_ignored_while_busy() {
        let mut spi = SpiController::new();

        spi.step(inputs(true, 1, false));

        // start held high for the whole transaction
        let mut ticks = 1;
        while spi.state() != State::Idle {
            spi.step(inputs(true, 4, false));
            ticks += 1;
        }

        assert_eq!(ticks, TRANSACTION_TICKS);
        assert_eq!(spi.channel().index(), 1);

        spi.step(inputs(true, 4, false));
        assert_eq!(spi.state(), State::SendCommand);
        assert_eq!(spi.channel().index(), 4);
    }

    #[test]
    fn test_reset_wins_over_start_in_idle() {
        let mut spi = SpiController::new();

        spi.step(ControllerInputs { rst: true, ..inputs(true, 3, false) });

        assert_eq!(spi.state(), State::Idle);
        assert!(spi.outputs().cs_n);
        assert!(!spi.outputs().mosi);

        spi.step(inputs(true, 3, false));
        assert_eq!(spi.state(), State::SendCommand);
    }

    #[test]
    fn test_reset_aborts_every_phase() {
        for phase in [State::SendCommand, State::ReceiveData, State::Finish, State::Done] {
            let mut spi = SpiController::new();

            spi.step(inputs(true, 7, true));
            while spi.state() != phase {
                spi.step(inputs(false, 7, true));
            }

            spi.step(ControllerInputs { rst: true, ..inputs(true, 7, true) });

            assert_eq!(spi.state(), State::Idle, "{:?}", phase);
            assert_eq!(spi.outputs(), ControllerOutputs {
                mosi: false,
                sclk: false,
                cs_n: true,
                result: 0,
                valid: false,
            }, "{:?}", phase);
            assert_eq!(spi.bit_count(), 0);
            assert_eq!(spi.divider_count(), 0);
            assert_eq!(spi.cooldown_count(), 0);
        }
    }
}
