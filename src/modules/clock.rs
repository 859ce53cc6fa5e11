/// Reference ticks per bus clock period
pub const DIVIDER_PERIOD: u8 = 16;

/// Count at which the bus clock is due to go high
pub const RISE_AT: u8 = DIVIDER_PERIOD / 2;

/// Count at which the bus clock is due to go low
pub const FALL_AT: u8 = DIVIDER_PERIOD - 1;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ClockEdges {
    pub rise: bool,
    pub fall: bool,
}

/// Bus clock generator.
///
/// A single wrapping counter observed at two thresholds. The line follows the edge-due flags one
/// tick late, so data presented on a falling-due tick is stable for the whole low half of the
/// period and is sampled while the line is high.
#[derive(Clone, Debug, Default)]
pub struct ClockDivider {
    count: u8,
    sclk: bool,
}

impl ClockDivider {
    pub fn new() -> Self {
        ClockDivider::default()
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn sclk(&self) -> bool {
        self.sclk
    }

    /// Edge-due flags for the current count
    pub fn edges(&self) -> ClockEdges {
        ClockEdges {
            rise: self.count == RISE_AT,
            fall: self.count == FALL_AT,
        }
    }

    /// Advances one tick, returning the flags that were due on it
    pub fn advance(&mut self) -> ClockEdges {
        let edges = self.edges();

        if edges.rise {
            self.sclk = true;
        }

        if edges.fall {
            self.sclk = false;
        }

        self.count = if self.count == FALL_AT { 0 } else { self.count + 1 };

        edges
    }

    /// Stops counting and pulls the line low
    pub fn clear(&mut self) {
        self.count = 0;
        self.sclk = false;
    }
}
