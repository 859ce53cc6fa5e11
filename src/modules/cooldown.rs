/// Minimum bus-select high time between transactions, in reference ticks
pub const COOLDOWN_TICKS: u8 = 14;

#[derive(Copy, Clone, Debug, Default)]
pub struct Cooldown {
    count: u8,
}

impl Cooldown {
    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn restart(&mut self) {
        self.count = 0;
    }

    pub fn is_complete(&self) -> bool {
        self.count >= COOLDOWN_TICKS
    }

    /// Counts one tick, returns true once the quiescent period has elapsed
    pub fn tick(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.is_complete()
    }
}
