/// A clocked design advanced one reference tick at a time.
///
/// Inputs are sampled once per tick; outputs are the registered values after the most recent
/// tick.
pub trait Synchronous {
    type I: Copy;
    type O: Copy;

    /// Runs the design for one reference clock tick
    fn step(&mut self, inp: Self::I);

    fn outputs(&self) -> Self::O;

    /// Runs the design for n ticks with constant inputs
    fn step_by(&mut self, inp: Self::I, ticks: usize) {
        for _ in 0..ticks {
            self.step(inp);
        }
    }

    /// Runs the design until `done` holds for its outputs or a maximum number of ticks. Returns
    /// the number of ticks if the condition was met within the allotted ticks, or None if it
    /// wasn't.
    fn step_until(&mut self, inp: Self::I, max_ticks: usize, done: impl Fn(&Self::O) -> bool) -> Option<usize> {
        let mut i = 0;
        while i < max_ticks {
            i += 1;

            self.step(inp);

            if done(&self.outputs()) {
                return Some(i);
            }
        }

        None
    }
}
