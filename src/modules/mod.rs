mod flipflop;
pub use flipflop::*;

mod clock;
pub use clock::*;

mod shift;
pub use shift::*;

mod cooldown;
pub use cooldown::*;

mod spi;
pub use spi::*;

mod adc;
pub use adc::*;
