pub mod actuator;
pub mod line;

pub use actuator::{RelayActuator, RelayPolarity};
pub use line::{GpioLine, MockLine, RelayLine};
