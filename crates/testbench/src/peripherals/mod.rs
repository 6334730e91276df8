pub mod finisher;
pub mod uart;
