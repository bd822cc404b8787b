pub mod sensor;
pub mod std_clock;
