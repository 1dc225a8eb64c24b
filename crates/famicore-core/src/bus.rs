//! Bus views connecting the CPU core to the rest of the console.
//!
//! Ownership of every component stays at the system level (see [`crate::Nes`]);
//! the bus is a short-lived borrowed view assembled for each CPU step so that
//! lifetimes remain explicit and borrow-checked instead of resorting to
//! reference counting.

pub mod cpu;

pub use cpu::CpuBus;
