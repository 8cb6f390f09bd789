//! Domain types for StochLab

pub mod bar;
pub mod frame;

pub use bar::Bar;
pub use frame::StochasticFrame;
