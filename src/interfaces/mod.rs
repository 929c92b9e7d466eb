//! Outer interfaces

pub mod ws;
