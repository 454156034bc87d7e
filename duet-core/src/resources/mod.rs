pub mod clint;
pub mod gpio;
pub mod plic;
pub mod ram;
