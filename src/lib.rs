//! Read and write the values of a Solarfocus heating controller over Modbus TCP.
//!
//! The controller exposes each installed component (heating circuits, boilers, the heat pump and
//! so on) as a block of input registers for measurements and a block of holding registers for
//! settings. [`register_map`] describes those blocks, [`system::HeatingSystem`] reads and writes
//! them through any [`connection::RegisterIo`].

pub mod commands;
pub mod components;
pub mod connection;
pub mod output;
pub mod properties;
pub mod register_map;
pub mod registers;
pub mod slices;
pub mod states;
pub mod system;
#[cfg(test)]
pub(crate) mod test_utils;
