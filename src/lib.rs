#[macro_use]
extern crate quick_error;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

pub mod cpu;
pub mod hex;
pub mod machine;
pub mod memory;
pub mod output;
pub mod tools;
pub mod transport;

mod interrupt;
