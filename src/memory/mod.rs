pub use self::flat_memory::*;
mod flat_memory;

pub use self::mmu::*;
mod mmu;

#[cfg(test)]
#[path = "./mmu_test.rs"]
mod mmu_test;
