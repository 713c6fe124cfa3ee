use crate::memory::{flat_address, FlatMemory, MEMORY_SIZE, MMU};

#[test]
fn word_access_is_little_endian() {
    let mut mmu = MMU::new();
    mmu.write_u16(0x0000, 0x0100, 0x1234);
    assert_eq!(0x34, mmu.read_u8(0x0000, 0x0100));
    assert_eq!(0x12, mmu.read_u8(0x0000, 0x0101));
    assert_eq!(0x1234, mmu.read_u16(0x0000, 0x0100));

    // the composition law
    let composed = u16::from(mmu.read_u8(0x0000, 0x0100))
        | u16::from(mmu.read_u8(0x0000, 0x0101)) << 8;
    assert_eq!(mmu.read_u16(0x0000, 0x0100), composed);
}

#[test]
fn segment_translation() {
    assert_eq!(0x00100, flat_address(0x0000, 0x0100));
    assert_eq!(0x10000, flat_address(0x1000, 0x0000));
    assert_eq!(0x10010, flat_address(0x1000, 0x0010));
    // the sum is truncated to 20 bits
    assert_eq!(0x00FEF, flat_address(0xFFFF, 0x0FFF));
}

#[test]
fn out_of_range_reads_yield_ff() {
    let mem = FlatMemory::new();
    assert_eq!(0xFF, mem.read_u8(MEMORY_SIZE as u32));
    assert_eq!(0xFF, mem.read_u8(0xFFFF_FFFF));
    // in-range still zero-filled
    assert_eq!(0x00, mem.read_u8((MEMORY_SIZE - 1) as u32));
}

#[test]
fn out_of_range_writes_are_dropped() {
    let mut mem = FlatMemory::new();
    mem.write_u8(MEMORY_SIZE as u32, 0xAA);
    assert_eq!(0xFF, mem.read_u8(MEMORY_SIZE as u32));
}

#[test]
fn word_read_at_top_of_memory_clamps_high_byte() {
    let mut mem = FlatMemory::new();
    mem.write_u8((MEMORY_SIZE - 1) as u32, 0x42);
    // the second byte is out of range and reads as 0xFF
    assert_eq!(0xFF42, mem.read_u16((MEMORY_SIZE - 1) as u32));

    // the word write keeps its low byte and drops the high byte
    mem.write_u16((MEMORY_SIZE - 1) as u32, 0x1234);
    assert_eq!(0x34, mem.read_u8((MEMORY_SIZE - 1) as u32));
}

#[test]
fn interrupt_vectors_read_from_the_table() {
    let mut mmu = MMU::new();
    // entry 0x21 at 0x84: offset word then segment word
    mmu.write_u16(0x0000, 0x21 * 4, 0x1234);
    mmu.write_u16(0x0000, 0x21 * 4 + 2, 0x5678);
    assert_eq!((0x5678, 0x1234), mmu.read_vec(0x21));
}
