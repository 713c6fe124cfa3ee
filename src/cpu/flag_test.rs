use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use crate::cpu::flag::{Flags, Width, FLAG_CF, FLAG_DF, FLAG_ZF};

#[test]
fn parity_counts_low_byte_only() {
    let mut f = Flags::new();
    f.set_parity(0b0000_0011);
    assert_eq!(true, f.parity);
    f.set_parity(0b0000_0111);
    assert_eq!(false, f.parity);
    // bits above the low byte are ignored
    f.set_parity(0xFF00);
    assert_eq!(true, f.parity);
}

#[test]
fn sign_and_zero_respect_width() {
    let mut f = Flags::new();
    f.set_sign(0x80, Width::Byte);
    assert_eq!(true, f.sign);
    f.set_sign(0x80, Width::Word);
    assert_eq!(false, f.sign);

    f.set_zero(0x100, Width::Byte);
    assert_eq!(true, f.zero);
    f.set_zero(0x100, Width::Word);
    assert_eq!(false, f.zero);
}

#[test]
fn packed_u16_round_trips() {
    let mut f = Flags::new();
    f.carry = true;
    f.zero = true;
    f.direction = true;
    let packed = f.u16();
    assert_eq!(FLAG_CF | FLAG_ZF | FLAG_DF, packed);

    let mut g = Flags::new();
    g.set_u16(packed);
    assert_eq!(f, g);
}

// the ADD flag law from first principles, against the formula-based
// engine, over a deterministic sample of operand pairs
#[test]
fn add_flag_law_holds_for_random_operands() {
    let mut rng = XorShiftRng::seed_from_u64(0x8086);
    for _ in 0..10_000 {
        let a: u16 = rng.gen();
        let b: u16 = rng.gen();
        let res = usize::from(a) + usize::from(b);

        let mut f = Flags::new();
        f.set_carry(res, Width::Word);
        f.set_overflow_add(res, usize::from(a), usize::from(b), Width::Word);
        f.set_szp(res, Width::Word);

        let masked = (res & 0xFFFF) as u16;
        assert_eq!(res >= 0x1_0000, f.carry, "CF for {:04X}+{:04X}", a, b);
        assert_eq!(masked == 0, f.zero, "ZF for {:04X}+{:04X}", a, b);
        assert_eq!(masked & 0x8000 != 0, f.sign, "SF for {:04X}+{:04X}", a, b);
        let overflow = (a & 0x8000) == (b & 0x8000) && (a & 0x8000) != (masked & 0x8000);
        assert_eq!(overflow, f.overflow, "OF for {:04X}+{:04X}", a, b);
    }
}
