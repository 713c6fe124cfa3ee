use crate::cpu::register::Register16;

#[test]
fn byte_halves_alias_the_word() {
    let mut r = Register16 { val: 0 };
    r.val = 0x1234;
    assert_eq!(0x34, r.lo_u8());
    assert_eq!(0x12, r.hi_u8());

    r.set_lo(0xFF);
    assert_eq!(0x12FF, r.val);
    r.set_hi(0xAB);
    assert_eq!(0xABFF, r.val);

    // writing one half must not disturb the other
    r.set_lo(0x00);
    assert_eq!(0xAB, r.hi_u8());
}
