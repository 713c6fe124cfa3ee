use crate::cpu::{Decoder, Op, Parameter, PrefixState, RepeatMode, Segment, AX, BX};
use crate::memory::MMU;

fn decode(code: &[u8]) -> crate::cpu::Instruction {
    let mut mmu = MMU::new();
    mmu.write(0x0000, 0x0100, code);
    let mut decoder = Decoder::default();
    decoder.get_instruction(&mmu, &PrefixState::default(), 0x0000, 0x0100)
}

fn decode_with(code: &[u8], prefix: PrefixState) -> crate::cpu::Instruction {
    let mut mmu = MMU::new();
    mmu.write(0x0000, 0x0100, code);
    let mut decoder = Decoder::default();
    decoder.get_instruction(&mmu, &prefix, 0x0000, 0x0100)
}

#[test]
fn decodes_mov_r16_imm16() {
    let op = decode(&[0xB8, 0x34, 0x12]);
    assert_eq!(Op::Mov16, op.command);
    assert_eq!(Parameter::Reg16(AX), op.params.dst);
    assert_eq!(Parameter::Imm16(0x1234), op.params.src);
    assert_eq!(3, op.length);
    assert_eq!("mov ax, 0x1234", format!("{}", op));
}

#[test]
fn decodes_direct_address_mode() {
    // mod=0 rm=6 is a 16-bit direct address, not bp-relative
    let op = decode(&[0x8B, 0x1E, 0x00, 0x20]); // mov bx,[0x2000]
    assert_eq!(Op::Mov16, op.command);
    assert_eq!(Parameter::Reg16(BX), op.params.dst);
    assert_eq!(Parameter::Ptr16(Segment::Default, 0x2000), op.params.src);
    assert_eq!(4, op.length);
}

#[test]
fn decodes_amode_displacements() {
    // mod=0: no displacement
    let op = decode(&[0x8B, 0x07]); // mov ax,[bx]
    assert_eq!(Parameter::Ptr16Amode(Segment::Default, 7), op.params.src);
    assert_eq!(2, op.length);

    // mod=1: sign-extended byte displacement
    let op = decode(&[0x8B, 0x47, 0xFE]); // mov ax,[bx-0x2]
    assert_eq!(Parameter::Ptr16AmodeS8(Segment::Default, 7, -2), op.params.src);
    assert_eq!(3, op.length);

    // mod=2: word displacement
    let op = decode(&[0x8B, 0x87, 0x00, 0x10]); // mov ax,[bx+0x1000]
    assert_eq!(Parameter::Ptr16AmodeS16(Segment::Default, 7, 0x1000), op.params.src);
    assert_eq!(4, op.length);
}

#[test]
fn bp_relative_modes_default_to_ss() {
    let op = decode(&[0x8B, 0x46, 0x02]); // mov ax,[bp+0x2]
    assert_eq!(Parameter::Ptr16AmodeS8(Segment::SS, 6, 2), op.params.src);

    let op = decode(&[0x8B, 0x02]); // mov ax,[bp+si]
    assert_eq!(Parameter::Ptr16Amode(Segment::SS, 2), op.params.src);

    let op = decode(&[0x8B, 0x04]); // mov ax,[si]
    assert_eq!(Parameter::Ptr16Amode(Segment::Default, 4), op.params.src);
}

#[test]
fn segment_override_reaches_the_operand() {
    let prefix = PrefixState {
        segment: Segment::ES,
        ..PrefixState::default()
    };
    let op = decode_with(&[0x8B, 0x46, 0x02], prefix); // es: mov ax,[bp+0x2]
    assert_eq!(Parameter::Ptr16AmodeS8(Segment::ES, 6, 2), op.params.src);
}

#[test]
fn repeat_prefix_reaches_the_instruction() {
    let prefix = PrefixState {
        repeat: RepeatMode::Rep,
        ..PrefixState::default()
    };
    let op = decode_with(&[0xA4], prefix);
    assert_eq!(Op::Movsb, op.command);
    assert_eq!(RepeatMode::Rep, op.repeat);
    assert_eq!(1, op.length);
}

#[test]
fn decodes_immediate_group() {
    let op = decode(&[0x81, 0xC3, 0x34, 0x12]); // add bx,0x1234
    assert_eq!(Op::Add16, op.command);
    assert_eq!(Parameter::Reg16(BX), op.params.dst);
    assert_eq!(Parameter::Imm16(0x1234), op.params.src);
    assert_eq!(4, op.length);

    let op = decode(&[0x83, 0xEB, 0x01]); // sub bx,byte +0x1
    assert_eq!(Op::Sub16, op.command);
    assert_eq!(Parameter::ImmS8(1), op.params.src);
    assert_eq!(3, op.length);

    // 0x82 mirrors 0x80
    let op = decode(&[0x82, 0xC4, 0x01]); // add ah,0x1
    assert_eq!(Op::Add8, op.command);
}

#[test]
fn decodes_group3() {
    let op = decode(&[0xF6, 0xD8]); // neg al
    assert_eq!(Op::Neg8, op.command);

    let op = decode(&[0xF7, 0xE3]); // mul bx
    assert_eq!(Op::Mul16, op.command);

    // test takes an immediate after the modrm
    let op = decode(&[0xF6, 0xC0, 0x80]); // test al,0x80
    assert_eq!(Op::Test8, op.command);
    assert_eq!(Parameter::Imm8(0x80), op.params.src);
    assert_eq!(3, op.length);
}

#[test]
fn decodes_group5() {
    let op = decode(&[0xFF, 0xD0]); // call ax
    assert_eq!(Op::CallNear, op.command);
    assert_eq!(Parameter::Reg16(AX), op.params.dst);

    let op = decode(&[0xFF, 0x26, 0x00, 0x02]); // jmp [0x200]
    assert_eq!(Op::JmpNear, op.command);

    let op = decode(&[0xFF, 0xF8]); // invalid reg=7
    match op.command {
        Op::Invalid(_) => {}
        other => panic!("expected invalid, got {:?}", other),
    }
}

#[test]
fn relative_targets_are_absolute_offsets() {
    // jmp short back over itself: 0x102 - 4 = 0xFE... from 0x100
    let op = decode(&[0xEB, 0xFE]); // jmp short 0x100
    assert_eq!(Op::JmpShort, op.command);
    assert_eq!(Parameter::Imm16(0x0100), op.params.dst);

    let op = decode(&[0xE8, 0x01, 0x00]); // call 0x104
    assert_eq!(Op::CallNear, op.command);
    assert_eq!(Parameter::Imm16(0x0104), op.params.dst);
}

#[test]
fn decodes_far_transfers() {
    let op = decode(&[0x9A, 0x00, 0x02, 0x34, 0x12]); // call 0x1234:0x0200
    assert_eq!(Op::CallFar, op.command);
    assert_eq!(Parameter::Ptr16Imm(0x1234, 0x0200), op.params.dst);
    assert_eq!(5, op.length);

    let op = decode(&[0xEA, 0x00, 0x01, 0x00, 0xF0]); // jmp 0xf000:0x0100
    assert_eq!(Op::JmpFar, op.command);
    assert_eq!(Parameter::Ptr16Imm(0xF000, 0x0100), op.params.dst);
}

#[test]
fn unknown_byte_decodes_invalid() {
    let op = decode(&[0x0F, 0x00]); // 286+ two-byte ops are not 8086
    match op.command {
        Op::Invalid(ref bytes) => assert_eq!(&[0x0F], bytes.as_slice()),
        other => panic!("expected invalid, got {:?}", other),
    }
}

#[test]
fn esc_consumes_its_operand() {
    let op = decode(&[0xD9, 0x06, 0x00, 0x02]);
    assert_eq!(Op::Esc, op.command);
    assert_eq!(4, op.length);
}
