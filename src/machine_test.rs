use crate::cpu::{StepResult, AX, CS};
use crate::machine::{Machine, RunExit, MAX_PROGRAM_SIZE};

fn run_program(code: &[u8]) -> Machine {
    let mut m = Machine::default();
    m.load_program(code);
    m.run(10_000);
    m
}

#[test]
fn loader_contract() {
    let mut m = Machine::default();
    m.load_program(&[0x90, 0xF4]);
    assert_eq!(0x0000, m.cpu.sreg16[CS]);
    assert_eq!(0x0100, m.cpu.ip);
    assert_eq!(0x90, m.mmu.read_u8(0x0000, 0x0100));
    // everything else stays zeroed
    assert_eq!(0, m.cpu.r16[AX].val);
    assert_eq!(0, m.cpu.flags.u16());
}

#[test]
fn loader_clamps_oversized_programs() {
    let mut big = vec![0x90u8; MAX_PROGRAM_SIZE + 16];
    big[MAX_PROGRAM_SIZE - 1] = 0xF4;
    let mut m = Machine::default();
    m.load_program(&big);
    assert_eq!(0x90, m.mmu.read_u8(0x0000, 0x0100));
    // the last accepted byte landed at 0x100 + 64k - 1
    let flat_end = 0x100 + MAX_PROGRAM_SIZE as u32 - 1;
    assert_eq!(0xF4, m.mmu.memory.read_u8(flat_end));
    // nothing beyond it
    assert_eq!(0x00, m.mmu.memory.read_u8(flat_end + 1));
}

#[test]
fn scenario_mov_add_hlt() {
    let m = run_program(&[
        0xB8, 0x01, 0x00, // mov ax,0x1
        0x05, 0xFF, 0xFF, // add ax,0xffff
        0xF4,             // hlt
    ]);
    assert_eq!(0x0000, m.cpu.r16[AX].val);
    assert_eq!(true, m.cpu.flags.carry);
    assert_eq!(true, m.cpu.flags.zero);
    assert!(m.output_bytes().is_empty());
}

// dos print character via int 21h ah=02h
#[test]
fn scenario_dos_print_char() {
    let m = run_program(&[
        0xB2, 0x41, // mov dl,'A'
        0xB4, 0x02, // mov ah,0x2
        0xCD, 0x21, // int 0x21
        0xB4, 0x4C, // mov ah,0x4c
        0xCD, 0x21, // int 0x21
    ]);
    assert_eq!(b"A", m.output_bytes());
}

// dos print string via int 21h ah=09h
#[test]
fn scenario_dos_print_string() {
    let mut m = Machine::default();
    let mut code = vec![
        0xBA, 0x10, 0x01, // mov dx,0x110
        0xB4, 0x09,       // mov ah,0x9
        0xCD, 0x21,       // int 0x21
        0xB4, 0x4C,       // mov ah,0x4c
        0xCD, 0x21,       // int 0x21
    ];
    code.resize(0x10, 0x90); // pad up to offset 0x110
    code.extend_from_slice(b"Hi!$");
    m.load_program(&code);
    m.run(10_000);
    assert_eq!(b"Hi!", m.output_bytes());
}

#[test]
fn dos_keyboard_read_returns_placeholder() {
    let m = run_program(&[
        0xB4, 0x01, // mov ah,0x1
        0xCD, 0x21, // int 0x21
        0xF4,       // hlt
    ]);
    assert_eq!(0x41, m.cpu.r16[AX].lo_u8());
    assert!(m.output_bytes().is_empty());
}

#[test]
fn dos_terminate_via_ah_00() {
    let mut m = Machine::default();
    m.load_program(&[
        0xB4, 0x00, // mov ah,0x0
        0xCD, 0x21, // int 0x21
    ]);
    assert_eq!(StepResult::Continue, m.step());
    assert_eq!(StepResult::Halted, m.step());
}

#[test]
fn unhandled_dos_service_reports_and_continues() {
    let m = run_program(&[
        0xB4, 0x30, // mov ah,0x30 (get version, not emulated)
        0xCD, 0x21, // int 0x21
        0xB8, 0x07, 0x00, // mov ax,0x7
        0xF4,       // hlt
    ]);
    assert_eq!(
        b"[DOS] INT 21h AH=30h not implemented\n".as_ref(),
        m.output_bytes()
    );
    // execution continued past the int
    assert_eq!(0x0007, m.cpu.r16[AX].val);
}

#[test]
fn bios_services_report_and_continue() {
    let m = run_program(&[
        0xB4, 0x0E, // mov ah,0xe
        0xCD, 0x10, // int 0x10
        0xB4, 0x00, // mov ah,0x0
        0xCD, 0x16, // int 0x16
        0xF4,       // hlt
    ]);
    let text = String::from_utf8_lossy(m.output_bytes()).to_string();
    assert_eq!(
        "[BIOS] INT 10h AH=0Eh not implemented\n[BIOS] INT 16h AH=00h not implemented\n",
        text
    );
}

#[test]
fn unknown_opcode_halts_with_diagnostic() {
    let mut m = Machine::default();
    m.load_program(&[
        0x90, // nop
        0x0F, // not an 8086 opcode
    ]);
    assert_eq!(StepResult::Continue, m.step());
    assert_eq!(StepResult::Halted, m.step());
    assert_eq!(
        b"Unknown opcode 0F at 0000:0101\n".as_ref(),
        m.output_bytes()
    );
}

#[test]
fn spinning_program_hits_the_step_limit() {
    let mut m = Machine::default();
    m.load_program(&[0xEB, 0xFE]); // jmp short $
    assert_eq!(RunExit::StepLimit, m.run(1_000));
}

#[test]
fn each_session_is_fresh() {
    let first = run_program(&[
        0xB2, 0x58, // mov dl,'X'
        0xB4, 0x02, // mov ah,0x2
        0xCD, 0x21, // int 0x21
        0xF4,       // hlt
    ]);
    assert_eq!(b"X", first.output_bytes());

    let second = run_program(&[0xF4]);
    assert!(second.output_bytes().is_empty());
    assert_eq!(0, second.cpu.r16[AX].val);
}
