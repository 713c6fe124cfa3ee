use crate::cpu::{CPU, StepResult, AX, DX, DS};
use crate::memory::MMU;
use crate::output::OutputBuffer;

/// keyboard input is not wired to a real stdin; AH=01h hands back a
/// fixed byte so runs stay reproducible
const PLACEHOLDER_INPUT: u8 = 0x41;

// dos services
pub fn handle(cpu: &mut CPU, mmu: &MMU, out: &mut OutputBuffer) -> StepResult {
    match cpu.r16[AX].hi_u8() {
        0x00 => {
            // DOS 1+ - TERMINATE PROGRAM
            return StepResult::Halted;
        }
        0x01 => {
            // DOS 1+ - READ CHARACTER FROM STANDARD INPUT, WITH ECHO
            // Return: AL = character read
            cpu.r16[AX].set_lo(PLACEHOLDER_INPUT);
        }
        0x02 => {
            // DOS 1+ - WRITE CHARACTER TO STANDARD OUTPUT
            // DL = character to write
            out.put_u8(cpu.r16[DX].lo_u8());
        }
        0x09 => {
            // DOS 1+ - WRITE STRING TO STANDARD OUTPUT
            // DS:DX -> '$'-terminated string; the terminator is not written
            let seg = cpu.sreg16[DS];
            let mut offset = cpu.r16[DX].val;
            loop {
                let b = mmu.read_u8(seg, offset);
                if b == b'$' {
                    break;
                }
                out.put_u8(b);
                offset = offset.wrapping_add(1);
            }
        }
        0x4C => {
            // DOS 2+ - TERMINATE WITH RETURN CODE
            // AL = return code
            return StepResult::Halted;
        }
        _ => {
            out.put_str(&format!(
                "[DOS] INT 21h AH={:02X}h not implemented\n",
                cpu.r16[AX].hi_u8()
            ));
        }
    }
    StepResult::Continue
}
