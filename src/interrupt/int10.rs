use crate::cpu::{CPU, AX};
use crate::output::OutputBuffer;

// video services. nothing is emulated; the call is reported on the
// output sink and execution continues.
pub fn handle(cpu: &mut CPU, out: &mut OutputBuffer) {
    out.put_str(&format!(
        "[BIOS] INT 10h AH={:02X}h not implemented\n",
        cpu.r16[AX].hi_u8()
    ));
}
