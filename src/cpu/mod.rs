// these modules are re-exported as a single module

pub use self::decoder::*;
mod decoder;

pub use self::flag::*;
mod flag;

pub use self::instruction::*;
mod instruction;

pub use self::op::*;
mod op;

pub use self::parameter::*;
mod parameter;

pub use self::register::*;
mod register;

pub use self::segment::*;
mod segment;

use log::warn;

use crate::hex::hex_bytes;
use crate::interrupt;
use crate::memory::MMU;
use crate::output::OutputBuffer;


/// outcome of one `step()` call, as seen by the driver
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StepResult {
    /// keep stepping
    Continue,
    /// execution ended: HLT, a DOS terminate call, or a fatal fault
    /// already reported on the output sink
    Halted,
}

pub struct CPU {
    pub ip: u16,

    /// general purpose registers, ModR/M encoding order
    pub r16: [Register16; 8],

    /// segment registers: ES CS SS DS
    pub sreg16: [u16; 4],

    pub flags: Flags,

    /// prefix bytes accumulated ahead of the next body opcode.
    /// survives across `step()` calls since each prefix byte is its
    /// own step.
    pub prefix: PrefixState,

    pub instruction_count: usize,
    pub decoder: Decoder,
}

impl CPU {
    pub fn default() -> Self {
        CPU {
            ip: 0,
            r16: [Register16::default(); 8],
            sreg16: [0; 4],
            flags: Flags::new(),
            prefix: PrefixState::default(),
            instruction_count: 0,
            decoder: Decoder::default(),
        }
    }

    /// runs one unit of work: a single prefix byte, a single body
    /// instruction, or a single iteration of a repeated string
    /// primitive.
    pub fn step(&mut self, mmu: &mut MMU, out: &mut OutputBuffer) -> StepResult {
        let b = mmu.read_u8(self.sreg16[CS], self.ip);
        match b {
            0x26 | 0x2E | 0x36 | 0x3E | 0xF0 | 0xF2 | 0xF3 => {
                // a later prefix of the same class overwrites an earlier one
                match b {
                    0x26 => self.prefix.segment = Segment::ES,
                    0x2E => self.prefix.segment = Segment::CS,
                    0x36 => self.prefix.segment = Segment::SS,
                    0x3E => self.prefix.segment = Segment::DS,
                    0xF0 => self.prefix.lock = true, // recorded, ignored
                    0xF2 => self.prefix.repeat = RepeatMode::Repne,
                    _ => self.prefix.repeat = RepeatMode::Rep,
                }
                self.ip = self.ip.wrapping_add(1);
                return StepResult::Continue;
            }
            _ => {}
        }

        let prefix = self.prefix;
        let cs = self.sreg16[CS];
        let ip = self.ip;
        let op = self.decoder.get_instruction(mmu, &prefix, cs, ip);

        if let Op::Invalid(ref bytes) = op.command {
            out.put_str(&format!(
                "Unknown opcode {} at {:04X}:{:04X}\n",
                hex_bytes(bytes),
                cs,
                ip
            ));
            warn!(
                "unknown opcode {} at {:04X}:{:04X} after {} instructions",
                hex_bytes(bytes),
                cs,
                ip,
                self.instruction_count
            );
            return StepResult::Halted;
        }

        // an armed repeat with CX=0 skips the string primitive entirely
        if op.repeat != RepeatMode::None && op.command.is_string() && self.r16[CX].val == 0 {
            self.ip = self.ip.wrapping_add(u16::from(op.length));
            self.prefix.clear();
            return StepResult::Continue;
        }

        let start_ip = self.ip;
        self.ip = self.ip.wrapping_add(u16::from(op.length));
        self.instruction_count += 1;

        let res = self.execute(mmu, out, &op);

        // the repeat loop re-executes the same instruction: one element
        // per step, IP rewound to the string opcode while the condition
        // holds. prefixes stay armed across the rewind so a segment
        // override covers every iteration.
        let mut rearmed = false;
        if op.repeat != RepeatMode::None && op.command.is_string() {
            self.r16[CX].val = self.r16[CX].val.wrapping_sub(1);
            if self.rep_continues(&op) {
                self.ip = start_ip;
                rearmed = true;
            }
        }
        if !rearmed {
            self.prefix.clear();
        }
        res
    }

    fn rep_continues(&self, op: &Instruction) -> bool {
        if self.r16[CX].val == 0 {
            return false;
        }
        match op.command {
            // the compare forms also consult ZF
            Op::Cmpsb | Op::Cmpsw | Op::Scasb | Op::Scasw => match op.repeat {
                RepeatMode::Rep => self.flags.zero,
                RepeatMode::Repne => !self.flags.zero,
                RepeatMode::None => false,
            },
            _ => true,
        }
    }

    fn execute(&mut self, mmu: &mut MMU, out: &mut OutputBuffer, op: &Instruction) -> StepResult {
        match op.command {
            Op::Aaa => self.adjb(6, 1),
            Op::Aad => {
                let imm = self.read_parameter_value(mmu, &op.params.dst) as u8;
                let res = self
                    .r16[AX]
                    .lo_u8()
                    .wrapping_add(self.r16[AX].hi_u8().wrapping_mul(imm));
                self.r16[AX].set_lo(res);
                self.r16[AX].set_hi(0);
                self.flags.set_szp(usize::from(res), Width::Byte);
            }
            Op::Aam => {
                let imm = self.read_parameter_value(mmu, &op.params.dst) as u8;
                if imm == 0 {
                    out.put_str("Divide by zero!\n");
                    return StepResult::Halted;
                }
                let al = self.r16[AX].lo_u8();
                self.r16[AX].set_hi(al / imm);
                self.r16[AX].set_lo(al % imm);
                self.flags.set_szp(usize::from(al % imm), Width::Byte);
            }
            Op::Aas => self.adjb(-6, -1),
            Op::Adc8 | Op::Adc16 => {
                let carry = self.flags.carry_val();
                self.op_add(mmu, width_of(&op.command), op, carry);
            }
            Op::Add8 | Op::Add16 => self.op_add(mmu, width_of(&op.command), op, 0),
            Op::And8 | Op::And16 => self.op_logic(mmu, width_of(&op.command), op, LogicOp::And),
            Op::CallNear => {
                // the return address is the instruction after the call
                let old_ip = self.ip;
                let target = self.read_parameter_value(mmu, &op.params.dst) as u16;
                self.push16(mmu, old_ip);
                self.ip = target;
            }
            Op::CallFar => {
                let old_ip = self.ip;
                let (seg, offset) = self.far_pointer(mmu, &op.params.dst);
                let cs = self.sreg16[CS];
                self.push16(mmu, cs);
                self.push16(mmu, old_ip);
                self.sreg16[CS] = seg;
                self.ip = offset;
            }
            Op::Cbw => {
                let hi = if self.r16[AX].lo_u8() & 0x80 != 0 { 0xFF } else { 0x00 };
                self.r16[AX].set_hi(hi);
            }
            Op::Clc => self.flags.carry = false,
            Op::Cld => self.flags.direction = false,
            Op::Cli => self.flags.interrupt = false,
            Op::Cmc => self.flags.carry = !self.flags.carry,
            Op::Cmp8 | Op::Cmp16 => {
                let w = width_of(&op.command);
                let src = self.read_parameter_value(mmu, &op.params.src);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                self.alu_sub(w, dst, src, 0);
            }
            Op::Cmpsb => self.op_cmps(mmu, Width::Byte, op),
            Op::Cmpsw => self.op_cmps(mmu, Width::Word, op),
            Op::Cwd => {
                let dx = if self.r16[AX].val & 0x8000 != 0 { 0xFFFF } else { 0 };
                self.r16[DX].val = dx;
            }
            Op::Daa => self.adj4(6, 0x60),
            Op::Das => self.adj4(-6, -0x60),
            Op::Dec8 | Op::Dec16 => {
                let w = width_of(&op.command);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                // CF is not affected
                let carry = self.flags.carry;
                let res = self.alu_sub(w, dst, 1, 0);
                self.flags.carry = carry;
                self.write_parameter(mmu, &op.params.dst, res);
            }
            Op::Div8 | Op::Div16 => return self.op_div(mmu, out, width_of(&op.command), op),
            Op::Esc => {} // fpu opcodes are skipped; the operand was consumed
            Op::Hlt => return StepResult::Halted,
            Op::Idiv8 | Op::Idiv16 => return self.op_idiv(mmu, out, width_of(&op.command), op),
            Op::Imul8 => {
                let src = self.read_parameter_value(mmu, &op.params.dst) as u8;
                let res = i32::from(self.r16[AX].lo_u8() as i8) * i32::from(src as i8);
                self.r16[AX].val = res as u16;
                // CF=OF set when the upper half is not the sign extension
                // of the lower
                let fits = res == i32::from(res as i8);
                self.flags.carry = !fits;
                self.flags.overflow = !fits;
            }
            Op::Imul16 => {
                let src = self.read_parameter_value(mmu, &op.params.dst) as u16;
                let res = i32::from(self.r16[AX].val as i16) * i32::from(src as i16);
                self.r16[AX].val = res as u16;
                self.r16[DX].val = (res >> 16) as u16;
                let fits = res == i32::from(res as i16);
                self.flags.carry = !fits;
                self.flags.overflow = !fits;
            }
            Op::In8 => {
                let port = self.read_parameter_value(mmu, &op.params.src) as u16;
                out.put_str(&format!("[IO] in port={:04X}h\n", port));
                self.write_parameter(mmu, &op.params.dst, 0);
            }
            Op::In16 => {
                let port = self.read_parameter_value(mmu, &op.params.src) as u16;
                out.put_str(&format!("[IO] in port={:04X}h\n", port));
                self.write_parameter(mmu, &op.params.dst, 0);
            }
            Op::Inc8 | Op::Inc16 => {
                let w = width_of(&op.command);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                // CF is not affected
                let carry = self.flags.carry;
                let res = self.alu_add(w, dst, 1, 0);
                self.flags.carry = carry;
                self.write_parameter(mmu, &op.params.dst, res);
            }
            Op::Int => {
                let int = self.read_parameter_value(mmu, &op.params.dst) as u8;
                return self.op_int(mmu, out, int);
            }
            Op::Into => {
                if self.flags.overflow {
                    self.execute_interrupt(mmu, 4);
                }
            }
            Op::Iret => {
                self.ip = self.pop16(mmu);
                self.sreg16[CS] = self.pop16(mmu);
                let flags = self.pop16(mmu);
                self.flags.set_u16(flags);
            }
            Op::Ja => self.branch(mmu, op, !self.flags.carry && !self.flags.zero),
            Op::Jc => self.branch(mmu, op, self.flags.carry),
            Op::Jcxz => self.branch(mmu, op, self.r16[CX].val == 0),
            Op::Jg => self.branch(mmu, op, !self.flags.zero && self.flags.sign == self.flags.overflow),
            Op::Jl => self.branch(mmu, op, self.flags.sign != self.flags.overflow),
            Op::JmpFar => {
                let (seg, offset) = self.far_pointer(mmu, &op.params.dst);
                self.sreg16[CS] = seg;
                self.ip = offset;
            }
            Op::JmpNear | Op::JmpShort => {
                self.ip = self.read_parameter_value(mmu, &op.params.dst) as u16;
            }
            Op::Jna => self.branch(mmu, op, self.flags.carry || self.flags.zero),
            Op::Jnc => self.branch(mmu, op, !self.flags.carry),
            Op::Jng => self.branch(mmu, op, self.flags.zero || self.flags.sign != self.flags.overflow),
            Op::Jnl => self.branch(mmu, op, self.flags.sign == self.flags.overflow),
            Op::Jno => self.branch(mmu, op, !self.flags.overflow),
            Op::Jns => self.branch(mmu, op, !self.flags.sign),
            Op::Jnz => self.branch(mmu, op, !self.flags.zero),
            Op::Jo => self.branch(mmu, op, self.flags.overflow),
            Op::Jpe => self.branch(mmu, op, self.flags.parity),
            Op::Jpo => self.branch(mmu, op, !self.flags.parity),
            Op::Js => self.branch(mmu, op, self.flags.sign),
            Op::Jz => self.branch(mmu, op, self.flags.zero),
            Op::Lahf => {
                // SF:ZF:0:AF:0:PF:1:CF
                let ah = (self.flags.u16() & 0xD5) as u8 | 0x02;
                self.r16[AX].set_hi(ah);
            }
            Op::Lds => {
                let seg = self.parameter_segment(&op.params.src);
                let offset = self.read_parameter_address(&op.params.src);
                self.r16[reg_index(&op.params.dst)].val = mmu.read_u16(seg, offset);
                self.sreg16[DS] = mmu.read_u16(seg, offset.wrapping_add(2));
            }
            Op::Lea => {
                let offset = self.read_parameter_address(&op.params.src);
                self.write_parameter(mmu, &op.params.dst, usize::from(offset));
            }
            Op::Les => {
                let seg = self.parameter_segment(&op.params.src);
                let offset = self.read_parameter_address(&op.params.src);
                self.r16[reg_index(&op.params.dst)].val = mmu.read_u16(seg, offset);
                self.sreg16[ES] = mmu.read_u16(seg, offset.wrapping_add(2));
            }
            Op::Lodsb => self.op_lods(mmu, Width::Byte, op),
            Op::Lodsw => self.op_lods(mmu, Width::Word, op),
            Op::Loop => {
                let target = self.read_parameter_value(mmu, &op.params.dst) as u16;
                self.r16[CX].val = self.r16[CX].val.wrapping_sub(1);
                if self.r16[CX].val != 0 {
                    self.ip = target;
                }
            }
            Op::Loope => {
                let target = self.read_parameter_value(mmu, &op.params.dst) as u16;
                self.r16[CX].val = self.r16[CX].val.wrapping_sub(1);
                if self.r16[CX].val != 0 && self.flags.zero {
                    self.ip = target;
                }
            }
            Op::Loopne => {
                let target = self.read_parameter_value(mmu, &op.params.dst) as u16;
                self.r16[CX].val = self.r16[CX].val.wrapping_sub(1);
                if self.r16[CX].val != 0 && !self.flags.zero {
                    self.ip = target;
                }
            }
            Op::Mov8 | Op::Mov16 => {
                let data = self.read_parameter_value(mmu, &op.params.src);
                self.write_parameter(mmu, &op.params.dst, data);
            }
            Op::Movsb => self.op_movs(mmu, Width::Byte, op),
            Op::Movsw => self.op_movs(mmu, Width::Word, op),
            Op::Mul8 => {
                let src = self.read_parameter_value(mmu, &op.params.dst);
                let res = usize::from(self.r16[AX].lo_u8()) * src;
                self.r16[AX].val = res as u16;
                // CF=OF set when the upper half of the result is non-zero
                let upper = res >> 8 != 0;
                self.flags.carry = upper;
                self.flags.overflow = upper;
            }
            Op::Mul16 => {
                let src = self.read_parameter_value(mmu, &op.params.dst);
                let res = usize::from(self.r16[AX].val) * src;
                self.r16[AX].val = res as u16;
                self.r16[DX].val = (res >> 16) as u16;
                let upper = res >> 16 != 0;
                self.flags.carry = upper;
                self.flags.overflow = upper;
            }
            Op::Neg8 | Op::Neg16 => {
                let w = width_of(&op.command);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                let res = self.alu_sub(w, 0, dst, 0);
                self.write_parameter(mmu, &op.params.dst, res);
            }
            Op::Nop | Op::Wait => {}
            Op::Not8 | Op::Not16 => {
                // flags are not affected
                let w = width_of(&op.command);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                self.write_parameter(mmu, &op.params.dst, !dst & w.mask());
            }
            Op::Or8 | Op::Or16 => self.op_logic(mmu, width_of(&op.command), op, LogicOp::Or),
            Op::Out8 => {
                let port = self.read_parameter_value(mmu, &op.params.dst) as u16;
                let data = self.read_parameter_value(mmu, &op.params.src);
                out.put_str(&format!("[IO] out port={:04X}h value={:02X}h\n", port, data));
            }
            Op::Out16 => {
                let port = self.read_parameter_value(mmu, &op.params.dst) as u16;
                let data = self.read_parameter_value(mmu, &op.params.src);
                out.put_str(&format!("[IO] out port={:04X}h value={:04X}h\n", port, data));
            }
            Op::Pop16 => {
                let data = self.pop16(mmu);
                self.write_parameter(mmu, &op.params.dst, usize::from(data));
            }
            Op::Popa => {
                self.r16[DI].val = self.pop16(mmu);
                self.r16[SI].val = self.pop16(mmu);
                self.r16[BP].val = self.pop16(mmu);
                // the stored SP is discarded
                self.r16[SP].val = self.r16[SP].val.wrapping_add(2);
                self.r16[BX].val = self.pop16(mmu);
                self.r16[DX].val = self.pop16(mmu);
                self.r16[CX].val = self.pop16(mmu);
                self.r16[AX].val = self.pop16(mmu);
            }
            Op::Popf => {
                let data = self.pop16(mmu);
                self.flags.set_u16(data);
            }
            Op::Push16 => {
                let data = self.read_parameter_value(mmu, &op.params.dst) as u16;
                self.push16(mmu, data);
            }
            Op::Pusha => {
                let sp = self.r16[SP].val;
                let ax = self.r16[AX].val;
                let cx = self.r16[CX].val;
                let dx = self.r16[DX].val;
                let bx = self.r16[BX].val;
                let bp = self.r16[BP].val;
                let si = self.r16[SI].val;
                let di = self.r16[DI].val;
                self.push16(mmu, ax);
                self.push16(mmu, cx);
                self.push16(mmu, dx);
                self.push16(mmu, bx);
                self.push16(mmu, sp);
                self.push16(mmu, bp);
                self.push16(mmu, si);
                self.push16(mmu, di);
            }
            Op::Pushf => {
                let data = self.flags.u16();
                self.push16(mmu, data);
            }
            Op::Rcl8 | Op::Rcl16 => self.op_rotate(mmu, width_of(&op.command), op, Rotate::Rcl),
            Op::Rcr8 | Op::Rcr16 => self.op_rotate(mmu, width_of(&op.command), op, Rotate::Rcr),
            Op::Retf => {
                self.ip = self.pop16(mmu);
                self.sreg16[CS] = self.pop16(mmu);
                if let Parameter::Imm16(imm) = op.params.dst {
                    // release the callee arguments after the pop
                    self.r16[SP].val = self.r16[SP].val.wrapping_add(imm);
                }
            }
            Op::Retn => {
                self.ip = self.pop16(mmu);
                if let Parameter::Imm16(imm) = op.params.dst {
                    self.r16[SP].val = self.r16[SP].val.wrapping_add(imm);
                }
            }
            Op::Rol8 | Op::Rol16 => self.op_rotate(mmu, width_of(&op.command), op, Rotate::Rol),
            Op::Ror8 | Op::Ror16 => self.op_rotate(mmu, width_of(&op.command), op, Rotate::Ror),
            Op::Sahf => {
                let ah = self.r16[AX].hi_u8();
                self.flags.carry = ah & 0x01 != 0;
                self.flags.parity = ah & 0x04 != 0;
                self.flags.adjust = ah & 0x10 != 0;
                self.flags.zero = ah & 0x40 != 0;
                self.flags.sign = ah & 0x80 != 0;
            }
            Op::Salc => {
                let al = if self.flags.carry { 0xFF } else { 0x00 };
                self.r16[AX].set_lo(al);
            }
            Op::Sar8 | Op::Sar16 => self.op_shift(mmu, width_of(&op.command), op, Shift::Sar),
            Op::Sbb8 | Op::Sbb16 => {
                let w = width_of(&op.command);
                let borrow = self.flags.carry_val();
                let src = self.read_parameter_value(mmu, &op.params.src);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                let res = self.alu_sub(w, dst, src, borrow);
                self.write_parameter(mmu, &op.params.dst, res);
            }
            Op::Scasb => self.op_scas(mmu, Width::Byte),
            Op::Scasw => self.op_scas(mmu, Width::Word),
            Op::Shl8 | Op::Shl16 => self.op_shift(mmu, width_of(&op.command), op, Shift::Shl),
            Op::Shr8 | Op::Shr16 => self.op_shift(mmu, width_of(&op.command), op, Shift::Shr),
            Op::Stc => self.flags.carry = true,
            Op::Std => self.flags.direction = true,
            Op::Sti => self.flags.interrupt = true,
            Op::Stosb => self.op_stos(mmu, Width::Byte),
            Op::Stosw => self.op_stos(mmu, Width::Word),
            Op::Sub8 | Op::Sub16 => {
                let w = width_of(&op.command);
                let src = self.read_parameter_value(mmu, &op.params.src);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                let res = self.alu_sub(w, dst, src, 0);
                self.write_parameter(mmu, &op.params.dst, res);
            }
            Op::Test8 | Op::Test16 => {
                let w = width_of(&op.command);
                let src = self.read_parameter_value(mmu, &op.params.src);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                let res = dst & src;
                self.flags.overflow = false;
                self.flags.carry = false;
                self.flags.set_szp(res, w);
            }
            Op::Xchg8 | Op::Xchg16 => {
                let src = self.read_parameter_value(mmu, &op.params.src);
                let dst = self.read_parameter_value(mmu, &op.params.dst);
                self.write_parameter(mmu, &op.params.dst, src);
                self.write_parameter(mmu, &op.params.src, dst);
            }
            Op::Xlatb => {
                let offset = self
                    .r16[BX]
                    .val
                    .wrapping_add(u16::from(self.r16[AX].lo_u8()));
                let val = mmu.read_u8(self.segment(op.segment), offset);
                self.r16[AX].set_lo(val);
            }
            Op::Xor8 | Op::Xor16 => self.op_logic(mmu, width_of(&op.command), op, LogicOp::Xor),
            Op::Invalid(_) => unreachable!("invalid op reaches execute"),
        }
        StepResult::Continue
    }

    // ---- arithmetic core. each flag computation lives here once,
    // parameterized by width.

    fn alu_add(&mut self, w: Width, dst: usize, src: usize, carry_in: usize) -> usize {
        let res = dst.wrapping_add(src).wrapping_add(carry_in);
        self.flags.set_carry(res, w);
        self.flags.set_overflow_add(res, src, dst, w);
        self.flags.set_adjust(res, src, dst);
        self.flags.set_szp(res, w);
        res & w.mask()
    }

    fn alu_sub(&mut self, w: Width, dst: usize, src: usize, borrow_in: usize) -> usize {
        let res = dst.wrapping_sub(src.wrapping_add(borrow_in));
        self.flags.set_carry(res, w);
        self.flags.set_overflow_sub(res, src, dst, w);
        self.flags.set_adjust(res, src, dst);
        self.flags.set_szp(res, w);
        res & w.mask()
    }

    fn op_add(&mut self, mmu: &mut MMU, w: Width, op: &Instruction, carry_in: usize) {
        let src = self.read_parameter_value(mmu, &op.params.src);
        let dst = self.read_parameter_value(mmu, &op.params.dst);
        let res = self.alu_add(w, dst, src, carry_in);
        self.write_parameter(mmu, &op.params.dst, res);
    }

    fn op_logic(&mut self, mmu: &mut MMU, w: Width, op: &Instruction, kind: LogicOp) {
        let src = self.read_parameter_value(mmu, &op.params.src);
        let dst = self.read_parameter_value(mmu, &op.params.dst);
        let res = match kind {
            LogicOp::And => dst & src,
            LogicOp::Or => dst | src,
            LogicOp::Xor => dst ^ src,
        };
        // CF and OF are cleared; AF is architecturally undefined and
        // left untouched
        self.flags.overflow = false;
        self.flags.carry = false;
        self.flags.set_szp(res, w);
        self.write_parameter(mmu, &op.params.dst, res);
    }

    fn op_shift(&mut self, mmu: &mut MMU, w: Width, op: &Instruction, kind: Shift) {
        let count = self.read_parameter_value(mmu, &op.params.src) & 0x1F;
        if count == 0 {
            return;
        }
        let mut val = self.read_parameter_value(mmu, &op.params.dst) & w.mask();
        let mut carry = false;
        for _ in 0..count {
            match kind {
                Shift::Shl => {
                    carry = val & w.msb() != 0;
                    val = (val << 1) & w.mask();
                }
                Shift::Shr => {
                    carry = val & 1 != 0;
                    val >>= 1;
                }
                Shift::Sar => {
                    carry = val & 1 != 0;
                    val = (val >> 1) | (val & w.msb());
                }
            }
        }
        self.flags.carry = carry;
        if count == 1 {
            // XOR of the two top bits of the result
            let top = val & w.msb() != 0;
            let below = val & (w.msb() >> 1) != 0;
            self.flags.overflow = top != below;
        }
        self.flags.set_szp(val, w);
        self.write_parameter(mmu, &op.params.dst, val);
    }

    fn op_rotate(&mut self, mmu: &mut MMU, w: Width, op: &Instruction, kind: Rotate) {
        let count = self.read_parameter_value(mmu, &op.params.src) & 0x1F;
        if count == 0 {
            return;
        }
        let mut val = self.read_parameter_value(mmu, &op.params.dst) & w.mask();
        let mut carry = self.flags.carry;
        for _ in 0..count {
            match kind {
                Rotate::Rol => {
                    let msb = val & w.msb() != 0;
                    val = ((val << 1) & w.mask()) | usize::from(msb);
                    carry = msb;
                }
                Rotate::Ror => {
                    let lsb = val & 1 != 0;
                    val = (val >> 1) | if lsb { w.msb() } else { 0 };
                    carry = lsb;
                }
                Rotate::Rcl => {
                    let msb = val & w.msb() != 0;
                    val = ((val << 1) & w.mask()) | usize::from(carry);
                    carry = msb;
                }
                Rotate::Rcr => {
                    let lsb = val & 1 != 0;
                    val = (val >> 1) | if carry { w.msb() } else { 0 };
                    carry = lsb;
                }
            }
        }
        // rotates leave SF, ZF and PF alone
        self.flags.carry = carry;
        if count == 1 {
            let top = val & w.msb() != 0;
            let below = val & (w.msb() >> 1) != 0;
            self.flags.overflow = top != below;
        }
        self.write_parameter(mmu, &op.params.dst, val);
    }

    fn op_div(&mut self, mmu: &mut MMU, out: &mut OutputBuffer, w: Width, op: &Instruction) -> StepResult {
        let divisor = self.read_parameter_value(mmu, &op.params.dst);
        if divisor == 0 {
            out.put_str("Divide by zero!\n");
            return StepResult::Halted;
        }
        match w {
            Width::Byte => {
                let dividend = usize::from(self.r16[AX].val);
                let quotient = dividend / divisor;
                if quotient > 0xFF {
                    out.put_str("Divide overflow!\n");
                    return StepResult::Halted;
                }
                self.r16[AX].set_lo(quotient as u8);
                self.r16[AX].set_hi((dividend % divisor) as u8);
            }
            Width::Word => {
                let dividend = usize::from(self.r16[DX].val) << 16 | usize::from(self.r16[AX].val);
                let quotient = dividend / divisor;
                if quotient > 0xFFFF {
                    out.put_str("Divide overflow!\n");
                    return StepResult::Halted;
                }
                self.r16[AX].val = quotient as u16;
                self.r16[DX].val = (dividend % divisor) as u16;
            }
        }
        StepResult::Continue
    }

    fn op_idiv(&mut self, mmu: &mut MMU, out: &mut OutputBuffer, w: Width, op: &Instruction) -> StepResult {
        let raw = self.read_parameter_value(mmu, &op.params.dst);
        match w {
            Width::Byte => {
                let divisor = i32::from(raw as u8 as i8);
                if divisor == 0 {
                    out.put_str("Divide by zero!\n");
                    return StepResult::Halted;
                }
                let dividend = i32::from(self.r16[AX].val as i16);
                let quotient = dividend / divisor;
                if quotient < -0x80 || quotient > 0x7F {
                    out.put_str("Divide overflow!\n");
                    return StepResult::Halted;
                }
                self.r16[AX].set_lo(quotient as u8);
                self.r16[AX].set_hi((dividend % divisor) as u8);
            }
            Width::Word => {
                let divisor = i32::from(raw as u16 as i16);
                if divisor == 0 {
                    out.put_str("Divide by zero!\n");
                    return StepResult::Halted;
                }
                let dividend = (i32::from(self.r16[DX].val as i16) << 16)
                    | i32::from(self.r16[AX].val);
                let quotient = dividend / divisor;
                if quotient < -0x8000 || quotient > 0x7FFF {
                    out.put_str("Divide overflow!\n");
                    return StepResult::Halted;
                }
                self.r16[AX].val = quotient as u16;
                self.r16[DX].val = (dividend % divisor) as u16;
            }
        }
        StepResult::Continue
    }

    // ---- BCD adjusts

    // used by aaa, aas
    fn adjb(&mut self, al_adj: i16, ah_adj: i16) {
        if (self.r16[AX].lo_u8() & 0x0F) > 9 || self.flags.adjust {
            let al = self.r16[AX].lo_u8();
            let ah = self.r16[AX].hi_u8();
            self.r16[AX].set_lo(al.wrapping_add(al_adj as u8));
            self.r16[AX].set_hi(ah.wrapping_add(ah_adj as u8));
            self.flags.adjust = true;
            self.flags.carry = true;
        } else {
            self.flags.adjust = false;
            self.flags.carry = false;
        }
        let al = self.r16[AX].lo_u8();
        self.r16[AX].set_lo(al & 0x0F);
    }

    // used by daa, das
    fn adj4(&mut self, low_adj: i16, high_adj: i16) {
        let old_al = self.r16[AX].lo_u8();
        let old_cf = self.flags.carry;
        self.flags.carry = false;

        if (old_al & 0x0F) > 9 || self.flags.adjust {
            let tmp = i16::from(old_al) + low_adj;
            self.r16[AX].set_lo(tmp as u8);
            self.flags.carry = old_cf || tmp & 0x100 != 0;
            self.flags.adjust = true;
        } else {
            self.flags.adjust = false;
        }

        if old_al > 0x99 || old_cf {
            let al = self.r16[AX].lo_u8();
            self.r16[AX].set_lo(al.wrapping_add(high_adj as u8));
            self.flags.carry = true;
        }
        let al = self.r16[AX].lo_u8();
        self.flags.set_szp(usize::from(al), Width::Byte);
    }

    // ---- string engine. one element per call; SI/DI step by the
    // element size, backwards when DF is set.

    fn op_movs(&mut self, mmu: &mut MMU, w: Width, op: &Instruction) {
        let src_seg = self.segment(op.segment);
        let es = self.sreg16[ES];
        let si = self.r16[SI].val;
        let di = self.r16[DI].val;
        match w {
            Width::Byte => {
                let b = mmu.read_u8(src_seg, si);
                mmu.write_u8(es, di, b);
            }
            Width::Word => {
                let b = mmu.read_u16(src_seg, si);
                mmu.write_u16(es, di, b);
            }
        }
        self.advance_si(w);
        self.advance_di(w);
    }

    fn op_lods(&mut self, mmu: &MMU, w: Width, op: &Instruction) {
        let src_seg = self.segment(op.segment);
        let si = self.r16[SI].val;
        match w {
            Width::Byte => {
                let b = mmu.read_u8(src_seg, si);
                self.r16[AX].set_lo(b);
            }
            Width::Word => {
                self.r16[AX].val = mmu.read_u16(src_seg, si);
            }
        }
        self.advance_si(w);
    }

    fn op_stos(&mut self, mmu: &mut MMU, w: Width) {
        let es = self.sreg16[ES];
        let di = self.r16[DI].val;
        match w {
            Width::Byte => mmu.write_u8(es, di, self.r16[AX].lo_u8()),
            Width::Word => mmu.write_u16(es, di, self.r16[AX].val),
        }
        self.advance_di(w);
    }

    fn op_scas(&mut self, mmu: &MMU, w: Width) {
        let es = self.sreg16[ES];
        let di = self.r16[DI].val;
        let (acc, mem) = match w {
            Width::Byte => (
                usize::from(self.r16[AX].lo_u8()),
                usize::from(mmu.read_u8(es, di)),
            ),
            Width::Word => (
                usize::from(self.r16[AX].val),
                usize::from(mmu.read_u16(es, di)),
            ),
        };
        self.alu_sub(w, acc, mem, 0);
        self.advance_di(w);
    }

    fn op_cmps(&mut self, mmu: &MMU, w: Width, op: &Instruction) {
        let src_seg = self.segment(op.segment);
        let es = self.sreg16[ES];
        let si = self.r16[SI].val;
        let di = self.r16[DI].val;
        let (lhs, rhs) = match w {
            Width::Byte => (
                usize::from(mmu.read_u8(src_seg, si)),
                usize::from(mmu.read_u8(es, di)),
            ),
            Width::Word => (
                usize::from(mmu.read_u16(src_seg, si)),
                usize::from(mmu.read_u16(es, di)),
            ),
        };
        self.alu_sub(w, lhs, rhs, 0);
        self.advance_si(w);
        self.advance_di(w);
    }

    fn advance_si(&mut self, w: Width) {
        let stride = w.bits() as u16 / 8;
        self.r16[SI].val = if self.flags.direction {
            self.r16[SI].val.wrapping_sub(stride)
        } else {
            self.r16[SI].val.wrapping_add(stride)
        };
    }

    fn advance_di(&mut self, w: Width) {
        let stride = w.bits() as u16 / 8;
        self.r16[DI].val = if self.flags.direction {
            self.r16[DI].val.wrapping_sub(stride)
        } else {
            self.r16[DI].val.wrapping_add(stride)
        };
    }

    // ---- interrupts

    fn op_int(&mut self, mmu: &mut MMU, out: &mut OutputBuffer, int: u8) -> StepResult {
        match int {
            0x10 => {
                interrupt::int10::handle(self, out);
                StepResult::Continue
            }
            0x16 => {
                interrupt::int16::handle(self, out);
                StepResult::Continue
            }
            0x21 => interrupt::int21::handle(self, mmu, out),
            _ => {
                self.execute_interrupt(mmu, int);
                StepResult::Continue
            }
        }
    }

    /// vectors through the interrupt table like the hardware would:
    /// push FLAGS, CS, the post-INT IP, clear IF and TF, load CS:IP
    /// from the 4-byte entry at n*4
    pub fn execute_interrupt(&mut self, mmu: &mut MMU, int: u8) {
        let flags = self.flags.u16();
        self.push16(mmu, flags);
        self.flags.interrupt = false;
        self.flags.trap = false;
        let cs = self.sreg16[CS];
        let ip = self.ip;
        self.push16(mmu, cs);
        self.push16(mmu, ip);
        let (seg, offset) = mmu.read_vec(u16::from(int));
        self.sreg16[CS] = seg;
        self.ip = offset;
    }

    // ---- stack

    pub fn push16(&mut self, mmu: &mut MMU, data: u16) {
        self.r16[SP].val = self.r16[SP].val.wrapping_sub(2);
        mmu.write_u16(self.sreg16[SS], self.r16[SP].val, data);
    }

    pub fn pop16(&mut self, mmu: &MMU) -> u16 {
        let data = mmu.read_u16(self.sreg16[SS], self.r16[SP].val);
        self.r16[SP].val = self.r16[SP].val.wrapping_add(2);
        data
    }

    // ---- operand plumbing

    fn branch(&mut self, mmu: &MMU, op: &Instruction, taken: bool) {
        if taken {
            self.ip = self.read_parameter_value(mmu, &op.params.dst) as u16;
        }
    }

    /// resolves the (segment, offset) a far call or jump transfers to
    fn far_pointer(&self, mmu: &MMU, p: &Parameter) -> (u16, u16) {
        match *p {
            Parameter::Ptr16Imm(seg, offset) => (seg, offset),
            _ => {
                // indirect: the pointer is in memory at the operand
                let seg = self.parameter_segment(p);
                let ea = self.read_parameter_address(p);
                (mmu.read_u16(seg, ea.wrapping_add(2)), mmu.read_u16(seg, ea))
            }
        }
    }

    fn read_parameter_value(&self, mmu: &MMU, p: &Parameter) -> usize {
        match *p {
            Parameter::Imm8(imm) => usize::from(imm),
            Parameter::Imm16(imm) => usize::from(imm),
            // sign-extend to the operand width
            Parameter::ImmS8(imm) => usize::from(imm as i16 as u16),
            Parameter::Ptr8(seg, imm) => usize::from(mmu.read_u8(self.segment(seg), imm)),
            Parameter::Ptr16(seg, imm) => usize::from(mmu.read_u16(self.segment(seg), imm)),
            Parameter::Ptr8Amode(seg, rm) => {
                usize::from(mmu.read_u8(self.segment(seg), self.amode16(rm)))
            }
            Parameter::Ptr8AmodeS8(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                usize::from(mmu.read_u8(self.segment(seg), offset))
            }
            Parameter::Ptr8AmodeS16(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                usize::from(mmu.read_u8(self.segment(seg), offset))
            }
            Parameter::Ptr16Amode(seg, rm) => {
                usize::from(mmu.read_u16(self.segment(seg), self.amode16(rm)))
            }
            Parameter::Ptr16AmodeS8(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                usize::from(mmu.read_u16(self.segment(seg), offset))
            }
            Parameter::Ptr16AmodeS16(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                usize::from(mmu.read_u16(self.segment(seg), offset))
            }
            Parameter::Reg8(r) => {
                let lor = r & 3;
                if r & 4 == 0 {
                    usize::from(self.r16[lor].lo_u8())
                } else {
                    usize::from(self.r16[lor].hi_u8())
                }
            }
            Parameter::Reg16(r) => usize::from(self.r16[r].val),
            Parameter::SReg16(r) => usize::from(self.sreg16[r]),
            Parameter::Ptr16Imm(_, offset) => usize::from(offset),
            Parameter::None => 0,
        }
    }

    fn write_parameter(&mut self, mmu: &mut MMU, p: &Parameter, data: usize) {
        match *p {
            Parameter::Reg8(r) => {
                let lor = r & 3;
                if r & 4 == 0 {
                    self.r16[lor].set_lo(data as u8);
                } else {
                    self.r16[lor].set_hi(data as u8);
                }
            }
            Parameter::Reg16(r) => self.r16[r].val = data as u16,
            Parameter::SReg16(r) => self.sreg16[r] = data as u16,
            Parameter::Ptr8(seg, imm) => mmu.write_u8(self.segment(seg), imm, data as u8),
            Parameter::Ptr16(seg, imm) => mmu.write_u16(self.segment(seg), imm, data as u16),
            Parameter::Ptr8Amode(seg, rm) => {
                let offset = self.amode16(rm);
                mmu.write_u8(self.segment(seg), offset, data as u8);
            }
            Parameter::Ptr8AmodeS8(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                mmu.write_u8(self.segment(seg), offset, data as u8);
            }
            Parameter::Ptr8AmodeS16(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                mmu.write_u8(self.segment(seg), offset, data as u8);
            }
            Parameter::Ptr16Amode(seg, rm) => {
                let offset = self.amode16(rm);
                mmu.write_u16(self.segment(seg), offset, data as u16);
            }
            Parameter::Ptr16AmodeS8(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                mmu.write_u16(self.segment(seg), offset, data as u16);
            }
            Parameter::Ptr16AmodeS16(seg, rm, imm) => {
                let offset = self.amode16(rm).wrapping_add(imm as u16);
                mmu.write_u16(self.segment(seg), offset, data as u16);
            }
            _ => {
                warn!(
                    "write_parameter: unhandled destination {:?} at {:04X}:{:04X}",
                    p, self.sreg16[CS], self.ip
                );
            }
        }
    }

    /// the 16-bit effective-address offset of a memory operand,
    /// before segment addition. used by LEA, LDS, LES and the far
    /// indirect transfers.
    fn read_parameter_address(&self, p: &Parameter) -> u16 {
        match *p {
            Parameter::Ptr8(_, imm) | Parameter::Ptr16(_, imm) => imm,
            Parameter::Ptr8Amode(_, rm) | Parameter::Ptr16Amode(_, rm) => self.amode16(rm),
            Parameter::Ptr8AmodeS8(_, rm, imm) | Parameter::Ptr16AmodeS8(_, rm, imm) => {
                self.amode16(rm).wrapping_add(imm as u16)
            }
            Parameter::Ptr8AmodeS16(_, rm, imm) | Parameter::Ptr16AmodeS16(_, rm, imm) => {
                self.amode16(rm).wrapping_add(imm as u16)
            }
            _ => 0,
        }
    }

    /// the resolved segment value of a memory operand
    fn parameter_segment(&self, p: &Parameter) -> u16 {
        match *p {
            Parameter::Ptr8(seg, _)
            | Parameter::Ptr16(seg, _)
            | Parameter::Ptr8Amode(seg, _)
            | Parameter::Ptr16Amode(seg, _)
            | Parameter::Ptr8AmodeS8(seg, _, _)
            | Parameter::Ptr16AmodeS8(seg, _, _)
            | Parameter::Ptr8AmodeS16(seg, _, _)
            | Parameter::Ptr16AmodeS16(seg, _, _) => self.segment(seg),
            _ => self.sreg16[DS],
        }
    }

    fn segment(&self, seg: Segment) -> u16 {
        match seg {
            Segment::Default | Segment::DS => self.sreg16[DS],
            Segment::CS => self.sreg16[CS],
            Segment::ES => self.sreg16[ES],
            Segment::SS => self.sreg16[SS],
        }
    }

    fn amode16(&self, rm: usize) -> u16 {
        match rm {
            0 => self.r16[BX].val.wrapping_add(self.r16[SI].val),
            1 => self.r16[BX].val.wrapping_add(self.r16[DI].val),
            2 => self.r16[BP].val.wrapping_add(self.r16[SI].val),
            3 => self.r16[BP].val.wrapping_add(self.r16[DI].val),
            4 => self.r16[SI].val,
            5 => self.r16[DI].val,
            6 => self.r16[BP].val,
            7 => self.r16[BX].val,
            _ => unreachable!("amode16 rm {}", rm),
        }
    }
}

fn width_of(op: &Op) -> Width {
    match *op {
        Op::Adc8 | Op::Add8 | Op::And8 | Op::Cmp8 | Op::Dec8 | Op::Div8 | Op::Idiv8
        | Op::Imul8 | Op::Inc8 | Op::Mul8 | Op::Neg8 | Op::Not8 | Op::Or8 | Op::Rcl8
        | Op::Rcr8 | Op::Rol8 | Op::Ror8 | Op::Sar8 | Op::Sbb8 | Op::Shl8 | Op::Shr8
        | Op::Sub8 | Op::Test8 | Op::Xchg8 | Op::Xor8 | Op::Mov8 | Op::In8 | Op::Out8 => {
            Width::Byte
        }
        _ => Width::Word,
    }
}

/// index of a Reg16 destination (LDS/LES)
fn reg_index(p: &Parameter) -> usize {
    match *p {
        Parameter::Reg16(r) => r,
        _ => 0,
    }
}

enum LogicOp {
    And,
    Or,
    Xor,
}

enum Shift {
    Shl,
    Shr,
    Sar,
}

enum Rotate {
    Rol,
    Ror,
    Rcl,
    Rcr,
}
