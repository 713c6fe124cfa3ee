use crate::cpu::instruction::{Instruction, ModRegRm, PrefixState};
use crate::cpu::op::Op;
use crate::cpu::parameter::Parameter;
use crate::cpu::register::{AX, CL, DX};
use crate::cpu::segment::Segment;
use crate::memory::MMU;

#[cfg(test)]
#[path = "./decoder_test.rs"]
mod decoder_test;

/// decodes one body opcode at a time. the prefix bytes were already
/// consumed by the interpreter; their accumulated effect arrives in
/// `PrefixState` and is baked into the operands here.
#[derive(Clone, Default)]
pub struct Decoder {
    current_seg: u16,
    current_offset: u16,
}

impl Decoder {
    /// decodes the body opcode at seg:offset into an Instruction
    pub fn get_instruction(
        &mut self,
        mmu: &MMU,
        prefix: &PrefixState,
        seg: u16,
        offset: u16,
    ) -> Instruction {
        self.current_seg = seg;
        self.current_offset = offset;
        let mut op = Instruction::new(Op::Invalid(Vec::new()));
        op.segment = prefix.segment;
        op.repeat = prefix.repeat;
        self.decode(mmu, &mut op);
        op.length = self.current_offset.wrapping_sub(offset) as u8;
        op
    }

    fn decode(&mut self, mmu: &MMU, op: &mut Instruction) {
        let b = self.read_u8(mmu);

        match b {
            0x00 => {
                // add r/m8, r8
                op.command = Op::Add8;
                self.rm8_r8(mmu, op);
            }
            0x01 => {
                // add r/m16, r16
                op.command = Op::Add16;
                self.rm16_r16(mmu, op);
            }
            0x02 => {
                // add r8, r/m8
                op.command = Op::Add8;
                self.r8_rm8(mmu, op);
            }
            0x03 => {
                // add r16, r/m16
                op.command = Op::Add16;
                self.r16_rm16(mmu, op);
            }
            0x04 => {
                // add AL, imm8
                op.command = Op::Add8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x05 => {
                // add AX, imm16
                op.command = Op::Add16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x06 => {
                // push es
                op.command = Op::Push16;
                op.params.dst = Parameter::SReg16(0);
            }
            0x07 => {
                // pop es
                op.command = Op::Pop16;
                op.params.dst = Parameter::SReg16(0);
            }
            0x08 => {
                op.command = Op::Or8;
                self.rm8_r8(mmu, op);
            }
            0x09 => {
                op.command = Op::Or16;
                self.rm16_r16(mmu, op);
            }
            0x0A => {
                op.command = Op::Or8;
                self.r8_rm8(mmu, op);
            }
            0x0B => {
                op.command = Op::Or16;
                self.r16_rm16(mmu, op);
            }
            0x0C => {
                op.command = Op::Or8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x0D => {
                op.command = Op::Or16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x0E => {
                // push cs
                op.command = Op::Push16;
                op.params.dst = Parameter::SReg16(1);
            }
            0x10 => {
                op.command = Op::Adc8;
                self.rm8_r8(mmu, op);
            }
            0x11 => {
                op.command = Op::Adc16;
                self.rm16_r16(mmu, op);
            }
            0x12 => {
                op.command = Op::Adc8;
                self.r8_rm8(mmu, op);
            }
            0x13 => {
                op.command = Op::Adc16;
                self.r16_rm16(mmu, op);
            }
            0x14 => {
                op.command = Op::Adc8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x15 => {
                op.command = Op::Adc16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x16 => {
                // push ss
                op.command = Op::Push16;
                op.params.dst = Parameter::SReg16(2);
            }
            0x17 => {
                // pop ss
                op.command = Op::Pop16;
                op.params.dst = Parameter::SReg16(2);
            }
            0x18 => {
                op.command = Op::Sbb8;
                self.rm8_r8(mmu, op);
            }
            0x19 => {
                op.command = Op::Sbb16;
                self.rm16_r16(mmu, op);
            }
            0x1A => {
                op.command = Op::Sbb8;
                self.r8_rm8(mmu, op);
            }
            0x1B => {
                op.command = Op::Sbb16;
                self.r16_rm16(mmu, op);
            }
            0x1C => {
                op.command = Op::Sbb8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x1D => {
                op.command = Op::Sbb16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x1E => {
                // push ds
                op.command = Op::Push16;
                op.params.dst = Parameter::SReg16(3);
            }
            0x1F => {
                // pop ds
                op.command = Op::Pop16;
                op.params.dst = Parameter::SReg16(3);
            }
            0x20 => {
                op.command = Op::And8;
                self.rm8_r8(mmu, op);
            }
            0x21 => {
                op.command = Op::And16;
                self.rm16_r16(mmu, op);
            }
            0x22 => {
                op.command = Op::And8;
                self.r8_rm8(mmu, op);
            }
            0x23 => {
                op.command = Op::And16;
                self.r16_rm16(mmu, op);
            }
            0x24 => {
                op.command = Op::And8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x25 => {
                op.command = Op::And16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x27 => op.command = Op::Daa,
            0x28 => {
                op.command = Op::Sub8;
                self.rm8_r8(mmu, op);
            }
            0x29 => {
                op.command = Op::Sub16;
                self.rm16_r16(mmu, op);
            }
            0x2A => {
                op.command = Op::Sub8;
                self.r8_rm8(mmu, op);
            }
            0x2B => {
                op.command = Op::Sub16;
                self.r16_rm16(mmu, op);
            }
            0x2C => {
                op.command = Op::Sub8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x2D => {
                op.command = Op::Sub16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x2F => op.command = Op::Das,
            0x30 => {
                op.command = Op::Xor8;
                self.rm8_r8(mmu, op);
            }
            0x31 => {
                op.command = Op::Xor16;
                self.rm16_r16(mmu, op);
            }
            0x32 => {
                op.command = Op::Xor8;
                self.r8_rm8(mmu, op);
            }
            0x33 => {
                op.command = Op::Xor16;
                self.r16_rm16(mmu, op);
            }
            0x34 => {
                op.command = Op::Xor8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x35 => {
                op.command = Op::Xor16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x37 => op.command = Op::Aaa,
            0x38 => {
                op.command = Op::Cmp8;
                self.rm8_r8(mmu, op);
            }
            0x39 => {
                op.command = Op::Cmp16;
                self.rm16_r16(mmu, op);
            }
            0x3A => {
                op.command = Op::Cmp8;
                self.r8_rm8(mmu, op);
            }
            0x3B => {
                op.command = Op::Cmp16;
                self.r16_rm16(mmu, op);
            }
            0x3C => {
                op.command = Op::Cmp8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x3D => {
                op.command = Op::Cmp16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x3F => op.command = Op::Aas,
            0x40..=0x47 => {
                // inc r16
                op.command = Op::Inc16;
                op.params.dst = Parameter::Reg16(usize::from(b & 7));
            }
            0x48..=0x4F => {
                // dec r16
                op.command = Op::Dec16;
                op.params.dst = Parameter::Reg16(usize::from(b & 7));
            }
            0x50..=0x57 => {
                // push r16
                op.command = Op::Push16;
                op.params.dst = Parameter::Reg16(usize::from(b & 7));
            }
            0x58..=0x5F => {
                // pop r16
                op.command = Op::Pop16;
                op.params.dst = Parameter::Reg16(usize::from(b & 7));
            }
            0x60 => op.command = Op::Pusha,
            0x61 => op.command = Op::Popa,
            0x70 => {
                op.command = Op::Jo;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x71 => {
                op.command = Op::Jno;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x72 => {
                op.command = Op::Jc;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x73 => {
                op.command = Op::Jnc;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x74 => {
                op.command = Op::Jz;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x75 => {
                op.command = Op::Jnz;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x76 => {
                op.command = Op::Jna;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x77 => {
                op.command = Op::Ja;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x78 => {
                op.command = Op::Js;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x79 => {
                op.command = Op::Jns;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x7A => {
                op.command = Op::Jpe;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x7B => {
                op.command = Op::Jpo;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x7C => {
                op.command = Op::Jl;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x7D => {
                op.command = Op::Jnl;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x7E => {
                op.command = Op::Jng;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x7F => {
                op.command = Op::Jg;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0x80 | 0x82 => {
                // <group1> r/m8, imm8 (0x82 is an undocumented alias)
                let x = self.read_mod_reg_rm(mmu);
                op.command = group1_op(x.reg, false);
                op.params.dst = self.rm8(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0x81 => {
                // <group1> r/m16, imm16
                let x = self.read_mod_reg_rm(mmu);
                op.command = group1_op(x.reg, true);
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0x83 => {
                // <group1> r/m16, imm8 (sign-extended)
                let x = self.read_mod_reg_rm(mmu);
                op.command = group1_op(x.reg, true);
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::ImmS8(self.read_s8(mmu));
            }
            0x84 => {
                op.command = Op::Test8;
                self.rm8_r8(mmu, op);
            }
            0x85 => {
                op.command = Op::Test16;
                self.rm16_r16(mmu, op);
            }
            0x86 => {
                op.command = Op::Xchg8;
                self.r8_rm8(mmu, op);
            }
            0x87 => {
                op.command = Op::Xchg16;
                self.r16_rm16(mmu, op);
            }
            0x88 => {
                op.command = Op::Mov8;
                self.rm8_r8(mmu, op);
            }
            0x89 => {
                op.command = Op::Mov16;
                self.rm16_r16(mmu, op);
            }
            0x8A => {
                op.command = Op::Mov8;
                self.r8_rm8(mmu, op);
            }
            0x8B => {
                op.command = Op::Mov16;
                self.r16_rm16(mmu, op);
            }
            0x8C => {
                // mov r/m16, sreg
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Mov16;
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::SReg16(usize::from(x.reg & 3));
            }
            0x8D => {
                // lea r16, m
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Lea;
                op.params.dst = Parameter::Reg16(usize::from(x.reg));
                op.params.src = self.rm16(mmu, op.segment, x.rm, x.md);
            }
            0x8E => {
                // mov sreg, r/m16
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Mov16;
                op.params.dst = Parameter::SReg16(usize::from(x.reg & 3));
                op.params.src = self.rm16(mmu, op.segment, x.rm, x.md);
            }
            0x8F => {
                // pop r/m16
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Pop16;
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
            }
            0x90 => op.command = Op::Nop,
            0x91..=0x97 => {
                // xchg AX, r16
                op.command = Op::Xchg16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Reg16(usize::from(b & 7));
            }
            0x98 => op.command = Op::Cbw,
            0x99 => op.command = Op::Cwd,
            0x9A => {
                // call far seg:offset
                op.command = Op::CallFar;
                let offset = self.read_u16(mmu);
                let seg = self.read_u16(mmu);
                op.params.dst = Parameter::Ptr16Imm(seg, offset);
            }
            0x9B => op.command = Op::Wait,
            0x9C => op.command = Op::Pushf,
            0x9D => op.command = Op::Popf,
            0x9E => op.command = Op::Sahf,
            0x9F => op.command = Op::Lahf,
            0xA0 => {
                // mov AL, [moffs16]
                op.command = Op::Mov8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Ptr8(op.segment, self.read_u16(mmu));
            }
            0xA1 => {
                // mov AX, [moffs16]
                op.command = Op::Mov16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Ptr16(op.segment, self.read_u16(mmu));
            }
            0xA2 => {
                // mov [moffs16], AL
                op.command = Op::Mov8;
                op.params.dst = Parameter::Ptr8(op.segment, self.read_u16(mmu));
                op.params.src = Parameter::Reg8(0);
            }
            0xA3 => {
                // mov [moffs16], AX
                op.command = Op::Mov16;
                op.params.dst = Parameter::Ptr16(op.segment, self.read_u16(mmu));
                op.params.src = Parameter::Reg16(AX);
            }
            0xA4 => op.command = Op::Movsb,
            0xA5 => op.command = Op::Movsw,
            0xA6 => op.command = Op::Cmpsb,
            0xA7 => op.command = Op::Cmpsw,
            0xA8 => {
                op.command = Op::Test8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0xA9 => {
                op.command = Op::Test16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0xAA => op.command = Op::Stosb,
            0xAB => op.command = Op::Stosw,
            0xAC => op.command = Op::Lodsb,
            0xAD => op.command = Op::Lodsw,
            0xAE => op.command = Op::Scasb,
            0xAF => op.command = Op::Scasw,
            0xB0..=0xB7 => {
                // mov r8, imm8
                op.command = Op::Mov8;
                op.params.dst = Parameter::Reg8(usize::from(b & 7));
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0xB8..=0xBF => {
                // mov r16, imm16
                op.command = Op::Mov16;
                op.params.dst = Parameter::Reg16(usize::from(b & 7));
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0xC2 => {
                // ret imm16
                op.command = Op::Retn;
                op.params.dst = Parameter::Imm16(self.read_u16(mmu));
            }
            0xC3 => op.command = Op::Retn,
            0xC4 => {
                // les r16, m16:16
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Les;
                op.params.dst = Parameter::Reg16(usize::from(x.reg));
                op.params.src = self.rm16(mmu, op.segment, x.rm, x.md);
            }
            0xC5 => {
                // lds r16, m16:16
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Lds;
                op.params.dst = Parameter::Reg16(usize::from(x.reg));
                op.params.src = self.rm16(mmu, op.segment, x.rm, x.md);
            }
            0xC6 => {
                // mov r/m8, imm8
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Mov8;
                op.params.dst = self.rm8(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0xC7 => {
                // mov r/m16, imm16
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Mov16;
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Imm16(self.read_u16(mmu));
            }
            0xCA => {
                // retf imm16
                op.command = Op::Retf;
                op.params.dst = Parameter::Imm16(self.read_u16(mmu));
            }
            0xCB => op.command = Op::Retf,
            0xCC => {
                // int3
                op.command = Op::Int;
                op.params.dst = Parameter::Imm8(3);
            }
            0xCD => {
                op.command = Op::Int;
                op.params.dst = Parameter::Imm8(self.read_u8(mmu));
            }
            0xCE => op.command = Op::Into,
            0xCF => op.command = Op::Iret,
            0xD0 => {
                // <group2> r/m8, 1
                let x = self.read_mod_reg_rm(mmu);
                op.command = group2_op(x.reg, false);
                op.params.dst = self.rm8(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Imm8(1);
            }
            0xD1 => {
                // <group2> r/m16, 1
                let x = self.read_mod_reg_rm(mmu);
                op.command = group2_op(x.reg, true);
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Imm8(1);
            }
            0xD2 => {
                // <group2> r/m8, CL
                let x = self.read_mod_reg_rm(mmu);
                op.command = group2_op(x.reg, false);
                op.params.dst = self.rm8(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Reg8(CL);
            }
            0xD3 => {
                // <group2> r/m16, CL
                let x = self.read_mod_reg_rm(mmu);
                op.command = group2_op(x.reg, true);
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                op.params.src = Parameter::Reg8(CL);
            }
            0xD4 => {
                op.command = Op::Aam;
                op.params.dst = Parameter::Imm8(self.read_u8(mmu));
            }
            0xD5 => {
                op.command = Op::Aad;
                op.params.dst = Parameter::Imm8(self.read_u8(mmu));
            }
            0xD6 => op.command = Op::Salc,
            0xD7 => op.command = Op::Xlatb,
            0xD8..=0xDF => {
                // coprocessor escape: consume the ModR/M operand
                let x = self.read_mod_reg_rm(mmu);
                op.command = Op::Esc;
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
            }
            0xE0 => {
                op.command = Op::Loopne;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0xE1 => {
                op.command = Op::Loope;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0xE2 => {
                op.command = Op::Loop;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0xE3 => {
                op.command = Op::Jcxz;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0xE4 => {
                // in AL, imm8
                op.command = Op::In8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0xE5 => {
                // in AX, imm8
                op.command = Op::In16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Imm8(self.read_u8(mmu));
            }
            0xE6 => {
                // out imm8, AL
                op.command = Op::Out8;
                op.params.dst = Parameter::Imm8(self.read_u8(mmu));
                op.params.src = Parameter::Reg8(0);
            }
            0xE7 => {
                // out imm8, AX
                op.command = Op::Out16;
                op.params.dst = Parameter::Imm8(self.read_u8(mmu));
                op.params.src = Parameter::Reg16(AX);
            }
            0xE8 => {
                // call near rel16
                op.command = Op::CallNear;
                op.params.dst = Parameter::Imm16(self.read_rel16(mmu));
            }
            0xE9 => {
                // jmp near rel16
                op.command = Op::JmpNear;
                op.params.dst = Parameter::Imm16(self.read_rel16(mmu));
            }
            0xEA => {
                // jmp far seg:offset
                op.command = Op::JmpFar;
                let offset = self.read_u16(mmu);
                let seg = self.read_u16(mmu);
                op.params.dst = Parameter::Ptr16Imm(seg, offset);
            }
            0xEB => {
                // jmp short rel8
                op.command = Op::JmpShort;
                op.params.dst = Parameter::Imm16(self.read_rel8(mmu));
            }
            0xEC => {
                // in AL, DX
                op.command = Op::In8;
                op.params.dst = Parameter::Reg8(0);
                op.params.src = Parameter::Reg16(DX);
            }
            0xED => {
                // in AX, DX
                op.command = Op::In16;
                op.params.dst = Parameter::Reg16(AX);
                op.params.src = Parameter::Reg16(DX);
            }
            0xEE => {
                // out DX, AL
                op.command = Op::Out8;
                op.params.dst = Parameter::Reg16(DX);
                op.params.src = Parameter::Reg8(0);
            }
            0xEF => {
                // out DX, AX
                op.command = Op::Out16;
                op.params.dst = Parameter::Reg16(DX);
                op.params.src = Parameter::Reg16(AX);
            }
            0xF4 => op.command = Op::Hlt,
            0xF5 => op.command = Op::Cmc,
            0xF6 => {
                // <group3> r/m8
                let x = self.read_mod_reg_rm(mmu);
                op.command = group3_op(x.reg, false);
                op.params.dst = self.rm8(mmu, op.segment, x.rm, x.md);
                if let Op::Test8 = op.command {
                    op.params.src = Parameter::Imm8(self.read_u8(mmu));
                }
            }
            0xF7 => {
                // <group3> r/m16
                let x = self.read_mod_reg_rm(mmu);
                op.command = group3_op(x.reg, true);
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                if let Op::Test16 = op.command {
                    op.params.src = Parameter::Imm16(self.read_u16(mmu));
                }
            }
            0xF8 => op.command = Op::Clc,
            0xF9 => op.command = Op::Stc,
            0xFA => op.command = Op::Cli,
            0xFB => op.command = Op::Sti,
            0xFC => op.command = Op::Cld,
            0xFD => op.command = Op::Std,
            0xFE => {
                // <group4> r/m8
                let x = self.read_mod_reg_rm(mmu);
                op.params.dst = self.rm8(mmu, op.segment, x.rm, x.md);
                op.command = match x.reg {
                    0 => Op::Inc8,
                    1 => Op::Dec8,
                    _ => Op::Invalid(vec![b, x.u8()]),
                };
            }
            0xFF => {
                // <group5> r/m16
                let x = self.read_mod_reg_rm(mmu);
                op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
                op.command = match x.reg {
                    0 => Op::Inc16,
                    1 => Op::Dec16,
                    2 => Op::CallNear,
                    3 => Op::CallFar,
                    4 => Op::JmpNear,
                    5 => Op::JmpFar,
                    6 => Op::Push16,
                    _ => Op::Invalid(vec![b, x.u8()]),
                };
            }
            _ => op.command = Op::Invalid(vec![b]),
        }
    }

    /// decodes "r/m8, r8" operands
    fn rm8_r8(&mut self, mmu: &MMU, op: &mut Instruction) {
        let x = self.read_mod_reg_rm(mmu);
        op.params.dst = self.rm8(mmu, op.segment, x.rm, x.md);
        op.params.src = Parameter::Reg8(usize::from(x.reg));
    }

    /// decodes "r8, r/m8" operands
    fn r8_rm8(&mut self, mmu: &MMU, op: &mut Instruction) {
        let x = self.read_mod_reg_rm(mmu);
        op.params.dst = Parameter::Reg8(usize::from(x.reg));
        op.params.src = self.rm8(mmu, op.segment, x.rm, x.md);
    }

    /// decodes "r/m16, r16" operands
    fn rm16_r16(&mut self, mmu: &MMU, op: &mut Instruction) {
        let x = self.read_mod_reg_rm(mmu);
        op.params.dst = self.rm16(mmu, op.segment, x.rm, x.md);
        op.params.src = Parameter::Reg16(usize::from(x.reg));
    }

    /// decodes "r16, r/m16" operands
    fn r16_rm16(&mut self, mmu: &MMU, op: &mut Instruction) {
        let x = self.read_mod_reg_rm(mmu);
        op.params.dst = Parameter::Reg16(usize::from(x.reg));
        op.params.src = self.rm16(mmu, op.segment, x.rm, x.md);
    }

    /// decodes the r/m operand at byte width
    fn rm8(&mut self, mmu: &MMU, seg: Segment, rm: u8, md: u8) -> Parameter {
        match md {
            0 => {
                if rm == 6 {
                    // [imm16] direct address
                    Parameter::Ptr8(seg, self.read_u16(mmu))
                } else {
                    Parameter::Ptr8Amode(amode_segment(seg, rm), usize::from(rm))
                }
            }
            1 => Parameter::Ptr8AmodeS8(bp_amode_segment(seg, rm), usize::from(rm), self.read_s8(mmu)),
            2 => Parameter::Ptr8AmodeS16(bp_amode_segment(seg, rm), usize::from(rm), self.read_u16(mmu) as i16),
            _ => Parameter::Reg8(usize::from(rm)),
        }
    }

    /// decodes the r/m operand at word width
    fn rm16(&mut self, mmu: &MMU, seg: Segment, rm: u8, md: u8) -> Parameter {
        match md {
            0 => {
                if rm == 6 {
                    Parameter::Ptr16(seg, self.read_u16(mmu))
                } else {
                    Parameter::Ptr16Amode(amode_segment(seg, rm), usize::from(rm))
                }
            }
            1 => Parameter::Ptr16AmodeS8(bp_amode_segment(seg, rm), usize::from(rm), self.read_s8(mmu)),
            2 => Parameter::Ptr16AmodeS16(bp_amode_segment(seg, rm), usize::from(rm), self.read_u16(mmu) as i16),
            _ => Parameter::Reg16(usize::from(rm)),
        }
    }

    fn read_mod_reg_rm(&mut self, mmu: &MMU) -> ModRegRm {
        let b = self.read_u8(mmu);
        ModRegRm {
            md: b >> 6,
            reg: (b >> 3) & 7,
            rm: b & 7,
        }
    }

    fn read_u8(&mut self, mmu: &MMU) -> u8 {
        let b = mmu.read_u8(self.current_seg, self.current_offset);
        self.current_offset = self.current_offset.wrapping_add(1);
        b
    }

    fn read_u16(&mut self, mmu: &MMU) -> u16 {
        let lo = self.read_u8(mmu);
        let hi = self.read_u8(mmu);
        u16::from(hi) << 8 | u16::from(lo)
    }

    fn read_s8(&mut self, mmu: &MMU) -> i8 {
        self.read_u8(mmu) as i8
    }

    /// reads a rel8 and returns the absolute branch target
    fn read_rel8(&mut self, mmu: &MMU) -> u16 {
        let val = self.read_u8(mmu) as i8;
        self.current_offset.wrapping_add(val as u16)
    }

    /// reads a rel16 and returns the absolute branch target
    fn read_rel16(&mut self, mmu: &MMU) -> u16 {
        let val = self.read_u16(mmu);
        self.current_offset.wrapping_add(val)
    }
}

/// default segment for a no-displacement amode: SS for the BP-based
/// pairs, DS otherwise. an override always wins.
fn amode_segment(seg: Segment, rm: u8) -> Segment {
    if seg != Segment::Default {
        return seg;
    }
    match rm {
        2 | 3 => Segment::SS,
        _ => Segment::Default,
    }
}

/// default segment for a displacement amode; rm=6 means BP+disp here
fn bp_amode_segment(seg: Segment, rm: u8) -> Segment {
    if seg != Segment::Default {
        return seg;
    }
    match rm {
        2 | 3 | 6 => Segment::SS,
        _ => Segment::Default,
    }
}

fn group1_op(reg: u8, word: bool) -> Op {
    match (reg, word) {
        (0, false) => Op::Add8,
        (0, true) => Op::Add16,
        (1, false) => Op::Or8,
        (1, true) => Op::Or16,
        (2, false) => Op::Adc8,
        (2, true) => Op::Adc16,
        (3, false) => Op::Sbb8,
        (3, true) => Op::Sbb16,
        (4, false) => Op::And8,
        (4, true) => Op::And16,
        (5, false) => Op::Sub8,
        (5, true) => Op::Sub16,
        (6, false) => Op::Xor8,
        (6, true) => Op::Xor16,
        (_, false) => Op::Cmp8,
        (_, true) => Op::Cmp16,
    }
}

fn group2_op(reg: u8, word: bool) -> Op {
    match (reg, word) {
        (0, false) => Op::Rol8,
        (0, true) => Op::Rol16,
        (1, false) => Op::Ror8,
        (1, true) => Op::Ror16,
        (2, false) => Op::Rcl8,
        (2, true) => Op::Rcl16,
        (3, false) => Op::Rcr8,
        (3, true) => Op::Rcr16,
        // reg=6 is the undocumented SHL alias
        (4, false) | (6, false) => Op::Shl8,
        (4, true) | (6, true) => Op::Shl16,
        (5, false) => Op::Shr8,
        (5, true) => Op::Shr16,
        (_, false) => Op::Sar8,
        (_, true) => Op::Sar16,
    }
}

fn group3_op(reg: u8, word: bool) -> Op {
    match (reg, word) {
        // reg=1 is an undocumented TEST alias
        (0, false) | (1, false) => Op::Test8,
        (0, true) | (1, true) => Op::Test16,
        (2, false) => Op::Not8,
        (2, true) => Op::Not16,
        (3, false) => Op::Neg8,
        (3, true) => Op::Neg16,
        (4, false) => Op::Mul8,
        (4, true) => Op::Mul16,
        (5, false) => Op::Imul8,
        (5, true) => Op::Imul16,
        (6, false) => Op::Div8,
        (6, true) => Op::Div16,
        (_, false) => Op::Idiv8,
        (_, true) => Op::Idiv16,
    }
}
