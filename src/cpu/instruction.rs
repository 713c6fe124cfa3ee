use std::fmt;

use crate::cpu::op::Op;
use crate::cpu::parameter::{Parameter, ParameterSet};
use crate::cpu::segment::Segment;

/// one decoded body instruction. prefixes are not part of the encoding
/// here; they are accumulated in `PrefixState` by the interpreter and
/// handed to the decoder, which bakes their effect into the operands.
#[derive(Debug, PartialEq)]
pub struct Instruction {
    pub command: Op,
    pub params: ParameterSet,

    /// the segment override in force, or `Segment::Default`. consulted
    /// by the string primitives and XLAT for their DS-relative operand.
    pub segment: Segment,

    /// the repeat prefix armed for this instruction
    pub repeat: RepeatMode,

    /// body length in bytes (the prefix bytes were consumed in
    /// earlier steps and are not included)
    pub length: u8,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Instruction::new2(op, Parameter::None, Parameter::None)
    }

    pub fn new1(op: Op, dst: Parameter) -> Self {
        Instruction::new2(op, dst, Parameter::None)
    }

    pub fn new2(op: Op, dst: Parameter, src: Parameter) -> Self {
        Instruction {
            command: op,
            params: ParameterSet { dst, src },
            segment: Segment::Default,
            repeat: RepeatMode::None,
            length: 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let prefix = self.repeat.as_str();
        let sep = if prefix.is_empty() { "" } else { " " };
        match self.params.count() {
            0 => write!(f, "{}{}{}", prefix, sep, self.command),
            1 => write!(f, "{}{}{} {}", prefix, sep, self.command, self.params.dst),
            _ => write!(
                f,
                "{}{}{} {}, {}",
                prefix, sep, self.command, self.params.dst, self.params.src
            ),
        }
    }
}

/// repeat prefix kinds. 0xF3 doubles as REP and REPE; the string
/// primitive decides which reading applies.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RepeatMode {
    None,
    Rep,
    Repne,
}

impl RepeatMode {
    pub fn as_str(&self) -> &str {
        match *self {
            RepeatMode::None => "",
            RepeatMode::Rep => "rep",
            RepeatMode::Repne => "repne",
        }
    }
}

impl Default for RepeatMode {
    fn default() -> Self {
        RepeatMode::None
    }
}

/// prefix bytes accumulated ahead of the next body opcode. lives as an
/// explicit field of the interpreter because a prefix byte and its body
/// are consumed by separate `step()` calls. segment override and repeat
/// have independent clearing rules (§ the repeat re-execution protocol).
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PrefixState {
    pub segment: Segment,
    pub repeat: RepeatMode,
    pub lock: bool,
}

impl PrefixState {
    pub fn clear(&mut self) {
        *self = PrefixState::default();
    }
}

#[derive(Debug)]
pub struct ModRegRm {
    /// "mod" is the proper field name, but it is a reserved keyword
    pub md: u8,
    pub reg: u8,
    pub rm: u8,
}

impl ModRegRm {
    pub fn u8(&self) -> u8 {
        (self.md << 6) | (self.reg << 3) | self.rm
    }
}
