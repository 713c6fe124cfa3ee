use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// ASCII Adjust AX Before Division
    Aad,

    /// ASCII Adjust AX After Multiply
    Aam,

    /// ASCII Adjust After Addition
    Aaa,

    /// ASCII Adjust AL After Subtraction
    Aas,

    Adc8,
    Adc16,
    Add8,
    Add16,
    And8,
    And16,
    CallFar,
    CallNear,

    /// Convert Byte to Word
    Cbw,

    /// Clear Carry Flag
    Clc,

    /// Clear Direction Flag
    Cld,

    /// Clear Interrupt Flag
    Cli,

    /// Complement Carry Flag
    Cmc,

    Cmp8,
    Cmp16,
    Cmpsb,
    Cmpsw,

    /// Convert Word to Doubleword
    Cwd,

    /// Decimal Adjust AL after Addition
    Daa,

    /// Decimal Adjust AL after Subtraction
    Das,

    Dec8,
    Dec16,
    Div8,
    Div16,

    /// coprocessor escape; the operand is consumed and discarded
    Esc,

    Hlt,
    Idiv8,
    Idiv16,
    Imul8,
    Imul16,
    In8,
    In16,
    Inc8,
    Inc16,
    Int,
    Into,
    Iret,
    Ja,
    Jc,
    Jcxz,
    Jg,
    Jl,
    JmpFar,
    JmpNear,
    JmpShort,
    Jna,
    Jnc,
    Jng,
    Jnl,
    Jno,
    Jns,
    Jnz,
    Jo,
    Jpe,
    Jpo,
    Js,
    Jz,
    Lahf,
    Lds,
    Lea,
    Les,
    Lodsb,
    Lodsw,
    Loop,
    Loope,
    Loopne,
    Mov8,
    Mov16,
    Movsb,
    Movsw,
    Mul8,
    Mul16,
    Neg8,
    Neg16,
    Nop,
    Not8,
    Not16,
    Or8,
    Or16,
    Out8,
    Out16,
    Pop16,
    Popa,
    Popf,
    Push16,
    Pusha,
    Pushf,
    Rcl8,
    Rcl16,
    Rcr8,
    Rcr16,
    Retf,
    Retn,
    Rol8,
    Rol16,
    Ror8,
    Ror16,
    Sahf,

    /// undocumented: AL = CF ? 0xFF : 0x00
    Salc,

    Sar8,
    Sar16,
    Sbb8,
    Sbb16,
    Scasb,
    Scasw,
    Shl8,
    Shl16,
    Shr8,
    Shr16,
    Stc,
    Std,
    Sti,
    Stosb,
    Stosw,
    Sub8,
    Sub16,
    Test8,
    Test16,
    Wait,
    Xchg8,
    Xchg16,
    Xlatb,
    Xor8,
    Xor16,

    /// a byte sequence the decoder cannot execute
    Invalid(Vec<u8>),
}

impl Op {
    /// true for the string primitives that honor a REP prefix
    pub fn is_string(&self) -> bool {
        match *self {
            Op::Cmpsb | Op::Cmpsw
            | Op::Lodsb | Op::Lodsw
            | Op::Movsb | Op::Movsw
            | Op::Scasb | Op::Scasw
            | Op::Stosb | Op::Stosw => true,
            _ => false,
        }
    }

    fn mnemonic(&self) -> &str {
        match *self {
            Op::Aad => "aad",
            Op::Aam => "aam",
            Op::Aaa => "aaa",
            Op::Aas => "aas",
            Op::Adc8 | Op::Adc16 => "adc",
            Op::Add8 | Op::Add16 => "add",
            Op::And8 | Op::And16 => "and",
            Op::CallFar | Op::CallNear => "call",
            Op::Cbw => "cbw",
            Op::Clc => "clc",
            Op::Cld => "cld",
            Op::Cli => "cli",
            Op::Cmc => "cmc",
            Op::Cmp8 | Op::Cmp16 => "cmp",
            Op::Cmpsb => "cmpsb",
            Op::Cmpsw => "cmpsw",
            Op::Cwd => "cwd",
            Op::Daa => "daa",
            Op::Das => "das",
            Op::Dec8 | Op::Dec16 => "dec",
            Op::Div8 | Op::Div16 => "div",
            Op::Esc => "esc",
            Op::Hlt => "hlt",
            Op::Idiv8 | Op::Idiv16 => "idiv",
            Op::Imul8 | Op::Imul16 => "imul",
            Op::In8 | Op::In16 => "in",
            Op::Inc8 | Op::Inc16 => "inc",
            Op::Int => "int",
            Op::Into => "into",
            Op::Iret => "iret",
            Op::Ja => "ja",
            Op::Jc => "jc",
            Op::Jcxz => "jcxz",
            Op::Jg => "jg",
            Op::Jl => "jl",
            Op::JmpFar | Op::JmpNear | Op::JmpShort => "jmp",
            Op::Jna => "jna",
            Op::Jnc => "jnc",
            Op::Jng => "jng",
            Op::Jnl => "jnl",
            Op::Jno => "jno",
            Op::Jns => "jns",
            Op::Jnz => "jnz",
            Op::Jo => "jo",
            Op::Jpe => "jpe",
            Op::Jpo => "jpo",
            Op::Js => "js",
            Op::Jz => "jz",
            Op::Lahf => "lahf",
            Op::Lds => "lds",
            Op::Lea => "lea",
            Op::Les => "les",
            Op::Lodsb => "lodsb",
            Op::Lodsw => "lodsw",
            Op::Loop => "loop",
            Op::Loope => "loope",
            Op::Loopne => "loopne",
            Op::Mov8 | Op::Mov16 => "mov",
            Op::Movsb => "movsb",
            Op::Movsw => "movsw",
            Op::Mul8 | Op::Mul16 => "mul",
            Op::Neg8 | Op::Neg16 => "neg",
            Op::Nop => "nop",
            Op::Not8 | Op::Not16 => "not",
            Op::Or8 | Op::Or16 => "or",
            Op::Out8 | Op::Out16 => "out",
            Op::Pop16 => "pop",
            Op::Popa => "popa",
            Op::Popf => "popf",
            Op::Push16 => "push",
            Op::Pusha => "pusha",
            Op::Pushf => "pushf",
            Op::Rcl8 | Op::Rcl16 => "rcl",
            Op::Rcr8 | Op::Rcr16 => "rcr",
            Op::Retf => "retf",
            Op::Retn => "ret",
            Op::Rol8 | Op::Rol16 => "rol",
            Op::Ror8 | Op::Ror16 => "ror",
            Op::Sahf => "sahf",
            Op::Salc => "salc",
            Op::Sar8 | Op::Sar16 => "sar",
            Op::Sbb8 | Op::Sbb16 => "sbb",
            Op::Scasb => "scasb",
            Op::Scasw => "scasw",
            Op::Shl8 | Op::Shl16 => "shl",
            Op::Shr8 | Op::Shr16 => "shr",
            Op::Stc => "stc",
            Op::Std => "std",
            Op::Sti => "sti",
            Op::Stosb => "stosb",
            Op::Stosw => "stosw",
            Op::Sub8 | Op::Sub16 => "sub",
            Op::Test8 | Op::Test16 => "test",
            Op::Wait => "wait",
            Op::Xchg8 | Op::Xchg16 => "xchg",
            Op::Xlatb => "xlatb",
            Op::Xor8 | Op::Xor16 => "xor",
            Op::Invalid(_) => "(invalid)",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.mnemonic())
    }
}
