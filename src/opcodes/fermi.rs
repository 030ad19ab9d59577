use super::{ArchOp, Op, Opcode, OpcodeMap};

pub mod op {
    /// Unique instruction opcodes for Fermi.
    #[derive(strum::AsRefStr, Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
    pub enum Op {
        BRA,
        JMP,
        CAL,
        RET,
        SSY,
        BRK,
        PBK,
        EXIT,
        BAR,
        NOP,
        MOV,
        MOV32I,
        S2R,
        FADD,
        FMUL,
        FFMA,
        FSETP,
        MUFU,
        DADD,
        DFMA,
        DMUL,
        IADD,
        IMUL,
        IMAD,
        ISETP,
        ISCADD,
        SHL,
        SHR,
        LOP,
        SEL,
        I2F,
        F2I,
        LD,
        LDG,
        LDC,
        ST,
        STG,
        ATOM,
        RED,
        LDS,
        STS,
        ATOMS,
    }
}

pub static OPCODES: OpcodeMap = phf::phf_map! {
    "BRA" => Opcode { op: Op::Fermi(op::Op::BRA), category: ArchOp::BRANCH_OP },
    "JMP" => Opcode { op: Op::Fermi(op::Op::JMP), category: ArchOp::BRANCH_OP },
    "CAL" => Opcode { op: Op::Fermi(op::Op::CAL), category: ArchOp::BRANCH_OP },
    "RET" => Opcode { op: Op::Fermi(op::Op::RET), category: ArchOp::BRANCH_OP },
    "SSY" => Opcode { op: Op::Fermi(op::Op::SSY), category: ArchOp::BRANCH_OP },
    "BRK" => Opcode { op: Op::Fermi(op::Op::BRK), category: ArchOp::BRANCH_OP },
    "PBK" => Opcode { op: Op::Fermi(op::Op::PBK), category: ArchOp::BRANCH_OP },
    "EXIT" => Opcode { op: Op::Fermi(op::Op::EXIT), category: ArchOp::EXIT_OP },
    "BAR" => Opcode { op: Op::Fermi(op::Op::BAR), category: ArchOp::BARRIER_OP },
    "NOP" => Opcode { op: Op::Fermi(op::Op::NOP), category: ArchOp::ALU_OP },
    "MOV" => Opcode { op: Op::Fermi(op::Op::MOV), category: ArchOp::ALU_OP },
    "MOV32I" => Opcode { op: Op::Fermi(op::Op::MOV32I), category: ArchOp::ALU_OP },
    "S2R" => Opcode { op: Op::Fermi(op::Op::S2R), category: ArchOp::ALU_OP },
    "FADD" => Opcode { op: Op::Fermi(op::Op::FADD), category: ArchOp::ALU_OP },
    "FMUL" => Opcode { op: Op::Fermi(op::Op::FMUL), category: ArchOp::ALU_OP },
    "FFMA" => Opcode { op: Op::Fermi(op::Op::FFMA), category: ArchOp::ALU_OP },
    "FSETP" => Opcode { op: Op::Fermi(op::Op::FSETP), category: ArchOp::ALU_OP },
    "MUFU" => Opcode { op: Op::Fermi(op::Op::MUFU), category: ArchOp::ALU_OP },
    "DADD" => Opcode { op: Op::Fermi(op::Op::DADD), category: ArchOp::ALU_OP },
    "DFMA" => Opcode { op: Op::Fermi(op::Op::DFMA), category: ArchOp::ALU_OP },
    "DMUL" => Opcode { op: Op::Fermi(op::Op::DMUL), category: ArchOp::ALU_OP },
    "IADD" => Opcode { op: Op::Fermi(op::Op::IADD), category: ArchOp::ALU_OP },
    "IMUL" => Opcode { op: Op::Fermi(op::Op::IMUL), category: ArchOp::ALU_OP },
    "IMAD" => Opcode { op: Op::Fermi(op::Op::IMAD), category: ArchOp::ALU_OP },
    "ISETP" => Opcode { op: Op::Fermi(op::Op::ISETP), category: ArchOp::ALU_OP },
    "ISCADD" => Opcode { op: Op::Fermi(op::Op::ISCADD), category: ArchOp::ALU_OP },
    "SHL" => Opcode { op: Op::Fermi(op::Op::SHL), category: ArchOp::ALU_OP },
    "SHR" => Opcode { op: Op::Fermi(op::Op::SHR), category: ArchOp::ALU_OP },
    "LOP" => Opcode { op: Op::Fermi(op::Op::LOP), category: ArchOp::ALU_OP },
    "SEL" => Opcode { op: Op::Fermi(op::Op::SEL), category: ArchOp::ALU_OP },
    "I2F" => Opcode { op: Op::Fermi(op::Op::I2F), category: ArchOp::ALU_OP },
    "F2I" => Opcode { op: Op::Fermi(op::Op::F2I), category: ArchOp::ALU_OP },
    "LD" => Opcode { op: Op::Fermi(op::Op::LD), category: ArchOp::LOAD_OP },
    "LDG" => Opcode { op: Op::Fermi(op::Op::LDG), category: ArchOp::LOAD_OP },
    "LDC" => Opcode { op: Op::Fermi(op::Op::LDC), category: ArchOp::ALU_OP },
    "ST" => Opcode { op: Op::Fermi(op::Op::ST), category: ArchOp::STORE_OP },
    "STG" => Opcode { op: Op::Fermi(op::Op::STG), category: ArchOp::STORE_OP },
    "ATOM" => Opcode { op: Op::Fermi(op::Op::ATOM), category: ArchOp::ATOMIC_OP },
    "RED" => Opcode { op: Op::Fermi(op::Op::RED), category: ArchOp::ATOMIC_OP },
    "LDS" => Opcode { op: Op::Fermi(op::Op::LDS), category: ArchOp::LDS_LOAD_OP },
    "STS" => Opcode { op: Op::Fermi(op::Op::STS), category: ArchOp::LDS_STORE_OP },
    "ATOMS" => Opcode { op: Op::Fermi(op::Op::ATOMS), category: ArchOp::LDS_ATOMIC_OP },
};
