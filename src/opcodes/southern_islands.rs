use super::{ArchOp, Op, Opcode, OpcodeMap};

pub mod op {
    /// Unique instruction opcodes for Southern Islands.
    #[derive(strum::AsRefStr, Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
    pub enum Op {
        S_BRANCH,
        S_CBRANCH_SCC0,
        S_CBRANCH_SCC1,
        S_CBRANCH_VCCZ,
        S_CBRANCH_VCCNZ,
        S_CBRANCH_EXECZ,
        S_CBRANCH_EXECNZ,
        S_ENDPGM,
        S_BARRIER,
        S_WAITCNT,
        S_NOP,
        S_MOV_B32,
        S_MOV_B64,
        S_MOVK_I32,
        S_ADD_U32,
        S_ADD_I32,
        S_SUB_I32,
        S_MUL_I32,
        S_AND_B32,
        S_AND_B64,
        S_OR_B64,
        S_LSHL_B32,
        S_LSHR_B32,
        S_CMP_EQ_I32,
        S_CMP_LT_I32,
        S_AND_SAVEEXEC_B64,
        S_LOAD_DWORD,
        S_LOAD_DWORDX2,
        S_LOAD_DWORDX4,
        S_BUFFER_LOAD_DWORD,
        S_BUFFER_LOAD_DWORDX2,
        S_BUFFER_LOAD_DWORDX4,
        V_MOV_B32,
        V_ADD_I32,
        V_SUB_I32,
        V_ADD_F32,
        V_SUB_F32,
        V_MUL_F32,
        V_MUL_LO_U32,
        V_MAD_F32,
        V_FMA_F32,
        V_MAC_F32,
        V_CVT_F32_I32,
        V_CVT_I32_F32,
        V_LSHLREV_B32,
        V_LSHRREV_B32,
        V_AND_B32,
        V_OR_B32,
        V_CMP_GT_I32,
        V_CMP_LT_F32,
        V_CNDMASK_B32,
        V_READFIRSTLANE_B32,
        V_RCP_F32,
        V_SQRT_F32,
        TBUFFER_LOAD_FORMAT_X,
        TBUFFER_LOAD_FORMAT_XY,
        TBUFFER_LOAD_FORMAT_XYZW,
        TBUFFER_STORE_FORMAT_X,
        TBUFFER_STORE_FORMAT_XY,
        TBUFFER_STORE_FORMAT_XYZW,
        BUFFER_LOAD_DWORD,
        BUFFER_STORE_DWORD,
        BUFFER_ATOMIC_ADD,
        DS_READ_B32,
        DS_READ2_B32,
        DS_WRITE_B32,
        DS_WRITE2_B32,
        DS_ADD_U32,
        EXP,
    }
}

pub static OPCODES: OpcodeMap = phf::phf_map! {
    "s_branch" => Opcode { op: Op::SouthernIslands(op::Op::S_BRANCH), category: ArchOp::BRANCH_OP },
    "s_cbranch_scc0" => Opcode { op: Op::SouthernIslands(op::Op::S_CBRANCH_SCC0), category: ArchOp::BRANCH_OP },
    "s_cbranch_scc1" => Opcode { op: Op::SouthernIslands(op::Op::S_CBRANCH_SCC1), category: ArchOp::BRANCH_OP },
    "s_cbranch_vccz" => Opcode { op: Op::SouthernIslands(op::Op::S_CBRANCH_VCCZ), category: ArchOp::BRANCH_OP },
    "s_cbranch_vccnz" => Opcode { op: Op::SouthernIslands(op::Op::S_CBRANCH_VCCNZ), category: ArchOp::BRANCH_OP },
    "s_cbranch_execz" => Opcode { op: Op::SouthernIslands(op::Op::S_CBRANCH_EXECZ), category: ArchOp::BRANCH_OP },
    "s_cbranch_execnz" => Opcode { op: Op::SouthernIslands(op::Op::S_CBRANCH_EXECNZ), category: ArchOp::BRANCH_OP },
    "s_endpgm" => Opcode { op: Op::SouthernIslands(op::Op::S_ENDPGM), category: ArchOp::EXIT_OP },
    "s_barrier" => Opcode { op: Op::SouthernIslands(op::Op::S_BARRIER), category: ArchOp::BARRIER_OP },
    "s_waitcnt" => Opcode { op: Op::SouthernIslands(op::Op::S_WAITCNT), category: ArchOp::WAITCNT_OP },
    "s_nop" => Opcode { op: Op::SouthernIslands(op::Op::S_NOP), category: ArchOp::SCALAR_ALU_OP },
    "s_mov_b32" => Opcode { op: Op::SouthernIslands(op::Op::S_MOV_B32), category: ArchOp::SCALAR_ALU_OP },
    "s_mov_b64" => Opcode { op: Op::SouthernIslands(op::Op::S_MOV_B64), category: ArchOp::SCALAR_ALU_OP },
    "s_movk_i32" => Opcode { op: Op::SouthernIslands(op::Op::S_MOVK_I32), category: ArchOp::SCALAR_ALU_OP },
    "s_add_u32" => Opcode { op: Op::SouthernIslands(op::Op::S_ADD_U32), category: ArchOp::SCALAR_ALU_OP },
    "s_add_i32" => Opcode { op: Op::SouthernIslands(op::Op::S_ADD_I32), category: ArchOp::SCALAR_ALU_OP },
    "s_sub_i32" => Opcode { op: Op::SouthernIslands(op::Op::S_SUB_I32), category: ArchOp::SCALAR_ALU_OP },
    "s_mul_i32" => Opcode { op: Op::SouthernIslands(op::Op::S_MUL_I32), category: ArchOp::SCALAR_ALU_OP },
    "s_and_b32" => Opcode { op: Op::SouthernIslands(op::Op::S_AND_B32), category: ArchOp::SCALAR_ALU_OP },
    "s_and_b64" => Opcode { op: Op::SouthernIslands(op::Op::S_AND_B64), category: ArchOp::SCALAR_ALU_OP },
    "s_or_b64" => Opcode { op: Op::SouthernIslands(op::Op::S_OR_B64), category: ArchOp::SCALAR_ALU_OP },
    "s_lshl_b32" => Opcode { op: Op::SouthernIslands(op::Op::S_LSHL_B32), category: ArchOp::SCALAR_ALU_OP },
    "s_lshr_b32" => Opcode { op: Op::SouthernIslands(op::Op::S_LSHR_B32), category: ArchOp::SCALAR_ALU_OP },
    "s_cmp_eq_i32" => Opcode { op: Op::SouthernIslands(op::Op::S_CMP_EQ_I32), category: ArchOp::SCALAR_ALU_OP },
    "s_cmp_lt_i32" => Opcode { op: Op::SouthernIslands(op::Op::S_CMP_LT_I32), category: ArchOp::SCALAR_ALU_OP },
    "s_and_saveexec_b64" => Opcode { op: Op::SouthernIslands(op::Op::S_AND_SAVEEXEC_B64), category: ArchOp::SCALAR_ALU_OP },
    "s_load_dword" => Opcode { op: Op::SouthernIslands(op::Op::S_LOAD_DWORD), category: ArchOp::SCALAR_LOAD_OP },
    "s_load_dwordx2" => Opcode { op: Op::SouthernIslands(op::Op::S_LOAD_DWORDX2), category: ArchOp::SCALAR_LOAD_OP },
    "s_load_dwordx4" => Opcode { op: Op::SouthernIslands(op::Op::S_LOAD_DWORDX4), category: ArchOp::SCALAR_LOAD_OP },
    "s_buffer_load_dword" => Opcode { op: Op::SouthernIslands(op::Op::S_BUFFER_LOAD_DWORD), category: ArchOp::SCALAR_LOAD_OP },
    "s_buffer_load_dwordx2" => Opcode { op: Op::SouthernIslands(op::Op::S_BUFFER_LOAD_DWORDX2), category: ArchOp::SCALAR_LOAD_OP },
    "s_buffer_load_dwordx4" => Opcode { op: Op::SouthernIslands(op::Op::S_BUFFER_LOAD_DWORDX4), category: ArchOp::SCALAR_LOAD_OP },
    "v_mov_b32" => Opcode { op: Op::SouthernIslands(op::Op::V_MOV_B32), category: ArchOp::ALU_OP },
    "v_add_i32" => Opcode { op: Op::SouthernIslands(op::Op::V_ADD_I32), category: ArchOp::ALU_OP },
    "v_sub_i32" => Opcode { op: Op::SouthernIslands(op::Op::V_SUB_I32), category: ArchOp::ALU_OP },
    "v_add_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_ADD_F32), category: ArchOp::ALU_OP },
    "v_sub_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_SUB_F32), category: ArchOp::ALU_OP },
    "v_mul_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_MUL_F32), category: ArchOp::ALU_OP },
    "v_mul_lo_u32" => Opcode { op: Op::SouthernIslands(op::Op::V_MUL_LO_U32), category: ArchOp::ALU_OP },
    "v_mad_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_MAD_F32), category: ArchOp::ALU_OP },
    "v_fma_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_FMA_F32), category: ArchOp::ALU_OP },
    "v_mac_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_MAC_F32), category: ArchOp::ALU_OP },
    "v_cvt_f32_i32" => Opcode { op: Op::SouthernIslands(op::Op::V_CVT_F32_I32), category: ArchOp::ALU_OP },
    "v_cvt_i32_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_CVT_I32_F32), category: ArchOp::ALU_OP },
    "v_lshlrev_b32" => Opcode { op: Op::SouthernIslands(op::Op::V_LSHLREV_B32), category: ArchOp::ALU_OP },
    "v_lshrrev_b32" => Opcode { op: Op::SouthernIslands(op::Op::V_LSHRREV_B32), category: ArchOp::ALU_OP },
    "v_and_b32" => Opcode { op: Op::SouthernIslands(op::Op::V_AND_B32), category: ArchOp::ALU_OP },
    "v_or_b32" => Opcode { op: Op::SouthernIslands(op::Op::V_OR_B32), category: ArchOp::ALU_OP },
    "v_cmp_gt_i32" => Opcode { op: Op::SouthernIslands(op::Op::V_CMP_GT_I32), category: ArchOp::ALU_OP },
    "v_cmp_lt_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_CMP_LT_F32), category: ArchOp::ALU_OP },
    "v_cndmask_b32" => Opcode { op: Op::SouthernIslands(op::Op::V_CNDMASK_B32), category: ArchOp::ALU_OP },
    "v_readfirstlane_b32" => Opcode { op: Op::SouthernIslands(op::Op::V_READFIRSTLANE_B32), category: ArchOp::ALU_OP },
    "v_rcp_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_RCP_F32), category: ArchOp::ALU_OP },
    "v_sqrt_f32" => Opcode { op: Op::SouthernIslands(op::Op::V_SQRT_F32), category: ArchOp::ALU_OP },
    "tbuffer_load_format_x" => Opcode { op: Op::SouthernIslands(op::Op::TBUFFER_LOAD_FORMAT_X), category: ArchOp::LOAD_OP },
    "tbuffer_load_format_xy" => Opcode { op: Op::SouthernIslands(op::Op::TBUFFER_LOAD_FORMAT_XY), category: ArchOp::LOAD_OP },
    "tbuffer_load_format_xyzw" => Opcode { op: Op::SouthernIslands(op::Op::TBUFFER_LOAD_FORMAT_XYZW), category: ArchOp::LOAD_OP },
    "tbuffer_store_format_x" => Opcode { op: Op::SouthernIslands(op::Op::TBUFFER_STORE_FORMAT_X), category: ArchOp::STORE_OP },
    "tbuffer_store_format_xy" => Opcode { op: Op::SouthernIslands(op::Op::TBUFFER_STORE_FORMAT_XY), category: ArchOp::STORE_OP },
    "tbuffer_store_format_xyzw" => Opcode { op: Op::SouthernIslands(op::Op::TBUFFER_STORE_FORMAT_XYZW), category: ArchOp::STORE_OP },
    "buffer_load_dword" => Opcode { op: Op::SouthernIslands(op::Op::BUFFER_LOAD_DWORD), category: ArchOp::LOAD_OP },
    "buffer_store_dword" => Opcode { op: Op::SouthernIslands(op::Op::BUFFER_STORE_DWORD), category: ArchOp::STORE_OP },
    "buffer_atomic_add" => Opcode { op: Op::SouthernIslands(op::Op::BUFFER_ATOMIC_ADD), category: ArchOp::ATOMIC_OP },
    "ds_read_b32" => Opcode { op: Op::SouthernIslands(op::Op::DS_READ_B32), category: ArchOp::LDS_LOAD_OP },
    "ds_read2_b32" => Opcode { op: Op::SouthernIslands(op::Op::DS_READ2_B32), category: ArchOp::LDS_LOAD_OP },
    "ds_write_b32" => Opcode { op: Op::SouthernIslands(op::Op::DS_WRITE_B32), category: ArchOp::LDS_STORE_OP },
    "ds_write2_b32" => Opcode { op: Op::SouthernIslands(op::Op::DS_WRITE2_B32), category: ArchOp::LDS_STORE_OP },
    "ds_add_u32" => Opcode { op: Op::SouthernIslands(op::Op::DS_ADD_U32), category: ArchOp::LDS_ATOMIC_OP },
    "exp" => Opcode { op: Op::SouthernIslands(op::Op::EXP), category: ArchOp::EXPORT_OP },
};
