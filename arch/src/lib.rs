pub mod inst;
pub mod reg;

pub use inst::{hex, Imm, Inst, Src, DATA_SIZE, INST_SIZE};
pub use reg::Reg;
