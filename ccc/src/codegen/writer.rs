//! Output writer. Owns the peephole's pending-push buffer and the byte
//! counter; both are per-invocation and die with the writer.

use arch::{hex, Inst, Reg, DATA_SIZE, INST_SIZE};
use std::io::{self, Write};

/// Streams the listing through a one-instruction peephole: a `PUSH` is
/// deferred, and a directly following `POP` collapses the pair to
/// nothing (same register) or to a single `MOV`. Any other write
/// flushes the pending `PUSH` verbatim.
pub struct Writer<W: Write> {
    out: W,
    pending_push: Option<Reg>,
    pos: u16,
}

impl<W: Write> Writer<W> {
    pub fn new(out: W) -> Self {
        Writer {
            out,
            pending_push: None,
            pos: 0,
        }
    }

    /// Current byte position in the output image.
    pub fn pos(&self) -> u16 {
        self.pos
    }

    pub fn inst(&mut self, inst: Inst) -> io::Result<()> {
        if let Inst::POP(dst) = inst {
            if let Some(src) = self.pending_push.take() {
                if src == dst {
                    return Ok(());
                }
                return self.write_inst(Inst::MOV(dst, src));
            }
        }
        if let Inst::PUSH(reg) = inst {
            self.flush()?;
            self.pending_push = Some(reg);
            return Ok(());
        }
        self.flush()?;
        self.write_inst(inst)
    }

    pub fn label(&mut self, name: &str) -> io::Result<()> {
        self.flush()?;
        writeln!(self.out, "{}:", name)
    }

    pub fn data(&mut self, word: u16) -> io::Result<()> {
        self.flush()?;
        self.pos += DATA_SIZE;
        writeln!(self.out, "  {}", hex(word))
    }

    /// Writes out the pending `PUSH`, if any.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(reg) = self.pending_push.take() {
            self.write_inst(Inst::PUSH(reg))?;
        }
        Ok(())
    }

    /// Final flush, of both the peephole and the underlying stream.
    pub fn finish(&mut self) -> io::Result<()> {
        self.flush()?;
        self.out.flush()
    }

    fn write_inst(&mut self, inst: Inst) -> io::Result<()> {
        self.pos += INST_SIZE;
        writeln!(self.out, "  {}", inst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(insts: Vec<Inst>) -> Vec<String> {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        for inst in insts {
            writer.inst(inst).unwrap();
        }
        writer.finish().unwrap();
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| l.trim().to_string())
            .collect()
    }

    #[test]
    fn push_pop_same_register_vanishes() {
        let lines = emit(vec![
            Inst::MOVI(Reg::M, arch::Imm::Val(1)),
            Inst::PUSH(Reg::M),
            Inst::POP(Reg::M),
        ]);
        assert_eq!(lines, vec!["MOVI M 0x0001"]);
    }

    #[test]
    fn push_pop_becomes_mov() {
        let lines = emit(vec![Inst::PUSH(Reg::M), Inst::POP(Reg::L)]);
        assert_eq!(lines, vec!["MOV L M"]);
    }

    #[test]
    fn intervening_instruction_flushes() {
        let lines = emit(vec![
            Inst::PUSH(Reg::M),
            Inst::MOVI(Reg::N, arch::Imm::Val(2)),
            Inst::POP(Reg::L),
        ]);
        assert_eq!(lines, vec!["PUSH M", "MOVI N 0x0002", "POP L"]);
    }

    #[test]
    fn second_push_flushes_the_first() {
        let lines = emit(vec![
            Inst::PUSH(Reg::A),
            Inst::PUSH(Reg::B),
            Inst::POP(Reg::C),
        ]);
        assert_eq!(lines, vec!["PUSH A", "MOV C B"]);
    }

    #[test]
    fn labels_flush_and_take_no_space() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        writer.inst(Inst::PUSH(Reg::A)).unwrap();
        writer.label("spot").unwrap();
        writer.inst(Inst::POP(Reg::A)).unwrap();
        writer.finish().unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "  PUSH A\nspot:\n  POP A\n");
    }

    #[test]
    fn byte_counter_paces_insts_and_data() {
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf);
        writer.inst(Inst::TIMERST).unwrap();
        assert_eq!(writer.pos(), 4);
        writer.data(7).unwrap();
        assert_eq!(writer.pos(), 6);
        // An elided pair adds nothing.
        writer.inst(Inst::PUSH(Reg::M)).unwrap();
        writer.inst(Inst::POP(Reg::M)).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.pos(), 6);
    }
}
