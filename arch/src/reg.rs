use num_enum::{FromPrimitive, IntoPrimitive};
use strum::{Display, EnumString};

/// The sixteen registers of the Consolite target. `A`..`D` carry call
/// arguments, `E`..`K` are callee-saved and handed to locals, `L`/`M`/`N`
/// are the code generator's scratch registers, `FP`/`SP` the frame and
/// stack pointers.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    FromPrimitive,
    IntoPrimitive,
    EnumString,
    Display,
)]
#[repr(u8)]
pub enum Reg {
    #[default]
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    FP,
    SP,
}

impl Reg {
    /// Number of registers used for call arguments.
    pub const ARGS: usize = 4;

    /// Number of callee-saved registers available to locals.
    pub const LOCALS: usize = 7;

    /// Register carrying argument `i` of a call (`A`..`D`).
    pub fn arg(i: usize) -> Self {
        debug_assert!(i < Self::ARGS);
        Reg::from(Reg::A as u8 + i as u8)
    }

    /// Callee-saved register for the `i`-th register-resident local
    /// (`E`..`K`).
    pub fn local(i: usize) -> Self {
        debug_assert!(i < Self::LOCALS);
        Reg::from(Reg::E as u8 + i as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(Reg::A.to_string(), "A");
        assert_eq!(Reg::FP.to_string(), "FP");
        assert_eq!("SP".parse::<Reg>().unwrap(), Reg::SP);
        assert!("Q".parse::<Reg>().is_err());
    }

    #[test]
    fn positional() {
        assert_eq!(Reg::arg(0), Reg::A);
        assert_eq!(Reg::arg(3), Reg::D);
        assert_eq!(Reg::local(0), Reg::E);
        assert_eq!(Reg::local(6), Reg::K);
    }
}
