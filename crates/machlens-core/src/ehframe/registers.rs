//! DWARF register numbering per CPU.

use gimli::{AArch64, Arm, Register, X86, X86_64};

use crate::types::Architecture;

fn powerpc_register_name(register: u16) -> Option<String>
{
    Some(match register {
        0..=31 => format!("r{register}"),
        32..=63 => format!("f{}", register - 32),
        64 => "cr".to_string(),
        65 => "fpscr".to_string(),
        66 => "msr".to_string(),
        100 => "mq".to_string(),
        101 => "xer".to_string(),
        108 => "lr".to_string(),
        109 => "ctr".to_string(),
        _ => return None,
    })
}

/// `16 (RA)`, or just the number when the CPU or register is unknown.
pub fn register_string(architecture: Architecture, register: u64) -> String
{
    let Ok(number) = u16::try_from(register) else {
        return register.to_string();
    };
    let name = match architecture {
        Architecture::X86 => X86::register_name(Register(number)).map(str::to_string),
        Architecture::X86_64 => X86_64::register_name(Register(number)).map(str::to_string),
        Architecture::Arm => Arm::register_name(Register(number)).map(str::to_string),
        Architecture::Arm64 => AArch64::register_name(Register(number)).map(str::to_string),
        Architecture::PowerPc | Architecture::PowerPc64 => powerpc_register_name(number),
        Architecture::Unknown(_) => None,
    };
    match name {
        Some(name) => format!("{register} ({name})"),
        None => register.to_string(),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_register_string()
    {
        assert_eq!(register_string(Architecture::X86_64, 16), "16 (RA)");
        assert_eq!(register_string(Architecture::Arm64, 30), "30 (X30)");
        assert_eq!(register_string(Architecture::PowerPc, 108), "108 (lr)");
        assert_eq!(register_string(Architecture::Unknown(0), 3), "3");
    }
}
