//! CPU architecture identification.

use std::fmt;

use crate::macho::constants::{
    CPU_TYPE_ARM, CPU_TYPE_ARM64, CPU_TYPE_POWERPC, CPU_TYPE_POWERPC64, CPU_TYPE_X86, CPU_TYPE_X86_64,
};

/// CPU architecture of a Mach-O file (or of the running host)
///
/// ## Supported Architectures
///
/// - **X86** / **X86_64**: Intel/AMD, 32 and 64 bit
/// - **Arm** / **Arm64**: 32-bit ARM and Apple Silicon
/// - **PowerPc** / **PowerPc64**: legacy PowerPC Macs
/// - **Unknown**: any other `cputype` (kept raw for display)
///
/// ## Example
///
/// ```rust
/// use machlens_core::types::Architecture;
///
/// let arch = Architecture::from_cpu_type(0x0100_0007);
/// assert_eq!(arch, Architecture::X86_64);
/// assert_eq!(arch.pointer_size_bytes(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture
{
    /// 32-bit x86 (`CPU_TYPE_X86`)
    X86,
    /// 64-bit x86 (`CPU_TYPE_X86_64`)
    X86_64,
    /// 32-bit ARM (`CPU_TYPE_ARM`)
    Arm,
    /// 64-bit ARM (`CPU_TYPE_ARM64`)
    Arm64,
    /// 32-bit PowerPC (`CPU_TYPE_POWERPC`)
    PowerPc,
    /// 64-bit PowerPC (`CPU_TYPE_POWERPC64`)
    PowerPc64,
    /// Any other CPU type; the raw `cputype` is kept
    Unknown(u32),
}

/// In-memory layout of C `long double` on an architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongDoubleLayout
{
    /// x87 80-bit extended precision, padded to 16 bytes
    X87Extended,
    /// Same as `double`
    Binary64,
    /// IBM double-double (sum of two doubles)
    DoubleDouble,
}

impl Architecture
{
    /// Map a Mach-O `cputype` to an architecture.
    pub const fn from_cpu_type(cputype: u32) -> Self
    {
        match cputype {
            CPU_TYPE_X86 => Architecture::X86,
            CPU_TYPE_X86_64 => Architecture::X86_64,
            CPU_TYPE_ARM => Architecture::Arm,
            CPU_TYPE_ARM64 => Architecture::Arm64,
            CPU_TYPE_POWERPC => Architecture::PowerPc,
            CPU_TYPE_POWERPC64 => Architecture::PowerPc64,
            other => Architecture::Unknown(other),
        }
    }

    /// Get the architecture of the currently running binary
    ///
    /// This uses Rust's `#[cfg(target_arch = "...")]` to determine the architecture
    /// at compile time. It gates decoders whose output depends on the host's
    /// native number formats (`long double`).
    pub const fn current() -> Self
    {
        #[cfg(target_arch = "x86")]
        {
            Architecture::X86
        }

        #[cfg(target_arch = "x86_64")]
        {
            Architecture::X86_64
        }

        #[cfg(target_arch = "arm")]
        {
            Architecture::Arm
        }

        #[cfg(target_arch = "aarch64")]
        {
            Architecture::Arm64
        }

        #[cfg(target_arch = "powerpc")]
        {
            Architecture::PowerPc
        }

        #[cfg(target_arch = "powerpc64")]
        {
            Architecture::PowerPc64
        }

        #[cfg(not(any(
            target_arch = "x86",
            target_arch = "x86_64",
            target_arch = "arm",
            target_arch = "aarch64",
            target_arch = "powerpc",
            target_arch = "powerpc64"
        )))]
        {
            Architecture::Unknown(0)
        }
    }

    /// Size of a pointer in bytes for this architecture.
    #[must_use]
    pub const fn pointer_size_bytes(self) -> u8
    {
        match self {
            Architecture::X86_64 | Architecture::Arm64 | Architecture::PowerPc64 => 8,
            Architecture::X86 | Architecture::Arm | Architecture::PowerPc | Architecture::Unknown(_) => 4,
        }
    }

    #[must_use]
    pub const fn is_64_bit(self) -> bool
    {
        self.pointer_size_bytes() == 8
    }

    /// Layout of `long double`, if known for this architecture.
    #[must_use]
    pub const fn long_double_layout(self) -> Option<LongDoubleLayout>
    {
        match self {
            Architecture::X86 | Architecture::X86_64 => Some(LongDoubleLayout::X87Extended),
            Architecture::Arm | Architecture::Arm64 => Some(LongDoubleLayout::Binary64),
            Architecture::PowerPc | Architecture::PowerPc64 => Some(LongDoubleLayout::DoubleDouble),
            Architecture::Unknown(_) => None,
        }
    }

    /// Machine name in the style of `file(1)`, e.g. `AMD64`.
    pub const fn machine_name(self) -> &'static str
    {
        match self {
            Architecture::X86 => "386",
            Architecture::X86_64 => "AMD64",
            Architecture::Arm => "ARM",
            Architecture::Arm64 => "ARM64",
            Architecture::PowerPc => "PowerPC",
            Architecture::PowerPc64 => "PowerPC64",
            Architecture::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::X86 => write!(f, "i386"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Arm => write!(f, "arm"),
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::PowerPc => write!(f, "ppc"),
            Architecture::PowerPc64 => write!(f, "ppc64"),
            Architecture::Unknown(cputype) => write!(f, "unknown({cputype:#x})"),
        }
    }
}
