//! External assembler/linker invocation.
//!
//! The emitted textual assembly is handed to the system C compiler, which
//! assembles (and, unless object-only, links) it. A non-zero child status
//! is surfaced as a [`CodeGenError::Toolchain`].

use std::path::Path;
use std::process::Command;

use crate::error::CodeGenError;

/// Wrapper around the system toolchain driver.
pub struct Assembler {
    cc: String,
}

impl Assembler {
    pub fn new() -> Self {
        Self { cc: "cc".to_string() }
    }

    /// Use a specific driver binary (e.g. `gcc`).
    pub fn with_driver(cc: impl Into<String>) -> Self {
        Self { cc: cc.into() }
    }

    /// Assemble `asm_path` into `output`. With `link`, produce a full
    /// executable; otherwise stop at an object file (`-c`).
    pub fn assemble(&self, asm_path: &Path, output: &Path, link: bool) -> Result<(), CodeGenError> {
        let mut cmd = Command::new(&self.cc);
        if !link {
            cmd.arg("-c");
        }
        cmd.arg(asm_path).arg("-o").arg(output);

        let status = cmd.status()?;
        if !status.success() {
            return Err(CodeGenError::Toolchain {
                status: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_driver_is_an_error() {
        let assembler = Assembler::with_driver("rcc-no-such-toolchain");
        let dir = tempfile::tempdir().unwrap();
        let asm = dir.path().join("t.s");
        std::fs::write(&asm, ".intel_syntax noprefix\n").unwrap();
        let out = dir.path().join("t.o");
        assert!(assembler.assemble(&asm, &out, false).is_err());
    }
}
