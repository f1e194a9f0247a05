//! Bytecode Conversion
//!
//! Converts compiled units (or the obfuscated archive, when an obfuscation
//! stage is configured) into the device-executable bytecode archive.

use std::path::PathBuf;

use tracing::info;

use crate::tool::{ToolInvocation, ToolInvoker, ToolKind};
use crate::Result;

/// Wraps the external bytecode converter.
pub struct BytecodeConverter {
    dx: PathBuf,
    /// Compiled-unit directory, or the obfuscated archive superseding it
    input: PathBuf,
    output: PathBuf,
}

impl BytecodeConverter {
    pub fn new(dx: PathBuf, input: PathBuf, output: PathBuf) -> Self {
        Self { dx, input, output }
    }

    pub fn output(&self) -> &PathBuf {
        &self.output
    }

    /// Produce the bytecode archive.
    pub async fn convert(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        info!(dex = %self.output.display(), "converting to device bytecode");
        let invocation = ToolInvocation::new(ToolKind::Dx, self.dx.clone())
            .arg("--dex")
            .arg(format!("--output={}", self.output.display()))
            .arg(self.input.to_string_lossy())
            .input(self.input.clone())
            .output(self.output.clone());
        invoker.invoke(&invocation).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_flag_shape() {
        let converter = BytecodeConverter::new(
            PathBuf::from("/sdk/platform-tools/dx"),
            PathBuf::from("/p/build/classes"),
            PathBuf::from("/p/build/Testclasses.dex"),
        );
        assert_eq!(converter.output(), &PathBuf::from("/p/build/Testclasses.dex"));
    }
}
