//! Package Finalization
//!
//! Optional signing followed by mandatory alignment. The state machine is
//! `Unsigned → Signed → Aligned → Final` when a signing credential is
//! configured and `Unsigned → Aligned → Final` otherwise; the final name
//! carries a `-debug` marker exactly when no credential is configured.

use std::path::PathBuf;

use tracing::info;

use crate::config::SigningInfo;
use crate::tool::{ToolInvocation, ToolInvoker, ToolKind};
use crate::Result;

/// Finalization states. `Final` is the build's externally visible artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeState {
    Unsigned,
    Signed,
    Aligned,
    Final,
}

impl FinalizeState {
    /// The next state, given whether a signing credential is configured.
    pub fn next(self, signing: bool) -> Option<FinalizeState> {
        match (self, signing) {
            (FinalizeState::Unsigned, true) => Some(FinalizeState::Signed),
            (FinalizeState::Unsigned, false) => Some(FinalizeState::Aligned),
            (FinalizeState::Signed, _) => Some(FinalizeState::Aligned),
            (FinalizeState::Aligned, _) => Some(FinalizeState::Final),
            (FinalizeState::Final, _) => None,
        }
    }

    /// Every state the pipeline passes through from `Unsigned`.
    pub fn plan(signing: bool) -> Vec<FinalizeState> {
        let mut states = vec![FinalizeState::Unsigned];
        while let Some(next) = states.last().unwrap().next(signing) {
            states.push(next);
        }
        states
    }
}

/// Artifact names through finalization. The `-debug` marker is present
/// iff no signing credential is configured.
pub fn unsigned_name(name: &str, signing: bool) -> String {
    if signing {
        format!("{}-unsigned.apk", name)
    } else {
        format!("{}-unsigned-debug.apk", name)
    }
}

pub fn signed_name(name: &str) -> String {
    format!("{}-unaligned.apk", name)
}

pub fn final_name(name: &str, signing: bool) -> String {
    if signing {
        format!("{}.apk", name)
    } else {
        format!("{}-debug.apk", name)
    }
}

/// Wraps the signer and the aligner.
pub struct Finalizer {
    jarsigner: PathBuf,
    zipalign: PathBuf,
    signing: Option<SigningInfo>,
    unsigned_apk: PathBuf,
    signed_apk: PathBuf,
    final_apk: PathBuf,
}

impl Finalizer {
    pub fn new(
        jarsigner: PathBuf,
        zipalign: PathBuf,
        signing: Option<SigningInfo>,
        unsigned_apk: PathBuf,
        signed_apk: PathBuf,
        final_apk: PathBuf,
    ) -> Self {
        Self {
            jarsigner,
            zipalign,
            signing,
            unsigned_apk,
            signed_apk,
            final_apk,
        }
    }

    pub fn unsigned_apk(&self) -> &PathBuf {
        &self.unsigned_apk
    }

    pub fn signed_apk(&self) -> &PathBuf {
        &self.signed_apk
    }

    pub fn final_apk(&self) -> &PathBuf {
        &self.final_apk
    }

    pub fn states(&self) -> Vec<FinalizeState> {
        FinalizeState::plan(self.signing.is_some())
    }

    /// Sign the assembled package. Only reachable when a credential is
    /// configured.
    pub async fn sign(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        let signing = self.signing.as_ref().ok_or_else(|| {
            crate::BuildError::Dependency("sign stage reached without a credential".to_string())
        })?;
        info!(apk = %self.signed_apk.display(), "signing package");

        let invocation = ToolInvocation::new(ToolKind::Jarsigner, self.jarsigner.clone())
            .arg("-keystore")
            .arg(signing.keystore.to_string_lossy())
            .arg("-signedjar")
            .arg(self.signed_apk.to_string_lossy())
            .arg(self.unsigned_apk.to_string_lossy())
            .arg(&signing.alias)
            .input(self.unsigned_apk.clone())
            .output(self.signed_apk.clone());
        invoker.invoke(&invocation).await?;
        Ok(())
    }

    /// Align the signed (or unsigned) package into the final artifact.
    /// Alignment is unconditional for anything intended for installation.
    pub async fn align(&self, invoker: &dyn ToolInvoker) -> Result<()> {
        let input = if self.signing.is_some() {
            &self.signed_apk
        } else {
            &self.unsigned_apk
        };
        info!(apk = %self.final_apk.display(), "aligning package");

        let invocation = ToolInvocation::new(ToolKind::Zipalign, self.zipalign.clone())
            .args(["-f", "4"])
            .arg(input.to_string_lossy())
            .arg(self.final_apk.to_string_lossy())
            .input(input.clone())
            .output(self.final_apk.clone());
        invoker.invoke(&invocation).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsigned_plan_skips_signed() {
        assert_eq!(
            FinalizeState::plan(false),
            vec![
                FinalizeState::Unsigned,
                FinalizeState::Aligned,
                FinalizeState::Final
            ]
        );
    }

    #[test]
    fn test_signed_plan_enters_signed_before_aligned() {
        assert_eq!(
            FinalizeState::plan(true),
            vec![
                FinalizeState::Unsigned,
                FinalizeState::Signed,
                FinalizeState::Aligned,
                FinalizeState::Final
            ]
        );
    }

    #[test]
    fn test_final_is_terminal() {
        assert_eq!(FinalizeState::Final.next(true), None);
        assert_eq!(FinalizeState::Final.next(false), None);
    }

    #[test]
    fn test_debug_marker_iff_unsigned() {
        assert_eq!(final_name("Test", false), "Test-debug.apk");
        assert_eq!(final_name("Test", true), "Test.apk");
        assert_eq!(unsigned_name("Test", false), "Test-unsigned-debug.apk");
        assert_eq!(unsigned_name("Test", true), "Test-unsigned.apk");
    }
}
