//! Calendar access gate.
//!
//! Every calendar tool checks access first. An undetermined state triggers a
//! single permission request; its answer is remembered for the rest of the
//! session.

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::core::AccessMode;

/// Text returned by every tool while access is refused.
pub const ACCESS_DENIED: &str =
    "Calendar access denied. Please grant permission in the server configuration.";

/// Asks whoever owns the calendars for access.
#[async_trait]
pub trait PermissionPrompt: Send + Sync {
    /// Request access; `true` when granted.
    async fn request(&self) -> bool;
}

/// Prompt whose answer is fixed by configuration.
#[derive(Debug, Clone, Copy)]
pub struct ConfiguredPrompt {
    grant: bool,
}

impl ConfiguredPrompt {
    pub fn new(grant: bool) -> Self {
        Self { grant }
    }
}

#[async_trait]
impl PermissionPrompt for ConfiguredPrompt {
    async fn request(&self) -> bool {
        tokio::task::yield_now().await;
        self.grant
    }
}

/// Tracks the access decision.
pub struct AccessGate {
    state: Mutex<AccessMode>,
    prompt: Box<dyn PermissionPrompt>,
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate").field("state", &*self.state.lock()).finish_non_exhaustive()
    }
}

impl AccessGate {
    /// Create a gate in `initial` state.
    pub fn new(initial: AccessMode, prompt: Box<dyn PermissionPrompt>) -> Self {
        Self { state: Mutex::new(initial), prompt }
    }

    /// Current decision.
    pub fn state(&self) -> AccessMode {
        *self.state.lock()
    }

    /// `Ok` when tools may run, otherwise the denial text.
    pub async fn check(&self) -> Result<(), &'static str> {
        let current = self.state();
        let granted = match current {
            AccessMode::Authorized => true,
            AccessMode::Denied => false,
            AccessMode::NotDetermined => {
                let granted = self.prompt.request().await;
                info!(granted, "calendar access requested");
                *self.state.lock() =
                    if granted { AccessMode::Authorized } else { AccessMode::Denied };
                granted
            }
        };
        if granted {
            Ok(())
        } else {
            Err(ACCESS_DENIED)
        }
    }
}
