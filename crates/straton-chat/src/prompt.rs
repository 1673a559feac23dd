//! Interactive prompt seam for the recovery flows
//!
//! The recovery setup and restore flows suspend on user input with no
//! timeout of their own; callers bound them with a cancellation token
//! instead. The CLI implements this trait over the terminal; tests script
//! it.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Mutex;
use straton_core::StratonResult;

pub trait RecoveryPrompt {
    /// Show a freshly generated recovery secret and suspend until the user
    /// confirms they have recorded it. `false` means the user backed out;
    /// the backup is not created and setup re-runs on a later session
    /// start.
    fn confirm_secret_saved(
        &self,
        secret: &SecretString,
    ) -> impl std::future::Future<Output = StratonResult<bool>>;

    /// Ask the user for their recovery secret. `None` is an explicit
    /// cancel: restoration is abandoned and the caller falls through to
    /// fresh key generation.
    fn request_secret(
        &self,
    ) -> impl std::future::Future<Output = StratonResult<Option<SecretString>>>;
}

/// Scripted prompt for tests and non-interactive embedders.
#[derive(Default)]
pub struct ScriptedPrompt {
    /// Answer given to the confirmation gate.
    pub confirm_save: bool,
    /// Reply to a secret request; `None` simulates cancel.
    pub secret_reply: Mutex<Option<String>>,
    /// Captures the secret that was shown, so a test can restore with it.
    pub shown_secret: Mutex<Option<String>>,
}

impl ScriptedPrompt {
    pub fn confirming() -> Self {
        Self {
            confirm_save: true,
            ..Default::default()
        }
    }

    pub fn replying_with(secret: &str) -> Self {
        Self {
            confirm_save: true,
            secret_reply: Mutex::new(Some(secret.to_string())),
            ..Default::default()
        }
    }

    pub fn cancelling() -> Self {
        Self::default()
    }

    /// The secret captured from the setup flow, if it ran.
    pub fn captured_secret(&self) -> Option<String> {
        self.shown_secret.lock().unwrap().clone()
    }
}

impl RecoveryPrompt for ScriptedPrompt {
    async fn confirm_secret_saved(&self, secret: &SecretString) -> StratonResult<bool> {
        *self.shown_secret.lock().unwrap() = Some(secret.expose_secret().to_string());
        Ok(self.confirm_save)
    }

    async fn request_secret(&self) -> StratonResult<Option<SecretString>> {
        Ok(self
            .secret_reply
            .lock()
            .unwrap()
            .clone()
            .map(SecretString::from))
    }
}
