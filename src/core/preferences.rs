//! Session-scoped settings persisted independently of the transcript.

use tracing::warn;

use crate::core::constants::{PERSONA_KEY, SYSTEM_PROMPT_KEY};
use crate::core::persona::Persona;
use crate::core::storage::KeyValueStore;

#[derive(Debug, Clone, Default)]
pub struct SessionPreferences {
    pub system_prompt: String,
    pub persona: Persona,
}

impl SessionPreferences {
    /// Restore preferences, falling back to defaults for anything absent
    /// or unreadable.
    pub fn load(storage: &dyn KeyValueStore) -> Self {
        let system_prompt = match storage.load(SYSTEM_PROMPT_KEY) {
            Ok(Some(value)) => value,
            Ok(None) => String::new(),
            Err(err) => {
                warn!("could not read stored system prompt: {err}");
                String::new()
            }
        };
        let persona = match storage.load(PERSONA_KEY) {
            Ok(Some(value)) => Persona::parse(&value),
            Ok(None) => Persona::default(),
            Err(err) => {
                warn!("could not read stored persona: {err}");
                Persona::default()
            }
        };
        Self {
            system_prompt,
            persona,
        }
    }

    pub fn save(&self, storage: &dyn KeyValueStore) {
        if let Err(err) = storage.save(SYSTEM_PROMPT_KEY, &self.system_prompt) {
            warn!("could not persist system prompt: {err}");
        }
        if let Err(err) = storage.save(PERSONA_KEY, self.persona.id()) {
            warn!("could not persist persona: {err}");
        }
    }

    /// Compose the wire system prompt: the configured text plus the
    /// persona suffix, blank-line separated. `None` when both are blank,
    /// letting the backend apply its own default prompt.
    pub fn effective_system_prompt(&self) -> Option<String> {
        let base = self.system_prompt.trim();
        match (base.is_empty(), self.persona.prompt_suffix()) {
            (true, None) => None,
            (true, Some(suffix)) => Some(suffix.to_string()),
            (false, None) => Some(base.to_string()),
            (false, Some(suffix)) => Some(format!("{base}\n\n{suffix}")),
        }
    }
}
