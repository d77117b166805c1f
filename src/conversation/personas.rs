use std::sync::Arc;

use crate::completion::CompletionClient;
use crate::types::Persona;

use super::engine::ConversationEngine;

/// The default persona's engine and, when configured, the alternate one.
#[derive(Clone)]
pub struct Personas {
    default: Arc<ConversationEngine>,
    alternate: Option<Arc<ConversationEngine>>,
}

impl Personas {
    pub fn new(
        client: &Arc<dyn CompletionClient>,
        system_role: &str,
        system_role_alt: Option<&str>,
    ) -> Self {
        Self {
            default: Arc::new(ConversationEngine::new(
                Persona::Default,
                system_role,
                Arc::clone(client),
            )),
            alternate: system_role_alt.map(|role| {
                Arc::new(ConversationEngine::new(
                    Persona::Alternate,
                    role,
                    Arc::clone(client),
                ))
            }),
        }
    }

    #[must_use]
    pub fn default_engine(&self) -> &Arc<ConversationEngine> {
        &self.default
    }

    #[must_use]
    pub fn has_alternate(&self) -> bool {
        self.alternate.is_some()
    }

    /// Engine for `persona`, or `None` when that persona is not configured.
    #[must_use]
    pub fn get(&self, persona: Persona) -> Option<&Arc<ConversationEngine>> {
        match persona {
            Persona::Default => Some(&self.default),
            Persona::Alternate => self.alternate.as_ref(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ConversationEngine>> {
        std::iter::once(&self.default).chain(self.alternate.iter())
    }
}
