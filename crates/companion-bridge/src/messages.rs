//! Translated strings the bridge hands back to the editor.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::error::UnrecognizedMessageKey;

/// Closed set of message identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OdeMessage {
    /// Label of the delete confirmation button.
    DeleteButton,
    /// Label of the cancel button.
    CancelButton,
}

impl OdeMessage {
    /// Every identifier, in declaration order.
    pub const ALL: [OdeMessage; 2] = [Self::DeleteButton, Self::CancelButton];

    /// Identifier as the editor spells it.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::DeleteButton => "deleteButton",
            Self::CancelButton => "cancelButton",
        }
    }

    fn default_text(self) -> &'static str {
        match self {
            Self::DeleteButton => "Delete",
            Self::CancelButton => "Cancel",
        }
    }
}

impl FromStr for OdeMessage {
    type Err = UnrecognizedMessageKey;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|message| message.key() == key)
            .ok_or_else(|| UnrecognizedMessageKey(key.into()))
    }
}

impl fmt::Display for OdeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Message lookup with English defaults.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    texts: IndexMap<OdeMessage, SmolStr>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            texts: OdeMessage::ALL
                .into_iter()
                .map(|message| (message, SmolStr::new(message.default_text())))
                .collect(),
        }
    }
}

impl MessageCatalog {
    /// Replace the text for `message`.
    #[must_use]
    pub fn with_translation(mut self, message: OdeMessage, text: impl Into<SmolStr>) -> Self {
        self.texts.insert(message, text.into());
        self
    }

    /// Text for a known identifier.
    #[must_use]
    pub fn get(&self, message: OdeMessage) -> &str {
        self.texts
            .get(&message)
            .map_or(message.default_text(), SmolStr::as_str)
    }

    /// Text for an identifier given by name. Names outside the closed set are
    /// rejected.
    pub fn get_ode_message(&self, key: &str) -> Result<&str, UnrecognizedMessageKey> {
        let message = key.parse::<OdeMessage>()?;
        Ok(self.get(message))
    }
}
