use serde::{Deserialize, Serialize};

/// Sentinel participant id of the room facilitator.
pub const FACILITATOR_ID: &str = "AIAssistantFacilitator";

/// Id prefix reserved for AI participants; the rest of the id is the AI's name.
pub const AI_PARTICIPANT_PREFIX: &str = "AIAssistant_";

/// A roster entry as pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    #[serde(rename = "name")]
    pub display_name: String,
}

/// What kind of participant an id denotes, from the local user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantRole {
    /// The local user (id equals the session token).
    Me,
    Facilitator,
    AiParticipant,
    Human,
}

impl ParticipantRole {
    /// Classify a participant id.
    pub fn of(id: &str, my_token: Option<&str>) -> Self {
        if my_token.is_some_and(|t| t == id) {
            Self::Me
        } else if id == FACILITATOR_ID {
            Self::Facilitator
        } else if id.starts_with(AI_PARTICIPANT_PREFIX) {
            Self::AiParticipant
        } else {
            Self::Human
        }
    }
}

impl Participant {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Classify this participant. `my_token` is the local session token, if any.
    pub fn role(&self, my_token: Option<&str>) -> ParticipantRole {
        ParticipantRole::of(&self.id, my_token)
    }

    /// Logical AI name for AI participant ids (`AIAssistant_Sage` -> `Sage`).
    pub fn ai_name(&self) -> Option<&str> {
        self.id
            .strip_prefix(AI_PARTICIPANT_PREFIX)
            .filter(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles() {
        let me = Participant::new("tok-1", "Ann");
        assert_eq!(me.role(Some("tok-1")), ParticipantRole::Me);
        assert_eq!(me.role(None), ParticipantRole::Human);

        let facilitator = Participant::new(FACILITATOR_ID, "Facilitator");
        assert_eq!(facilitator.role(Some("tok-1")), ParticipantRole::Facilitator);

        let ai = Participant::new("AIAssistant_Sage", "Sage");
        assert_eq!(ai.role(Some("tok-1")), ParticipantRole::AiParticipant);
    }

    #[test]
    fn ai_name_strips_prefix() {
        assert_eq!(Participant::new("AIAssistant_Kai", "Kai").ai_name(), Some("Kai"));
        assert_eq!(Participant::new("AIAssistant_", "?").ai_name(), None);
        assert_eq!(Participant::new(FACILITATOR_ID, "F").ai_name(), None);
        assert_eq!(Participant::new("user-9", "Bo").ai_name(), None);
    }

    #[test]
    fn participant_wire_uses_name_field() {
        let p: Participant = serde_json::from_str(r#"{"id":"t1","name":"Ann"}"#).unwrap();
        assert_eq!(p.display_name, "Ann");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["name"], "Ann");
        assert!(json.get("display_name").is_none());
    }
}
