use anyhow::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ParseError;
use crate::types::{Intent, IntentKind, IntentPayload};

/// Commands that clients can send to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// `auth {identity, displayName}`, the first frame on every link
    Auth {
        identity: String,
        display_name: String,
    },

    /// `challenge.issue {toIdentity}`
    IssueChallenge { to_identity: String },

    /// `challenge.respond {challengeId, accept}`
    RespondChallenge { challenge_id: Uuid, accept: bool },

    /// `battle.intent {sessionId, kind, payload}`
    Intent { session_id: Uuid, intent: Intent },
}

/// JSON shape of a client frame, before payload validation
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireCommand {
    #[serde(rename = "auth", rename_all = "camelCase")]
    Auth {
        identity: String,
        display_name: String,
    },

    #[serde(rename = "challenge.issue", rename_all = "camelCase")]
    ChallengeIssue { to_identity: String },

    #[serde(rename = "challenge.respond", rename_all = "camelCase")]
    ChallengeRespond { challenge_id: Uuid, accept: bool },

    #[serde(rename = "battle.intent", rename_all = "camelCase")]
    BattleIntent {
        session_id: Uuid,
        kind: IntentKind,
        #[serde(default)]
        payload: IntentPayload,
    },
}

impl ClientCommand {
    /// Serialize command to its JSON text frame
    pub fn to_wire_format(&self) -> String {
        let wire = match self {
            Self::Auth {
                identity,
                display_name,
            } => WireCommand::Auth {
                identity: identity.clone(),
                display_name: display_name.clone(),
            },
            Self::IssueChallenge { to_identity } => WireCommand::ChallengeIssue {
                to_identity: to_identity.clone(),
            },
            Self::RespondChallenge {
                challenge_id,
                accept,
            } => WireCommand::ChallengeRespond {
                challenge_id: *challenge_id,
                accept: *accept,
            },
            Self::Intent { session_id, intent } => WireCommand::BattleIntent {
                session_id: *session_id,
                kind: intent.kind(),
                payload: intent.payload(),
            },
        };

        // Every field is a string, bool, number or unit enum, so encoding cannot fail
        serde_json::to_string(&wire).unwrap_or_default()
    }
}

/// Parse a complete text frame from a client
pub fn parse_client_frame(frame: &str) -> Result<ClientCommand> {
    let frame = frame.trim();
    if frame.is_empty() {
        return Err(ParseError::EmptyMessage.into());
    }

    let wire: WireCommand =
        serde_json::from_str(frame).map_err(|e| ParseError::InvalidFormat(e.to_string()))?;

    let command = match wire {
        WireCommand::Auth {
            identity,
            display_name,
        } => {
            if identity.trim().is_empty() {
                return Err(ParseError::MissingField("identity".to_string()).into());
            }
            ClientCommand::Auth {
                identity,
                display_name,
            }
        }
        WireCommand::ChallengeIssue { to_identity } => {
            ClientCommand::IssueChallenge { to_identity }
        }
        WireCommand::ChallengeRespond {
            challenge_id,
            accept,
        } => ClientCommand::RespondChallenge {
            challenge_id,
            accept,
        },
        WireCommand::BattleIntent {
            session_id,
            kind,
            payload,
        } => ClientCommand::Intent {
            session_id,
            intent: Intent::from_wire(kind, &payload)?,
        },
    };

    Ok(command)
}
