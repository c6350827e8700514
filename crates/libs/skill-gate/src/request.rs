//! Inbound request envelope as posted by the platform.
//!
//! Every field tolerates absence so that new platform fields or partially
//! populated payloads (audio-player events carry no session, for example)
//! still decode.

use crate::error::{SkillError, SkillResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

pub const LAUNCH_REQUEST: &str = "LaunchRequest";
pub const INTENT_REQUEST: &str = "IntentRequest";
pub const SESSION_ENDED_REQUEST: &str = "SessionEndedRequest";
/// Family prefix shared by every audio-player event tag.
pub const AUDIO_PLAYER_PREFIX: &str = "AudioPlayer";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Request {
    pub version: String,
    pub session: Session,
    pub context: Context,
    pub request: RequestBody,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    pub new: bool,
    pub session_id: String,
    pub attributes: Map<String, JsonValue>,
    pub user: User,
    pub application: Application,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Permissions {
    pub consent_token: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    #[serde(rename = "AudioPlayer")]
    pub audio_player: AudioPlayerState,
    #[serde(rename = "System")]
    pub system: SystemState,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AudioPlayerState {
    pub offset_in_milliseconds: i64,
    pub player_activity: String,
    pub token: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemState {
    pub api_access_token: String,
    pub api_endpoint: String,
    pub application: Application,
    pub device: Device,
    pub user: User,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type")]
    pub request_type: String,
    pub request_id: String,
    pub timestamp: String,
    pub locale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    /// Audio-player events: token of the stream the event refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset_in_milliseconds: Option<i64>,
    /// Session-ended requests: why the platform closed the session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Intent {
    pub name: String,
    pub slots: HashMap<String, Slot>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slot {
    pub name: String,
    pub value: String,
}

/// Routing class of a request type tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestType {
    Launch,
    Intent,
    SessionEnded,
    AudioPlayer,
    Unhandled,
}

impl RequestType {
    /// Exact match on the known tags first, then the audio-player family
    /// prefix. Anything else is `Unhandled`.
    pub fn classify(tag: &str) -> Self {
        match tag {
            LAUNCH_REQUEST => Self::Launch,
            INTENT_REQUEST => Self::Intent,
            SESSION_ENDED_REQUEST => Self::SessionEnded,
            other if other.starts_with(AUDIO_PLAYER_PREFIX) => Self::AudioPlayer,
            _ => Self::Unhandled,
        }
    }
}

impl Request {
    pub fn from_json(body: &[u8]) -> SkillResult<Self> {
        serde_json::from_slice(body).map_err(SkillError::PayloadDecode)
    }

    pub fn request_type(&self) -> RequestType {
        RequestType::classify(&self.request.request_type)
    }

    pub fn is_new_session(&self) -> bool {
        self.session.new
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.session.user.user_id
    }

    pub fn timestamp(&self) -> &str {
        &self.request.timestamp
    }

    /// Application identity the request is checked against: the copy in
    /// the session descriptor. The `context.System` copy is never consulted.
    pub fn application_id(&self) -> &str {
        &self.session.application.application_id
    }

    pub fn intent_name(&self) -> Option<&str> {
        self.request.intent.as_ref().map(|intent| intent.name.as_str())
    }

    pub fn slot(&self, name: &str) -> SkillResult<&Slot> {
        self.request
            .intent
            .as_ref()
            .and_then(|intent| intent.slots.get(name))
            .ok_or_else(|| SkillError::SlotNotFound { name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLOR_REQUEST: &str = r#"{"session":{"new":false,"sessionId":"amzn1.echo-api.session.leoe","attributes":{},"user":{"userId":"amzn1.ask.account.bbb"},"application":{"applicationId":"amzn1.ask.skill.aaa"}},"version":"1.0","request":{"locale":"en-US","timestamp":"2016-10-27T21:06:28Z","type":"IntentRequest","requestId":"amzn1.echo-api.request.234","intent":{"slots":{"Color":{"name":"Color","value":"blue"}},"name":"MyColorIsIntent"}},"context":{"AudioPlayer":{"playerActivity":"IDLE"},"System":{"device":{"supportedInterfaces":{"AudioPlayer":{}}},"application":{"applicationId":"amzn1.ask.skill.423"},"user":{"userId":"amzn1.ask.account.303"}}}}"#;

    #[test]
    fn decodes_platform_payload() {
        let request = Request::from_json(COLOR_REQUEST.as_bytes()).expect("decode");
        assert_eq!(request.version, "1.0");
        assert_eq!(request.session_id(), "amzn1.echo-api.session.leoe");
        assert_eq!(request.user_id(), "amzn1.ask.account.bbb");
        assert_eq!(request.application_id(), "amzn1.ask.skill.aaa");
        assert_eq!(request.timestamp(), "2016-10-27T21:06:28Z");
        assert_eq!(request.intent_name(), Some("MyColorIsIntent"));
        assert_eq!(request.request_type(), RequestType::Intent);
        assert_eq!(request.context.audio_player.player_activity, "IDLE");
        assert!(!request.is_new_session());
    }

    #[test]
    fn slot_lookup_distinguishes_missing_names() {
        let request = Request::from_json(COLOR_REQUEST.as_bytes()).expect("decode");
        let slot = request.slot("Color").expect("color slot");
        assert_eq!(slot, &Slot { name: "Color".into(), value: "blue".into() });

        let err = request.slot("Size").expect_err("size is not a slot");
        assert!(matches!(err, SkillError::SlotNotFound { ref name } if name == "Size"));
    }

    #[test]
    fn slot_lookup_without_intent_is_not_found() {
        let request = Request::default();
        assert!(matches!(request.slot("Color"), Err(SkillError::SlotNotFound { .. })));
        assert_eq!(request.intent_name(), None);
    }

    #[test]
    fn classifies_request_types() {
        assert_eq!(RequestType::classify("LaunchRequest"), RequestType::Launch);
        assert_eq!(RequestType::classify("IntentRequest"), RequestType::Intent);
        assert_eq!(RequestType::classify("SessionEndedRequest"), RequestType::SessionEnded);
        for tag in [
            "AudioPlayer.PlaybackStarted",
            "AudioPlayerPlaybackStarted",
            "AudioPlayer.PlaybackNearlyFinished",
        ] {
            assert_eq!(RequestType::classify(tag), RequestType::AudioPlayer, "{tag}");
        }
        assert_eq!(RequestType::classify("PlaybackController.PlayCommandIssued"), RequestType::Unhandled);
        assert_eq!(RequestType::classify(""), RequestType::Unhandled);
        assert_eq!(RequestType::classify("Audio"), RequestType::Unhandled);
    }

    #[test]
    fn sessionless_audio_event_has_no_payload_application_id() {
        let body = r#"{"version":"1.0","context":{"System":{"application":{"applicationId":"amzn1.ask.skill.ctx"}}},"request":{"type":"AudioPlayer.PlaybackStopped","token":"t-1","offsetInMilliseconds":1200}}"#;
        let request = Request::from_json(body.as_bytes()).expect("decode");
        assert_eq!(request.application_id(), "");
        assert_eq!(request.context.system.application.application_id, "amzn1.ask.skill.ctx");
        assert_eq!(request.request.token.as_deref(), Some("t-1"));
        assert_eq!(request.request.offset_in_milliseconds, Some(1200));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = Request::from_json(b"{\"session\":").expect_err("truncated");
        assert!(matches!(err, SkillError::PayloadDecode(_)));
    }
}
