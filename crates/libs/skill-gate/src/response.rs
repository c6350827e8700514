//! Outbound response document and the setters hooks use to fill it in.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

pub const RESPONSE_VERSION: &str = "1.0.0";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub version: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub session_attributes: Map<String, JsonValue>,
    pub response: ResponseBody,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,
    pub should_end_session: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    PlainText { text: String },
    #[serde(rename = "SSML")]
    Ssml { ssml: String },
}

impl OutputSpeech {
    /// Plain text or SSML markup, whichever this speech carries.
    pub fn content(&self) -> &str {
        match self {
            Self::PlainText { text } => text,
            Self::Ssml { ssml } => ssml,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Card {
    Simple {
        title: String,
        content: String,
    },
    Standard {
        title: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<CardImage>,
    },
    LinkAccount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardImage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub small_image_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub large_image_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Directive {
    #[serde(rename = "AudioPlayer.Play", rename_all = "camelCase")]
    AudioPlayerPlay { play_behavior: PlayBehavior, audio_item: AudioItem },
    #[serde(rename = "AudioPlayer.Stop")]
    AudioPlayerStop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayBehavior {
    ReplaceAll,
    Enqueue,
    ReplaceEnqueued,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioItem {
    pub stream: Stream,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stream {
    pub token: String,
    pub url: String,
    pub offset_in_milliseconds: i64,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    /// Default shape handed to hooks: session ends, nothing is spoken.
    pub fn new() -> Self {
        Self {
            version: RESPONSE_VERSION.to_string(),
            session_attributes: Map::new(),
            response: ResponseBody {
                output_speech: None,
                card: None,
                reprompt: None,
                directives: Vec::new(),
                should_end_session: true,
            },
        }
    }

    pub fn end_session(&mut self, end: bool) {
        self.response.should_end_session = end;
    }

    pub fn output_speech(&mut self, text: impl Into<String>) {
        self.response.output_speech = Some(OutputSpeech::PlainText { text: text.into() });
    }

    pub fn output_speech_ssml(&mut self, ssml: impl Into<String>) {
        self.response.output_speech = Some(OutputSpeech::Ssml { ssml: ssml.into() });
    }

    pub fn reprompt_speech(&mut self, text: impl Into<String>) {
        self.response.reprompt =
            Some(Reprompt { output_speech: OutputSpeech::PlainText { text: text.into() } });
    }

    pub fn reprompt_ssml(&mut self, ssml: impl Into<String>) {
        self.response.reprompt =
            Some(Reprompt { output_speech: OutputSpeech::Ssml { ssml: ssml.into() } });
    }

    pub fn simple_card(&mut self, title: impl Into<String>, content: impl Into<String>) {
        self.response.card = Some(Card::Simple { title: title.into(), content: content.into() });
    }

    pub fn standard_card(
        &mut self,
        title: impl Into<String>,
        text: impl Into<String>,
        small_image_url: impl Into<String>,
        large_image_url: impl Into<String>,
    ) {
        self.response.card = Some(Card::Standard {
            title: title.into(),
            text: text.into(),
            image: Some(CardImage {
                small_image_url: small_image_url.into(),
                large_image_url: large_image_url.into(),
            }),
        });
    }

    pub fn link_account_card(&mut self) {
        self.response.card = Some(Card::LinkAccount);
    }

    pub fn audio_player_play(&mut self, play_behavior: PlayBehavior, stream: Stream) {
        self.response
            .directives
            .push(Directive::AudioPlayerPlay { play_behavior, audio_item: AudioItem { stream } });
    }

    pub fn audio_player_stop(&mut self) {
        self.response.directives.push(Directive::AudioPlayerStop);
    }

    pub fn set_session_attribute(&mut self, key: impl Into<String>, value: JsonValue) {
        self.session_attributes.insert(key.into(), value);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_vec(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
