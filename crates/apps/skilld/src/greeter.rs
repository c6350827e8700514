//! The demo skill `skilld` serves: it asks for and remembers a favorite
//! color.

use skill_gate::{HookRegistry, HookResult, Request, Response};

pub const COLOR_INTENT: &str = "MyColorIsIntent";
pub const COLOR_SLOT: &str = "Color";
pub const FAVORITE_COLOR_ATTRIBUTE: &str = "favoriteColor";

const WELCOME: &str = "Welcome. Tell me your favorite color by saying, my color is red.";
const REPROMPT: &str = "Please tell me your favorite color.";
const GOODBYE: &str = "Goodbye.";
const UNKNOWN_INTENT: &str = "Sorry, I did not get that. Tell me your favorite color.";

pub fn registry() -> HookRegistry {
    HookRegistry::new()
        .on_session_started(session_started)
        .on_launch(launch)
        .on_intent(intent)
        .on_audio_player(audio_player)
        .on_session_ended(session_ended)
}

fn session_started(_response: &mut Response, request: &Request) -> HookResult {
    log::info!(
        "greeter: session started session={} user={}",
        request.session_id(),
        request.user_id()
    );
    Ok(())
}

fn launch(response: &mut Response, _request: &Request) -> HookResult {
    response.output_speech(WELCOME);
    response.reprompt_speech(REPROMPT);
    response.end_session(false);
    Ok(())
}

fn intent(response: &mut Response, request: &Request) -> HookResult {
    match request.intent_name() {
        Some(COLOR_INTENT) => {
            let color = request.slot(COLOR_SLOT)?.value.clone();
            response.output_speech(format!("Your favorite color is {color}"));
            response.simple_card("Favorite color", color.clone());
            response.set_session_attribute(FAVORITE_COLOR_ATTRIBUTE, color.into());
        }
        Some("AMAZON.StopIntent") | Some("AMAZON.CancelIntent") => {
            response.output_speech(GOODBYE);
        }
        other => {
            log::debug!("greeter: unhandled intent {:?}", other);
            response.output_speech(UNKNOWN_INTENT);
            response.reprompt_speech(REPROMPT);
            response.end_session(false);
        }
    }
    Ok(())
}

// Playback events may not carry speech.
fn audio_player(_response: &mut Response, request: &Request) -> HookResult {
    log::info!("greeter: playback event {}", request.request.request_type);
    Ok(())
}

fn session_ended(_response: &mut Response, request: &Request) -> HookResult {
    log::info!(
        "greeter: session ended session={} reason={}",
        request.session_id(),
        request.request.reason.as_deref().unwrap_or("unknown")
    );
    Ok(())
}
