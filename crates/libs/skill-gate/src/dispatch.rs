//! Lifecycle hook registry and the single-pass dispatcher.

use crate::error::{HookError, SkillError, SkillResult};
use crate::request::{Request, RequestType};
use crate::response::Response;
use std::fmt;
use std::sync::Arc;

pub type HookResult = Result<(), HookError>;

/// Integrator callback run at one lifecycle point.
///
/// Hooks run synchronously on the request's task and mutate the response
/// in place. Any error aborts the request.
pub trait LifecycleHook: Send + Sync {
    fn handle(&self, response: &mut Response, request: &Request) -> HookResult;
}

impl<F> LifecycleHook for F
where
    F: Fn(&mut Response, &Request) -> HookResult + Send + Sync,
{
    fn handle(&self, response: &mut Response, request: &Request) -> HookResult {
        self(response, request)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecyclePoint {
    SessionStarted,
    Launch,
    Intent,
    AudioPlayer,
    SessionEnded,
}

impl LifecyclePoint {
    pub const ALL: [LifecyclePoint; 5] = [
        LifecyclePoint::SessionStarted,
        LifecyclePoint::Launch,
        LifecyclePoint::Intent,
        LifecyclePoint::AudioPlayer,
        LifecyclePoint::SessionEnded,
    ];

    /// Type-selected point for a request. `SessionStarted` is never
    /// selected here: it is derived from the session flag instead.
    pub fn for_request_type(request_type: RequestType) -> Option<Self> {
        match request_type {
            RequestType::Launch => Some(Self::Launch),
            RequestType::Intent => Some(Self::Intent),
            RequestType::SessionEnded => Some(Self::SessionEnded),
            RequestType::AudioPlayer => Some(Self::AudioPlayer),
            RequestType::Unhandled => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionStarted => "session_started",
            Self::Launch => "launch",
            Self::Intent => "intent",
            Self::AudioPlayer => "audio_player",
            Self::SessionEnded => "session_ended",
        }
    }
}

impl fmt::Display for LifecyclePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// At most one hook per lifecycle point. Built once during setup and
/// read-only afterwards.
#[derive(Clone, Default)]
pub struct HookRegistry {
    session_started: Option<Arc<dyn LifecycleHook>>,
    launch: Option<Arc<dyn LifecycleHook>>,
    intent: Option<Arc<dyn LifecycleHook>>,
    audio_player: Option<Arc<dyn LifecycleHook>>,
    session_ended: Option<Arc<dyn LifecycleHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_session_started<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Response, &Request) -> HookResult + Send + Sync + 'static,
    {
        self.with_hook(LifecyclePoint::SessionStarted, Arc::new(hook))
    }

    pub fn on_launch<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Response, &Request) -> HookResult + Send + Sync + 'static,
    {
        self.with_hook(LifecyclePoint::Launch, Arc::new(hook))
    }

    pub fn on_intent<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Response, &Request) -> HookResult + Send + Sync + 'static,
    {
        self.with_hook(LifecyclePoint::Intent, Arc::new(hook))
    }

    pub fn on_audio_player<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Response, &Request) -> HookResult + Send + Sync + 'static,
    {
        self.with_hook(LifecyclePoint::AudioPlayer, Arc::new(hook))
    }

    pub fn on_session_ended<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Response, &Request) -> HookResult + Send + Sync + 'static,
    {
        self.with_hook(LifecyclePoint::SessionEnded, Arc::new(hook))
    }

    /// Registers a hook object, replacing any previous hook at `point`.
    pub fn with_hook(mut self, point: LifecyclePoint, hook: Arc<dyn LifecycleHook>) -> Self {
        *self.slot_mut(point) = Some(hook);
        self
    }

    pub fn get(&self, point: LifecyclePoint) -> Option<&dyn LifecycleHook> {
        let slot = match point {
            LifecyclePoint::SessionStarted => &self.session_started,
            LifecyclePoint::Launch => &self.launch,
            LifecyclePoint::Intent => &self.intent,
            LifecyclePoint::AudioPlayer => &self.audio_player,
            LifecyclePoint::SessionEnded => &self.session_ended,
        };
        slot.as_deref()
    }

    pub fn is_registered(&self, point: LifecyclePoint) -> bool {
        self.get(point).is_some()
    }

    pub fn registered_points(&self) -> Vec<LifecyclePoint> {
        LifecyclePoint::ALL.into_iter().filter(|point| self.is_registered(*point)).collect()
    }

    fn slot_mut(&mut self, point: LifecyclePoint) -> &mut Option<Arc<dyn LifecycleHook>> {
        match point {
            LifecyclePoint::SessionStarted => &mut self.session_started,
            LifecyclePoint::Launch => &mut self.launch,
            LifecyclePoint::Intent => &mut self.intent,
            LifecyclePoint::AudioPlayer => &mut self.audio_player,
            LifecyclePoint::SessionEnded => &mut self.session_ended,
        }
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry").field("registered", &self.registered_points()).finish()
    }
}

/// Runs the hooks for one request and returns the points that ran.
///
/// The session-started hook goes first when the session is new, then at
/// most one type-selected hook. The first hook error stops dispatch.
pub fn dispatch(
    registry: &HookRegistry,
    request: &Request,
    response: &mut Response,
) -> SkillResult<Vec<LifecyclePoint>> {
    let mut ran = Vec::with_capacity(2);

    if request.is_new_session() {
        if let Some(hook) = registry.get(LifecyclePoint::SessionStarted) {
            run_hook(LifecyclePoint::SessionStarted, hook, request, response)?;
            ran.push(LifecyclePoint::SessionStarted);
        }
    }

    match LifecyclePoint::for_request_type(request.request_type()) {
        Some(point) => {
            if let Some(hook) = registry.get(point) {
                run_hook(point, hook, request, response)?;
                ran.push(point);
            }
        }
        None => {
            log::debug!(
                "dispatch: ignoring unhandled request type={}",
                request.request.request_type
            );
        }
    }

    Ok(ran)
}

fn run_hook(
    point: LifecyclePoint,
    hook: &dyn LifecycleHook,
    request: &Request,
    response: &mut Response,
) -> SkillResult<()> {
    log::debug!("dispatch: running {} hook request_id={}", point, request.request.request_id);
    hook.handle(response, request).map_err(|err| {
        log::warn!("dispatch: {} hook failed err={}", point, err);
        SkillError::Handler(err)
    })
}
