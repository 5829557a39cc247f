//! Conversation orchestration.
//!
//! `ConversationOrchestrator` owns one conversation and drives both reply
//! modes on top of it:
//!
//! - **Direct mode**: a human message is routed by its mentions and the
//!   selected personas reply once each, in participant order.
//! - **Self-engagement**: an inference router picks responders round after
//!   round until the decider selects nobody or the message budget is spent.
//!
//! # Concurrency
//!
//! The orchestrator is shared behind an `Arc` and every operation takes
//! `&self`. Conversation state sits behind a `tokio::sync::RwLock` that is
//! never held across a provider call, so participants can be edited while a
//! run is waiting on a reply. Each round re-reads the participant list.
//!
//! Completion calls for the conversation never overlap: a direct reply batch
//! and a self-engagement run both hold the same activity slot for their whole
//! duration, start delay included.
//!
//! Observers are called after the state lock has been released, in the order
//! the events happened.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chorus_core::conversation::{
    Conversation, ConversationEvent, ConversationObserver, ConversationState, Message,
};
use chorus_core::engagement::{
    CONTINUE_PLACEHOLDER, MIN_SELF_ENGAGE_PARTICIPANTS, RunReport, SelfEngagementConfig,
    StopReason,
};
use chorus_core::error::{ChorusError, Result};
use chorus_core::persona::{Persona, PersonaRegistry};
use chorus_core::routing::{normalize_outgoing, route_by_mention};
use chorus_interaction::{InferenceRouting, PersonaResponder, apology_message};
use tokio::sync::RwLock;

use crate::pacing::{NoPacing, PacingPolicy, pause};

/// Result of [`ConversationOrchestrator::send_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Replies produced by the mention-routed personas, in append order.
    Direct { responses: Vec<Message> },
    /// The message triggered an autonomous run.
    SelfEngagement(RunReport),
}

/// Result of [`ConversationOrchestrator::enable_self_engagement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    /// Enabled with an empty history; the next human message starts a run.
    Armed,
    /// Enabled and a run was executed immediately.
    Ran(RunReport),
    /// A run is already active; nothing changed.
    AlreadyRunning,
}

/// What the conversation is currently doing with the completion provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Activity {
    Idle = 0,
    /// Answering a human message in direct mode.
    Direct = 1,
    /// A self-engagement run, from its start delay to its last reply.
    Running = 2,
}

impl Activity {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Activity::Direct,
            2 => Activity::Running,
            _ => Activity::Idle,
        }
    }
}

/// Holds the conversation's activity slot; resets it to idle when dropped,
/// including on cancellation or panic.
struct ActivityGuard<'a> {
    slot: &'a AtomicU8,
}

impl<'a> ActivityGuard<'a> {
    /// Claims the idle slot, or reports what currently holds it.
    fn begin(slot: &'a AtomicU8, activity: Activity) -> std::result::Result<Self, Activity> {
        slot.compare_exchange(
            Activity::Idle as u8,
            activity as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        )
        .map(|_| Self { slot })
        .map_err(Activity::from_u8)
    }

    fn switch(&self, activity: Activity) {
        self.slot.store(activity as u8, Ordering::SeqCst);
    }
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.slot.store(Activity::Idle as u8, Ordering::SeqCst);
    }
}

type EventQueue = Arc<Mutex<Vec<ConversationEvent>>>;

/// Drives direct replies and autonomous runs for a single conversation.
pub struct ConversationOrchestrator {
    state: RwLock<ConversationState>,
    registry: Arc<PersonaRegistry>,
    responder: Arc<dyn PersonaResponder>,
    router: Arc<dyn InferenceRouting>,
    pacing: Arc<dyn PacingPolicy>,
    budget: AtomicUsize,
    self_engage_enabled: AtomicBool,
    activity: AtomicU8,
    observers: Mutex<Vec<Arc<dyn ConversationObserver>>>,
    /// Events recorded under the state lock, waiting to be delivered.
    pending: EventQueue,
    dispatch: Mutex<()>,
}

impl ConversationOrchestrator {
    /// Creates an orchestrator with self-engagement disabled and no pacing.
    pub fn new(
        conversation: Conversation,
        registry: Arc<PersonaRegistry>,
        responder: Arc<dyn PersonaResponder>,
        router: Arc<dyn InferenceRouting>,
    ) -> Self {
        let pending = EventQueue::default();
        let mut state = ConversationState::new(conversation);
        let queue = pending.clone();
        state.subscribe(Arc::new(move |event: &ConversationEvent| {
            queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        }));

        Self {
            state: RwLock::new(state),
            registry,
            responder,
            router,
            pacing: Arc::new(NoPacing),
            budget: AtomicUsize::new(SelfEngagementConfig::default().max_messages),
            self_engage_enabled: AtomicBool::new(false),
            activity: AtomicU8::new(Activity::Idle as u8),
            observers: Mutex::new(Vec::new()),
            pending,
            dispatch: Mutex::new(()),
        }
    }

    pub fn with_pacing(mut self, pacing: Arc<dyn PacingPolicy>) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_config(self, config: SelfEngagementConfig) -> Self {
        self.budget.store(config.max_messages, Ordering::SeqCst);
        self
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    /// Snapshot of the message history.
    pub async fn messages(&self) -> Vec<Message> {
        self.state.read().await.messages().to_vec()
    }

    /// Snapshot of the participant list.
    pub async fn participants(&self) -> Vec<Persona> {
        self.state.read().await.participants().to_vec()
    }

    /// Snapshot of the whole conversation.
    pub async fn conversation(&self) -> Conversation {
        self.state.read().await.conversation().clone()
    }

    /// History snapshot that never waits; `None` while the state is being
    /// written. Safe to call from inside an observer.
    pub fn try_messages(&self) -> Option<Vec<Message>> {
        self.state
            .try_read()
            .ok()
            .map(|state| state.messages().to_vec())
    }

    /// Registers an observer for all subsequent conversation events.
    ///
    /// Observers run on the task that caused the event, after the state lock
    /// is released. They must not block.
    pub fn subscribe(&self, observer: Arc<dyn ConversationObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn budget(&self) -> usize {
        self.budget.load(Ordering::SeqCst)
    }

    pub fn is_self_engage_enabled(&self) -> bool {
        self.self_engage_enabled.load(Ordering::SeqCst)
    }

    pub fn is_run_in_progress(&self) -> bool {
        self.activity() == Activity::Running
    }

    fn activity(&self) -> Activity {
        Activity::from_u8(self.activity.load(Ordering::SeqCst))
    }

    /// Sets the message budget used by subsequent runs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBudget` for zero.
    pub fn set_budget(&self, max_messages: usize) -> Result<()> {
        let config = SelfEngagementConfig::new(max_messages)?;
        self.budget.store(config.max_messages, Ordering::SeqCst);
        tracing::debug!(target: "chorus::engagement", budget = max_messages, "Budget updated");
        Ok(())
    }

    /// Submits a human message.
    ///
    /// The text is normalized (an `@all` is appended when it mentions nobody)
    /// and appended. With self-engagement enabled this starts an autonomous
    /// run after the start delay; otherwise the mention-routed personas reply.
    ///
    /// # Errors
    ///
    /// - `EmptyInput` for blank text
    /// - `Busy` while another turn or a run (start delay included) is in progress
    pub async fn send_message(&self, text: &str) -> Result<TurnOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChorusError::EmptyInput);
        }
        let turn = match ActivityGuard::begin(&self.activity, Activity::Direct) {
            Ok(turn) => turn,
            Err(Activity::Running) => {
                return Err(ChorusError::busy("self-engagement run in progress"));
            }
            Err(_) => return Err(ChorusError::busy("still waiting for responses")),
        };

        let content = normalize_outgoing(text);
        let routed = self.append_human(&content).await;
        self.flush_events();
        let responders = routed?;

        if self.is_self_engage_enabled() {
            tracing::info!(target: "chorus::engagement", "Human message triggers self-engagement");
            turn.switch(Activity::Running);
            pause(self.pacing.start_delay()).await;
            return Ok(TurnOutcome::SelfEngagement(self.run_rounds(&turn).await));
        }

        tracing::info!(
            target: "chorus::routing",
            responders = ?responders.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Routing human message"
        );

        let mut responses = Vec::with_capacity(responders.len());
        for persona in &responders {
            if let Some(message) = self.reply_as(persona).await {
                responses.push(message);
            }
        }

        Ok(TurnOutcome::Direct { responses })
    }

    /// Turns self-engagement on, optionally with a new budget.
    ///
    /// If the conversation already has messages a run starts right away.
    /// While a direct reply batch is still being answered the flag is only
    /// armed, and the next human message starts the run.
    ///
    /// # Errors
    ///
    /// - `NotEnoughParticipants` with fewer than two participants
    /// - `InvalidBudget` for a zero budget
    pub async fn enable_self_engagement(&self, budget: Option<usize>) -> Result<EnableOutcome> {
        let participants = self.state.read().await.participants().len();
        if participants < MIN_SELF_ENGAGE_PARTICIPANTS {
            return Err(ChorusError::NotEnoughParticipants {
                required: MIN_SELF_ENGAGE_PARTICIPANTS,
                actual: participants,
            });
        }
        let config = budget.map(SelfEngagementConfig::new).transpose()?;

        let run = match ActivityGuard::begin(&self.activity, Activity::Running) {
            Ok(run) => Some(run),
            Err(Activity::Running) => {
                tracing::debug!(target: "chorus::engagement", "Run already in progress, ignoring enable");
                return Ok(EnableOutcome::AlreadyRunning);
            }
            Err(_) => None,
        };

        if let Some(config) = config {
            self.set_budget(config.max_messages)?;
        }
        self.set_self_engagement(true).await;

        let Some(run) = run else {
            tracing::debug!(
                target: "chorus::engagement",
                "Direct replies pending, run starts with the next message"
            );
            return Ok(EnableOutcome::Armed);
        };
        if self.state.read().await.messages().is_empty() {
            return Ok(EnableOutcome::Armed);
        }

        pause(self.pacing.start_delay()).await;
        Ok(EnableOutcome::Ran(self.run_rounds(&run).await))
    }

    /// Turns self-engagement off. A run already in progress finishes normally.
    pub async fn disable_self_engagement(&self) {
        self.set_self_engagement(false).await;
    }

    /// Adds a persona from the registry by id or name.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the registry has no such persona
    /// - `AlreadyParticipant` if it is already taking part
    pub async fn add_participant(&self, id_or_name: &str) -> Result<Persona> {
        let persona = self.registry.resolve(id_or_name)?.clone();
        let added = self.state.write().await.add_participant(persona.clone());
        self.flush_events();
        added?;
        tracing::info!(target: "chorus::participants", persona = %persona.name, "Participant added");
        Ok(persona)
    }

    /// Removes a participant by id or name.
    ///
    /// Self-engagement is switched off when fewer than two participants remain.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no participant matches
    /// - `LastParticipant` if it is the only one left
    pub async fn remove_participant(&self, id_or_name: &str) -> Result<Persona> {
        let removed = self.remove_from_state(id_or_name).await;
        self.flush_events();
        removed
    }

    async fn remove_from_state(&self, id_or_name: &str) -> Result<Persona> {
        let mut state = self.state.write().await;
        let persona_id = state
            .participants()
            .iter()
            .find(|p| p.id == id_or_name || p.has_name(id_or_name))
            .map(|p| p.id.clone())
            .ok_or_else(|| ChorusError::not_found("participant", id_or_name))?;

        let removed = state.remove_participant(&persona_id)?;
        tracing::info!(target: "chorus::participants", persona = %removed.name, "Participant removed");

        if state.participants().len() < MIN_SELF_ENGAGE_PARTICIPANTS
            && self.self_engage_enabled.swap(false, Ordering::SeqCst)
        {
            tracing::info!(
                target: "chorus::engagement",
                "Self-engagement disabled: not enough participants"
            );
            self.queue_event(ConversationEvent::SelfEngagementToggled { enabled: false });
        }

        Ok(removed)
    }

    /// Runs one bounded autonomous conversation.
    ///
    /// Each round asks the inference router who should reply to the latest
    /// message, then lets the selected personas reply one after another. The
    /// run stops when the router selects nobody or `budget` turns have been
    /// taken. At most one run is active at a time, and none starts while a
    /// direct reply batch is pending. The activity slot is released however
    /// the run ends.
    pub async fn run_self_engagement(&self) -> RunReport {
        match ActivityGuard::begin(&self.activity, Activity::Running) {
            Ok(run) => self.run_rounds(&run).await,
            Err(Activity::Running) => {
                tracing::debug!(target: "chorus::engagement", "Run refused: already running");
                RunReport::refused(StopReason::AlreadyRunning)
            }
            Err(_) => {
                tracing::debug!(target: "chorus::engagement", "Run refused: direct replies pending");
                RunReport::refused(StopReason::Busy)
            }
        }
    }

    /// The run loop. Callers hold the activity slot for its whole duration.
    ///
    /// Every turn counts toward the budget, whether or not its reply could be
    /// appended; `produced` counts only the appended replies.
    async fn run_rounds(&self, _run: &ActivityGuard<'_>) -> RunReport {
        if self.state.read().await.messages().is_empty() {
            tracing::warn!(
                target: "chorus::engagement",
                "Cannot start self-engagement with no messages"
            );
            return RunReport::refused(StopReason::EmptyHistory);
        }

        let budget = self.budget();
        tracing::info!(target: "chorus::engagement", budget, "Self-engagement started");
        self.emit(ConversationEvent::SelfEngagementStarted { budget });

        let mut turns = 0;
        let mut produced = 0;
        let reason = loop {
            if turns >= budget {
                break StopReason::BudgetReached;
            }

            let (last_content, participants) = {
                let state = self.state.read().await;
                let last_content = state
                    .conversation()
                    .last_message()
                    .map(|m| m.content().to_string())
                    .unwrap_or_else(|| CONTINUE_PLACEHOLDER.to_string());
                (last_content, state.participants().to_vec())
            };

            let responders = self
                .router
                .route_by_inference(&last_content, &participants)
                .await;
            if responders.is_empty() {
                tracing::info!(
                    target: "chorus::engagement",
                    "No AIs selected to respond, ending self-engagement"
                );
                break StopReason::NoResponders;
            }

            tracing::debug!(
                target: "chorus::engagement",
                responders = ?responders.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
                "Round selected"
            );

            for persona in &responders {
                turns += 1;
                if self.reply_as(persona).await.is_some() {
                    produced += 1;
                }
                if turns >= budget {
                    break;
                }
                pause(self.pacing.turn_delay()).await;
            }
        };

        tracing::info!(
            target: "chorus::engagement",
            turns,
            produced,
            ?reason,
            "Self-engagement completed"
        );
        self.emit(ConversationEvent::SelfEngagementFinished { produced, reason });

        RunReport { produced, reason }
    }

    /// Asks one persona for a reply against the current history and appends it.
    ///
    /// A failed completion is replaced by the apology message. Returns `None`
    /// when the persona left the conversation while its reply was pending.
    async fn reply_as(&self, persona: &Persona) -> Option<Message> {
        let history = self.messages().await;

        let message = match self.responder.respond(persona, &history).await {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    target: "chorus::completion",
                    persona = %persona.name,
                    error = %e,
                    "Completion failed, posting apology"
                );
                apology_message(persona)
            }
        };

        let appended = self
            .state
            .write()
            .await
            .append_message(message)
            .cloned();
        self.flush_events();

        match appended {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(
                    target: "chorus::completion",
                    persona = %persona.name,
                    error = %e,
                    "Dropping reply"
                );
                None
            }
        }
    }

    /// Appends the human message and routes it by its mentions.
    async fn append_human(&self, content: &str) -> Result<Vec<Persona>> {
        let mut state = self.state.write().await;
        state.append_message(Message::human(content))?;
        Ok(route_by_mention(content, state.participants()))
    }

    async fn set_self_engagement(&self, enabled: bool) {
        {
            let _state = self.state.read().await;
            if self.self_engage_enabled.swap(enabled, Ordering::SeqCst) != enabled {
                tracing::info!(target: "chorus::engagement", enabled, "Self-engagement toggled");
                self.queue_event(ConversationEvent::SelfEngagementToggled { enabled });
            }
        }
        self.flush_events();
    }

    fn emit(&self, event: ConversationEvent) {
        self.queue_event(event);
        self.flush_events();
    }

    fn queue_event(&self, event: ConversationEvent) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Delivers queued events. Must not be called with the state lock held.
    fn flush_events(&self) {
        let _dispatch = self.dispatch.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let events = std::mem::take(
                &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if events.is_empty() {
                break;
            }
            let observers = self
                .observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            for event in &events {
                for observer in &observers {
                    observer.on_event(event);
                }
            }
        }
    }
}
