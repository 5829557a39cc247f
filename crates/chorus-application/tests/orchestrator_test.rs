use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chorus_application::{ConversationOrchestrator, EnableOutcome, RandomPacing, TurnOutcome};
use chorus_core::ChorusError;
use chorus_core::conversation::{Conversation, ConversationEvent, DEFAULT_TITLE, Message};
use chorus_core::engagement::{RunReport, StopReason};
use chorus_core::persona::{Persona, PersonaRegistry};
use chorus_interaction::{APOLOGY_TEXT, InferenceRouting, PersonaResponder, ProviderError};
use tokio::sync::{Semaphore, mpsc};

// Responder that answers immediately and records every call
#[derive(Default)]
struct ScriptedResponder {
    failing: HashSet<String>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedResponder {
    fn failing_for(persona_id: &str) -> Self {
        Self {
            failing: HashSet::from([persona_id.to_string()]),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PersonaResponder for ScriptedResponder {
    async fn respond(
        &self,
        persona: &Persona,
        history: &[Message],
    ) -> Result<Message, ProviderError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push((
            persona.id.clone(),
            history.iter().map(|m| m.content().to_string()).collect(),
        ));
        if self.failing.contains(&persona.id) {
            return Err(ProviderError::Transport("connection reset".to_string()));
        }
        Ok(Message::ai(
            persona.id.clone(),
            format!("{} reply {}", persona.name, calls.len()),
        ))
    }
}

// Responder that blocks until the test hands out a permit
struct GatedResponder {
    entered: mpsc::UnboundedSender<String>,
    permits: Arc<Semaphore>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl GatedResponder {
    fn new() -> (Self, mpsc::UnboundedReceiver<String>, Arc<Semaphore>) {
        let (entered, rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(0));
        (
            Self {
                entered,
                permits: permits.clone(),
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            },
            rx,
            permits,
        )
    }

    /// Highest number of calls that were pending at the same time.
    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersonaResponder for GatedResponder {
    async fn respond(
        &self,
        persona: &Persona,
        _history: &[Message],
    ) -> Result<Message, ProviderError> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        let _ = self.entered.send(persona.id.clone());
        let permit = self.permits.acquire().await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        permit
            .map_err(|e| ProviderError::Transport(e.to_string()))?
            .forget();
        Ok(Message::ai(persona.id.clone(), format!("{} speaks", persona.name)))
    }
}

// Router that replays scripted rounds, then repeats a fixed selection
struct ScriptedRouter {
    rounds: Mutex<VecDeque<Vec<&'static str>>>,
    then: Vec<&'static str>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedRouter {
    fn always(ids: &[&'static str]) -> Self {
        Self::scripted(Vec::new(), ids)
    }

    fn scripted(rounds: Vec<Vec<&'static str>>, then: &[&'static str]) -> Self {
        Self {
            rounds: Mutex::new(rounds.into()),
            then: then.to_vec(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceRouting for ScriptedRouter {
    async fn route_by_inference(
        &self,
        last_content: &str,
        participants: &[Persona],
    ) -> Vec<Persona> {
        self.calls.lock().unwrap().push((
            last_content.to_string(),
            participants.iter().map(|p| p.id.clone()).collect(),
        ));
        let selected = self
            .rounds
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.then.clone());
        participants
            .iter()
            .filter(|p| selected.iter().any(|id| *id == p.id))
            .cloned()
            .collect()
    }
}

// Router that always picks a persona from outside the conversation
struct OutsiderRouter(Persona);

#[async_trait]
impl InferenceRouting for OutsiderRouter {
    async fn route_by_inference(
        &self,
        _last_content: &str,
        _participants: &[Persona],
    ) -> Vec<Persona> {
        vec![self.0.clone()]
    }
}

fn orchestrator(
    participants: usize,
    responder: Arc<dyn PersonaResponder>,
    router: Arc<dyn InferenceRouting>,
) -> ConversationOrchestrator {
    let registry = Arc::new(PersonaRegistry::with_defaults());
    let conversation = Conversation::new(DEFAULT_TITLE, registry.initial_participants(participants));
    ConversationOrchestrator::new(conversation, registry, responder, router)
}

fn authors(messages: &[Message]) -> Vec<Option<String>> {
    messages
        .iter()
        .map(|m| m.persona_id().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_unmentioned_message_goes_to_everyone_in_order() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(2, responder.clone(), Arc::new(ScriptedRouter::always(&[])));

    let outcome = orch.send_message("  hello  ").await.unwrap();
    let TurnOutcome::Direct { responses } = outcome else {
        panic!("expected a direct turn");
    };
    assert_eq!(responses.len(), 2);

    let messages = orch.messages().await;
    assert_eq!(messages[0].content(), "hello @all");
    assert_eq!(
        authors(&messages),
        vec![
            None,
            Some("ai-assistant".to_string()),
            Some("ai-analyst".to_string())
        ]
    );
}

#[tokio::test]
async fn test_later_responders_see_earlier_replies() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(2, responder.clone(), Arc::new(ScriptedRouter::always(&[])));

    orch.send_message("hello").await.unwrap();

    let calls = responder.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, vec!["hello @all".to_string()]);
    assert_eq!(
        calls[1].1,
        vec!["hello @all".to_string(), "assistant reply 1".to_string()]
    );
}

#[tokio::test]
async fn test_mention_selects_single_persona() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(3, responder.clone(), Arc::new(ScriptedRouter::always(&[])));

    orch.send_message("@analyst what do you think?").await.unwrap();

    let calls = responder.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "ai-analyst");
    assert_eq!(orch.messages().await[0].content(), "@analyst what do you think?");
}

#[tokio::test]
async fn test_failed_reply_becomes_apology_and_batch_continues() {
    let responder = Arc::new(ScriptedResponder::failing_for("ai-assistant"));
    let orch = orchestrator(2, responder.clone(), Arc::new(ScriptedRouter::always(&[])));

    orch.send_message("@all status?").await.unwrap();

    let messages = orch.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].persona_id(), Some("ai-assistant"));
    assert_eq!(messages[1].content(), APOLOGY_TEXT);
    assert_eq!(messages[2].persona_id(), Some("ai-analyst"));
    assert_eq!(messages[2].content(), "analyst reply 2");
}

#[tokio::test]
async fn test_blank_input_is_rejected() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(2, responder.clone(), Arc::new(ScriptedRouter::always(&[])));

    assert_eq!(orch.send_message("   ").await, Err(ChorusError::EmptyInput));
    assert!(orch.messages().await.is_empty());
    assert!(responder.calls().is_empty());
}

#[tokio::test]
async fn test_run_stops_exactly_at_budget() {
    let responder = Arc::new(ScriptedResponder::default());
    let router = Arc::new(ScriptedRouter::always(&["ai-assistant", "ai-analyst"]));
    let orch = orchestrator(2, responder.clone(), router.clone());

    assert_eq!(
        orch.enable_self_engagement(Some(3)).await.unwrap(),
        EnableOutcome::Armed
    );
    let outcome = orch.send_message("Let's debate tabs versus spaces").await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::SelfEngagement(RunReport {
            produced: 3,
            reason: StopReason::BudgetReached,
        })
    );
    let messages = orch.messages().await;
    assert_eq!(messages.len(), 4);
    assert_eq!(
        authors(&messages[1..]),
        vec![
            Some("ai-assistant".to_string()),
            Some("ai-analyst".to_string()),
            Some("ai-assistant".to_string())
        ]
    );
    assert_eq!(router.calls().len(), 2);
    assert!(!orch.is_run_in_progress());
    assert!(orch.is_self_engage_enabled());
}

#[tokio::test]
async fn test_router_routes_on_latest_message() {
    let responder = Arc::new(ScriptedResponder::default());
    let router = Arc::new(ScriptedRouter::scripted(vec![vec!["ai-analyst"]], &[]));
    let orch = orchestrator(2, responder.clone(), router.clone());

    orch.enable_self_engagement(Some(5)).await.unwrap();
    orch.send_message("@all kick off").await.unwrap();

    let calls = router.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].0, "@all kick off");
    assert_eq!(calls[1].0, "analyst reply 1");
}

#[tokio::test]
async fn test_empty_selection_ends_run() {
    let responder = Arc::new(ScriptedResponder::default());
    let router = Arc::new(ScriptedRouter::always(&[]));
    let orch = orchestrator(2, responder.clone(), router.clone());

    orch.enable_self_engagement(None).await.unwrap();
    let outcome = orch.send_message("anyone?").await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::SelfEngagement(RunReport {
            produced: 0,
            reason: StopReason::NoResponders,
        })
    );
    assert!(responder.calls().is_empty());
    assert_eq!(orch.messages().await.len(), 1);
    assert!(!orch.is_run_in_progress());
}

#[tokio::test]
async fn test_enable_requires_two_participants() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(1, responder, Arc::new(ScriptedRouter::always(&[])));

    let err = orch.enable_self_engagement(None).await.unwrap_err();
    assert_eq!(
        err,
        ChorusError::NotEnoughParticipants {
            required: 2,
            actual: 1
        }
    );
    assert!(!orch.is_self_engage_enabled());
}

#[tokio::test]
async fn test_enable_rejects_zero_budget() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(2, responder, Arc::new(ScriptedRouter::always(&[])));

    let err = orch.enable_self_engagement(Some(0)).await.unwrap_err();
    assert_eq!(err, ChorusError::InvalidBudget(0));
    assert!(!orch.is_self_engage_enabled());
    assert_eq!(orch.budget(), 10);
}

#[tokio::test]
async fn test_enable_with_history_runs_immediately() {
    let responder = Arc::new(ScriptedResponder::default());
    let router = Arc::new(ScriptedRouter::scripted(vec![vec!["ai-critic"]], &[]));
    let orch = orchestrator(3, responder.clone(), router);

    orch.send_message("@assistant draft a plan").await.unwrap();
    let outcome = orch.enable_self_engagement(Some(4)).await.unwrap();

    assert_eq!(
        outcome,
        EnableOutcome::Ran(RunReport {
            produced: 1,
            reason: StopReason::NoResponders,
        })
    );
    assert_eq!(orch.messages().await.len(), 3);
}

#[tokio::test]
async fn test_run_refused_without_history() {
    let responder = Arc::new(ScriptedResponder::default());
    let router = Arc::new(ScriptedRouter::always(&["ai-assistant"]));
    let orch = orchestrator(2, responder, router.clone());

    let report = orch.run_self_engagement().await;
    assert_eq!(report, RunReport::refused(StopReason::EmptyHistory));
    assert!(router.calls().is_empty());
    assert!(!orch.is_run_in_progress());
}

#[tokio::test]
async fn test_removal_below_two_disables_self_engagement() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(2, responder, Arc::new(ScriptedRouter::always(&[])));

    orch.enable_self_engagement(None).await.unwrap();
    assert!(orch.is_self_engage_enabled());

    let removed = orch.remove_participant("Analyst").await.unwrap();
    assert_eq!(removed.id, "ai-analyst");
    assert!(!orch.is_self_engage_enabled());

    let err = orch.remove_participant("assistant").await.unwrap_err();
    assert!(matches!(err, ChorusError::LastParticipant(_)));
    assert_eq!(orch.participants().await.len(), 1);
}

#[tokio::test]
async fn test_add_participant_from_registry() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = orchestrator(2, responder, Arc::new(ScriptedRouter::always(&[])));

    let added = orch.add_participant("creative").await.unwrap();
    assert_eq!(added.id, "ai-creative");

    let err = orch.add_participant("ai-creative").await.unwrap_err();
    assert!(matches!(err, ChorusError::AlreadyParticipant(_)));
    assert!(orch.add_participant("nobody").await.unwrap_err().is_not_found());

    let ids: Vec<_> = orch.participants().await.into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec!["ai-assistant", "ai-analyst", "ai-creative"]);
}

#[tokio::test]
async fn test_enable_during_run_is_noop() {
    let (responder, mut entered, permits) = GatedResponder::new();
    let router = Arc::new(ScriptedRouter::always(&["ai-assistant"]));
    let orch = Arc::new(orchestrator(2, Arc::new(responder), router.clone()));

    assert_eq!(
        orch.enable_self_engagement(Some(1)).await.unwrap(),
        EnableOutcome::Armed
    );
    let runner = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.send_message("go").await })
    };

    assert_eq!(entered.recv().await.as_deref(), Some("ai-assistant"));
    assert!(orch.is_run_in_progress());

    assert_eq!(
        orch.enable_self_engagement(Some(5)).await.unwrap(),
        EnableOutcome::AlreadyRunning
    );
    assert_eq!(orch.budget(), 1);
    assert_eq!(
        orch.run_self_engagement().await,
        RunReport::refused(StopReason::AlreadyRunning)
    );
    assert!(matches!(
        orch.send_message("me too").await,
        Err(ChorusError::Busy(_))
    ));

    permits.add_permits(1);
    let outcome = runner.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::SelfEngagement(RunReport {
            produced: 1,
            reason: StopReason::BudgetReached,
        })
    );
    assert_eq!(router.calls().len(), 1);
    assert!(!orch.is_run_in_progress());
    assert!(orch.is_self_engage_enabled());
}

#[tokio::test]
async fn test_cancelled_run_clears_flag() {
    let (responder, mut entered, permits) = GatedResponder::new();
    let router = Arc::new(ScriptedRouter::always(&["ai-assistant"]));
    let orch = Arc::new(orchestrator(2, Arc::new(responder), router));

    permits.add_permits(1);
    orch.send_message("@analyst warm up").await.unwrap();
    assert_eq!(entered.recv().await.as_deref(), Some("ai-analyst"));

    let handle = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.run_self_engagement().await })
    };
    assert_eq!(entered.recv().await.as_deref(), Some("ai-assistant"));
    assert!(orch.is_run_in_progress());

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());
    assert!(!orch.is_run_in_progress());
}

#[tokio::test]
async fn test_participants_reread_between_rounds() {
    let (responder, mut entered, permits) = GatedResponder::new();
    let router = Arc::new(ScriptedRouter::always(&["ai-assistant"]));
    let orch = Arc::new(orchestrator(2, Arc::new(responder), router.clone()));

    orch.enable_self_engagement(Some(2)).await.unwrap();
    let runner = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.send_message("begin").await })
    };

    entered.recv().await;
    orch.add_participant("critic").await.unwrap();
    permits.add_permits(2);
    runner.await.unwrap().unwrap();

    let calls = router.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, vec!["ai-assistant", "ai-analyst"]);
    assert_eq!(calls[1].1, vec!["ai-assistant", "ai-analyst", "ai-critic"]);
}

#[tokio::test]
async fn test_reply_from_removed_persona_is_dropped() {
    let (responder, mut entered, permits) = GatedResponder::new();
    let orch = Arc::new(orchestrator(
        3,
        Arc::new(responder),
        Arc::new(ScriptedRouter::always(&[])),
    ));

    let runner = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.send_message("@critic thoughts?").await })
    };
    assert_eq!(entered.recv().await.as_deref(), Some("ai-critic"));
    orch.remove_participant("ai-critic").await.unwrap();
    permits.add_permits(1);

    let outcome = runner.await.unwrap().unwrap();
    assert_eq!(outcome, TurnOutcome::Direct { responses: vec![] });
    assert_eq!(orch.messages().await.len(), 1);
}

#[tokio::test]
async fn test_observer_sees_lifecycle_events() {
    let responder = Arc::new(ScriptedResponder::default());
    let router = Arc::new(ScriptedRouter::always(&["ai-analyst"]));
    let orch = orchestrator(2, responder, router);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    orch.subscribe(Arc::new(move |event: &ConversationEvent| {
        let label = match event {
            ConversationEvent::MessageAppended { message } => {
                format!("message:{}", message.persona_id().unwrap_or("human"))
            }
            ConversationEvent::ParticipantAdded { persona } => format!("added:{}", persona.id),
            ConversationEvent::ParticipantRemoved { persona } => {
                format!("removed:{}", persona.id)
            }
            ConversationEvent::SelfEngagementToggled { enabled } => format!("toggled:{enabled}"),
            ConversationEvent::SelfEngagementStarted { budget } => format!("started:{budget}"),
            ConversationEvent::SelfEngagementFinished { produced, .. } => {
                format!("finished:{produced}")
            }
        };
        sink.lock().unwrap().push(label);
    }));

    orch.enable_self_engagement(Some(2)).await.unwrap();
    orch.send_message("go").await.unwrap();
    orch.disable_self_engagement().await;

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            "toggled:true",
            "message:human",
            "started:2",
            "message:ai-analyst",
            "message:ai-analyst",
            "finished:2",
            "toggled:false",
        ]
    );
}

#[tokio::test]
async fn test_enable_during_direct_batch_arms_without_overlap() {
    let (responder, mut entered, permits) = GatedResponder::new();
    let responder = Arc::new(responder);
    let router = Arc::new(ScriptedRouter::always(&["ai-analyst"]));
    let orch = Arc::new(orchestrator(2, responder.clone(), router.clone()));

    let batch = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.send_message("@assistant hello").await })
    };
    assert_eq!(entered.recv().await.as_deref(), Some("ai-assistant"));

    assert_eq!(
        orch.enable_self_engagement(Some(1)).await.unwrap(),
        EnableOutcome::Armed
    );
    assert!(orch.is_self_engage_enabled());
    assert!(!orch.is_run_in_progress());
    assert_eq!(orch.budget(), 1);
    assert_eq!(
        orch.run_self_engagement().await,
        RunReport::refused(StopReason::Busy)
    );
    assert!(router.calls().is_empty());

    permits.add_permits(1);
    let outcome = batch.await.unwrap().unwrap();
    assert!(matches!(outcome, TurnOutcome::Direct { ref responses } if responses.len() == 1));

    permits.add_permits(1);
    let outcome = orch.send_message("carry on").await.unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::SelfEngagement(RunReport {
            produced: 1,
            reason: StopReason::BudgetReached,
        })
    );
    assert_eq!(responder.peak(), 1);
}

#[tokio::test]
async fn test_send_during_start_delay_is_busy() {
    let responder = Arc::new(ScriptedResponder::default());
    let router = Arc::new(ScriptedRouter::always(&["ai-assistant"]));
    let orch = Arc::new(
        orchestrator(2, responder.clone(), router)
            .with_pacing(Arc::new(RandomPacing::from_millis(0, 0, 200))),
    );

    orch.send_message("@assistant hi").await.unwrap();
    let enabling = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.enable_self_engagement(Some(1)).await })
    };
    while !orch.is_run_in_progress() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        orch.send_message("me too").await,
        Err(ChorusError::Busy(_))
    ));

    let outcome = enabling.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        EnableOutcome::Ran(RunReport {
            produced: 1,
            reason: StopReason::BudgetReached,
        })
    );
    let contents: Vec<_> = orch
        .messages()
        .await
        .iter()
        .map(|m| m.content().to_string())
        .collect();
    assert_eq!(
        contents,
        vec!["@assistant hi", "assistant reply 1", "assistant reply 2"]
    );
}

#[tokio::test]
async fn test_dropped_replies_count_toward_budget() {
    let responder = Arc::new(ScriptedResponder::default());
    let registry = PersonaRegistry::with_defaults();
    let outsider = registry.resolve("critic").unwrap().clone();
    let orch = orchestrator(2, responder.clone(), Arc::new(OutsiderRouter(outsider)));

    orch.enable_self_engagement(Some(3)).await.unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), orch.send_message("hello"))
        .await
        .expect("run should end at its budget")
        .unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::SelfEngagement(RunReport {
            produced: 0,
            reason: StopReason::BudgetReached,
        })
    );
    assert_eq!(responder.calls().len(), 3);
    assert_eq!(orch.messages().await.len(), 1);
    assert!(!orch.is_run_in_progress());
}

#[tokio::test]
async fn test_removal_mid_run_finishes_run_and_disables_flag() {
    let (responder, mut entered, permits) = GatedResponder::new();
    let router = Arc::new(ScriptedRouter::always(&["ai-assistant"]));
    let orch = Arc::new(orchestrator(2, Arc::new(responder), router.clone()));

    orch.enable_self_engagement(Some(3)).await.unwrap();
    let runner = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.send_message("begin").await })
    };
    assert_eq!(entered.recv().await.as_deref(), Some("ai-assistant"));

    orch.remove_participant("analyst").await.unwrap();
    assert!(!orch.is_self_engage_enabled());
    assert!(orch.is_run_in_progress());

    permits.add_permits(3);
    let outcome = runner.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        TurnOutcome::SelfEngagement(RunReport {
            produced: 3,
            reason: StopReason::BudgetReached,
        })
    );
    assert!(!orch.is_run_in_progress());
    assert!(!orch.is_self_engage_enabled());
    assert_eq!(router.calls().len(), 3);

    permits.add_permits(1);
    let next = orch.send_message("anyone there?").await.unwrap();
    assert!(matches!(next, TurnOutcome::Direct { ref responses } if responses.len() == 1));
    assert_eq!(router.calls().len(), 3);
}

#[tokio::test]
async fn test_observer_can_read_state_without_waiting() {
    let responder = Arc::new(ScriptedResponder::default());
    let orch = Arc::new(orchestrator(
        2,
        responder,
        Arc::new(ScriptedRouter::always(&[])),
    ));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let weak = Arc::downgrade(&orch);
    orch.subscribe(Arc::new(move |event: &ConversationEvent| {
        if let ConversationEvent::MessageAppended { .. } = event {
            let len = weak
                .upgrade()
                .and_then(|orch| orch.try_messages())
                .map(|messages| messages.len());
            sink.lock().unwrap().push(len);
        }
    }));

    orch.send_message("@assistant hi").await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![Some(1), Some(2)]);
}
