//! Store runtime executor

use super::traits::{Clock, SnapshotStore};
use super::{Envelope, StoreHandle, StoreUpdate};

use crate::catalog;
use crate::generation::GenerationClient;
use crate::store::state::ChatMessage;
use crate::store::{transition, AppState, Effect, Event, PersistedSnapshot, StoreContext};
use chrono::NaiveDate;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Upper bound on welcome, summary and challenge calls
const ONE_SHOT_TIMEOUT: Duration = Duration::from_secs(30);

/// Single-writer runtime that owns the store state
pub struct StoreRuntime<G, S, C>
where
    G: GenerationClient + 'static,
    S: SnapshotStore + 'static,
    C: Clock + 'static,
{
    context: StoreContext,
    state: AppState,
    generation: Arc<G>,
    snapshots: S,
    clock: C,
    event_rx: mpsc::Receiver<Envelope>,
    /// Weak so the loop ends once every handle and task is gone
    event_tx: mpsc::WeakSender<Envelope>,
    state_tx: watch::Sender<Arc<AppState>>,
    updates_tx: broadcast::Sender<StoreUpdate>,
    /// Token to cancel the running welcome or reply generation
    generation_cancel_token: Option<CancellationToken>,
}

impl<G, S, C> StoreRuntime<G, S, C>
where
    G: GenerationClient + 'static,
    S: SnapshotStore + 'static,
    C: Clock + 'static,
{
    pub fn new(
        context: StoreContext,
        state: AppState,
        generation: G,
        snapshots: S,
        clock: C,
    ) -> (Self, StoreHandle) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (state_tx, state_rx) = watch::channel(Arc::new(state.clone()));
        let (updates_tx, _) = broadcast::channel(256);

        let weak_tx = event_tx.downgrade();
        let handle = StoreHandle {
            event_tx,
            state_rx,
            updates_tx: updates_tx.clone(),
        };
        let runtime = Self {
            context,
            state,
            generation: Arc::new(generation),
            snapshots,
            clock,
            event_rx,
            event_tx: weak_tx,
            state_tx,
            updates_tx,
            generation_cancel_token: None,
        };
        (runtime, handle)
    }

    pub async fn run(mut self) {
        tracing::info!(
            model = %self.generation.model_id(),
            screen = ?self.state.screen,
            "Starting store runtime"
        );

        // Process events in a loop - no recursion
        loop {
            tokio::select! {
                Some(envelope) = self.event_rx.recv() => {
                    self.process_event(envelope).await;
                }
                else => break,
            }
        }

        if let Some(token) = self.generation_cancel_token.take() {
            token.cancel();
        }
        tracing::info!("Store runtime stopped");
    }

    async fn process_event(&mut self, envelope: Envelope) {
        let Envelope { event, ack } = envelope;
        let now = self.clock.now();

        // Pure state transition
        let result = match transition(&self.state, &self.context, now, event) {
            Ok(r) => r,
            Err(e) => {
                // Precondition failures are user-facing and leave state untouched
                tracing::debug!(error = %e, "Action rejected");
                let _ = self.updates_tx.send(StoreUpdate::Rejected {
                    reason: e.to_string(),
                });
                if let Some(ack) = ack {
                    let _ = ack.send(Err(e));
                }
                return;
            }
        };

        let changed = result.new_state != self.state;
        self.state = result.new_state;
        if changed {
            let published = Arc::new(self.state.clone());
            self.state_tx.send_replace(published.clone());
            let _ = self
                .updates_tx
                .send(StoreUpdate::StateChanged { state: published });
        }

        for effect in result.effects {
            self.execute_effect(effect).await;
        }

        if let Some(ack) = ack {
            let _ = ack.send(Ok(()));
        }
    }

    /// Execute an effect; results come back later as events
    async fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::PersistSnapshot => {
                let snapshot = PersistedSnapshot::from(&self.state);
                if let Err(e) = self.snapshots.save(&snapshot).await {
                    // In-memory state stays authoritative
                    tracing::error!(error = %e, "Failed to persist snapshot");
                }
            }

            Effect::RequestReply {
                turn,
                persona_id,
                mood_id,
                history,
            } => {
                let Some(event_tx) = self.task_sender() else {
                    return;
                };
                let token = self.replace_cancel_token();
                let generation = self.generation.clone();
                tokio::spawn(run_reply(
                    generation, event_tx, token, turn, persona_id, mood_id, history,
                ));
            }

            Effect::RequestWelcome {
                turn,
                persona_id,
                mood_id,
            } => {
                let Some(event_tx) = self.task_sender() else {
                    return;
                };
                let token = self.replace_cancel_token();
                let generation = self.generation.clone();
                tokio::spawn(run_welcome(
                    generation, event_tx, token, turn, persona_id, mood_id,
                ));
            }

            Effect::RequestSummary {
                request_id,
                persona_id,
                history,
            } => {
                // Not cancellable: a save completes even if the user leaves the chat
                let generation = self.generation.clone();
                let Some(event_tx) = self.task_sender() else {
                    return;
                };
                tokio::spawn(run_summary(
                    generation, event_tx, request_id, persona_id, history,
                ));
            }

            Effect::RequestDailyChallenge { date } => {
                let generation = self.generation.clone();
                let Some(event_tx) = self.task_sender() else {
                    return;
                };
                tokio::spawn(run_daily_challenge(generation, event_tx, date));
            }

            Effect::CancelGeneration => {
                if let Some(token) = self.generation_cancel_token.take() {
                    tracing::info!("Cancelling in-flight generation");
                    token.cancel();
                }
            }

            Effect::NotifyAchievement { achievement_id } => {
                tracing::info!(achievement = %achievement_id, "Achievement unlocked");
                let _ = self
                    .updates_tx
                    .send(StoreUpdate::AchievementUnlocked { achievement_id });
            }
        }
    }

    /// Sender for a spawned task, or `None` once every handle is gone
    fn task_sender(&self) -> Option<mpsc::Sender<Envelope>> {
        let sender = self.event_tx.upgrade();
        if sender.is_none() {
            tracing::debug!("No store handles left, skipping generation task");
        }
        sender
    }

    /// Install a fresh token, cancelling whatever it replaces
    fn replace_cancel_token(&mut self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = self.generation_cancel_token.replace(token.clone()) {
            previous.cancel();
        }
        token
    }
}

async fn send(event_tx: &mpsc::Sender<Envelope>, event: Event) {
    if event_tx.send(Envelope::event(event)).await.is_err() {
        tracing::debug!("Store runtime gone, dropping generation result");
    }
}

/// Stream a reply, forwarding each fragment until done, failed or cancelled
async fn run_reply<G: GenerationClient + ?Sized>(
    generation: Arc<G>,
    event_tx: mpsc::Sender<Envelope>,
    token: CancellationToken,
    turn: u64,
    persona_id: String,
    mood_id: Option<String>,
    history: Vec<ChatMessage>,
) {
    let Some(persona) = catalog::persona(&persona_id) else {
        send(
            &event_tx,
            Event::ReplyFailed {
                turn,
                message: format!("Unknown persona {persona_id}"),
            },
        )
        .await;
        return;
    };
    let mood = mood_id.as_deref().and_then(catalog::mood);

    tracing::info!(turn, persona = %persona_id, messages = history.len(), "Requesting reply");

    // Race stream setup against cancellation
    let opened = tokio::select! {
        biased;
        () = token.cancelled() => {
            tracing::debug!(turn, "Reply cancelled before stream opened");
            return;
        }
        result = generation.stream_reply(persona, mood, &history) => result,
    };

    let mut stream = match opened {
        Ok(stream) => stream,
        Err(e) => {
            send(
                &event_tx,
                Event::ReplyFailed {
                    turn,
                    message: e.message,
                },
            )
            .await;
            return;
        }
    };

    let mut fragments = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::info!(turn, fragments, "Reply stream cancelled");
                return;
            }
            next = stream.next() => next,
        };

        let event = match next {
            Some(Ok(text)) => {
                fragments += 1;
                Event::ReplyFragment { turn, text }
            }
            Some(Err(e)) => Event::ReplyFailed {
                turn,
                message: e.message,
            },
            None if fragments == 0 => Event::ReplyFailed {
                turn,
                message: "Reply stream ended without any text".to_string(),
            },
            None => Event::ReplyFinished { turn },
        };
        let done = !matches!(event, Event::ReplyFragment { .. });
        send(&event_tx, event).await;
        if done {
            return;
        }
    }
}

async fn run_welcome<G: GenerationClient + ?Sized>(
    generation: Arc<G>,
    event_tx: mpsc::Sender<Envelope>,
    token: CancellationToken,
    turn: u64,
    persona_id: String,
    mood_id: String,
) {
    let text = match (catalog::persona(&persona_id), catalog::mood(&mood_id)) {
        (Some(persona), Some(mood)) => {
            let request = tokio::time::timeout(
                ONE_SHOT_TIMEOUT,
                generation.welcome_message(persona, mood),
            );
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    tracing::debug!(turn, "Welcome cancelled");
                    return;
                }
                result = request => match result {
                    Ok(Ok(text)) => Some(text),
                    Ok(Err(e)) => {
                        tracing::warn!(turn, error = %e, "Mood-aware welcome failed, using default");
                        None
                    }
                    Err(_) => {
                        tracing::warn!(turn, "Mood-aware welcome timed out, using default");
                        None
                    }
                },
            }
        }
        _ => None,
    };

    send(&event_tx, Event::WelcomeGenerated { turn, text }).await;
}

async fn run_summary<G: GenerationClient + ?Sized>(
    generation: Arc<G>,
    event_tx: mpsc::Sender<Envelope>,
    request_id: u64,
    persona_id: String,
    history: Vec<ChatMessage>,
) {
    let persona_name = catalog::persona(&persona_id).map_or(persona_id.as_str(), |p| p.name);
    let summary = match tokio::time::timeout(
        ONE_SHOT_TIMEOUT,
        generation.chat_summary(persona_name, &history),
    )
    .await
    {
        Ok(Ok(summary)) => Some(summary),
        Ok(Err(e)) => {
            tracing::warn!(request_id, error = %e, "Chat summary failed, using fallback");
            None
        }
        Err(_) => {
            tracing::warn!(request_id, "Chat summary timed out, using fallback");
            None
        }
    };

    send(
        &event_tx,
        Event::SummaryGenerated {
            request_id,
            persona_id,
            history,
            summary,
        },
    )
    .await;
}

async fn run_daily_challenge<G: GenerationClient + ?Sized>(
    generation: Arc<G>,
    event_tx: mpsc::Sender<Envelope>,
    date: NaiveDate,
) {
    match tokio::time::timeout(ONE_SHOT_TIMEOUT, generation.daily_challenge()).await {
        Ok(Ok(text)) => send(&event_tx, Event::ChallengeGenerated { date, text }).await,
        Ok(Err(e)) => tracing::warn!(%date, error = %e, "Failed to generate daily challenge"),
        Err(_) => tracing::warn!(%date, "Daily challenge request timed out"),
    }
}
