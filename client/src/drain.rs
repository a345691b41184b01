//! The drain-and-stop workflow.
//!
//! Tell the server application to stop admitting actors, then poll its actor count until it falls to the
//! threshold or the timeout elapses:
//!
//! 1. resolve the root component,
//! 2. load its properties and the operations it supports,
//! 3. invoke `Reset` on it,
//! 4. poll `actorsCount` every update interval.
//!
//! Failures in steps 1 and 2 end the workflow. Failures in steps 3 and 4 are reported through
//! [`DrainDelegate::on_error`] and the workflow carries on. However the poll loop ends, the delegate's
//! `on_success` is called.

use crate::cancel::CancelToken;
use crate::component::{ComponentProperties, EntityRef};
use crate::errors::ServerError;
use crate::server::PhotonServer;
use libphoton::codes::{ACTORS_COUNT_PROPERTY, RESET_OPERATION};
use libphoton::{Dictionary, PhotonPeer};
use log::*;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default delay between two actor count polls.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainOptions {
    /// The drain is complete once the actor count is at or below this value.
    pub threshold: i64,
    /// Upper bound on the whole workflow, measured from its start.
    pub timeout: Duration,
    /// Delay between two polls.
    pub update_interval: Duration,
}

impl DrainOptions {
    pub fn new(threshold: i64, timeout: Duration) -> Self {
        Self { threshold, timeout, update_interval: DEFAULT_UPDATE_INTERVAL }
    }

    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrainStage {
    ResolvingRoot,
    LoadingProperties,
    InvokingReset,
    Polling,
    Finished,
}

impl Display for DrainStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DrainStage::ResolvingRoot => "resolving root",
            DrainStage::LoadingProperties => "loading properties",
            DrainStage::InvokingReset => "invoking reset",
            DrainStage::Polling => "polling",
            DrainStage::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrainOutcome {
    /// The actor count reached the threshold.
    Drained { actors: i64, polls: usize },
    /// The timeout elapsed first. `actors` is the last count observed, if any.
    TimedOut { actors: Option<i64>, polls: usize },
    /// The workflow could not get going. `validation` is set when the server's answer was malformed or refused,
    /// rather than the request never being answered.
    Failed { stage: DrainStage, message: String, validation: bool },
    Cancelled { polls: usize },
}

impl DrainOutcome {
    /// Whether `on_success` was reported for this outcome.
    pub fn is_success(&self) -> bool {
        matches!(self, DrainOutcome::Drained { .. } | DrainOutcome::TimedOut { .. })
    }
}

impl Display for DrainOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrainOutcome::Drained { actors, polls } => write!(f, "Drained to {actors} actors after {polls} polls"),
            DrainOutcome::TimedOut { actors: Some(actors), polls } => {
                write!(f, "Timed out with {actors} actors remaining after {polls} polls")
            }
            DrainOutcome::TimedOut { actors: None, polls } => {
                write!(f, "Timed out after {polls} polls without reading the actor count")
            }
            DrainOutcome::Failed { stage, message, .. } => write!(f, "Failed while {stage}. {message}"),
            DrainOutcome::Cancelled { polls } => write!(f, "Cancelled after {polls} polls"),
        }
    }
}

/// Receives the workflow's callbacks. Both run on the workflow thread.
pub trait DrainDelegate<P: PhotonPeer, D>: Send + 'static {
    fn on_success(&mut self, server: &PhotonServer<P, D>, data: &D);

    fn on_error(&mut self, server: &PhotonServer<P, D>, data: &D, message: &str);
}

/// A [`DrainDelegate`] made from a pair of closures.
pub struct FnDelegate<S, E> {
    on_success: S,
    on_error: E,
}

impl<S, E> FnDelegate<S, E> {
    pub fn new(on_success: S, on_error: E) -> Self {
        Self { on_success, on_error }
    }
}

impl<P, D, S, E> DrainDelegate<P, D> for FnDelegate<S, E>
where
    P: PhotonPeer,
    S: FnMut(&PhotonServer<P, D>, &D) + Send + 'static,
    E: FnMut(&PhotonServer<P, D>, &D, &str) + Send + 'static,
{
    fn on_success(&mut self, server: &PhotonServer<P, D>, data: &D) {
        (self.on_success)(server, data)
    }

    fn on_error(&mut self, server: &PhotonServer<P, D>, data: &D, message: &str) {
        (self.on_error)(server, data, message)
    }
}

/// A running drain workflow.
pub struct DrainHandle {
    cancel: CancelToken,
    stage: Arc<Mutex<DrainStage>>,
    handle: JoinHandle<DrainOutcome>,
}

impl DrainHandle {
    pub(crate) fn spawn<P, D, G>(
        server: Arc<PhotonServer<P, D>>,
        options: DrainOptions,
        delegate: G,
    ) -> Result<Self, ServerError>
    where
        P: PhotonPeer,
        D: Send + Sync + 'static,
        G: DrainDelegate<P, D>,
    {
        let cancel = CancelToken::new();
        let stage = Arc::new(Mutex::new(DrainStage::ResolvingRoot));
        let workflow = DrainWorkflow {
            server,
            options,
            delegate,
            cancel: cancel.clone(),
            stage: Arc::clone(&stage),
            started: Instant::now(),
            polls: 0,
        };
        let handle = thread::Builder::new().name("photon-drain".to_string()).spawn(move || workflow.run())?;
        Ok(Self { cancel, stage, handle })
    }

    /// Interrupt the poll loop. Steps already in progress finish first.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn stage(&self) -> DrainStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the workflow to end.
    pub fn join(self) -> DrainOutcome {
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(_) => {
                let stage = *self.stage.lock().unwrap_or_else(PoisonError::into_inner);
                error!("The drain workflow panicked while {stage}");
                DrainOutcome::Failed { stage, message: "The drain workflow panicked".to_string(), validation: false }
            }
        }
    }
}

struct DrainWorkflow<P: PhotonPeer, D, G> {
    server: Arc<PhotonServer<P, D>>,
    options: DrainOptions,
    delegate: G,
    cancel: CancelToken,
    stage: Arc<Mutex<DrainStage>>,
    started: Instant,
    polls: usize,
}

impl<P, D, G> DrainWorkflow<P, D, G>
where
    P: PhotonPeer,
    G: DrainDelegate<P, D>,
{
    fn run(mut self) -> DrainOutcome {
        let DrainOptions { threshold, timeout, update_interval } = self.options;
        info!(
            "Draining {} to {threshold} actors. Timeout: {timeout:?}, update interval: {update_interval:?}",
            self.server.endpoint()
        );
        let entity = match self.server.connection().resolve_root() {
            Ok(entity) => entity,
            Err(err) => return self.fail(err),
        };
        self.enter(DrainStage::LoadingProperties);
        let component = match self.server.connection().load_component(&entity) {
            Ok(component) => component,
            Err(err) => return self.fail(err),
        };
        self.enter(DrainStage::InvokingReset);
        self.reset(&entity, &component);
        self.enter(DrainStage::Polling);
        self.poll(&entity)
    }

    fn enter(&self, stage: DrainStage) {
        trace!("Drain stage: {stage}");
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner) = stage;
    }

    fn stage(&self) -> DrainStage {
        *self.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report_error(&mut self, message: &str) {
        warn!("Drain of {}: {message}", self.server.endpoint());
        self.delegate.on_error(&self.server, self.server.data(), message);
    }

    fn fail(&mut self, err: ServerError) -> DrainOutcome {
        let stage = self.stage();
        let message = err.to_string();
        let validation = err.is_validation();
        error!("Drain of {} failed while {stage}. {message}", self.server.endpoint());
        self.delegate.on_error(&self.server, self.server.data(), &message);
        self.enter(DrainStage::Finished);
        DrainOutcome::Failed { stage, message, validation }
    }

    fn reset(&mut self, entity: &EntityRef, component: &ComponentProperties) {
        let names = component.operations.clone().unwrap_or_default();
        if !component.has_operation(RESET_OPERATION) {
            let names = names.join(", ");
            self.report_error(&format!("Element doesn't contain '{RESET_OPERATION}' operation: [{names}]"));
        }
        match self.server.connection().invoke_operation(entity, RESET_OPERATION, Dictionary::new()) {
            Ok(_) => info!("{entity} no longer admits new actors"),
            Err(err) => self.report_error(&err.to_string()),
        }
    }

    /// Load the properties once and read the actor count, reporting anything that gets in the way.
    fn observe(&mut self, entity: &EntityRef) -> Option<i64> {
        self.polls += 1;
        let properties = match self.server.connection().load_properties(entity) {
            Ok(properties) => properties,
            Err(err) => {
                self.report_error(&format!("Poll {} failed. {err}", self.polls));
                return None;
            }
        };
        let actors = properties.actors_count();
        match actors {
            Some(actors) => debug!("Poll {}: {actors} actors on {entity}", self.polls),
            None => {
                let raw = properties.values.get(ACTORS_COUNT_PROPERTY).map(|v| v.to_string()).unwrap_or_default();
                self.report_error(&format!("Invalid {ACTORS_COUNT_PROPERTY} value '{raw}' on poll {}", self.polls));
            }
        }
        actors
    }

    fn poll(&mut self, entity: &EntityRef) -> DrainOutcome {
        let DrainOptions { threshold, timeout, update_interval } = self.options;
        let mut actors = self.observe(entity);
        loop {
            if let Some(count) = actors.filter(|count| *count <= threshold) {
                info!("{entity} drained to {count} actors after {} polls", self.polls);
                return self.succeed(DrainOutcome::Drained { actors: count, polls: self.polls });
            }
            if self.started.elapsed() >= timeout {
                warn!("Drain of {entity} timed out after {:?}. Last actor count: {actors:?}", self.started.elapsed());
                return self.succeed(DrainOutcome::TimedOut { actors, polls: self.polls });
            }
            if self.cancel.sleep(update_interval) {
                let polls = self.polls;
                self.report_error(&format!("Drain cancelled after {polls} polls"));
                self.enter(DrainStage::Finished);
                return DrainOutcome::Cancelled { polls };
            }
            if let Some(count) = self.observe(entity) {
                actors = Some(count);
            }
        }
    }

    fn succeed(&mut self, outcome: DrainOutcome) -> DrainOutcome {
        self.enter(DrainStage::Finished);
        self.delegate.on_success(&self.server, self.server.data());
        outcome
    }
}
