//! The control-side step loop.
//!
//! A [`Controller`] drives one simulation session through its
//! [`BridgeServer`]: it queues one [`Action`], waits for the [`Event`] the
//! simulation posts in response, records both, and classifies the event.
//! Only one action may be outstanding at a time.
//!
//! # State machine
//!
//! ```text
//! Idle --step()--> AwaitingEvent --event arrives--> Idle
//! ```
//!
//! If a `step` future is dropped after its action was queued, the
//! controller stays in [`StepState::AwaitingEvent`] and further steps fail
//! with [`ControllerError::ActionOutstanding`]; the session has to be
//! restarted.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::Deserialize;
use simlink_bridge::{
    BridgeHandle, BridgeServer, HandoffError, ServerConfig, StartupError, spawn_bridge,
};
use simlink_types::{Action, Event, EventError, InitializeParams, ResetParams, Scalar};
use tracing::{debug, info, warn};

use crate::launcher::{BridgeEndpoint, LaunchConfig, LaunchError, SimulationProcess};
use crate::scenes;

/// Errors surfaced by the controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// A hand-off slot was misused or closed.
    #[error("hand-off failed: {0}")]
    Handoff(#[from] HandoffError),

    /// A previous action is still waiting for its event.
    #[error("an action is already awaiting its event")]
    ActionOutstanding,

    /// The simulation does not recognize the requested operation.
    #[error("{message}")]
    InvalidAction {
        /// The simulation's message, verbatim.
        message: String,
    },

    /// The action ran and reported failure while running strict.
    #[error("action failed ({}): {message}", .code.as_deref().unwrap_or("no error code"))]
    ActionFailed {
        /// The simulation's error code, if any.
        code: Option<String>,
        /// The simulation's error message.
        message: String,
    },

    /// The bridge server could not be started.
    #[error("bridge startup failed: {0}")]
    Bridge(#[from] StartupError),

    /// The requested scene is not one the simulation ships with.
    #[error("unknown scene: {scene}")]
    UnknownScene {
        /// The rejected scene name.
        scene: String,
    },

    /// The simulation process could not be launched or stopped.
    #[error("launch failed: {0}")]
    Launch(#[from] LaunchError),
}

impl From<EventError> for ControllerError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::InvalidAction { message } => Self::InvalidAction { message },
            EventError::ActionFailed { code, message } => Self::ActionFailed { code, message },
        }
    }
}

/// Controller defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ControllerConfig {
    /// When set, every `Initialize` action carries this visibility
    /// distance, replacing whatever the caller supplied.
    #[serde(default)]
    pub visibility_distance: Option<f64>,

    /// Grid size used by [`Controller::start`] and [`Controller::reset`].
    #[serde(default)]
    pub grid_size: Option<f64>,

    /// Number of agents to initialize.
    #[serde(default)]
    pub agent_count: Option<u64>,

    /// Scene to load on [`Controller::start`]; the simulation's own default
    /// scene when unset.
    #[serde(default)]
    pub scene: Option<String>,
}

impl ControllerConfig {
    /// Initialization parameters derived from this configuration.
    pub fn initialize_params(&self) -> InitializeParams {
        InitializeParams {
            grid_size: self.grid_size.map(Scalar::Float),
            visibility_distance: self.visibility_distance.map(Scalar::Float),
            agent_count: self.agent_count,
            ..InitializeParams::default()
        }
    }
}

/// Where the controller is in the step cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StepState {
    /// No action is outstanding.
    #[default]
    Idle,
    /// An action was queued and its event has not arrived.
    AwaitingEvent,
}

/// Drives one simulation session.
#[derive(Debug)]
pub struct Controller {
    config: ControllerConfig,
    bridge: Arc<BridgeServer>,
    state: StepState,
    last_event: Option<Event>,
    last_action: Option<Action>,
    init_params: InitializeParams,
    server: Option<BridgeHandle>,
    process: Option<SimulationProcess>,
}

impl Controller {
    /// Create a controller over an existing bridge session.
    pub fn new(config: ControllerConfig, bridge: Arc<BridgeServer>) -> Self {
        let init_params = config.initialize_params();
        Self {
            config,
            bridge,
            state: StepState::Idle,
            last_event: None,
            last_action: None,
            init_params,
            server: None,
            process: None,
        }
    }

    /// The bridge session this controller drives.
    pub const fn bridge(&self) -> &Arc<BridgeServer> {
        &self.bridge
    }

    /// The controller configuration.
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Current step state.
    pub const fn state(&self) -> StepState {
        self.state
    }

    /// The most recent event, if any has arrived.
    pub const fn last_event(&self) -> Option<&Event> {
        self.last_event.as_ref()
    }

    /// The most recent action sent through [`Controller::step`].
    pub const fn last_action(&self) -> Option<&Action> {
        self.last_action.as_ref()
    }

    /// Address of the bridge server started by [`Controller::start`].
    pub fn server_addr(&self) -> Option<SocketAddr> {
        self.server.as_ref().map(BridgeHandle::local_addr)
    }

    /// Send one action and wait for the resulting event.
    ///
    /// An `InvalidAction` error code always surfaces as
    /// [`ControllerError::InvalidAction`]. A failed action surfaces as
    /// [`ControllerError::ActionFailed`] only when `strict` is set;
    /// otherwise the event is returned and the caller inspects
    /// [`Event::last_action_success`]. The event and action are recorded
    /// either way.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::ActionOutstanding`] if a previous action
    /// has not been answered, [`ControllerError::Handoff`] if the bridge
    /// slots are misused, and the classification errors described above.
    pub async fn step(
        &mut self,
        action: impl Into<Action>,
        strict: bool,
    ) -> Result<&Event, ControllerError> {
        if self.state == StepState::AwaitingEvent {
            return Err(ControllerError::ActionOutstanding);
        }

        let mut action = action.into();
        if let Some(distance) = self.config.visibility_distance {
            action.override_visibility_distance(Scalar::Float(distance));
        }

        self.bridge.send(action.clone())?;
        self.state = StepState::AwaitingEvent;
        debug!(action = action.name(), strict, "action queued, awaiting event");

        let event = self.bridge.receive().await?;
        self.state = StepState::Idle;

        let classification = event.classify(strict);
        if let Err(e) = &classification {
            warn!(action = action.name(), error = %e, "step surfaced an error");
        }
        self.last_action = Some(action);
        let event = &*self.last_event.insert(event);
        classification?;
        Ok(event)
    }

    /// Wait for the first frame the simulation posts on startup, before
    /// any action has been sent.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::ActionOutstanding`] if an action is in
    /// flight, or [`ControllerError::Handoff`] if the bridge is gone.
    pub async fn receive_initial(&mut self) -> Result<&Event, ControllerError> {
        if self.state == StepState::AwaitingEvent {
            return Err(ControllerError::ActionOutstanding);
        }
        self.state = StepState::AwaitingEvent;
        let event = self.bridge.receive().await?;
        self.state = StepState::Idle;
        info!(agent_count = event.agents().len(), "initial frame received");
        Ok(&*self.last_event.insert(event))
    }

    /// Initialize the session, remembering `params` for later resets.
    ///
    /// # Errors
    ///
    /// Same as [`Controller::step`] in strict mode.
    pub async fn initialize(
        &mut self,
        params: InitializeParams,
    ) -> Result<&Event, ControllerError> {
        self.init_params = params.clone();
        self.step(Action::Initialize(params), true).await
    }

    /// Load `scene`, then re-initialize with the stored parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::UnknownScene`] without sending anything
    /// if `scene` is not in [`scenes::scene_names`]; otherwise the same as
    /// [`Controller::step`] in strict mode.
    pub async fn reset(&mut self, scene: &str) -> Result<&Event, ControllerError> {
        if !scenes::is_known_scene(scene) {
            return Err(ControllerError::UnknownScene {
                scene: scene.to_owned(),
            });
        }
        info!(scene, "resetting scene");
        let reset = ResetParams {
            scene_name: scene.to_owned(),
            ..ResetParams::default()
        };
        self.step(Action::Reset(reset), true).await?;
        let params = self.init_params.clone();
        self.step(Action::Initialize(params), true).await
    }

    /// Start the bridge server, launch the simulation against it, wait for
    /// its first frame, and initialize (loading the configured scene if
    /// one is set).
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Bridge`] or [`ControllerError::Launch`]
    /// if either process cannot start, and any step error from
    /// initialization.
    pub async fn start(
        &mut self,
        server: &ServerConfig,
        launch: &LaunchConfig,
    ) -> Result<&Event, ControllerError> {
        let handle = spawn_bridge(server, Arc::clone(&self.bridge)).await?;
        let endpoint = BridgeEndpoint {
            addr: handle.local_addr(),
            token: self.bridge.token().map(str::to_owned),
        };
        self.server = Some(handle);
        self.process = Some(launch.spawn(&endpoint)?);

        self.receive_initial().await?;
        match self.config.scene.clone() {
            Some(scene) => self.reset(&scene).await,
            None => {
                let params = self.init_params.clone();
                self.initialize(params).await
            }
        }
    }

    /// Kill the simulation process and stop the bridge server.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Launch`] if the process cannot be
    /// killed. The server is stopped regardless.
    pub async fn stop(&mut self) -> Result<(), ControllerError> {
        let killed = match self.process.take() {
            Some(mut process) => process.kill().await,
            None => Ok(()),
        };
        if let Some(server) = self.server.take() {
            server.abort();
        }
        info!("session stopped");
        killed.map_err(ControllerError::from)
    }
}
