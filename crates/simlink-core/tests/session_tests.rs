//! End-to-end tests of the controller against a scripted simulation.
//!
//! The simulation side runs on its own Tokio task and calls
//! [`BridgeServer::exchange`] directly, the same entry point the `/train`
//! handler uses, so both sides rendezvous only through the bridge.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::{Map, Value, json};
use simlink_bridge::{BridgeServer, ExchangeError, ExchangeRequest};
use simlink_core::{Controller, ControllerConfig, ControllerError, StepState};
use simlink_types::{
    Action, AgentMetadata, FrameMetadata, InitializeParams, MoveParams, Scalar, SequenceId,
};
use tokio::task::JoinHandle;

const DONE: &str = "Done";

fn frame(sequence_id: u64, success: bool, message: &str) -> ExchangeRequest {
    let agent = json!({
        "agentId": 0,
        "lastActionSuccess": success,
        "errorCode": "",
        "errorMessage": message,
    });
    ExchangeRequest::new(FrameMetadata {
        agents: vec![AgentMetadata(agent.as_object().cloned().unwrap())],
        sequence_id: SequenceId(sequence_id),
        active_agent_id: None,
    })
}

/// Plays the simulation: posts the initial frame, then one frame per
/// received action until told to stop. `MoveAhead` always fails.
fn spawn_simulation(
    bridge: Arc<BridgeServer>,
) -> JoinHandle<Result<Vec<Map<String, Value>>, ExchangeError>> {
    tokio::spawn(async move {
        let mut bodies = Vec::new();
        let mut request = frame(0, true, "");
        loop {
            let body = bridge.exchange(request).await?;
            let action = body["action"].as_str().unwrap_or_default().to_owned();
            let next = body["sequenceId"].as_u64().unwrap();
            bodies.push(body);
            if action == DONE {
                return Ok(bodies);
            }
            request = if action == "MoveAhead" {
                frame(next, false, "blocked")
            } else {
                frame(next, true, "")
            };
        }
    })
}

#[tokio::test]
async fn test_full_session_through_the_bridge() {
    let bridge = Arc::new(BridgeServer::default());
    let sim = spawn_simulation(Arc::clone(&bridge));

    let config = ControllerConfig {
        visibility_distance: Some(1.5),
        grid_size: Some(0.25),
        ..ControllerConfig::default()
    };
    let mut controller = Controller::new(config, Arc::clone(&bridge));

    assert!(controller.receive_initial().await.is_ok());
    assert!(controller.reset("FloorPlan28").await.is_ok());

    let moved = controller
        .step(Action::MoveAhead(MoveParams::default()), false)
        .await
        .unwrap();
    assert!(!moved.last_action_success());
    assert_eq!(moved.error_message(), "blocked");

    bridge.send(Action::custom(DONE).into()).unwrap();
    let bodies = sim.await.unwrap().unwrap();

    let actions: Vec<&str> = bodies.iter().filter_map(|b| b["action"].as_str()).collect();
    assert_eq!(actions, vec!["Reset", "Initialize", "MoveAhead", DONE]);
    let ids: Vec<u64> = bodies.iter().filter_map(|b| b["sequenceId"].as_u64()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);

    let reset = bodies.first().unwrap();
    assert_eq!(reset["sceneName"], "FloorPlan28");
    let initialize = bodies.get(1).unwrap();
    assert_eq!(initialize["gridSize"], 0.25);
    assert_eq!(initialize["visibilityDistance"], 1.5);
    assert_eq!(bridge.sequence_id(), SequenceId(4));
    assert_eq!(controller.state(), StepState::Idle);
}

#[tokio::test]
async fn test_strict_step_surfaces_failure() {
    let bridge = Arc::new(BridgeServer::default());
    let sim = spawn_simulation(Arc::clone(&bridge));
    let mut controller = Controller::new(ControllerConfig::default(), Arc::clone(&bridge));

    controller.receive_initial().await.unwrap();
    controller
        .initialize(InitializeParams {
            grid_size: Some(Scalar::Float(0.5)),
            ..InitializeParams::default()
        })
        .await
        .unwrap();

    match controller.step(Action::MoveAhead(MoveParams::default()), true).await {
        Err(ControllerError::ActionFailed { message, .. }) => assert_eq!(message, "blocked"),
        other => panic!("Expected ActionFailed, got {other:?}"),
    }
    assert_eq!(
        controller.last_action().map(Action::name),
        Some("MoveAhead")
    );
    assert!(controller.last_event().is_some_and(|e| !e.last_action_success()));

    bridge.send(Action::custom(DONE).into()).unwrap();
    let bodies = sim.await.unwrap().unwrap();
    assert_eq!(bodies.len(), 3);
}
