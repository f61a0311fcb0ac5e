//! Actions sent from the control process to the simulation process.
//!
//! On the wire an action is an open JSON object with an `action` key naming
//! the operation and any number of parameters beside it. Inside the
//! workspace it is an [`Action`] enum keyed by operation name, with a typed
//! payload for the operations the controller itself reasons about and a
//! [`Action::Custom`] fallback for everything else. Each typed payload keeps
//! the keys it does not recognize in `extra`, so translation in either
//! direction never drops a parameter.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::params::{ParamValue, Params, Scalar, params_to_plain};

/// Wire key naming the operation.
pub const ACTION_KEY: &str = "action";

/// Errors translating a wire mapping into an [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The mapping has no string `action` key.
    #[error("action mapping has no string `action` key")]
    MissingOperation,

    /// A recognized parameter has the wrong type.
    #[error("field `{field}` of `{operation}` must be {expected}")]
    InvalidField {
        /// Operation being parsed.
        operation: String,
        /// Wire name of the offending field.
        field: &'static str,
        /// Human-readable expected type.
        expected: &'static str,
    },
}

/// Parameters of the session-initialization operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitializeParams {
    /// Size of the navigation grid (`gridSize`).
    pub grid_size: Option<Scalar>,
    /// Maximum distance at which objects count as visible
    /// (`visibilityDistance`).
    pub visibility_distance: Option<Scalar>,
    /// Whether agents snap to grid points (`snapToGrid`).
    pub snap_to_grid: Option<bool>,
    /// Number of agents to create (`agentCount`).
    pub agent_count: Option<u64>,
    /// Parameters not modelled above.
    pub extra: Params,
}

/// Parameters of the scene reset operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResetParams {
    /// Scene to load (`sceneName`).
    pub scene_name: String,
    /// Parameters not modelled above.
    pub extra: Params,
}

/// Parameters of the translation operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveParams {
    /// Distance to move (`moveMagnitude`); simulation default if absent.
    pub move_magnitude: Option<Scalar>,
    /// Parameters not modelled above.
    pub extra: Params,
}

/// Parameters of the yaw rotation operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotateParams {
    /// Degrees to rotate (`degrees`); simulation default if absent.
    pub degrees: Option<Scalar>,
    /// Parameters not modelled above.
    pub extra: Params,
}

/// Parameters of the camera pitch operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookParams {
    /// Degrees to pitch (`degrees`); simulation default if absent.
    pub degrees: Option<Scalar>,
    /// Parameters not modelled above.
    pub extra: Params,
}

/// An operation the workspace has no typed payload for.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomAction {
    /// Operation name sent as `action`.
    pub name: String,
    /// All other parameters.
    pub params: Params,
}

impl CustomAction {
    /// Create a custom action with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
        }
    }

    /// Add a parameter, replacing any previous value under `key`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A requested operation, keyed by operation name.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Start or reconfigure the session.
    Initialize(InitializeParams),
    /// Load a scene.
    Reset(ResetParams),
    /// Move forward.
    MoveAhead(MoveParams),
    /// Move backward.
    MoveBack(MoveParams),
    /// Strafe left.
    MoveLeft(MoveParams),
    /// Strafe right.
    MoveRight(MoveParams),
    /// Rotate counter-clockwise around the vertical axis.
    RotateLeft(RotateParams),
    /// Rotate clockwise around the vertical axis.
    RotateRight(RotateParams),
    /// Pitch the camera up.
    LookUp(LookParams),
    /// Pitch the camera down.
    LookDown(LookParams),
    /// Advance one frame without acting.
    Pass(Params),
    /// Any other operation, passed through untouched.
    Custom(CustomAction),
}

impl Action {
    /// The operation name sent as the wire `action` value.
    pub fn name(&self) -> &str {
        match self {
            Self::Initialize(_) => "Initialize",
            Self::Reset(_) => "Reset",
            Self::MoveAhead(_) => "MoveAhead",
            Self::MoveBack(_) => "MoveBack",
            Self::MoveLeft(_) => "MoveLeft",
            Self::MoveRight(_) => "MoveRight",
            Self::RotateLeft(_) => "RotateLeft",
            Self::RotateRight(_) => "RotateRight",
            Self::LookUp(_) => "LookUp",
            Self::LookDown(_) => "LookDown",
            Self::Pass(_) => "Pass",
            Self::Custom(c) => &c.name,
        }
    }

    /// Force the `visibilityDistance` of an initialization, whether it is
    /// typed or a custom action named `Initialize`. Other actions are left
    /// untouched.
    pub fn override_visibility_distance(&mut self, distance: Scalar) {
        match self {
            Self::Initialize(p) => p.visibility_distance = Some(distance),
            Self::Custom(c) if c.name == "Initialize" => {
                c.params.insert("visibilityDistance".to_owned(), ParamValue::from(distance));
            }
            _ => {}
        }
    }

    /// Shorthand for [`Action::Custom`].
    pub fn custom(name: impl Into<String>) -> CustomAction {
        CustomAction::new(name)
    }

    /// Translate into the open wire mapping.
    ///
    /// Numeric-library values anywhere in the payload are flattened into
    /// plain numbers and lists. Typed fields win over same-named keys in
    /// `extra`, and the `action` key always carries [`Action::name`].
    pub fn to_wire(&self) -> Map<String, Value> {
        let (extra, typed) = self.split();
        let mut map = params_to_plain(extra);
        for (key, value) in typed {
            map.insert(key.to_owned(), value);
        }
        map.insert(ACTION_KEY.to_owned(), Value::String(self.name().to_owned()));
        map
    }

    /// Translate an open wire mapping into an action.
    pub fn from_wire(map: Map<String, Value>) -> Result<Self, ActionError> {
        Self::from_params(map.into_iter().map(|(k, v)| (k, ParamValue::from(v))).collect())
    }

    /// Translate an open parameter mapping (which must contain `action`)
    /// into an action.
    pub fn from_params(mut params: Params) -> Result<Self, ActionError> {
        let name = match params.remove(ACTION_KEY) {
            Some(ParamValue::String(name)) => name,
            _ => return Err(ActionError::MissingOperation),
        };
        let mut fields = Fields {
            operation: &name,
            params: &mut params,
        };

        let action = match name.as_str() {
            "Initialize" => Self::Initialize(InitializeParams {
                grid_size: fields.scalar("gridSize")?,
                visibility_distance: fields.scalar("visibilityDistance")?,
                snap_to_grid: fields.bool("snapToGrid")?,
                agent_count: fields.u64("agentCount")?,
                extra: Params::new(),
            }),
            "Reset" => Self::Reset(ResetParams {
                scene_name: fields.string("sceneName")?.ok_or_else(|| {
                    ActionError::InvalidField {
                        operation: name.clone(),
                        field: "sceneName",
                        expected: "a string",
                    }
                })?,
                extra: Params::new(),
            }),
            "MoveAhead" => Self::MoveAhead(fields.move_params()?),
            "MoveBack" => Self::MoveBack(fields.move_params()?),
            "MoveLeft" => Self::MoveLeft(fields.move_params()?),
            "MoveRight" => Self::MoveRight(fields.move_params()?),
            "RotateLeft" => Self::RotateLeft(RotateParams {
                degrees: fields.scalar("degrees")?,
                extra: Params::new(),
            }),
            "RotateRight" => Self::RotateRight(RotateParams {
                degrees: fields.scalar("degrees")?,
                extra: Params::new(),
            }),
            "LookUp" => Self::LookUp(LookParams {
                degrees: fields.scalar("degrees")?,
                extra: Params::new(),
            }),
            "LookDown" => Self::LookDown(LookParams {
                degrees: fields.scalar("degrees")?,
                extra: Params::new(),
            }),
            "Pass" => Self::Pass(Params::new()),
            _ => Self::Custom(CustomAction {
                name: name.clone(),
                params: Params::new(),
            }),
        };

        Ok(action.with_extra(params))
    }

    fn with_extra(mut self, rest: Params) -> Self {
        match &mut self {
            Self::Initialize(p) => p.extra = rest,
            Self::Reset(p) => p.extra = rest,
            Self::MoveAhead(p) | Self::MoveBack(p) | Self::MoveLeft(p) | Self::MoveRight(p) => {
                p.extra = rest;
            }
            Self::RotateLeft(p) | Self::RotateRight(p) => p.extra = rest,
            Self::LookUp(p) | Self::LookDown(p) => p.extra = rest,
            Self::Pass(p) => *p = rest,
            Self::Custom(c) => c.params = rest,
        }
        self
    }

    fn split(&self) -> (&Params, Vec<(&'static str, Value)>) {
        let mut typed = Vec::new();
        let extra = match self {
            Self::Initialize(p) => {
                push_scalar(&mut typed, "gridSize", p.grid_size);
                push_scalar(&mut typed, "visibilityDistance", p.visibility_distance);
                if let Some(snap) = p.snap_to_grid {
                    typed.push(("snapToGrid", Value::Bool(snap)));
                }
                if let Some(count) = p.agent_count {
                    typed.push(("agentCount", Value::from(count)));
                }
                &p.extra
            }
            Self::Reset(p) => {
                typed.push(("sceneName", Value::String(p.scene_name.clone())));
                &p.extra
            }
            Self::MoveAhead(p) | Self::MoveBack(p) | Self::MoveLeft(p) | Self::MoveRight(p) => {
                push_scalar(&mut typed, "moveMagnitude", p.move_magnitude);
                &p.extra
            }
            Self::RotateLeft(p) | Self::RotateRight(p) => {
                push_scalar(&mut typed, "degrees", p.degrees);
                &p.extra
            }
            Self::LookUp(p) | Self::LookDown(p) => {
                push_scalar(&mut typed, "degrees", p.degrees);
                &p.extra
            }
            Self::Pass(p) => p,
            Self::Custom(c) => &c.params,
        };
        (extra, typed)
    }
}

fn push_scalar(
    typed: &mut Vec<(&'static str, Value)>,
    key: &'static str,
    value: Option<Scalar>,
) {
    if let Some(v) = value {
        typed.push((key, v.to_value()));
    }
}

/// Removes typed fields from a parameter map, leaving the rest as extras.
struct Fields<'a> {
    operation: &'a str,
    params: &'a mut Params,
}

impl Fields<'_> {
    fn take<T>(
        &mut self,
        field: &'static str,
        expected: &'static str,
        read: impl FnOnce(&ParamValue) -> Option<T>,
    ) -> Result<Option<T>, ActionError> {
        match self.params.remove(field) {
            None | Some(ParamValue::Null) => Ok(None),
            Some(value) => read(&value).map(Some).ok_or_else(|| ActionError::InvalidField {
                operation: self.operation.to_owned(),
                field,
                expected,
            }),
        }
    }

    fn scalar(&mut self, field: &'static str) -> Result<Option<Scalar>, ActionError> {
        self.take(field, "a number", ParamValue::as_scalar)
    }

    fn u64(&mut self, field: &'static str) -> Result<Option<u64>, ActionError> {
        self.take(field, "a non-negative integer", ParamValue::as_u64)
    }

    fn bool(&mut self, field: &'static str) -> Result<Option<bool>, ActionError> {
        self.take(field, "a boolean", ParamValue::as_bool)
    }

    fn string(&mut self, field: &'static str) -> Result<Option<String>, ActionError> {
        self.take(field, "a string", |v| v.as_str().map(str::to_owned))
    }

    fn move_params(&mut self) -> Result<MoveParams, ActionError> {
        Ok(MoveParams {
            move_magnitude: self.scalar("moveMagnitude")?,
            extra: Params::new(),
        })
    }
}

/// Custom actions naming a typed operation become that typed action when
/// their parameters fit it; otherwise they stay custom.
impl From<CustomAction> for Action {
    fn from(custom: CustomAction) -> Self {
        let mut params = custom.params.clone();
        params.insert(ACTION_KEY.to_owned(), ParamValue::String(custom.name.clone()));
        Self::from_params(params).unwrap_or_else(|_| Self::Custom(custom))
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Self::from_wire(map).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::NdArray;
    use serde_json::json;

    fn wire(value: &Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn known_operation_parses_typed_payload() {
        let action = Action::from_wire(wire(&json!({
            "action": "Initialize",
            "gridSize": 0.25,
            "renderDepthImage": true,
        })));
        match action {
            Ok(Action::Initialize(params)) => {
                assert_eq!(params.grid_size, Some(Scalar::Float(0.25)));
                assert_eq!(params.visibility_distance, None);
                assert_eq!(params.extra.get("renderDepthImage"), Some(&ParamValue::Bool(true)));
            }
            other => panic!("Expected Initialize, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operation_is_custom() {
        let action = Action::from_wire(wire(&json!({"action": "OpenObject", "objectId": "Fridge|1"})));
        match action {
            Ok(Action::Custom(custom)) => {
                assert_eq!(custom.name, "OpenObject");
                assert_eq!(
                    custom.params.get("objectId").and_then(ParamValue::as_str),
                    Some("Fridge|1")
                );
            }
            other => panic!("Expected Custom, got {other:?}"),
        }
    }

    #[test]
    fn missing_operation_is_rejected() {
        assert_eq!(
            Action::from_wire(wire(&json!({"gridSize": 0.25}))),
            Err(ActionError::MissingOperation)
        );
        assert_eq!(
            Action::from_wire(wire(&json!({"action": 3}))),
            Err(ActionError::MissingOperation)
        );
    }

    #[test]
    fn wrongly_typed_field_is_rejected() {
        let result = Action::from_wire(wire(&json!({"action": "MoveAhead", "moveMagnitude": "far"})));
        assert!(matches!(
            result,
            Err(ActionError::InvalidField { field: "moveMagnitude", .. })
        ));
    }

    #[test]
    fn reset_requires_scene_name() {
        let result = Action::from_wire(wire(&json!({"action": "Reset"})));
        assert!(matches!(result, Err(ActionError::InvalidField { field: "sceneName", .. })));
    }

    #[test]
    fn wire_form_keeps_extras_and_operation() {
        let action = Action::from_wire(wire(&json!({
            "action": "RotateRight",
            "degrees": 45,
            "forceAction": true,
        })));
        let plain = action.map(|a| Value::Object(a.to_wire())).unwrap_or(Value::Null);
        assert_eq!(
            plain,
            json!({"action": "RotateRight", "degrees": 45, "forceAction": true})
        );
    }

    #[test]
    fn integer_fields_stay_integers() {
        let action = Action::from_wire(wire(&json!({"action": "MoveAhead", "moveMagnitude": 1})));
        match &action {
            Ok(Action::MoveAhead(params)) => {
                assert_eq!(params.move_magnitude, Some(Scalar::Int(1)));
            }
            other => panic!("Expected MoveAhead, got {other:?}"),
        }
        let plain = action.map(|a| Value::Object(a.to_wire())).unwrap_or(Value::Null);
        assert_eq!(plain, json!({"action": "MoveAhead", "moveMagnitude": 1}));
    }

    #[test]
    fn custom_named_like_typed_operation_becomes_typed() {
        let action: Action = Action::custom("Initialize")
            .with("gridSize", 0.25)
            .with("renderDepthImage", true)
            .into();
        match action {
            Action::Initialize(params) => {
                assert_eq!(params.grid_size, Some(Scalar::Float(0.25)));
                assert_eq!(params.extra.get("renderDepthImage"), Some(&ParamValue::Bool(true)));
            }
            other => panic!("Expected Initialize, got {other:?}"),
        }
    }

    #[test]
    fn custom_that_does_not_fit_typed_operation_stays_custom() {
        let action: Action = Action::custom("Reset").with("scene", "FloorPlan28").into();
        match action {
            Action::Custom(custom) => assert_eq!(custom.name, "Reset"),
            other => panic!("Expected Custom, got {other:?}"),
        }
    }

    #[test]
    fn visibility_override_reaches_custom_initialize() {
        let mut action = Action::Custom(
            Action::custom("Initialize")
                .with("gridSize", 0.25)
                .with("visibilityDistance", 9.0),
        );
        action.override_visibility_distance(Scalar::Float(2.0));
        assert_eq!(
            Value::Object(action.to_wire()),
            json!({"action": "Initialize", "gridSize": 0.25, "visibilityDistance": 2.0})
        );

        let mut other: Action = Action::custom("OpenObject").into();
        other.override_visibility_distance(Scalar::Float(2.0));
        assert_eq!(Value::Object(other.to_wire()), json!({"action": "OpenObject"}));
    }

    #[test]
    fn typed_field_wins_over_extra() {
        let mut params = InitializeParams {
            visibility_distance: Some(Scalar::Float(2.0)),
            ..InitializeParams::default()
        };
        params
            .extra
            .insert("visibilityDistance".to_owned(), ParamValue::from(9.0));
        let plain = Value::Object(Action::Initialize(params).to_wire());
        assert_eq!(plain, json!({"action": "Initialize", "visibilityDistance": 2.0}));
    }

    #[test]
    fn custom_wire_flattens_wrapped_values() {
        let mut rotation = Params::new();
        rotation.insert("y".to_owned(), NdArray::scalar(24_i64).into());
        let action: Action = Action::custom("Teleport")
            .with("rotation", rotation)
            .with("moveMagnitude", NdArray::scalar(55.5))
            .with("myCustomArray", NdArray::vector([1_i64, 2]))
            .into();
        assert_eq!(
            Value::Object(action.to_wire()),
            json!({
                "action": "Teleport",
                "rotation": {"y": 24},
                "moveMagnitude": 55.5,
                "myCustomArray": [1, 2],
            })
        );
    }

    #[test]
    fn deserializes_from_json_object() {
        let action: Result<Action, _> = serde_json::from_str(r#"{"action":"LookDown"}"#);
        assert!(matches!(action, Ok(Action::LookDown(LookParams { degrees: None, .. }))));
    }
}
