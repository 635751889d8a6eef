//! `lifecycle_msgs` bindings.

use super::service;
use crate::{
    cdr::{CdrDecode, CdrEncode, CdrReader, CdrWriter, Empty},
    error::Result,
};

/// `lifecycle_msgs/msg/State`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct State {
    /// Primary or transition state id
    pub id: u8,
    /// Human readable label
    pub label: String,
}

/// `lifecycle_msgs/msg/Transition`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transition {
    /// Transition id
    pub id: u8,
    /// Transition label
    pub label: String,
}

/// `lifecycle_msgs/msg/TransitionDescription`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionDescription {
    /// The transition
    pub transition: Transition,
    /// State the transition starts from
    pub start_state: State,
    /// State the transition ends in
    pub goal_state: State,
}

impl CdrEncode for State {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_u8(self.id);
        w.write_string(&self.label);
    }
}

impl CdrDecode for State {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            id: r.read_u8()?,
            label: r.read_string()?,
        })
    }
}

impl CdrEncode for Transition {
    fn encode(&self, w: &mut CdrWriter) {
        w.write_u8(self.id);
        w.write_string(&self.label);
    }
}

impl CdrDecode for Transition {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            id: r.read_u8()?,
            label: r.read_string()?,
        })
    }
}

impl CdrDecode for TransitionDescription {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            transition: Transition::decode(r)?,
            start_state: State::decode(r)?,
            goal_state: State::decode(r)?,
        })
    }
}

/// `GetState` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStateResponse {
    /// Current state of the node
    pub current_state: State,
}

impl CdrDecode for GetStateResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            current_state: State::decode(r)?,
        })
    }
}

/// `ChangeState` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeStateRequest {
    /// Requested transition; either the id or the label may be set
    pub transition: Transition,
}

impl CdrEncode for ChangeStateRequest {
    fn encode(&self, w: &mut CdrWriter) {
        self.transition.encode(w);
    }
}

/// `ChangeState` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeStateResponse {
    /// Whether the transition was applied
    pub success: bool,
}

impl CdrDecode for ChangeStateResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            success: r.read_bool()?,
        })
    }
}

/// `GetAvailableTransitions` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAvailableTransitionsResponse {
    /// Transitions available from the current state (or all of them for
    /// `get_transition_graph`)
    pub available_transitions: Vec<TransitionDescription>,
}

impl CdrDecode for GetAvailableTransitionsResponse {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            available_transitions: r.read_seq()?,
        })
    }
}

service!(
    /// `lifecycle_msgs/srv/GetState`
    GetState,
    "lifecycle_msgs/srv/GetState",
    Empty,
    GetStateResponse
);

service!(
    /// `lifecycle_msgs/srv/ChangeState`
    ChangeState,
    "lifecycle_msgs/srv/ChangeState",
    ChangeStateRequest,
    ChangeStateResponse
);

service!(
    /// `lifecycle_msgs/srv/GetAvailableTransitions`
    GetAvailableTransitions,
    "lifecycle_msgs/srv/GetAvailableTransitions",
    Empty,
    GetAvailableTransitionsResponse
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{from_cdr, to_cdr};

    #[test]
    fn test_change_state_request_layout() {
        let request = ChangeStateRequest {
            transition: Transition {
                id: 1,
                label: String::new(),
            },
        };
        // u8 id, pad to 4, u32 len 1, NUL
        assert_eq!(to_cdr(&request), [0, 1, 0, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_available_transitions() {
        let mut w = CdrWriter::new();
        w.write_u32(1);
        Transition {
            id: 1,
            label: "configure".into(),
        }
        .encode(&mut w);
        State {
            id: 1,
            label: "unconfigured".into(),
        }
        .encode(&mut w);
        State {
            id: 2,
            label: "inactive".into(),
        }
        .encode(&mut w);

        let response: GetAvailableTransitionsResponse = from_cdr(&w.finish()).unwrap();
        let description = &response.available_transitions[0];
        assert_eq!(description.transition.label, "configure");
        assert_eq!(description.start_state.label, "unconfigured");
        assert_eq!(description.goal_state.id, 2);
    }
}
