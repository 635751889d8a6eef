//! Type-independent parts of action introspection messages.
//!
//! Goal, result and feedback payloads depend on the user's action type and
//! stay opaque bytes; the headers every action shares are decoded.

use crate::{
    cdr::{CdrDecode, CdrReader},
    error::Result,
};
use std::fmt;

/// `builtin_interfaces/msg/Time`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Time {
    /// Seconds
    pub sec: i32,
    /// Nanoseconds
    pub nanosec: u32,
}

impl CdrDecode for Time {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            sec: r.read_i32()?,
            nanosec: r.read_u32()?,
        })
    }
}

/// Writes a 16-byte identifier as a bracketed list, like rosidl does for `uint8[16]`.
pub struct Uuid<'a>(pub &'a [u8; 16]);

impl fmt::Display for Uuid<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u8::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// `service_msgs/msg/ServiceEventInfo` event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceEventType {
    /// Client sent a request
    RequestSent,
    /// Server received a request
    RequestReceived,
    /// Server sent a response
    ResponseSent,
    /// Client received a response
    ResponseReceived,
    /// Anything else
    Unknown(u8),
}

impl From<u8> for ServiceEventType {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::RequestSent,
            1 => Self::RequestReceived,
            2 => Self::ResponseSent,
            3 => Self::ResponseReceived,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for ServiceEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestSent => f.write_str("REQUEST_SENT"),
            Self::RequestReceived => f.write_str("REQUEST_RECEIVED"),
            Self::ResponseSent => f.write_str("RESPONSE_SENT"),
            Self::ResponseReceived => f.write_str("RESPONSE_RECEIVED"),
            Self::Unknown(v) => write!(f, "{v}"),
        }
    }
}

/// `service_msgs/msg/ServiceEventInfo`, the first member of every service event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEventInfo {
    /// Event type
    pub event_type: ServiceEventType,
    /// Event time
    pub stamp: Time,
    /// Client GID
    pub client_gid: [u8; 16],
    /// Request sequence number
    pub sequence_number: i64,
}

impl CdrDecode for ServiceEventInfo {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            event_type: r.read_u8()?.into(),
            stamp: Time::decode(r)?,
            client_gid: r.read_fixed()?,
            sequence_number: r.read_i64()?,
        })
    }
}

/// `action_msgs/msg/GoalStatus` status codes.
pub fn goal_status_name(status: i8) -> &'static str {
    match status {
        1 => "ACCEPTED",
        2 => "EXECUTING",
        3 => "CANCELING",
        4 => "SUCCEEDED",
        5 => "CANCELED",
        6 => "ABORTED",
        _ => "UNKNOWN",
    }
}

/// `action_msgs/msg/GoalStatus`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalStatus {
    /// Goal id
    pub goal_id: [u8; 16],
    /// When the goal was accepted
    pub stamp: Time,
    /// Status code
    pub status: i8,
}

impl CdrDecode for GoalStatus {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            goal_id: r.read_fixed()?,
            stamp: Time::decode(r)?,
            status: r.read_i8()?,
        })
    }
}

/// `action_msgs/msg/GoalStatusArray`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GoalStatusArray {
    /// Status of every known goal
    pub status_list: Vec<GoalStatus>,
}

impl CdrDecode for GoalStatusArray {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            status_list: r.read_seq()?,
        })
    }
}

/// Leading goal id of a `<Action>_FeedbackMessage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackHeader {
    /// Goal the feedback belongs to
    pub goal_id: [u8; 16],
}

impl CdrDecode for FeedbackHeader {
    fn decode(r: &mut CdrReader<'_>) -> Result<Self> {
        Ok(Self {
            goal_id: r.read_fixed()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdr::{CdrWriter, from_cdr};

    #[test]
    fn test_decode_service_event_info() {
        let mut w = CdrWriter::new();
        w.write_u8(2);
        w.write_i32(10);
        w.write_u32(5);
        for b in 0..16u8 {
            w.write_u8(b);
        }
        w.write_i64(9);
        let bytes = w.finish();
        // u8 + pad(3) + time(8) + gid(16) + pad(4) + i64
        assert_eq!(bytes.len(), 4 + 40);

        let mut r = CdrReader::new(&bytes).unwrap();
        let info = ServiceEventInfo::decode(&mut r).unwrap();
        assert_eq!(info.event_type, ServiceEventType::ResponseSent);
        assert_eq!(info.event_type.to_string(), "RESPONSE_SENT");
        assert_eq!(info.stamp, Time { sec: 10, nanosec: 5 });
        assert_eq!(info.client_gid[15], 15);
        assert_eq!(info.sequence_number, 9);
    }

    #[test]
    fn test_decode_status_array() {
        let mut w = CdrWriter::new();
        w.write_u32(1);
        for _ in 0..16 {
            w.write_u8(1);
        }
        w.write_i32(3);
        w.write_u32(0);
        w.write_i8(4);

        let status: GoalStatusArray = from_cdr(&w.finish()).unwrap();
        assert_eq!(status.status_list.len(), 1);
        assert_eq!(goal_status_name(status.status_list[0].status), "SUCCEEDED");
        assert_eq!(
            Uuid(&[0; 16]).to_string(),
            "[0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]"
        );
    }
}
