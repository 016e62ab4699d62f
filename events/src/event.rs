use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kinds of events a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JoinConfirm,
    SessionUpdate,
    UserUpdate,
    AudioData,
    VideoData,
    DeskshareData,
    TranscriptData,
    Leave,
    WebhookReceived,
}

impl EventKind {
    pub const ALL: [EventKind; 9] = [
        EventKind::JoinConfirm,
        EventKind::SessionUpdate,
        EventKind::UserUpdate,
        EventKind::AudioData,
        EventKind::VideoData,
        EventKind::DeskshareData,
        EventKind::TranscriptData,
        EventKind::Leave,
        EventKind::WebhookReceived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JoinConfirm => "join_confirm",
            EventKind::SessionUpdate => "session_update",
            EventKind::UserUpdate => "user_update",
            EventKind::AudioData => "audio_data",
            EventKind::VideoData => "video_data",
            EventKind::DeskshareData => "deskshare_data",
            EventKind::TranscriptData => "transcript_data",
            EventKind::Leave => "leave",
            EventKind::WebhookReceived => "webhook_received",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Operation reported with a session update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOp {
    Add,
    Stop,
    Pause,
    Resume,
}

impl SessionOp {
    pub fn from_code(code: i32) -> Option<SessionOp> {
        match code {
            0 => Some(SessionOp::Add),
            1 => Some(SessionOp::Stop),
            2 => Some(SessionOp::Pause),
            3 => Some(SessionOp::Resume),
            _ => None,
        }
    }
}

/// Operation reported with a participant update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserOp {
    Join,
    Leave,
}

impl UserOp {
    pub fn from_code(code: i32) -> Option<UserOp> {
        match code {
            0 => Some(UserOp::Join),
            1 => Some(UserOp::Leave),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Paused,
}

impl SessionStatus {
    pub fn from_code(code: i32) -> Option<SessionStatus> {
        match code {
            0 => Some(SessionStatus::Active),
            1 => Some(SessionStatus::Paused),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub stat_time: i32,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    pub participant_id: i32,
    pub participant_name: String,
}

/// Who a media frame belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub user_name: String,
    pub user_id: i32,
}

/// A buffer of media or transcript bytes as handed over by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFrame {
    pub data: Vec<u8>,
    pub timestamp: u32,
    pub metadata: Metadata,
}

/// An event surfaced during a poll, or a webhook payload re-delivered on the owner thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    JoinConfirm {
        reason: i32,
    },
    SessionUpdate {
        op: SessionOp,
        session: SessionInfo,
    },
    UserUpdate {
        op: UserOp,
        participant: ParticipantInfo,
    },
    AudioData(MediaFrame),
    VideoData {
        frame: MediaFrame,
        rtms_session_id: String,
    },
    DeskshareData(MediaFrame),
    TranscriptData(MediaFrame),
    Leave {
        reason: i32,
    },
    WebhookReceived(Value),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::JoinConfirm { .. } => EventKind::JoinConfirm,
            Event::SessionUpdate { .. } => EventKind::SessionUpdate,
            Event::UserUpdate { .. } => EventKind::UserUpdate,
            Event::AudioData(_) => EventKind::AudioData,
            Event::VideoData { .. } => EventKind::VideoData,
            Event::DeskshareData(_) => EventKind::DeskshareData,
            Event::TranscriptData(_) => EventKind::TranscriptData,
            Event::Leave { .. } => EventKind::Leave,
            Event::WebhookReceived(_) => EventKind::WebhookReceived,
        }
    }

    /// The media frame carried by data events.
    pub fn frame(&self) -> Option<&MediaFrame> {
        match self {
            Event::AudioData(frame)
            | Event::DeskshareData(frame)
            | Event::TranscriptData(frame)
            | Event::VideoData { frame, .. } => Some(frame),
            _ => None,
        }
    }
}
