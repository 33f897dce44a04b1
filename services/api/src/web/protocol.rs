//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the mobile client and the API server
//! for hands-free voice commands and live reminder notifications.

use crate::adapters::FiredNotification;
use crate::web::voice_task::CommandReply;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client TO the Server
//=========================================================================================
// NOTE: Recorded audio is sent as raw Binary frames (PCM16 mono), not as part of this enum.
//=========================================================================================

#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// The user pressed the mic button; binary frames that follow are audio.
    RecordingStarted,

    /// The user let go of the mic button; the buffered audio should be processed.
    RecordingEnded,

    /// The recording should be thrown away.
    RecordingCancelled,

    /// A command that was already transcribed on the device.
    Command { transcript: String },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client
//=========================================================================================
// NOTE: Spoken replies are sent as raw Binary frames (TTS audio) right after the
// `command_handled` message they belong to.
//=========================================================================================

#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected { user_id: Uuid },

    /// Audio frames are being buffered.
    Listening,

    /// The command is being transcribed and carried out.
    Processing,

    CommandHandled { reply: CommandReply },

    /// A scheduled reminder fired.
    Notification { notification: FiredNotification },

    Error { message: String },
}
