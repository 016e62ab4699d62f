//! Media selection and stream parameters handed to the engine before a join.
//!
//! Enum discriminants are the engine's own numeric codes.

use crate::error::{Error, ErrorKind};
use serde::Serialize;
use std::ops::{BitOr, BitOrAssign};

/// Bit set of media types to subscribe to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct MediaType(u32);

impl MediaType {
    pub const AUDIO: MediaType = MediaType(0x01);
    pub const VIDEO: MediaType = MediaType(0x01 << 1);
    pub const DESKSHARE: MediaType = MediaType(0x01 << 2);
    pub const TRANSCRIPT: MediaType = MediaType(0x01 << 3);
    pub const CHAT: MediaType = MediaType(0x01 << 4);
    /// All media over a single shared data connection.
    pub const ALL: MediaType = MediaType(0x01 << 5);

    pub const fn empty() -> MediaType {
        MediaType(0)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: MediaType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: MediaType) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: MediaType) {
        self.0 &= !other.0;
    }
}

impl BitOr for MediaType {
    type Output = MediaType;

    fn bitor(self, rhs: MediaType) -> MediaType {
        MediaType(self.0 | rhs.0)
    }
}

impl BitOrAssign for MediaType {
    fn bitor_assign(&mut self, rhs: MediaType) {
        self.insert(rhs);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum ContentType {
    Undefined = 0,
    Rtp = 1,
    Raw = 2,
    FileStream = 3,
    Text = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum AudioCodec {
    Undefined = 0,
    L16 = 1,
    G711 = 2,
    G722 = 3,
    Opus = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum SampleRate {
    Sr8k = 0,
    Sr16k = 1,
    Sr32k = 2,
    Sr48k = 3,
}

impl SampleRate {
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Sr8k => 8_000,
            SampleRate::Sr16k => 16_000,
            SampleRate::Sr32k => 32_000,
            SampleRate::Sr48k => 48_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum AudioChannel {
    Mono = 1,
    Stereo = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum AudioDataOption {
    Undefined = 0,
    MixedStream = 1,
    MultiStreams = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum VideoCodec {
    Undefined = 0,
    Jpg = 1,
    Png = 2,
    H264 = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum VideoResolution {
    Sd = 0,
    Hd = 1,
    Fhd = 2,
    Qhd = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum VideoDataOption {
    Undefined = 0,
    SingleActiveStream = 1,
    MixedSpeakerView = 2,
    MixedGalleryView = 3,
}

const MAX_FPS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioParams {
    pub content_type: ContentType,
    pub codec: AudioCodec,
    pub sample_rate: SampleRate,
    pub channel: AudioChannel,
    pub data_opt: AudioDataOption,
    /// Frame duration in milliseconds.
    pub duration: u32,
    /// Frame size in samples.
    pub frame_size: u32,
}

impl Default for AudioParams {
    fn default() -> Self {
        AudioParams {
            content_type: ContentType::Raw,
            codec: AudioCodec::Opus,
            sample_rate: SampleRate::Sr16k,
            channel: AudioChannel::Mono,
            data_opt: AudioDataOption::MixedStream,
            duration: 20,
            frame_size: 320,
        }
    }
}

impl AudioParams {
    pub fn validate(&self) -> Result<(), Error> {
        if self.duration == 0 {
            return Err(Error::new(ErrorKind::InvalidMediaParams(
                "audio duration must be positive",
            )));
        }
        if self.frame_size == 0 {
            return Err(Error::new(ErrorKind::InvalidMediaParams(
                "audio frame size must be positive",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoParams {
    pub content_type: ContentType,
    pub codec: VideoCodec,
    pub resolution: VideoResolution,
    pub data_opt: VideoDataOption,
    pub fps: u32,
}

impl Default for VideoParams {
    fn default() -> Self {
        VideoParams {
            content_type: ContentType::Raw,
            codec: VideoCodec::Jpg,
            resolution: VideoResolution::Hd,
            data_opt: VideoDataOption::SingleActiveStream,
            fps: 5,
        }
    }
}

impl VideoParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_fps(self.fps, "video fps must be between 1 and 30")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskshareParams {
    pub content_type: ContentType,
    pub codec: VideoCodec,
    pub resolution: VideoResolution,
    pub fps: u32,
}

impl Default for DeskshareParams {
    fn default() -> Self {
        DeskshareParams {
            content_type: ContentType::Raw,
            codec: VideoCodec::Jpg,
            resolution: VideoResolution::Hd,
            fps: 1,
        }
    }
}

impl DeskshareParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_fps(self.fps, "deskshare fps must be between 1 and 30")
    }
}

fn validate_fps(fps: u32, reason: &'static str) -> Result<(), Error> {
    if fps == 0 || fps > MAX_FPS {
        return Err(Error::new(ErrorKind::InvalidMediaParams(reason)));
    }
    Ok(())
}

/// Everything the engine is told about media before a join.
///
/// An empty `media_types` leaves the selection to the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MediaConfig {
    pub media_types: MediaType,
    pub audio: Option<AudioParams>,
    pub video: Option<VideoParams>,
    pub deskshare: Option<DeskshareParams>,
}
