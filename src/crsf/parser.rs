//! # CRSF Frame Parser
//!
//! Byte-at-a-time framing state machine. It is restartable: a frame may be
//! split across any number of `push` calls (and therefore across ticks).
//!
//! ```text
//! AwaitingSync --0xC8--> ReadingLength --len--> ReadingPayload --last byte--> AwaitingSync
//! ```
//!
//! Only frames of the accepted type are captured into a [`PacketPayload`]; every
//! other frame is stepped over with its cursor still advancing.

use super::protocol::*;

/// Parser position in the byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    AwaitingSync,
    ReadingLength,
    ReadingPayload,
}

/// What a completed frame turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// Accepted type with the expected length, ready for CRC validation
    Accepted(PacketPayload),

    /// Any other completed frame
    Ignored { frame_type: u8, length: u8 },
}

/// Framing options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    pub sync_byte: u8,
    pub accepted_type: u8,

    /// Restart framing when the sync byte shows up inside a frame.
    /// Off by default: channel data may legitimately contain 0xC8.
    pub resync_on_sync_byte: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            sync_byte: CRSF_SYNC_BYTE,
            accepted_type: CRSF_FRAMETYPE_RC_CHANNELS_PACKED,
            resync_on_sync_byte: false,
        }
    }
}

/// CRSF framing state machine
#[derive(Debug, Clone)]
pub struct FrameParser {
    options: ParserOptions,
    state: ParserState,

    /// Declared frame length (type + payload + crc)
    frame_length: u8,
    frame_type: u8,

    /// Bytes consumed since the sync byte (sync = 0)
    cursor: usize,

    /// Cursor value of the frame's last byte
    end_cursor: usize,

    capturing: bool,
    packet: PacketPayload,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl FrameParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            state: ParserState::AwaitingSync,
            frame_length: 0,
            frame_type: 0,
            cursor: 0,
            end_cursor: 0,
            capturing: false,
            packet: PacketPayload::new(),
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Feed one byte
    ///
    /// Returns an event when this byte completes a frame.
    pub fn push(&mut self, byte: u8) -> Option<FrameEvent> {
        match self.state {
            ParserState::AwaitingSync => {
                if byte == self.options.sync_byte {
                    self.start_frame();
                }
                None
            }
            ParserState::ReadingLength => {
                if !(CRSF_MIN_FRAME_LENGTH..=CRSF_MAX_FRAME_LENGTH).contains(&byte) {
                    self.state = ParserState::AwaitingSync;
                    // A rejected length byte may itself be the next frame's sync
                    if byte == self.options.sync_byte {
                        self.start_frame();
                    }
                    return None;
                }

                self.frame_length = byte;
                self.cursor = 1;
                self.end_cursor = 1 + byte as usize;
                self.state = ParserState::ReadingPayload;
                None
            }
            ParserState::ReadingPayload => {
                if byte == self.options.sync_byte && self.options.resync_on_sync_byte {
                    self.start_frame();
                    return None;
                }

                self.cursor += 1;
                let index = self.cursor - 2;

                if index == 0 {
                    self.frame_type = byte;
                    self.capturing = byte == self.options.accepted_type;
                }

                if self.capturing {
                    // Bytes past the fixed capacity are dropped
                    self.packet.set(index, byte);
                }

                if self.cursor >= self.end_cursor {
                    self.state = ParserState::AwaitingSync;
                    return Some(self.finish_frame());
                }

                None
            }
        }
    }

    /// Drop any partial frame and wait for the next sync byte
    pub fn reset(&mut self) {
        self.state = ParserState::AwaitingSync;
        self.cursor = 0;
        self.capturing = false;
    }

    fn start_frame(&mut self) {
        self.state = ParserState::ReadingLength;
        self.cursor = 0;
        self.frame_length = 0;
        self.frame_type = 0;
        self.capturing = false;
        self.packet.clear();
    }

    fn finish_frame(&mut self) -> FrameEvent {
        let accepted =
            self.capturing && self.frame_length as usize == CRSF_PACKET_PAYLOAD_SIZE;
        self.capturing = false;

        if accepted {
            FrameEvent::Accepted(self.packet)
        } else {
            FrameEvent::Ignored {
                frame_type: self.frame_type,
                length: self.frame_length,
            }
        }
    }
}
