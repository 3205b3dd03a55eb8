//! Vantage Protocol - Wire format for the remote terminal
//!
//! Frames, envelopes and typed route payloads exchanged between an
//! instrumented process and its observers.
//!
//! # Layers
//!
//! ```text
//! ┌───────────────────────────────┐
//! │ Message (typed route payload) │  message.rs
//! ├───────────────────────────────┤
//! │ Envelope {route, fence, ...}  │  envelope.rs (JSON)
//! ├───────────────────────────────┤
//! │ Frame [magic][b64 len][body]  │  frame.rs
//! └───────────────────────────────┘
//! ```

mod envelope;
mod error;
pub mod frame;
pub mod message;

pub use envelope::Envelope;
pub use error::{ProtocolError, Result};
pub use frame::{
    DEFAULT_MAX_MESSAGE_SIZE, HEADER_SIZE, MAGIC, MAX_ENCODABLE_SIZE, decode_header,
    encode_frame, encode_header, read_frame, write_frame,
};
pub use message::{
    CategoryScheme, ConfigEntityUpdate, Configure, ControlTrace, EntityScheme, EntityValue,
    Login, Message, NewConfigClass, PushCommand, SessionReset, SessionState, ShellOutput,
    SignalFetchTraces, TraceClassList, TraceNodeScheme, TraceUpdate, TraceValueKind,
};
