//! Revolve engine: byte stream decoding, record framing and turn execution.
mod controller;
mod decode;
mod framer;
mod handle;
mod transport;
mod types;

pub use controller::{
    ChannelSignalSink, DismissalReceiver, NullSignalSink, SessionController, SignalSink,
};
pub use decode::ChunkDecoder;
pub use framer::{LineFramer, RecordPipeline};
pub use handle::SessionHandle;
pub use transport::{
    build_request_body, ByteStream, Passthrough, ReqwestTransport, RequestShape, Transport,
    TransportSettings,
};
pub use types::{FailureKind, SessionEvent, SessionSignal, SubmitError, TransportError};
