mod forwarder;
mod sink;


pub use forwarder::StreamForwarder;
pub use sink::{JsonLinesSink, StreamMessage, StreamSink};
