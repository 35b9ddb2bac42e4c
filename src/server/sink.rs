//! Channel-backed body sink
//!
//! Bridges the stream writer to a hyper response body. The bounded channel
//! applies backpressure: a chunk is only read from disk once the connection
//! has room for it. When hyper drops the body (client gone) the channel
//! closes and the writer sees a disconnect.

use http_body_util::{BodyExt, StreamBody};
use hyper::body::{Bytes, Frame};
use std::io;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::http::ResponseBody;
use crate::stream::BodySink;

type FrameResult = Result<Frame<Bytes>, io::Error>;

/// Sending half; implements [`BodySink`]
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<FrameResult>,
}

/// Create a sink and the response body it feeds
pub fn channel_body(depth: usize) -> (ChannelSink, ResponseBody) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    let body = StreamBody::new(ReceiverStream::new(rx)).boxed();
    (ChannelSink { tx }, body)
}

impl ChannelSink {
    /// Abort the body so the client sees a broken response, not a short one
    pub async fn fail(self, reason: &str) {
        let _ = self.tx.send(Err(io::Error::other(reason.to_string()))).await;
    }
}

impl BodySink for ChannelSink {
    async fn write(&mut self, chunk: Bytes) -> io::Result<()> {
        self.tx
            .send(Ok(Frame::data(chunk)))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))
    }

    fn is_disconnected(&self) -> bool {
        self.tx.is_closed()
    }
}
