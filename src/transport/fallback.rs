use std::sync::Arc;

use bytes::Bytes;

use crate::signaling::SignalMessage;
use crate::sink::MediaSink;
use crate::transport::negotiator::RoundContext;

/// Progressive-fragment playback: one self-contained playable fragment
/// per binary message, decoded off-screen and snapshotted onto the
/// visible surface. Used when segment buffering is unsupported.
pub struct Mp4Attempt {
    sink: Arc<dyn MediaSink>,
}

impl Mp4Attempt {
    pub fn start(ctx: &RoundContext) -> Self {
        let advertised = ctx.codecs.advertise(|codec| ctx.sink.can_decode(codec));
        ctx.sender.send(SignalMessage::Mp4(advertised));
        Self {
            sink: ctx.sink.clone(),
        }
    }

    pub fn on_binary(&self, fragment: Bytes) {
        self.sink.render_fragment(fragment);
    }
}

/// Snapshot polling: each binary message is one complete still image.
pub struct MjpegAttempt {
    sink: Arc<dyn MediaSink>,
}

impl MjpegAttempt {
    pub fn start(ctx: &RoundContext) -> Self {
        ctx.sender.send(SignalMessage::Mjpeg);
        Self {
            sink: ctx.sink.clone(),
        }
    }

    pub fn on_binary(&self, image: Bytes) {
        self.sink.set_static_image(image);
    }
}
