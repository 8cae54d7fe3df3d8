//! Fragment streams for incremental AI responses.
//!
//! A producer task pushes text fragments into a bounded channel; the consumer
//! reads them as a `Stream`. Dropping the [`FragmentStream`] closes the channel,
//! and the producer stops at its next send.

use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use crate::error::GatewayError;

pub type Fragment = Result<String, GatewayError>;

const DEFAULT_BUFFER: usize = 100;

/// Producer half. Cheap to clone.
#[derive(Clone)]
pub struct FragmentSender {
    tx: mpsc::Sender<Fragment>,
}

impl FragmentSender {
    /// Send one fragment. Returns `false` once the consumer has gone away.
    pub async fn send(&self, text: impl Into<String>) -> bool {
        self.tx.send(Ok(text.into())).await.is_ok()
    }

    /// Terminate the stream with an error.
    pub async fn fail(&self, err: GatewayError) {
        let _ = self.tx.send(Err(err)).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half: an ordered stream of text fragments.
pub struct FragmentStream {
    inner: ReceiverStream<Fragment>,
}

impl FragmentStream {
    pub fn channel() -> (FragmentSender, FragmentStream) {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> (FragmentSender, FragmentStream) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            FragmentSender { tx },
            FragmentStream {
                inner: ReceiverStream::new(rx),
            },
        )
    }

    /// A finished stream holding exactly these fragments.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<Fragment> = fragments.into_iter().map(|f| Ok(f.into())).collect();
        let (tx, rx) = mpsc::channel(items.len().max(1));
        for item in items {
            // capacity equals item count, so this never fails
            let _ = tx.try_send(item);
        }
        FragmentStream {
            inner: ReceiverStream::new(rx),
        }
    }

    /// Stop receiving; the producer observes a closed channel.
    pub fn cancel(mut self) {
        self.inner.close();
    }

    /// Drain the stream into one string, stopping at the first error.
    pub async fn collect_text(mut self) -> Result<String, GatewayError> {
        use futures_util::StreamExt;

        let mut out = String::new();
        while let Some(fragment) = self.next().await {
            out.push_str(&fragment?);
        }
        Ok(out)
    }
}

impl Stream for FragmentStream {
    type Item = Fragment;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn fragments_arrive_in_order() {
        let stream = FragmentStream::from_fragments(["a", "b", "c"]);
        assert_eq!(stream.collect_text().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn producer_sees_cancellation() {
        let (tx, stream) = FragmentStream::with_buffer(1);
        assert!(tx.send("first").await);
        stream.cancel();
        assert!(!tx.send("second").await);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn error_ends_collection() {
        let (tx, mut stream) = FragmentStream::channel();
        tokio::spawn(async move {
            tx.send("partial").await;
            tx.fail(GatewayError::Stream("reset".into())).await;
        });
        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
