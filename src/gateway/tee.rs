// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use bytes::{Bytes, BytesMut};
use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tracing::debug;

type OnComplete = Box<dyn FnOnce(Bytes) + Send>;

pin_project! {
    /// Passes a byte stream through unchanged while keeping a copy of it.
    ///
    /// Once the inner stream ends, the copy is handed to `on_complete`. If the
    /// stream fails, is dropped before its end, or grows past `max_len` bytes,
    /// `on_complete` never runs.
    pub struct CacheTee<S> {
        #[pin]
        inner: S,
        buffer: BytesMut,
        max_len: usize,
        on_complete: Option<OnComplete>,
    }
}

impl<S> CacheTee<S> {
    pub fn new(
        inner: S,
        max_len: usize,
        on_complete: impl FnOnce(Bytes) + Send + 'static,
    ) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            max_len,
            on_complete: Some(Box::new(on_complete)),
        }
    }
}

impl<S, E> Stream for CacheTee<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        match ready!(this.inner.poll_next(cx)) {
            Some(Ok(chunk)) => {
                if this.on_complete.is_some() {
                    if this.buffer.len().saturating_add(chunk.len()) > *this.max_len {
                        debug!(max_len = *this.max_len, "body too large to keep a copy of");
                        *this.on_complete = None;
                        *this.buffer = BytesMut::new();
                    } else {
                        this.buffer.extend_from_slice(&chunk);
                    }
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Some(Err(e)) => {
                *this.on_complete = None;
                *this.buffer = BytesMut::new();
                Poll::Ready(Some(Err(e)))
            }
            None => {
                if let Some(on_complete) = this.on_complete.take() {
                    on_complete(this.buffer.split().freeze());
                }
                Poll::Ready(None)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
