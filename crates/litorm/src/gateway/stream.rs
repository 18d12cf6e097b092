use std::future::poll_fn;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;

use crate::error::OrmResult;
use crate::row::{FromRow, Row};

/// A stream of result rows.
///
/// Type-erased wrapper around a `Stream<Item = OrmResult<Row>>` so that
/// every gateway returns the same streaming type. Rows are produced as the
/// reader pulls them.
#[must_use]
pub struct RowStream {
    inner: Pin<Box<dyn Stream<Item = OrmResult<Row>> + Send>>,
}

impl RowStream {
    /// Create a new `RowStream` from any compatible stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = OrmResult<Row>> + Send + 'static,
    {
        Self {
            inner: Box::pin(stream),
        }
    }

    /// Stream rows pushed through a channel by a worker.
    pub fn from_receiver(rx: mpsc::Receiver<OrmResult<Row>>) -> Self {
        Self::new(ReceiverStream { rx })
    }

    /// Stream already materialized rows.
    pub fn from_rows(rows: Vec<OrmResult<Row>>) -> Self {
        Self::new(IterStream {
            iter: rows.into_iter(),
        })
    }

    /// Next row, or `None` once the result set is exhausted.
    pub async fn next(&mut self) -> Option<OrmResult<Row>> {
        poll_fn(|cx| self.inner.as_mut().poll_next(cx)).await
    }

    /// Drain the stream, stopping at the first error.
    pub async fn collect_rows(mut self) -> OrmResult<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next().await {
            rows.push(row?);
        }
        Ok(rows)
    }
}

impl Stream for RowStream {
    type Item = OrmResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for RowStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStream").finish_non_exhaustive()
    }
}

struct ReceiverStream {
    rx: mpsc::Receiver<OrmResult<Row>>,
}

impl Stream for ReceiverStream {
    type Item = OrmResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

struct IterStream {
    iter: std::vec::IntoIter<OrmResult<Row>>,
}

impl Stream for IterStream {
    type Item = OrmResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.iter.next())
    }
}

/// A [`RowStream`] mapped to `T` row by row.
#[must_use]
pub struct FromRowStream<T> {
    inner: RowStream,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FromRowStream<T> {
    pub fn new(inner: RowStream) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }
}

impl<T: FromRow> FromRowStream<T> {
    pub async fn next(&mut self) -> Option<OrmResult<T>> {
        let row = self.inner.next().await?;
        Some(row.and_then(|row| T::from_row(&row)))
    }
}

impl<T: FromRow> Stream for FromRowStream<T> {
    type Item = OrmResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Ok(row))) => Poll::Ready(Some(T::from_row(&row))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}
