//! Fixed-size chunking of fallible streams.

use futures::stream::{self, Stream, StreamExt};
use std::num::NonZeroUsize;
use std::pin::Pin;

#[cfg(test)]
#[path = "chunking_tests.rs"]
mod tests;

struct ChunkState<S, E> {
    stream: Pin<Box<S>>,
    pending_error: Option<E>,
    exhausted: bool,
}

/// Group a fallible stream into ordered chunks of `size` items.
///
/// Every chunk except possibly the last holds exactly `size` items, and at
/// most `size` items are pulled from the source per chunk. When the source
/// fails mid-chunk, the items collected so far are emitted as a short chunk
/// and the error follows as the next item. The stream ends after an error.
pub fn chunked<S, T, E>(source: S, size: NonZeroUsize) -> impl Stream<Item = Result<Vec<T>, E>>
where
    S: Stream<Item = Result<T, E>>,
{
    let state = ChunkState {
        stream: Box::pin(source),
        pending_error: None,
        exhausted: false,
    };

    stream::unfold(state, move |mut state| async move {
        if let Some(error) = state.pending_error.take() {
            return Some((Err(error), state));
        }
        if state.exhausted {
            return None;
        }

        let mut chunk = Vec::with_capacity(size.get());
        while chunk.len() < size.get() {
            match state.stream.next().await {
                Some(Ok(item)) => chunk.push(item),
                Some(Err(error)) => {
                    state.exhausted = true;
                    if chunk.is_empty() {
                        return Some((Err(error), state));
                    }
                    state.pending_error = Some(error);
                    return Some((Ok(chunk), state));
                }
                None => {
                    state.exhausted = true;
                    break;
                }
            }
        }

        if chunk.is_empty() {
            None
        } else {
            Some((Ok(chunk), state))
        }
    })
}
