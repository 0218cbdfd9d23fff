// Copyright 2019-2026 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use futures::{Stream, TryStreamExt as _};

/// Drains `stream` and returns the total number of bytes it yielded.
///
/// Chunks are dropped as soon as they are counted, so the body is never held
/// in memory as a whole. The first stream error stops the count.
pub async fn count_bytes<S, B, E>(stream: S) -> Result<u64, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
{
    stream
        .try_fold(0u64, |total, chunk| async move {
            Ok(total + chunk.as_ref().len() as u64)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures::{StreamExt as _, stream};
    use quickcheck_macros::quickcheck;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[tokio::test]
    async fn sums_chunk_lengths() {
        let chunks = [vec![0u8; 3], vec![1u8; 5], vec![2u8; 7]];
        let stream = stream::iter(chunks.map(|c| Ok::<_, std::io::Error>(Bytes::from(c))));
        assert_eq!(count_bytes(stream).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn empty_stream_is_zero() {
        let stream = stream::empty::<Result<Bytes, std::io::Error>>();
        assert_eq!(count_bytes(stream).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn drains_every_chunk() {
        let polled = Arc::new(AtomicUsize::new(0));
        let stream = stream::iter(vec![vec![0u8; 1], vec![], vec![0u8; 2], vec![0u8; 4]]).map({
            let polled = polled.clone();
            move |chunk| {
                polled.fetch_add(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(chunk)
            }
        });
        assert_eq!(count_bytes(stream).await.unwrap(), 7);
        assert_eq!(polled.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn stops_on_error() {
        let stream = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::other("boom")),
            Ok(Bytes::from_static(b"def")),
        ]);
        assert!(count_bytes(stream).await.is_err());
    }

    #[quickcheck]
    fn chunk_boundaries_do_not_matter(chunks: Vec<Vec<u8>>) -> bool {
        let expected: usize = chunks.iter().map(Vec::len).sum();
        let counted = futures::executor::block_on(count_bytes(stream::iter(
            chunks.into_iter().map(Ok::<_, std::io::Error>),
        )))
        .unwrap();
        counted == expected as u64
    }
}
