// ABOUTME: Whole-log byte stream that follows a live log until it is sealed.
// ABOUTME: Switches to sequential gzip decoding when the log is or becomes compressed.

use bytes::Bytes;
use flate2::read::GzDecoder;
use futures::Stream;
use std::io::{BufReader, Read};
use std::pin::Pin;

use super::{LogError, LogState, LogStore, open_decoder};

pub type LogStream = Pin<Box<dyn Stream<Item = Result<Bytes, LogError>> + Send>>;

enum Cursor {
    /// Offset-based reads of the plain log.
    Tail { offset: u64 },
    /// Sequential reads of the compressed log.
    Inflate {
        decoder: Box<GzDecoder<BufReader<std::fs::File>>>,
    },
    Done,
}

pub(super) fn full_stream(store: LogStore) -> LogStream {
    Box::pin(futures::stream::unfold(
        Cursor::Tail { offset: 0 },
        move |cursor| {
            let store = store.clone();
            async move { advance(&store, cursor).await }
        },
    ))
}

async fn advance(store: &LogStore, mut cursor: Cursor) -> Option<(Result<Bytes, LogError>, Cursor)> {
    loop {
        cursor = match cursor {
            Cursor::Done => return None,
            Cursor::Tail { offset } => {
                if store.state().await == LogState::Compressed {
                    let path = store.paths().compressed().to_path_buf();
                    let opened =
                        tokio::task::spawn_blocking(move || open_decoder(&path, offset)).await;
                    match opened {
                        Ok(Ok(decoder)) => Cursor::Inflate {
                            decoder: Box::new(decoder),
                        },
                        // Pruned underneath us: what was read is all there is.
                        Ok(Err(e)) if e.is_not_found() => return None,
                        Ok(Err(e)) => return Some((Err(e), Cursor::Done)),
                        Err(e) => return Some((Err(e.into()), Cursor::Done)),
                    }
                } else {
                    match store.read_from(offset).await {
                        Ok(chunk) if !chunk.bytes.is_empty() => {
                            let next = if chunk.complete {
                                Cursor::Done
                            } else {
                                Cursor::Tail {
                                    offset: chunk.next_offset,
                                }
                            };
                            return Some((Ok(chunk.bytes), next));
                        }
                        Ok(chunk) if chunk.complete => return None,
                        Ok(_) => {
                            tokio::time::sleep(store.settings().poll_interval).await;
                            Cursor::Tail { offset }
                        }
                        Err(e) => return Some((Err(e), Cursor::Done)),
                    }
                }
            }
            Cursor::Inflate { mut decoder } => {
                let chunk_size = store.settings().chunk_size.max(1);
                let path = store.paths().compressed().to_path_buf();
                let read = tokio::task::spawn_blocking(move || {
                    let mut buf = vec![0u8; chunk_size];
                    let result = decoder.read(&mut buf).map(|n| {
                        buf.truncate(n);
                        buf
                    });
                    (decoder, result)
                })
                .await;

                match read {
                    Ok((_, Ok(buf))) if buf.is_empty() => return None,
                    Ok((decoder, Ok(buf))) => {
                        return Some((Ok(Bytes::from(buf)), Cursor::Inflate { decoder }));
                    }
                    Ok((_, Err(e))) => return Some((Err(LogError::io(path, e)), Cursor::Done)),
                    Err(e) => return Some((Err(e.into()), Cursor::Done)),
                }
            }
        };
    }
}
