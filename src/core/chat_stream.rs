//! Incremental application of a chunked reply body to the transcript.
//!
//! The streaming endpoint sends raw assistant text with no framing, so the
//! only parsing concern is UTF-8 sequences split across chunk boundaries.
//! One [`StreamDecoder`] instance lives for the whole stream and holds
//! back a trailing partial sequence until the bytes that complete it
//! arrive; decoding chunks independently would corrupt any multi-byte
//! character that straddles a boundary.

use futures_util::{Stream, StreamExt};

use crate::core::transcript::TranscriptStore;

/// Stateful UTF-8 decoder for a chunked byte transport.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every complete UTF-8 sequence accumulated so far. A trailing
    /// partial sequence stays buffered for the next call; invalid bytes
    /// decode to U+FFFD rather than aborting the stream.
    pub fn feed(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut decoded = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    decoded.push_str(text);
                    self.pending.clear();
                    return decoded;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    decoded.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            // Incomplete sequence at the buffer end.
                            self.pending.drain(..valid);
                            return decoded;
                        }
                    }
                }
            }
        }
    }

    /// Flush whatever is still buffered once the transport is done. A
    /// dangling partial sequence decodes lossily at this point.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Pull chunks until the transport completes and append each decoded piece
/// to the sink entry captured at stream start.
///
/// The sink index is fixed for the whole stream: if the transcript was
/// cleared while the stream was in flight, the appends become no-ops
/// instead of landing on whatever entry now occupies that position. Empty
/// decoded chunks (for example a chunk that only delivered the first bytes
/// of a multi-byte character) are skipped, not treated as completion.
pub async fn drain_into_sink<S, B, E>(
    transcript: &TranscriptStore,
    sink: usize,
    mut chunks: S,
) -> Result<(), E>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut decoder = StreamDecoder::new();
    while let Some(chunk) = chunks.next().await {
        let decoded = decoder.feed(chunk?.as_ref());
        if decoded.is_empty() {
            continue;
        }
        transcript.append_content(sink, &decoded);
    }
    let tail = decoder.finish();
    if !tail.is_empty() {
        transcript.append_content(sink, &tail);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Arc;

    use futures_util::stream;

    use super::*;
    use crate::core::message::{ConversationEntry, Role};
    use crate::core::storage::{KeyValueStore, MemoryStore};

    fn empty_store() -> TranscriptStore {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
        TranscriptStore::load(storage)
    }

    fn ok_chunks(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Vec<u8>, Infallible>> + Unpin {
        stream::iter(chunks.into_iter().map(Ok))
    }

    #[test]
    fn decoder_handles_multibyte_split_across_chunks() {
        // "🦀" is F0 9F A6 80; split it down the middle.
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.feed(&[0xF0, 0x9F]), "");
        assert_eq!(decoder.feed(&[0xA6, 0x80]), "🦀");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn decoder_matches_whole_input_decode() {
        let text = "héllo wörld 🦀 end";
        let bytes = text.as_bytes();
        let mut decoder = StreamDecoder::new();
        let mut reassembled = String::new();
        for chunk in bytes.chunks(3) {
            reassembled.push_str(&decoder.feed(chunk));
        }
        reassembled.push_str(&decoder.finish());
        assert_eq!(reassembled, text);
    }

    #[test]
    fn decoder_replaces_invalid_bytes() {
        let mut decoder = StreamDecoder::new();
        let decoded = decoder.feed(&[b'a', 0xFF, b'b']);
        assert_eq!(decoded, "a\u{FFFD}b");
    }

    #[test]
    fn decoder_flushes_dangling_partial_sequence_lossily() {
        let mut decoder = StreamDecoder::new();
        assert_eq!(decoder.feed(&[0xF0, 0x9F]), "");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[tokio::test]
    async fn streamed_turn_grows_the_transcript_by_two_entries() {
        let store = empty_store();
        store.append(ConversationEntry::user("hi"));
        let sink = store.begin_assistant_entry();

        let chunks = ok_chunks(vec![b"He".to_vec(), b"llo".to_vec()]);
        drain_into_sink(&store, sink, chunks)
            .await
            .expect("stream completes");

        let entries = store.snapshot();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].role, Role::Assistant);
        assert_eq!(entries[1].content, "Hello");
    }

    #[tokio::test]
    async fn chunks_apply_in_arrival_order_across_boundaries() {
        let store = empty_store();
        let sink = store.begin_assistant_entry();

        // "né" with the é split across chunks.
        let chunks = ok_chunks(vec![vec![b'n', 0xC3], vec![0xA9, b'!']]);
        drain_into_sink(&store, sink, chunks)
            .await
            .expect("stream completes");

        assert_eq!(store.snapshot()[sink].content, "né!");
    }

    #[tokio::test]
    async fn clearing_mid_stream_drops_the_rest_of_the_stream() {
        let store = empty_store();
        store.append(ConversationEntry::user("hi"));
        let sink = store.begin_assistant_entry();
        store.clear();

        let chunks = ok_chunks(vec![b"late".to_vec()]);
        drain_into_sink(&store, sink, chunks)
            .await
            .expect("stream completes");

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn transport_error_keeps_partial_content_and_surfaces_the_error() {
        let store = empty_store();
        let sink = store.begin_assistant_entry();

        let chunks = stream::iter(vec![Ok(b"part".to_vec()), Err("connection reset")]);
        let result = drain_into_sink(&store, sink, chunks).await;

        assert_eq!(result, Err("connection reset"));
        assert_eq!(store.snapshot()[sink].content, "part");
    }
}
