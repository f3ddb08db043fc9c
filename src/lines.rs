//! Incremental byte-to-line decoding shared by the HTTP streaming transports.
//!
//! The transports deliver arbitrary byte chunks; chunk boundaries can fall
//! inside a multi-byte character or inside a line. Decoding here is stateful
//! so the emitted lines are identical for every splitting of the same bytes.

use async_stream::try_stream;
use futures::Stream;

use crate::client::ClientError;

/// Incremental UTF-8 decoder.
///
/// Holds at most one pending partial multi-byte sequence between chunks so a
/// character split across a chunk boundary decodes once its continuation
/// bytes arrive. Invalid sequences decode to U+FFFD and decoding continues.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text completed so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let joined;
        let buf: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            joined = [self.pending.as_slice(), chunk].concat();
            self.pending.clear();
            &joined
        };

        let mut out = String::with_capacity(buf.len());
        let mut rest = buf;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push('\u{FFFD}');
                            rest = &after[len..];
                        }
                        None => {
                            // Incomplete sequence at the end; carry it over.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Flush at end of input. A dangling partial sequence becomes U+FFFD.
    pub fn finish(&mut self) -> Option<char> {
        if self.pending.is_empty() {
            None
        } else {
            self.pending.clear();
            Some('\u{FFFD}')
        }
    }
}

/// Convert a fallible byte-chunk stream into a stream of complete lines.
///
/// Lines are split on `\n` and the newline is stripped. Whatever trails the
/// last newline survives iteration and is emitted exactly once at end of
/// input if non-empty.
pub fn lines<S, B>(chunks: S) -> impl Stream<Item = Result<String, ClientError>> + Send
where
    S: Stream<Item = Result<B, ClientError>> + Send,
    B: AsRef<[u8]> + Send,
{
    try_stream! {
        let mut decoder = Utf8Decoder::new();
        let mut buffer = String::new();

        for await chunk in chunks {
            let chunk = chunk?;
            buffer.push_str(&decoder.decode(chunk.as_ref()));

            while let Some(position) = buffer.find('\n') {
                let line = buffer[..position].to_string();
                buffer.drain(..=position);
                yield line;
            }
        }

        if let Some(replacement) = decoder.finish() {
            buffer.push(replacement);
        }
        if !buffer.is_empty() {
            yield buffer;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn byte_chunks(
        chunks: Vec<&'static [u8]>,
    ) -> impl Stream<Item = Result<&'static [u8], ClientError>> {
        futures::stream::iter(chunks.into_iter().map(Ok))
    }

    async fn collect_lines(chunks: Vec<&'static [u8]>) -> Vec<String> {
        lines(byte_chunks(chunks))
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    #[test]
    fn test_decoder_handles_split_multibyte_char() {
        // "é" is 0xC3 0xA9
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"caf\xC3"), "caf");
        assert_eq!(decoder.decode(b"\xA9"), "é");
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_decoder_replaces_invalid_bytes() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn test_decoder_flushes_dangling_sequence_as_replacement() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"ok\xE2\x82"), "ok");
        assert_eq!(decoder.finish(), Some('\u{FFFD}'));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let lines = collect_lines(vec![b"first li", b"ne\nsecond", b" line\n"]).await;
        assert_eq!(lines, vec!["first line", "second line"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline_is_emitted() {
        let lines = collect_lines(vec![b"one\ntwo"]).await;
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_multibyte_char_split_at_chunk_boundary() {
        // "你好" split in the middle of the second character
        let lines = collect_lines(vec![b"\xE4\xBD\xA0\xE5\xA5", b"\xBD\n"]).await;
        assert_eq!(lines, vec!["你好"]);
    }

    #[tokio::test]
    async fn test_all_splittings_produce_identical_lines() {
        let content = "aé\n你好\nplain\n".as_bytes();
        let expected = vec!["aé".to_string(), "你好".to_string(), "plain".to_string()];
        for split in 1..content.len() {
            let chunks: Vec<&[u8]> = vec![&content[..split], &content[split..]];
            let lines: Vec<String> = lines(futures::stream::iter(
                chunks.into_iter().map(Ok::<_, ClientError>),
            ))
            .map(|line| line.unwrap())
            .collect()
            .await;
            assert_eq!(lines, expected, "split at byte {split}");
        }
    }

    #[tokio::test]
    async fn test_empty_input_yields_nothing() {
        let lines = collect_lines(vec![]).await;
        assert!(lines.is_empty());
    }

    #[tokio::test]
    async fn test_accepts_bytes_chunks() {
        // reqwest delivers `bytes::Bytes`; the framer is generic over it.
        let chunks = futures::stream::iter(vec![
            Ok::<_, ClientError>(bytes::Bytes::from_static(b"a\nb")),
            Ok(bytes::Bytes::from_static(b"c\n")),
        ]);
        let collected: Vec<String> = lines(chunks).map(|line| line.unwrap()).collect().await;
        assert_eq!(collected, vec!["a", "bc"]);
    }
}
