use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::error::GenerationError;
use crate::extract::{extract, extract_streaming, Extraction};

/// Text deltas as they arrive from a provider.
pub type TextStream = BoxStream<'static, Result<String, GenerationError>>;

/// Events forwarded from a generation task to whoever renders it.
#[derive(Debug)]
pub enum StreamEvent {
    Delta(String),
    Done,
    Error(GenerationError),
}

/// Collects streamed text and keeps a live extraction of it.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    text: String,
    latest: Extraction,
}

impl ResponseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, delta: &str) -> &Extraction {
        self.text.push_str(delta);
        self.latest = extract_streaming(&self.text);
        &self.latest
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn latest(&self) -> &Extraction {
        &self.latest
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn finish(self) -> Completion {
        let extraction = extract(&self.text);
        Completion {
            text: self.text,
            extraction,
        }
    }
}

/// A finished response: the raw text and what was extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub extraction: Extraction,
}

/// Consume a provider stream to the end. `on_update` sees every delta along
/// with the extraction so far. A failure after some text arrived comes back
/// as [`GenerationError::Interrupted`] carrying that text.
pub async fn drive<F>(stream: TextStream, mut on_update: F) -> Result<Completion, GenerationError>
where
    F: FnMut(&str, &Extraction),
{
    drive_while(stream, |delta, extraction| {
        on_update(delta, extraction);
        true
    })
    .await
}

/// Like [`drive`], but stops reading as soon as `on_update` returns false and
/// completes with the text received up to that point.
pub async fn drive_while<F>(mut stream: TextStream, mut on_update: F) -> Result<Completion, GenerationError>
where
    F: FnMut(&str, &Extraction) -> bool,
{
    let mut acc = ResponseAccumulator::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(delta) => {
                let extraction = acc.push(&delta);
                if !on_update(&delta, extraction) {
                    tracing::debug!(chars = acc.text.len(), "stream abandoned by consumer");
                    return Ok(acc.finish());
                }
            }
            Err(e) if acc.is_empty() => return Err(e),
            Err(e) => {
                return Err(GenerationError::Interrupted {
                    partial: acc.text,
                    source: Box::new(e),
                })
            }
        }
    }
    tracing::debug!(chars = acc.text.len(), "stream finished");
    Ok(acc.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractionMethod;
    use futures_util::stream;

    fn text_stream(items: Vec<Result<String, GenerationError>>) -> TextStream {
        Box::pin(stream::iter(items))
    }

    #[test]
    fn test_accumulator_live_preview() {
        let mut acc = ResponseAccumulator::new();
        acc.push("Sure! <mark");
        assert_eq!(acc.latest().chat, "Sure!");
        assert!(acc.latest().code.is_none());

        acc.push("down_code>\n# Ti");
        assert_eq!(acc.latest().method, ExtractionMethod::Unterminated);
        assert_eq!(acc.latest().code.as_deref(), Some("# Ti"));

        acc.push("tle\n</markdown_code>");
        let done = acc.finish();
        assert_eq!(done.extraction.method, ExtractionMethod::Tagged);
        assert_eq!(done.extraction.code.as_deref(), Some("# Title"));
        assert!(done.text.starts_with("Sure! <markdown_code>"));
    }

    #[tokio::test]
    async fn test_drive_collects_all_deltas() {
        let stream = text_stream(vec![
            Ok("<markdown_code>".to_string()),
            Ok("fn main() {}".to_string()),
            Ok("</markdown_code>".to_string()),
        ]);
        let mut seen = 0;
        let completion = drive(stream, |_, _| seen += 1).await.unwrap();
        assert_eq!(seen, 3);
        assert_eq!(completion.extraction.code.as_deref(), Some("fn main() {}"));
    }

    #[tokio::test]
    async fn test_drive_error_before_text() {
        let stream = text_stream(vec![Err(GenerationError::Blocked("SAFETY".to_string()))]);
        let err = drive(stream, |_, _| {}).await.unwrap_err();
        assert!(matches!(err, GenerationError::Blocked(_)));
    }

    #[tokio::test]
    async fn test_drive_error_mid_stream_keeps_partial() {
        let stream = text_stream(vec![
            Ok("half".to_string()),
            Err(GenerationError::Stream("reset".to_string())),
            Ok("never".to_string()),
        ]);
        let err = drive(stream, |_, _| {}).await.unwrap_err();
        assert_eq!(err.partial_text(), Some("half"));
    }

    #[tokio::test]
    async fn test_drive_while_stops_when_consumer_declines() {
        let stream = text_stream(vec![
            Ok("first ".to_string()),
            Ok("second".to_string()),
            Err(GenerationError::Stream("unreached".to_string())),
        ]);
        let mut calls = 0;
        let completion = drive_while(stream, |_, _| {
            calls += 1;
            false
        })
        .await
        .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(completion.text, "first ");
        assert_eq!(completion.extraction.chat, "first");
    }
}
