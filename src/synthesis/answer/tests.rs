use super::*;
use crate::corpus::Page;
use crate::synthesis::Role;
use std::sync::Mutex;

/// Streams the report text back word by word
struct EchoProvider {
    seen: Mutex<Vec<ChatMessage>>,
}

impl EchoProvider {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl CompletionProvider for EchoProvider {
    fn stream_chat(&self, messages: &[ChatMessage]) -> Result<TextDeltas> {
        self.seen
            .lock()
            .expect("lock should not be poisoned")
            .extend_from_slice(messages);
        let text = messages[2].content.clone();
        let words: Vec<Result<String>> = text
            .split_inclusive(' ')
            .map(|word| Ok(word.to_string()))
            .collect();
        Ok(Box::new(words.into_iter()))
    }
}

/// Fails before producing anything
struct QuotaProvider;

impl CompletionProvider for QuotaProvider {
    fn stream_chat(&self, _messages: &[ChatMessage]) -> Result<TextDeltas> {
        Err(SearchError::ProviderQuotaExceeded {
            provider: "completion".to_string(),
            message: "HTTP 429".to_string(),
        })
    }
}

/// Emits the given fragments, then drops the connection
struct DroppingProvider {
    fragments: Vec<&'static str>,
}

impl CompletionProvider for DroppingProvider {
    fn stream_chat(&self, _messages: &[ChatMessage]) -> Result<TextDeltas> {
        let items: Vec<Result<String>> = self
            .fragments
            .iter()
            .map(|fragment| Ok((*fragment).to_string()))
            .chain(std::iter::once(Err(SearchError::ProviderUnavailable {
                provider: "completion".to_string(),
                message: "connection reset".to_string(),
            })))
            .collect();
        Ok(Box::new(items.into_iter()))
    }
}

#[test]
fn join_page_text_flattens_whitespace_in_ranked_order() {
    let pages = [
        Page::new("doc", 7, "Revenue grew\n10%.", vec![1.0]).expect("valid page"),
        Page::new("doc", 2, "Emissions\tfell.", vec![1.0]).expect("valid page"),
    ];
    let ranked = vec![
        RankedPage {
            page: &pages[1],
            score: 0.9,
        },
        RankedPage {
            page: &pages[0],
            score: 0.4,
        },
    ];

    assert_eq!(join_page_text(&ranked), "Emissions fell. Revenue grew 10%.");
    assert_eq!(join_page_text(&[]), "");
}

#[test]
fn messages_restrict_answer_to_supplied_text() {
    let messages = build_messages("What was revenue growth?", "Revenue grew\t10%.\r\n");

    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].role, Role::System);
    assert_eq!(messages[0].content, SYSTEM_PROMPT);
    assert!(messages[1].content.contains("What was revenue growth?"));
    assert_eq!(messages[2].content, "Revenue grew 10%.  ");
    assert!(messages[3].content.contains("from the texts only"));
    assert!(messages[3].content.contains("general knowledge"));
    assert!(messages[1..].iter().all(|m| m.role == Role::User));
}

#[test]
fn echo_provider_answer_uses_only_supplied_text() {
    let provider = Arc::new(EchoProvider::new());
    let synthesizer = Synthesizer::new(Arc::clone(&provider) as Arc<dyn CompletionProvider>);

    let stream = synthesizer
        .synthesize("What was revenue growth?", "Revenue grew 10%.")
        .expect("stream should start");
    let fragments: Vec<String> = stream
        .collect::<Result<Vec<_>>>()
        .expect("stream should complete");

    assert!(fragments.len() > 1);
    let answer = fragments.concat();
    assert_eq!(answer, "Revenue grew 10%.");

    let seen = provider.seen.lock().expect("lock should not be poisoned");
    assert!(seen.iter().any(|m| m.content == "Revenue grew 10%."));
}

#[test]
fn collect_answer_concatenates_fragments() {
    let synthesizer = Synthesizer::new(Arc::new(EchoProvider::new()));
    let answer = synthesizer
        .synthesize("q", "one two three")
        .expect("stream should start")
        .collect_answer()
        .expect("answer should complete");
    assert_eq!(answer, "one two three");
}

#[test]
fn quota_error_before_output() {
    let synthesizer = Synthesizer::new(Arc::new(QuotaProvider));
    let result = synthesizer.synthesize("What was revenue growth?", "Revenue grew 10%.");

    let Err(error) = result else {
        panic!("quota failure should surface before streaming");
    };
    assert!(matches!(error, SearchError::ProviderQuotaExceeded { .. }));
    assert_eq!(error.partial_answer(), None);
}

#[test]
fn interruption_preserves_partial_text() {
    let synthesizer = Synthesizer::new(Arc::new(DroppingProvider {
        fragments: vec!["Revenue ", "grew "],
    }));
    let mut stream = synthesizer
        .synthesize("q", "text")
        .expect("stream should start");

    assert_eq!(stream.next().map(|r| r.expect("ok")), Some("Revenue ".to_string()));
    assert_eq!(stream.next().map(|r| r.expect("ok")), Some("grew ".to_string()));
    assert_eq!(stream.partial(), "Revenue grew ");

    match stream.next() {
        Some(Err(SearchError::SynthesisInterrupted { partial, message })) => {
            assert_eq!(partial, "Revenue grew ");
            assert!(message.contains("connection reset"));
        }
        other => panic!("expected interruption, got {other:?}"),
    }
    assert!(stream.next().is_none());
}

#[test]
fn failure_before_first_fragment_keeps_provider_error() {
    let synthesizer = Synthesizer::new(Arc::new(DroppingProvider {
        fragments: Vec::new(),
    }));
    let error = synthesizer
        .synthesize("q", "text")
        .expect("stream should start")
        .collect_answer()
        .expect_err("stream should fail");

    assert!(matches!(error, SearchError::ProviderUnavailable { .. }));
    assert_eq!(error.partial_answer(), None);
}

#[test]
fn collect_answer_reports_interruption() {
    let synthesizer = Synthesizer::new(Arc::new(DroppingProvider {
        fragments: vec!["Half an answer"],
    }));
    let error = synthesizer
        .synthesize("q", "text")
        .expect("stream should start")
        .collect_answer()
        .expect_err("stream should fail");

    assert_eq!(error.partial_answer(), Some("Half an answer"));
}
