//! Exchange cycle: transcript growth, rejection of blank input, failure turns.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use superexpat::catalog;
use superexpat::profile::SessionContext;
use superexpat::prompt::FALLBACK_SUGGESTED_QUESTIONS;
use superexpat::providers::{
    CompletionRequest, CompletionResponse, LlmProvider, ProviderError, Role, UsageStats,
};
use superexpat::session::{
    AssistantSession, Sender, SessionOptions, SessionState, SubmitError, APOLOGY_TEXT,
};

/// What the scripted provider does on one call.
enum Step {
    Reply(String),
    Fail(ProviderError),
    Hang,
}

/// A provider that plays back a script and records every request.
struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    fn new(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(err) => panic!("requests lock poisoned: {err}"),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let step = {
            let mut requests = self.requests.lock().expect("requests lock");
            requests.push(request);
            let mut script = self.script.lock().expect("script lock");
            script.pop_front()
        };
        match step {
            Some(Step::Reply(text)) => Ok(CompletionResponse {
                text,
                finish_reason: Some("stop".to_owned()),
                usage: UsageStats {
                    input_tokens: 40,
                    output_tokens: 12,
                },
                model: "mock".to_owned(),
            }),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ProviderError::Parse("woke up".to_owned()))
            }
            None => Err(ProviderError::Parse("script exhausted".to_owned())),
        }
    }

    fn model_id(&self) -> &str {
        "mock"
    }
}

fn session_with(provider: Arc<ScriptedProvider>, context: SessionContext) -> AssistantSession {
    AssistantSession::new(context, provider, SessionOptions::default())
}

#[tokio::test]
async fn n_exchanges_produce_two_n_turns_in_order() {
    let provider = ScriptedProvider::new(vec![
        Step::Reply("first answer".to_owned()),
        Step::Reply("second answer".to_owned()),
        Step::Reply("third answer".to_owned()),
    ]);
    let session = session_with(provider, SessionContext::default());

    for question in ["one?", "two?", "three?"] {
        let result = session.submit(question).await;
        assert!(result.is_ok(), "submit should be accepted: {result:?}");
    }

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 6);
    let texts: Vec<(Sender, &str)> = transcript
        .turns()
        .iter()
        .map(|t| (t.sender, t.text.as_str()))
        .collect();
    assert_eq!(
        texts,
        vec![
            (Sender::User, "one?"),
            (Sender::Assistant, "first answer"),
            (Sender::User, "two?"),
            (Sender::Assistant, "second answer"),
            (Sender::User, "three?"),
            (Sender::Assistant, "third answer"),
        ]
    );
    for (i, turn) in transcript.turns().iter().enumerate() {
        assert_eq!(turn.position, i);
    }
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn blank_submissions_never_touch_the_transcript() {
    let provider = ScriptedProvider::new(vec![]);
    let session = session_with(Arc::clone(&provider), SessionContext::default());

    assert_eq!(session.submit("").await, Err(SubmitError::EmptyInput));
    assert_eq!(session.submit("   ").await, Err(SubmitError::EmptyInput));
    assert_eq!(session.submit("\n\t").await, Err(SubmitError::EmptyInput));

    assert!(session.transcript().is_empty());
    assert!(provider.requests().is_empty());
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn non_success_status_appends_one_apology_turn() {
    let provider = ScriptedProvider::new(vec![Step::Fail(ProviderError::HttpStatus {
        status: 502,
        body: "bad gateway".to_owned(),
    })]);
    let session = session_with(provider, SessionContext::default());

    let turn = session
        .submit("Is it safe?")
        .await
        .expect("failure is not a submit error");
    assert_eq!(turn.sender, Sender::Assistant);
    assert_eq!(turn.text, APOLOGY_TEXT);

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.turns()[1].text, APOLOGY_TEXT);
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn malformed_response_is_treated_like_any_other_failure() {
    let provider = ScriptedProvider::new(vec![
        Step::Fail(ProviderError::Parse("missing choices[0]".to_owned())),
        Step::Reply("recovered".to_owned()),
    ]);
    let session = session_with(provider, SessionContext::default());

    let first = session.submit("hello").await.expect("accepted");
    assert_eq!(first.text, APOLOGY_TEXT);

    // The user retries manually; the session is usable again.
    let second = session.submit("hello").await.expect("accepted");
    assert_eq!(second.text, "recovered");
    assert_eq!(session.transcript().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn timeout_expiry_becomes_an_apology_turn() {
    let provider = ScriptedProvider::new(vec![Step::Hang]);
    let session = AssistantSession::new(
        SessionContext::default(),
        provider,
        SessionOptions {
            timeout: Duration::from_secs(5),
            max_tokens: None,
        },
    );

    let turn = session.submit("anyone there?").await.expect("accepted");
    assert_eq!(turn.text, APOLOGY_TEXT);
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn request_carries_fresh_system_prompt_and_literal_text() {
    let provider = ScriptedProvider::new(vec![
        Step::Reply("a".to_owned()),
        Step::Reply("b".to_owned()),
    ]);
    let context = SessionContext {
        profile: None,
        country: catalog::country_by_code("NL").map(|c| c.to_selection()),
        category: catalog::category_by_key("climate").map(|c| c.to_selection()),
    };
    let session = session_with(Arc::clone(&provider), context);

    session.submit("  How rainy is it?  ").await.expect("accepted");
    session
        .switch_country(
            catalog::country_by_code("ID")
                .expect("catalog has Indonesia")
                .to_selection(),
        );
    session.submit("And here?").await.expect("accepted");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);

    let first = &requests[0];
    let system = first.system.as_deref().expect("system prompt is always sent");
    assert!(system.contains("Climate in Netherlands"));
    assert_eq!(first.messages.len(), 1);
    assert_eq!(first.messages[0].role, Role::User);
    assert_eq!(first.messages[0].content, "  How rainy is it?  ");

    let second = requests[1].system.as_deref().expect("system prompt");
    assert!(second.contains("Climate in Indonesia"));
    assert!(!second.contains("Netherlands"));
}

#[tokio::test]
async fn switch_country_leaves_existing_turns_untouched() {
    let provider = ScriptedProvider::new(vec![Step::Reply("Lots of tulips.".to_owned())]);
    let context = SessionContext {
        country: catalog::country_by_code("NL").map(|c| c.to_selection()),
        ..SessionContext::default()
    };
    let session = session_with(provider, context);

    session.submit("Tell me about it").await.expect("accepted");
    let before = session.transcript();

    session
        .switch_country(
            catalog::country_by_code("GB")
                .expect("catalog has the UK")
                .to_selection(),
        );

    assert_eq!(session.transcript(), before);
    let prompt = session.system_prompt();
    assert!(prompt.contains("United Kingdom"));
    assert!(!prompt.contains("Netherlands"));
}

#[tokio::test]
async fn suggestions_follow_the_active_category() {
    let with_category = session_with(
        ScriptedProvider::new(vec![]),
        SessionContext {
            category: catalog::category_by_key("health").map(|c| c.to_selection()),
            ..SessionContext::default()
        },
    );
    assert_eq!(
        with_category.suggested_questions(),
        vec![
            "How does the healthcare system work?",
            "What insurance do I need?",
            "Where are the best hospitals?",
        ]
    );

    let without = session_with(ScriptedProvider::new(vec![]), SessionContext::default());
    assert_eq!(
        without.suggested_questions(),
        FALLBACK_SUGGESTED_QUESTIONS.to_vec()
    );
}

#[tokio::test]
async fn submitting_a_suggestion_sends_its_literal_text() {
    let provider = ScriptedProvider::new(vec![Step::Reply("Plan for 1,500 EUR.".to_owned())]);
    let session = session_with(
        Arc::clone(&provider),
        SessionContext {
            category: catalog::category_by_key("cost_of_living").map(|c| c.to_selection()),
            ..SessionContext::default()
        },
    );

    session.submit_suggestion(1).await.expect("accepted");
    let transcript = session.transcript();
    assert_eq!(
        transcript.turns()[0].text,
        "How much should I budget for housing?"
    );
    assert_eq!(
        provider.requests()[0].messages[0].content,
        "How much should I budget for housing?"
    );

    assert_eq!(
        session.submit_suggestion(3).await,
        Err(SubmitError::UnknownSuggestion { index: 3 })
    );
    assert_eq!(session.transcript().len(), 2);
}
