use tracing::{info, info_span, warn, Instrument};

use crate::errors::Failure;
use crate::plan::PlanDocument;
use crate::provider::Provider;
use crate::session::{NextAction, Session};
use crate::wire::SiteArtifact;

/// Drives a `Session` through its stages, one provider round trip per call.
pub struct Orchestrator<'p> {
    provider: &'p dyn Provider,
}

/// Result of the single "generate" control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Planned(PlanDocument),
    Generated(SiteArtifact),
}

impl<'p> Orchestrator<'p> {
    pub fn new(provider: &'p dyn Provider) -> Self {
        Self { provider }
    }

    pub async fn request_plan(&self, session: &mut Session) -> Result<PlanDocument, Failure> {
        let prompt = session.begin_plan()?;
        let mut in_flight = InFlight::new(session);
        let reply = self.round_trip("plan", &prompt, in_flight.session()).await;
        let out = in_flight
            .settle()
            .finish_plan(reply)
            .cloned()
            .map_err(|e| log_failure("plan", e));
        out
    }

    pub async fn request_site(&self, session: &mut Session) -> Result<SiteArtifact, Failure> {
        let prompt = session.begin_site()?;
        let mut in_flight = InFlight::new(session);
        let reply = self.round_trip("site", &prompt, in_flight.session()).await;
        let out = in_flight
            .settle()
            .finish_site(reply)
            .map_err(|e| log_failure("site", e));
        out
    }

    /// Plan first when planning is on and nothing is under review; otherwise
    /// generate the site.
    pub async fn generate(&self, session: &mut Session) -> Result<Outcome, Failure> {
        match session.next_action() {
            NextAction::Plan => self.request_plan(session).await.map(Outcome::Planned),
            NextAction::Site => self.request_site(session).await.map(Outcome::Generated),
        }
    }

    async fn round_trip(&self, step: &str, prompt: &str, session: &Session) -> Result<String, Failure> {
        let span = info_span!("round_trip", step, provider = self.provider.name(), model = self.provider.model());
        async {
            info!(prompt_chars = prompt.chars().count(), "sending request");
            let reply = self.provider.complete(prompt, session.credential()).await;
            if let Ok(text) = &reply {
                info!(reply_chars = text.chars().count(), "reply received");
            }
            reply
        }
        .instrument(span)
        .await
    }
}

/// Clears the busy flag if a request future is dropped before its reply
/// has been applied.
struct InFlight<'s> {
    session: &'s mut Session,
    settled: bool,
}

impl<'s> InFlight<'s> {
    fn new(session: &'s mut Session) -> Self {
        Self { session, settled: false }
    }

    fn session(&self) -> &Session {
        &*self.session
    }

    fn settle(&mut self) -> &mut Session {
        self.settled = true;
        &mut *self.session
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("request dropped before a reply arrived");
            self.session.abandon_request();
        }
    }
}

fn log_failure(step: &str, e: Failure) -> Failure {
    warn!(step, kind = e.kind(), error = %e, "generation step failed");
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::session::{Busy, Stage};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned replies and records every prompt it was sent.
    struct Scripted {
        replies: Mutex<VecDeque<Result<String, Failure>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, Failure>>) -> Self {
            Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) }
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, prompt: &str, credential: &Credential) -> Result<String, Failure> {
            assert!(!credential.is_empty());
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Failure::Transport("no scripted reply left".into())))
        }
    }

    /// Never answers.
    struct Silent;

    #[async_trait]
    impl Provider for Silent {
        fn name(&self) -> &'static str {
            "silent"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn complete(&self, _prompt: &str, _credential: &Credential) -> Result<String, Failure> {
            std::future::pending().await
        }
    }

    fn fenced(json: &str) -> Result<String, Failure> {
        Ok(format!("Here you go:\n```json\n{json}\n```\n"))
    }

    const BAKERY: &str = r#"{"title":"Sweet Bakery","html":"<h1>Hi</h1>","css":"h1{color:red}","javascript":"console.log(1)"}"#;

    fn session(planning: bool) -> Session {
        let mut s = Session::new(Credential::new("k1"), planning);
        s.set_prompt("a bakery landing page");
        s
    }

    #[tokio::test]
    async fn direct_run_produces_bakery_document() {
        let provider = Scripted::new(vec![fenced(BAKERY)]);
        let orch = Orchestrator::new(&provider);
        let mut s = session(false);

        let out = orch.generate(&mut s).await.unwrap();
        assert!(matches!(out, Outcome::Generated(ref a) if a.title == "Sweet Bakery"));

        let doc = s.generated_document().unwrap();
        for needle in [
            "<title>Sweet Bakery</title>",
            "<style>h1{color:red}</style>",
            "<h1>Hi</h1>",
            "<script>console.log(1)</script>",
        ] {
            assert!(doc.contains(needle), "missing {needle}");
        }
        assert_eq!(s.stage(), Stage::AwaitingPrompt);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("a bakery landing page"));
    }

    #[tokio::test]
    async fn two_step_run_sends_edited_plan() {
        let provider = Scripted::new(vec![
            Ok("## Overall Theme\n- **Palette:** warm browns".into()),
            fenced(BAKERY),
        ]);
        let orch = Orchestrator::new(&provider);
        let mut s = session(true);

        let out = orch.generate(&mut s).await.unwrap();
        assert!(matches!(out, Outcome::Planned(_)));
        assert_eq!(s.stage(), Stage::AwaitingPlanReview);
        assert_eq!(s.plan().unwrap().as_str(), "## Overall Theme\n- **Palette:** warm browns");

        s.edit_plan("## Overall Theme\n- **Palette:** mint green").unwrap();
        let out = orch.generate(&mut s).await.unwrap();
        assert!(matches!(out, Outcome::Generated(_)));
        assert_eq!(s.stage(), Stage::AwaitingPrompt);

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("Solutions Architect"));
        assert!(prompts[1].contains("mint green"));
        assert!(!prompts[1].contains("warm browns"));
    }

    #[tokio::test]
    async fn refusal_surfaces_reason_without_document() {
        let provider = Scripted::new(vec![fenced(r#"{"error":"I only build websites."}"#)]);
        let orch = Orchestrator::new(&provider);
        let mut s = session(false);

        let err = orch.request_site(&mut s).await.unwrap_err();
        assert_eq!(err, Failure::Refused("I only build websites.".into()));
        assert_eq!(s.last_error(), Some("I only build websites."));
        assert!(s.generated_document().is_none());
    }

    #[tokio::test]
    async fn unfenced_reply_is_malformed() {
        let provider = Scripted::new(vec![Ok("I made you a site but forgot the JSON".into())]);
        let orch = Orchestrator::new(&provider);
        let mut s = session(false);

        let err = orch.request_site(&mut s).await.unwrap_err();
        assert!(matches!(err, Failure::MalformedResponse(_)));
        assert_eq!(s.stage(), Stage::AwaitingPrompt);
        assert_eq!(s.busy(), Busy::Idle);
    }

    #[tokio::test]
    async fn transport_error_after_plan_resets_and_keeps_old_document() {
        let provider = Scripted::new(vec![
            fenced(BAKERY),
            Ok("plan".into()),
            Err(Failure::Transport("gemini API error (429 Too Many Requests): quota".into())),
        ]);
        let orch = Orchestrator::new(&provider);
        let mut s = session(false);
        orch.generate(&mut s).await.unwrap();
        let first = s.generated_document().map(str::to_string);

        s.set_use_planning(true);
        orch.generate(&mut s).await.unwrap();
        let err = orch.generate(&mut s).await.unwrap_err();
        assert!(matches!(err, Failure::Transport(_)));
        assert_eq!(s.stage(), Stage::AwaitingPrompt);
        assert_eq!(s.generated_document().map(str::to_string), first);
        assert!(s.last_error().unwrap().contains("429"));
    }

    #[tokio::test]
    async fn skipping_planning_during_review_generates_from_prompt() {
        let provider = Scripted::new(vec![Ok("## Overall Theme\n- warm browns".into()), fenced(BAKERY)]);
        let orch = Orchestrator::new(&provider);
        let mut s = session(true);

        orch.generate(&mut s).await.unwrap();
        s.set_use_planning(false);
        assert_eq!(s.next_action(), NextAction::Site);

        let out = orch.generate(&mut s).await.unwrap();
        assert!(matches!(out, Outcome::Generated(_)));
        let prompts = provider.prompts();
        assert!(prompts[1].contains("a bakery landing page"));
        assert!(!prompts[1].contains("warm browns"));
    }

    #[tokio::test]
    async fn validation_failure_makes_no_call() {
        let provider = Scripted::new(vec![]);
        let orch = Orchestrator::new(&provider);
        let mut s = Session::new(Credential::new("k1"), false);

        let err = orch.generate(&mut s).await.unwrap_err();
        assert!(matches!(err, Failure::Validation(_)));
        assert!(provider.prompts().is_empty());
    }

    #[tokio::test]
    async fn timed_out_request_does_not_wedge_session() {
        let provider = Silent;
        let orch = Orchestrator::new(&provider);
        let mut s = session(false);

        let timed_out = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            orch.request_site(&mut s),
        )
        .await;
        assert!(timed_out.is_err());
        assert_eq!(s.busy(), Busy::Idle);
        assert_eq!(s.stage(), Stage::AwaitingPrompt);
        assert!(s.begin_site().is_ok());
    }

    #[tokio::test]
    async fn refused_plan_stays_at_prompt() {
        let provider = Scripted::new(vec![Ok(
            "\"error\": \"The provided prompt is not related to website development.\"".into(),
        )]);
        let orch = Orchestrator::new(&provider);
        let mut s = session(true);

        let err = orch.request_plan(&mut s).await.unwrap_err();
        assert!(matches!(err, Failure::Refused(_)));
        assert_eq!(s.stage(), Stage::AwaitingPrompt);
        assert!(s.plan().is_none());
    }
}
