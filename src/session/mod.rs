use chrono::{DateTime, Utc};

use crate::credential::Credential;
use crate::document;
use crate::errors::Failure;
use crate::plan::PlanDocument;
use crate::prompt::{self, SiteSource};
use crate::wire::{self, SiteArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AwaitingPrompt,
    AwaitingPlanReview,
}

/// Which request, if any, is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Busy {
    Idle,
    Planning,
    Generating,
}

impl Busy {
    pub fn label(self) -> Option<&'static str> {
        match self {
            Busy::Idle => None,
            Busy::Planning => Some("Creating Plan..."),
            Busy::Generating => Some("Working on it..."),
        }
    }
}

/// What the single "generate" control does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextAction {
    Plan,
    Site,
}

impl NextAction {
    pub fn label(self) -> &'static str {
        match self {
            NextAction::Plan => "Generate Plan",
            NextAction::Site => "Generate with AI",
        }
    }

    /// Busy state this action puts the session in.
    pub fn pending(self) -> Busy {
        match self {
            NextAction::Plan => Busy::Planning,
            NextAction::Site => Busy::Generating,
        }
    }
}

/// All mutable state of one orchestration run. Transitions here never touch
/// the network; `begin_*` hands back the prompt to send and `finish_*`
/// applies whatever came back.
#[derive(Debug, Clone)]
pub struct Session {
    stage: Stage,
    user_prompt: String,
    plan: Option<PlanDocument>,
    credential: Credential,
    use_planning: bool,
    generated_document: Option<String>,
    generated_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    busy: Busy,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            stage: Stage::AwaitingPrompt,
            user_prompt: String::new(),
            plan: None,
            credential: Credential::default(),
            use_planning: true,
            generated_document: None,
            generated_at: None,
            last_error: None,
            busy: Busy::Idle,
        }
    }
}

impl Session {
    pub fn new(credential: Credential, use_planning: bool) -> Self {
        Self { credential, use_planning, ..Self::default() }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn busy(&self) -> Busy {
        self.busy
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn plan(&self) -> Option<&PlanDocument> {
        self.plan.as_ref()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn use_planning(&self) -> bool {
        self.use_planning
    }

    pub fn generated_document(&self) -> Option<&str> {
        self.generated_document.as_deref()
    }

    pub fn generated_at(&self) -> Option<DateTime<Utc>> {
        self.generated_at
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn next_action(&self) -> NextAction {
        if self.use_planning && self.stage == Stage::AwaitingPrompt {
            NextAction::Plan
        } else {
            NextAction::Site
        }
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.user_prompt = text.into();
    }

    /// Turning planning off while a plan is under review discards that plan.
    pub fn set_use_planning(&mut self, on: bool) {
        self.use_planning = on;
        if !on && self.stage == Stage::AwaitingPlanReview {
            self.stage = Stage::AwaitingPrompt;
            self.plan = None;
        }
    }

    /// Replace the plan under review. Does not change stage.
    pub fn edit_plan(&mut self, text: impl Into<String>) -> Result<(), Failure> {
        if self.stage != Stage::AwaitingPlanReview {
            return Err(Failure::Validation("there is no plan under review to edit".into()));
        }
        self.plan = Some(PlanDocument::from_edit(text));
        Ok(())
    }

    /// Drop the plan under review and start over from the prompt.
    pub fn discard_plan(&mut self) {
        self.stage = Stage::AwaitingPrompt;
        self.plan = None;
    }

    pub fn begin_plan(&mut self) -> Result<String, Failure> {
        self.ensure_idle()?;
        let checked = self
            .credential
            .require()
            .map(|_| ())
            .and_then(|_| match self.stage {
                Stage::AwaitingPrompt if self.use_planning => Ok(()),
                Stage::AwaitingPrompt => Err(Failure::Validation(
                    "the planning phase is turned off".into(),
                )),
                Stage::AwaitingPlanReview => Err(Failure::Validation(
                    "a plan is already awaiting review".into(),
                )),
            })
            .and_then(|_| self.require_prompt());
        if let Err(e) = checked {
            return Err(self.fail(e));
        }

        self.busy = Busy::Planning;
        self.last_error = None;
        Ok(prompt::planning_prompt(self.user_prompt.trim()))
    }

    pub fn finish_plan(&mut self, reply: Result<String, Failure>) -> Result<&PlanDocument, Failure> {
        self.busy = Busy::Idle;
        match reply.and_then(|text| PlanDocument::from_reply(&text)) {
            Ok(plan) => {
                self.stage = Stage::AwaitingPlanReview;
                self.last_error = None;
                Ok(&*self.plan.insert(plan))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn begin_site(&mut self) -> Result<String, Failure> {
        self.ensure_idle()?;
        let built = self.credential.require().map(|_| ()).and_then(|_| match self.stage {
            Stage::AwaitingPlanReview => match &self.plan {
                Some(plan) if !plan.is_blank() => Ok(prompt::site_prompt(SiteSource::Plan(plan.as_str()))),
                _ => Err(Failure::Validation("The plan is empty; edit it before generating.".into())),
            },
            Stage::AwaitingPrompt if self.use_planning => Err(Failure::Validation(
                "the planning phase is on; request a plan first".into(),
            )),
            Stage::AwaitingPrompt => self
                .require_prompt()
                .map(|_| prompt::site_prompt(SiteSource::Request(self.user_prompt.trim()))),
        });
        match built {
            Ok(p) => {
                self.busy = Busy::Generating;
                self.last_error = None;
                Ok(p)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    pub fn finish_site(&mut self, reply: Result<String, Failure>) -> Result<SiteArtifact, Failure> {
        self.busy = Busy::Idle;
        self.stage = Stage::AwaitingPrompt;
        self.plan = None;
        let parsed = reply.and_then(|text| wire::parse_site_response(&text).map_err(Failure::from));
        match parsed {
            Ok(artifact) => {
                self.generated_document = Some(document::assemble(&artifact));
                self.generated_at = Some(Utc::now());
                self.last_error = None;
                Ok(artifact)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Settle a request whose reply will never be applied (the caller
    /// dropped it). Handled like any other failure.
    pub fn abandon_request(&mut self) {
        if self.busy != Busy::Idle {
            self.fail(Failure::Transport("the request was abandoned before a reply arrived".into()));
        }
    }

    fn ensure_idle(&mut self) -> Result<(), Failure> {
        if self.busy != Busy::Idle {
            let e = Failure::Validation("a request is already in progress".into());
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    fn require_prompt(&self) -> Result<(), Failure> {
        if self.user_prompt.trim().is_empty() {
            return Err(Failure::Validation("Please enter a prompt describing your website.".into()));
        }
        Ok(())
    }

    /// Shared failure handling: back to the start, previous document kept.
    fn fail(&mut self, e: Failure) -> Failure {
        self.stage = Stage::AwaitingPrompt;
        self.plan = None;
        self.busy = Busy::Idle;
        self.last_error = Some(e.to_string());
        e
    }
}
