use anyhow::bail;
use clap::Parser;
use std::path::Path;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

mod cli;
mod config;
mod credential;
mod document;
mod errors;
mod log;
mod orchestrator;
mod plan;
mod prompt;
mod provider;
mod session;
mod ux;
mod wire;

use credential::Credential;
use orchestrator::{Orchestrator, Outcome};
use session::{Busy, Session, Stage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    log::init_tracing(args.debug)?;

    let cfg = config::Config::resolve(&args)?;
    let run_id = Uuid::new_v4();
    run(args, cfg)
        .instrument(info_span!("run", %run_id))
        .await
}

async fn run(args: cli::Args, cfg: config::Config) -> anyhow::Result<()> {
    let credential = Credential::resolve(args.api_key.as_deref(), cfg.provider.key_env());
    if credential.is_empty() {
        bail!(
            "no API key: pass --api-key or set {}",
            cfg.provider.key_env()
        );
    }

    let prov = provider::make_provider(cfg.provider, &cfg)?;
    let orch = Orchestrator::new(prov.as_ref());
    let mut session = Session::new(credential, cfg.use_planning);
    info!(provider = prov.name(), model = prov.model(), planning = session.use_planning(), "starting");

    // With --task the run is one-shot: no follow-up questions besides plan review.
    let one_shot = args.task.is_some();
    let mut next_prompt = args.task.clone();
    // Offered again at the prompt after a failure that a resend may fix.
    let mut resend: Option<String> = None;

    loop {
        if session.stage() == Stage::AwaitingPrompt {
            let text = match next_prompt.take() {
                Some(t) => t,
                None => {
                    session.set_use_planning(ux::ask_planning(session.use_planning()));
                    match ux::ask_prompt(resend.take().as_deref()) {
                        Some(t) => t,
                        None => return Ok(()),
                    }
                }
            };
            session.set_prompt(text);
        }

        let action = session.next_action();
        let pb = ux::spinner(action.pending().label().unwrap_or(action.label()));
        let result = orch.generate(&mut session).await;
        pb.finish_and_clear();
        debug_assert_eq!(session.busy(), Busy::Idle);

        match result {
            Ok(Outcome::Planned(_)) => {
                if args.auto_approve {
                    continue;
                }
                match review_plan(&mut session) {
                    Verdict::Accept => {}
                    Verdict::Discard => {
                        session.discard_plan();
                        if one_shot {
                            println!("Plan discarded.");
                            return Ok(());
                        }
                    }
                    Verdict::SkipPlanning => {
                        session.set_use_planning(false);
                        info!("planning turned off; generating from the prompt");
                        next_prompt = Some(session.user_prompt().to_string());
                    }
                }
            }
            Ok(Outcome::Generated(artifact)) => {
                let Some(doc) = session.generated_document() else {
                    bail!("generation succeeded but no document was assembled");
                };
                let path = ux::write_document(Path::new(&cfg.out), doc)?;
                ux::print_result_dashboard(&artifact, doc, &path, session.generated_at());
                if args.open {
                    if let Err(e) = ux::open_in_browser(&path) {
                        warn!(error = %e, "could not open browser");
                    }
                }
                if one_shot || !ux::confirm("Generate another site?") {
                    return Ok(());
                }
            }
            Err(e) => {
                if one_shot {
                    return Err(e.into());
                }
                ux::show_error(session.last_error().unwrap_or("unknown error"));
                if !ux::confirm("Try again?") {
                    return Ok(());
                }
                resend = ux::retry_default(&e, session.user_prompt()).map(str::to_string);
            }
        }
    }
}

enum Verdict {
    Accept,
    Discard,
    SkipPlanning,
}

/// Show the plan, looping through edits until the user settles on it.
fn review_plan(session: &mut Session) -> Verdict {
    loop {
        let Some(plan) = session.plan().cloned() else { return Verdict::Discard };
        ux::show_plan(&plan);
        match ux::ask_review() {
            ux::ReviewChoice::Accept => return Verdict::Accept,
            ux::ReviewChoice::Discard => return Verdict::Discard,
            ux::ReviewChoice::SkipPlanning => return Verdict::SkipPlanning,
            ux::ReviewChoice::Edit => match ux::edit_plan(&plan) {
                Ok(text) => {
                    if let Err(e) = session.edit_plan(text) {
                        ux::show_error(&e.to_string());
                    }
                }
                Err(e) => ux::show_error(&format!("{e:#}")),
            },
        }
    }
}
