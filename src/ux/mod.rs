use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use fs_err as fs;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::document;
use crate::errors::Failure;
use crate::plan::PlanDocument;
use crate::wire::SiteArtifact;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewChoice {
    Accept,
    Edit,
    Discard,
    /// Drop the plan, turn planning off and generate straight from the prompt.
    SkipPlanning,
}

pub fn parse_review_choice(input: &str) -> Option<ReviewChoice> {
    match input.trim().to_lowercase().as_str() {
        "" | "a" | "accept" | "y" | "yes" => Some(ReviewChoice::Accept),
        "e" | "edit" => Some(ReviewChoice::Edit),
        "d" | "discard" | "n" | "no" => Some(ReviewChoice::Discard),
        "s" | "skip" => Some(ReviewChoice::SkipPlanning),
        _ => None,
    }
}

/// Yes/no answer; blank input takes `default`, anything unrecognised is `None`.
pub fn parse_yes_no(input: &str, default: bool) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Prompt to offer again after a failed request. Rejected input (validation
/// or refusal) has to be rewritten; a bad reply or a network error may
/// succeed on a plain resend.
pub fn retry_default<'a>(e: &Failure, previous: &'a str) -> Option<&'a str> {
    match e {
        Failure::Validation(_) | Failure::Refused(_) => None,
        Failure::MalformedResponse(_) | Failure::Transport(_) => {
            Some(previous).filter(|p| !p.trim().is_empty())
        }
    }
}

/// Typed input wins; a blank line falls back to `default`.
pub fn resolve_prompt_input(input: &str, default: Option<&str>) -> String {
    let typed = input.trim();
    match default {
        Some(d) if typed.is_empty() => d.to_string(),
        _ => typed.to_string(),
    }
}

fn read_line() -> Option<String> {
    let mut s = String::new();
    match io::stdin().read_line(&mut s) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(s),
    }
}

/// Ask for the website description; `None` on end of input. With a
/// `default`, pressing enter reuses it.
pub fn ask_prompt(default: Option<&str>) -> Option<String> {
    println!("\n{}", "Describe Your Website".bold());
    match default {
        Some(d) => println!("Press enter to resend: {}", d.dimmed()),
        None => println!("e.g. 'A modern SaaS landing page with a gradient hero, three feature cards, and a newsletter signup form...'"),
    }
    print!("> ");
    let _ = io::stdout().flush();
    read_line().map(|s| resolve_prompt_input(&s, default))
}

/// Ask whether to run the planning phase; blank keeps `current`.
pub fn ask_planning(current: bool) -> bool {
    let hint = if current { "[Y/n]" } else { "[y/N]" };
    loop {
        print!("Use AI planning phase? {}: ", hint);
        let _ = io::stdout().flush();
        let Some(line) = read_line() else { return current };
        if let Some(on) = parse_yes_no(&line, current) {
            return on;
        }
        println!("please answer y or n");
    }
}

pub fn ask_review() -> ReviewChoice {
    loop {
        print!("Use this plan? [A]ccept / [e]dit / [d]iscard / [s]kip planning: ");
        let _ = io::stdout().flush();
        let Some(line) = read_line() else { return ReviewChoice::Discard };
        if let Some(choice) = parse_review_choice(&line) {
            return choice;
        }
        println!("please answer a, e, d or s");
    }
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    read_line()
        .map(|s| {
            let ans = s.trim().to_lowercase();
            ans == "y" || ans == "yes"
        })
        .unwrap_or(false)
}

pub fn show_plan(plan: &PlanDocument) {
    println!("\n{}", "=== Review & Edit the Plan ===".bold());
    println!("{}", plan.as_str().trim_end());
    println!();
}

pub fn show_error(message: &str) {
    eprintln!("{} {}", "Generation failed:".red().bold(), message);
}

/// Spinner shown while a request is outstanding.
pub fn spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(label.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// `$VISUAL`, then `$EDITOR`, then the first common editor on PATH.
pub fn editor_command() -> Option<Vec<String>> {
    let from_env = std::env::var("VISUAL")
        .ok()
        .or_else(|| std::env::var("EDITOR").ok())
        .filter(|e| !e.trim().is_empty());
    if let Some(e) = from_env {
        return Some(e.split_whitespace().map(str::to_string).collect());
    }
    ["nano", "vim", "vi", "notepad"]
        .iter()
        .find(|e| which::which(e).is_ok())
        .map(|e| vec![e.to_string()])
}

/// Open the plan in the user's editor and return the edited text.
/// The scratch file is removed when this returns.
pub fn edit_plan(plan: &PlanDocument) -> Result<String> {
    let cmd = editor_command().ok_or_else(|| anyhow!("no editor found; set $EDITOR"))?;
    let mut file = tempfile::Builder::new()
        .prefix("vibe-plan-")
        .suffix(".md")
        .tempfile()?;
    file.write_all(plan.as_str().as_bytes())?;
    file.flush()?;

    let (program, args) = cmd.split_first().ok_or_else(|| anyhow!("empty editor command"))?;
    let status = Command::new(program)
        .args(args)
        .arg(file.path())
        .status()
        .with_context(|| format!("failed to launch editor {}", program))?;
    if !status.success() {
        bail!("editor {} exited with {}", program, status);
    }
    Ok(fs::read_to_string(file.path())?)
}

pub fn write_document(path: &Path, doc: &str) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, doc)?;
    Ok(path.to_path_buf())
}

#[cfg(target_os = "windows")]
fn opener(path: &Path) -> Option<Command> {
    let mut c = Command::new("cmd");
    c.arg("/C").arg("start").arg("").arg(path);
    Some(c)
}

#[cfg(target_os = "macos")]
fn opener(path: &Path) -> Option<Command> {
    let mut c = Command::new(which::which("open").ok()?);
    c.arg(path);
    Some(c)
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn opener(path: &Path) -> Option<Command> {
    let mut c = Command::new(which::which("xdg-open").ok()?);
    c.arg(path);
    Some(c)
}

/// Fire-and-forget: hand the document to the system browser.
pub fn open_in_browser(path: &Path) -> Result<()> {
    let mut c = opener(path).ok_or_else(|| anyhow!("no system opener found"))?;
    c.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
    c.spawn()
        .with_context(|| format!("failed to open {}", path.display()))?;
    Ok(())
}

pub fn print_result_dashboard(artifact: &SiteArtifact, doc: &str, path: &Path, at: Option<DateTime<Utc>>) {
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━━ Live Preview ━━━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!("  {}: {}", "Title".green().bold(), artifact.title);
    println!(
        "  {}: {}   {}: {}   {}: {}",
        "HTML".yellow().bold(), document::human_size(&artifact.html),
        "CSS".cyan().bold(), document::human_size(&artifact.css),
        "JS".magenta().bold(), document::human_size(&artifact.javascript)
    );
    println!("  {}: {} ({})", "Written".bold(), path.display(), document::human_size(doc));
    if let Some(at) = at {
        println!("  {}: {}", "Generated".bold(), at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    }
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());
}
