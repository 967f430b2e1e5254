/// Reason the planner is told to give for requests that are not websites.
pub const OFF_TOPIC_MESSAGE: &str = "The provided prompt is not related to website development.";

/// What the final-generation prompt is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteSource<'a> {
    /// A reviewed (possibly user-edited) plan.
    Plan(&'a str),
    /// The user's raw request, when the planning phase is off.
    Request(&'a str),
}

pub fn planning_prompt(user_prompt: &str) -> String {
    format!(r#"You are a Solutions Architect for a web development agency. Your task is to take a user's request and break it down into a structured, hierarchical plan for a single-page website.

If the request is NOT about designing a website, app, or webpage, you MUST STOP and return only this text:
"error": "{off_topic}"

If it IS a valid request, create a human-readable plan using Markdown formatting. The plan should be organized into the following sections, separated by horizontal lines:

Overall Theme: A main heading for the theme. Under it, use a bulleted list to describe the Color Palette, Font, and Overall Look.

Website Layout: A main heading for the layout. Under it, use a numbered list to show the exact order of the main sections (e.g., 1. Header, 2. Hero, 3. Features, 4. Footer).

Component Breakdown: A main heading for the components. Under it, create a subheading for each section from the Website Layout list. For each component, provide a Description and a bulleted list of its key Elements.

Use bolding for labels to make the document easy to scan.

User's Request:
"{user_prompt}"

Return the text in a formatted form with paragraphs and proper punctuation."#,
        off_topic = OFF_TOPIC_MESSAGE,
        user_prompt = user_prompt,
    )
}

fn output_contract() -> &'static str {
r#"Output Contract (MANDATORY):
- Return exactly ONE JSON object inside a single ```json fenced code block.
- The object must have these keys, all strings:
  - "title": A creative string for the website's <title> tag.
  - "html": The HTML content for the <body> tag (no <html>, <head> or <body> wrappers).
  - "css": All necessary CSS code.
  - "javascript": Any necessary JavaScript (empty string if none).
- For any images use https://placehold.co/WIDTHxHEIGHT with the width and height value filled out.
- If the request is NOT a valid request to build a website, return instead a JSON object with a single key:
  {"error": "<short reason>"}"#
}

/// One template for both paths; only the embedded source differs.
pub fn site_prompt(source: SiteSource<'_>) -> String {
    let (task, body) = match source {
        SiteSource::Plan(plan) => (
            "generate a complete, single-page website based on the provided website plan",
            format!("**Website Plan:**\n{plan}"),
        ),
        SiteSource::Request(request) => (
            "generate a complete, single-page website based on a user's request",
            format!("**User's Request:**\n\"{request}\""),
        ),
    };
    format!(
        "You are an expert web developer. Your task is to {task}.\n\n{contract}\n\n{body}\n",
        task = task,
        contract = output_contract(),
        body = body,
    )
}
