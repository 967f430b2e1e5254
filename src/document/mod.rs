use humansize::{format_size, DECIMAL};

use crate::wire::SiteArtifact;

/// Embed the artifact into the fixed page template. Fields are substituted
/// as-is; no escaping is applied.
pub fn assemble(a: &SiteArtifact) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  <style>{css}</style>
</head>
<body>
  {html}
  <script>{javascript}</script>
</body>
</html>
"#,
        title = a.title,
        css = a.css,
        html = a.html,
        javascript = a.javascript,
    )
}

pub fn human_size(doc: &str) -> String {
    format_size(doc.len(), DECIMAL)
}
