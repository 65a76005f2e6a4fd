//! Server-rendered HTML for the admin pages.
//!
//! Pages are deliberately plain: a heading, an optional message and a form.

use std::fmt::Write;

use strum::IntoEnumIterator;

use crate::models::chapters::BakeForm;
use crate::models::job::JobSnapshot;
use crate::models::project::{AdminPage, Project};
use crate::services::collation::CollationIndex;

pub const POLL_SCRIPT: &str = include_str!("../static/poll.js");

/// Escape text for use in HTML content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape(title),
    )
}

fn message_block(message: &str) -> String {
    if message.is_empty() {
        String::new()
    } else {
        format!("<p class=\"message\">{}</p>\n", escape(message))
    }
}

const UPLOAD_FORM: &str = r#"<form method="post" enctype="multipart/form-data">
<label for="xmlfile">Select a file</label>
<input type="file" name="xmlfile" id="xmlfile" required>
<button type="submit" name="upload" value="upload">Upload</button>
</form>
"#;

pub fn landing() -> String {
    layout(
        "Edition administration",
        r#"<ul>
<li><a href="/xmlconversion/">Convert a transcription to HTML</a></li>
<li><a href="/estoria-admin/">Manage the edition websites</a></li>
</ul>"#,
    )
}

/// Job status view; `poll.js` keeps it current until the job finishes.
pub fn status(title: &str, task_id: &str, snapshot: &JobSnapshot, download: Option<&str>) -> String {
    let result = match &snapshot.result {
        None => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };
    let download = download
        .map(|href| format!(" data-download=\"{}\"", escape(href)))
        .unwrap_or_default();
    let body = format!(
        r#"<div id="job" data-task-id="{id}"{download}>
<p>Task: {id}</p>
<p>State: <span id="state">{state}</span></p>
<p>Result: <span id="result">{result}</span></p>
<p id="user-count">Checking the server for the task.</p>
</div>
<script src="/static/poll.js"></script>"#,
        id = escape(task_id),
        state = snapshot.state,
        result = escape(&result),
    );
    layout(title, &body)
}

pub fn unavailable() -> String {
    layout(
        "Service unavailable",
        "<p>The request could not be completed. Please try again later.</p>",
    )
}

pub fn xmlconversion_form(message: &str) -> String {
    layout(
        "XML conversion",
        &format!("{}{UPLOAD_FORM}", message_block(message)),
    )
}

pub fn project_selection() -> String {
    let mut items = String::new();
    for project in Project::iter() {
        let _ = writeln!(
            items,
            "<li><a href=\"/estoria-admin/{}/\">{}</a></li>",
            project.slug(),
            escape(project.display_name())
        );
    }
    layout("Choose a project", &format!("<ul>\n{items}</ul>"))
}

pub fn project_index(project: Project) -> String {
    let mut items = String::new();
    for page in AdminPage::iter().filter(|p| project.supports(*p)) {
        let _ = writeln!(
            items,
            "<li><a href=\"/estoria-admin/{}/{}\">{}</a></li>",
            project.slug(),
            page,
            page.title()
        );
    }
    layout(
        project.display_name(),
        &format!(
            "<p>Management tools for the website.</p>\n<ul>\n{items}</ul>\n<p><a href=\"/estoria-admin/\">Change project</a></p>"
        ),
    )
}

/// Upload-and-rebuild page (transcriptions, reader XML, translation).
pub fn upload_page(project: Project, page: AdminPage, message: &str) -> String {
    let body = format!(
        r#"{message}<h2>Upload</h2>
{UPLOAD_FORM}<h2>Rebuild</h2>
<form method="post">
<button type="submit" name="rebuild" value="rebuild">Rebuild the {title} data</button>
</form>
<p><a href="/estoria-admin/{slug}/">Back</a></p>"#,
        message = message_block(message),
        title = page.title(),
        slug = project.slug(),
    );
    layout(page.title(), &body)
}

pub fn critical_page(project: Project, message: &str) -> String {
    let body = format!(
        r#"{message}<form method="post">
<button type="submit" name="rebuildfirst" value="rebuildfirst">Rebuild the critical edition</button>
</form>
<p><a href="/estoria-admin/{slug}/">Back</a></p>"#,
        message = message_block(message),
        slug = project.slug(),
    );
    layout(AdminPage::Critical.title(), &body)
}

/// Baking page. `collation` is `None` when the collation index is unreadable.
pub fn baking_page(
    project: Project,
    form: &BakeForm,
    message: &str,
    collation: Option<&CollationIndex>,
    base_url: &str,
) -> String {
    let mut body = message_block(message);
    let Some(collation) = collation else {
        return layout(AdminPage::Baking.title(), &body);
    };
    let maximum = collation.maximum;

    let value = |v: &Option<String>| escape(v.as_deref().unwrap_or_default());
    let _ = write!(
        body,
        r#"<form method="post">
<label for="start_chapter">Start at chapter</label>
<input type="number" min="1" max="{maximum}" name="start_chapter" id="start_chapter" value="{start}">
<label for="stop_chapter">Stop at chapter</label>
<input type="number" min="1" max="{maximum}" name="stop_chapter" id="stop_chapter" value="{stop}">
<button type="submit" name="range" value="range">Bake range</button>
</form>
<form method="post">
<label for="chapter">Chapter</label>
<input type="number" min="1" max="{maximum}" name="chapter" id="chapter" value="{chapter}">
<button type="submit" name="one" value="one">Bake one chapter</button>
</form>
<h2>Chapters</h2>
<ul>
"#,
        start = value(&form.start_chapter),
        stop = value(&form.stop_chapter),
        chapter = value(&form.chapter),
    );
    for &n in &collation.chapters {
        let _ = writeln!(
            body,
            "<li><a href=\"{}\">Chapter {n}</a></li>",
            escape(&crate::tasks::bake::chapter_url(base_url, n))
        );
    }
    let _ = write!(
        body,
        "</ul>\n<p><a href=\"/estoria-admin/{}/\">Back</a></p>",
        project.slug()
    );
    layout(AdminPage::Baking.title(), &body)
}
