/// Language tags that may follow an opening code fence.
const FENCE_LANGUAGES: &[&str] = &[
    "sh", "bash", "zsh", "fish", "shell", "console", "terminal", "powershell", "pwsh", "ps", "ps1",
    "cmd", "bat", "batch",
];

/// Strips code formatting from a model reply, leaving one trimmed command line.
///
/// Fence lines and their language tags are dropped, every remaining backtick is
/// removed, and the first non-empty line is returned. The result may be empty;
/// callers treat that as a generation failure.
pub fn sanitize(raw: &str) -> String {
    let mut lines = Vec::new();
    for line in raw.lines() {
        match line.trim_start().strip_prefix("```") {
            Some(rest) if is_fence_tag(rest.trim()) => continue,
            Some(rest) => lines.push(rest),
            None => lines.push(line),
        }
    }

    lines
        .iter()
        .map(|line| line.replace('`', ""))
        .map(|line| line.trim().to_string())
        .find(|line| !line.is_empty())
        .unwrap_or_default()
}

fn is_fence_tag(tag: &str) -> bool {
    tag.is_empty() || FENCE_LANGUAGES.contains(&tag.to_ascii_lowercase().as_str())
}
