use crate::environment::{OsFamily, Session};

/// Human-readable name of the terminal the session targets.
pub fn system_context(os: OsFamily) -> &'static str {
    match os {
        OsFamily::Windows => "Windows PowerShell",
        OsFamily::MacOs => "macOS Terminal (Bash/Zsh)",
        OsFamily::Linux => "Linux Terminal (Bash/Zsh)",
        OsFamily::OtherUnix => "Unix-like Terminal",
    }
}

const UNIX_EXAMPLES: &[(&str, &str)] = &[
    ("what's my ip", "curl ifconfig.me"),
    ("list files", "ls -la"),
    ("current directory", "pwd"),
    ("disk usage", "df -h"),
];

const POWERSHELL_EXAMPLES: &[(&str, &str)] = &[
    ("what's my ip", "Invoke-RestMethod ifconfig.me"),
    ("list files", "Get-ChildItem"),
    ("current directory", "Get-Location"),
    ("disk usage", "Get-PSDrive"),
];

/// Composes the instruction text sent to the generation service.
pub struct PromptBuilder;

impl PromptBuilder {
    /// Builds the full prompt: the session header followed by the verbatim query.
    pub fn build(session: &Session, user_query: &str) -> String {
        format!("{}\nUser request: {}", Self::header(session), user_query)
    }

    /// The fixed header for a session. Depends only on OS and shell.
    pub fn header(session: &Session) -> String {
        let os = session.os_family();
        let shell = session.shell_dialect();

        let (label, examples) = if os.is_windows() {
            ("PowerShell", POWERSHELL_EXAMPLES)
        } else {
            ("Linux/macOS", UNIX_EXAMPLES)
        };
        let example_lines: String = examples
            .iter()
            .map(|(request, command)| format!("\"{}\" -> \"{}\"\n", request, command))
            .collect();

        format!(
            "You are a shell command expert for {context}.
Convert the user's natural language request into the appropriate shell command.

Rules:
1. Return ONLY the command, no explanations or markdown formatting
2. Use commands appropriate for {shell} on {os}
3. For common tasks, use the most direct idiomatic command
4. If the request is unclear, provide the most likely interpretation
5. Never include destructive commands (rm -rf, format, etc.)

Examples ({label}):
{example_lines}",
            context = system_context(os),
            shell = shell,
            os = os,
            label = label,
            example_lines = example_lines,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Credential, ShellDialect};

    fn session(os: OsFamily, shell: ShellDialect) -> Session {
        Session::new(os, shell, Credential::new("key"))
    }

    #[test]
    fn test_linux_prompt_has_unix_examples() {
        let prompt = PromptBuilder::build(&session(OsFamily::Linux, ShellDialect::Bash), "list files");
        assert!(prompt.contains("Linux Terminal (Bash/Zsh)"));
        assert!(prompt.contains("Examples (Linux/macOS)"));
        assert!(prompt.contains("\"list files\" -> \"ls -la\""));
        assert!(prompt.contains("appropriate for bash on linux"));
        assert!(!prompt.contains("Get-ChildItem"));
    }

    #[test]
    fn test_windows_prompt_has_powershell_examples() {
        let prompt = PromptBuilder::build(&session(OsFamily::Windows, ShellDialect::PowerShell), "disk usage");
        assert!(prompt.contains("Windows PowerShell"));
        assert!(prompt.contains("\"disk usage\" -> \"Get-PSDrive\""));
        assert!(prompt.contains("appropriate for powershell on windows"));
        assert!(!prompt.contains("ls -la"));
    }

    #[test]
    fn test_query_is_appended_verbatim() {
        let query = "  find *.rs files `modified` today  ";
        let prompt = PromptBuilder::build(&session(OsFamily::MacOs, ShellDialect::Zsh), query);
        assert!(prompt.ends_with(&format!("User request: {}", query)));
    }

    #[test]
    fn test_header_names_safety_rules() {
        let header = PromptBuilder::header(&session(OsFamily::OtherUnix, ShellDialect::Bash));
        assert!(header.contains("Unix-like Terminal"));
        assert!(header.contains("no explanations or markdown"));
        assert!(header.contains("rm -rf"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let s = session(OsFamily::Linux, ShellDialect::Zsh);
        assert_eq!(PromptBuilder::build(&s, "pwd"), PromptBuilder::build(&s, "pwd"));
    }
}
