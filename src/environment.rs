//! Execution environment detection.
//!
//! The session's OS family and shell dialect are probed once at startup and
//! then reused for every prompt and every execution.

use std::fmt;
use tracing::info;

/// Operating system family of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    MacOs,
    Linux,
    OtherUnix,
}

impl OsFamily {
    /// Maps an OS name (as reported by `std::env::consts::OS`) to a family.
    ///
    /// Unknown names fall back to a generic Unix-like profile.
    pub fn from_os_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "windows" => OsFamily::Windows,
            "macos" | "darwin" => OsFamily::MacOs,
            "linux" => OsFamily::Linux,
            _ => OsFamily::OtherUnix,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::MacOs => "macos",
            OsFamily::Linux => "linux",
            OsFamily::OtherUnix => "unix",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, OsFamily::Windows)
    }
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shell dialect commands are generated for and executed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellDialect {
    PowerShell,
    Bash,
    Zsh,
}

impl ShellDialect {
    /// Resolves the dialect for `os` from the user's configured shell path.
    ///
    /// Windows always uses PowerShell. Elsewhere a path mentioning `zsh` wins
    /// over one mentioning `bash`, and anything else defaults to bash.
    pub fn resolve(os: OsFamily, shell_path: Option<&str>) -> Self {
        if os.is_windows() {
            return ShellDialect::PowerShell;
        }
        match shell_path {
            Some(path) if path.contains("zsh") => ShellDialect::Zsh,
            Some(path) if path.contains("bash") => ShellDialect::Bash,
            _ => ShellDialect::Bash,
        }
    }

    /// Name of the interpreter program for this dialect.
    pub fn program(&self) -> &'static str {
        match self {
            ShellDialect::PowerShell => "powershell",
            ShellDialect::Bash => "bash",
            ShellDialect::Zsh => "zsh",
        }
    }
}

impl fmt::Display for ShellDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Opaque secret used to authenticate against the generation service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Replaces every occurrence of the secret in `text`.
    pub fn redact(&self, text: &str) -> String {
        if self.0.is_empty() {
            return text.to_string();
        }
        text.replace(self.0.as_str(), "<redacted>")
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Immutable per-process session.
#[derive(Debug, Clone)]
pub struct Session {
    os_family: OsFamily,
    shell_dialect: ShellDialect,
    credential: Credential,
}

impl Session {
    /// Probes the host environment and builds a session around `credential`.
    pub fn detect(credential: Credential) -> Self {
        let shell = std::env::var("SHELL").ok();
        let (os_family, shell_dialect) = detect_environment(std::env::consts::OS, shell.as_deref());
        info!("Detected environment: os={} shell={}", os_family, shell_dialect);
        Self::new(os_family, shell_dialect, credential)
    }

    pub fn new(os_family: OsFamily, shell_dialect: ShellDialect, credential: Credential) -> Self {
        Self {
            os_family,
            shell_dialect,
            credential,
        }
    }

    pub fn os_family(&self) -> OsFamily {
        self.os_family
    }

    pub fn shell_dialect(&self) -> ShellDialect {
        self.shell_dialect
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }
}

/// Pure detection from an OS name and an optional `$SHELL` value.
pub fn detect_environment(os_name: &str, shell_path: Option<&str>) -> (OsFamily, ShellDialect) {
    let os = OsFamily::from_os_name(os_name);
    (os, ShellDialect::resolve(os, shell_path))
}
