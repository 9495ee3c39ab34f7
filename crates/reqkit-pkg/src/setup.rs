//! Virtual environment setup instructions.
//!
//! A manifest is consumed by running three commands by hand: create an
//! isolated environment, activate it, and install the manifest into it.
//! The commands differ between Windows `cmd.exe` and POSIX shells.

use crate::config::SetupConfig;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned for an unrecognized platform name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown platform '{0}', expected one of: windows, posix, linux, macos")]
pub struct UnknownPlatform(pub String);

/// The shell family the instructions target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Windows `cmd.exe`.
    Windows,
    /// macOS and Linux shells.
    Posix,
}

impl Platform {
    /// The platform this binary was built for.
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    /// Both platforms, Windows first.
    pub const ALL: [Self; 2] = [Self::Windows, Self::Posix];

    /// Human-readable label used in comment blocks.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Windows => "Windows (cmd.exe)",
            Self::Posix => "macOS/Linux",
        }
    }

    fn default_python(self) -> &'static str {
        match self {
            Self::Windows => "py",
            Self::Posix => "python3",
        }
    }

    fn activate_command(self, venv_dir: &str) -> String {
        match self {
            Self::Windows => format!("{}\\Scripts\\activate", venv_dir.replace('/', "\\")),
            Self::Posix => format!("source {venv_dir}/bin/activate"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "windows"),
            Self::Posix => write!(f, "posix"),
        }
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "windows" | "win" | "cmd" => Ok(Self::Windows),
            "posix" | "unix" | "linux" | "macos" | "mac" => Ok(Self::Posix),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// What a setup step accomplishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    CreateEnvironment,
    Activate,
    Install,
}

impl StepKind {
    /// Short description of the step.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::CreateEnvironment => "Create the virtual environment",
            Self::Activate => "Activate it",
            Self::Install => "Install the requirements",
        }
    }
}

/// One command the operator runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupStep {
    pub kind: StepKind,
    pub command: String,
}

/// The full command sequence for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupPlan {
    platform: Platform,
    steps: Vec<SetupStep>,
}

impl SetupPlan {
    /// Build the plan for installing `manifest` on `platform`.
    #[must_use]
    pub fn new(platform: Platform, config: &SetupConfig, manifest: &str) -> Self {
        let python = config
            .python
            .as_deref()
            .unwrap_or_else(|| platform.default_python());
        let venv_dir = config.venv_dir.as_str();

        let steps = vec![
            SetupStep {
                kind: StepKind::CreateEnvironment,
                command: format!("{python} -m venv {venv_dir}"),
            },
            SetupStep {
                kind: StepKind::Activate,
                command: platform.activate_command(venv_dir),
            },
            SetupStep {
                kind: StepKind::Install,
                command: format!("pip install -r {}", quote(manifest)),
            },
        ];

        Self { platform, steps }
    }

    /// The target platform.
    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// The steps, in execution order.
    #[must_use]
    pub fn steps(&self) -> &[SetupStep] {
        &self.steps
    }

    /// Render the steps as plain commands, one per line.
    #[must_use]
    pub fn render_script(&self) -> String {
        self.steps
            .iter()
            .map(|s| format!("{}\n", s.command))
            .collect()
    }

    /// Render the steps as manifest comment lines (without the leading `#`).
    #[must_use]
    pub fn comment_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("{}:", self.platform.label())];
        for (i, step) in self.steps.iter().enumerate() {
            lines.push(format!(
                "  {}. {}:  {}",
                i + 1,
                step.kind.description(),
                step.command
            ));
        }
        lines
    }
}

impl fmt::Display for SetupPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.comment_lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Header comment lines (without `#`) describing setup on every platform.
#[must_use]
pub fn header_lines(config: &SetupConfig, manifest: &str) -> Vec<String> {
    let mut lines = vec![
        String::from("Reproduce this environment in an isolated virtual environment."),
        String::new(),
    ];
    for (i, platform) in Platform::ALL.into_iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        lines.extend(SetupPlan::new(platform, config, manifest).comment_lines());
    }
    lines
}

fn quote(path: &str) -> String {
    if path.contains(char::is_whitespace) {
        format!("\"{path}\"")
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posix_plan() {
        let plan = SetupPlan::new(Platform::Posix, &SetupConfig::default(), "requirements.txt");
        let commands: Vec<&str> = plan.steps().iter().map(|s| s.command.as_str()).collect();
        assert_eq!(
            commands,
            [
                "python3 -m venv .venv",
                "source .venv/bin/activate",
                "pip install -r requirements.txt",
            ]
        );
    }

    #[test]
    fn windows_plan() {
        let plan = SetupPlan::new(Platform::Windows, &SetupConfig::default(), "requirements.txt");
        let commands: Vec<&str> = plan.steps().iter().map(|s| s.command.as_str()).collect();
        assert_eq!(
            commands,
            [
                "py -m venv .venv",
                ".venv\\Scripts\\activate",
                "pip install -r requirements.txt",
            ]
        );
    }

    #[test]
    fn config_overrides_interpreter_and_directory() {
        let config = SetupConfig {
            venv_dir: "envs/course".into(),
            python: Some("python3.11".into()),
        };
        let plan = SetupPlan::new(Platform::Windows, &config, "my reqs.txt");
        assert_eq!(plan.steps()[0].command, "python3.11 -m venv envs/course");
        assert_eq!(plan.steps()[1].command, "envs\\course\\Scripts\\activate");
        assert_eq!(plan.steps()[2].command, "pip install -r \"my reqs.txt\"");
    }

    #[test]
    fn script_rendering() {
        let plan = SetupPlan::new(Platform::Posix, &SetupConfig::default(), "requirements.txt");
        assert_eq!(
            plan.render_script(),
            "python3 -m venv .venv\nsource .venv/bin/activate\npip install -r requirements.txt\n"
        );
    }

    #[test]
    fn header_covers_both_platforms() {
        let lines = header_lines(&SetupConfig::default(), "requirements.txt");
        assert!(lines.contains(&"Windows (cmd.exe):".to_string()));
        assert!(lines.contains(&"macOS/Linux:".to_string()));
        assert!(lines
            .iter()
            .any(|l| l.ends_with("Activate it:  source .venv/bin/activate")));
    }

    #[test]
    fn platform_names() {
        assert_eq!("Windows".parse::<Platform>().unwrap(), Platform::Windows);
        assert_eq!("macos".parse::<Platform>().unwrap(), Platform::Posix);
        assert!("beos".parse::<Platform>().is_err());
        assert_eq!(Platform::Posix.to_string(), "posix");
    }
}
