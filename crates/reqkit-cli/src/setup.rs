//! Implementation of the `reqkit setup` command.

use reqkit_pkg::{Platform, SetupPlan};

use crate::project::Project;

/// Options for printing setup instructions.
#[derive(Debug, Clone, Copy)]
pub struct SetupOptions {
    /// Target platform. Defaults to the one this binary runs on.
    pub platform: Option<Platform>,
    /// Print bare commands suitable for a script.
    pub script: bool,
}

/// Build the instructions for installing the project manifest.
#[must_use]
pub fn render_setup(project: &Project, options: SetupOptions) -> String {
    let platform = options.platform.unwrap_or_else(Platform::current);
    let plan = SetupPlan::new(platform, &project.config.setup, &project.manifest_display());
    if options.script {
        plan.render_script()
    } else {
        plan.to_string()
    }
}

/// Print setup instructions.
pub fn print_setup(project: &Project, options: SetupOptions) {
    print!("{}", render_setup(project, options));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn test_posix_instructions() {
        let dir = TempDir::new().unwrap();
        let project = Project::load(dir.path(), None).unwrap();
        let output = render_setup(
            &project,
            SetupOptions {
                platform: Some(Platform::Posix),
                script: false,
            },
        );
        assert_eq!(
            output,
            "macOS/Linux:\n\
             \x20 1. Create the virtual environment:  python3 -m venv .venv\n\
             \x20 2. Activate it:  source .venv/bin/activate\n\
             \x20 3. Install the requirements:  pip install -r requirements.txt\n"
        );
    }

    #[test]
    fn test_windows_script_uses_config_and_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("reqkit.toml"),
            "[setup]\nvenv-dir = \"env\"\n",
        )
        .unwrap();
        let project = Project::load(dir.path(), Some(Path::new("dev.txt"))).unwrap();
        let output = render_setup(
            &project,
            SetupOptions {
                platform: Some(Platform::Windows),
                script: true,
            },
        );
        assert_eq!(
            output,
            "py -m venv env\nenv\\Scripts\\activate\npip install -r dev.txt\n"
        );
    }
}
