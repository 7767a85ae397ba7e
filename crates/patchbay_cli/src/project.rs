//! Project discovery and the rendering helpers shared by every command.

use std::path::{Path, PathBuf};

use patchbay_config::{RouterConfig, CONFIG_FILE_NAME};
use patchbay_diagnostics::{DiagnosticRenderer, DiagnosticSink, Severity, TerminalRenderer};

use crate::GlobalArgs;

/// A located project: its directory and its parsed configuration.
pub struct Project {
    /// Directory relative configuration paths resolve against.
    pub dir: PathBuf,
    /// The validated configuration.
    pub config: RouterConfig,
}

/// Walks up from `start` looking for the nearest directory containing
/// `patchbay.toml`.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE_NAME).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE_NAME} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Loads the project named by `--config`, or the nearest one above the
/// current directory.
///
/// A `--config` file may carry any name; a directory must hold
/// `patchbay.toml`.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    let (dir, config) = match &global.config {
        Some(path) => {
            let path = PathBuf::from(path);
            if path.is_file() {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                let config = patchbay_config::load_config_file(&path)?;
                (dir, config)
            } else {
                let config = patchbay_config::load_config(&path)?;
                (path, config)
            }
        }
        None => {
            let dir = find_project_root(&std::env::current_dir()?)?;
            let config = patchbay_config::load_config(&dir)?;
            (dir, config)
        }
    };
    tracing::debug!(dir = %dir.display(), project = %config.project.name, "loaded configuration");
    Ok(Project { dir, config })
}

/// Prints every collected diagnostic to stderr and returns the error count.
///
/// Quiet mode shows errors only.
pub fn render_diagnostics(sink: &DiagnosticSink, global: &GlobalArgs) -> usize {
    let renderer = TerminalRenderer::new(global.color);
    for diag in sink.diagnostics() {
        if global.quiet && diag.severity != Severity::Error {
            continue;
        }
        eprint!("{}", renderer.render(&diag));
    }
    let errors = sink.error_count();
    let warnings = sink.count(Severity::Warning);
    if !global.quiet && errors + warnings > 0 {
        eprintln!("   Diagnostics: {errors} error(s), {warnings} warning(s)");
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MINIMAL: &str = "[project]\nname = \"bench\"\n\n[fabric]\nchains = \"chains.txt\"\n";

    fn global(config: Option<&Path>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            color: false,
            config: config.map(|p| p.to_str().unwrap().to_string()),
        }
    }

    #[test]
    fn finds_root_in_parent() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), MINIMAL).unwrap();
        let nested = tmp.path().join("circuits/amp");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested).unwrap(), tmp.path());
    }

    #[test]
    fn missing_root_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = find_project_root(tmp.path()).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn config_file_with_custom_name() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bench.toml");
        fs::write(&path, MINIMAL).unwrap();
        let project = load_project(&global(Some(&path))).unwrap();
        assert_eq!(project.dir, tmp.path());
        assert_eq!(project.config.project.name, "bench");
    }

    #[test]
    fn config_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE_NAME), MINIMAL).unwrap();
        let project = load_project(&global(Some(tmp.path()))).unwrap();
        assert_eq!(project.dir, tmp.path());
        assert_eq!(project.config.fabric.chains, "chains.txt");
    }
}
