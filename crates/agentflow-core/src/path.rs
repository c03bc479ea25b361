use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

/// Resolve the runtime's config/state directory based on priority:
/// 1. Explicit path (with tilde expansion)
/// 2. `AGENTFLOW_PATH` environment variable (with tilde expansion)
/// 3. System data directory
/// 4. `~/.agentflow` (fallback for systems without a standard data directory)
pub fn resolve_state_dir(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }

    if let Ok(env_path) = std::env::var("AGENTFLOW_PATH") {
        return Ok(expand_tilde(&env_path));
    }

    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("agentflow"));
    }

    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".agentflow"));
    }

    Err(Error::Config(
        "could not determine state directory: no HOME or system data directory found"
            .to_string(),
    ))
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// Discover the project root a turn runs against, by priority:
/// 1. `explicit_project_root` (caller-supplied)
/// 2. `AGENTFLOW_PROJECT_ROOT` environment variable
/// 3. Current working directory
pub fn discover_project_root(explicit_project_root: Option<&str>) -> Result<PathBuf> {
    if let Some(root) = explicit_project_root {
        return Ok(PathBuf::from(root));
    }

    if let Ok(env_root) = std::env::var("AGENTFLOW_PROJECT_ROOT") {
        return Ok(PathBuf::from(env_root));
    }

    Ok(std::env::current_dir()?)
}

/// Normalize a path for comparison: canonicalize if possible, otherwise
/// make it absolute against the current working directory.
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

/// The project-local directory the Agent Registry loads definitions from
/// (spec.md §4.3), relative to a discovered project root.
pub fn project_agents_dir(project_root: &Path) -> PathBuf {
    project_root.join(".agentflow").join("agents")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_tilde_replaces_home_prefix() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(expand_tilde("~/foo"), PathBuf::from("/home/tester/foo"));
        assert_eq!(expand_tilde("/abs/foo"), PathBuf::from("/abs/foo"));
    }

    #[test]
    fn project_agents_dir_is_dot_agentflow_agents() {
        let root = PathBuf::from("/repo");
        assert_eq!(
            project_agents_dir(&root),
            PathBuf::from("/repo/.agentflow/agents")
        );
    }

    #[test]
    fn discover_project_root_prefers_explicit() {
        let root = discover_project_root(Some("/explicit/root")).unwrap();
        assert_eq!(root, PathBuf::from("/explicit/root"));
    }
}
