use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::options::LaunchOptions;
use crate::{AgentError, Result};

/// Handle data for a launched agent. The process itself is not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launched {
    pub pid: u32,
}

/// Build the agent command line. The prompt is not an argument; it is fed on
/// stdin by [`launch_detached`].
pub fn build_command(exe: &Path, opts: &LaunchOptions) -> Command {
    let mut cmd = Command::new(exe);
    cmd.arg("--print");

    if opts.skip_permissions {
        cmd.arg("--dangerously-skip-permissions");
    }

    if let Some(model) = &opts.model {
        cmd.arg("--model").arg(model);
    }

    if let Some(max_turns) = opts.max_turns {
        cmd.arg("--max-turns").arg(max_turns.to_string());
    }

    if !opts.disallowed_tools.is_empty() {
        cmd.arg("--disallowedTools")
            .arg(opts.disallowed_tools.join(","));
    }

    for key in &opts.strip_env {
        cmd.env_remove(key);
    }
    for (k, v) in &opts.env {
        cmd.env(k, v);
    }

    if let Some(cwd) = &opts.cwd {
        cmd.current_dir(cwd);
    }

    cmd
}

/// Spawn the agent in its own process group, write `prompt` to its stdin and
/// return immediately. The child outlives this process; nothing waits on it
/// and its output is discarded.
pub fn launch_detached(prompt: &str, opts: &LaunchOptions) -> Result<Launched> {
    let exe = resolve_executable(&opts.executable)?;
    let mut cmd = build_command(&exe, opts);
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    detach(&mut cmd);

    let mut child = cmd
        .spawn()
        .map_err(|e| AgentError::Spawn(format!("{}: {e}", exe.display())))?;
    let pid = child.id();

    // A closed pipe means the agent exited before reading; it is already
    // running on its own, so a write failure is only logged.
    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(prompt.as_bytes()) {
            tracing::warn!(pid, error = %e, "failed to write prompt to agent stdin");
        }
    }

    tracing::info!(pid, exe = %exe.display(), "agent launched");
    Ok(Launched { pid })
}

fn resolve_executable(executable: &str) -> Result<PathBuf> {
    let path = Path::new(executable);
    if path.components().count() > 1 {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(AgentError::ExecutableNotFound(executable.to_string()));
    }
    which::which(executable).map_err(|_| AgentError::ExecutableNotFound(executable.to_string()))
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn detach(_cmd: &mut Command) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_of(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn build_command_includes_configured_flags() {
        let opts = LaunchOptions {
            model: Some("haiku".into()),
            max_turns: Some(10),
            disallowed_tools: vec!["Skill".into(), "mcp__xiaohongshu-mcp*".into()],
            ..Default::default()
        };
        let cmd = build_command(Path::new("claude"), &opts);
        assert_eq!(
            args_of(&cmd),
            vec![
                "--print",
                "--dangerously-skip-permissions",
                "--model",
                "haiku",
                "--max-turns",
                "10",
                "--disallowedTools",
                "Skill,mcp__xiaohongshu-mcp*",
            ]
        );
    }

    #[test]
    fn build_command_strips_api_key() {
        let cmd = build_command(Path::new("claude"), &LaunchOptions::default());
        let removed: Vec<_> = cmd
            .get_envs()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.to_string_lossy().into_owned())
            .collect();
        assert!(removed.contains(&"ANTHROPIC_API_KEY".to_string()));
        assert!(removed.contains(&"CLAUDECODE".to_string()));
    }

    #[test]
    fn build_command_without_permissions_skip() {
        let opts = LaunchOptions {
            skip_permissions: false,
            ..Default::default()
        };
        let cmd = build_command(Path::new("claude"), &opts);
        assert_eq!(args_of(&cmd), vec!["--print"]);
    }

    #[test]
    fn missing_executable_is_reported() {
        let opts = LaunchOptions {
            executable: "definitely-not-an-agent-binary-xyz".into(),
            ..Default::default()
        };
        let err = launch_detached("hello", &opts).unwrap_err();
        assert!(matches!(err, AgentError::ExecutableNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn launches_without_waiting() {
        let opts = LaunchOptions {
            executable: "cat".into(),
            skip_permissions: false,
            ..Default::default()
        };
        let launched = launch_detached("prompt text", &opts).unwrap();
        assert!(launched.pid > 0);
    }
}
