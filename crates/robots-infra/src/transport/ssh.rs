//! ssh/rsync transport.
//!
//! Implements [`Transport`] by spawning the system `ssh` and `rsync`
//! binaries with inherited stdio, so interactive sessions and rsync progress
//! go straight to the user's terminal. A non-zero exit is reported as an
//! error and never retried. Ctrl-C reaches the child through the terminal's
//! process group; the child's exit status is reported like any other failure.

use std::path::PathBuf;
use std::process::ExitStatus;

use robots_core::transport::{TransferDirection, Transport};
use robots_types::config::FleetConfig;
use robots_types::error::TransportError;

/// Spawns `ssh` sessions and `rsync` transfers against robot hosts.
#[derive(Debug, Clone)]
pub struct SshTransport {
    ssh_program: String,
    rsync_program: String,
    ssh_user: Option<String>,
    ssh_key_path: Option<PathBuf>,
    rsync_options: Vec<String>,
}

impl SshTransport {
    /// Build a transport from the fleet configuration.
    pub fn new(config: &FleetConfig) -> Self {
        Self {
            ssh_program: "ssh".to_string(),
            rsync_program: "rsync".to_string(),
            ssh_user: config.ssh_user.clone(),
            ssh_key_path: config.ssh_key_path.clone(),
            rsync_options: config.rsync_options.clone(),
        }
    }

    /// Use different executables (e.g. absolute paths or wrappers).
    pub fn with_programs(mut self, ssh: impl Into<String>, rsync: impl Into<String>) -> Self {
        self.ssh_program = ssh.into();
        self.rsync_program = rsync.into();
        self
    }

    /// `-o User=... -o IdentityFile=...` for whichever credentials are configured.
    pub fn ssh_options(&self) -> Vec<String> {
        let mut options = Vec::new();
        if let Some(user) = &self.ssh_user {
            options.push("-o".to_string());
            options.push(format!("User={user}"));
        }
        if let Some(key) = &self.ssh_key_path {
            options.push("-o".to_string());
            options.push(format!("IdentityFile={}", key.display()));
        }
        options
    }

    /// Arguments passed to `ssh` (program name excluded).
    pub fn ssh_args(&self, hostname: &str, command: Option<&str>) -> Vec<String> {
        let mut args = self.ssh_options();
        args.push(hostname.to_string());
        if let Some(command) = command {
            args.push(command.to_string());
        }
        args
    }

    /// Arguments passed to `rsync` (program name excluded).
    ///
    /// The remote side gets the `host:` prefix: the destination for a push,
    /// the source for a pull. Configured ssh credentials are forwarded
    /// through `-e`.
    pub fn rsync_args(
        &self,
        hostname: &str,
        source: &str,
        dest: &str,
        direction: TransferDirection,
    ) -> Vec<String> {
        let mut args = self.rsync_options.clone();

        let ssh_options = self.ssh_options();
        if !ssh_options.is_empty() {
            args.push("-e".to_string());
            args.push(format!("{} {}", self.ssh_program, ssh_options.join(" ")));
        }

        let (source, dest) = match direction {
            TransferDirection::Push => (source.to_string(), format!("{hostname}:{dest}")),
            TransferDirection::Pull => (format!("{hostname}:{source}"), dest.to_string()),
        };
        args.push(source);
        args.push(dest);
        args
    }

    async fn run(program: &str, args: &[String]) -> Result<ExitStatus, String> {
        tracing::debug!(program, ?args, "spawning");
        tokio::process::Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::inherit())
            .stdout(std::process::Stdio::inherit())
            .stderr(std::process::Stdio::inherit())
            .status()
            .await
            .map_err(|e| format!("failed to run {program}: {e}"))
    }
}

fn describe_exit(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exited with status {code}"),
        None => "terminated by signal".to_string(),
    }
}

fn require(value: &str, what: &str) -> Result<(), TransportError> {
    if value.trim().is_empty() {
        return Err(TransportError::MissingArgument(what.to_string()));
    }
    Ok(())
}

impl Transport for SshTransport {
    async fn connect(&self, hostname: &str, command: Option<&str>) -> Result<(), TransportError> {
        require(hostname, "hostname")?;

        tracing::info!(host = hostname, command, "opening ssh session");
        let args = self.ssh_args(hostname, command);
        let connect_err = |reason: String| TransportError::ConnectError {
            host: hostname.to_string(),
            reason,
        };

        let status = Self::run(&self.ssh_program, &args).await.map_err(connect_err)?;
        if !status.success() {
            return Err(connect_err(describe_exit(status)));
        }
        Ok(())
    }

    async fn transfer(
        &self,
        hostname: &str,
        source: &str,
        dest: &str,
        direction: TransferDirection,
    ) -> Result<(), TransportError> {
        require(hostname, "hostname")?;
        require(source, "source path")?;
        require(dest, "destination path")?;

        tracing::info!(host = hostname, %direction, source, dest, "starting rsync transfer");
        let args = self.rsync_args(hostname, source, dest, direction);
        let transfer_err = |reason: String| TransportError::TransferError {
            host: hostname.to_string(),
            direction: direction.preposition().to_string(),
            reason,
        };

        let status = Self::run(&self.rsync_program, &args)
            .await
            .map_err(transfer_err)?;
        if !status.success() {
            return Err(transfer_err(describe_exit(status)));
        }
        Ok(())
    }
}
