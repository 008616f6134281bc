use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use failure::ResultExt;
use log::info;

use crate::errors::*;
use crate::language::Language;

/// The tokenization child process, a process-wide singleton keyed by PID.
/// It is spawned through a shell with the locale as its only argument and
/// may itself fork tokenizer workers, so termination always targets the
/// whole process tree.
pub struct TokenizerProcess {
    child: Child,
    locale: Language,
    binary: PathBuf,
}

impl TokenizerProcess {
    pub fn spawn(binary: &Path, locale: Language) -> Result<TokenizerProcess> {
        let command_line = format!("{} {}", binary.display(), locale.locale());
        let mut command = shell_command(&command_line);
        command.stdout(Stdio::null()).stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so the whole tree can be signalled at once.
            command.process_group(0);
        }
        let child = command
            .spawn()
            .with_context(|_| format!("Cannot spawn tokenization service `{}`", command_line))?;
        info!(
            "Tokenization service spawned for {} (pid {})",
            locale,
            child.id()
        );
        Ok(TokenizerProcess {
            child,
            locale,
            binary: binary.to_path_buf(),
        })
    }

    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    pub fn locale(&self) -> Language {
        self.locale
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Terminates the process and all its descendants, then reaps the
    /// child so no zombie is left behind.
    pub fn kill_tree(&mut self) -> Result<()> {
        let pid = self.pid();
        kill_process_tree(pid)
            .with_context(|_| format!("Cannot kill tokenization service tree (pid {})", pid))?;
        let _ = self.child.wait();
        info!("Tokenization service stopped (pid {})", pid);
        Ok(())
    }
}

#[cfg(unix)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line);
    command
}

#[cfg(windows)]
fn shell_command(command_line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(command_line);
    command
}

/// Kills a process and all its descendants.
///
/// On Unix the child runs in its own process group, so the group is
/// SIGTERMed, given a short grace period, then SIGKILLed. On Windows
/// `taskkill /t /f` walks the tree.
pub fn kill_process_tree(pid: u32) -> io::Result<()> {
    if pid == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "pid must be non-zero",
        ));
    }

    #[cfg(unix)]
    {
        use std::thread;
        use std::time::Duration;

        signal_group(pid, libc::SIGTERM)?;
        thread::sleep(Duration::from_millis(200));
        signal_group(pid, libc::SIGKILL)?;
        return Ok(());
    }

    #[cfg(windows)]
    {
        let output = Command::new("taskkill")
            .args(&["/t", "/f", "/pid", &pid.to_string()])
            .output()?;
        if !output.status.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "taskkill failed for pid {} (exit {:?})",
                    pid,
                    output.status.code()
                ),
            ));
        }
        return Ok(());
    }

    #[allow(unreachable_code)]
    Ok(())
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> io::Result<()> {
    let rc = unsafe { libc::kill(-(pid as i32), signal) };
    if rc != 0 {
        let err = io::Error::last_os_error();
        // The group may already be gone.
        if err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }
    Ok(())
}
