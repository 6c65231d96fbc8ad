//! Best-effort OS clipboard access by piping into the platform tool.
//!
//! Failure here is never fatal; the caller shows a transient status label
//! and moves on.

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

/// Copy `text` to the system clipboard.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    for (cmd, args) in candidates() {
        if pipe_into(cmd, args, text).is_ok() {
            return Ok(());
        }
    }
    bail!("no clipboard tool available")
}

#[cfg(target_os = "macos")]
fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    &[("pbcopy", &[])]
}

#[cfg(target_os = "windows")]
fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    &[("cmd", &["/C", "clip"])]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ]
}

fn pipe_into(cmd: &str, args: &[&str], input: &str) -> Result<()> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to spawn {cmd}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(input.as_bytes());
    }

    let status = child.wait().with_context(|| format!("{cmd} did not run"))?;
    if !status.success() {
        bail!("{cmd} exited with {status}");
    }
    Ok(())
}
