//! SSH transport settings for git.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How the remote host's key is verified during clone and push.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Host must already be in known_hosts
    Strict,
    /// Trust on first use, fail on mismatch
    #[default]
    AcceptNew,
    /// No verification at all
    Off,
}

impl HostKeyPolicy {
    fn strict_host_key_checking(self) -> &'static str {
        match self {
            HostKeyPolicy::Strict => "yes",
            HostKeyPolicy::AcceptNew => "accept-new",
            HostKeyPolicy::Off => "no",
        }
    }
}

impl fmt::Display for HostKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostKeyPolicy::Strict => write!(f, "strict"),
            HostKeyPolicy::AcceptNew => write!(f, "accept-new"),
            HostKeyPolicy::Off => write!(f, "off"),
        }
    }
}

/// Quote a value for a POSIX shell word.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Build the `GIT_SSH_COMMAND` value for a key file.
///
/// git hands this string to a shell, so only engine-generated paths go in and
/// each is quoted.
pub fn ssh_command(key_path: &Path, policy: HostKeyPolicy) -> String {
    let mut command = format!(
        "ssh -i {} -o IdentitiesOnly=yes -o BatchMode=yes -o StrictHostKeyChecking={}",
        shell_quote(&key_path.to_string_lossy()),
        policy.strict_host_key_checking()
    );
    if policy == HostKeyPolicy::Off {
        command.push_str(" -o UserKnownHostsFile=/dev/null");
    }
    command
}
