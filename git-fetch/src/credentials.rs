//! Credential resolution shared by clone and fetch: an explicit HTTPS token
//! takes priority, then an explicit SSH key path, then the on-disk bot key,
//! then ssh-agent, then libgit2's own default mechanism.

use git2::{Cred, CredentialType, RemoteCallbacks};
use std::path::Path;

/// Builds remote callbacks that resolve credentials for `token`, an HTTPS
/// token read from the repo's configured `token_env` (if any). SSH paths
/// fall back to `SSH_KEY_PATH`/`ssh_keys/bot_key` and ssh-agent exactly as
/// the single-repo cloner this crate replaces did.
pub fn build_callbacks(token: Option<String>) -> RemoteCallbacks<'static> {
    let key_path_env = std::env::var("SSH_KEY_PATH").ok();
    let key_path_disk = Path::new("ssh_keys/bot_key");
    let have_disk_key = key_path_disk.exists();

    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url_str, username_from_url, allowed| {
        let user = username_from_url.unwrap_or("git");

        if url_str.starts_with("http") {
            if let Some(token) = &token {
                let http_user = std::env::var("GIT_HTTP_USER").unwrap_or_else(|_| "oauth2".to_string());
                return Cred::userpass_plaintext(&http_user, token);
            }
        }

        if allowed.contains(CredentialType::SSH_KEY) {
            if let Some(ref key) = key_path_env {
                let key_path = Path::new(key);
                if key_path.exists() {
                    let pass = std::env::var("SSH_KEY_PASSPHRASE").ok();
                    return Cred::ssh_key(user, None, key_path, pass.as_deref());
                }
            }
            if have_disk_key {
                let pass = std::env::var("SSH_KEY_PASSPHRASE").ok();
                return Cred::ssh_key(user, None, key_path_disk, pass.as_deref());
            }
            if let Ok(cred) = Cred::ssh_key_from_agent(user) {
                return Ok(cred);
            }
        }

        if allowed.contains(CredentialType::DEFAULT) {
            if let Ok(cred) = Cred::default() {
                return Ok(cred);
            }
        }

        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(user);
        }

        Err(git2::Error::from_str("no usable credentials"))
    });

    callbacks
}
