use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent},
    terminal,
};
use tracing::{debug, warn};

use crate::error::ConfigError;

const ENV_FILE: &str = ".env";
const PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for clients that read their API key from the environment
pub trait KeyFromEnv {
    /// The environment variable name for this client's API key
    const KEY_NAME: &'static str;

    /// Look the key up in the process environment, loading `.env` first.
    fn find_key() -> Option<String> {
        let _ = dotenvy::dotenv();
        env::var(Self::KEY_NAME).ok().filter(|k| !k.trim().is_empty())
    }

    /// Like `find_key`, but a missing key is an error.
    fn require_key() -> Result<String, ConfigError> {
        Self::find_key().ok_or(ConfigError::MissingKey(Self::KEY_NAME))
    }

    /// Find the key, falling back to asking on the terminal.
    ///
    /// The typed key may be appended to `.env` if the user agrees.
    fn find_key_with_user() -> Result<String, ConfigError> {
        if let Some(key) = Self::find_key() {
            return Ok(key);
        }

        print!(
            "Environment variable {} not found. Please enter the API key ({}s timeout): ",
            Self::KEY_NAME,
            PROMPT_TIMEOUT.as_secs()
        );
        io::stdout().flush()?;

        let (sender, receiver) = mpsc::channel();
        thread::spawn(move || {
            let mut input = String::new();
            if io::stdin().read_line(&mut input).is_ok() {
                let _ = sender.send(input.trim().to_string());
            }
        });

        let api_key = match receiver.recv_timeout(PROMPT_TIMEOUT) {
            Ok(input) if !input.is_empty() => input,
            _ => return Err(ConfigError::NoInput(Self::KEY_NAME)),
        };

        if Self::prompt_save_to_env() {
            match append_key(Path::new(ENV_FILE), Self::KEY_NAME, &api_key) {
                Ok(()) => println!("API key saved to {}", ENV_FILE),
                Err(e) => warn!(error = %e, key = Self::KEY_NAME, "Failed to save key to .env"),
            }
        }

        Ok(api_key)
    }

    /// Ask whether to persist the key. Defaults to no.
    fn prompt_save_to_env() -> bool {
        print!("Add {} to {}? (y/N): ", Self::KEY_NAME, ENV_FILE);
        if io::stdout().flush().is_err() {
            return false;
        }

        match read_single_key() {
            Ok(answer) => {
                println!("{}", if answer { "y" } else { "n" });
                answer
            }
            Err(e) => {
                debug!(error = %e, "Raw terminal unavailable, falling back to line input");
                let mut input = String::new();
                io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
            }
        }
    }
}

/// Read one keystroke in raw mode; only `y` counts as yes.
fn read_single_key() -> io::Result<bool> {
    terminal::enable_raw_mode()?;

    let result = (|| -> io::Result<bool> {
        if event::poll(PROMPT_TIMEOUT)? {
            if let Event::Key(KeyEvent { code, .. }) = event::read()? {
                return Ok(matches!(code, KeyCode::Char('y' | 'Y')));
            }
        }
        Ok(false)
    })();

    terminal::disable_raw_mode()?;
    result
}

/// Append `NAME=value` to an env file unless the name is already present.
pub fn append_key(path: &Path, name: &str, value: &str) -> io::Result<()> {
    if let Ok(content) = std::fs::read_to_string(path) {
        if content.lines().any(|line| line.starts_with(&format!("{}=", name))) {
            return Ok(());
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format!("{}={}\n", name, value).as_bytes())?;
    Ok(())
}

/// Whether a non-empty key is available from the environment or the local
/// `.env` file.
pub fn key_available(name: &str) -> bool {
    env::var(name).map_or(false, |value| !value.trim().is_empty()) || key_in_file(Path::new(ENV_FILE), name)
}

/// Whether `path` parses as an env file that sets `name` to a non-empty value.
pub fn key_in_file(path: &Path, name: &str) -> bool {
    let Ok(entries) = dotenvy::from_path_iter(path) else {
        return false;
    };
    entries
        .filter_map(Result::ok)
        .any(|(key, value)| key == name && !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_key_does_not_duplicate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        append_key(&path, "GEMINI_API_KEY", "abc").unwrap();
        append_key(&path, "GEMINI_API_KEY", "def").unwrap();
        append_key(&path, "DEEPSEEK_API_KEY", "xyz").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "GEMINI_API_KEY=abc\nDEEPSEEK_API_KEY=xyz\n");
    }

    #[test]
    fn commented_or_empty_keys_are_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# GEMINI_API_KEY=\nCLAUDE_NOTE=ANTHROPIC_API_KEY\nDEEPSEEK_API_KEY=\n").unwrap();

        assert!(!key_in_file(&path, "GEMINI_API_KEY"));
        assert!(!key_in_file(&path, "ANTHROPIC_API_KEY"));
        assert!(!key_in_file(&path, "DEEPSEEK_API_KEY"));
        assert!(!key_in_file(&dir.path().join("missing.env"), "GEMINI_API_KEY"));

        append_key(&path, "GEMINI_API_KEY", "abc").unwrap();
        assert!(key_in_file(&path, "GEMINI_API_KEY"));
    }
}
