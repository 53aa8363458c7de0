//! Simulator script grammar, one command per line.
//!
//! ```text
//! open | close | frame | show
//! rows Open daily note | Copy block ref [Ctrl-c] | Archive page
//! star <label>         click <label>
//! sort native|asc|desc default native|asc|desc
//! key up|down
//! # comment
//! ```

use core_dom::NavKey;
use core_prefs::SortMode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Host mounts the palette.
    Open,
    /// Host unmounts the palette.
    Close,
    /// Host re-renders the row list; raw row specs with optional `[hint]`s.
    Rows(Vec<String>),
    /// Click the pin star of the row with this label.
    Star(String),
    /// Click the row body with this label.
    Click(String),
    /// Click a footer sort button (session override).
    Sort(SortMode),
    Key(NavKey),
    /// Settings-surface write of the persisted default.
    Default(SortMode),
    Frame,
    Show,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown command `{0}`")]
    Unknown(String),
    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),
    #[error("`{command}` does not accept `{value}`")]
    BadValue { command: &'static str, value: String },
}

fn required<'a>(command: &'static str, rest: &'a str) -> Result<&'a str, ScriptError> {
    if rest.is_empty() {
        Err(ScriptError::MissingArgument(command))
    } else {
        Ok(rest)
    }
}

fn mode(command: &'static str, rest: &str) -> Result<SortMode, ScriptError> {
    SortMode::parse_loose(required(command, rest)?).ok_or_else(|| ScriptError::BadValue {
        command,
        value: rest.to_string(),
    })
}

impl ScriptCommand {
    /// `Ok(None)` for blank lines and comments.
    pub fn parse(line: &str) -> Result<Option<Self>, ScriptError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let command = match word.to_ascii_lowercase().as_str() {
            "open" => ScriptCommand::Open,
            "close" => ScriptCommand::Close,
            "frame" => ScriptCommand::Frame,
            "show" => ScriptCommand::Show,
            "rows" => ScriptCommand::Rows(
                rest.split('|')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect(),
            ),
            "star" => ScriptCommand::Star(required("star", rest)?.to_string()),
            "click" => ScriptCommand::Click(required("click", rest)?.to_string()),
            "sort" => ScriptCommand::Sort(mode("sort", rest)?),
            "default" => ScriptCommand::Default(mode("default", rest)?),
            "key" => match required("key", rest)?.to_ascii_lowercase().as_str() {
                "up" => ScriptCommand::Key(NavKey::Up),
                "down" => ScriptCommand::Key(NavKey::Down),
                _ => {
                    return Err(ScriptError::BadValue {
                        command: "key",
                        value: rest.to_string(),
                    });
                }
            },
            other => return Err(ScriptError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}
