//! Line-oriented command input.

use crate::client::Intent;
use crate::probe::LiveMode;

pub const HELP: &[&str] = &[
    "add <url>...            queue one or more URLs",
    "add                     paste URLs one per line, end with a blank line",
    "rm <id>                 cancel or delete an item (id prefix is enough)",
    "copy <id>               show the error text of a failed item",
    "clear                   clear the queue",
    "update                  update yt-dlp on the server",
    "probe <url>             look up formats, playlist entries or live status",
    "pick <n|format>         choose a format of the probed video",
    "select <n> on|off       check or uncheck a playlist entry",
    "all on|off              check or uncheck every playlist entry",
    "mode wait|now|safe      record mode for a live stream",
    "go                      queue what the probe panel has selected",
    "folder                  choose the save folder",
    "open                    open the save folder",
    "save [concurrency]      save settings",
    "dismiss-welcome         stop showing the welcome notice",
    "quit",
];

/// Turns stdin lines into intents.
///
/// A bare `add` starts a URL list that runs until the next blank line, so a
/// pasted list is queued as one `add_to_queue`.
#[derive(Debug, Default)]
pub struct LineReader {
    pasted: Option<String>,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &str) -> Result<Option<Intent>, String> {
        if let Some(text) = self.pasted.as_mut() {
            if line.trim().is_empty() {
                return Ok(self.pasted.take().map(Intent::Add));
            }
            text.push_str(line);
            text.push('\n');
            return Ok(None);
        }
        if line.trim() == "add" {
            self.pasted = Some(String::new());
            return Ok(None);
        }
        parse_line(line)
    }

    pub fn is_pasting(&self) -> bool {
        self.pasted.is_some()
    }

    /// Input ended; a list still being pasted is submitted as is.
    pub fn finish(&mut self) -> Option<Intent> {
        self.pasted.take().map(Intent::Add)
    }
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Intent>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let intent = match (command, args.as_slice()) {
        ("add", urls) => Intent::Add(urls.join("\n")),
        ("rm" | "remove" | "cancel", [id]) => Intent::Remove(id.to_string()),
        ("copy", [id]) => Intent::Copy(id.to_string()),
        ("clear", []) => Intent::Clear,
        ("update", []) => Intent::UpdateTool,
        ("probe", [url]) => Intent::Probe(url.to_string()),
        ("pick", [choice]) => Intent::PickFormat(choice.to_string()),
        ("select", [index, state]) => Intent::SelectEntry {
            index: index
                .parse()
                .map_err(|_| format!("not an entry number: {}", index))?,
            checked: on_off(state)?,
        },
        ("all", [state]) => Intent::SelectAll(on_off(state)?),
        ("mode", [mode]) => Intent::SetLiveMode(mode.parse::<LiveMode>()?),
        ("go" | "enqueue-selected", []) => Intent::EnqueueSelected,
        ("folder", []) => Intent::SelectFolder,
        ("open", []) => Intent::OpenFolder,
        ("save", []) => Intent::SaveSettings { concurrency: None },
        ("save", [n]) => Intent::SaveSettings {
            concurrency: Some(n.parse().map_err(|_| format!("not a number: {}", n))?),
        },
        ("dismiss-welcome", []) => Intent::DismissWelcome,
        ("help" | "?", _) => Intent::Help,
        ("quit" | "exit" | "q", []) => Intent::Quit,
        (other, _) => return Err(format!("unknown command or arguments: {} (try `help`)", other)),
    };
    Ok(Some(intent))
}

fn on_off(word: &str) -> Result<bool, String> {
    match word {
        "on" | "yes" | "1" => Ok(true),
        "off" | "no" | "0" => Ok(false),
        other => Err(format!("expected on or off, got {}", other)),
    }
}
