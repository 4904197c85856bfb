//! The bot command vocabulary and its parser.

/// Markup prefix some clients prepend to direct messages.
const NIP18_PREFIX: &str = "[//]: # (nip18)";

/// A parsed bot command.
///
/// The first whitespace-delimited token selects the command
/// (case-insensitive); `download`/`dl`/`find` keep the rest of the message as
/// their argument so links can be extracted from surrounding text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    WhoAmI,
    Start,
    /// `download <target>` / `dl <target>` — argument is the full remainder.
    Download(String),
    Downloading,
    /// `find <imdb url or id>` — argument is the full remainder.
    Find(String),
    /// `status_<gid>` — the suffix after the first underscore, possibly empty.
    Status(String),
    /// `cancel_<gid>` — the suffix after the first underscore, possibly empty.
    Cancel(String),
    /// `dl_<info hash>` — quick-download token from a search result.
    DlHash(String),
    Stats,
    Clean,
    AutoClean,
    Time,
    /// Anything else; carries the offending token for the reply.
    Unknown(String),
}

impl Command {
    pub fn parse(text: &str) -> Command {
        let trimmed = text.trim();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        let lower = head.to_lowercase();

        match lower.as_str() {
            "help" => Command::Help,
            "whoami" => Command::WhoAmI,
            "start" => Command::Start,
            "download" | "dl" => Command::Download(rest.to_string()),
            "downloading" => Command::Downloading,
            "find" => Command::Find(rest.to_string()),
            "stats" => Command::Stats,
            "clean" => Command::Clean,
            "autoclean" => Command::AutoClean,
            "time" => Command::Time,
            _ if lower.starts_with("status_") => Command::Status(id_suffix(head)),
            _ if lower.starts_with("cancel_") => Command::Cancel(id_suffix(head)),
            _ if lower.starts_with("dl_") => Command::DlHash(id_suffix(head)),
            _ => Command::Unknown(head.to_string()),
        }
    }
}

/// Everything after the first underscore, in original case. `status_` yields
/// an empty id, which is passed through to the RPC layer as-is.
fn id_suffix(token: &str) -> String {
    token
        .split_once('_')
        .map(|(_, id)| id.to_string())
        .unwrap_or_default()
}

/// Strip the NIP-18 markup prefix some clients prepend, if present.
pub fn strip_client_markup(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.len() >= NIP18_PREFIX.len()
        && trimmed[..NIP18_PREFIX.len()].eq_ignore_ascii_case(NIP18_PREFIX)
    {
        trimmed[NIP18_PREFIX.len()..].trim()
    } else {
        trimmed
    }
}
