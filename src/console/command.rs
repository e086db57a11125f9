//! Console input parsing. Pure: a line in, a [`Command`] out.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Screens,
    Sessions,
    New(Option<String>),
    Open(String),
    Search { query: String, silenced: bool },
    Investigate,
    Panels,
    Help,
    Quit,
    /// Anything that is not a command goes to the chat.
    Chat(String),
    /// Blank line.
    Nothing,
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  :go <screen>                 switch screen (dashboard, demographics, geography,
                               categories, temporal, search, chat, investigate)
  :screens                     list screens
  :sessions                    list chat sessions
  :new [name]                  start a named session
  :open <index|id>             open a session (0 starts a fresh conversation)
  :search [--silenced] <text>  semantic search over complaints
  :investigate                 run the full investigation report
  :panels                      redraw visible chart panels
  :help                        this help
  :quit                        exit
Anything else is sent to the investigation chat.";

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Nothing;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Chat(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "go" | "g" if !arg.is_empty() => Command::Go(arg.to_string()),
        "go" | "g" => Command::Invalid("usage: :go <screen>".to_string()),
        "screens" => Command::Screens,
        "sessions" | "ls" => Command::Sessions,
        "new" => Command::New((!arg.is_empty()).then(|| arg.to_string())),
        "open" | "o" if !arg.is_empty() => Command::Open(arg.to_string()),
        "open" | "o" => Command::Invalid("usage: :open <index|id>".to_string()),
        "search" | "s" => parse_search(arg),
        "investigate" => Command::Investigate,
        "panels" => Command::Panels,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command ':{other}' (try :help)")),
    }
}

fn parse_search(arg: &str) -> Command {
    let mut silenced = false;
    let mut words = Vec::new();
    for word in arg.split_whitespace() {
        match word {
            "--silenced" | "-s" => silenced = true,
            _ => words.push(word),
        }
    }
    // An empty query is passed through; the search controller prompts for it.
    Command::Search {
        query: words.join(" "),
        silenced,
    }
}
