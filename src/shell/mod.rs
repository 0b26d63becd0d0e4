use crate::board::ViewEvent;
use crate::pipeline::{SortKey, StatusSet};

pub const HELP: &str = "\
commands:
  search <text>        filter by title/tags/status (empty clears)
  sort rep|sr|new      sort by replications, success ratio or recency
  status <list>        comma-separated statuses (e.g. master,grand)
  reload               fetch the source again
  show                 print the current view
  help                 this message
  quit                 exit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Event(ViewEvent),
    Reload,
    Show,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word.to_lowercase().as_str() {
        "search" | "q" | "/" => Ok(Command::Event(ViewEvent::Search(rest.to_string()))),
        "sort" => SortKey::parse(rest)
            .map(|key| Command::Event(ViewEvent::Sort(key)))
            .ok_or_else(|| format!("unknown sort key '{rest}', expected rep, sr or new")),
        "status" => {
            if StatusSet::is_blank_list(rest) {
                Err("status list is empty".to_string())
            } else {
                Ok(Command::Event(ViewEvent::Status(StatusSet::parse_csv(rest))))
            }
        }
        "reload" | "r" => Ok(Command::Reload),
        "show" | "" => Ok(Command::Show),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command '{other}', try 'help'")),
    }
}
