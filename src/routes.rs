//! Routes, `:` commands and command autocomplete.
//!
//! Every page has a path (`/tickets/2`, `/user-profile`, ...). Paths come in
//! from the `--route` flag; the command line accepts either a path or a
//! command name with an optional argument (`tickets 2`).

use std::fmt;

use crate::error::{Error, Result};

/// A page of the app
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  /// `/`, `/tickets`, `/tickets/:ticketId`
  Tickets { ticket_id: Option<String> },
  /// `/ticket-list`
  TicketList,
  /// `/ticket-filters`
  TicketFilters,
  /// `/user-profile`
  UserProfile,
}

impl Default for Route {
  fn default() -> Self {
    Route::Tickets { ticket_id: None }
  }
}

impl Route {
  /// Parse a path. Trailing slashes are ignored.
  pub fn parse(path: &str) -> Result<Self> {
    let path = path.trim();
    if !path.starts_with('/') {
      return Err(Error::InvalidArgument(format!(
        "route must start with '/': {}",
        path
      )));
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
      [] | ["tickets"] => Ok(Route::Tickets { ticket_id: None }),
      ["tickets", id] => Ok(Route::Tickets {
        ticket_id: Some(id.to_string()),
      }),
      ["ticket-list"] => Ok(Route::TicketList),
      ["ticket-filters"] => Ok(Route::TicketFilters),
      ["user-profile"] => Ok(Route::UserProfile),
      _ => Err(Error::InvalidArgument(format!("unknown route: {}", path))),
    }
  }

  pub fn path(&self) -> String {
    match self {
      Route::Tickets { ticket_id: None } => "/tickets".to_string(),
      Route::Tickets {
        ticket_id: Some(id),
      } => format!("/tickets/{}", id),
      Route::TicketList => "/ticket-list".to_string(),
      Route::TicketFilters => "/ticket-filters".to_string(),
      Route::UserProfile => "/user-profile".to_string(),
    }
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.path())
  }
}

/// What a submitted command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandAction {
  Navigate(Route),
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "tickets",
    aliases: &["t", "ticket", "home"],
    description: "Browse and search tickets",
  },
  Command {
    name: "ticket-list",
    aliases: &["l", "list"],
    description: "Ticket list with notifications",
  },
  Command {
    name: "filters",
    aliases: &["f", "ticket-filters"],
    description: "Ticket filter settings",
  },
  Command {
    name: "profile",
    aliases: &["p", "user", "user-profile"],
    description: "Show the user profile",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit tix",
  },
];

/// Resolve a command line (`tickets 2`, `profile`, `/ticket-list`) to an action
pub fn parse_command(input: &str) -> Result<CommandAction> {
  let input = input.trim();
  if input.starts_with('/') {
    return Route::parse(input).map(CommandAction::Navigate);
  }

  let mut parts = input.split_whitespace();
  let name = parts.next().unwrap_or_default().to_lowercase();
  let arg = parts.next();

  let cmd = COMMANDS
    .iter()
    .find(|c| c.name == name || c.aliases.contains(&name.as_str()))
    .ok_or_else(|| Error::InvalidArgument(format!("unknown command: {}", input)))?;

  match cmd.name {
    "tickets" => Ok(CommandAction::Navigate(Route::Tickets {
      ticket_id: arg.map(String::from),
    })),
    "ticket-list" => Ok(CommandAction::Navigate(Route::TicketList)),
    "filters" => Ok(CommandAction::Navigate(Route::TicketFilters)),
    "profile" => Ok(CommandAction::Navigate(Route::UserProfile)),
    _ => Ok(CommandAction::Quit),
  }
}

/// Get autocomplete suggestions for the command name part of `input`
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input
    .split_whitespace()
    .next()
    .unwrap_or_default()
    .to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
