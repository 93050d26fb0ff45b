mod command_input;
mod input;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use search_input::{SearchEvent, SearchInput};

/// What a component did with a key it was offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed without anything for the view to act on
  Handled,
  /// Consumed, and the view should act on `T`
  Event(T),
  /// Not consumed; the view gets the key
  NotHandled,
}
