mod ticket_filters;
mod ticket_list;
mod tickets;
mod user_profile;

pub use ticket_filters::TicketFiltersView;
pub use ticket_list::TicketListView;
pub use tickets::TicketsView;
pub use user_profile::UserProfileView;
