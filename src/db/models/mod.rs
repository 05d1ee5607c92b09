mod alert;
mod entry;
mod leave;
mod site;
mod user;

pub use alert::*;
pub use entry::*;
pub use leave::*;
pub use site::*;
pub use user::*;
