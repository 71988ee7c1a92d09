pub mod model;

pub use model::{ContactUpdate, NewUser, User, UserFilters};
