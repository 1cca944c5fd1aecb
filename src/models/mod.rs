pub mod customer;
pub mod visit;

pub use customer::Customer;
pub use visit::{normalize_ymd, VisitForm, VisitPayload};
