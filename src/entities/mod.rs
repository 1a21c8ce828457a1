pub mod gig;
pub mod order;
pub mod user;
