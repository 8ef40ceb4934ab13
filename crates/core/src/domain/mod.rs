pub mod category;
pub mod event;
pub mod ids;
pub mod member;
pub mod verification;
