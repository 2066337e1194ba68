pub mod admins;
pub mod assignments;
pub mod core;
pub mod files;
pub mod live;
pub mod roster;
pub mod session;
pub mod streams;
pub mod students;
pub mod trainers;
