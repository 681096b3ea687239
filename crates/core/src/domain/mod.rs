pub mod category;
pub mod client;
pub mod history;
pub mod lead;
pub mod notification;
