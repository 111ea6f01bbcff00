pub mod notification;
pub mod reminder;
pub mod scan;
pub mod task;
pub mod user;
pub mod wire;
