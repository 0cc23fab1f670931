pub mod calendar;
pub mod init;
pub mod locks;
pub mod names;
pub mod reservations;
pub mod rooms;
