pub mod booking;
pub mod lifecycle;
pub mod profiles;
pub mod storage;
