pub mod favorite;
pub mod setting;
