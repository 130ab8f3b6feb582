pub mod deezer;
pub mod spotify;
