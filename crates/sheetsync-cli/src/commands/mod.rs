pub mod journal;
pub mod poll;
pub mod visibility;
