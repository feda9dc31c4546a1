pub mod exercise;
pub mod intent;
pub mod interaction;
pub mod principle;
pub mod workout;
