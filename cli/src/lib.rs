pub mod retire_cmd;

pub use retire_cmd::RetireCli;
