pub mod aws_attributes;
pub mod config;
pub mod events;
pub mod init;
pub mod notify;
pub mod pipeline;
pub mod records;
pub mod storage;

#[cfg(test)]
mod testing;
