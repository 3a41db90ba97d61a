pub mod config;
pub mod ion;
pub mod log;
pub mod payload;
pub mod timeline;

#[cfg(test)]
mod test;
