#[cfg(test)]
pub mod employee;
#[cfg(test)]
pub mod integration;
#[cfg(test)]
pub mod scheduler;
#[cfg(test)]
pub mod time_entry;
