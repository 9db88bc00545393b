pub mod consumer;
pub mod fanout;
pub mod lookup;
pub mod records;
pub mod salesforce;
pub mod store;
pub mod transport;
