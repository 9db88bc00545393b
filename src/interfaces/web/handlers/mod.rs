pub mod insert;
pub mod picklist;
pub mod query;
