pub mod domain;
pub mod extract;
pub mod leads;
pub mod table;
