//! URL handling module for url-harvester
//!
//! Host extraction for formatted results and wildcard domain patterns used
//! by the blacklist.

mod domain;
mod matcher;

pub use domain::{extract_authority, extract_domain, host_of_result};
pub use matcher::{matches_wildcard, DomainPattern};
