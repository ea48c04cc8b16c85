//! Member directory pipeline for the ManyBodyLab site.
//!
//! Ties the directory client and the handle-extraction rule together into
//! [`Enricher::fetch_members`], the entry point the site's People page uses.

pub mod enrichment;
pub mod handle;

pub use enrichment::{Enricher, enrich_profile};
pub use handle::extract_linkedin_handle;
