pub mod selectors;
pub mod signature;

pub use selectors::extract_with_selectors;
pub use signature::compute_page_signature;
