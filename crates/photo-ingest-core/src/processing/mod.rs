pub mod perceptual;
pub mod rendition;

// Expose perceptual hash
pub use perceptual::{calculate_phash, fingerprint, PHash};

// Reexport rendition functionality
pub use rendition::{encode_jpeg, fit_within, generate, load_source, render, RenditionSpec, RenditionTier};
