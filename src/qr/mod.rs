//! QR provisioning: the write-side saga and the read-side resolver.
//!
//! Writes go through [`QrOrchestrator`], which composes the reference
//! resolver, the image generator and the content dispatcher and unwinds
//! partial work through the compensator. Reads go through [`ContentResolver`].

mod children;
mod content;
mod image;
mod orchestrator;
mod resolver;
mod saga;

pub use content::ContentResolver;
pub use orchestrator::QrOrchestrator;
