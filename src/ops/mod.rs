mod manifest;
mod patch;

pub use manifest::Manifest;
pub use patch::{Mode, PatchedManifest, Patcher, Summary};
