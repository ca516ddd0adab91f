use crate::error::ManifestError;

/// The edits the patcher performs on a manifest.
///
/// Implementations own the file grammar. The patcher only parses, issues
/// add/drop calls, cleans up, and writes the formatted bytes back.
pub trait Manifest: Sized {
    /// File name that marks a manifest, e.g. `go.mod`.
    const FILE_NAME: &'static str;

    fn parse(data: &[u8]) -> Result<Self, ManifestError>;

    /// Inserts or overwrites the replacement of `from` (any version) with the
    /// local directory `to`. Applying the same call twice must leave a single
    /// directive.
    fn add_replace(&mut self, from: &str, to: &str) -> Result<(), ManifestError>;

    /// Removes every replacement of `from`, whatever its version. Returns
    /// whether anything was removed; a missing directive is not an error.
    fn drop_replace(&mut self, from: &str) -> Result<bool, ManifestError>;

    /// Structural tidy-up before formatting.
    fn cleanup(&mut self);

    fn format(&self) -> Result<Vec<u8>, ManifestError>;
}
