/// Identity of a library request: a logical name plus an optional version.
///
/// Two specs are the same library when both the logical name and the
/// version match; the mapped file name is derived from the logical name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LibrarySpec {
    /// Logical name, as passed to `load` (`foo` for `libfoo.so`).
    pub name: String,
    /// Platform file name the logical name maps to.
    pub mapped_name: String,
    /// Version suffix of the cached copy, if any.
    pub version: Option<String>,
}

impl LibrarySpec {
    /// Creates a spec. An empty version is treated as no version.
    pub fn new(name: &str, mapped_name: String, version: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            mapped_name,
            version: version.filter(|v| !v.is_empty()).map(str::to_string),
        }
    }

    /// File name of the cached copy: `<mapped>` or `<mapped>.<version>`.
    pub fn cache_file_name(&self) -> String {
        match &self.version {
            Some(version) => format!("{}.{}", self.mapped_name, version),
            None => self.mapped_name.clone(),
        }
    }
}
