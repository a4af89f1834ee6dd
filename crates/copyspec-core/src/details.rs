//! Mutable per-file descriptor handed to copy actions.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::config::DuplicatesStrategy;
use crate::path::RelativePath;
use crate::tree::FileElement;

/// Line-level content filter. Returning `None` drops the line.
pub type LineFilter = Rc<dyn Fn(&str) -> Option<String>>;

/// A file on its way to the destination.
///
/// Actions may rename it, change its mode, queue content filters or exclude
/// it. Content is never read here; filters are applied by whoever streams
/// the bytes.
#[derive(Clone)]
pub struct FileCopyDetails {
    element: FileElement,
    relative_path: RelativePath,
    mode: u32,
    excluded: bool,
    duplicates_strategy: DuplicatesStrategy,
    filters: Vec<LineFilter>,
}

impl FileCopyDetails {
    /// Create details for `element` placed at `relative_path`.
    pub fn new(
        element: FileElement,
        relative_path: RelativePath,
        mode: u32,
        duplicates_strategy: DuplicatesStrategy,
    ) -> Self {
        Self {
            element,
            relative_path,
            mode,
            excluded: false,
            duplicates_strategy,
            filters: Vec::new(),
        }
    }

    /// The element being copied.
    pub fn element(&self) -> &FileElement {
        &self.element
    }

    /// Location of the element's bytes.
    pub fn source(&self) -> &Path {
        &self.element.source
    }

    /// Path of the element relative to its selector root.
    pub fn source_path(&self) -> &RelativePath {
        &self.element.relative_path
    }

    /// Check if this is a directory.
    pub fn is_directory(&self) -> bool {
        self.element.is_directory()
    }

    /// Destination file name.
    pub fn name(&self) -> &str {
        self.relative_path.last_name().unwrap_or("")
    }

    /// Rename the destination file, keeping its directory.
    pub fn set_name(&mut self, name: &str) {
        self.relative_path = self.relative_path.replace_last_name(name);
    }

    /// Destination path relative to the copy root.
    pub fn relative_path(&self) -> &RelativePath {
        &self.relative_path
    }

    /// Slash-joined destination path.
    pub fn path(&self) -> String {
        self.relative_path.path_string()
    }

    /// Move the destination.
    pub fn set_relative_path(&mut self, path: RelativePath) {
        self.relative_path = path;
    }

    /// Move the destination using a slash-separated path.
    pub fn set_path(&mut self, path: &str) {
        self.relative_path = RelativePath::parse(self.relative_path.is_file(), path);
    }

    /// Permission bits for the destination.
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// Change the destination permission bits.
    pub fn set_mode(&mut self, mode: u32) {
        self.mode = mode;
    }

    /// Skip this file.
    pub fn exclude(&mut self) {
        self.excluded = true;
    }

    /// Check if an action skipped this file.
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Duplicate handling for this file.
    pub fn duplicates_strategy(&self) -> DuplicatesStrategy {
        self.duplicates_strategy
    }

    /// Override duplicate handling for this file.
    pub fn set_duplicates_strategy(&mut self, strategy: DuplicatesStrategy) {
        self.duplicates_strategy = strategy;
    }

    /// Queue a line filter.
    pub fn filter(&mut self, filter: LineFilter) {
        self.filters.push(filter);
    }

    /// Queue `${name}` expansion of the given properties.
    pub fn expand<K, V>(&mut self, properties: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let properties: Vec<(String, String)> = properties
            .into_iter()
            .map(|(k, v)| (format!("${{{}}}", k.into()), v.into()))
            .collect();
        self.filters.push(Rc::new(move |line: &str| {
            let mut line = line.to_string();
            for (placeholder, value) in &properties {
                if line.contains(placeholder.as_str()) {
                    line = line.replace(placeholder.as_str(), value);
                }
            }
            Some(line)
        }));
    }

    /// Number of queued content filters.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    /// Run queued filters over `content`, line by line, keeping line endings.
    pub fn apply_filters(&self, content: &str) -> String {
        if self.filters.is_empty() {
            return content.to_string();
        }
        let mut out = String::with_capacity(content.len());
        for raw in content.split_inclusive('\n') {
            let (line, ending) = split_line_ending(raw);
            let mut current = Some(line.to_string());
            for filter in &self.filters {
                current = match current {
                    Some(text) => filter(&text),
                    None => break,
                };
            }
            if let Some(text) = current {
                out.push_str(&text);
                out.push_str(ending);
            }
        }
        out
    }
}

fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

impl fmt::Debug for FileCopyDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileCopyDetails")
            .field("source", &self.element.source)
            .field("relative_path", &self.relative_path)
            .field("mode", &format_args!("{:o}", self.mode))
            .field("excluded", &self.excluded)
            .field("duplicates_strategy", &self.duplicates_strategy)
            .field("filters", &self.filters.len())
            .finish()
    }
}
