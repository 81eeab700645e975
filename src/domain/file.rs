//! File location facade
//!
//! A [`TasksFile`] wraps the vault-relative path of the markdown file that
//! contains a task, plus whatever metadata the host already extracted from
//! that file (frontmatter and tag occurrences). Every getter is total: a file
//! without metadata behaves like a file with empty frontmatter and no tags.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::LazyLock;

static EMPTY_FRONTMATTER: LazyLock<Map<String, Value>> = LazyLock::new(Map::new);

/// A position inside a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Loc {
    pub line: usize,
    pub col: usize,
    pub offset: usize,
}

/// A range inside a source file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Span {
    pub start: Loc,
    pub end: Loc,
}

/// One tag occurrence in the body of a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCache {
    /// The tag text, including the leading `#`
    pub tag: String,

    /// Where the tag occurs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Span>,
}

impl TagCache {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            position: None,
        }
    }
}

/// Metadata computed for a file by the host
///
/// Everything is optional; an absent value is indistinguishable from an
/// empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachedMetadata {
    /// Parsed YAML frontmatter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<Map<String, Value>>,

    /// Where the frontmatter block sits in the file
    #[serde(alias = "frontmatterPosition", skip_serializing_if = "Option::is_none")]
    pub frontmatter_position: Option<Span>,

    /// Tag occurrences in the body, in document order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagCache>,
}

impl CachedMetadata {
    /// Creates metadata holding only frontmatter
    pub fn with_frontmatter(frontmatter: Map<String, Value>) -> Self {
        Self {
            frontmatter: Some(frontmatter),
            ..Self::default()
        }
    }

    /// Returns true if nothing was extracted from the file
    pub fn is_empty(&self) -> bool {
        self.frontmatter.is_none() && self.frontmatter_position.is_none() && self.tags.is_empty()
    }
}

/// The file containing a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TasksFile {
    path: String,

    #[serde(default, skip_serializing_if = "CachedMetadata::is_empty")]
    cached_metadata: CachedMetadata,
}

impl TasksFile {
    /// Creates a file facade with no metadata
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_metadata(path, CachedMetadata::default())
    }

    /// Creates a file facade with metadata supplied by the host
    pub fn with_metadata(path: impl Into<String>, cached_metadata: CachedMetadata) -> Self {
        Self {
            path: path.into(),
            cached_metadata,
        }
    }

    /// Returns the path to the file, as given
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the host metadata, empty when none was supplied
    pub fn cached_metadata(&self) -> &CachedMetadata {
        &self.cached_metadata
    }

    /// Returns the frontmatter, empty when the file has none
    pub fn frontmatter(&self) -> &Map<String, Value> {
        self.cached_metadata
            .frontmatter
            .as_ref()
            .unwrap_or(&EMPTY_FRONTMATTER)
    }

    /// Returns all tags in the file: frontmatter tags first, then body tags
    ///
    /// Duplicates are kept.
    pub fn tags(&self) -> Vec<String> {
        let mut tags = self.frontmatter_tags();
        tags.extend(self.cached_metadata.tags.iter().map(|t| t.tag.clone()));
        tags
    }

    /// Returns the tags declared in frontmatter, each prefixed with `#`
    ///
    /// Recognises `tags` and `tag` in any capitalisation. Values may be a
    /// list or a comma/space separated string; null entries are dropped.
    pub fn frontmatter_tags(&self) -> Vec<String> {
        let mut tags = Vec::new();
        for (key, value) in self.frontmatter() {
            let key = key.to_lowercase();
            if key != "tags" && key != "tag" {
                continue;
            }
            match value {
                Value::Array(items) => {
                    for item in items {
                        collect_frontmatter_tag(item, &mut tags);
                    }
                }
                other => collect_frontmatter_tag(other, &mut tags),
            }
        }
        tags
    }

    /// Returns true if the frontmatter has a non-null value for `key`
    ///
    /// Keys are matched case-insensitively.
    pub fn has_property(&self, key: &str) -> bool {
        self.find_property(key).is_some_and(|v| !v.is_null())
    }

    /// Returns the frontmatter value for `key`, or `Null`
    ///
    /// `tags`/`tag` return the sanitised [`frontmatter_tags`](Self::frontmatter_tags).
    pub fn property(&self, key: &str) -> Value {
        let lower = key.to_lowercase();
        if lower == "tags" || lower == "tag" {
            if self.find_property(key).is_none() {
                return Value::Null;
            }
            return Value::Array(self.frontmatter_tags().into_iter().map(Value::String).collect());
        }
        self.find_property(key).cloned().unwrap_or(Value::Null)
    }

    fn find_property(&self, key: &str) -> Option<&Value> {
        let frontmatter = self.frontmatter();
        frontmatter.get(key).or_else(|| {
            let lower = key.to_lowercase();
            frontmatter
                .iter()
                .find(|(k, _)| k.to_lowercase() == lower)
                .map(|(_, v)| v)
        })
    }

    /// Returns the path with one trailing `.md` removed
    pub fn path_without_extension(&self) -> &str {
        without_extension(&self.path)
    }

    /// Returns the top-level folder, with a trailing `/`
    ///
    /// Files at the top level of the vault have root `/`. Backslashes count
    /// as separators and a leading separator is ignored.
    pub fn root(&self) -> String {
        let normalised = self.path.replace('\\', "/");
        let path = normalised.strip_prefix('/').unwrap_or(&normalised);
        match path.find('/') {
            Some(index) => path[..=index].to_string(),
            None => "/".to_string(),
        }
    }

    /// Returns the folder containing the file, with a trailing `/`
    ///
    /// `folder() + filename() == path()` whenever the path contains a `/`;
    /// files at the top level of the vault have folder `/`.
    pub fn folder(&self) -> String {
        let folder = &self.path[..self.path.len() - self.filename().len()];
        if folder.is_empty() {
            "/".to_string()
        } else {
            folder.to_string()
        }
    }

    /// Returns the filename including its extension
    ///
    /// Empty when the path ends with `/`.
    pub fn filename(&self) -> &str {
        match self.path.rfind('/') {
            Some(index) => &self.path[index + 1..],
            None => &self.path,
        }
    }

    /// Returns the filename with one trailing `.md` removed
    pub fn filename_without_extension(&self) -> &str {
        without_extension(self.filename())
    }
}

fn without_extension(value: &str) -> &str {
    value.strip_suffix(".md").unwrap_or(value)
}

fn collect_frontmatter_tag(value: &Value, tags: &mut Vec<String>) {
    let raw = match value {
        Value::Null => return,
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(_) | Value::Object(_) => return,
    };
    for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
        let part = part.trim();
        if part.is_empty() || part == "#" {
            continue;
        }
        if part.starts_with('#') {
            tags.push(part.to_string());
        } else {
            tags.push(format!("#{}", part));
        }
    }
}
