use std::fmt;

///
/// SourceFile
///
/// One generated translation unit: a logical file name plus its text.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceFile {
    name: String,
    text: String,
}

impl SourceFile {
    #[must_use]
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "// {}\n{}", self.name, self.text)
    }
}

///
/// GeneratedSourceSet
///
/// Ordered sources produced from one schema + options pair. There is no way
/// to mutate a set once built; the compiler takes it by value.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedSourceSet {
    files: Vec<SourceFile>,
}

impl GeneratedSourceSet {
    #[must_use]
    pub const fn from_files(files: Vec<SourceFile>) -> Self {
        Self { files }
    }

    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn into_files(self) -> Vec<SourceFile> {
        self.files
    }
}
