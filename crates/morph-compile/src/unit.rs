use morph_build::GeneratedSourceSet;
use morph_schema::vocab;
use morph_schema::types::ScalarType;
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

///
/// ExportKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ExportKind {
    /// A scalar member type.
    Scalar,

    /// A generic wrapper taking one type argument.
    Wrapper,

    /// A callable provided by the host (for example `connect`).
    Intrinsic,
}

///
/// Export
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
}

impl Export {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ExportKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

///
/// LibraryRef
///
/// Description of one resident library a unit may import from.
/// `pins_dependents` marks libraries whose support code keeps references to
/// the modules that import them, which makes those modules non-reclaimable.
///

#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LibraryRef {
    pub name: String,
    pub version: u32,
    pub exports: Vec<Export>,
    pub pins_dependents: bool,
}

impl LibraryRef {
    #[must_use]
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            exports: Vec::new(),
            pins_dependents: false,
        }
    }

    #[must_use]
    pub fn export(mut self, name: impl Into<String>, kind: ExportKind) -> Self {
        self.exports.push(Export::new(name, kind));
        self
    }

    #[must_use]
    pub const fn pinning(mut self) -> Self {
        self.pins_dependents = true;
        self
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.name == name)
    }

    /// The standard runtime library: scalars, reference wrappers, entity
    /// sets and the `connect` intrinsic.
    #[must_use]
    pub fn runtime(version: u32) -> Self {
        let mut lib = Self::new(vocab::RUNTIME_LIB, version);
        for ty in ScalarType::ALL {
            lib = lib.export(ty.symbol(), ExportKind::Scalar);
        }

        lib.export(vocab::ENTITY_SET, ExportKind::Wrapper)
            .export(vocab::REF, ExportKind::Wrapper)
            .export(vocab::REF_LIST, ExportKind::Wrapper)
            .export(vocab::CONNECT, ExportKind::Intrinsic)
    }

    /// The deferred-loading proxy library. Pins every module importing it.
    #[must_use]
    pub fn proxy(version: u32) -> Self {
        Self::new(vocab::PROXY_LIB, version)
            .export(vocab::LAZY, ExportKind::Wrapper)
            .pinning()
    }
}

///
/// ReferenceSet
///
/// Libraries the compiler may resolve symbols against. Kept sorted by name
/// so that two sets with the same content compare and hash equal.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct ReferenceSet {
    libraries: Vec<LibraryRef>,
}

impl ReferenceSet {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            libraries: Vec::new(),
        }
    }

    /// Insert or replace a library by name.
    #[must_use]
    pub fn with(mut self, library: LibraryRef) -> Self {
        self.insert(library);
        self
    }

    pub fn insert(&mut self, library: LibraryRef) {
        match self
            .libraries
            .binary_search_by(|lib| lib.name.as_str().cmp(&library.name))
        {
            Ok(i) => self.libraries[i] = library,
            Err(i) => self.libraries.insert(i, library),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LibraryRef> {
        self.libraries.iter().find(|lib| lib.name == name)
    }

    #[must_use]
    pub fn libraries(&self) -> &[LibraryRef] {
        &self.libraries
    }
}

///
/// CompilationUnit
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompilationUnit {
    sources: GeneratedSourceSet,
    references: ReferenceSet,
}

impl CompilationUnit {
    #[must_use]
    pub const fn new(sources: GeneratedSourceSet, references: ReferenceSet) -> Self {
        Self {
            sources,
            references,
        }
    }

    #[must_use]
    pub const fn sources(&self) -> &GeneratedSourceSet {
        &self.sources
    }

    #[must_use]
    pub const fn references(&self) -> &ReferenceSet {
        &self.references
    }

    /// Fast content fingerprint, suitable as a compile-cache key.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = Xxh3::new();
        for file in self.sources.files() {
            hasher.update(&(file.name().len() as u64).to_le_bytes());
            hasher.update(file.name().as_bytes());
            hasher.update(&(file.text().len() as u64).to_le_bytes());
            hasher.update(file.text().as_bytes());
        }
        for lib in self.references.libraries() {
            hasher.update(lib.name.as_bytes());
            hasher.update(&lib.version.to_le_bytes());
            hasher.update(&[u8::from(lib.pins_dependents)]);
            for export in &lib.exports {
                hasher.update(export.name.as_bytes());
                hasher.update(&[export.kind as u8]);
            }
        }

        hasher.digest()
    }
}
