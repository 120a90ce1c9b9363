//! The manifest is the ordered record of one encryption run: one CSV row per
//! encrypted file, `<ciphertext path>,<base64 key>`, without a header row.
//! It is the only way back - whoever holds the manifest holds every key.
//!
//! Rows are appended one at a time as files are encrypted, so the on-disk
//! manifest stays complete and readable for everything encrypted so far even
//! if the run is interrupted. A crash between writing a ciphertext file and
//! appending its row can leave that one ciphertext without a recorded key;
//! the ordering is chosen so that plaintext is never lost.
//!
//! Parsing is lenient: a row that does not have exactly two columns, or whose
//! key column does not decode to a valid key, is dropped. A damaged manifest
//! still restores every file it has an intact row for.

use {
    crate::crypto::FileKey,
    fs_err as fs,
    std::{
        borrow::Cow,
        io::{self, Write},
        mem,
        path::{Path, PathBuf},
    },
    tracing::debug,
};

/// Filename suffix marking a file as encrypted.
pub const ENCRYPTED_SUFFIX: &str = "pazuzu";

/// Returns the path a file is encrypted to: the original path with the
/// `.pazuzu` suffix appended.
#[must_use]
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(ENCRYPTED_SUFFIX);
    PathBuf::from(name)
}

/// Reverses [`encrypted_path`]. Returns `None` if `path` does not carry the
/// suffix.
#[must_use]
pub fn original_path(path: &Path) -> Option<PathBuf> {
    if path.extension()? == ENCRYPTED_SUFFIX {
        Some(path.with_extension(""))
    } else {
        None
    }
}

/// One (ciphertext path, key) pair. Created during encryption, consumed
/// during decryption, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub path: String,
    pub key: FileKey,
}

impl ManifestEntry {
    fn to_row(&self) -> String {
        format!("{},{}", escape_field(&self.path), self.key.encode())
    }

    fn from_row(line: &str) -> Option<Self> {
        let [path, key]: [String; 2] = split_row(line).try_into().ok()?;
        let key = key.parse().ok()?;
        Some(Self { path, key })
    }
}

/// In-memory manifest; insertion order is encryption order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn add_entry(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_row());
            out.push('\n');
        }
        out
    }

    /// Parses manifest content, dropping malformed rows.
    #[must_use]
    pub fn parse(content: &str) -> Self {
        let mut manifest = Self::default();
        for line in content.lines() {
            if line.is_empty() {
                continue;
            }
            match ManifestEntry::from_row(line) {
                Some(entry) => manifest.entries.push(entry),
                None => debug!("skipping malformed manifest row: {line:?}"),
            }
        }
        manifest
    }

    pub fn read(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    /// Writes all entries at once, replacing any existing file.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        create_parent_dirs(path)?;
        fs::write(path, self.to_csv())
    }
}

/// Durably appends a single row to the manifest file, creating it (and its
/// parent directories) on first use. Called right after the matching
/// [`Manifest::add_entry`] so that partial progress survives a crash.
pub fn append_entry(path: &Path, entry: &ManifestEntry) -> io::Result<()> {
    create_parent_dirs(path)?;
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", entry.to_row())?;
    file.flush()
}

fn create_parent_dirs(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => fields.push(mem::take(&mut field)),
                _ => field.push(c),
            }
        }
    }
    fields.push(field);
    fields
}
