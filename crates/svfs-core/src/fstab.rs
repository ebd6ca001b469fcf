//! Parsing and serialisation of the `/etc/fstab` mount-table format (§4.3).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::error::FsError;
use crate::path::normalize;

/// One parsed line of the fstab file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FstabEntry {
    pub device: String,
    pub mount_point: String,
    pub fs_type: String,
    pub options: BTreeMap<String, Option<String>>,
    pub dump: u32,
    pub pass: u32,
}

impl FstabEntry {
    #[must_use]
    pub fn new(device: impl Into<String>, mount_point: impl Into<String>, fs_type: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            mount_point: normalize(&mount_point.into()),
            fs_type: fs_type.into(),
            options: BTreeMap::new(),
            dump: 0,
            pass: 0,
        }
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), Some(value.into()));
        self
    }

    fn options_text(&self) -> String {
        if self.options.is_empty() {
            return "defaults".to_owned();
        }
        self.options
            .iter()
            .map(|(k, v)| match v {
                Some(v) => format!("{k}={v}"),
                None => k.clone(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// The content used when `/etc/fstab` is absent (§4.3).
pub fn default_fstab() -> String {
    let entries = default_entries();
    serialize(&entries)
}

/// The parsed form of [`default_fstab`].
#[must_use]
pub fn default_entries() -> Vec<FstabEntry> {
    vec![
        FstabEntry::new("none", "/etc", "d1"),
        FstabEntry::new("none", "/home/user", "d1"),
        FstabEntry::new("none", "/data", "r2"),
    ]
}

/// Parse the fstab text. `#`-prefixed and blank lines are comments.
///
/// # Errors
/// `InvalidArg` if a non-comment line does not have at least
/// `<device> <mountPoint> <type>`.
pub fn parse(text: &str) -> Result<Vec<FstabEntry>, FsError> {
    let mut entries = Vec::new();
    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(FsError::invalid_arg(
                "parse",
                "/etc/fstab",
                format!("line {}: expected at least 3 fields, got {}", lineno + 1, fields.len()),
            ));
        }
        let device = fields[0].to_owned();
        let mount_point = normalize(fields[1]);
        let fs_type = fields[2].to_owned();
        let options = fields.get(3).map_or_else(BTreeMap::new, |s| parse_options(s));
        let dump = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        let pass = fields.get(5).and_then(|s| s.parse().ok()).unwrap_or(0);
        entries.push(FstabEntry { device, mount_point, fs_type, options, dump, pass });
    }
    Ok(entries)
}

/// Parse an `-o`/options-column value: `"defaults"` means empty, otherwise
/// comma-separated `key[=value]` pairs (§4.3). Shared by fstab parsing and
/// the `mount` command's `-o` flag.
#[must_use]
pub fn parse_options(raw: &str) -> BTreeMap<String, Option<String>> {
    if raw == "defaults" {
        return BTreeMap::new();
    }
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_owned(), Some(v.to_owned())),
            None => (kv.to_owned(), None),
        })
        .collect()
}

/// Serialise entries deterministically: one per line, two-space column
/// separator, trailing newline.
#[must_use]
pub fn serialize(entries: &[FstabEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        let _ = writeln!(
            out,
            "{}  {}  {}  {}  {}  {}",
            e.device,
            e.mount_point,
            e.fs_type,
            e.options_text(),
            e.dump,
            e.pass
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fstab_matches_spec_text() {
        let text = default_fstab();
        assert_eq!(
            text,
            "none  /etc  d1  defaults  0  0\nnone  /home/user  d1  defaults  0  0\nnone  /data  r2  defaults  0  0\n"
        );
    }

    #[test]
    fn round_trip_law() {
        let text = "none  /etc  d1  defaults  0  0\nhttps://example/x  /mnt/repo  git  ref=main  0  0\n";
        let parsed = parse(text).unwrap();
        let reparsed = parse(&serialize(&parsed)).unwrap();
        assert_eq!(parsed, reparsed);
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let text = "# comment\n\nnone  /etc  d1  defaults  0  0\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn options_parse_key_value_and_bare() {
        let parsed = parse("url  /mnt/repo  git  ref=main,depth=1  0  0\n").unwrap();
        assert_eq!(parsed[0].options.get("ref"), Some(&Some("main".to_owned())));
        assert_eq!(parsed[0].options.get("depth"), Some(&Some("1".to_owned())));
    }
}
