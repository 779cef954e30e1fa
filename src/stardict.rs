//! StarDict triad format: index records, `.ifo` metadata, and a reader that verifies
//! an exported triad the way a consuming dictionary application would load it.

use crate::config::{IFO_VERSION, SAME_TYPE_SEQUENCE};
use anyhow::{bail, ensure, Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const IFO_MAGIC: &str = "StarDict's dict ifo file";

/// Bytes following the headword in every index record (offset + length)
const INDEX_TAIL_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord {
    pub headword: String,
    pub offset: u32,
    pub length: u32,
}

impl IndexRecord {
    pub fn encoded_len(&self) -> usize {
        self.headword.len() + 1 + INDEX_TAIL_LEN
    }

    /// Appends `headword \0 offset(be32) length(be32)`.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.headword.as_bytes());
        buf.push(0);
        buf.extend_from_slice(&self.offset.to_be_bytes());
        buf.extend_from_slice(&self.length.to_be_bytes());
    }
}

/// Index words must stay strictly below this many bytes.
pub const MAX_HEADWORD_BYTES: usize = 256;

/// Why `headword` cannot be written as an index word, if it cannot.
pub fn headword_defect(headword: &str) -> Option<String> {
    if headword.contains('\0') {
        Some("headword contains a NUL byte".to_string())
    } else if headword.len() >= MAX_HEADWORD_BYTES {
        Some(format!(
            "headword is {} bytes, index words must be under {}",
            headword.len(),
            MAX_HEADWORD_BYTES
        ))
    } else {
        None
    }
}

/// Decodes a complete `.idx` file.
pub fn decode_index(bytes: &[u8]) -> Result<Vec<IndexRecord>> {
    let mut records = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let nul = memchr::memchr(0, &bytes[pos..])
            .with_context(|| format!("Unterminated headword at index byte {}", pos))?;
        let headword = std::str::from_utf8(&bytes[pos..pos + nul])
            .with_context(|| format!("Headword at index byte {} is not UTF-8", pos))?
            .to_string();
        let tail_start = pos + nul + 1;
        let tail = bytes
            .get(tail_start..tail_start + INDEX_TAIL_LEN)
            .with_context(|| format!("Truncated index record for {:?}", headword))?;
        let offset = u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]);
        let length = u32::from_be_bytes([tail[4], tail[5], tail[6], tail[7]]);
        records.push(IndexRecord {
            headword,
            offset,
            length,
        });
        pos = tail_start + INDEX_TAIL_LEN;
    }
    Ok(records)
}

/// Contents of a `.ifo` file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ifo {
    pub version: String,
    pub bookname: String,
    pub wordcount: u64,
    pub idxfilesize: u64,
    pub sametypesequence: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub website: Option<String>,
    pub date: Option<String>,
    /// Same headword appears in more than one index record
    pub multientry: bool,
}

impl Ifo {
    pub fn new(bookname: &str, wordcount: u64, idxfilesize: u64) -> Self {
        Self {
            version: IFO_VERSION.to_string(),
            bookname: bookname.to_string(),
            wordcount,
            idxfilesize,
            sametypesequence: Some(SAME_TYPE_SEQUENCE.to_string()),
            description: None,
            author: None,
            website: None,
            date: None,
            multientry: false,
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines();
        let magic = lines.next().unwrap_or_default();
        ensure!(magic.trim_end() == IFO_MAGIC, "Missing ifo magic line, found {:?}", magic);

        let mut ifo = Ifo {
            version: String::new(),
            bookname: String::new(),
            wordcount: 0,
            idxfilesize: 0,
            sametypesequence: None,
            description: None,
            author: None,
            website: None,
            date: None,
            multientry: false,
        };
        let mut seen_wordcount = false;
        let mut seen_idxfilesize = false;

        for line in lines {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim_end().to_string();
            match key.trim() {
                "version" => ifo.version = value,
                "bookname" => ifo.bookname = value,
                "wordcount" => {
                    ifo.wordcount = value.parse().context("Invalid wordcount")?;
                    seen_wordcount = true;
                }
                "idxfilesize" => {
                    ifo.idxfilesize = value.parse().context("Invalid idxfilesize")?;
                    seen_idxfilesize = true;
                }
                "sametypesequence" => ifo.sametypesequence = Some(value),
                "description" => ifo.description = Some(value),
                "author" => ifo.author = Some(value),
                "website" => ifo.website = Some(value),
                "date" => ifo.date = Some(value),
                "multientry" => ifo.multientry = value == "true",
                other => debug!(key = other, "Ignoring unknown ifo key"),
            }
        }

        ensure!(!ifo.version.is_empty(), "ifo has no version");
        ensure!(!ifo.bookname.is_empty(), "ifo has no bookname");
        ensure!(seen_wordcount, "ifo has no wordcount");
        ensure!(seen_idxfilesize, "ifo has no idxfilesize");
        Ok(ifo)
    }
}

/// Collapses newlines so a value stays on its `key=value` line.
fn sanitize_value(s: &str) -> String {
    if s.contains('\n') || s.contains('\r') {
        s.replace(['\n', '\r'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    } else {
        s.to_string()
    }
}

impl fmt::Display for Ifo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", IFO_MAGIC)?;
        writeln!(f, "version={}", self.version)?;
        writeln!(f, "bookname={}", sanitize_value(&self.bookname))?;
        writeln!(f, "wordcount={}", self.wordcount)?;
        writeln!(f, "idxfilesize={}", self.idxfilesize)?;
        if let Some(seq) = &self.sametypesequence {
            writeln!(f, "sametypesequence={}", seq)?;
        }
        let optional = [
            ("description", &self.description),
            ("author", &self.author),
            ("website", &self.website),
            ("date", &self.date),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                writeln!(f, "{}={}", key, sanitize_value(value))?;
            }
        }
        if self.multientry {
            writeln!(f, "multientry=true")?;
        }
        Ok(())
    }
}

/// Paths of the three companion files sharing one stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriadPaths {
    pub ifo: PathBuf,
    pub idx: PathBuf,
    pub dict: PathBuf,
}

impl TriadPaths {
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            ifo: dir.join(format!("{}.ifo", stem)),
            idx: dir.join(format!("{}.idx", stem)),
            dict: dir.join(format!("{}.dict", stem)),
        }
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.ifo, &self.idx, &self.dict]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub records: usize,
    pub idx_bytes: u64,
    pub dict_bytes: u64,
    pub duplicate_headwords: usize,
}

/// A loaded triad
pub struct StarDict {
    pub ifo: Ifo,
    pub index: Vec<IndexRecord>,
    idx_bytes: u64,
    content: Vec<u8>,
}

impl StarDict {
    pub fn open(dir: &Path, stem: &str) -> Result<Self> {
        let paths = TriadPaths::new(dir, stem);
        let ifo_text = fs::read_to_string(&paths.ifo)
            .with_context(|| format!("Failed to read ifo file: {:?}", paths.ifo))?;
        let ifo = Ifo::parse(&ifo_text)
            .with_context(|| format!("Invalid ifo file: {:?}", paths.ifo))?;
        let idx = fs::read(&paths.idx)
            .with_context(|| format!("Failed to read index file: {:?}", paths.idx))?;
        let index = decode_index(&idx)
            .with_context(|| format!("Invalid index file: {:?}", paths.idx))?;
        let content = fs::read(&paths.dict)
            .with_context(|| format!("Failed to read content file: {:?}", paths.dict))?;
        Ok(Self {
            ifo,
            index,
            idx_bytes: idx.len() as u64,
            content,
        })
    }

    /// Content bytes addressed by `record`, if the range lies inside the content file.
    pub fn content_bytes(&self, record: &IndexRecord) -> Option<&[u8]> {
        let start = record.offset as usize;
        let end = start.checked_add(record.length as usize)?;
        self.content.get(start..end)
    }

    /// All fragments stored under `headword`, in index order.
    pub fn lookup(&self, headword: &str) -> Vec<&str> {
        let key = headword.as_bytes();
        let start = self
            .index
            .partition_point(|r| r.headword.as_bytes() < key);
        self.index[start..]
            .iter()
            .take_while(|r| r.headword.as_bytes() == key)
            .filter_map(|r| self.content_bytes(r))
            .filter_map(|b| std::str::from_utf8(b).ok())
            .collect()
    }

    /// Checks every cross-file invariant a consumer relies on.
    pub fn verify(&self) -> Result<VerifyReport> {
        ensure!(
            self.ifo.wordcount == self.index.len() as u64,
            "ifo wordcount {} does not match {} index records",
            self.ifo.wordcount,
            self.index.len()
        );
        ensure!(
            self.ifo.idxfilesize == self.idx_bytes,
            "ifo idxfilesize {} does not match index size {}",
            self.ifo.idxfilesize,
            self.idx_bytes
        );

        let mut expected_offset: u64 = 0;
        let mut duplicates = 0;
        for (i, record) in self.index.iter().enumerate() {
            if i > 0 {
                let prev = &self.index[i - 1];
                match prev.headword.as_bytes().cmp(record.headword.as_bytes()) {
                    std::cmp::Ordering::Greater => bail!(
                        "Index out of order: {:?} precedes {:?}",
                        prev.headword,
                        record.headword
                    ),
                    std::cmp::Ordering::Equal => duplicates += 1,
                    std::cmp::Ordering::Less => {}
                }
            }
            ensure!(
                record.offset as u64 == expected_offset,
                "Record {:?} starts at {} but previous content ends at {}",
                record.headword,
                record.offset,
                expected_offset
            );
            let bytes = self.content_bytes(record).with_context(|| {
                format!(
                    "Record {:?} addresses {}+{} beyond content size {}",
                    record.headword,
                    record.offset,
                    record.length,
                    self.content.len()
                )
            })?;
            std::str::from_utf8(bytes)
                .with_context(|| format!("Content of {:?} is not UTF-8", record.headword))?;
            expected_offset += record.length as u64;
        }
        ensure!(
            expected_offset == self.content.len() as u64,
            "Content file has {} bytes but index addresses {}",
            self.content.len(),
            expected_offset
        );
        ensure!(
            duplicates == 0 || self.ifo.multientry,
            "Repeated headwords without multientry flag"
        );

        info!(records = self.index.len(), "Triad verified");
        Ok(VerifyReport {
            records: self.index.len(),
            idx_bytes: self.idx_bytes,
            dict_bytes: self.content.len() as u64,
            duplicate_headwords: duplicates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_record_layout() {
        let record = IndexRecord {
            headword: "一".into(),
            offset: 0x0102_0304,
            length: 7,
        };
        let mut buf = Vec::new();
        record.encode_into(&mut buf);
        assert_eq!(buf.len(), record.encoded_len());
        assert_eq!(&buf[..3], "一".as_bytes());
        assert_eq!(buf[3], 0);
        assert_eq!(&buf[4..8], &[1, 2, 3, 4]);
        assert_eq!(&buf[8..12], &[0, 0, 0, 7]);
    }

    #[test]
    fn decode_index_reads_consecutive_records() {
        let mut buf = Vec::new();
        for (h, o, l) in [("一", 0u32, 10u32), ("人", 10, 5)] {
            IndexRecord {
                headword: h.into(),
                offset: o,
                length: l,
            }
            .encode_into(&mut buf);
        }
        let records = decode_index(&buf).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].headword, "人");
        assert_eq!(records[1].offset, 10);
        assert_eq!(records[1].length, 5);
    }

    #[test]
    fn decode_index_rejects_truncation() {
        let mut buf = Vec::new();
        IndexRecord {
            headword: "一".into(),
            offset: 0,
            length: 3,
        }
        .encode_into(&mut buf);
        buf.truncate(buf.len() - 2);
        assert!(decode_index(&buf).is_err());
        assert!(decode_index(b"abc").is_err());
    }

    #[test]
    fn ifo_text_layout() {
        let mut ifo = Ifo::new("汉语字典", 2, 30);
        ifo.description = Some("line one\nline two".into());
        let text = ifo.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], IFO_MAGIC);
        assert_eq!(lines[1], "version=2.4.2");
        assert_eq!(lines[2], "bookname=汉语字典");
        assert_eq!(lines[3], "wordcount=2");
        assert_eq!(lines[4], "idxfilesize=30");
        assert_eq!(lines[5], "sametypesequence=h");
        assert_eq!(lines[6], "description=line one line two");
        assert!(!text.contains("date="));
        assert!(!text.contains("multientry"));
    }

    #[test]
    fn ifo_parse_roundtrip() {
        let mut ifo = Ifo::new("词典", 12, 345);
        ifo.author = Some("someone".into());
        ifo.multientry = true;
        let parsed = Ifo::parse(&ifo.to_string()).unwrap();
        assert_eq!(parsed, ifo);
    }

    #[test]
    fn ifo_parse_requires_magic_and_counts() {
        assert!(Ifo::parse("version=2.4.2\n").is_err());
        assert!(Ifo::parse(&format!("{}\nversion=2.4.2\nbookname=x\n", IFO_MAGIC)).is_err());
    }

    #[test]
    fn triad_paths_share_stem() {
        let paths = TriadPaths::new(Path::new("/out"), "chinese-words");
        assert_eq!(paths.ifo, PathBuf::from("/out/chinese-words.ifo"));
        assert_eq!(paths.idx, PathBuf::from("/out/chinese-words.idx"));
        assert_eq!(paths.dict, PathBuf::from("/out/chinese-words.dict"));
    }
}
