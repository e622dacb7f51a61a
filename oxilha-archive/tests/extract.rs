//! End-to-end extraction tests over in-memory archives.

use oxilha_archive::{DirPolicy, Filesystem, LhaReader, PathKind};
use oxilha_core::bitstream::BitWriter;
use oxilha_core::crc::Crc16;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Write};
use std::rc::Rc;

// ---------------------------------------------------------------------------
// In-memory filesystem that records every operation in order.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Mkdir { path: String, mode: u32 },
    CreateFile { path: String, perms: Option<u32> },
    Symlink { target: String, path: String },
    Chmod { path: String, perms: u32 },
    Chown { path: String, uid: u32, gid: u32 },
    Timestamp { path: String, secs: u64 },
}

#[derive(Default)]
struct MockFs {
    ops: Vec<Op>,
    files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    dirs: HashSet<String>,
}

struct MockFile {
    path: String,
    files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl Write for MockFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.files
            .borrow_mut()
            .entry(self.path.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Filesystem for MockFs {
    fn create_file(
        &mut self,
        path: &str,
        _uid_gid: Option<(u32, u32)>,
        perms: Option<u32>,
    ) -> io::Result<Box<dyn Write>> {
        self.ops.push(Op::CreateFile {
            path: path.to_string(),
            perms,
        });
        self.files.borrow_mut().insert(path.to_string(), Vec::new());
        Ok(Box::new(MockFile {
            path: path.to_string(),
            files: Rc::clone(&self.files),
        }))
    }

    fn mkdir(&mut self, path: &str, perms: u32) -> io::Result<()> {
        if self.dirs.contains(path) {
            return Err(io::Error::new(io::ErrorKind::AlreadyExists, "exists"));
        }
        self.dirs.insert(path.to_string());
        self.ops.push(Op::Mkdir {
            path: path.to_string(),
            mode: perms,
        });
        Ok(())
    }

    fn path_kind(&self, path: &str) -> PathKind {
        if self.dirs.contains(path) {
            PathKind::Dir
        } else if self.files.borrow().contains_key(path) {
            PathKind::File
        } else {
            PathKind::Missing
        }
    }

    fn symlink(&mut self, target: &str, path: &str) -> io::Result<()> {
        self.ops.push(Op::Symlink {
            target: target.to_string(),
            path: path.to_string(),
        });
        Ok(())
    }

    fn chmod(&mut self, path: &str, perms: u32) -> io::Result<()> {
        self.ops.push(Op::Chmod {
            path: path.to_string(),
            perms,
        });
        Ok(())
    }

    fn chown(&mut self, path: &str, uid: u32, gid: u32) -> io::Result<()> {
        self.ops.push(Op::Chown {
            path: path.to_string(),
            uid,
            gid,
        });
        Ok(())
    }

    fn set_timestamp(&mut self, path: &str, unix_secs: u64) -> io::Result<()> {
        self.ops.push(Op::Timestamp {
            path: path.to_string(),
            secs: unix_secs,
        });
        Ok(())
    }
}

impl MockFs {
    fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    fn count<F: Fn(&Op) -> bool>(&self, pred: F) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }
}

// ---------------------------------------------------------------------------
// Archive builders.

/// Level 1 member with distinct compressed/original sizes and an OS byte.
fn level1_member(
    name: &str,
    method: &str,
    compressed: &[u8],
    original_len: u32,
    crc: u16,
    os: u8,
) -> Vec<u8> {
    let name_bytes = name.as_bytes();
    let header_size = 5 + 14 + 1 + name_bytes.len() + 2 + 1 + 2;

    let mut header = Vec::new();
    header.push(header_size as u8);
    header.push(0);
    header.extend_from_slice(method.as_bytes());
    header.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
    header.extend_from_slice(&original_len.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.push(0x20);
    header.push(1);
    header.push(name_bytes.len() as u8);
    header.extend_from_slice(name_bytes);
    header.extend_from_slice(&crc.to_le_bytes());
    header.push(os);
    header.extend_from_slice(&0u16.to_le_bytes());

    let checksum: u8 = header[2..].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    header[1] = checksum;

    header.extend_from_slice(compressed);
    header
}

/// Level 2 member with optional Unix metadata extended headers.
#[allow(clippy::too_many_arguments)]
fn level2_member(
    name: &str,
    method: &str,
    data: &[u8],
    crc: u16,
    mtime: u32,
    perms: Option<u16>,
    uid_gid: Option<(u16, u16)>,
) -> Vec<u8> {
    let mut exts: Vec<(u8, Vec<u8>)> = vec![(0x01, name.as_bytes().to_vec())];
    if let Some(perms) = perms {
        exts.push((0x50, perms.to_le_bytes().to_vec()));
    }
    if let Some((uid, gid)) = uid_gid {
        let mut block = Vec::new();
        block.extend_from_slice(&gid.to_le_bytes());
        block.extend_from_slice(&uid.to_le_bytes());
        exts.push((0x51, block));
    }

    let ext_total: usize = exts.iter().map(|(_, d)| 1 + d.len() + 2).sum();
    let total = 26 + ext_total;

    let mut header = Vec::new();
    header.extend_from_slice(&(total as u16).to_le_bytes());
    header.extend_from_slice(method.as_bytes());
    header.extend_from_slice(&(data.len() as u32).to_le_bytes());
    header.extend_from_slice(&(data.len() as u32).to_le_bytes());
    header.extend_from_slice(&mtime.to_le_bytes());
    header.push(0x20);
    header.push(2);
    header.extend_from_slice(&crc.to_le_bytes());
    header.push(b'U');

    for (kind, block) in &exts {
        header.extend_from_slice(&((1 + block.len() + 2) as u16).to_le_bytes());
        header.push(*kind);
        header.extend_from_slice(block);
    }
    header.extend_from_slice(&0u16.to_le_bytes());

    header.extend_from_slice(data);
    header
}

fn stored(name: &str, data: &[u8]) -> Vec<u8> {
    level1_member(
        name,
        "-lh0-",
        data,
        data.len() as u32,
        Crc16::compute(data),
        b'U',
    )
}

/// An lh5 member decoding to "AAAAA", built from degenerate code tables.
fn lh5_aaaaa() -> Vec<u8> {
    let mut data = Vec::new();
    {
        let mut w = BitWriter::new(&mut data);
        w.write_bits(5, 16).unwrap(); // block length
        w.write_bits(0, 5).unwrap();
        w.write_bits(0, 5).unwrap(); // temp table: single symbol
        w.write_bits(0, 9).unwrap();
        w.write_bits(65, 9).unwrap(); // code table: always 'A'
        w.write_bits(0, 4).unwrap();
        w.write_bits(0, 4).unwrap(); // offset table: single symbol
        w.write_bits(0, 5).unwrap(); // five one-bit commands
        w.flush().unwrap();
    }
    data
}

/// A directory tree archive: sub/ (with metadata), two children, then a
/// sibling file.
fn tree_archive() -> Vec<u8> {
    let mut archive = Vec::new();
    archive.extend(level2_member(
        "sub",
        "-lhd-",
        b"",
        0,
        1_700_000_000,
        Some(0o755),
        Some((1000, 100)),
    ));
    archive.extend(stored("sub/a", b"content a"));
    archive.extend(stored("sub/b", b"content b"));
    archive.extend(stored("other", b"content o"));
    archive.push(0);
    archive
}

fn yield_sequence(reader: &mut LhaReader<Cursor<Vec<u8>>>, fs: &mut MockFs) -> Vec<String> {
    let mut sequence = Vec::new();
    while let Some(header) = reader.next_file().unwrap() {
        sequence.push(header.full_path());
        reader.extract_to(fs, None, None).unwrap();
    }
    sequence
}

// ---------------------------------------------------------------------------
// Directory policy behavior.

#[test]
fn end_of_dir_yields_fake_dir_after_children() {
    let mut reader = LhaReader::new(Cursor::new(tree_archive()));
    reader.set_dir_policy(DirPolicy::EndOfDir);
    let mut fs = MockFs::default();

    let sequence = yield_sequence(&mut reader, &mut fs);
    assert_eq!(sequence, ["sub/", "sub/a", "sub/b", "sub/", "other"]);

    // Metadata lands after the children are written, in the order
    // timestamp, chown, chmod.
    let sub_ops: Vec<&Op> = fs
        .ops
        .iter()
        .filter(|op| {
            matches!(
                op,
                Op::Timestamp { path, .. } | Op::Chown { path, .. } | Op::Chmod { path, .. }
                if path == "sub/"
            )
        })
        .collect();
    assert_eq!(
        sub_ops,
        [
            &Op::Timestamp {
                path: "sub/".into(),
                secs: 1_700_000_000
            },
            &Op::Chown {
                path: "sub/".into(),
                uid: 1000,
                gid: 100
            },
            &Op::Chmod {
                path: "sub/".into(),
                perms: 0o755
            },
        ]
    );

    // The directory was created restrictively because permissions follow.
    assert!(fs.ops.contains(&Op::Mkdir {
        path: "sub/".into(),
        mode: 0o700
    }));

    // Metadata application comes after both children were created.
    let chmod_at = fs
        .ops
        .iter()
        .position(|op| matches!(op, Op::Chmod { .. }))
        .unwrap();
    let last_child = fs
        .ops
        .iter()
        .position(|op| matches!(op, Op::CreateFile { path, .. } if path == "sub/b"))
        .unwrap();
    assert!(chmod_at > last_child);

    assert_eq!(fs.file("sub/a").unwrap(), b"content a");
    assert_eq!(fs.file("sub/b").unwrap(), b"content b");
    assert_eq!(fs.file("other").unwrap(), b"content o");
}

#[test]
fn end_of_file_defers_fake_dir_to_the_end() {
    let mut reader = LhaReader::new(Cursor::new(tree_archive()));
    reader.set_dir_policy(DirPolicy::EndOfFile);
    let mut fs = MockFs::default();

    let sequence = yield_sequence(&mut reader, &mut fs);
    assert_eq!(sequence, ["sub/", "sub/a", "sub/b", "other", "sub/"]);
}

#[test]
fn plain_policy_yields_no_fake_dirs() {
    let mut reader = LhaReader::new(Cursor::new(tree_archive()));
    reader.set_dir_policy(DirPolicy::Plain);
    let mut fs = MockFs::default();

    let sequence = yield_sequence(&mut reader, &mut fs);
    assert_eq!(sequence, ["sub/", "sub/a", "sub/b", "other"]);

    // Metadata was applied immediately, before the children existed.
    let chmod_at = fs
        .ops
        .iter()
        .position(|op| matches!(op, Op::Chmod { .. }))
        .unwrap();
    let first_child = fs
        .ops
        .iter()
        .position(|op| matches!(op, Op::CreateFile { .. }))
        .unwrap();
    assert!(chmod_at < first_child);
}

#[test]
fn nested_dirs_pop_innermost_first() {
    let mut archive = Vec::new();
    archive.extend(level2_member(
        "a",
        "-lhd-",
        b"",
        0,
        1,
        Some(0o755),
        None,
    ));
    archive.extend(level2_member(
        "a/b",
        "-lhd-",
        b"",
        0,
        2,
        Some(0o755),
        None,
    ));
    archive.extend(stored("a/b/f", b"leaf"));
    archive.extend(stored("top", b"t"));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    let mut fs = MockFs::default();
    let sequence = yield_sequence(&mut reader, &mut fs);
    assert_eq!(sequence, ["a/", "a/b/", "a/b/f", "a/b/", "a/", "top"]);
}

#[test]
fn extract_on_existing_directory_still_defers_metadata() {
    let mut fs = MockFs::default();

    let mut reader = LhaReader::new(Cursor::new(tree_archive()));
    yield_sequence(&mut reader, &mut fs);

    // Same tree again into the same filesystem: mkdir now fails with
    // AlreadyExists, extraction still succeeds and metadata is applied
    // again on the fake-dir pop.
    let mut reader = LhaReader::new(Cursor::new(tree_archive()));
    let sequence = yield_sequence(&mut reader, &mut fs);
    assert_eq!(sequence, ["sub/", "sub/a", "sub/b", "sub/", "other"]);

    assert_eq!(
        fs.count(|op| matches!(op, Op::Chmod { path, .. } if path == "sub/")),
        2
    );
    // Only the first run actually created the directory.
    assert_eq!(
        fs.count(|op| matches!(op, Op::Mkdir { path, .. } if path == "sub/")),
        1
    );
}

// ---------------------------------------------------------------------------
// Decoding inside the reader.

#[test]
fn extract_lh5_member() {
    let compressed = lh5_aaaaa();
    let mut archive = Vec::new();
    archive.extend(level1_member(
        "a.txt",
        "-lh5-",
        &compressed,
        5,
        Crc16::compute(b"AAAAA"),
        b'U',
    ));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    let mut fs = MockFs::default();
    reader.next_file().unwrap().unwrap();
    reader.extract_to(&mut fs, None, None).unwrap();

    assert_eq!(fs.file("a.txt").unwrap(), b"AAAAA");
}

#[test]
fn zero_byte_lh5_member() {
    // An empty file compressed with lh5 has no compressed data at all;
    // reading it ends immediately and the empty CRC matches.
    let mut archive = Vec::new();
    archive.extend(level1_member("empty", "-lh5-", b"", 0, 0, b'U'));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive.clone()));
    reader.next_file().unwrap().unwrap();
    let mut buf = [0u8; 16];
    assert_eq!(reader.read(&mut buf).unwrap(), 0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    reader.next_file().unwrap().unwrap();
    assert!(reader.check(None).is_ok());
}

#[test]
fn check_detects_truncated_lh5_member() {
    let mut compressed = lh5_aaaaa();
    compressed.truncate(4);
    let mut archive = Vec::new();
    archive.extend(level1_member(
        "a.txt",
        "-lh5-",
        &compressed,
        5,
        Crc16::compute(b"AAAAA"),
        b'U',
    ));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    reader.next_file().unwrap().unwrap();
    assert!(reader.check(None).is_err());
}

#[test]
fn check_matches_extract_verdict() {
    // A good member and a bad member; check and extract must agree.
    let good = lh5_aaaaa();
    for corrupt in [false, true] {
        let crc = if corrupt {
            0xBEEF
        } else {
            Crc16::compute(b"AAAAA")
        };
        let mut archive = Vec::new();
        archive.extend(level1_member("a.txt", "-lh5-", &good, 5, crc, b'U'));
        archive.push(0);

        let mut reader = LhaReader::new(Cursor::new(archive.clone()));
        reader.next_file().unwrap().unwrap();
        let check_ok = reader.check(None).is_ok();

        let mut reader = LhaReader::new(Cursor::new(archive));
        let mut fs = MockFs::default();
        reader.next_file().unwrap().unwrap();
        let extract_ok = reader.extract_to(&mut fs, None, None).is_ok();

        assert_eq!(check_ok, extract_ok);
        assert_eq!(check_ok, !corrupt);
    }
}

#[test]
fn symlink_member_extracts_as_symlink() {
    let mut archive = Vec::new();
    archive.extend(level2_member(
        "link|real/target",
        "-lhd-",
        b"",
        0,
        0,
        Some(0o120777),
        None,
    ));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    let mut fs = MockFs::default();
    let header = reader.next_file().unwrap().unwrap();
    assert!(header.is_symlink());
    reader.extract_to(&mut fs, None, None).unwrap();

    assert_eq!(
        fs.ops,
        [Op::Symlink {
            target: "real/target".into(),
            path: "link".into()
        }]
    );
}

#[test]
fn file_metadata_passed_to_create() {
    let mut archive = Vec::new();
    archive.extend(level2_member(
        "f.txt",
        "-lh0-",
        b"data",
        Crc16::compute(b"data"),
        1_650_000_000,
        Some(0o640),
        Some((1000, 100)),
    ));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    let mut fs = MockFs::default();
    reader.next_file().unwrap().unwrap();
    reader.extract_to(&mut fs, None, None).unwrap();

    assert_eq!(
        fs.ops,
        [
            Op::CreateFile {
                path: "f.txt".into(),
                perms: Some(0o640)
            },
            Op::Timestamp {
                path: "f.txt".into(),
                secs: 1_650_000_000
            },
        ]
    );
    assert_eq!(fs.file("f.txt").unwrap(), b"data");
}

#[test]
fn extract_before_next_file_fails() {
    let mut reader = LhaReader::new(Cursor::new(tree_archive()));
    let mut fs = MockFs::default();
    assert!(reader.extract_to(&mut fs, None, None).is_err());
}

// ---------------------------------------------------------------------------
// MacBinary stripping.

fn macbinary_stream(data: &[u8]) -> Vec<u8> {
    let mut raw = vec![0u8; 128];
    raw[1] = 4;
    raw[2..6].copy_from_slice(b"test");
    raw[83..87].copy_from_slice(&(data.len() as u32).to_be_bytes());
    raw.extend_from_slice(data);
    while (raw.len() - 128) % 128 != 0 {
        raw.push(0);
    }
    raw
}

#[test]
fn macos_member_strips_macbinary_header() {
    let raw = macbinary_stream(b"DATA");
    let mut archive = Vec::new();
    archive.extend(level1_member(
        "f",
        "-lh0-",
        &raw,
        raw.len() as u32,
        Crc16::compute(&raw),
        b'm', // MacOS origin
    ));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive.clone()));
    reader.next_file().unwrap().unwrap();

    let mut out = Vec::new();
    let mut buf = [0u8; 16];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        out.extend_from_slice(&buf[..n]);
    }
    assert_eq!(out, b"DATA");

    // Verification still runs over the raw stream, so check passes.
    let mut reader = LhaReader::new(Cursor::new(archive));
    reader.next_file().unwrap().unwrap();
    assert!(reader.check(None).is_ok());
}

#[test]
fn unix_member_is_not_stripped() {
    let raw = macbinary_stream(b"DATA");
    let mut archive = Vec::new();
    archive.extend(level1_member(
        "f",
        "-lh0-",
        &raw,
        raw.len() as u32,
        Crc16::compute(&raw),
        b'U',
    ));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    let mut fs = MockFs::default();
    reader.next_file().unwrap().unwrap();
    reader.extract_to(&mut fs, None, None).unwrap();
    assert_eq!(fs.file("f").unwrap(), raw);
}

// ---------------------------------------------------------------------------
// Progress reporting.

#[test]
fn progress_callback_reaches_completion() {
    let data = vec![0x42u8; 10000];
    let mut archive = Vec::new();
    archive.extend(stored("big", &data));
    archive.push(0);

    let mut reader = LhaReader::new(Cursor::new(archive));
    let mut fs = MockFs::default();
    reader.next_file().unwrap().unwrap();

    let calls: Rc<RefCell<Vec<(u64, u64)>>> = Rc::new(RefCell::new(Vec::new()));
    let calls_in = Rc::clone(&calls);
    reader
        .extract_to(
            &mut fs,
            None,
            Some(Box::new(move |done, total| {
                calls_in.borrow_mut().push((done, total));
            })),
        )
        .unwrap();

    let calls = calls.borrow();
    // 10000 bytes of -lh0- at 4096 per block is 3 blocks.
    assert_eq!(calls.first(), Some(&(0, 3)));
    assert_eq!(calls.last(), Some(&(3, 3)));
}
