mod common;

use common::{init_logger, silent, write_archive};
use relinker::{
    ArchiveInstaller, Error, LibraryInstaller,
    installer::{EntrySource, archive_abis, entry_path, extract, locate},
};
use rstest::rstest;
use std::{
    fs::OpenOptions,
    io::{self, Cursor, Read},
    path::PathBuf,
};

fn abis(list: &[&str]) -> Vec<String> {
    list.iter().map(|abi| abi.to_string()).collect()
}

#[rstest]
fn entry_path_layout() {
    assert_eq!(entry_path("arm64-v8a", "libfoo.so"), "lib/arm64-v8a/libfoo.so");
}

#[rstest]
fn prefers_earlier_abi() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("base.apk");
    write_archive(
        &archive,
        &[
            ("lib/x86/libfoo.so", b"x86".as_slice()),
            ("lib/arm64-v8a/libfoo.so", b"arm64".as_slice()),
        ],
    );
    let found = locate(
        &[archive.clone()],
        &abis(&["arm64-v8a", "x86"]),
        "libfoo.so",
        5,
        &silent,
    )
    .unwrap();
    assert_eq!(found.entry_name(), "lib/arm64-v8a/libfoo.so");
    assert_eq!(found.archive_path(), archive.as_path());
}

#[rstest]
fn searches_archives_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.apk");
    let base = dir.path().join("base.apk");
    let split = dir.path().join("split.apk");
    write_archive(&base, &[("lib/x86/libother.so", b"other".as_slice())]);
    write_archive(&split, &[("lib/x86/libfoo.so", b"foo".as_slice())]);

    // An archive that cannot be opened is skipped after its retries.
    let found = locate(
        &[missing, base, split.clone()],
        &abis(&["x86"]),
        "libfoo.so",
        2,
        &silent,
    )
    .unwrap();
    assert_eq!(found.archive_path(), split.as_path());
}

#[rstest]
fn missing_library_lists_shipped_abis() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("base.apk");
    write_archive(
        &archive,
        &[
            ("lib/x86/libfoo.so", b"x86".as_slice()),
            ("lib/armeabi-v7a/libfoo.so", b"arm".as_slice()),
            ("lib/x86/libbar.so", b"bar".as_slice()),
        ],
    );
    let found = archive_abis(&[archive.clone()], "libfoo.so").unwrap();
    assert_eq!(found, ["x86", "armeabi-v7a"]);

    let err = locate(&[archive], &abis(&["arm64-v8a"]), "libfoo.so", 5, &silent)
        .err()
        .unwrap();
    let Error::MissingLibrary { msg } = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(msg.contains("Could not find 'libfoo.so'"), "{msg}");
    assert!(msg.contains(r#"Looked for: ["arm64-v8a"]"#), "{msg}");
    assert!(msg.contains(r#"only found: ["x86", "armeabi-v7a"]"#), "{msg}");
}

#[rstest]
fn extracts_entry() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("base.apk");
    let payload = vec![0x5au8; 70_000];
    write_archive(&archive, &[("lib/x86_64/libfoo.so", payload.as_slice())]);

    let mut found = locate(&[archive], &abis(&["x86_64"]), "libfoo.so", 5, &silent).unwrap();
    let destination = dir.path().join("libfoo.so");
    let written = extract(&mut found, &destination, 5, &silent).unwrap();
    assert_eq!(written, payload.len() as u64);
    assert_eq!(std::fs::read(&destination).unwrap(), payload);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&destination).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}

/// An entry whose stream truncates the destination once it has been fully
/// read, as a concurrent extraction of the same file would.
struct RacingEntry {
    destination: PathBuf,
    payload: Vec<u8>,
    opens: usize,
}

struct TruncateAtEof {
    inner: Cursor<Vec<u8>>,
    destination: PathBuf,
}

impl Read for TruncateAtEof {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            OpenOptions::new()
                .write(true)
                .open(&self.destination)?
                .set_len(0)?;
        }
        Ok(n)
    }
}

impl EntrySource for RacingEntry {
    fn name(&self) -> &str {
        "lib/x86_64/libracy.so"
    }

    fn open(&mut self) -> io::Result<Box<dyn Read + '_>> {
        self.opens += 1;
        Ok(Box::new(TruncateAtEof {
            inner: Cursor::new(self.payload.clone()),
            destination: self.destination.clone(),
        }))
    }
}

#[rstest]
fn racing_truncation_exhausts_retries() {
    init_logger();
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("libracy.so");
    let mut entry = RacingEntry {
        destination: destination.clone(),
        payload: b"not quite a library".to_vec(),
        opens: 0,
    };
    let err = extract(&mut entry, &destination, 5, &silent).unwrap_err();
    assert!(matches!(err, Error::ExtractionFailed { .. }), "{err}");
    assert_eq!(entry.opens, 5);
    assert!(!destination.exists());
}

#[rstest]
fn archive_installer_installs() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("base.apk");
    write_archive(&archive, &[("lib/x86/libfoo.so", b"\x7fELF".as_slice())]);
    let installer = ArchiveInstaller::new([&archive]).max_tries(2);
    assert_eq!(installer.archives(), [archive.clone()]);

    let destination = dir.path().join("libfoo.so");
    installer
        .install(&abis(&["arm64-v8a", "x86"]), "libfoo.so", &destination, &silent)
        .unwrap();
    assert_eq!(std::fs::read(&destination).unwrap(), b"\x7fELF");
}

#[rstest]
fn extract_without_tries_keeps_destination() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("base.apk");
    write_archive(&archive, &[("lib/x86/libfoo.so", b"new".as_slice())]);
    let mut found = locate(&[archive], &abis(&["x86"]), "libfoo.so", 1, &silent).unwrap();
    let destination = dir.path().join("libfoo.so");
    std::fs::write(&destination, b"installed").unwrap();

    let err = extract(&mut found, &destination, 0, &silent).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err}");
    assert_eq!(std::fs::read(&destination).unwrap(), b"installed");
}

#[rstest]
fn zero_retry_budget_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let installer = ArchiveInstaller::new([dir.path().join("base.apk")]).max_tries(0);
    let err = installer
        .install(&abis(&["x86"]), "libfoo.so", &dir.path().join("libfoo.so"), &silent)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
}
