#![allow(dead_code)]

use relinker::{Error, LibraryInstaller, LibraryLoader, LoadAttempt, Logger, load_failed};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use zip::{ZipWriter, write::SimpleFileOptions};

pub const DT_NULL: u64 = 0;
pub const DT_NEEDED: u64 = 1;
pub const DT_STRTAB: u64 = 5;
pub const PT_LOAD: u32 = 1;
pub const PT_DYNAMIC: u32 = 2;

/// Virtual address the single `PT_LOAD` segment is placed at.
pub const LOAD_BASE: u64 = 0x10000;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn silent(_: &str) {}

/// Builds minimal shared objects: a header, a `PT_LOAD` covering the whole
/// file, an optional `PT_DYNAMIC` and the string table its entries point into.
#[derive(Debug, Clone)]
pub struct ElfBuilder {
    is_64: bool,
    big_endian: bool,
    needed: Vec<String>,
    dynamic: bool,
    strtab: bool,
    strtab_addr: Option<u64>,
    extended_numbering: bool,
}

impl Default for ElfBuilder {
    fn default() -> Self {
        Self {
            is_64: true,
            big_endian: false,
            needed: Vec::new(),
            dynamic: true,
            strtab: true,
            strtab_addr: None,
            extended_numbering: false,
        }
    }
}

impl ElfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elf32(mut self) -> Self {
        self.is_64 = false;
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    pub fn needed<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        self.needed = names.iter().map(|name| name.as_ref().to_string()).collect();
        self
    }

    pub fn without_dynamic(mut self) -> Self {
        self.dynamic = false;
        self
    }

    pub fn without_strtab(mut self) -> Self {
        self.strtab = false;
        self
    }

    /// Points `DT_STRTAB` at `addr` instead of the real string table.
    pub fn strtab_addr(mut self, addr: u64) -> Self {
        self.strtab_addr = Some(addr);
        self
    }

    /// Stores the program header count in section header 0 (`e_phnum = 0xffff`).
    pub fn extended_numbering(mut self) -> Self {
        self.extended_numbering = true;
        self
    }

    fn put(&self, buf: &mut [u8], offset: usize, value: u64, width: usize) {
        let bytes = value.to_le_bytes();
        let field = &mut buf[offset..offset + width];
        field.copy_from_slice(&bytes[..width]);
        if self.big_endian {
            field.reverse();
        }
    }

    fn word(&self) -> usize {
        if self.is_64 { 8 } else { 4 }
    }

    pub fn build(&self) -> Vec<u8> {
        let (ehsize, phsize, shsize, dynsize) = if self.is_64 {
            (64, 56, 64, 16)
        } else {
            (52, 32, 40, 8)
        };
        let phnum = if self.dynamic { 2 } else { 1 };
        let phoff = ehsize;

        let mut strtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for name in &self.needed {
            name_offsets.push(strtab.len() as u64);
            strtab.extend_from_slice(name.as_bytes());
            strtab.push(0);
        }

        let dyn_off = phoff + phnum * phsize;
        let dyn_count = if self.dynamic {
            self.needed.len() + usize::from(self.strtab) + 1
        } else {
            0
        };
        let strtab_off = dyn_off + dyn_count * dynsize;
        let shoff = strtab_off + strtab.len();
        let total = if self.extended_numbering {
            shoff + shsize
        } else {
            shoff
        };

        let mut buf = vec![0u8; total];
        buf[0..4].copy_from_slice(b"\x7fELF");
        buf[4] = if self.is_64 { 2 } else { 1 };
        buf[5] = if self.big_endian { 2 } else { 1 };
        buf[6] = 1;
        self.put(&mut buf, 16, 3, 2);
        self.put(&mut buf, 20, 1, 4);
        let phnum_field = if self.extended_numbering {
            0xffff
        } else {
            phnum as u64
        };
        let (shnum, shoff_field) = if self.extended_numbering {
            (1, shoff as u64)
        } else {
            (0, 0)
        };
        if self.is_64 {
            self.put(&mut buf, 32, phoff as u64, 8);
            self.put(&mut buf, 40, shoff_field, 8);
            self.put(&mut buf, 52, ehsize as u64, 2);
            self.put(&mut buf, 54, phsize as u64, 2);
            self.put(&mut buf, 56, phnum_field, 2);
            self.put(&mut buf, 58, shsize as u64, 2);
            self.put(&mut buf, 60, shnum, 2);
        } else {
            self.put(&mut buf, 28, phoff as u64, 4);
            self.put(&mut buf, 32, shoff_field, 4);
            self.put(&mut buf, 40, ehsize as u64, 2);
            self.put(&mut buf, 42, phsize as u64, 2);
            self.put(&mut buf, 44, phnum_field, 2);
            self.put(&mut buf, 46, shsize as u64, 2);
            self.put(&mut buf, 48, shnum, 2);
        }

        self.write_phdr(&mut buf, phoff, PT_LOAD, 0, LOAD_BASE, total as u64);
        if self.dynamic {
            self.write_phdr(
                &mut buf,
                phoff + phsize,
                PT_DYNAMIC,
                dyn_off as u64,
                LOAD_BASE + dyn_off as u64,
                (dyn_count * dynsize) as u64,
            );
            let word = self.word();
            let mut entry = dyn_off;
            let strtab_addr = self
                .strtab_addr
                .unwrap_or(LOAD_BASE + strtab_off as u64);
            let mut entries: Vec<(u64, u64)> = name_offsets
                .iter()
                .map(|&offset| (DT_NEEDED, offset))
                .collect();
            if self.strtab {
                entries.push((DT_STRTAB, strtab_addr));
            }
            entries.push((DT_NULL, 0));
            for (tag, value) in entries {
                self.put(&mut buf, entry, tag, word);
                self.put(&mut buf, entry + word, value, word);
                entry += dynsize;
            }
        }
        buf[strtab_off..strtab_off + strtab.len()].copy_from_slice(&strtab);

        if self.extended_numbering {
            let sh_info = if self.is_64 { 44 } else { 28 };
            self.put(&mut buf, shoff + sh_info, phnum as u64, 4);
        }
        buf
    }

    fn write_phdr(
        &self,
        buf: &mut [u8],
        at: usize,
        p_type: u32,
        offset: u64,
        vaddr: u64,
        size: u64,
    ) {
        self.put(buf, at, p_type.into(), 4);
        if self.is_64 {
            self.put(buf, at + 8, offset, 8);
            self.put(buf, at + 16, vaddr, 8);
            self.put(buf, at + 24, vaddr, 8);
            self.put(buf, at + 32, size, 8);
            self.put(buf, at + 40, size, 8);
        } else {
            self.put(buf, at + 4, offset, 4);
            self.put(buf, at + 8, vaddr, 4);
            self.put(buf, at + 12, vaddr, 4);
            self.put(buf, at + 16, size, 4);
            self.put(buf, at + 20, size, 4);
        }
    }
}

/// Writes a zip archive at `path` holding `entries` as `(entry path, bytes)`.
pub fn write_archive(path: &Path, entries: &[(&str, &[u8])]) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(bytes).unwrap();
    }
    zip.finish().unwrap();
}

#[derive(Debug, Default)]
pub struct LoaderState {
    pub system: HashSet<String>,
    pub by_name: Vec<String>,
    pub by_path: Vec<PathBuf>,
    pub reject_paths: bool,
}

/// A platform loader that only knows the names it was told about and records
/// every call.
#[derive(Debug, Clone, Default)]
pub struct MockLoader {
    state: Arc<Mutex<LoaderState>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system(names: &[&str]) -> Self {
        let loader = Self::default();
        loader.state.lock().unwrap().system = names.iter().map(|n| n.to_string()).collect();
        loader
    }

    pub fn reject_paths(&self) {
        self.state.lock().unwrap().reject_paths = true;
    }

    pub fn name_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().by_name.clone()
    }

    pub fn path_calls(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().by_path.clone()
    }
}

impl LibraryLoader for MockLoader {
    fn load_library(&self, name: &str) -> LoadAttempt {
        let mut state = self.state.lock().unwrap();
        state.by_name.push(name.to_string());
        if state.system.contains(name) {
            LoadAttempt::Loaded
        } else {
            LoadAttempt::Unsatisfied {
                reason: format!("{name} not found on the search path"),
            }
        }
    }

    fn load_path(&self, path: &Path) -> relinker::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.reject_paths {
            return Err(load_failed(format!("refusing {}", path.display())));
        }
        state.by_path.push(path.to_path_buf());
        Ok(())
    }

    fn supported_abis(&self) -> Vec<String> {
        vec!["arm64-v8a".to_string(), "x86_64".to_string()]
    }
}

#[derive(Debug, Default)]
pub struct InstallerState {
    pub payloads: HashMap<String, Vec<u8>>,
    pub installs: Vec<PathBuf>,
}

/// An installer serving library bytes from memory, keyed by mapped name.
#[derive(Debug, Clone, Default)]
pub struct MockInstaller {
    state: Arc<Mutex<InstallerState>>,
}

impl MockInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(self, mapped_name: &str, bytes: Vec<u8>) -> Self {
        self.state
            .lock()
            .unwrap()
            .payloads
            .insert(mapped_name.to_string(), bytes);
        self
    }

    pub fn installs(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().installs.clone()
    }
}

impl LibraryInstaller for MockInstaller {
    fn install(
        &self,
        abis: &[String],
        mapped_name: &str,
        destination: &Path,
        logger: &dyn Logger,
    ) -> relinker::Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some(bytes) = state.payloads.get(mapped_name).cloned() else {
            return Err(Error::MissingLibrary {
                msg: format!("Could not find '{mapped_name}'. Looked for: {abis:?}").into(),
            });
        };
        logger.log(&format!("installing {mapped_name}"));
        std::fs::write(destination, bytes).unwrap();
        state.installs.push(destination.to_path_buf());
        Ok(())
    }
}

/// Collects messages passed to a [`Logger`].
#[derive(Debug, Clone, Default)]
pub struct Captured {
    messages: Arc<Mutex<Vec<String>>>,
}

impl Captured {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Logger for Captured {
    fn log(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
