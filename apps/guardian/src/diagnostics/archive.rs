// [apps/guardian/src/diagnostics/archive.rs]
//! Packages a diagnostics output directory into a single compressed
//! tarball (`spec.md` §4.5's artifact format).

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io;
use std::path::Path;

/// Writes every regular file directly under `source_dir` into a gzip'd tar
/// at `destination`, using each file's own name as its tar entry name (the
/// layout the spec describes: one `<pod>.txt` per pod plus the
/// namespace-level files, all flat in the archive root).
pub fn pack_directory(source_dir: &Path, destination: &Path) -> io::Result<()> {
    let tar_gz = File::create(destination)?;
    let encoder = GzEncoder::new(tar_gz, Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut entries: Vec<_> = std::fs::read_dir(source_dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_file() {
            let mut file = File::open(&path)?;
            builder.append_file(entry.file_name(), &mut file)?;
        }
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn packs_and_can_be_read_back() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("a.txt"), b"hello").unwrap();
        std::fs::write(source.path().join("b.txt"), b"world").unwrap();

        let destination = tempfile::NamedTempFile::new().unwrap();
        pack_directory(source.path(), destination.path()).unwrap();

        let file = File::open(destination.path()).unwrap();
        let decoder = flate2::read::GzDecoder::new(file);
        let mut archive = tar::Archive::new(decoder);
        let mut names: Vec<String> = Vec::new();
        for entry in archive.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().to_string();
            let mut contents = String::new();
            entry.read_to_string(&mut contents).unwrap();
            names.push(format!("{path}:{contents}"));
        }
        assert!(names.iter().any(|n| n == "a.txt:hello"));
        assert!(names.iter().any(|n| n == "b.txt:world"));
    }
}
