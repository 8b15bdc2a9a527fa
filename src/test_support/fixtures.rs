//! In-memory package fixtures.
//!
//! Builders for the archive formats the installer handles, so tests can
//! serve realistic content without touching the network.

use std::io::{Cursor, Write};

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, EntryType, Header};

/// Build an uncompressed tar archive from `(path, content)` pairs.
pub fn tar(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for (path, content) in files {
        append_file(&mut builder, path, content.as_bytes());
    }
    builder.into_inner().unwrap()
}

/// Build a gzip-compressed tar archive from `(path, content)` pairs.
pub fn tar_gz(files: &[(&str, &str)]) -> Vec<u8> {
    gzip(&tar(files))
}

/// Like [`tar`], but writes entry names verbatim, so paths such as
/// `../escape` that the tar builder would refuse can be produced.
pub fn tar_raw(files: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = Builder::new(Vec::new());
    for (path, content) in files {
        let mut header = Header::new_old();
        let name = path.as_bytes();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_entry_type(EntryType::Regular);
        header.set_cksum();
        builder.append(&header, content.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Gzip-compressed [`tar_raw`].
pub fn tar_gz_raw(files: &[(&str, &str)]) -> Vec<u8> {
    gzip(&tar_raw(files))
}

/// Build a zip archive from `(path, content)` pairs.
pub fn zip(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in files {
        writer
            .start_file(*path, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Build a `.gem` file declaring `name` and `version`.
pub fn gem_file(name: &str, version: &str) -> Vec<u8> {
    let metadata = gzip(gem_metadata(name, version).as_bytes());
    let data = tar_gz(&[(&format!("lib/{}.rb", name), "")]);

    let mut builder = Builder::new(Vec::new());
    append_file(&mut builder, "metadata.gz", &metadata);
    append_file(&mut builder, "data.tar.gz", &data);
    builder.into_inner().unwrap()
}

/// Gem metadata YAML as `gem build` writes it.
pub fn gem_metadata(name: &str, version: &str) -> String {
    format!(
        "--- !ruby/object:Gem::Specification\n\
         name: {name}\n\
         version: !ruby/object:Gem::Version\n  version: {version}\n\
         platform: ruby\n\
         authors:\n- Test\n\
         dependencies: []\n\
         summary: Test gem\n"
    )
}

/// A minimal gemspec declaring `name` and `version` as literals.
pub fn gemspec_source(name: &str, version: &str) -> String {
    format!(
        "# -*- encoding: utf-8 -*-\n\
         Gem::Specification.new do |s|\n  \
           s.name = \"{name}\"\n  \
           s.version = \"{version}\"\n  \
           s.summary = \"Test gem\"\n  \
           s.files = Dir[\"lib/**/*.rb\"]\n\
         end\n"
    )
}

fn append_file(builder: &mut Builder<Vec<u8>>, path: &str, content: &[u8]) {
    let mut header = Header::new_gnu();
    header.set_path(path).unwrap();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append(&header, content).unwrap();
}

fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
