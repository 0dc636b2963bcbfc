use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::ser::Formatter;

use crate::core::error::Result;
use crate::index::inverted::InvertedIndex;
use crate::query::engine::ResultMap;

/// Write the `word → location → positions` structure, all keys ascending.
pub fn write_index(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_json(index.postings(), path)
}

/// Write the `location → word count` object, locations ascending.
pub fn write_counts(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_json(index.word_counts(), path)
}

/// Write the `canonical query → ranked results` object.
pub fn write_results(results: &ResultMap, path: &Path) -> Result<()> {
    write_json(results, path)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    {
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, TwoSpacePretty::new());
        value.serialize(&mut serializer)?;
    }
    writer.flush()?;
    Ok(())
}

/// In-memory rendering, used by tests and anything that wants the exact file
/// bytes without a file.
pub fn to_pretty_string<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, TwoSpacePretty::new());
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Two-space pretty printer. Unlike serde_json's stock pretty formatter it
/// breaks the line inside every brace pair, so an empty object renders as
/// `{` newline `}` rather than `{}`.
struct TwoSpacePretty {
    depth: usize,
}

impl TwoSpacePretty {
    fn new() -> Self {
        TwoSpacePretty { depth: 0 }
    }

    fn newline<W: ?Sized + io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"\n")?;
        for _ in 0..self.depth {
            writer.write_all(b"  ")?;
        }
        Ok(())
    }
}

impl Formatter for TwoSpacePretty {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth += 1;
        writer.write_all(b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth -= 1;
        self.newline(writer)?;
        writer.write_all(b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if !first {
            writer.write_all(b",")?;
        }
        self.newline(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth += 1;
        writer.write_all(b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.depth -= 1;
        self.newline(writer)?;
        writer.write_all(b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if !first {
            writer.write_all(b",")?;
        }
        self.newline(writer)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}
