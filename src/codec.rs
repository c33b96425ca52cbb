//! Serialized-document asset codec.
//!
//! The conversion engine treats the game's binary formats as a black box
//! behind [`AssetCodec`]; host applications plug their own format backends
//! into that seam. This codec covers the unpacked workflow the CLI and the
//! integration tests use: containers, event tables and meshes as TOML
//! documents with a leading `format` discriminator, entry payloads hex
//! encoded.

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::container::{AssetCodec, BinaryEntry, Container};
use crate::flver::Flver;
use crate::tae::Tae;

pub struct TomlCodec;

const BINDER_FORMAT: &str = "binder";
const TAE_FORMAT: &str = "tae";
const FLVER_FORMAT: &str = "flver";

#[derive(Serialize, Deserialize)]
struct BinderDoc {
    format: String,
    #[serde(default)]
    entry: Vec<EntryDoc>,
}

#[derive(Serialize, Deserialize)]
struct EntryDoc {
    id: i32,
    flags: u8,
    name: String,
    data: String,
}

#[derive(Serialize, Deserialize)]
struct TaeDoc {
    format: String,
    table: Tae,
}

#[derive(Serialize, Deserialize)]
struct FlverDoc {
    format: String,
    mesh: Flver,
}

fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    out
}

fn from_hex(text: &str) -> Result<Vec<u8>> {
    ensure!(text.len() % 2 == 0, "odd-length hex payload");
    (0..text.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&text[i..i + 2], 16)
                .with_context(|| format!("bad hex byte at offset {i}"))
        })
        .collect()
}

fn parse<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let text = std::str::from_utf8(bytes).context("document is not UTF-8")?;
    toml::from_str(text).context("parsing document")
}

impl AssetCodec for TomlCodec {
    fn read_container(&self, bytes: &[u8]) -> Result<Container> {
        let doc: BinderDoc = parse(bytes)?;
        ensure!(doc.format == BINDER_FORMAT, "not a binder document");
        let entries = doc
            .entry
            .into_iter()
            .map(|e| {
                Ok(BinaryEntry {
                    id: e.id,
                    flags: e.flags,
                    name: e.name,
                    bytes: from_hex(&e.data)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Container { entries })
    }

    fn write_container(&self, container: &Container) -> Result<Vec<u8>> {
        let doc = BinderDoc {
            format: BINDER_FORMAT.to_string(),
            entry: container
                .entries
                .iter()
                .map(|e| EntryDoc {
                    id: e.id,
                    flags: e.flags,
                    name: e.name.clone(),
                    data: to_hex(&e.bytes),
                })
                .collect(),
        };
        Ok(toml::to_string(&doc)
            .context("serializing binder document")?
            .into_bytes())
    }

    fn read_tae(&self, bytes: &[u8]) -> Result<Tae> {
        let doc: TaeDoc = parse(bytes)?;
        ensure!(doc.format == TAE_FORMAT, "not an event-table document");
        Ok(doc.table)
    }

    fn write_tae(&self, tae: &Tae) -> Result<Vec<u8>> {
        let doc = TaeDoc {
            format: TAE_FORMAT.to_string(),
            table: tae.clone(),
        };
        Ok(toml::to_string(&doc)
            .context("serializing event-table document")?
            .into_bytes())
    }

    fn is_flver(&self, bytes: &[u8]) -> bool {
        // The discriminator is the first key the serializer emits.
        let head = &bytes[..bytes.len().min(64)];
        std::str::from_utf8(head)
            .map(|s| s.contains("format = \"flver\""))
            .unwrap_or(false)
    }

    fn read_flver(&self, bytes: &[u8]) -> Result<Flver> {
        let doc: FlverDoc = parse(bytes)?;
        ensure!(doc.format == FLVER_FORMAT, "not a mesh document");
        Ok(doc.mesh)
    }

    fn write_flver(&self, flver: &Flver) -> Result<Vec<u8>> {
        let doc = FlverDoc {
            format: FLVER_FORMAT.to_string(),
            mesh: flver.clone(),
        };
        Ok(toml::to_string(&doc)
            .context("serializing mesh document")?
            .into_bytes())
    }
}
