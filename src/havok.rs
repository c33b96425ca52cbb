//! Havok clip downgrading through the external tool chain.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tempfile::TempDir;
use tracing::debug;
use walkdir::WalkDir;

use crate::container::BinaryEntry;

/// Downgrades one Havok binary to the target generation.
///
/// The pipeline calls this per clip entry and skips the entry on failure,
/// so implementations report errors rather than panic. Tests substitute a
/// pass-through stub.
pub trait HavokDowngrader {
    fn downgrade(&self, entry: &BinaryEntry, compendium: Option<&BinaryEntry>)
        -> Result<Vec<u8>>;
}

/// Runs the three-stage downgrade chain (unpack to XML, rewrite the XML to
/// the 2014 object layout, repack) with tools discovered under a tools
/// directory. Blocking, no timeout; the tools finish in seconds per clip.
pub struct ToolDowngrader {
    tools_dir: PathBuf,
}

impl ToolDowngrader {
    pub fn new(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: tools_dir.into(),
        }
    }

    /// Recursive search so the tools may ship in their own subdirectories.
    fn find_tool(&self, name: &str) -> Result<PathBuf> {
        for dir_entry in WalkDir::new(&self.tools_dir).into_iter().flatten() {
            if dir_entry.file_type().is_file() && dir_entry.file_name() == name {
                return Ok(dir_entry.into_path());
            }
        }
        bail!(
            "tool {name} not found under {}",
            self.tools_dir.display()
        );
    }

    fn run_tool(&self, name: &str, args: &[&str]) -> Result<()> {
        let tool = self.find_tool(name)?;
        debug!(tool = %tool.display(), ?args, "running downgrade tool");
        let status = Command::new(&tool)
            .args(args)
            .current_dir(tool.parent().unwrap_or(Path::new(".")))
            .output()
            .with_context(|| format!("failed to spawn {name}"))?;
        if !status.status.success() {
            bail!(
                "{name} exited with {}: {}",
                status.status,
                String::from_utf8_lossy(&status.stderr).trim()
            );
        }
        Ok(())
    }
}

impl HavokDowngrader for ToolDowngrader {
    fn downgrade(
        &self,
        entry: &BinaryEntry,
        compendium: Option<&BinaryEntry>,
    ) -> Result<Vec<u8>> {
        let work = TempDir::new().context("creating downgrade scratch dir")?;
        let hkx_name = entry.file_name();
        let stem = hkx_name.rsplit_once('.').map_or(hkx_name, |(s, _)| s);
        let hkx_path = work.path().join(hkx_name);
        let xml_path = work.path().join(format!("{stem}.xml"));
        std::fs::write(&hkx_path, &entry.bytes)
            .with_context(|| format!("writing {hkx_name} to scratch"))?;

        let hkx_str = hkx_path.to_string_lossy().into_owned();
        let xml_str = xml_path.to_string_lossy().into_owned();

        match compendium {
            Some(comp) => {
                let comp_path = work.path().join(comp.file_name());
                std::fs::write(&comp_path, &comp.bytes).context("writing compendium")?;
                let comp_str = comp_path.to_string_lossy().into_owned();
                self.run_tool(
                    "fileConvert",
                    &["-x", "--compendium", &comp_str, &hkx_str, &xml_str],
                )?;
            }
            None => self.run_tool("fileConvert", &["-x", &hkx_str, &xml_str])?,
        }

        self.run_tool("DS3HavokConverter", &[&xml_str])?;
        self.run_tool("hkxpack", &[&xml_str])?;

        // The repacker emits next to the XML under the original clip name.
        let out =
            std::fs::read(&hkx_path).with_context(|| format!("reading repacked {hkx_name}"))?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_reports_the_name() {
        let dir = TempDir::new().unwrap();
        let dg = ToolDowngrader::new(dir.path());
        let entry = BinaryEntry::new(0, "a000_003000.hkx", vec![0; 8]);
        let err = dg.downgrade(&entry, None).unwrap_err();
        assert!(err.to_string().contains("fileConvert"));
    }
}
