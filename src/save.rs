//! World snapshot files: a fixed header, then a zstd-compressed bincode payload.

use anyhow::{Context, Result};
use crc32fast::Hasher;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tileforge_world::WorldSnapshot;
use tracing::info;

/// "TFWS" = tileforge world snapshot.
const SAVE_MAGIC: u32 = 0x5446_5753;

const SAVE_VERSION: u16 = 1;

const HEADER_LEN: usize = 14;

#[derive(Debug, Clone, PartialEq, Eq)]
struct SaveHeader {
    version: u16,
    crc32: u32,
    payload_len: u32,
}

impl SaveHeader {
    fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&SAVE_MAGIC.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.crc32.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Result<Self> {
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != SAVE_MAGIC {
            anyhow::bail!(
                "Invalid save magic: expected 0x{:08X}, got 0x{:08X}",
                SAVE_MAGIC,
                magic
            );
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != SAVE_VERSION {
            anyhow::bail!("Unsupported save version {version}");
        }
        Ok(Self {
            version,
            crc32: u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            payload_len: u32::from_le_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
        })
    }
}

fn checksum(bytes: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize()
}

/// Write a snapshot, creating parent directories as needed.
pub fn save_snapshot(path: &Path, snapshot: &WorldSnapshot) -> Result<()> {
    let serialized = bincode::serialize(snapshot).context("Failed to serialize snapshot")?;
    let compressed = zstd::encode_all(&serialized[..], 3).context("Failed to compress snapshot")?;
    let header = SaveHeader {
        version: SAVE_VERSION,
        crc32: checksum(&compressed),
        payload_len: u32::try_from(compressed.len()).context("Snapshot too large")?,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create save directory")?;
    }
    let mut file = File::create(path).context("Failed to create save file")?;
    file.write_all(&header.to_bytes())
        .context("Failed to write header")?;
    file.write_all(&compressed).context("Failed to write payload")?;
    info!(
        path = %path.display(),
        seed = snapshot.seed,
        bytes = compressed.len(),
        "world saved"
    );
    Ok(())
}

/// Read and verify a snapshot written by [`save_snapshot`].
pub fn load_snapshot(path: &Path) -> Result<WorldSnapshot> {
    let mut file = File::open(path).context("Failed to open save file")?;
    let mut header_bytes = [0u8; HEADER_LEN];
    file.read_exact(&mut header_bytes)
        .context("Failed to read save header")?;
    let header = SaveHeader::from_bytes(&header_bytes)?;

    let mut compressed = vec![0u8; header.payload_len as usize];
    file.read_exact(&mut compressed)
        .context("Failed to read save payload")?;
    let computed = checksum(&compressed);
    if computed != header.crc32 {
        anyhow::bail!(
            "CRC32 mismatch: expected {:08X}, got {:08X}",
            header.crc32,
            computed
        );
    }

    let decompressed = zstd::decode_all(&compressed[..]).context("Failed to decompress snapshot")?;
    let snapshot: WorldSnapshot =
        bincode::deserialize(&decompressed).context("Failed to deserialize snapshot")?;
    if snapshot.blocks.len() != snapshot.width * snapshot.height {
        anyhow::bail!(
            "Invalid snapshot: {}x{} world with {} blocks",
            snapshot.width,
            snapshot.height,
            snapshot.blocks.len()
        );
    }
    Ok(snapshot)
}
