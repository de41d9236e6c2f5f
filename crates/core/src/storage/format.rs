use crate::errors::CoreError;

use super::encryption::{KdfParams, NONCE_LEN, SALT_LEN};

/// Magic bytes identifying a finance tracker snapshot.
pub const MAGIC: &[u8; 4] = b"FNTR";

/// Current snapshot format version.
pub const CURRENT_VERSION: u16 = 1;

/// magic(4) + version(2) + kdf_params(12) + salt(16) + nonce(12) + ciphertext_len(8)
pub const HEADER_SIZE: usize = 4 + 2 + 12 + SALT_LEN + NONCE_LEN + 8;

/// Parsed snapshot header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub version: u16,
    pub kdf_params: KdfParams,
    pub salt: [u8; SALT_LEN],
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext_len: u64,
}

/// Serialize header + ciphertext.
///
/// Layout (integers little-endian):
/// ```text
/// [FNTR: 4B] [version: 2B] [memory_cost: 4B] [time_cost: 4B] [parallelism: 4B]
/// [salt: 16B] [nonce: 12B] [ciphertext_len: 8B] [ciphertext]
/// ```
pub fn encode(header: &SnapshotHeader, ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&header.version.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.memory_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.time_cost.to_le_bytes());
    buf.extend_from_slice(&header.kdf_params.parallelism.to_le_bytes());
    buf.extend_from_slice(&header.salt);
    buf.extend_from_slice(&header.nonce);
    buf.extend_from_slice(&(ciphertext.len() as u64).to_le_bytes());
    buf.extend_from_slice(ciphertext);
    buf
}

/// Parse a snapshot into its header and ciphertext slice.
///
/// KDF costs are bounded so a crafted file cannot make key derivation
/// allocate unbounded memory.
pub fn decode(data: &[u8]) -> Result<(SnapshotHeader, &[u8]), CoreError> {
    if data.len() < HEADER_SIZE {
        return Err(CoreError::InvalidFileFormat(format!(
            "Snapshot too small: {} bytes, header alone is {HEADER_SIZE}",
            data.len()
        )));
    }

    let mut reader = Reader { data, offset: 0 };
    if reader.take::<4>()? != *MAGIC {
        return Err(CoreError::InvalidFileFormat(
            "Invalid magic bytes, not a finance tracker snapshot".into(),
        ));
    }

    let version = u16::from_le_bytes(reader.take()?);
    if version == 0 || version > CURRENT_VERSION {
        return Err(CoreError::UnsupportedVersion(version));
    }

    let kdf_params = KdfParams {
        memory_cost: u32::from_le_bytes(reader.take()?),
        time_cost: u32::from_le_bytes(reader.take()?),
        parallelism: u32::from_le_bytes(reader.take()?),
    };
    check_range("memory_cost", kdf_params.memory_cost, 8, 1_048_576)?;
    check_range("time_cost", kdf_params.time_cost, 1, 20)?;
    check_range("parallelism", kdf_params.parallelism, 1, 16)?;

    let salt = reader.take()?;
    let nonce = reader.take()?;
    let ciphertext_len = u64::from_le_bytes(reader.take()?);

    let remaining = data.len() - reader.offset;
    let len = usize::try_from(ciphertext_len)
        .ok()
        .filter(|len| *len <= remaining)
        .ok_or_else(|| {
            CoreError::InvalidFileFormat(format!(
                "Snapshot truncated: header announces {ciphertext_len} bytes of ciphertext, {remaining} present"
            ))
        })?;

    let header = SnapshotHeader {
        version,
        kdf_params,
        salt,
        nonce,
        ciphertext_len,
    };
    Ok((header, &data[reader.offset..reader.offset + len]))
}

fn check_range(name: &str, value: u32, min: u32, max: u32) -> Result<(), CoreError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::InvalidFileFormat(format!(
            "KDF {name} out of safe range: {value} (expected {min}..={max})"
        )))
    }
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], CoreError> {
        let bytes: [u8; N] = self
            .data
            .get(self.offset..self.offset + N)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| {
                CoreError::InvalidFileFormat(format!("Unexpected end of header at byte {}", self.offset))
            })?;
        self.offset += N;
        Ok(bytes)
    }
}
