//! Hand-off of a deployed contract's address between invocations.
//!
//! The file holds a single 0x-prefixed checksummed address.

use std::fs;
use std::path::Path;

use alloy::primitives::Address;
use eyre::{bail, Context, Result};

/// Writes `address` to `path`, creating parent directories.
pub fn write_contract_id(path: &Path, address: Address) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .wrap_err_with(|| format!("creating directory {}", parent.display()))?;
    }

    fs::write(path, address.to_checksum(None))
        .wrap_err_with(|| format!("writing contract id to {}", path.display()))?;

    tracing::info!(%address, path = %path.display(), "saved contract id");
    Ok(())
}

/// Reads the address written by [`write_contract_id`].
///
/// # Errors
/// Returns error if the file is missing, empty, or not a hex address.
pub fn read_contract_id(path: &Path) -> Result<Address> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading contract id from {}", path.display()))?;

    let text = text.trim();
    if text.is_empty() {
        bail!("contract id file {} is empty", path.display());
    }

    text.parse::<Address>()
        .wrap_err_with(|| format!("contract id {text:?} is not an address"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn written_id_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zarf/ethereum/basic.cid");
        let contract = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

        write_contract_id(&path, contract).unwrap();
        assert_eq!(read_contract_id(&path).unwrap(), contract);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
    }

    #[test]
    fn empty_or_garbage_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.cid");

        fs::write(&path, "\n").unwrap();
        assert!(read_contract_id(&path).is_err());

        fs::write(&path, "0xnothex").unwrap();
        assert!(read_contract_id(&path).is_err());
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("basic.cid");
        fs::write(&path, "  0x5fbdb2315678afecb367f032d93f642f64180aa3\n").unwrap();
        assert!(read_contract_id(&path).is_ok());
    }
}
