use std::{fs::File, path::PathBuf, result};

use serde::{Deserialize, Serialize};

use crate::error::MerkleTreeError;

pub type Result<T> = result::Result<T, MerkleTreeError>;

/// Represents a single entry in a CSV of claimants.
#[derive(Debug, Clone, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct CsvEntry {
    /// EVM wallet address of the claimant
    pub wallet: String,
    /// Claimable amount in whole tokens (decimal string, e.g. "12.5")
    pub amount: String,
}

impl CsvEntry {
    pub fn new_from_file(path: &PathBuf) -> Result<Vec<Self>> {
        let file = File::open(path)?;
        let mut rdr = csv::Reader::from_reader(file);

        let mut entries = Vec::new();
        for result in rdr.deserialize() {
            let record: CsvEntry = result?;
            entries.push(record);
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_csv_parsing() {
        let dir = std::env::temp_dir().join("amd_csv_entry_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("allocations.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "wallet,amount").unwrap();
        writeln!(file, "0x41347A026E28f532Ca464bd4FfFa451bF1aA5307,1000").unwrap();
        writeln!(file, "0x1111111111111111111111111111111111111111,0.5").unwrap();

        let entries = CsvEntry::new_from_file(&path).expect("Failed to parse CSV");

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].wallet,
            "0x41347A026E28f532Ca464bd4FfFa451bF1aA5307"
        );
        assert_eq!(entries[0].amount, "1000");
        assert_eq!(entries[1].amount, "0.5");
    }
}
