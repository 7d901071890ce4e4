use alloy_primitives::Address;
use anyhow::Result;
use csv::Writer;
use rand::Rng;

use crate::CreateDummyCsvArgs;

pub fn process_create_dummy_csv(dummy_args: &CreateDummyCsvArgs) -> Result<()> {
    let mut wtr = Writer::from_path(&dummy_args.csv_path)?;
    wtr.write_record(["wallet", "amount"])?;

    let mut rng = rand::thread_rng();
    for _ in 0..dummy_args.num_records {
        let mut bytes = [0u8; 20];
        rng.fill(&mut bytes);
        let wallet = Address::from(bytes).to_checksum(None);
        wtr.write_record([wallet.as_str(), dummy_args.amount.as_str()])?;
    }

    wtr.flush()?;
    println!(
        "wrote {} records to {}",
        dummy_args.num_records,
        dummy_args.csv_path.display()
    );
    Ok(())
}
