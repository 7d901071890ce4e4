pub mod process_create_dummy_csv;
pub mod process_create_merkle_tree;
pub mod process_get_proof;
pub mod process_import_allocations;
pub mod process_regenerate;
pub mod process_repair_wallets;
pub mod process_show_distribution;
pub mod process_verify;

pub use process_create_dummy_csv::process_create_dummy_csv;
pub use process_create_merkle_tree::process_create_merkle_tree;
pub use process_get_proof::process_get_proof;
pub use process_import_allocations::process_import_allocations;
pub use process_regenerate::process_regenerate;
pub use process_repair_wallets::process_repair_wallets;
pub use process_show_distribution::process_show_distribution;
pub use process_verify::process_verify;
