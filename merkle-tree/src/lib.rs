pub mod csv_entry;
pub mod distribution_merkle_tree;
pub mod error;
pub mod merkle_tree;
pub mod tree_node;
pub mod utils;
