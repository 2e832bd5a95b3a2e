//! Access policies: compilation of boolean expressions into threshold trees
//! and the satisfaction logic shared by encryption and decryption.

mod access_structure;
mod parser;


pub use access_structure::{AccessStructure, Selection, ThresholdTree, MAX_POLICY_DEPTH};
pub use parser::{postfix_string, to_postfix, Token};
