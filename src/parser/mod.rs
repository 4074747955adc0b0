//! Line-level structure recovery: pages arrive as flat text lines and the
//! scanners here anchor on vocabulary tokens to rebuild records.

pub mod costumes;
pub mod lines;
pub mod potentials;
pub mod skills;
pub mod vocab;
pub mod weapons;
