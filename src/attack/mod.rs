pub mod simulator;

pub use simulator::{AttackKind, AttackOutcome, AttackSimulator};
