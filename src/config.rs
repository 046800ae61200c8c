use std::env;
use std::str::FromStr;

use crate::attack::AttackSimulator;
use crate::attack::simulator::{DEFAULT_HASH_POWER, DEFAULT_MAX_PRIVATE_BLOCKS};
use crate::blockchain::codec::HASH_HEX_LEN;
use crate::blockchain::{
    DEFAULT_CURRENCY, DEFAULT_DIFFICULTY, DEFAULT_MAX_NONCE, DEFAULT_REWARD, LedgerSettings,
};
use crate::error::{ConfigError, LedgerError};
use crate::transaction::Amount;

/// Runtime configuration read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub host: String,
    pub port: u16,
    pub ledger: LedgerSettings,
    pub attacker_hash_power: f64,
    pub max_private_blocks: usize,
}

impl SimConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 8080)?;

        let difficulty: u32 = parse_or(&lookup, "POW_DIFFICULTY", DEFAULT_DIFFICULTY)?;
        if difficulty as usize > HASH_HEX_LEN {
            return Err(invalid(
                "POW_DIFFICULTY",
                difficulty.to_string(),
                format!("at most {HASH_HEX_LEN} hex digits"),
            ));
        }

        let reward_amount = match lookup("MINING_REWARD") {
            Some(raw) => {
                let amount: Amount = raw
                    .parse()
                    .map_err(|e| invalid("MINING_REWARD", raw.clone(), format!("{e}")))?;
                if !amount.is_positive() {
                    return Err(invalid("MINING_REWARD", raw, "must be > 0".into()));
                }
                amount
            }
            None => Amount::from_whole(DEFAULT_REWARD)
                .map_err(|e| invalid("MINING_REWARD", DEFAULT_REWARD.to_string(), e.to_string()))?,
        };

        let reward_currency = lookup("DEFAULT_CURRENCY")
            .map(|c| c.trim().to_string())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        if reward_currency.is_empty() {
            return Err(invalid("DEFAULT_CURRENCY", reward_currency, "must not be empty".into()));
        }

        let max_nonce: u64 = parse_or(&lookup, "POW_MAX_NONCE", DEFAULT_MAX_NONCE)?;
        if max_nonce == 0 {
            return Err(invalid("POW_MAX_NONCE", "0".into(), "must be > 0".into()));
        }

        let strict_validation = match lookup("STRICT_POW_VALIDATION").as_deref().map(str::trim) {
            None | Some("") | Some("0") => false,
            Some("1") => true,
            Some(other) => {
                return Err(invalid(
                    "STRICT_POW_VALIDATION",
                    other.to_string(),
                    "expected 0 or 1".into(),
                ));
            }
        };

        let attacker_hash_power: f64 = parse_or(&lookup, "ATTACKER_HASH_POWER", DEFAULT_HASH_POWER)?;
        if !(attacker_hash_power > 0.0 && attacker_hash_power < 1.0) {
            return Err(invalid(
                "ATTACKER_HASH_POWER",
                attacker_hash_power.to_string(),
                "must be in (0, 1)".into(),
            ));
        }

        let max_private_blocks: usize =
            parse_or(&lookup, "MAX_PRIVATE_BLOCKS", DEFAULT_MAX_PRIVATE_BLOCKS)?;
        if max_private_blocks == 0 {
            return Err(invalid("MAX_PRIVATE_BLOCKS", "0".into(), "must be > 0".into()));
        }

        Ok(Self {
            host,
            port,
            ledger: LedgerSettings {
                difficulty,
                reward_amount,
                reward_currency,
                max_nonce: Some(max_nonce),
                strict_validation,
            },
            attacker_hash_power,
            max_private_blocks,
        })
    }

    pub fn simulator(&self) -> Result<AttackSimulator, LedgerError> {
        Ok(AttackSimulator::new(self.attacker_hash_power)?
            .with_max_private_blocks(self.max_private_blocks))
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ledger: LedgerSettings::default(),
            attacker_hash_power: DEFAULT_HASH_POWER,
            max_private_blocks: DEFAULT_MAX_PRIVATE_BLOCKS,
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, raw.clone(), e.to_string())),
    }
}

fn invalid(key: &'static str, value: String, reason: String) -> ConfigError {
    ConfigError::Invalid { key, value, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<SimConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SimConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_match_the_simulator_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.ledger, LedgerSettings::default());
        assert_eq!(cfg.ledger.difficulty, 3);
        assert_eq!(cfg.ledger.reward_amount.to_string(), "10");
        assert_eq!(cfg.ledger.reward_currency, "USDT");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.attacker_hash_power, 0.6);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config(&[
            ("POW_DIFFICULTY", "2"),
            ("MINING_REWARD", "12.5"),
            ("DEFAULT_CURRENCY", "BTC"),
            ("STRICT_POW_VALIDATION", "1"),
            ("ATTACKER_HASH_POWER", "0.75"),
            ("MAX_PRIVATE_BLOCKS", "8"),
            ("PORT", "9000"),
        ])
        .unwrap();
        assert_eq!(cfg.ledger.difficulty, 2);
        assert_eq!(cfg.ledger.reward_amount.to_string(), "12.5");
        assert_eq!(cfg.ledger.reward_currency, "BTC");
        assert!(cfg.ledger.strict_validation);
        assert_eq!(cfg.port, 9000);

        let sim = cfg.simulator().unwrap();
        assert_eq!(sim.hash_power(), 0.75);
        assert_eq!(sim.max_private_blocks(), 8);
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            ("POW_DIFFICULTY", "65"),
            ("POW_DIFFICULTY", "three"),
            ("MINING_REWARD", "0"),
            ("MINING_REWARD", "-1"),
            ("DEFAULT_CURRENCY", "  "),
            ("POW_MAX_NONCE", "0"),
            ("STRICT_POW_VALIDATION", "yes"),
            ("ATTACKER_HASH_POWER", "1.0"),
            ("MAX_PRIVATE_BLOCKS", "0"),
            ("PORT", "99999"),
        ] {
            let err = config(&[(key, value)]).unwrap_err();
            let ConfigError::Invalid { key: got, .. } = err;
            assert_eq!(got, key);
        }
    }
}
