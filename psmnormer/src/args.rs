use std::fmt::Display;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use psmnorm::{EngineVariant, StaticDynamicTieBreak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgEngineVariant {
    /// MS-GF+ TSV output, static modification masses written into peptides
    #[default]
    #[value(name = "msgfplus")]
    MsgfPlus,
    /// Legacy MSGFDB output, static modification masses left implicit
    #[value(name = "msgfdb")]
    MsgfDb,
}

impl From<ArgEngineVariant> for EngineVariant {
    fn from(value: ArgEngineVariant) -> Self {
        match value {
            ArgEngineVariant::MsgfPlus => EngineVariant::MsgfPlus,
            ArgEngineVariant::MsgfDb => EngineVariant::MsgfDb,
        }
    }
}

impl Display for ArgEngineVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", EngineVariant::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArgTieBreak {
    /// Resolve ambiguous masses to the static modification
    PreferStatic,
    /// Resolve ambiguous masses to the dynamic modification
    PreferDynamic,
}

impl From<ArgTieBreak> for StaticDynamicTieBreak {
    fn from(value: ArgTieBreak) -> Self {
        match value {
            ArgTieBreak::PreferStatic => StaticDynamicTieBreak::PreferStatic,
            ArgTieBreak::PreferDynamic => StaticDynamicTieBreak::PreferDynamic,
        }
    }
}

pub(crate) fn non_negative_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}
