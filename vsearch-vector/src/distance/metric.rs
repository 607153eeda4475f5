/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
use std::{fmt, str::FromStr};

use thiserror::Error;

/// How closeness between two vectors is measured. Smaller is always closer.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Metric {
    /// Squared Euclidean distance.
    #[default]
    L2,
    /// The dot product, negated.
    InnerProduct,
}

impl Metric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::L2 => "l2",
            Self::InnerProduct => "innerproduct",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown metric \"{0}\", expected \"l2\" or \"innerproduct\"")]
pub struct ParseMetricError(pub String);

impl FromStr for Metric {
    type Err = ParseMetricError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Self::L2),
            "innerproduct" | "ip" | "mips" => Ok(Self::InnerProduct),
            _ => Err(ParseMetricError(s.to_owned())),
        }
    }
}
