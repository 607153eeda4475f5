/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Element types that matrices can be stored as on disk.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Float32,
    Uint8,
    Int8,
    Uint32,
    Uint64,
}

impl DataType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Uint8 => "uint8",
            Self::Int8 => "int8",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
        }
    }

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::Uint8 | Self::Int8 => 1,
            Self::Float32 | Self::Uint32 => 4,
            Self::Uint64 => 8,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported element type \"{0}\"")]
pub struct UnsupportedDtype(pub String);

impl FromStr for DataType {
    type Err = UnsupportedDtype;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "float32" | "f32" | "float" => Ok(Self::Float32),
            "uint8" | "u8" => Ok(Self::Uint8),
            "int8" | "i8" => Ok(Self::Int8),
            "uint32" | "u32" => Ok(Self::Uint32),
            "uint64" | "u64" => Ok(Self::Uint64),
            other => Err(UnsupportedDtype(other.to_owned())),
        }
    }
}

/// A primitive that can be stored in a matrix file.
pub trait Scalar: bytemuck::Pod + Send + Sync + fmt::Debug + 'static {
    const DTYPE: DataType;
}

macro_rules! scalar {
    ($T:ty, $dtype:ident) => {
        impl Scalar for $T {
            const DTYPE: DataType = DataType::$dtype;
        }
    };
}

scalar!(f32, Float32);
scalar!(u8, Uint8);
scalar!(i8, Int8);
scalar!(u32, Uint32);
scalar!(u64, Uint64);
