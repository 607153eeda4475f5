/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use vsearch_utils::DataType as StoredType;

/// Element type of the input files.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Deserialize, Serialize)]
pub enum DataType {
    /// 32 bit float.
    Float,

    /// Unsigned 8-bit integer.
    Uint8,

    /// Signed 8-bit integer.
    Int8,

    /// Unsigned 32-bit integer.
    Uint32,

    /// Unsigned 64-bit integer.
    Uint64,
}

impl From<DataType> for StoredType {
    fn from(data_type: DataType) -> Self {
        match data_type {
            DataType::Float => StoredType::Float32,
            DataType::Uint8 => StoredType::Uint8,
            DataType::Int8 => StoredType::Int8,
            DataType::Uint32 => StoredType::Uint32,
            DataType::Uint64 => StoredType::Uint64,
        }
    }
}

/// Run `$body` with `$T` bound to the element type selected by `$data_type`.
#[macro_export]
macro_rules! with_data_type {
    ($data_type:expr, $T:ident => $body:expr) => {
        match $data_type {
            $crate::utils::DataType::Float => {
                type $T = f32;
                $body
            }
            $crate::utils::DataType::Uint8 => {
                type $T = u8;
                $body
            }
            $crate::utils::DataType::Int8 => {
                type $T = i8;
                $body
            }
            $crate::utils::DataType::Uint32 => {
                type $T = u32;
                $body
            }
            $crate::utils::DataType::Uint64 => {
                type $T = u64;
                $body
            }
        }
    };
}
