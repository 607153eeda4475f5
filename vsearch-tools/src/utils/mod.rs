/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */
pub mod cmd_tool_error;
pub use cmd_tool_error::*;

pub mod data_type;
pub use data_type::*;

pub mod input;
pub use input::*;

pub mod ground_truth;
pub use ground_truth::*;

pub mod flat_query;
pub use flat_query::*;

pub mod ivf_assign;
pub use ivf_assign::*;

pub mod tracing;
pub use tracing::{init_subscriber, init_test_subscriber};
