/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use trmm_bench_runner::registry::{AlreadyExists, Variants};
use trmm_kernels::{Baseline, Blocked, RowPartitioned, RowSharded};

/// Register every variant built into the binary.
pub(crate) fn register_variants(variants: &mut Variants) -> Result<(), AlreadyExists> {
    variants.register(Baseline)?;
    variants.register(Blocked::default())?;
    variants.register(RowPartitioned)?;
    variants.register(RowSharded)?;
    Ok(())
}
