/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::collections::BTreeMap;

use thiserror::Error;
use trmm_kernels::Variant;

#[derive(Debug, Error)]
#[error("a variant named \"{0}\" is already registered")]
pub struct AlreadyExists(pub &'static str);

#[derive(Debug, Error)]
#[error("no variant named \"{name}\" is registered. Available variants: {}", .available.join(", "))]
pub struct UnknownVariant {
    name: String,
    available: Vec<&'static str>,
}

/// The variants available to the application, keyed by [`Variant::name`].
pub struct Variants {
    variants: BTreeMap<&'static str, Box<dyn Variant>>,
}

impl Variants {
    pub fn new() -> Self {
        Self {
            variants: BTreeMap::new(),
        }
    }

    /// Register `variant`.
    ///
    /// Returns an error and leaves the registry unchanged if a variant with the same name
    /// is already registered.
    pub fn register<T>(&mut self, variant: T) -> Result<(), AlreadyExists>
    where
        T: Variant + 'static,
    {
        self.register_boxed(Box::new(variant))
    }

    /// Register an already boxed `variant`.
    pub fn register_boxed(&mut self, variant: Box<dyn Variant>) -> Result<(), AlreadyExists> {
        use std::collections::btree_map::Entry;

        let name = variant.name();
        match self.variants.entry(name) {
            Entry::Vacant(entry) => {
                entry.insert(variant);
                Ok(())
            }
            Entry::Occupied(_) => Err(AlreadyExists(name)),
        }
    }

    /// Return the variant registered as `name`, if any.
    pub fn get(&self, name: &str) -> Option<&dyn Variant> {
        self.variants.get(name).map(|v| &**v)
    }

    /// Return the variant registered as `name` or an error listing the alternatives.
    pub fn lookup(&self, name: &str) -> Result<&dyn Variant, UnknownVariant> {
        self.get(name).ok_or_else(|| UnknownVariant {
            name: name.to_string(),
            available: self.names().collect(),
        })
    }

    /// Return the registered names in sorted order.
    pub fn names(&self) -> impl ExactSizeIterator<Item = &'static str> + '_ {
        self.variants.keys().copied()
    }

    /// Return the registered variants sorted by name.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &dyn Variant> {
        self.variants.values().map(|v| &**v)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

impl Default for Variants {
    fn default() -> Self {
        Self::new()
    }
}

///////////
// Tests //
///////////
