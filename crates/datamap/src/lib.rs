// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]

//! # datamap
//!
//! One crate, all features. Re-exports:
//! - [`Entity`] derive macro from `datamap-derive`
//! - everything from `datamap-core` ([`DataClient`], [`DescriptorRegistry`],
//!   [`Select`], [`col`], the drivers)

pub use datamap_core::*;
pub use datamap_derive::Entity;
