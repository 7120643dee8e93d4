// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod engine;
pub mod metrics;
pub mod reporter;
pub mod signer;
pub mod strategy;
