// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod block_feed;
pub mod chain;
pub mod gas;
pub mod nonce;
pub mod provider;
pub mod reputation;
