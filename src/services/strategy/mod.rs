// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

pub mod execution;
pub mod inspector;
pub mod portfolio;
pub mod registry;
pub mod safety;
pub mod simulation;
pub mod strategy;
