// Copyright 2026 The Agrilink Project
// SPDX-License-Identifier: Apache-2.0

pub mod config;
pub mod engine;
pub mod message;
pub mod normalize;
pub mod session;
pub mod status;
pub mod stream;
pub mod transport;
