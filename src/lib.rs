// Copyright (C) 2020-2026 Andy Kurnia.

#[macro_use]
pub mod error;

pub mod alphabet;
pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod emit;
pub mod fash;
pub mod info;
pub mod matcher;
pub mod pipeline;
pub mod plate;
pub mod pool;
pub mod rarity;
pub mod reader;
pub mod report;
pub mod solver;
pub mod stats;
